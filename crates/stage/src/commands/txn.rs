use std::path::PathBuf;

use clap::{Args, Subcommand};
use miette::{miette, Context, Result};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::commands::{DictionaryArgs, SessionArgs};
use crate::session::Session;

#[derive(Subcommand)]
pub enum TxnCommands {
    /// Export every texture of the working directory as DDS files
    Dump(DumpArgs),
    /// Replace textures of the working directory with edited DDS files
    Repack(RepackArgs),
}

impl TxnCommands {
    pub fn handle(&self) -> Result<()> {
        match self {
            TxnCommands::Dump(dump) => dump.handle(),
            TxnCommands::Repack(repack) => repack.handle(),
        }
    }
}

#[derive(Args)]
pub struct DumpArgs {
    #[command(flatten)]
    session: SessionArgs,

    #[command(flatten)]
    dictionary: DictionaryArgs,

    /// The directory receiving one folder per slot dictionary
    #[arg(short, long, value_name = "DIR")]
    output: PathBuf,
}

impl DumpArgs {
    pub fn handle(&self) -> Result<()> {
        let dictionary = self.dictionary.load()?;
        let session = Session::resume(&self.session.work, self.session.title.title)?;
        let library = session.textures()?;

        let report = library
            .dump_all(session.txn_paths(), &dictionary, &self.output)
            .context(format!("exporting to {}", self.output.display()))?;
        if report.missing > 0 || report.failed > 0 {
            warn!("{} missing, {} failed", report.missing, report.failed);
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct RepackArgs {
    #[command(flatten)]
    session: SessionArgs,

    #[command(flatten)]
    dictionary: DictionaryArgs,

    /// The directory holding one folder of DDS files per slot dictionary
    #[arg(short = 'i', long, value_name = "DIR")]
    textures: PathBuf,

    /// The payload store receiving top levels, e.g. `tex_01.dlz`
    #[arg(long, value_name = "NAME")]
    main: String,

    /// The payload store receiving mip chains, the main store when omitted
    #[arg(long, value_name = "NAME")]
    mips: Option<String>,
}

impl RepackArgs {
    pub fn handle(&self) -> Result<()> {
        let found = WalkDir::new(&self.textures)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry
                        .path()
                        .extension()
                        .is_some_and(|e| e.eq_ignore_ascii_case("dds"))
            })
            .count();
        if found == 0 {
            return Err(miette!("no DDS files under {}", self.textures.display()));
        }
        info!("found {found} DDS files");

        let dictionary = self.dictionary.load()?;
        let session = Session::resume(&self.session.work, self.session.title.title)?;
        let mut library = session.textures()?;

        let main = library.store_index(&self.main)?;
        let mips = match &self.mips {
            Some(name) => library.store_index(name)?,
            None => main,
        };

        let report = library.repack_all(
            session.txn_paths(),
            &self.textures,
            main,
            mips,
            &dictionary,
        )?;
        let saved = library.save_stores()?;
        info!(
            "replaced {} textures, wrote {} payload stores",
            report.replaced,
            saved.len()
        );

        if report.failed > 0 || report.failed_txns > 0 {
            warn!(
                "{} textures and {} slot dictionaries failed",
                report.failed, report.failed_txns
            );
        }
        Ok(())
    }
}
