use std::path::PathBuf;

use clap::{Args, Subcommand};
use miette::{miette, Context, Result};
use stage_archive::package::{unpack_container, unpacked_dir};
use stage_archive::{pack, Cancellation, FileKind};
use stage_codec::Context as CodecContext;
use tracing::info;

use crate::commands::TitleArgs;

#[derive(Subcommand)]
pub enum ArchiveCommands {
    /// Unpack a container, and every container nested in it, next to it
    Unpack(UnpackArgs),
    /// Rebuild every unpacked container of a directory
    Pack(PackArgs),
}

impl ArchiveCommands {
    pub fn handle(&self) -> Result<()> {
        match self {
            ArchiveCommands::Unpack(unpack) => unpack.handle(),
            ArchiveCommands::Pack(pack) => pack.handle(),
        }
    }
}

#[derive(Args)]
pub struct UnpackArgs {
    #[command(flatten)]
    title: TitleArgs,

    /// An input QAR, DAR or DLZ file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
}

impl UnpackArgs {
    pub fn handle(&self) -> Result<()> {
        let ctx = CodecContext::new(self.title.title);
        let name = self
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let kind = FileKind::from_name(&name)
            .container()
            .ok_or_else(|| miette!("{} is not a container", self.file.display()))?;

        let mut pending = vec![(self.file.clone(), kind)];
        let mut unpacked = 0;
        while let Some((path, kind)) = pending.pop() {
            let names = unpack_container(&path, kind, ctx)
                .context(format!("unpacking {}", path.display()))?;
            unpacked += 1;

            let dir = unpacked_dir(&path);
            pending.extend(names.into_iter().filter_map(|name| {
                let kind = FileKind::from_name(&name).container()?;
                Some((dir.join(name), kind))
            }));
        }

        info!("unpacked {unpacked} containers");
        Ok(())
    }
}

#[derive(Args)]
pub struct PackArgs {
    #[command(flatten)]
    title: TitleArgs,

    /// A directory holding unpacked containers
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,
}

impl PackArgs {
    pub fn handle(&self) -> Result<()> {
        let ctx = CodecContext::new(self.title.title);
        let rebuilt = pack(&self.directory, ctx, &Cancellation::new())
            .context(format!("packing {}", self.directory.display()))?;

        for path in &rebuilt {
            info!("rebuilt {}", path.display());
        }
        Ok(())
    }
}
