use std::path::PathBuf;

use clap::Args;
use itertools::Itertools;
use miette::Result;
use tracing::info;

use crate::commands::SessionArgs;
use crate::session::Session;

#[derive(Args)]
pub struct LoadArgs {
    #[command(flatten)]
    session: SessionArgs,

    /// The stage package directory, e.g. `stage/r_mgo_01`
    #[arg(short, long, value_name = "DIR")]
    source: PathBuf,
}

impl LoadArgs {
    pub fn handle(&self) -> Result<()> {
        let mut session = Session::new(&self.session.work, self.session.title.title);
        session.load(&self.source)?;

        let counts = session
            .tree()
            .files()
            .iter()
            .counts_by(|f| f.kind.to_string());
        for (kind, count) in counts.into_iter().sorted() {
            info!("{count:>5} {kind}");
        }

        Ok(())
    }
}

#[derive(Args)]
pub struct SaveArgs {
    #[command(flatten)]
    session: SessionArgs,

    /// The package directory to write, named like the stage, e.g. `out/stage/r_mgo_01`
    #[arg(short, long, value_name = "DIR")]
    dest: PathBuf,
}

impl SaveArgs {
    pub fn handle(&self) -> Result<()> {
        let mut session = Session::resume(&self.session.work, self.session.title.title)?;
        let written = session.save(&self.dest)?;
        info!("wrote {} package files to {}", written.len(), self.dest.display());
        Ok(())
    }
}
