use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use miette::{Context, IntoDiagnostic, Result};
use stage_archive::crypt::transform;
use tracing::info;

#[derive(Subcommand)]
pub enum CryptCommands {
    /// Encrypt a single package file
    Encrypt(CryptArgs),
    /// Decrypt a single package file
    Decrypt(CryptArgs),
}

impl CryptCommands {
    pub fn handle(&self) -> Result<()> {
        // The transform is its own inverse
        match self {
            CryptCommands::Encrypt(args) | CryptCommands::Decrypt(args) => args.handle(),
        }
    }
}

#[derive(Args)]
pub struct CryptArgs {
    /// The input file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// The key material, `<parent>/<stage>/<file name>`, e.g. `stage/r_mgo_01/r_mgo_01.qar`
    #[arg(short, long, value_name = "KEY")]
    key: String,

    /// The output file, the input is replaced when omitted
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

impl CryptArgs {
    pub fn handle(&self) -> Result<()> {
        let mut data = fs::read(&self.file)
            .into_diagnostic()
            .wrap_err_with(|| format!("reading {}", self.file.display()))?;
        transform(&mut data, &self.key)?;

        let output = self.output.as_ref().unwrap_or(&self.file);
        fs::write(output, &data)
            .into_diagnostic()
            .wrap_err_with(|| format!("writing {}", output.display()))?;

        info!("wrote {} bytes to {}", data.len(), output.display());
        Ok(())
    }
}
