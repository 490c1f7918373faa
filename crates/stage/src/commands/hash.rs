use clap::{Args, Subcommand};
use miette::{miette, Result};
use stage_dict::str_code;

use crate::commands::DictionaryArgs;

#[derive(Subcommand)]
pub enum HashCommands {
    /// Print the hash of each name
    Compute(ComputeArgs),
    /// Look hashes up in the dictionary
    Resolve(ResolveArgs),
}

impl HashCommands {
    pub fn handle(&self) -> Result<()> {
        match self {
            HashCommands::Compute(compute) => compute.handle(),
            HashCommands::Resolve(resolve) => resolve.handle(),
        }
    }
}

#[derive(Args)]
pub struct ComputeArgs {
    #[arg(required = true)]
    names: Vec<String>,
}

impl ComputeArgs {
    pub fn handle(&self) -> Result<()> {
        for name in &self.names {
            println!("{:08x} {name}", str_code(name));
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    dictionary: DictionaryArgs,

    /// Hashes in hexadecimal, with or without a `0x` prefix
    #[arg(required = true)]
    hashes: Vec<String>,
}

fn parse_hash(text: &str) -> Result<u64> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u64::from_str_radix(digits, 16).map_err(|e| miette!("{text} is not a hash: {e}"))
}

impl ResolveArgs {
    pub fn handle(&self) -> Result<()> {
        let dictionary = self.dictionary.load()?;
        for text in &self.hashes {
            let hash = parse_hash(text)?;
            println!("{text} {}", dictionary.resolve(hash));
        }
        Ok(())
    }
}
