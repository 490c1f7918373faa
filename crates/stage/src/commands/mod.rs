use std::path::PathBuf;

use clap::Args;
use miette::{Context, Result};
use stage_codec::Title;
use stage_dict::HashDictionary;

use crate::session::DEFAULT_WORK_DIR;

pub mod archive;
pub mod crypt;
pub mod geom;
pub mod hash;
pub mod stage;
pub mod txn;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Decrypt and unpack a stage package into the working directory
    Load(stage::LoadArgs),
    /// Pack the working directory and write it out as a stage package
    Save(stage::SaveArgs),
    /// Handle QAR, DAR and DLZ containers
    Archive {
        #[command(subcommand)]
        command: archive::ArchiveCommands,
    },
    /// Apply the package transform to single files
    Crypt {
        #[command(subcommand)]
        command: crypt::CryptCommands,
    },
    /// Handle geometry files
    Geom {
        #[command(subcommand)]
        command: geom::GeomCommands,
    },
    /// Export and replace textures
    Txn {
        #[command(subcommand)]
        command: txn::TxnCommands,
    },
    /// Compute and resolve name hashes
    Hash {
        #[command(subcommand)]
        command: hash::HashCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> Result<()> {
        match self {
            Commands::Load(load) => load.handle(),
            Commands::Save(save) => save.handle(),
            Commands::Archive { command } => command.handle(),
            Commands::Crypt { command } => command.handle(),
            Commands::Geom { command } => command.handle(),
            Commands::Txn { command } => command.handle(),
            Commands::Hash { command } => command.handle(),
        }
    }
}

#[derive(Args)]
pub struct TitleArgs {
    /// The title the files belong to: mgo2, mgs4 or mga
    #[arg(short, long, env = "STAGE_TITLE", default_value = "mgo2")]
    pub title: Title,
}

#[derive(Args)]
pub struct SessionArgs {
    #[command(flatten)]
    pub title: TitleArgs,

    /// The working directory
    #[arg(short, long, value_name = "DIR", env = "STAGE_WORK_DIR", default_value = DEFAULT_WORK_DIR)]
    pub work: PathBuf,
}

#[derive(Args)]
pub struct DictionaryArgs {
    /// The hash dictionary
    #[arg(long, value_name = "FILE", env = "STAGE_DICTIONARY", default_value = "bin/dictionary.txt")]
    pub dictionary: PathBuf,

    /// The alias table applied on top of the dictionary
    #[arg(long, value_name = "FILE", env = "STAGE_DICTIONARY_ALIASES", default_value = "bin/dictionary-aliases.txt")]
    pub aliases: PathBuf,
}

impl DictionaryArgs {
    pub fn load(&self) -> Result<HashDictionary> {
        HashDictionary::load(&self.dictionary, &self.aliases).context("loading the hash dictionary")
    }
}
