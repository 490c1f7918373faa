//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// Transparent wrapper for [`serde_json::Error`]
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    /// Transparent wrapper for [`walkdir::Error`]
    #[error(transparent)]
    WalkError(#[from] walkdir::Error),

    /// The directory table of a container could not be parsed or validated
    #[error("{archive} is not a valid container: {reason}")]
    #[diagnostic(help("re-run the unpack from the original package before retrying"))]
    CorruptArchive { archive: String, reason: String },

    /// The package transform could not be applied
    #[error("unable to apply package transform: {0}")]
    EncryptionKey(String),

    /// The operation was cancelled before it finished
    #[error("operation was cancelled")]
    #[diagnostic(help("the working directory may hold partial output and should be unpacked again"))]
    Cancelled,

    /// unable to find requested file
    #[error("unable to find requested file")]
    FileNotFound(#[from] FileNotFoundError),

    /// A working directory has no manifest for a container that is being packed
    #[error("no manifest found in {0}")]
    MissingManifest(String),

    /// Two containers map to the same unpacked directory
    #[error("{dir} already holds the contents of {owner}")]
    #[diagnostic(help("rename one of the containers so their unpacked directories differ"))]
    DirectoryInUse { dir: String, owner: String },
}

impl Error {
    pub(crate) fn corrupt(archive: impl ToString, reason: impl ToString) -> Self {
        Error::CorruptArchive {
            archive: archive.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Error type to provide further information when a file has not been found
#[derive(Error, Diagnostic, Debug)]
#[error("unable to find requested file")]
pub enum FileNotFoundError {
    /// at index {0}
    #[error("at index {0}")]
    Index(usize),

    /// by name {0}
    #[error("by name {0}")]
    Name(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
