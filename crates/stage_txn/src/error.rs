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

    /// Transparent wrapper for [`stage_archive::error::Error`]
    #[error(transparent)]
    #[diagnostic(transparent)]
    ArchiveError(#[from] stage_archive::error::Error),

    /// A texture file does not match its expected layout
    #[error("invalid texture data: {0}")]
    Format(String),

    /// No payload store with the given name is loaded
    #[error("no payload store named {0}")]
    #[diagnostic(help("payload stores are named after their .dlz or .dld file"))]
    UnknownStore(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
