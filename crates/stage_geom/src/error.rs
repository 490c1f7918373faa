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

    /// Transparent wrapper for [`tempfile::PersistError`]
    #[error(transparent)]
    PersistError(#[from] tempfile::PersistError),

    /// The geometry does not match the expected layout
    #[error("invalid geometry: {0}")]
    Format(String),

    /// The geometry file was closed and can no longer be used
    #[error("geometry file {0} is closed")]
    Closed(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
