//! Error types that can be emitted from this library
//!

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// A dictionary table could not be opened
    #[error("unable to open dictionary table {path}")]
    #[diagnostic(help("dictionary tables are loaded from fixed paths relative to the working directory"))]
    TableNotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Line in the alias table is not a `canonical preferred` pair
    #[error("invalid alias on line {line}: {content:?}")]
    InvalidAlias { line: usize, content: String },
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
