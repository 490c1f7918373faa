//! This library handles the textures of a stage.
//!
//! Texture data is spread over three formats:
//!
//! - [`txn`]: slot dictionaries listing the textures of a model, optionally embedding small ones.
//! - [`dld`]: payload stores holding the pixel data, split into a [`dld::Priority::Main`] top
//!   level and a [`dld::Priority::Mipmaps`] chain. They ship zlib wrapped as `.dlz` containers.
//! - [`dci`]: texture info dictionaries moving a texture to another payload slot.
//!
//! A [`TextureLibrary`] holds every store of a stage and resolves an image to its payloads,
//! searching the most recently loaded store first. The result is exported as a [`dds::Dds`] file,
//! and edited DDS files can be packed back into the stores with [`TextureLibrary::rebuild_txn`].

pub mod dci;
pub mod dds;
pub mod dld;
pub mod dump;
pub mod error;
pub mod repack;
pub mod resolve;
pub mod txn;

pub use dld::{DldFile, Priority};
pub use dump::DumpReport;
pub use repack::RepackReport;
pub use resolve::{PayloadStore, Resolution, TextureLibrary};
pub use txn::{TxnFile, TxnImage};
