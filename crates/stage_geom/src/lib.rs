//! Stage geometry files.
//!
//! A geometry file holds the drawable meshes of a stage, references into the geometry of other
//! stages, boundary volumes and the placed props. Every block addresses a range of two shared
//! buffers, one of vertex positions and one of 16 bit indices.
//!
//! # Layout
//!
//! All multi-byte fields use the byte order of the title (see [`stage_codec::Title`]).
//!
//! | Section      | Size            | Description                                     |
//! |--------------|-----------------|-------------------------------------------------|
//! | Header       | 68 bytes        | "GEOM", version, seven table counts, world AABB |
//! | Groups       | 48 bytes each   | [`types::MeshGroup`]                            |
//! | Meshes       | 56 bytes each   | [`types::GeomMesh`]                             |
//! | References   | 60 bytes each   | [`types::MeshReference`]                        |
//! | Boundaries   | 56 bytes each   | [`types::BoundaryVolume`]                       |
//! | Props        | 20 bytes each   | [`types::GeomProp`]                             |
//! | Vertices     | 12 bytes each   | three `f32`                                     |
//! | Indices      | 2 bytes each    | `u16`, zero padded to a multiple of 4 bytes     |
//!
//! Indices are relative to the first vertex of the span that owns them.

pub mod category;
pub mod error;
pub mod file;
pub mod geom;
mod merge;
pub mod types;

pub use category::{categorize, classify, CategoryInfo, PropCategory, PropEntry};
pub use file::GeomFile;
pub use geom::Geom;
