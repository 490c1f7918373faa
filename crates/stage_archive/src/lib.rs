//! This library handles the package layer of *Metal Gear Online 2* style stage packages: the
//! container formats nested inside a stage directory, the per-title package transform, and the
//! working directory that an editing session unpacks into and packs back from.
//!
//! # QAR Container Format
//!
//! All multi-byte fields use the byte order of the title (see [`stage_codec::Title`]).
//!
//! | Offset (bytes) | Field          | Description                                            |
//! |----------------|----------------|--------------------------------------------------------|
//! | 0x0000         | Magic number   | 4 bytes: "QAR\0"                                       |
//! | 0x0004         | Version        | 4 bytes: always 1                                      |
//! | 0x0008         | Entry Count    | 4 bytes: number of records in the directory table      |
//! | 0x000C         | Alignment      | 4 bytes: power of two alignment of the data area       |
//! | 0x0010         | Names Size     | 4 bytes: size of the name block                        |
//! | 0x0014         | Data Start     | 4 bytes: offset of the first data block                |
//!
//! ### Directory Table
//!
//! Directly after the header, one 24 byte record per entry:
//!
//! | Offset (bytes) | Field          | Description                                            |
//! |----------------|----------------|--------------------------------------------------------|
//! | 0x0000         | Name Hash      | 4 bytes: CRC-32/BZIP2 of the entry name                |
//! | 0x0004         | Name Offset    | 4 bytes: offset of the name inside the name block      |
//! | 0x0008         | Data Offset    | 4 bytes: offset of the data from the start of the file |
//! | 0x000C         | Stored Size    | 4 bytes: size of the data inside the container         |
//! | 0x0010         | Size           | 4 bytes: size of the data once decompressed            |
//! | 0x0014         | Compression    | 4 bytes: `0` stored, `2` zlib                          |
//!
//! ### Name Block and Data Area
//!
//! The name block follows the table and holds null terminated names. It is zero padded up to the
//! alignment, which is where the data area starts. Every entry's data begins on an alignment
//! boundary and the gaps are zero filled.
//!
//! # Other Containers
//!
//! - [`dar`]: a flat list of uncompressed, 4 byte aligned entries.
//! - [`dlz`]: a zlib wrapped DLD texture payload store.
//!
//! # Working Directory
//!
//! [`package::unpack`] expands every container into a sibling directory holding its entries and a
//! [`manifest::Manifest`]; [`package::pack`] reverses it. A package that was not edited packs back
//! to the exact same bytes.

pub mod compression;
pub mod crypt;
pub mod dar;
pub mod dlz;
pub mod error;
pub mod kind;
pub mod manifest;
pub mod package;
pub mod read;
pub mod types;
pub mod write;

pub use compression::CompressionMethod;
pub use crypt::Cancellation;
pub use kind::{ContainerKind, FileKind};
pub use package::{pack, scan, unpack, StageFile, StageTree};
pub use read::QarArchive;
pub use write::QarWriter;
