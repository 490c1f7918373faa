//! Primitives shared by every stage package codec.
//!
//! The titles handled by this workspace do not agree on a byte order: *Metal Gear Online 2*
//! and *Metal Gear Solid 4* store their data big-endian while *Metal Gear Acid* style packages
//! are little-endian. Rather than a process wide flag, the byte order is part of a [`Context`]
//! that is built from the [`Title`] of the loaded stage and handed to every reader and writer.
//!
//! ```
//! use stage_codec::{Context, ReadCodecExt, Title};
//!
//! let ctx = Context::new(Title::Mgo2);
//! let mut data: &[u8] = &[0x00, 0x00, 0x01, 0x00];
//! assert_eq!(data.read_u32_in(ctx.endian()).unwrap(), 256);
//! ```

pub mod error;
pub mod io;
pub mod title;
pub mod types;

pub use binrw::Endian;
pub use io::{align_up, ReadCodecExt, WriteCodecExt};
pub use title::{Context, Title};
pub use types::{Aabb, FourCC, Vec3, Vec4};
