//! DLD payload stores.
//!
//! A payload store holds the raw pixel data of many textures, each addressed by the object it
//! belongs to, its slot and its [`Priority`] layer.
//!
//! ```text
//! 0x00 "DLD\0" | version u32 | count u32 | reserved u32
//! 0x10 count x 24 bytes: object_id | slot | priority | offset | size | reserved
//! payloads in table order, each starting on a 16 byte boundary
//! ```

use std::fs;
use std::io::{Cursor, Seek, SeekFrom, Write};
use std::path::Path;

use binrw::{BinRead, BinWrite};
use derive_more::Display;
use stage_codec::{align_up, Context, WriteCodecExt};
use tracing::{debug, instrument};

use crate::error::{Error, Result};

pub const DLD_VERSION: u32 = 1;
pub const PAYLOAD_ALIGNMENT: u64 = 16;

const HEADER_SIZE: u64 = 16;
const RECORD_SIZE: u64 = 24;

/// Layer of a texture payload
#[derive(BinRead, BinWrite, Display, Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[brw(repr = u32)]
pub enum Priority {
    /// The full resolution top level
    #[default]
    Main = 0,
    /// Every level below the top one
    Mipmaps = 1,
}

#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(magic = b"DLD\0")]
struct DldHeader {
    version: u32,
    count: u32,
    reserved: u32,
}

#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
struct DldRecord {
    object_id: u32,
    slot: u32,
    priority: Priority,
    offset: u32,
    size: u32,
    reserved: u32,
}

/// One payload of a store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DldTexture {
    pub object_id: u32,
    pub slot: u32,
    pub priority: Priority,
    pub reserved: u32,
    pub data: Vec<u8>,
}

/// A parsed payload store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DldFile {
    pub version: u32,
    pub reserved: u32,
    pub textures: Vec<DldTexture>,
}

impl Default for DldFile {
    fn default() -> Self {
        Self {
            version: DLD_VERSION,
            reserved: 0,
            textures: Vec::new(),
        }
    }
}

impl DldFile {
    #[instrument(skip(ctx), err)]
    pub fn open(path: &Path, ctx: Context) -> Result<DldFile> {
        DldFile::parse(&fs::read(path)?, ctx)
    }

    pub fn parse(data: &[u8], ctx: Context) -> Result<DldFile> {
        let mut reader = Cursor::new(data);
        let header = DldHeader::read_options(&mut reader, ctx.endian(), ())
            .map_err(|e| Error::Format(format!("bad DLD header: {e}")))?;

        let table_end = HEADER_SIZE + RECORD_SIZE * u64::from(header.count);
        if table_end > data.len() as u64 {
            return Err(Error::Format(format!(
                "DLD record table of {} entries runs past the end of the file",
                header.count
            )));
        }

        let mut textures = Vec::with_capacity(header.count as usize);
        for index in 0..header.count {
            let record = DldRecord::read_options(&mut reader, ctx.endian(), ())
                .map_err(|e| Error::Format(format!("bad DLD record {index}: {e}")))?;

            let start = record.offset as usize;
            let end = start.saturating_add(record.size as usize);
            let payload = data.get(start..end).ok_or_else(|| {
                Error::Format(format!("payload {index} lies outside the file"))
            })?;

            textures.push(DldTexture {
                object_id: record.object_id,
                slot: record.slot,
                priority: record.priority,
                reserved: record.reserved,
                data: payload.to_vec(),
            });
        }

        debug!("parsed {} payloads", textures.len());
        Ok(DldFile {
            version: header.version,
            reserved: header.reserved,
            textures,
        })
    }

    pub fn to_bytes(&self, ctx: Context) -> Result<Vec<u8>> {
        let count = u32::try_from(self.textures.len())
            .map_err(|_| Error::Format("too many payloads".to_owned()))?;

        let mut writer = Cursor::new(Vec::new());
        DldHeader {
            version: self.version,
            count,
            reserved: self.reserved,
        }
        .write_options(&mut writer, ctx.endian(), ())?;

        let mut offset = HEADER_SIZE + RECORD_SIZE * count as u64;
        for texture in &self.textures {
            offset = align_up(offset, PAYLOAD_ALIGNMENT);
            let record = DldRecord {
                object_id: texture.object_id,
                slot: texture.slot,
                priority: texture.priority,
                offset: u32::try_from(offset)
                    .map_err(|_| Error::Format("payload store exceeds 4 GiB".to_owned()))?,
                size: texture.data.len() as u32,
                reserved: texture.reserved,
            };
            record.write_options(&mut writer, ctx.endian(), ())?;
            offset += texture.data.len() as u64;
        }

        writer.seek(SeekFrom::End(0))?;
        for texture in &self.textures {
            let position = writer.position();
            writer.write_zeros((align_up(position, PAYLOAD_ALIGNMENT) - position) as usize)?;
            writer.write_all(&texture.data)?;
        }

        Ok(writer.into_inner())
    }

    pub fn save(&self, path: &Path, ctx: Context) -> Result<()> {
        fs::write(path, self.to_bytes(ctx)?)?;
        Ok(())
    }

    /// First payload stored for `(object_id, slot)` in the given layer
    pub fn find(&self, object_id: u32, slot: u32, priority: Priority) -> Option<&DldTexture> {
        self.textures
            .iter()
            .find(|t| t.object_id == object_id && t.slot == slot && t.priority == priority)
    }

    /// Replace the payload with the same address, or append a new one
    pub fn upsert(&mut self, texture: DldTexture) {
        match self.textures.iter_mut().find(|t| {
            t.object_id == texture.object_id
                && t.slot == texture.slot
                && t.priority == texture.priority
        }) {
            Some(existing) => *existing = texture,
            None => self.textures.push(texture),
        }
    }

    /// Drop every payload with the given address, returning whether any was present
    pub fn remove(&mut self, object_id: u32, slot: u32, priority: Priority) -> bool {
        let before = self.textures.len();
        self.textures
            .retain(|t| !(t.object_id == object_id && t.slot == slot && t.priority == priority));
        self.textures.len() != before
    }
}
