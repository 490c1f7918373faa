//! Reading and writing DAR containers
//!
//! A DAR is a flat list of uncompressed entries:
//!
//! | Field     | Description                                   |
//! |-----------|-----------------------------------------------|
//! | count     | `u32` number of entries                       |
//! | name_len  | `u32` length of the name in bytes             |
//! | name      | name bytes, zero padded to 4 bytes            |
//! | size      | `u32` size of the data                        |
//! | data      | data bytes, zero padded to 4 bytes            |
//!
//! The last four fields repeat `count` times and the file must end right after the last entry.

use std::io::{Read, Write};

use stage_codec::{align_up, Context, ReadCodecExt, WriteCodecExt};
use tracing::instrument;

use crate::error::{Error, Result};

/// A single named entry of a DAR container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DarEntry {
    pub name: String,
    pub data: Vec<u8>,
}

/// In-memory DAR container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DarArchive {
    entries: Vec<DarEntry>,
}

fn padding(len: usize) -> usize {
    align_up(len as u64, 4) as usize - len
}

impl DarArchive {
    /// Parse a complete DAR container
    #[instrument(skip(data), fields(size = data.len()))]
    pub fn parse(data: &[u8], ctx: Context) -> Result<DarArchive> {
        let endian = ctx.endian();
        let mut reader = data;

        let corrupt = |reason: String| Error::corrupt("dar", reason);
        let count = reader
            .read_u32_in(endian)
            .map_err(|_| corrupt("missing entry count".into()))?;

        let mut entries = Vec::new();
        for index in 0..count {
            let mut read_block = |what: &str| -> Result<Vec<u8>> {
                let len = reader
                    .read_u32_in(endian)
                    .map_err(|_| corrupt(format!("entry {index} has no {what} length")))?
                    as usize;
                if len + padding(len) > reader.len() {
                    return Err(corrupt(format!("entry {index} {what} runs past the end")));
                }

                let block = reader.read_bytes(len)?;
                reader = &reader[padding(len)..];
                Ok(block)
            };

            let name = read_block("name")?;
            let data = read_block("data")?;
            entries.push(DarEntry {
                name: String::from_utf8(name)
                    .map_err(|_| corrupt(format!("entry {index} name is not utf-8")))?,
                data,
            });
        }

        if !reader.is_empty() {
            return Err(corrupt(format!("{} trailing bytes", reader.len())));
        }

        Ok(DarArchive { entries })
    }

    /// Read and parse a DAR container from a reader
    pub fn read<R: Read>(mut reader: R, ctx: Context) -> Result<DarArchive> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::parse(&data, ctx)
    }

    /// Serialize the container
    #[instrument(skip_all, err)]
    pub fn write<W: Write>(&self, mut writer: W, ctx: Context) -> Result<W> {
        let endian = ctx.endian();
        writer.write_u32_in(self.entries.len() as u32, endian)?;

        for entry in &self.entries {
            for block in [entry.name.as_bytes(), entry.data.as_slice()] {
                let len = u32::try_from(block.len())
                    .map_err(|_| Error::corrupt("dar", "entry exceeds 4 GiB"))?;
                writer.write_u32_in(len, endian)?;
                writer.write_all(block)?;
                writer.write_zeros(padding(block.len()))?;
            }
        }

        Ok(writer)
    }

    /// Append an entry
    pub fn push(&mut self, name: impl Into<String>, data: Vec<u8>) {
        self.entries.push(DarEntry {
            name: name.into(),
            data,
        });
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the container holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in container order
    pub fn entries(&self) -> &[DarEntry] {
        &self.entries
    }

    /// Consume the container, returning its entries
    pub fn into_entries(self) -> Vec<DarEntry> {
        self.entries
    }
}
