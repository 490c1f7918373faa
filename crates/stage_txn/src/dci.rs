//! DCI texture info dictionaries.
//!
//! A DCI entry moves the payloads of a `(object, texture)` pair to another slot, so the slot used
//! to search the payload stores is not always the position of the image in its TXN.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use binrw::{binrw, BinRead, BinWrite};
use stage_codec::{Context, FourCC};
use tracing::instrument;

use crate::error::{Error, Result};

pub const DCI_VERSION: u32 = 1;

#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct DciEntry {
    pub texture_id: u32,
    pub object_id: u32,
    pub slot: u32,
    pub width: u16,
    pub height: u16,
    pub fourcc: FourCC,
    pub mip_count: u16,
    pub flags: u16,
}

#[binrw]
#[brw(magic = b"DCI\0")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DciFile {
    pub version: u32,
    #[br(temp)]
    #[bw(try_calc(u32::try_from(entries.len())))]
    count: u32,
    #[br(count = count)]
    pub entries: Vec<DciEntry>,
}

impl Default for DciFile {
    fn default() -> Self {
        Self {
            version: DCI_VERSION,
            entries: Vec::new(),
        }
    }
}

impl DciFile {
    #[instrument(skip(ctx), err)]
    pub fn open(path: &Path, ctx: Context) -> Result<DciFile> {
        DciFile::parse(&fs::read(path)?, ctx)
    }

    pub fn parse(data: &[u8], ctx: Context) -> Result<DciFile> {
        DciFile::read_options(&mut Cursor::new(data), ctx.endian(), ())
            .map_err(|e| Error::Format(format!("bad DCI file: {e}")))
    }

    pub fn to_bytes(&self, ctx: Context) -> Result<Vec<u8>> {
        let mut writer = Cursor::new(Vec::new());
        self.write_options(&mut writer, ctx.endian(), ())?;
        Ok(writer.into_inner())
    }

    /// Entry re-targeting the given image, if any
    pub fn find(&self, object_id: u32, texture_id: u32) -> Option<&DciEntry> {
        self.entries
            .iter()
            .find(|e| e.object_id == object_id && e.texture_id == texture_id)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use stage_codec::{Context, FourCC, Title};

    use crate::dci::{DciEntry, DciFile};
    use crate::error::Result;

    #[rustfmt::skip]
    const ONE_ENTRY: [u8; 36] = [
        b'D', b'C', b'I', 0x00,
        0x00, 0x00, 0x00, 0x01,
        0x00, 0x00, 0x00, 0x01,
        // texture, object, slot
        0xDE, 0xAD, 0xBE, 0xEF,
        0x12, 0x34, 0x56, 0x78,
        0x00, 0x00, 0x00, 0x05,
        // width, height, fourcc, mip_count, flags
        0x01, 0x00, 0x00, 0x80,
        b'D', b'X', b'T', b'5',
        0x00, 0x08, 0x00, 0x00,
    ];

    #[test]
    fn parse_fixture() -> Result<()> {
        let ctx = Context::new(Title::Mgo2);
        let dci = DciFile::parse(&ONE_ENTRY, ctx)?;

        let expected = DciEntry {
            texture_id: 0xDEADBEEF,
            object_id: 0x12345678,
            slot: 5,
            width: 256,
            height: 128,
            fourcc: FourCC::DXT5,
            mip_count: 8,
            flags: 0,
        };
        assert_eq!(dci.entries, vec![expected]);
        assert_eq!(dci.find(0x12345678, 0xDEADBEEF), Some(&expected));
        assert_eq!(dci.find(0xDEADBEEF, 0x12345678), None);
        assert_eq!(dci.to_bytes(ctx)?, ONE_ENTRY.to_vec());

        Ok(())
    }

    #[test]
    fn wrong_magic() {
        let mut data = ONE_ENTRY;
        data[0] = b'X';
        assert!(DciFile::parse(&data, Context::default()).is_err());
    }
}
