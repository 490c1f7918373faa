//! TXN slot dictionaries.
//!
//! A slot dictionary lists the textures of one model. The position of an image in the table is its
//! slot, which together with the object id addresses its payloads in the DLD stores. Small textures
//! are embedded as complete DDS files instead.
//!
//! ```text
//! 0x00 "TXN\0" | version u32 | count u32 | reserved u32
//! 0x10 count x 32 bytes: tri_id | tex_id | width u16 | height u16 | fourcc | mip_count u16 |
//!      flags u16 | embedded_offset | embedded_size | linear_size
//! embedded DDS files, each starting on a 16 byte boundary
//! ```

use std::fs;
use std::io::{Cursor, Seek, SeekFrom, Write};
use std::path::Path;

use binrw::{BinRead, BinWrite};
use stage_codec::{align_up, Context, FourCC, WriteCodecExt};
use tracing::{debug, instrument};

use crate::error::{Error, Result};

pub const TXN_VERSION: u32 = 1;

const HEADER_SIZE: u64 = 16;
const RECORD_SIZE: u64 = 32;
const EMBEDDED_ALIGNMENT: u64 = 16;

#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(magic = b"TXN\0")]
struct TxnHeader {
    version: u32,
    count: u32,
    reserved: u32,
}

#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
struct TxnRecord {
    tri_id: u32,
    tex_id: u32,
    width: u16,
    height: u16,
    fourcc: FourCC,
    mip_count: u16,
    flags: u16,
    embedded_offset: u32,
    embedded_size: u32,
    linear_size: u32,
}

/// One image of a slot dictionary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxnImage {
    /// Object the payloads are stored under
    pub tri_id: u32,
    /// Hash of the texture name
    pub tex_id: u32,
    pub width: u16,
    pub height: u16,
    pub fourcc: FourCC,
    pub mip_count: u16,
    pub flags: u16,
    pub linear_size: u32,
    /// A complete DDS file stored inside the dictionary
    pub embedded: Option<Vec<u8>>,
}

impl TxnImage {
    pub fn has_embedded(&self) -> bool {
        self.embedded.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxnFile {
    pub version: u32,
    pub reserved: u32,
    pub images: Vec<TxnImage>,
}

impl Default for TxnFile {
    fn default() -> Self {
        Self {
            version: TXN_VERSION,
            reserved: 0,
            images: Vec::new(),
        }
    }
}

impl TxnFile {
    #[instrument(skip(ctx), err)]
    pub fn open(path: &Path, ctx: Context) -> Result<TxnFile> {
        TxnFile::parse(&fs::read(path)?, ctx)
    }

    pub fn parse(data: &[u8], ctx: Context) -> Result<TxnFile> {
        let mut reader = Cursor::new(data);
        let header = TxnHeader::read_options(&mut reader, ctx.endian(), ())
            .map_err(|e| Error::Format(format!("bad TXN header: {e}")))?;

        let table_end = HEADER_SIZE + RECORD_SIZE * u64::from(header.count);
        if table_end > data.len() as u64 {
            return Err(Error::Format(format!(
                "TXN record table of {} entries runs past the end of the file",
                header.count
            )));
        }

        let mut images = Vec::with_capacity(header.count as usize);
        for index in 0..header.count {
            let record = TxnRecord::read_options(&mut reader, ctx.endian(), ())
                .map_err(|e| Error::Format(format!("bad TXN record {index}: {e}")))?;

            let embedded = match record.embedded_size {
                0 => None,
                size => {
                    let start = record.embedded_offset as usize;
                    let bytes = data.get(start..start.saturating_add(size as usize)).ok_or_else(|| {
                        Error::Format(format!("embedded image {index} lies outside the file"))
                    })?;
                    Some(bytes.to_vec())
                }
            };

            images.push(TxnImage {
                tri_id: record.tri_id,
                tex_id: record.tex_id,
                width: record.width,
                height: record.height,
                fourcc: record.fourcc,
                mip_count: record.mip_count,
                flags: record.flags,
                linear_size: record.linear_size,
                embedded,
            });
        }

        debug!("parsed {} images", images.len());
        Ok(TxnFile {
            version: header.version,
            reserved: header.reserved,
            images,
        })
    }

    pub fn to_bytes(&self, ctx: Context) -> Result<Vec<u8>> {
        let too_large = || Error::Format("slot dictionary exceeds 4 GiB".to_owned());
        let count = u32::try_from(self.images.len()).map_err(|_| too_large())?;

        let mut writer = Cursor::new(Vec::new());
        TxnHeader {
            version: self.version,
            count,
            reserved: self.reserved,
        }
        .write_options(&mut writer, ctx.endian(), ())?;

        let mut offset = HEADER_SIZE + RECORD_SIZE * count as u64;
        for image in &self.images {
            let (embedded_offset, embedded_size) = match &image.embedded {
                Some(bytes) => {
                    offset = align_up(offset, EMBEDDED_ALIGNMENT);
                    let placed = u32::try_from(offset).map_err(|_| too_large())?;
                    offset += bytes.len() as u64;
                    (placed, bytes.len() as u32)
                }
                None => (0, 0),
            };

            TxnRecord {
                tri_id: image.tri_id,
                tex_id: image.tex_id,
                width: image.width,
                height: image.height,
                fourcc: image.fourcc,
                mip_count: image.mip_count,
                flags: image.flags,
                embedded_offset,
                embedded_size,
                linear_size: image.linear_size,
            }
            .write_options(&mut writer, ctx.endian(), ())?;
        }

        writer.seek(SeekFrom::End(0))?;
        for bytes in self.images.iter().filter_map(|i| i.embedded.as_ref()) {
            let position = writer.position();
            writer.write_zeros((align_up(position, EMBEDDED_ALIGNMENT) - position) as usize)?;
            writer.write_all(bytes)?;
        }

        Ok(writer.into_inner())
    }

    pub fn save(&self, path: &Path, ctx: Context) -> Result<()> {
        fs::write(path, self.to_bytes(ctx)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use stage_codec::{Context, FourCC, Title};

    use crate::error::{Error, Result};
    use crate::txn::{TxnFile, TxnImage};

    #[rustfmt::skip]
    const EMBEDDED_ONLY: [u8; 52] = [
        0x54, 0x58, 0x4E, 0x00,
        0x01, 0x00, 0x00, 0x00,
        0x01, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00,
        // tri_id, tex_id
        0x78, 0x56, 0x34, 0x12,
        0xEF, 0xBE, 0xAD, 0xDE,
        // width, height, fourcc
        0x08, 0x00, 0x04, 0x00,
        b'D', b'X', b'T', b'1',
        // mip_count, flags, embedded offset, embedded size, linear size
        0x01, 0x00, 0x00, 0x00,
        0x30, 0x00, 0x00, 0x00,
        0x04, 0x00, 0x00, 0x00,
        0x10, 0x00, 0x00, 0x00,
        b'D', b'D', b'S', b' ',
    ];

    #[test]
    fn parse_little_endian_fixture() -> Result<()> {
        let ctx = Context::new(Title::Mga);
        let txn = TxnFile::parse(&EMBEDDED_ONLY, ctx)?;

        assert_eq!(
            txn.images,
            vec![TxnImage {
                tri_id: 0x12345678,
                tex_id: 0xDEADBEEF,
                width: 8,
                height: 4,
                fourcc: FourCC::DXT1,
                mip_count: 1,
                flags: 0,
                linear_size: 16,
                embedded: Some(b"DDS ".to_vec()),
            }]
        );
        assert_eq!(txn.to_bytes(ctx)?, EMBEDDED_ONLY.to_vec());

        Ok(())
    }

    #[test]
    fn embedded_images_are_aligned() -> Result<()> {
        let ctx = Context::new(Title::Mgs4);
        let txn = TxnFile {
            images: vec![
                TxnImage {
                    tri_id: 1,
                    embedded: Some(vec![0xAA; 3]),
                    ..Default::default()
                },
                TxnImage {
                    tri_id: 2,
                    ..Default::default()
                },
                TxnImage {
                    tri_id: 3,
                    embedded: Some(vec![0xBB; 2]),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let bytes = txn.to_bytes(ctx)?;
        assert_eq!(bytes.len(), 130);
        assert_eq!(&bytes[112..115], &[0xAA; 3]);
        assert_eq!(&bytes[128..130], &[0xBB; 2]);
        assert_eq!(TxnFile::parse(&bytes, ctx)?, txn);

        Ok(())
    }

    #[test]
    fn embedded_outside_file() {
        let result = TxnFile::parse(&EMBEDDED_ONLY[..50], Context::new(Title::Mga));
        assert!(matches!(result, Err(Error::Format(_))));
    }

    #[test]
    fn huge_count_is_a_format_error() {
        #[rustfmt::skip]
        let header = [
            0x54, 0x58, 0x4E, 0x00,
            0x01, 0x00, 0x00, 0x00,
            0xFF, 0xFF, 0xFF, 0xFF,
            0x00, 0x00, 0x00, 0x00,
        ];
        let result = TxnFile::parse(&header, Context::new(Title::Mga));
        assert!(matches!(result, Err(Error::Format(_))));
    }

    #[test]
    fn truncated_record_table() {
        let result = TxnFile::parse(&EMBEDDED_ONLY[..40], Context::new(Title::Mga));
        assert!(matches!(result, Err(Error::Format(_))));
    }
}
