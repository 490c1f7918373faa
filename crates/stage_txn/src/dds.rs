//! DirectDraw Surface files.
//!
//! Textures are always exported as block compressed DDS files. The header is little-endian
//! whatever the title, since it is read by standard image tools.
//!
//! | Offset | Field            | Value                                               |
//! |--------|------------------|-----------------------------------------------------|
//! | 0x00   | Magic            | "DDS "                                              |
//! | 0x04   | Size             | 124                                                 |
//! | 0x08   | Flags            | caps, height, width, pixel format, linear size      |
//! | 0x0C   | Height           |                                                     |
//! | 0x10   | Width            |                                                     |
//! | 0x14   | Linear size      | size of the top level                               |
//! | 0x18   | Depth            | 0                                                   |
//! | 0x1C   | Mip map count    |                                                     |
//! | 0x20   | Reserved         | 11 words                                            |
//! | 0x4C   | Pixel format     | size 32, flags, four character code, 5 words        |
//! | 0x6C   | Caps             | texture, plus complex and mipmap for mip chains     |
//! | 0x70   | Caps 2..4        | 0                                                   |
//! | 0x7C   | Reserved         | 0                                                   |

use std::io::Cursor;

use binrw::{BinRead, BinWrite};
use stage_codec::FourCC;

use crate::error::{Error, Result};

/// Size of the header including the magic
pub const HEADER_SIZE: usize = 128;

pub const DDSD_CAPS: u32 = 0x1;
pub const DDSD_HEIGHT: u32 = 0x2;
pub const DDSD_WIDTH: u32 = 0x4;
pub const DDSD_PIXELFORMAT: u32 = 0x1000;
pub const DDSD_MIPMAPCOUNT: u32 = 0x20000;
pub const DDSD_LINEARSIZE: u32 = 0x80000;

pub const DDPF_FOURCC: u32 = 0x4;

pub const DDSCAPS_COMPLEX: u32 = 0x8;
pub const DDSCAPS_TEXTURE: u32 = 0x1000;
pub const DDSCAPS_MIPMAP: u32 = 0x400000;

/// Bytes per 4x4 block for a compression format
pub fn block_size(fourcc: FourCC) -> usize {
    match &fourcc.0 {
        b"DXT1" | b"ATI1" | b"BC4U" | b"BC4S" => 8,
        _ => 16,
    }
}

/// Size of one level of a block compressed texture
pub fn level_size(fourcc: FourCC, width: u32, height: u32) -> usize {
    let blocks_wide = width.div_ceil(4).max(1) as usize;
    let blocks_high = height.div_ceil(4).max(1) as usize;
    (blocks_wide * blocks_high).saturating_mul(block_size(fourcc))
}

/// Top level size as stored in the `linear_size` header fields
pub fn linear_size(fourcc: FourCC, width: u32, height: u32) -> Result<u32> {
    let size = level_size(fourcc, width, height);
    u32::try_from(size).map_err(|_| {
        Error::Format(format!(
            "a {width}x{height} {fourcc} level of {size} bytes does not fit a DDS header"
        ))
    })
}

/// Number of whole levels, starting at `width` x `height`, that fit in `len` bytes
pub fn count_levels(fourcc: FourCC, mut width: u32, mut height: u32, len: usize) -> u32 {
    let mut levels = 0;
    let mut used = 0;
    while used < len {
        used = used.saturating_add(level_size(fourcc, width, height));
        if used > len {
            break;
        }
        levels += 1;
        if width == 1 && height == 1 {
            break;
        }
        width = (width / 2).max(1);
        height = (height / 2).max(1);
    }
    levels
}

/// The pixel format block of a [`DdsHeader`]
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct PixelFormat {
    pub size: u32,
    pub flags: u32,
    pub fourcc: FourCC,
    pub rgb_bit_count: u32,
    pub masks: [u32; 4],
}

#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq, Eq)]
#[brw(little, magic = b"DDS ")]
pub struct DdsHeader {
    #[br(assert(size == 124, "header size is {}", size))]
    pub size: u32,
    pub flags: u32,
    pub height: u32,
    pub width: u32,
    pub linear_size: u32,
    pub depth: u32,
    pub mip_count: u32,
    pub reserved: [u32; 11],
    pub pixel_format: PixelFormat,
    pub caps: u32,
    pub caps2: u32,
    pub caps3: u32,
    pub caps4: u32,
    pub reserved2: u32,
}

impl DdsHeader {
    /// Header for a block compressed texture with `mip_count` levels
    pub fn new(width: u32, height: u32, fourcc: FourCC, mip_count: u32) -> Result<DdsHeader> {
        let linear_size = linear_size(fourcc, width, height)?;
        let mip_count = mip_count.max(1);
        let chain = mip_count > 1;

        let mut flags = DDSD_CAPS | DDSD_HEIGHT | DDSD_WIDTH | DDSD_PIXELFORMAT | DDSD_LINEARSIZE;
        let mut caps = DDSCAPS_TEXTURE;
        if chain {
            flags |= DDSD_MIPMAPCOUNT;
            caps |= DDSCAPS_COMPLEX | DDSCAPS_MIPMAP;
        }

        Ok(DdsHeader {
            size: 124,
            flags,
            height,
            width,
            linear_size,
            depth: 0,
            mip_count,
            reserved: [0; 11],
            pixel_format: PixelFormat {
                size: 32,
                flags: DDPF_FOURCC,
                fourcc,
                rgb_bit_count: 0,
                masks: [0; 4],
            },
            caps,
            caps2: 0,
            caps3: 0,
            caps4: 0,
            reserved2: 0,
        })
    }

    pub fn fourcc(&self) -> FourCC {
        self.pixel_format.fourcc
    }
}

/// A DDS file held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dds {
    pub header: DdsHeader,
    /// Every level, largest first, without gaps
    pub data: Vec<u8>,
}

impl Dds {
    /// Build a texture from its top level and the rest of its mip chain
    pub fn from_levels(
        width: u32,
        height: u32,
        fourcc: FourCC,
        main: &[u8],
        mips: &[u8],
    ) -> Result<Dds> {
        let mip_count = if mips.is_empty() {
            1
        } else {
            1 + count_levels(fourcc, (width / 2).max(1), (height / 2).max(1), mips.len())
        };

        let mut data = Vec::with_capacity(main.len() + mips.len());
        data.extend_from_slice(main);
        data.extend_from_slice(mips);

        Ok(Dds {
            header: DdsHeader::new(width, height, fourcc, mip_count)?,
            data,
        })
    }

    pub fn parse(bytes: &[u8]) -> Result<Dds> {
        let mut reader = Cursor::new(bytes);
        let header = DdsHeader::read(&mut reader)
            .map_err(|e| Error::Format(format!("bad DDS header: {e}")))?;
        if header.pixel_format.flags & DDPF_FOURCC == 0 {
            return Err(Error::Format("DDS is not block compressed".to_owned()));
        }

        Ok(Dds {
            header,
            data: bytes[HEADER_SIZE..].to_vec(),
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Cursor::new(Vec::with_capacity(HEADER_SIZE + self.data.len()));
        self.header.write(&mut writer)?;
        let mut bytes = writer.into_inner();
        bytes.extend_from_slice(&self.data);
        Ok(bytes)
    }

    /// Split the pixel data into the top level and the remaining mip chain
    pub fn split_top_level(&self) -> Result<(&[u8], &[u8])> {
        let top = level_size(self.header.fourcc(), self.header.width, self.header.height);
        if self.data.len() < top {
            return Err(Error::Format(format!(
                "expected at least {top} bytes of pixel data, found {}",
                self.data.len()
            )));
        }
        Ok(self.data.split_at(top))
    }
}
