//! Base types for the structure of a QAR container.

use binrw::{BinRead, BinWrite};

use crate::compression::CompressionMethod;

/// Size of [`QarHeader`] on disk, including the magic
pub const HEADER_SIZE: u32 = 0x18;

/// Size of one [`QarRecord`] on disk
pub const RECORD_SIZE: u32 = 0x18;

/// The only container version understood by this library
pub const QAR_VERSION: u32 = 1;

/// QAR file header
///
/// Starts with the magic "QAR\0". Multi-byte fields use the byte order of the title, so the
/// header is read with [`BinRead::read_options`] and the session [`binrw::Endian`].
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq)]
#[brw(magic = b"QAR\0")]
pub struct QarHeader {
    /// Format version, always [`QAR_VERSION`]
    pub version: u32,

    /// The number of records in the directory table
    pub entry_count: u32,

    /// Alignment of the data area and of every entry inside it
    pub alignment: u32,

    /// Size of the name block including terminators
    pub names_size: u32,

    /// Offset from the start of the file to the first byte of the data area
    pub data_start: u32,
}

impl Default for QarHeader {
    fn default() -> Self {
        Self {
            version: QAR_VERSION,
            entry_count: 0,
            alignment: 16,
            names_size: 0,
            data_start: HEADER_SIZE,
        }
    }
}

impl QarHeader {
    /// Offset of the name block, right after the directory table
    pub fn names_start(&self) -> u64 {
        HEADER_SIZE as u64 + self.entry_count as u64 * RECORD_SIZE as u64
    }
}

/// QAR directory record
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
pub struct QarRecord {
    /// A [`crc::CRC_32_BZIP2`] checksum of the record's name
    pub name_hash: u32,

    /// The offset from the start of the name block for this record's name
    pub name_offset: u32,

    /// The offset to the data for this record from the start of the file
    pub data_offset: u32,

    /// The size of this record's data inside the container
    pub stored_size: u32,

    /// The size of this record's data once decompressed
    pub size: u32,

    /// The compression type used to store this record's data
    pub compression: CompressionMethod,
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::{BinRead, BinWrite, Endian};
    use pretty_assertions::assert_eq;

    use crate::compression::CompressionMethod;
    use crate::error::Result;
    use crate::types::{QarHeader, QarRecord};

    #[test]
    fn read_big_endian_header() -> Result<()> {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            0x51, 0x41, 0x52, 0x00,
            0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x10,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x18,
        ]);

        assert_eq!(
            QarHeader::read_options(&mut input, Endian::Big, ())?,
            QarHeader::default()
        );

        Ok(())
    }

    #[test]
    fn write_little_endian_header() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            0x51, 0x41, 0x52, 0x00,
            0x01, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00,
            0x10, 0x00, 0x00, 0x00,
            0x14, 0x00, 0x00, 0x00,
            0x60, 0x00, 0x00, 0x00,
        ];

        let header = QarHeader {
            entry_count: 2,
            names_size: 20,
            data_start: 0x60,
            ..Default::default()
        };

        let mut actual = Vec::new();
        header.write_options(&mut Cursor::new(&mut actual), Endian::Little, ())?;

        assert_eq!(actual, expected);

        Ok(())
    }

    #[test]
    fn read_invalid_magic() {
        let mut input = Cursor::new(b"EERT5000\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0".to_vec());
        assert!(QarHeader::read_options(&mut input, Endian::Big, ()).is_err());
    }

    #[test]
    fn record_round_trip_big_endian() -> Result<()> {
        #[rustfmt::skip]
        let bytes = vec![
            0x52, 0x7E, 0x30, 0xAA,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x40,
            0x00, 0x00, 0x00, 0x13,
            0x00, 0x00, 0x00, 0x0B,
            0x00, 0x00, 0x00, 0x02,
        ];

        let record = QarRecord::read_options(&mut Cursor::new(&bytes), Endian::Big, ())?;
        assert_eq!(
            record,
            QarRecord {
                name_hash: 0x527E30AA,
                name_offset: 0,
                data_offset: 0x40,
                stored_size: 0x13,
                size: 0x0B,
                compression: CompressionMethod::Zlib,
            }
        );

        let mut actual = Vec::new();
        record.write_options(&mut Cursor::new(&mut actual), Endian::Big, ())?;
        assert_eq!(actual, bytes);

        Ok(())
    }

    #[test]
    fn unknown_compression_is_rejected() {
        #[rustfmt::skip]
        let bytes = vec![
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x07,
        ];

        assert!(QarRecord::read_options(&mut Cursor::new(&bytes), Endian::Big, ()).is_err());
    }
}
