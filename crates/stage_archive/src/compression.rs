//! Entry compression and decompression handling.

use std::io::{self, Read, Seek, Write};

use binrw::{BinRead, BinWrite};
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{Error, Result};

/// Identifies the storage format used for an entry inside a QAR container
///
/// Files added to a container choose their method via [`crate::write::QarWriter::start_file`].
#[derive(
    BinRead, BinWrite, Serialize, Deserialize, Debug, Copy, Clone, Default, PartialEq, Eq, Hash,
)]
#[brw(repr=u32)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMethod {
    /// Stores the data as it is
    #[default]
    None = 0,

    /// Compress the data using Zlib
    Zlib = 2,
}

impl TryFrom<u32> for CompressionMethod {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(CompressionMethod::None),
            2 => Ok(CompressionMethod::Zlib),
            other => Err(Error::corrupt(
                "entry",
                format!("unknown compression method {other}"),
            )),
        }
    }
}

pub(crate) enum BlockReader<'a, R: Read + Seek> {
    Raw(io::Take<&'a mut R>),
    Compressed(Box<ZlibDecoder<io::Take<&'a mut R>>>),
}

impl<'a, R: Read + Seek> BlockReader<'a, R> {
    #[instrument(skip(reader))]
    pub fn new(
        reader: &'a mut R,
        start: u64,
        limit: u64,
        compression: CompressionMethod,
    ) -> Result<Self> {
        reader.seek(io::SeekFrom::Start(start))?;

        let limit_reader = reader.by_ref().take(limit);
        Ok(match compression {
            CompressionMethod::None => BlockReader::Raw(limit_reader),
            CompressionMethod::Zlib => {
                BlockReader::Compressed(Box::new(ZlibDecoder::new(limit_reader)))
            }
        })
    }
}

impl<R: Read + Seek> Read for BlockReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            BlockReader::Raw(r) => r.read(buf),
            BlockReader::Compressed(r) => r.read(buf),
        }
    }

    fn read_to_end(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        match self {
            BlockReader::Raw(r) => r.read_to_end(buf),
            BlockReader::Compressed(r) => r.read_to_end(buf),
        }
    }
}

pub(crate) enum BlockWriter<W: Write> {
    Raw(W, usize),
    Compressed(Box<ZlibEncoder<W>>),
}

impl<W: Write> BlockWriter<W> {
    #[instrument(skip(writer))]
    pub fn new(writer: W, compression: CompressionMethod) -> Self {
        match compression {
            CompressionMethod::None => BlockWriter::Raw(writer, 0),
            CompressionMethod::Zlib => BlockWriter::Compressed(Box::new(ZlibEncoder::new(
                writer,
                Compression::default(),
            ))),
        }
    }

    #[instrument(skip(self), err)]
    pub fn finalize(self) -> io::Result<W> {
        match self {
            BlockWriter::Raw(w, _) => Ok(w),
            BlockWriter::Compressed(w) => w.finish(),
        }
    }

    pub fn total_in(&self) -> u64 {
        match self {
            BlockWriter::Raw(_, c) => *c as u64,
            BlockWriter::Compressed(w) => w.total_in(),
        }
    }
}

impl<W: Write> Write for BlockWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            BlockWriter::Raw(w, c) => {
                let written = w.write(buf)?;
                *c += written;
                Ok(written)
            }
            BlockWriter::Compressed(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            BlockWriter::Raw(w, _) => w.flush(),
            BlockWriter::Compressed(w) => w.flush(),
        }
    }
}

/// Inflate a complete zlib stream
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    ZlibDecoder::new(data).read_to_end(&mut buffer)?;
    Ok(buffer)
}

/// Deflate `data` into a zlib stream with the default level
pub fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut block = BlockWriter::new(Vec::new(), CompressionMethod::Zlib);
    block.write_all(data)?;
    Ok(block.finalize()?)
}
