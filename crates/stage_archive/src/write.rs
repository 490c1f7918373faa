//! Types for writing QAR containers
//!

use binrw::BinWrite;
use bon::Builder;
use stage_codec::{align_up, Context, WriteCodecExt};
use stage_dict::str_code;
use std::io::{self, Cursor, Write};
use tracing::{instrument, Level};

use crate::compression::{BlockWriter, CompressionMethod};
use crate::error::{Error, Result};
use crate::types::{QarHeader, QarRecord, HEADER_SIZE, RECORD_SIZE};

/// Options for how the QAR file should be written
#[derive(Debug, Clone, Copy, Builder)]
pub struct QarWriterOptions {
    /// Alignment of the data area and of each entry, must be a power of two
    #[builder(default = 16)]
    pub alignment: u32,

    /// Codec context deciding the byte order of the header and directory
    #[builder(default)]
    pub context: Context,
}

struct PendingEntry {
    name: String,
    compression: CompressionMethod,
    size: u32,
    stored: Vec<u8>,
}

/// QAR container generator
///
/// Entries are buffered until [`QarWriter::finish`], since the directory table has to precede
/// the data area.
///
/// ```
/// # fn doit() -> stage_archive::error::Result<()>
/// # {
/// use std::io::Write;
/// use stage_archive::{write::QarWriterOptions, CompressionMethod, QarWriter};
///
/// let mut qar = QarWriter::new(Vec::new(), QarWriterOptions::builder().alignment(32).build());
///
/// qar.start_file("hello_world.txt", CompressionMethod::Zlib)?;
/// qar.write_all(b"Hello, World!")?;
///
/// let bytes = qar.finish()?;
/// # assert_eq!(&bytes[..4], b"QAR\0");
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub struct QarWriter<W: Write> {
    inner: W,
    options: QarWriterOptions,
    entries: Vec<PendingEntry>,
    current: Option<(String, CompressionMethod, BlockWriter<Vec<u8>>)>,
}

fn to_u32(value: u64, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::corrupt("qar", format!("{what} exceeds 4 GiB")))
}

impl<W: Write> QarWriter<W> {
    /// Initializes the container
    ///
    /// Before writing to this object, [`QarWriter::start_file`] should be called.
    pub fn new(inner: W, options: QarWriterOptions) -> QarWriter<W> {
        QarWriter {
            inner,
            options,
            entries: Vec::new(),
            current: None,
        }
    }

    /// Returns true if a file is currently open for writing
    pub const fn is_writing_file(&self) -> bool {
        self.current.is_some()
    }

    /// Start a new file with the requested compression
    #[instrument(skip(self, name), err)]
    pub fn start_file(&mut self, name: impl ToString, compression: CompressionMethod) -> Result<()> {
        self.finish_file()?;
        self.current = Some((
            name.to_string(),
            compression,
            BlockWriter::new(Vec::new(), compression),
        ));

        Ok(())
    }

    /// Add an entry from bytes already stored in the container format
    ///
    /// Used to carry compressed entries over from an existing container without recompressing
    /// them, which keeps the output identical to the source.
    #[instrument(skip(self, name, stored), err, fields(stored = stored.len()))]
    pub fn raw_copy_file(
        &mut self,
        name: impl ToString,
        compression: CompressionMethod,
        size: u64,
        stored: Vec<u8>,
    ) -> Result<()> {
        self.finish_file()?;
        self.entries.push(PendingEntry {
            name: name.to_string(),
            compression,
            size: to_u32(size, "entry size")?,
            stored,
        });

        Ok(())
    }

    fn finish_file(&mut self) -> Result<()> {
        let Some((name, compression, block)) = self.current.take() else {
            return Ok(());
        };

        let size = to_u32(block.total_in(), "entry size")?;
        self.entries.push(PendingEntry {
            name,
            compression,
            size,
            stored: block.finalize()?,
        });

        Ok(())
    }

    /// Finish the last file and write the complete container
    #[instrument(skip(self), err)]
    pub fn finish(mut self) -> Result<W> {
        self.finish_file()?;

        let endian = self.options.context.endian();
        let alignment = self.options.alignment as u64;
        if !self.options.alignment.is_power_of_two() {
            return Err(Error::corrupt(
                "qar",
                format!("alignment {alignment} is not a power of two"),
            ));
        }

        let mut names = Vec::new();
        let mut name_offsets = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            name_offsets.push(to_u32(names.len() as u64, "name block")?);
            names.extend_from_slice(entry.name.as_bytes());
            names.push(0);
        }

        let names_start =
            HEADER_SIZE as u64 + self.entries.len() as u64 * RECORD_SIZE as u64;
        let names_end = names_start + names.len() as u64;
        let data_start = align_up(names_end, alignment);

        let header = QarHeader {
            entry_count: to_u32(self.entries.len() as u64, "entry count")?,
            alignment: self.options.alignment,
            names_size: to_u32(names.len() as u64, "name block")?,
            data_start: to_u32(data_start, "data area")?,
            ..Default::default()
        };

        let mut directory = Cursor::new(Vec::new());
        header.write_options(&mut directory, endian, ())?;

        let mut offset = data_start;
        let mut offsets = Vec::with_capacity(self.entries.len());
        for (entry, name_offset) in self.entries.iter().zip(name_offsets) {
            offset = align_up(offset, alignment);
            offsets.push(offset);

            QarRecord {
                name_hash: str_code(&entry.name),
                name_offset,
                data_offset: to_u32(offset, "data offset")?,
                stored_size: to_u32(entry.stored.len() as u64, "entry size")?,
                size: entry.size,
                compression: entry.compression,
            }
            .write_options(&mut directory, endian, ())?;

            offset += entry.stored.len() as u64;
        }

        self.inner.write_all(directory.get_ref())?;
        self.inner.write_all(&names)?;
        self.inner.write_zeros((data_start - names_end) as usize)?;

        let mut position = data_start;
        for (entry, start) in self.entries.iter().zip(offsets) {
            self.inner.write_zeros((start - position) as usize)?;
            self.inner.write_all(&entry.stored)?;
            position = start + entry.stored.len() as u64;
        }

        Ok(self.inner)
    }
}

impl<W: Write> Write for QarWriter<W> {
    #[instrument(skip_all, err, ret(level = Level::TRACE), fields(size=buf.len()))]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.current.as_mut() {
            Some((_, _, block)) => block.write(buf),
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                "No file has been started",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod test {
    use std::io::{Cursor, Read, Write};

    use pretty_assertions::{assert_eq, assert_str_eq};
    use stage_codec::{Context, Title};
    use tracing_test::traced_test;

    use crate::error::Result;
    use crate::{
        compression::CompressionMethod,
        read::QarArchive,
        write::{QarWriter, QarWriterOptions},
    };

    #[traced_test]
    #[test]
    fn qar_empty_write() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            0x51, 0x41, 0x52, 0x00,
            0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x10,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x20,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];

        let writer = QarWriter::new(Vec::new(), QarWriterOptions::builder().build());
        let result = writer.finish()?;
        assert_str_eq!(format!("{:02X?}", result), format!("{:02X?}", expected));

        Ok(())
    }

    #[traced_test]
    #[test]
    fn qar_uncompressed_entry_write() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            // Header
            0x51, 0x41, 0x52, 0x00,
            0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x10,
            0x00, 0x00, 0x00, 0x0A,
            0x00, 0x00, 0x00, 0x40,
            // Records
            0x52, 0x7E, 0x30, 0xAA,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x40,
            0x00, 0x00, 0x00, 0x0B,
            0x00, 0x00, 0x00, 0x0B,
            0x00, 0x00, 0x00, 0x00,
            // Names
            0x68, 0x65, 0x6C, 0x6C, 0x6F, 0x2E, 0x74, 0x78, 0x74, 0x00,
            // Padding
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            // Data
            0x48, 0x65, 0x6C, 0x6C, 0x6F, 0x20, 0x57, 0x6F, 0x72, 0x6C, 0x64,
        ];

        let mut writer = QarWriter::new(
            Vec::new(),
            QarWriterOptions::builder()
                .context(Context::new(Title::Mgs4))
                .build(),
        );
        writer.start_file("hello.txt", CompressionMethod::None)?;
        writer.write_all(b"Hello World")?;

        let result = writer.finish()?;
        assert_str_eq!(format!("{:02X?}", result), format!("{:02X?}", expected));

        Ok(())
    }

    #[traced_test]
    #[test]
    fn qar_mixed_entries_read_back() -> Result<()> {
        let ctx = Context::new(Title::Mga);
        let mut writer = QarWriter::new(
            Vec::new(),
            QarWriterOptions::builder().alignment(64).context(ctx).build(),
        );

        writer.start_file("hello.txt", CompressionMethod::Zlib)?;
        writer.write_all(b"Hello World")?;
        writer.start_file("sub/world.txt", CompressionMethod::None)?;
        writer.write_all(b"World Hello")?;

        let bytes = writer.finish()?;
        let mut archive = QarArchive::new(Cursor::new(bytes), ctx)?;
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.alignment(), 64);

        let mut buffer = Vec::new();
        let mut first = archive.by_index(0)?;
        assert_eq!(first.compression_method(), CompressionMethod::Zlib);
        assert_eq!(first.data_start() % 64, 0);
        first.read_to_end(&mut buffer)?;
        assert_eq!(buffer, b"Hello World".to_vec());

        buffer.clear();
        let mut second = archive.by_name("sub/world.txt")?;
        assert_eq!(second.data_start() % 64, 0);
        second.read_to_end(&mut buffer)?;
        assert_eq!(buffer, b"World Hello".to_vec());

        Ok(())
    }

    #[test]
    fn raw_copy_keeps_stored_bytes() -> Result<()> {
        let ctx = Context::new(Title::Mgo2);
        let stored = crate::compression::deflate(b"payload")?;

        let mut writer = QarWriter::new(Vec::new(), QarWriterOptions::builder().build());
        writer.raw_copy_file("a.bin", CompressionMethod::Zlib, 7, stored.clone())?;
        let bytes = writer.finish()?;

        let mut archive = QarArchive::new(Cursor::new(bytes), ctx)?;
        assert_eq!(archive.raw_by_index(0)?, stored);
        assert_eq!(archive.metadata(0)?.size, 7);

        Ok(())
    }

    #[test]
    fn write_without_file_fails() {
        let mut writer = QarWriter::new(Vec::new(), QarWriterOptions::builder().build());
        assert!(writer.write_all(b"data").is_err());
    }
}
