//! Types for reading QAR containers
//!

use binrw::BinRead;
use indexmap::IndexMap;
use stage_codec::{align_up, Context, ReadCodecExt};
use stage_dict::str_code;
use std::{
    fmt::{self, Debug},
    io::{Read, Seek, SeekFrom},
};
use tracing::{debug, instrument};

use crate::{
    compression::{BlockReader, CompressionMethod},
    error::{Error, FileNotFoundError, Result},
    types::{QarHeader, QarRecord, HEADER_SIZE, QAR_VERSION},
};

/// A struct for reading an entry from a QAR container
pub struct QarFile<'a, R: Read + Seek> {
    data: &'a QarFileData,
    reader: BlockReader<'a, R>,
}

impl<'a, R: Read + Seek> Debug for QarFile<'a, R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "QarFile({:#?})", self.data)
    }
}

impl<'a, R: Read + Seek> QarFile<'a, R> {
    /// Get the name of the file
    ///
    /// # Warnings
    ///
    /// Names may contain `/` separated sub paths. Callers extracting entries must make sure
    /// the joined path does not escape the destination directory.
    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// Get the size of the file, in bytes, in the container
    pub fn stored_size(&self) -> u64 {
        self.data.stored_size
    }

    /// Get the size of the file, in bytes, when decompressed
    pub fn size(&self) -> u64 {
        self.data.size
    }

    /// Get the starting offset of the stored data
    pub fn data_start(&self) -> u64 {
        self.data.data_start
    }

    /// Get the compression method used for this file
    pub fn compression_method(&self) -> CompressionMethod {
        self.data.compression
    }
}

impl<R: Read + Seek> Read for QarFile<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

/// Structure representing a QAR directory entry
#[derive(Debug, Clone, Default)]
pub struct QarFileData {
    /// Name of the file
    pub name: Box<str>,
    /// Method of storing the file in the container
    pub compression: CompressionMethod,
    /// Size of the file in the container
    pub stored_size: u64,
    /// Size of the file when extracted
    pub size: u64,
    /// Where the stored data of the file starts
    pub data_start: u64,
}

/// QAR container reader
///
/// ```no_run
/// use std::io::prelude::*;
///
/// fn list_qar_contents(reader: impl Read + Seek) -> stage_archive::error::Result<()> {
///     let ctx = stage_codec::Context::new(stage_codec::Title::Mgo2);
///     let mut qar = stage_archive::QarArchive::new(reader, ctx)?;
///
///     for i in 0..qar.len() {
///         let mut file = qar.by_index(i)?;
///         println!("Filename: {}", file.name());
///         std::io::copy(&mut file, &mut std::io::stdout())?;
///     }
///
///     Ok(())
/// }
/// ```
pub struct QarArchive<R> {
    reader: R,
    header: QarHeader,
    files: IndexMap<Box<str>, QarFileData>,
}

impl<R: Read + Seek> QarArchive<R> {
    /// Read a QAR container collecting the files it contains
    ///
    /// Any inconsistency in the directory table is reported as [`Error::CorruptArchive`].
    #[instrument(skip(reader))]
    pub fn new(mut reader: R, ctx: Context) -> Result<QarArchive<R>> {
        let (header, files) = Self::get_metadata(&mut reader, ctx).map_err(|e| match e {
            Error::CorruptArchive { .. } => e,
            other => Error::corrupt("qar", other),
        })?;

        debug!("found {} entries", files.len());

        Ok(QarArchive {
            reader,
            header,
            files,
        })
    }

    /// Number of entries contained in this container
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether this container has no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Alignment of the data area
    pub fn alignment(&self) -> u32 {
        self.header.alignment
    }

    /// Returns an iterator over all the file names in this container
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(|s| s.as_ref())
    }

    /// Get the index of a file entry by name, if it's present
    #[inline(always)]
    pub fn index_for_name(&self, name: &str) -> Option<usize> {
        self.files.get_index_of(name)
    }

    /// Metadata of an entry by index
    pub fn metadata(&self, index: usize) -> Result<&QarFileData> {
        self.files
            .get_index(index)
            .map(|(_, data)| data)
            .ok_or(Error::FileNotFound(FileNotFoundError::Index(index)))
    }

    /// Search for a file entry by name
    pub fn by_name(&mut self, name: &str) -> Result<QarFile<'_, R>> {
        let Some(index) = self.files.get_index_of(name) else {
            return Err(Error::FileNotFound(FileNotFoundError::Name(
                name.to_owned(),
            )));
        };
        self.by_index(index)
    }

    /// Get a contained file by index, decompressing on read
    pub fn by_index(&mut self, index: usize) -> Result<QarFile<'_, R>> {
        let (_, data) = self
            .files
            .get_index(index)
            .ok_or(Error::FileNotFound(FileNotFoundError::Index(index)))?;

        Ok(QarFile {
            data,
            reader: BlockReader::new(
                &mut self.reader,
                data.data_start,
                data.stored_size,
                data.compression,
            )?,
        })
    }

    /// Read the stored bytes of an entry exactly as they appear in the container
    pub fn raw_by_index(&mut self, index: usize) -> Result<Vec<u8>> {
        let data = self.metadata(index)?;
        let (start, len) = (data.data_start, data.stored_size as usize);

        self.reader.seek(SeekFrom::Start(start))?;
        Ok(self.reader.read_bytes(len)?)
    }

    /// Unwrap and return the inner reader object
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn get_metadata(
        reader: &mut R,
        ctx: Context,
    ) -> Result<(QarHeader, IndexMap<Box<str>, QarFileData>)> {
        let endian = ctx.endian();
        let file_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let header = QarHeader::read_options(reader, endian, ())?;
        if header.version != QAR_VERSION {
            return Err(Error::corrupt(
                "qar",
                format!("unsupported version {}", header.version),
            ));
        }
        if !header.alignment.is_power_of_two() {
            return Err(Error::corrupt(
                "qar",
                format!("alignment {} is not a power of two", header.alignment),
            ));
        }

        let names_start = header.names_start();
        let names_end = names_start + header.names_size as u64;
        if names_end > file_len || (header.data_start as u64) < names_end {
            return Err(Error::corrupt("qar", "name block overlaps the data area"));
        }
        if header.data_start as u64 != align_up(names_end, header.alignment as u64) {
            return Err(Error::corrupt("qar", "data area is not aligned"));
        }

        reader.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        let records = (0..header.entry_count)
            .map(|_| QarRecord::read_options(reader, endian, ()).map_err(Error::from))
            .collect::<Result<Vec<_>>>()?;

        let names = reader.read_bytes(header.names_size as usize)?;

        let mut files = IndexMap::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            let name = names
                .get(record.name_offset as usize..)
                .and_then(|rest| rest.iter().position(|b| *b == 0).map(|end| &rest[..end]))
                .ok_or_else(|| {
                    Error::corrupt("qar", format!("record {index} name is out of bounds"))
                })?;
            let name = String::from_utf8_lossy(name);

            if str_code(&name) != record.name_hash {
                return Err(Error::corrupt(
                    "qar",
                    format!("record {index} hash does not match {name:?}"),
                ));
            }

            let data_end = record.data_offset as u64 + record.stored_size as u64;
            if (record.data_offset as u64) < header.data_start as u64 || data_end > file_len {
                return Err(Error::corrupt(
                    "qar",
                    format!("data of {name:?} lies outside the file"),
                ));
            }

            let file = QarFileData {
                name: name.as_ref().into(),
                compression: record.compression,
                stored_size: record.stored_size as u64,
                size: record.size as u64,
                data_start: record.data_offset as u64,
            };
            if files.contains_key(&file.name) {
                return Err(Error::corrupt(
                    "qar",
                    format!("record {index} repeats the name {name:?}"),
                ));
            }
            files.insert(file.name.clone(), file);
        }

        Ok((header, files))
    }
}
