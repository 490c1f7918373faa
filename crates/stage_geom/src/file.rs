//! A geometry file opened for editing.
//!

use std::{
    fs::{self, File},
    io::{Read, Write},
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
};

use stage_codec::Context;
use tempfile::NamedTempFile;
use tracing::{info, instrument, warn};

use crate::error::{Error, Result};
use crate::geom::Geom;

/// Path of the working copy made for `source`, `stage.geom` becomes `stage.geom.edit`
pub fn edit_copy_path(source: &Path) -> PathBuf {
    let mut name = source.file_name().unwrap_or_default().to_os_string();
    name.push(".edit");
    source.with_file_name(name)
}

/// Write `geom` to `dest` through a temporary file in the same directory
///
/// `dest` is only replaced once the complete file has been written.
#[instrument(skip(geom, ctx), err)]
pub fn write_geom(geom: &Geom, dest: &Path, ctx: Context, reference_only: bool) -> Result<()> {
    let bytes = if reference_only {
        geom.reference_only().to_bytes(ctx)?
    } else {
        geom.to_bytes(ctx)?
    };

    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(&bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(dest)?;

    info!("wrote {} bytes", bytes.len());
    Ok(())
}

/// Geometry parsed from disk, holding its file open until [`GeomFile::close`]
///
/// [`GeomFile::open_edit`] works on a `.edit` copy next to the source so the unpacked asset is only
/// touched by [`GeomFile::save`]. The copy is removed when the file is closed or dropped.
#[derive(Debug)]
pub struct GeomFile {
    geom: Geom,
    ctx: Context,
    source: PathBuf,
    opened: PathBuf,
    handle: Option<File>,
    owns_copy: bool,
}

impl GeomFile {
    /// Open and parse `path` directly
    #[instrument(skip(ctx), err)]
    pub fn open(path: &Path, ctx: Context) -> Result<GeomFile> {
        Self::open_from(path, path, ctx, false)
    }

    /// Copy `source` to its edit path, then open and parse the copy
    #[instrument(skip(ctx), err)]
    pub fn open_edit(source: &Path, ctx: Context) -> Result<GeomFile> {
        let copy = edit_copy_path(source);
        fs::copy(source, &copy)?;

        Self::open_from(source, &copy, ctx, true).inspect_err(|_| {
            let _ = fs::remove_file(&copy);
        })
    }

    fn open_from(source: &Path, opened: &Path, ctx: Context, owns_copy: bool) -> Result<GeomFile> {
        let mut handle = File::open(opened)?;
        let mut data = Vec::new();
        handle.read_to_end(&mut data)?;

        let geom = Geom::parse(&data, ctx)?;
        Ok(GeomFile {
            geom,
            ctx,
            source: source.to_path_buf(),
            opened: opened.to_path_buf(),
            handle: Some(handle),
            owns_copy,
        })
    }

    /// The asset this geometry was loaded from
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// The file that is held open, the edit copy when opened with [`GeomFile::open_edit`]
    pub fn opened_path(&self) -> &Path {
        &self.opened
    }

    pub fn context(&self) -> Context {
        self.ctx
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Parse `path` and merge it into this geometry
    ///
    /// The other file is only held open while it is read.
    pub fn merge_file(&mut self, path: &Path, references_only: bool) -> Result<()> {
        self.ensure_open()?;

        let other = GeomFile::open(path, self.ctx)?;
        if references_only {
            self.geom.merge_references(&other)?;
        } else {
            self.geom.merge(&other)?;
        }
        other.close()
    }

    /// Write the geometry back to its source asset
    pub fn save(&self, reference_only: bool) -> Result<()> {
        self.save_as(&self.source, reference_only)
    }

    /// Write the geometry to `dest`
    pub fn save_as(&self, dest: &Path, reference_only: bool) -> Result<()> {
        self.ensure_open()?;
        write_geom(&self.geom, dest, self.ctx, reference_only)
    }

    /// Release the file handle and remove the edit copy
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.handle.is_none() {
            return Err(Error::Closed(self.opened.display().to_string()));
        }
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        if self.handle.take().is_some() && self.owns_copy && self.opened.exists() {
            fs::remove_file(&self.opened)?;
        }
        Ok(())
    }

    /// Consume the file, keeping only the parsed geometry
    pub fn into_geom(mut self) -> Result<Geom> {
        self.release()?;
        Ok(std::mem::take(&mut self.geom))
    }
}

impl Deref for GeomFile {
    type Target = Geom;

    fn deref(&self) -> &Geom {
        &self.geom
    }
}

impl DerefMut for GeomFile {
    fn deref_mut(&mut self) -> &mut Geom {
        &mut self.geom
    }
}

impl Drop for GeomFile {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("unable to remove {}: {e}", self.opened.display());
        }
    }
}
