//! An editing session over one stage package.
//!
//! Loading copies the package into a working directory, decrypting it for titles that encrypt
//! their packages, unpacks every container and opens the geometry through its `.edit` copy.
//! Saving reverses each step.

use std::fs;
use std::path::{Path, PathBuf};

use miette::{miette, Context as _, IntoDiagnostic, Result};
use stage_archive::crypt::{decrypt_package, encrypt_package, stage_key};
use stage_archive::{pack, scan, unpack, Cancellation, FileKind, StageTree};
use stage_codec::{Context, Title};
use stage_geom::GeomFile;
use stage_txn::TextureLibrary;
use tracing::{info, instrument, warn};

/// Working directory used when none is configured
pub const DEFAULT_WORK_DIR: &str = "stage";

#[derive(Debug)]
pub struct Session {
    title: Title,
    work_dir: PathBuf,
    tree: StageTree,
    geom: Option<GeomFile>,
    cancel: Cancellation,
}

impl Session {
    pub fn new(work_dir: impl Into<PathBuf>, title: Title) -> Session {
        Session {
            title,
            work_dir: work_dir.into(),
            tree: StageTree::default(),
            geom: None,
            cancel: Cancellation::new(),
        }
    }

    /// Pick up a working directory unpacked by an earlier session
    ///
    /// The geometry is not opened.
    #[instrument(skip(work_dir), fields(work_dir = %work_dir.as_ref().display()))]
    pub fn resume(work_dir: impl AsRef<Path>, title: Title) -> Result<Session> {
        let mut session = Session::new(work_dir.as_ref(), title);
        session.tree = scan(&session.work_dir)
            .wrap_err_with(|| format!("scanning {}", session.work_dir.display()))?;
        Ok(session)
    }

    pub fn title(&self) -> Title {
        self.title
    }

    pub fn context(&self) -> Context {
        Context::new(self.title)
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn tree(&self) -> &StageTree {
        &self.tree
    }

    pub fn geom(&self) -> Option<&GeomFile> {
        self.geom.as_ref()
    }

    pub fn geom_mut(&mut self) -> Option<&mut GeomFile> {
        self.geom.as_mut()
    }

    /// A handle that cancels the running load or save between files
    pub fn cancellation(&self) -> Cancellation {
        self.cancel.clone()
    }

    /// Close the geometry and recreate an empty working directory
    #[instrument(skip(self), fields(work_dir = %self.work_dir.display()))]
    pub fn reset(&mut self) -> Result<()> {
        if let Some(geom) = self.geom.take() {
            geom.close()?;
        }
        self.tree = StageTree::default();

        if self.work_dir.exists() {
            fs::remove_dir_all(&self.work_dir)
                .into_diagnostic()
                .wrap_err_with(|| format!("removing {}", self.work_dir.display()))?;
        }
        fs::create_dir_all(&self.work_dir)
            .into_diagnostic()
            .wrap_err_with(|| format!("creating {}", self.work_dir.display()))?;

        Ok(())
    }

    /// Fail when `path` is the working directory or lies inside it, since a reset would delete it
    fn ensure_outside(&self, path: &Path) -> Result<()> {
        if !self.work_dir.exists() {
            return Ok(());
        }

        let work_dir = self.work_dir.canonicalize().into_diagnostic()?;
        if path.starts_with(&work_dir) {
            return Err(miette!(
                help = "pick a working directory outside the package",
                "{} is inside the working directory {}",
                path.display(),
                work_dir.display()
            ));
        }
        Ok(())
    }

    /// Load the package in `source` into a fresh working directory
    #[instrument(skip(self), err)]
    pub fn load(&mut self, source: &Path) -> Result<()> {
        let source = source
            .canonicalize()
            .into_diagnostic()
            .wrap_err_with(|| format!("opening {}", source.display()))?;

        self.ensure_outside(&source)?;
        self.reset()?;
        let ctx = self.context();

        info!("loading {} as {}", source.display(), self.title);
        decrypt_package(&source, &self.work_dir, self.title, &self.cancel)
            .wrap_err("bringing the package into the working directory")?;
        self.tree = unpack(&self.work_dir, ctx, &self.cancel).wrap_err("unpacking")?;

        match self.tree.by_kind(FileKind::Geom).next() {
            Some(file) => {
                let geom = GeomFile::open_edit(&file.path, ctx)
                    .wrap_err_with(|| format!("parsing {}", file.name))?;
                info!(
                    "{}: {} meshes, {} references, {} props",
                    file.name,
                    geom.meshes.len(),
                    geom.references.len(),
                    geom.props.len()
                );
                self.geom = Some(geom);
            }
            None => warn!("no geometry file in the package"),
        }

        Ok(())
    }

    /// Write the geometry back, pack the working directory and store the package in `dest`
    ///
    /// The package key is derived from `dest`, which must be named like the stage. Returns the
    /// package files written.
    #[instrument(skip(self), err)]
    pub fn save(&mut self, dest: &Path) -> Result<Vec<PathBuf>> {
        let ctx = self.context();

        fs::create_dir_all(dest)
            .into_diagnostic()
            .wrap_err_with(|| format!("creating {}", dest.display()))?;
        let dest = dest.canonicalize().into_diagnostic()?;
        self.ensure_outside(&dest)?;

        // The edit copy must not be in place while the working directory is read
        let reopen = match self.geom.take() {
            Some(geom) => {
                geom.save(false).wrap_err("saving the geometry")?;
                let source = geom.source().to_path_buf();
                geom.close()?;
                Some(source)
            }
            None => None,
        };

        let rebuilt = pack(&self.work_dir, ctx, &self.cancel).wrap_err("packing")?;
        info!("rebuilt {} containers", rebuilt.len());

        let key = stage_key(&dest)?;
        let written = encrypt_package(&self.work_dir, &dest, &key, self.title, &self.cancel)
            .wrap_err("writing the package")?;

        if let Some(source) = reopen {
            self.geom = Some(GeomFile::open_edit(&source, ctx)?);
        }

        Ok(written)
    }

    /// Every payload store and texture info dictionary of the working directory
    pub fn textures(&self) -> Result<TextureLibrary> {
        Ok(TextureLibrary::from_tree(&self.tree, self.context())?)
    }

    /// The slot dictionaries of the working directory
    pub fn txn_paths(&self) -> Vec<PathBuf> {
        self.tree
            .by_kind(FileKind::Txn)
            .map(|f| f.path.clone())
            .collect()
    }
}
