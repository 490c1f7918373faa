//! Unpacking a stage package into a working directory and packing it back.
//!
//! Unpacking `dir/foo.qar` writes its entries into `dir/foo_qar/` together with a
//! [`Manifest`]. Containers found inside are unpacked the same way, so the directory tree mirrors
//! the nesting of the package. Packing walks the manifests deepest first and rebuilds every
//! container whose entries changed; untouched containers are left byte for byte as they were.

use std::{
    fs,
    io::{Cursor, Write},
    path::{Component, Path, PathBuf},
};

use stage_codec::Context;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::{
    compression::CompressionMethod,
    crypt::Cancellation,
    dar::DarArchive,
    dlz::{dld_name, unwrap_dlz, wrap_dlz},
    error::{Error, Result},
    kind::{ContainerKind, FileKind},
    manifest::{checksum, Manifest},
    read::QarArchive,
    write::{QarWriter, QarWriterOptions},
};

/// One file of an unpacked stage package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFile {
    /// Name as stored in the package or container
    pub name: String,
    /// Format, derived from the extension
    pub kind: FileKind,
    /// Index of the container this file was unpacked from, `None` for top level files
    pub parent: Option<usize>,
    /// Location in the working directory
    pub path: PathBuf,
}

impl StageFile {
    /// Directory the file unpacks into, for containers
    pub fn unpacked_dir(&self) -> Option<PathBuf> {
        self.kind.container().map(|_| unpacked_dir(&self.path))
    }
}

/// Directory a container at `path` unpacks into, `foo.qar` becomes `foo_qar`
pub fn unpacked_dir(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().replace('.', "_"))
        .unwrap_or_default();
    path.with_file_name(name)
}

/// The files of an unpacked package, with their container relationships
///
/// Parents always come before their children, so the relationships form a forest.
#[derive(Debug, Clone, Default)]
pub struct StageTree {
    root: PathBuf,
    files: Vec<StageFile>,
}

impl StageTree {
    /// Working directory the tree was read from
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[StageFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&StageFile> {
        self.files.get(index)
    }

    /// Files of a given kind, in unpack order
    pub fn by_kind(&self, kind: FileKind) -> impl Iterator<Item = &StageFile> {
        self.files.iter().filter(move |f| f.kind == kind)
    }

    /// First file with the given name
    pub fn find(&self, name: &str) -> Option<&StageFile> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Files unpacked directly from the container at `index`
    pub fn children(&self, index: usize) -> impl Iterator<Item = &StageFile> {
        self.files
            .iter()
            .filter(move |f| f.parent == Some(index))
    }

    /// Number of containers above the file at `index`
    pub fn depth(&self, index: usize) -> usize {
        let mut depth = 0;
        let mut current = self.files.get(index).and_then(|f| f.parent);
        while let Some(parent) = current {
            depth += 1;
            current = self.files.get(parent).and_then(|f| f.parent);
        }
        depth
    }

    fn top_level(root: &Path) -> Result<StageTree> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !entry.file_type().is_file() || name.starts_with('.') {
                continue;
            }

            files.push(StageFile {
                kind: FileKind::from_name(&name),
                name,
                parent: None,
                path: entry.into_path(),
            });
        }

        Ok(StageTree {
            root: root.to_path_buf(),
            files,
        })
    }

    fn push_children(&mut self, parent: usize, dir: &Path, names: Vec<String>) {
        for name in names {
            self.files.push(StageFile {
                kind: FileKind::from_name(&name),
                path: dir.join(&name),
                name,
                parent: Some(parent),
            });
        }
    }
}

fn safe_entry_path(dir: &Path, name: &str, archive: &Path) -> Result<PathBuf> {
    let relative = Path::new(name);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if name.is_empty() || escapes {
        return Err(Error::corrupt(
            archive.display(),
            format!("entry name {name:?} escapes the container"),
        ));
    }

    Ok(dir.join(relative))
}

fn write_entry(dir: &Path, name: &str, data: &[u8], archive: &Path) -> Result<()> {
    let path = safe_entry_path(dir, name, archive)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, data)?;
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Make sure `dir` is free, or was unpacked from the container named `source` before
fn claim_dir(dir: &Path, source: &str) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    match Manifest::load_for(dir, source) {
        Ok(_) => Ok(()),
        Err(Error::MissingManifest(_)) if fs::read_dir(dir)?.next().is_none() => Ok(()),
        Err(Error::MissingManifest(_)) => Err(Error::DirectoryInUse {
            dir: dir.display().to_string(),
            owner: "files that were not unpacked from a container".to_owned(),
        }),
        Err(e) => Err(e),
    }
}

/// Unpack one container into its directory, returning the names of its entries
#[instrument(skip(ctx), err)]
pub fn unpack_container(path: &Path, kind: ContainerKind, ctx: Context) -> Result<Vec<String>> {
    let dir = unpacked_dir(path);
    let source = file_name(path);
    claim_dir(&dir, &source)?;
    fs::create_dir_all(&dir)?;

    let mut manifest = match kind {
        ContainerKind::Qar => {
            let mut qar = QarArchive::new(fs::File::open(path)?, ctx).map_err(|e| match e {
                Error::CorruptArchive { reason, .. } => Error::corrupt(path.display(), reason),
                other => other,
            })?;

            let mut manifest = Manifest::new(kind, qar.alignment());
            let mut buffer = Vec::new();
            for index in 0..qar.len() {
                buffer.clear();
                let mut file = qar.by_index(index)?;
                let name = file.name().to_owned();
                let compression = file.compression_method();
                std::io::copy(&mut file, &mut buffer)?;

                write_entry(&dir, &name, &buffer, path)?;
                manifest.push(name, compression, &buffer);
            }
            manifest
        }
        ContainerKind::Dar => {
            let dar = DarArchive::parse(&fs::read(path)?, ctx).map_err(|e| match e {
                Error::CorruptArchive { reason, .. } => Error::corrupt(path.display(), reason),
                other => other,
            })?;

            let mut manifest = Manifest::new(kind, 4);
            for entry in dar.into_entries() {
                write_entry(&dir, &entry.name, &entry.data, path)?;
                manifest.push(entry.name, CompressionMethod::None, &entry.data);
            }
            manifest
        }
        ContainerKind::Dlz => {
            let name = path
                .file_name()
                .map(|n| dld_name(&n.to_string_lossy()))
                .unwrap_or_default();
            let dld = unwrap_dlz(&fs::read(path)?).map_err(|e| match e {
                Error::CorruptArchive { reason, .. } => Error::corrupt(path.display(), reason),
                other => other,
            })?;

            write_entry(&dir, &name, &dld, path)?;
            let mut manifest = Manifest::new(kind, 0);
            manifest.push(name, CompressionMethod::Zlib, &dld);
            manifest
        }
    };

    manifest.source = source;
    manifest.save(&dir)?;
    debug!("unpacked {} entries", manifest.entries.len());

    Ok(manifest.entries.into_iter().map(|e| e.name).collect())
}

/// Recursively unpack every container found in `root`
///
/// Top level files become [`StageFile`]s without a parent; every container is expanded into its
/// sibling directory and its entries become children of it.
#[instrument(skip(ctx, cancel), err)]
pub fn unpack(root: &Path, ctx: Context, cancel: &Cancellation) -> Result<StageTree> {
    let mut tree = StageTree::top_level(root)?;

    let mut index = 0;
    while index < tree.files.len() {
        let file = &tree.files[index];
        if let Some(kind) = file.kind.container() {
            cancel.check()?;

            let path = file.path.clone();
            info!("unpacking {}", file.name);
            let names = unpack_container(&path, kind, ctx)?;
            tree.push_children(index, &unpacked_dir(&path), names);
        }
        index += 1;
    }

    info!("unpacked {} files", tree.len());
    Ok(tree)
}

/// Rebuild the file tree of an already unpacked working directory from its manifests
#[instrument(err)]
pub fn scan(root: &Path) -> Result<StageTree> {
    let mut tree = StageTree::top_level(root)?;

    let mut index = 0;
    while index < tree.files.len() {
        let file = &tree.files[index];
        if file.kind.container().is_some() {
            let dir = unpacked_dir(&file.path);
            match Manifest::load_for(&dir, &file_name(&file.path)) {
                Ok(manifest) => {
                    let names = manifest.entries.into_iter().map(|e| e.name).collect();
                    tree.push_children(index, &dir, names);
                }
                Err(Error::MissingManifest(_)) => {
                    debug!("{} was never unpacked", file.name);
                }
                Err(e) => return Err(e),
            }
        }
        index += 1;
    }

    Ok(tree)
}

/// Build the bytes of a container from its unpacked directory
///
/// Returns `None` when no entry changed since unpacking and the original container is still in
/// place, in which case it can be kept as is.
#[instrument(skip(ctx), err)]
pub fn pack_container(path: &Path, ctx: Context) -> Result<Option<Vec<u8>>> {
    let dir = unpacked_dir(path);
    let manifest = Manifest::load_for(&dir, &file_name(path))?;

    let mut contents = Vec::with_capacity(manifest.entries.len());
    let mut changed = Vec::with_capacity(manifest.entries.len());
    for entry in &manifest.entries {
        let data = fs::read(safe_entry_path(&dir, &entry.name, path)?)?;
        changed.push(checksum(&data) != entry.crc32);
        contents.push(data);
    }

    if path.is_file() && !changed.iter().any(|c| *c) {
        return Ok(None);
    }

    let bytes = match manifest.kind {
        ContainerKind::Qar => {
            let mut original = match fs::File::open(path) {
                Ok(file) => QarArchive::new(file, ctx).ok(),
                Err(_) => None,
            };

            let mut writer = QarWriter::new(
                Cursor::new(Vec::new()),
                QarWriterOptions::builder()
                    .alignment(manifest.alignment)
                    .context(ctx)
                    .build(),
            );

            for ((entry, data), changed) in manifest.entries.iter().zip(contents).zip(changed) {
                let reusable = match (&mut original, changed, entry.compression) {
                    (Some(qar), false, CompressionMethod::Zlib) => qar
                        .index_for_name(&entry.name)
                        .map(|index| qar.raw_by_index(index))
                        .transpose()?,
                    _ => None,
                };

                match reusable {
                    Some(stored) => {
                        writer.raw_copy_file(&entry.name, entry.compression, data.len() as u64, stored)?
                    }
                    None => {
                        writer.start_file(&entry.name, entry.compression)?;
                        writer.write_all(&data)?;
                    }
                }
            }

            writer.finish()?.into_inner()
        }
        ContainerKind::Dar => {
            let mut dar = DarArchive::default();
            for (entry, data) in manifest.entries.iter().zip(contents) {
                dar.push(entry.name.clone(), data);
            }
            dar.write(Vec::new(), ctx)?
        }
        ContainerKind::Dlz => {
            let dld = contents.into_iter().next().ok_or_else(|| {
                Error::corrupt(path.display(), "manifest lists no payload store")
            })?;
            wrap_dlz(&dld)?
        }
    };

    Ok(Some(bytes))
}

/// Pack every unpacked container of a working directory back into place, deepest first
///
/// Returns the paths of the containers that were rebuilt.
#[instrument(skip(ctx, cancel), err)]
pub fn pack(root: &Path, ctx: Context, cancel: &Cancellation) -> Result<Vec<PathBuf>> {
    let tree = scan(root)?;

    let mut containers = (0..tree.len())
        .filter(|i| {
            tree.files[*i].kind.container().is_some()
                && unpacked_dir(&tree.files[*i].path).is_dir()
        })
        .collect::<Vec<_>>();
    containers.sort_by_key(|i| std::cmp::Reverse(tree.depth(*i)));

    let mut rebuilt = Vec::new();
    for index in containers {
        cancel.check()?;

        let file = &tree.files[index];
        match pack_container(&file.path, ctx)? {
            Some(bytes) => {
                info!("packing {}", file.name);
                fs::write(&file.path, bytes)?;
                rebuilt.push(file.path.clone());
            }
            None => debug!("{} is unchanged", file.name),
        }
    }

    if rebuilt.is_empty() {
        warn!("nothing changed since the package was unpacked");
    }

    Ok(rebuilt)
}
