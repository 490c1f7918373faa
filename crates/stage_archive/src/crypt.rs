//! Package transform applied to MGO2 stage files, plus the plain copy used by the other titles.
//!
//! Every file of an encrypted package is keyed by `"<parent>/<stage dir>/<file name>"`. The key
//! is the MD5 of that string; the first eight bytes (little-endian) seed a xorshift64* generator
//! whose output words are XORed over the data. Applying the transform twice gives back the input.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use md5::{Digest, Md5};
use stage_codec::Title;
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use crate::error::{Error, Result};

const FALLBACK_SEED: u64 = 0x9E37_79B9_7F4A_7C15;
const MULTIPLIER: u64 = 0x2545_F491_4F6C_DD1D;

/// Cooperative cancellation flag shared between a long running operation and its caller
///
/// Operations check the flag between files, so a cancelled run stops at a file boundary and
/// returns [`Error::Cancelled`]. Output written up to that point is left in place.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the operation to stop
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Fail with [`Error::Cancelled`] once cancellation was requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

/// Keystream for a single file
#[derive(Debug, Clone)]
pub struct PackageCipher {
    state: u64,
}

impl PackageCipher {
    /// Derive the keystream from the key material of a file
    pub fn new(key_material: &str) -> Result<Self> {
        if key_material.is_empty() {
            return Err(Error::EncryptionKey("key material is empty".into()));
        }

        let digest = Md5::digest(key_material.as_bytes());
        let word = |range: std::ops::Range<usize>| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&digest[range]);
            u64::from_le_bytes(bytes)
        };

        let state = [word(0..8), word(8..16), FALLBACK_SEED]
            .into_iter()
            .find(|seed| *seed != 0)
            .unwrap_or(FALLBACK_SEED);

        Ok(Self { state })
    }

    fn next_word(&mut self) -> u64 {
        self.state ^= self.state >> 12;
        self.state ^= self.state << 25;
        self.state ^= self.state >> 27;
        self.state.wrapping_mul(MULTIPLIER)
    }

    /// XOR the keystream over `data`, continuing where the previous call stopped
    ///
    /// Calls should pass multiples of eight bytes except for the last one.
    pub fn apply(&mut self, data: &mut [u8]) {
        for chunk in data.chunks_mut(8) {
            let stream = self.next_word().to_le_bytes();
            chunk.iter_mut().zip(stream).for_each(|(b, k)| *b ^= k);
        }
    }
}

/// Encrypt or decrypt a whole file in memory
pub fn transform(data: &mut [u8], key_material: &str) -> Result<()> {
    if u32::try_from(data.len()).is_err() {
        return Err(Error::EncryptionKey(format!(
            "{} bytes is larger than a package file can be",
            data.len()
        )));
    }

    PackageCipher::new(key_material)?.apply(data);
    Ok(())
}

/// Key of a stage package directory, `"<parent>/<dir>"`
pub fn stage_key(package_dir: &Path) -> Result<String> {
    let name = |path: Option<&Path>| {
        path.and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
    };

    match (name(package_dir.parent()), name(Some(package_dir))) {
        (Some(parent), Some(dir)) => Ok(format!("{parent}/{dir}")),
        _ => Err(Error::EncryptionKey(format!(
            "unable to derive a stage key from {}",
            package_dir.display()
        ))),
    }
}

/// Key material of one file inside a stage package
pub fn key_material(stage_key: &str, file_name: &str) -> String {
    format!("{stage_key}/{file_name}")
}

fn package_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if entry.file_type().is_file() && !hidden {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Copy every file of a package into `dest`, applying the transform when `title` is encrypted
///
/// Only the top level files of `source` take part; unpacked sub directories are ignored. The
/// transform is its own inverse, so this serves both the load and the save direction.
#[instrument(skip(cancel), err)]
pub fn transfer_package(
    source: &Path,
    dest: &Path,
    stage_key: &str,
    title: Title,
    cancel: &Cancellation,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dest)?;

    let mut written = Vec::new();
    for path in package_files(source)? {
        cancel.check()?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let target = dest.join(&file_name);

        if title.is_encrypted() {
            let mut data = fs::read(&path)?;
            transform(&mut data, &key_material(stage_key, &file_name))?;
            fs::write(&target, data)?;
            debug!("transformed {file_name}");
        } else {
            fs::copy(&path, &target)?;
            debug!("copied {file_name}");
        }

        written.push(target);
    }

    info!("transferred {} package files", written.len());
    Ok(written)
}

/// Bring a package from disk into a working directory
pub fn decrypt_package(
    package_dir: &Path,
    work_dir: &Path,
    title: Title,
    cancel: &Cancellation,
) -> Result<Vec<PathBuf>> {
    transfer_package(package_dir, work_dir, &stage_key(package_dir)?, title, cancel)
}

/// Write the top level files of a working directory back out as a package
pub fn encrypt_package(
    work_dir: &Path,
    package_dir: &Path,
    stage_key: &str,
    title: Title,
    cancel: &Cancellation,
) -> Result<Vec<PathBuf>> {
    transfer_package(work_dir, package_dir, stage_key, title, cancel)
}
