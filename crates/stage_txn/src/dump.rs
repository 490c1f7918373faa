//! Batch export of textures to DDS files.

use std::fs;
use std::path::{Component, Path, PathBuf};

use stage_dict::HashDictionary;
use tracing::{error, info, instrument, warn};

use crate::error::{Error, Result};
use crate::resolve::TextureLibrary;
use crate::txn::TxnFile;

/// Outcome of an export
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct DumpReport {
    pub written: usize,
    /// Images with no payload anywhere
    pub missing: usize,
    /// Images or slot dictionaries that could not be exported
    pub failed: usize,
}

impl std::ops::AddAssign for DumpReport {
    fn add_assign(&mut self, other: DumpReport) {
        self.written += other.written;
        self.missing += other.missing;
        self.failed += other.failed;
    }
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Path of `<name>.dds` inside `dir`
///
/// Texture names come from the hash dictionary and must name a single file.
pub(crate) fn texture_path(dir: &Path, name: &str) -> Result<PathBuf> {
    let file = format!("{name}.dds");
    let mut components = Path::new(&file).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.is_empty() => Ok(dir.join(&file)),
        _ => Err(Error::Format(format!(
            "texture name {name:?} does not name a single file"
        ))),
    }
}

impl TextureLibrary {
    /// Export every image of `txn` to `out/<stem>/<texture name>.dds`
    ///
    /// Images that cannot be resolved or written are logged and skipped.
    #[instrument(skip(self, txn, dictionary, out), err)]
    pub fn dump_txn(
        &self,
        txn: &TxnFile,
        stem: &str,
        dictionary: &HashDictionary,
        out: &Path,
    ) -> Result<DumpReport> {
        let dir = out.join(stem);
        fs::create_dir_all(&dir)?;

        let mut report = DumpReport::default();
        for (index, image) in txn.images.iter().enumerate() {
            let name = dictionary.resolve(image.tex_id);
            let written = self
                .resolve(txn, index)
                .to_dds(image)
                .and_then(|dds| match dds {
                    Some(bytes) => {
                        fs::write(texture_path(&dir, &name)?, bytes)?;
                        Ok(true)
                    }
                    None => Ok(false),
                });

            match written {
                Ok(true) => report.written += 1,
                Ok(false) => {
                    warn!("no texture found for {name} in {stem}");
                    report.missing += 1;
                }
                Err(e) => {
                    error!("unable to export {name} from {stem}: {e}");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Export the images of every slot dictionary in `txns`
    ///
    /// A slot dictionary that cannot be read is logged and skipped.
    #[instrument(skip_all, fields(out = %out.display()), err)]
    pub fn dump_all<P: AsRef<Path>>(
        &self,
        txns: impl IntoIterator<Item = P>,
        dictionary: &HashDictionary,
        out: &Path,
    ) -> Result<DumpReport> {
        let mut report = DumpReport::default();
        for path in txns {
            let path = path.as_ref();
            let stem = file_stem(path);

            match TxnFile::open(path, self.context()) {
                Ok(txn) => report += self.dump_txn(&txn, &stem, dictionary, out)?,
                Err(e) => {
                    error!("unable to read {}: {e}", path.display());
                    report.failed += 1;
                }
            }
        }

        info!(
            "exported {} textures, {} missing, {} failed",
            report.written, report.missing, report.failed
        );
        Ok(report)
    }
}
