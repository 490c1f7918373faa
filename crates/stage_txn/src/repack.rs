//! Replacing textures with edited DDS files.
//!
//! A replacement DDS is split into its top level, which goes to the chosen main store, and its
//! remaining mip chain, which goes to the chosen mips store. Images embedded in the slot dictionary
//! are replaced by the whole file instead. The slot entry takes over the size and format of the
//! new file.

use std::fs;
use std::path::Path;

use stage_dict::HashDictionary;
use tracing::{debug, error, info, instrument, warn};

use crate::dds::{linear_size, Dds};
use crate::dld::{DldTexture, Priority};
use crate::dump::{file_stem, texture_path};
use crate::error::{Error, Result};
use crate::resolve::TextureLibrary;
use crate::txn::TxnFile;

/// Outcome of a repack
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct RepackReport {
    /// Images replaced by a new DDS file
    pub replaced: usize,
    /// Images without a replacement file
    pub unchanged: usize,
    /// Images whose replacement could not be used
    pub failed: usize,
    pub repacked_txns: usize,
    /// Slot dictionaries without a texture folder
    pub skipped_txns: usize,
    pub failed_txns: usize,
}

impl std::ops::AddAssign for RepackReport {
    fn add_assign(&mut self, other: RepackReport) {
        self.replaced += other.replaced;
        self.unchanged += other.unchanged;
        self.failed += other.failed;
        self.repacked_txns += other.repacked_txns;
        self.skipped_txns += other.skipped_txns;
        self.failed_txns += other.failed_txns;
    }
}

fn dimension(value: u32, what: &str) -> Result<u16> {
    u16::try_from(value).map_err(|_| Error::Format(format!("{what} {value} does not fit a slot")))
}

impl TextureLibrary {
    /// Replace the images of the slot dictionary at `txn_path` with `<texture name>.dds` files found
    /// in `textures`
    ///
    /// `main` and `mips` are store indices (see [`TextureLibrary::store_index`]). The slot
    /// dictionary is rewritten in place; changed stores are only written by
    /// [`TextureLibrary::save_stores`].
    #[instrument(skip(self, dictionary), err)]
    pub fn rebuild_txn(
        &mut self,
        txn_path: &Path,
        textures: &Path,
        main: usize,
        mips: usize,
        dictionary: &HashDictionary,
    ) -> Result<RepackReport> {
        self.store_mut(main)?;
        self.store_mut(mips)?;

        let mut txn = TxnFile::open(txn_path, self.context())?;
        let mut report = RepackReport::default();

        for index in 0..txn.images.len() {
            let name = dictionary.resolve(txn.images[index].tex_id).into_owned();
            let path = match texture_path(textures, &name) {
                Ok(path) => path,
                Err(e) => {
                    error!("unable to repack {name}: {e}");
                    report.failed += 1;
                    continue;
                }
            };
            if !path.is_file() {
                debug!("no replacement for {name}");
                report.unchanged += 1;
                continue;
            }

            match self.replace_image(&mut txn, index, &path, main, mips) {
                Ok(()) => report.replaced += 1,
                Err(e) => {
                    error!("unable to repack {name}: {e}");
                    report.failed += 1;
                }
            }
        }

        if report.replaced > 0 {
            txn.save(txn_path, self.context())?;
        }
        report.repacked_txns = 1;

        info!("replaced {} of {} images", report.replaced, txn.images.len());
        Ok(report)
    }

    fn replace_image(
        &mut self,
        txn: &mut TxnFile,
        index: usize,
        path: &Path,
        main: usize,
        mips: usize,
    ) -> Result<()> {
        let bytes = fs::read(path)?;
        let dds = Dds::parse(&bytes)?;
        let header = dds.header;
        let width = dimension(header.width, "width")?;
        let height = dimension(header.height, "height")?;
        let mip_count = dimension(header.mip_count.max(1), "mip count")?;
        let linear_size = linear_size(header.fourcc(), header.width, header.height)?;

        let slot = self.slot_for(index, &txn.images[index]);
        let image = &mut txn.images[index];

        if image.has_embedded() {
            image.embedded = Some(bytes);
        } else {
            let (top, rest) = dds.split_top_level()?;

            let store = self.store_mut(main)?;
            store.dld.upsert(DldTexture {
                object_id: image.tri_id,
                slot,
                priority: Priority::Main,
                reserved: 0,
                data: top.to_vec(),
            });
            store.dirty = true;

            let store = self.store_mut(mips)?;
            if rest.is_empty() {
                store.dirty |= store.dld.remove(image.tri_id, slot, Priority::Mipmaps);
            } else {
                store.dld.upsert(DldTexture {
                    object_id: image.tri_id,
                    slot,
                    priority: Priority::Mipmaps,
                    reserved: 0,
                    data: rest.to_vec(),
                });
                store.dirty = true;
            }
        }

        image.width = width;
        image.height = height;
        image.fourcc = header.fourcc();
        image.mip_count = mip_count;
        image.linear_size = linear_size;
        Ok(())
    }

    /// Rebuild every slot dictionary in `txns` from `<root>/<txn stem>/`
    ///
    /// Slot dictionaries without a folder are skipped with a warning, failing ones are logged and
    /// skipped.
    #[instrument(skip(self, txns, dictionary), err)]
    pub fn repack_all<P: AsRef<Path>>(
        &mut self,
        txns: impl IntoIterator<Item = P>,
        root: &Path,
        main: usize,
        mips: usize,
        dictionary: &HashDictionary,
    ) -> Result<RepackReport> {
        self.store_mut(main)?;
        self.store_mut(mips)?;

        let mut report = RepackReport::default();
        for txn in txns {
            let txn = txn.as_ref();
            let folder = root.join(file_stem(txn));
            if !folder.is_dir() {
                warn!(
                    "skipping {}: {} not found",
                    txn.display(),
                    folder.display()
                );
                report.skipped_txns += 1;
                continue;
            }

            match self.rebuild_txn(txn, &folder, main, mips, dictionary) {
                Ok(rebuilt) => report += rebuilt,
                Err(e) => {
                    error!("unable to repack {}: {e}", txn.display());
                    report.failed_txns += 1;
                }
            }
        }

        info!(
            "repacked {} slot dictionaries, skipped {}, failed {}",
            report.repacked_txns, report.skipped_txns, report.failed_txns
        );
        Ok(report)
    }
}
