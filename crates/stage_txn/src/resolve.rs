//! Locating the payloads of a texture across the loaded stores.

use std::path::{Path, PathBuf};

use stage_archive::{FileKind, StageTree};
use stage_codec::{Context, FourCC};
use tracing::{debug, instrument};

use crate::dci::DciFile;
use crate::dds::Dds;
use crate::dld::{DldFile, DldTexture, Priority};
use crate::error::{Error, Result};
use crate::txn::{TxnFile, TxnImage};

/// A payload store together with where it was loaded from
#[derive(Debug, Clone)]
pub struct PayloadStore {
    pub name: String,
    pub path: PathBuf,
    pub dld: DldFile,
    pub(crate) dirty: bool,
}

impl PayloadStore {
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn answers_to(&self, name: &str) -> bool {
        let stem = |n: &str| {
            n.strip_suffix(".dld")
                .or_else(|| n.strip_suffix(".dlz"))
                .unwrap_or(n)
                .to_owned()
        };
        stem(&self.name) == stem(name)
    }
}

/// Where the pixel data of one image comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    Main(&'a DldTexture),
    MainAndMips {
        main: &'a DldTexture,
        mips: &'a DldTexture,
    },
    /// Only the mip chain was found, the image is exported at half size
    MipsOnly(&'a DldTexture),
    /// A complete DDS file stored in the slot dictionary
    Embedded(&'a [u8]),
    Missing,
}

impl<'a> Resolution<'a> {
    pub fn is_missing(&self) -> bool {
        matches!(self, Resolution::Missing)
    }

    /// The DDS file for `image`, `None` when nothing was found
    pub fn to_dds(&self, image: &TxnImage) -> Result<Option<Vec<u8>>> {
        let (width, height) = (image.width as u32, image.height as u32);
        let dds = match self {
            Resolution::Missing => return Ok(None),
            Resolution::Embedded(bytes) => return Ok(Some(bytes.to_vec())),
            Resolution::Main(main) => {
                Dds::from_levels(width, height, image.fourcc, &main.data, &[])?
            }
            Resolution::MainAndMips { main, mips } => {
                Dds::from_levels(width, height, image.fourcc, &main.data, &mips.data)?
            }
            Resolution::MipsOnly(mips) => {
                let (width, height) = ((width / 2).max(1), (height / 2).max(1));
                let (top, rest) = split_level(image.fourcc, width, height, &mips.data)?;
                Dds::from_levels(width, height, image.fourcc, top, rest)?
            }
        };
        Ok(Some(dds.to_bytes()?))
    }
}

fn split_level(fourcc: FourCC, width: u32, height: u32, data: &[u8]) -> Result<(&[u8], &[u8])> {
    let top = crate::dds::level_size(fourcc, width, height);
    if data.len() < top {
        return Err(Error::Format(format!(
            "mip chain of {} bytes is smaller than its first level",
            data.len()
        )));
    }
    Ok(data.split_at(top))
}

/// Every payload store and texture info dictionary of a stage
///
/// Stores are kept in load order and searched most recently loaded first.
#[derive(Debug, Clone, Default)]
pub struct TextureLibrary {
    ctx: Context,
    stores: Vec<PayloadStore>,
    infos: Vec<DciFile>,
}

impl TextureLibrary {
    pub fn new(ctx: Context) -> TextureLibrary {
        TextureLibrary {
            ctx,
            ..Default::default()
        }
    }

    /// Load every DLD and DCI file of an unpacked stage, in unpack order
    #[instrument(skip_all, fields(root = %tree.root().display()), err)]
    pub fn from_tree(tree: &StageTree, ctx: Context) -> Result<TextureLibrary> {
        let mut library = TextureLibrary::new(ctx);
        for file in tree.files() {
            match file.kind {
                FileKind::Dld => {
                    library.load_store(&file.path)?;
                }
                FileKind::Dci => library.push_info(DciFile::open(&file.path, ctx)?),
                _ => {}
            }
        }

        debug!(
            "loaded {} payload stores and {} info dictionaries",
            library.stores.len(),
            library.infos.len()
        );
        Ok(library)
    }

    pub fn context(&self) -> Context {
        self.ctx
    }

    pub fn stores(&self) -> &[PayloadStore] {
        &self.stores
    }

    /// Load a store from disk, returning its index
    pub fn load_store(&mut self, path: &Path) -> Result<usize> {
        let dld = DldFile::open(path, self.ctx)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.push_store(name, path, dld))
    }

    /// Add a store, making it the first one searched
    pub fn push_store(&mut self, name: impl Into<String>, path: &Path, dld: DldFile) -> usize {
        self.stores.push(PayloadStore {
            name: name.into(),
            path: path.to_path_buf(),
            dld,
            dirty: false,
        });
        self.stores.len() - 1
    }

    pub fn push_info(&mut self, info: DciFile) {
        self.infos.push(info);
    }

    /// Index of the store loaded from `name`, which may be given as `.dlz` or `.dld`
    pub fn store_index(&self, name: &str) -> Result<usize> {
        self.stores
            .iter()
            .rposition(|s| s.answers_to(name))
            .ok_or_else(|| Error::UnknownStore(name.to_owned()))
    }

    /// Slot the payloads of the image at `index` are stored under
    pub fn slot_for(&self, index: usize, image: &TxnImage) -> u32 {
        self.infos
            .iter()
            .rev()
            .find_map(|dci| dci.find(image.tri_id, image.tex_id))
            .map_or(index as u32, |entry| entry.slot)
    }

    /// Most recently loaded payload for an address
    pub fn find(&self, object_id: u32, slot: u32, priority: Priority) -> Option<&DldTexture> {
        self.stores
            .iter()
            .rev()
            .find_map(|store| store.dld.find(object_id, slot, priority))
    }

    /// Locate the pixel data of the image at `index` of `txn`
    ///
    /// Main and mip payloads are searched independently, so they can come from different stores.
    /// The embedded DDS is only used when neither layer is stored.
    pub fn resolve<'a>(&'a self, txn: &'a TxnFile, index: usize) -> Resolution<'a> {
        let Some(image) = txn.images.get(index) else {
            return Resolution::Missing;
        };

        let slot = self.slot_for(index, image);
        let main = self.find(image.tri_id, slot, Priority::Main);
        let mips = self.find(image.tri_id, slot, Priority::Mipmaps);

        match (main, mips, &image.embedded) {
            (Some(main), Some(mips), _) => Resolution::MainAndMips { main, mips },
            (Some(main), None, _) => Resolution::Main(main),
            (None, Some(mips), _) => Resolution::MipsOnly(mips),
            (None, None, Some(bytes)) => Resolution::Embedded(bytes),
            (None, None, None) => Resolution::Missing,
        }
    }

    /// Write every store changed since loading back to its path
    #[instrument(skip(self), err)]
    pub fn save_stores(&mut self) -> Result<Vec<PathBuf>> {
        let mut saved = Vec::new();
        for store in self.stores.iter_mut().filter(|s| s.dirty) {
            store.dld.save(&store.path, self.ctx)?;
            store.dirty = false;
            saved.push(store.path.clone());
        }
        Ok(saved)
    }

    pub(crate) fn store_mut(&mut self, index: usize) -> Result<&mut PayloadStore> {
        self.stores
            .get_mut(index)
            .ok_or_else(|| Error::UnknownStore(format!("#{index}")))
    }
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use pretty_assertions::assert_eq;
    use stage_codec::{Context, FourCC};

    use crate::dci::{DciEntry, DciFile};
    use crate::dds::Dds;
    use crate::dld::{DldFile, DldTexture, Priority};
    use crate::error::{Error, Result};
    use crate::resolve::{Resolution, TextureLibrary};
    use crate::txn::{TxnFile, TxnImage};

    fn payload(object_id: u32, slot: u32, priority: Priority, fill: u8, len: usize) -> DldTexture {
        DldTexture {
            object_id,
            slot,
            priority,
            data: vec![fill; len],
            ..Default::default()
        }
    }

    fn store(textures: Vec<DldTexture>) -> DldFile {
        DldFile {
            textures,
            ..Default::default()
        }
    }

    fn txn(images: Vec<TxnImage>) -> TxnFile {
        TxnFile {
            images,
            ..Default::default()
        }
    }

    fn image(tri_id: u32, tex_id: u32) -> TxnImage {
        TxnImage {
            tri_id,
            tex_id,
            width: 8,
            height: 8,
            fourcc: FourCC::DXT1,
            mip_count: 4,
            ..Default::default()
        }
    }

    #[test]
    fn newest_main_wins_and_mips_come_from_older_store() {
        let mut library = TextureLibrary::new(Context::default());
        library.push_store(
            "old.dld",
            Path::new("old.dld"),
            store(vec![
                payload(1, 0, Priority::Main, 0xA0, 32),
                payload(1, 0, Priority::Mipmaps, 0xA1, 24),
            ]),
        );
        library.push_store(
            "new.dld",
            Path::new("new.dld"),
            store(vec![payload(1, 0, Priority::Main, 0xB0, 32)]),
        );

        let txn = txn(vec![image(1, 0x100)]);
        match library.resolve(&txn, 0) {
            Resolution::MainAndMips { main, mips } => {
                assert_eq!(main.data[0], 0xB0);
                assert_eq!(mips.data[0], 0xA1);
            }
            other => panic!("unexpected resolution {other:?}"),
        }
    }

    #[test]
    fn combined_image_has_the_whole_chain() -> Result<()> {
        let mut library = TextureLibrary::new(Context::default());
        library.push_store(
            "tex.dld",
            Path::new("tex.dld"),
            store(vec![
                payload(1, 0, Priority::Main, 0xA0, 32),
                payload(1, 0, Priority::Mipmaps, 0xA1, 24),
            ]),
        );

        let txn = txn(vec![image(1, 0x100)]);
        let bytes = library.resolve(&txn, 0).to_dds(&txn.images[0])?.unwrap_or_default();
        let dds = Dds::parse(&bytes)?;

        assert_eq!(dds.header.mip_count, 4);
        assert_eq!(dds.data[..32], [0xA0; 32]);
        assert_eq!(dds.data[32..], [0xA1; 24]);
        Ok(())
    }

    #[test]
    fn main_only_has_a_single_level() -> Result<()> {
        let mut library = TextureLibrary::new(Context::default());
        library.push_store(
            "tex.dld",
            Path::new("tex.dld"),
            store(vec![payload(1, 0, Priority::Main, 0xA0, 32)]),
        );

        let txn = txn(vec![image(1, 0x100)]);
        let resolution = library.resolve(&txn, 0);
        assert!(matches!(resolution, Resolution::Main(_)));

        let dds = Dds::parse(&resolution.to_dds(&txn.images[0])?.unwrap_or_default())?;
        assert_eq!(dds.header.mip_count, 1);
        assert_eq!((dds.header.width, dds.header.height), (8, 8));
        Ok(())
    }

    #[test]
    fn mips_only_is_half_size() -> Result<()> {
        let mut library = TextureLibrary::new(Context::default());
        library.push_store(
            "tex.dld",
            Path::new("tex.dld"),
            store(vec![payload(1, 0, Priority::Mipmaps, 0xA1, 24)]),
        );

        let txn = txn(vec![image(1, 0x100)]);
        let resolution = library.resolve(&txn, 0);
        assert!(matches!(resolution, Resolution::MipsOnly(_)));

        let dds = Dds::parse(&resolution.to_dds(&txn.images[0])?.unwrap_or_default())?;
        assert_eq!((dds.header.width, dds.header.height), (4, 4));
        assert_eq!(dds.header.mip_count, 3);
        assert_eq!(dds.data.len(), 24);
        Ok(())
    }

    #[test]
    fn stored_payloads_shadow_embedded_image() {
        let mut embedded = image(1, 0x100);
        embedded.embedded = Some(b"DDS embedded".to_vec());
        let txn = txn(vec![embedded, image(2, 0x200)]);

        let mut library = TextureLibrary::new(Context::default());
        assert_eq!(library.resolve(&txn, 0), Resolution::Embedded(b"DDS embedded"));
        assert!(library.resolve(&txn, 1).is_missing());
        assert!(library.resolve(&txn, 7).is_missing());

        library.push_store(
            "tex.dld",
            Path::new("tex.dld"),
            store(vec![payload(1, 0, Priority::Main, 0xA0, 32)]),
        );
        assert!(matches!(library.resolve(&txn, 0), Resolution::Main(_)));
    }

    #[test]
    fn info_dictionary_moves_the_slot() {
        let mut library = TextureLibrary::new(Context::default());
        library.push_store(
            "tex.dld",
            Path::new("tex.dld"),
            store(vec![payload(1, 5, Priority::Main, 0xA0, 32)]),
        );

        let txn = txn(vec![image(1, 0x100)]);
        assert!(library.resolve(&txn, 0).is_missing());

        library.push_info(DciFile {
            entries: vec![DciEntry {
                texture_id: 0x100,
                object_id: 1,
                slot: 5,
                ..Default::default()
            }],
            ..Default::default()
        });
        assert_eq!(library.slot_for(0, &txn.images[0]), 5);
        assert!(matches!(library.resolve(&txn, 0), Resolution::Main(_)));
    }

    #[test]
    fn stores_are_found_by_either_name() -> Result<()> {
        let mut library = TextureLibrary::new(Context::default());
        library.push_store("tex_main.dld", Path::new("a/tex_main.dld"), DldFile::default());
        library.push_store("tex_mips.dld", Path::new("a/tex_mips.dld"), DldFile::default());

        assert_eq!(library.store_index("tex_main.dlz")?, 0);
        assert_eq!(library.store_index("tex_mips.dld")?, 1);
        assert!(matches!(
            library.store_index("other.dlz"),
            Err(Error::UnknownStore(_))
        ));
        Ok(())
    }
}
