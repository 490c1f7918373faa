use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use stage_archive::dlz::{unwrap_dlz, wrap_dlz};
use stage_archive::{pack, scan, unpack, Cancellation, FileKind, StageTree};
use stage_codec::{Context, FourCC, Title};
use stage_dict::{str_code, HashDictionary};
use stage_txn::dds::Dds;
use stage_txn::dld::DldTexture;
use stage_txn::error::Result;
use stage_txn::{DldFile, Priority, RepackReport, Resolution, TextureLibrary, TxnFile, TxnImage};
use tracing_test::traced_test;

const CTX: Context = Context::new(Title::Mgs4);

fn dictionary() -> HashDictionary {
    HashDictionary::from_readers("tex_rock\ntex_sky\n".as_bytes(), "".as_bytes())
        .expect("dictionary")
}

fn payload(object_id: u32, priority: Priority, fill: u8, len: usize) -> DldTexture {
    DldTexture {
        object_id,
        slot: 0,
        priority,
        reserved: 0,
        data: vec![fill; len],
    }
}

fn write_dlz(path: &Path, textures: Vec<DldTexture>) -> Result<()> {
    let dld = DldFile {
        textures,
        ..Default::default()
    };
    fs::write(path, wrap_dlz(&dld.to_bytes(CTX)?)?)?;
    Ok(())
}

fn embedded_dds(fill: u8) -> Result<Vec<u8>> {
    Dds::from_levels(4, 4, FourCC::DXT1, &[fill; 8], &[])?.to_bytes()
}

fn image(tri_id: u32, name: &str) -> TxnImage {
    TxnImage {
        tri_id,
        tex_id: str_code(name),
        width: 8,
        height: 8,
        fourcc: FourCC::DXT1,
        mip_count: 4,
        linear_size: 32,
        ..Default::default()
    }
}

/// A stage holding one slot dictionary and two payload stores, `tex_b` loaded after `tex_a`
fn build_stage(root: &Path) -> Result<StageTree> {
    write_dlz(
        &root.join("tex_a.dlz"),
        vec![
            payload(1, Priority::Main, 0xA0, 32),
            payload(1, Priority::Mipmaps, 0xA1, 24),
        ],
    )?;
    write_dlz(
        &root.join("tex_b.dlz"),
        vec![payload(1, Priority::Main, 0xB0, 32)],
    )?;

    let mut sky = image(2, "tex_sky");
    sky.embedded = Some(embedded_dds(0x5A)?);
    let txn = TxnFile {
        images: vec![image(1, "tex_rock"), sky, image(3, "tex_gone")],
        ..Default::default()
    };
    txn.save(&root.join("model.txn"), CTX)?;

    Ok(unpack(root, CTX, &Cancellation::new())?)
}

fn txns(tree: &StageTree) -> Vec<PathBuf> {
    tree.by_kind(FileKind::Txn).map(|f| f.path.clone()).collect()
}

#[test]
#[traced_test]
fn dump_uses_newest_main_and_older_mips() -> Result<()> {
    let stage = tempfile::tempdir()?;
    let out = tempfile::tempdir()?;
    let tree = build_stage(stage.path())?;
    let library = TextureLibrary::from_tree(&tree, CTX)?;
    assert_eq!(library.stores().len(), 2);

    let report = library.dump_all(txns(&tree), &dictionary(), out.path())?;
    assert_eq!((report.written, report.missing, report.failed), (2, 1, 0));

    let rock = Dds::parse(&fs::read(out.path().join("model/tex_rock.dds"))?)?;
    assert_eq!(rock.header.mip_count, 4);
    assert_eq!(rock.data[..32], [0xB0; 32]);
    assert_eq!(rock.data[32..], [0xA1; 24]);

    let sky = fs::read(out.path().join("model/tex_sky.dds"))?;
    assert_eq!(sky, embedded_dds(0x5A)?);

    let missing = format!("model/{:08x}.dds", str_code("tex_gone"));
    assert!(!out.path().join(missing).exists());
    assert!(logs_contain("no texture found"));

    Ok(())
}

#[test]
#[traced_test]
fn repack_replaces_payloads_and_embedded_images() -> Result<()> {
    let stage = tempfile::tempdir()?;
    let textures = tempfile::tempdir()?;
    let tree = build_stage(stage.path())?;
    let mut library = TextureLibrary::from_tree(&tree, CTX)?;

    let folder = textures.path().join("model");
    fs::create_dir_all(&folder)?;
    let rock = Dds::from_levels(16, 16, FourCC::DXT1, &[0xC0; 128], &[0xC1; 56])?;
    fs::write(folder.join("tex_rock.dds"), rock.to_bytes()?)?;
    fs::write(folder.join("tex_sky.dds"), embedded_dds(0xD0)?)?;

    let main = library.store_index("tex_b.dlz")?;
    let mips = library.store_index("tex_a.dlz")?;
    let report = library.repack_all(txns(&tree), textures.path(), main, mips, &dictionary())?;
    assert_eq!(
        report,
        RepackReport {
            replaced: 2,
            unchanged: 1,
            repacked_txns: 1,
            ..Default::default()
        }
    );
    assert_eq!(library.save_stores()?.len(), 2);

    let tree = scan(stage.path())?;
    let library = TextureLibrary::from_tree(&tree, CTX)?;
    let txn = TxnFile::open(&stage.path().join("model.txn"), CTX)?;
    assert_eq!(txn.images[0].width, 16);
    assert_eq!(txn.images[0].mip_count, 5);
    assert_eq!(txn.images[0].linear_size, 128);

    match library.resolve(&txn, 0) {
        Resolution::MainAndMips { main, mips } => {
            assert_eq!(main.data, vec![0xC0; 128]);
            assert_eq!(mips.data, vec![0xC1; 56]);
        }
        other => panic!("unexpected resolution {other:?}"),
    }
    let sky = embedded_dds(0xD0)?;
    assert_eq!(library.resolve(&txn, 1), Resolution::Embedded(&sky));

    let rebuilt = pack(stage.path(), CTX, &Cancellation::new())?;
    assert_eq!(rebuilt.len(), 2);
    let dld = DldFile::parse(&unwrap_dlz(&fs::read(stage.path().join("tex_b.dlz"))?)?, CTX)?;
    assert_eq!(dld.find(1, 0, Priority::Main).map(|t| t.data.len()), Some(128));

    Ok(())
}

#[test]
#[traced_test]
fn repack_skips_missing_folders_and_bad_files() -> Result<()> {
    let stage = tempfile::tempdir()?;
    let textures = tempfile::tempdir()?;
    let tree = build_stage(stage.path())?;
    let mut library = TextureLibrary::from_tree(&tree, CTX)?;
    let main = library.store_index("tex_b.dld")?;

    let report = library.repack_all(txns(&tree), textures.path(), main, main, &dictionary())?;
    assert_eq!(report.skipped_txns, 1);
    assert!(logs_contain("skipping"));

    let folder = textures.path().join("model");
    fs::create_dir_all(&folder)?;
    fs::write(folder.join("tex_rock.dds"), b"not a texture")?;
    let original = fs::read(stage.path().join("model.txn"))?;

    let report = library.repack_all(txns(&tree), textures.path(), main, main, &dictionary())?;
    assert_eq!((report.replaced, report.failed, report.unchanged), (0, 1, 2));
    assert!(library.save_stores()?.is_empty());
    assert_eq!(fs::read(stage.path().join("model.txn"))?, original);

    Ok(())
}

#[test]
#[traced_test]
fn dump_refuses_names_leaving_the_output_folder() -> Result<()> {
    let out = tempfile::tempdir()?;
    let dictionary = HashDictionary::from_readers("../escape\n".as_bytes(), "".as_bytes())
        .expect("dictionary");

    let mut escaping = image(1, "../escape");
    escaping.embedded = Some(embedded_dds(0x11)?);
    let txn = TxnFile {
        images: vec![escaping],
        ..Default::default()
    };

    let library = TextureLibrary::new(CTX);
    let report = library.dump_txn(&txn, "model", &dictionary, &out.path().join("dds"))?;
    assert_eq!((report.written, report.failed), (0, 1));
    assert!(!out.path().join("dds/escape.dds").exists());
    assert!(logs_contain("does not name a single file"));

    Ok(())
}
