use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use stage_codec::{Aabb, Context, Title, Vec3, Vec4};
use stage_geom::error::{Error, Result};
use stage_geom::file::{edit_copy_path, write_geom};
use stage_geom::types::{GeomMesh, GeomProp, MeshGroup, MeshReference, Span};
use stage_geom::{Geom, GeomFile};
use tracing_test::traced_test;

fn stage(hash: u32) -> Geom {
    Geom {
        world: Aabb::new(Vec4::new(-2.0, 0.0, -2.0, 0.0), Vec4::new(2.0, 3.0, 2.0, 0.0)),
        groups: vec![MeshGroup {
            id: 1,
            first_mesh: 0,
            mesh_count: 1,
            ..Default::default()
        }],
        meshes: vec![GeomMesh {
            id: hash,
            span: Span::new(0, 3, 0, 3),
            ..Default::default()
        }],
        references: vec![MeshReference {
            id: hash + 1,
            target: 0x0BAD_F00D,
            span: Span::new(3, 1, 3, 1),
            ..Default::default()
        }],
        props: vec![
            GeomProp {
                hash,
                position: Vec4::new(0.5, 0.0, 0.5, 1.0),
            },
            GeomProp {
                hash: 0,
                position: Vec4::ZERO,
            },
            GeomProp {
                hash: 0,
                position: Vec4::ZERO,
            },
        ],
        vertices: vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(9.0, 9.0, 9.0),
        ],
        // Odd index count, so the file ends with padding
        indices: vec![0, 1, 2, 0, 0],
        ..Default::default()
    }
}

fn write_stage(path: &Path, geom: &Geom, ctx: Context) -> Result<Vec<u8>> {
    let bytes = geom.to_bytes(ctx)?;
    fs::write(path, &bytes)?;
    Ok(bytes)
}

#[test]
#[traced_test]
fn unedited_save_is_identical() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("stage.geom");
    let ctx = Context::new(Title::Mgo2);
    let original = write_stage(&path, &stage(0x100), ctx)?;

    let file = GeomFile::open_edit(&path, ctx)?;
    assert!(edit_copy_path(&path).exists());
    file.save(false)?;
    file.close()?;

    assert_eq!(fs::read(&path)?, original);
    assert!(!edit_copy_path(&path).exists());
    Ok(())
}

#[test]
#[traced_test]
fn sentinels_survive_a_save() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("stage.geom");
    let ctx = Context::new(Title::Mga);
    write_stage(&path, &stage(0x100), ctx)?;

    let mut file = GeomFile::open_edit(&path, ctx)?;
    file.props[0].position = Vec4::new(4.0, 0.0, 4.0, 1.0);
    file.save(false)?;
    drop(file);

    let reloaded = GeomFile::open(&path, ctx)?.into_geom()?;
    assert_eq!(reloaded.props.len(), 3);
    assert_eq!(reloaded.props[1].position.to_bits(), [0; 4]);
    assert_eq!(reloaded.props[2], GeomProp::default());
    assert_eq!(reloaded.props[0].position, Vec4::new(4.0, 0.0, 4.0, 1.0));
    Ok(())
}

#[test]
#[traced_test]
fn merge_file_appends_and_rebases() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let ctx = Context::default();
    let target = dir.path().join("stage.geom");
    let source = dir.path().join("other.geom");
    write_stage(&target, &stage(0x100), ctx)?;
    write_stage(&source, &stage(0x200), ctx)?;

    let mut file = GeomFile::open_edit(&target, ctx)?;
    file.merge_file(&source, false)?;
    file.save(false)?;
    file.close()?;

    let merged = GeomFile::open(&target, ctx)?.into_geom()?;
    assert_eq!(merged.meshes.len(), 2);
    assert_eq!(merged.props.len(), 6);
    assert_eq!(merged.groups[1].first_mesh, 1);
    assert_eq!(merged.meshes[1].span, Span::new(4, 3, 5, 3));
    assert_eq!(merged.references[1].span, Span::new(7, 1, 8, 1));
    Ok(())
}

#[test]
#[traced_test]
fn references_only_merge_and_save() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let ctx = Context::default();
    let target = dir.path().join("stage.geom");
    let source = dir.path().join("other.geom");
    let stripped = dir.path().join("stripped.geom");
    write_stage(&target, &stage(0x100), ctx)?;
    write_stage(&source, &stage(0x200), ctx)?;

    let mut file = GeomFile::open_edit(&target, ctx)?;
    file.merge_file(&source, true)?;
    assert_eq!(file.meshes.len(), 1);
    assert_eq!(file.references.len(), 2);

    file.save_as(&stripped, true)?;
    file.close()?;

    let geom = GeomFile::open(&stripped, ctx)?.into_geom()?;
    assert!(geom.meshes.is_empty());
    assert!(geom.props.is_empty());
    assert_eq!(geom.references.len(), 2);
    assert_eq!(geom.vertices, vec![Vec3::new(9.0, 9.0, 9.0); 2]);
    assert_eq!(geom.references[1].span, Span::new(1, 1, 1, 1));
    Ok(())
}

#[test]
#[traced_test]
fn failed_merge_leaves_everything_untouched() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let ctx = Context::default();
    let target = dir.path().join("stage.geom");
    let broken = dir.path().join("broken.geom");
    let original = write_stage(&target, &stage(0x100), ctx)?;
    let mut bytes = stage(0x200).to_bytes(ctx)?;
    bytes.truncate(bytes.len() - 8);
    fs::write(&broken, &bytes)?;

    let mut file = GeomFile::open_edit(&target, ctx)?;
    let before = (*file).clone();
    assert!(matches!(file.merge_file(&broken, false), Err(Error::Format(_))));
    assert_eq!(*file, before);
    file.close()?;

    assert_eq!(fs::read(&target)?, original);
    Ok(())
}

#[test]
#[traced_test]
fn corrupt_file_leaves_no_edit_copy() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("stage.geom");
    fs::write(&path, b"GEOM")?;

    assert!(GeomFile::open_edit(&path, Context::default()).is_err());
    assert!(!edit_copy_path(&path).exists());
    Ok(())
}

#[test]
#[traced_test]
fn write_geom_replaces_destination() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("stage.geom");
    let ctx = Context::new(Title::Mgs4);
    fs::write(&path, b"old contents")?;

    write_geom(&stage(0x300), &path, ctx, false)?;
    assert_eq!(fs::read(&path)?, stage(0x300).to_bytes(ctx)?);

    let leftovers = fs::read_dir(dir.path())?.count();
    assert_eq!(leftovers, 1);
    Ok(())
}
