//! In-memory geometry and its binary layout.
//!

use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use binrw::{BinRead, BinWrite};
use stage_codec::{align_up, Aabb, Context, ReadCodecExt, Vec3, Vec4, WriteCodecExt};
use stage_dict::HashDictionary;
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::types::{
    BoundaryVolume, GeomHeader, GeomMesh, GeomProp, MeshGroup, MeshReference, Span, GEOM_VERSION,
};

/// Name of the prop marking the centre of a stage
pub const STAGE_CENTER: &str = "PRP_STAGE_CENTER";

/// Parsed contents of a geometry file
#[derive(Debug, Clone, PartialEq)]
pub struct Geom {
    pub version: u32,
    /// Bounding volume of the whole stage
    pub world: Aabb,
    pub groups: Vec<MeshGroup>,
    pub meshes: Vec<GeomMesh>,
    pub references: Vec<MeshReference>,
    pub boundaries: Vec<BoundaryVolume>,
    pub props: Vec<GeomProp>,
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u16>,
}

impl Default for Geom {
    fn default() -> Self {
        Self {
            version: GEOM_VERSION,
            world: Aabb::default(),
            groups: Vec::new(),
            meshes: Vec::new(),
            references: Vec::new(),
            boundaries: Vec::new(),
            props: Vec::new(),
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }
}

fn read_table<T, R>(reader: &mut R, count: u32, ctx: Context) -> Result<Vec<T>>
where
    R: Read + Seek,
    T: for<'a> BinRead<Args<'a> = ()>,
{
    (0..count)
        .map(|_| T::read_options(reader, ctx.endian(), ()).map_err(Error::from))
        .collect()
}

fn write_table<T, W>(writer: &mut W, table: &[T], ctx: Context) -> Result<()>
where
    W: Write + Seek,
    T: for<'a> BinWrite<Args<'a> = ()>,
{
    for record in table {
        record.write_options(writer, ctx.endian(), ())?;
    }
    Ok(())
}

pub(crate) fn count(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::Format(format!("too many {what}")))
}

impl Geom {
    /// Parse a complete geometry file
    #[instrument(skip(data), fields(size = data.len()))]
    pub fn parse(data: &[u8], ctx: Context) -> Result<Geom> {
        let mut reader = Cursor::new(data);
        let header = GeomHeader::read_options(&mut reader, ctx.endian(), ())
            .map_err(|e| Error::Format(format!("bad header: {e}")))?;

        let truncated = |e: Error| match e {
            Error::BinRWError(e) => Error::Format(format!("truncated table: {e}")),
            Error::IOError(e) => Error::Format(format!("truncated buffer: {e}")),
            other => other,
        };

        let groups = read_table(&mut reader, header.group_count, ctx).map_err(truncated)?;
        let meshes = read_table(&mut reader, header.mesh_count, ctx).map_err(truncated)?;
        let references = read_table(&mut reader, header.reference_count, ctx).map_err(truncated)?;
        let boundaries = read_table(&mut reader, header.boundary_count, ctx).map_err(truncated)?;
        let props = read_table(&mut reader, header.prop_count, ctx).map_err(truncated)?;
        let vertices = read_table(&mut reader, header.vertex_count, ctx).map_err(truncated)?;

        let indices = (0..header.index_count)
            .map(|_| reader.read_u16_in(ctx.endian()).map_err(Error::from))
            .collect::<Result<Vec<_>>>()
            .map_err(truncated)?;

        let end = align_up(reader.position(), 4);
        if end != data.len() as u64 {
            return Err(Error::Format(format!(
                "expected {end} bytes, found {}",
                data.len()
            )));
        }

        let geom = Geom {
            version: header.version,
            world: header.world,
            groups,
            meshes,
            references,
            boundaries,
            props,
            vertices,
            indices,
        };
        geom.validate()?;

        debug!(
            "parsed {} meshes, {} references, {} props",
            geom.meshes.len(),
            geom.references.len(),
            geom.props.len()
        );

        Ok(geom)
    }

    fn check_span(&self, span: &Span, owner: &str) -> Result<()> {
        let vertices_end = span.first_vertex as u64 + span.vertex_count as u64;
        let indices_end = span.first_index as u64 + span.index_count as u64;
        if vertices_end > self.vertices.len() as u64 || indices_end > self.indices.len() as u64 {
            return Err(Error::Format(format!("{owner} span lies outside the buffers")));
        }

        if let Some(index) = self.indices[span.indices()]
            .iter()
            .find(|i| **i as u32 >= span.vertex_count)
        {
            return Err(Error::Format(format!(
                "{owner} index {index} exceeds its {} vertices",
                span.vertex_count
            )));
        }

        Ok(())
    }

    /// Check every cross reference between the tables
    pub fn validate(&self) -> Result<()> {
        for (i, group) in self.groups.iter().enumerate() {
            let end = group.first_mesh as u64 + group.mesh_count as u64;
            if end > self.meshes.len() as u64 {
                return Err(Error::Format(format!(
                    "group {i} covers meshes outside the mesh table"
                )));
            }
        }

        for (i, mesh) in self.meshes.iter().enumerate() {
            self.check_span(&mesh.span, &format!("mesh {i}"))?;
        }
        for (i, reference) in self.references.iter().enumerate() {
            self.check_span(&reference.span, &format!("reference {i}"))?;
        }
        for (i, boundary) in self.boundaries.iter().enumerate() {
            self.check_span(&boundary.span, &format!("boundary {i}"))?;
        }

        Ok(())
    }

    /// Serialize back into the binary layout
    #[instrument(skip_all, err)]
    pub fn to_bytes(&self, ctx: Context) -> Result<Vec<u8>> {
        let header = GeomHeader {
            version: self.version,
            group_count: count(self.groups.len(), "groups")?,
            mesh_count: count(self.meshes.len(), "meshes")?,
            reference_count: count(self.references.len(), "references")?,
            boundary_count: count(self.boundaries.len(), "boundaries")?,
            prop_count: count(self.props.len(), "props")?,
            vertex_count: count(self.vertices.len(), "vertices")?,
            index_count: count(self.indices.len(), "indices")?,
            world: self.world,
        };

        let mut writer = Cursor::new(Vec::new());
        header.write_options(&mut writer, ctx.endian(), ())?;
        write_table(&mut writer, &self.groups, ctx)?;
        write_table(&mut writer, &self.meshes, ctx)?;
        write_table(&mut writer, &self.references, ctx)?;
        write_table(&mut writer, &self.boundaries, ctx)?;
        write_table(&mut writer, &self.props, ctx)?;
        write_table(&mut writer, &self.vertices, ctx)?;

        writer.seek(SeekFrom::End(0))?;
        for index in &self.indices {
            writer.write_u16_in(*index, ctx.endian())?;
        }

        let position = writer.position();
        writer.write_zeros((align_up(position, 4) - position) as usize)?;

        Ok(writer.into_inner())
    }

    /// A copy holding only the reference blocks, with the buffers compacted to what they use
    pub fn reference_only(&self) -> Geom {
        let mut stripped = Geom {
            version: self.version,
            world: self.world,
            ..Default::default()
        };

        for reference in &self.references {
            let span = stripped.append_buffers(self, &reference.span);
            stripped.references.push(MeshReference { span, ..*reference });
        }

        stripped
    }

    /// Copy the buffer ranges of `span` from `source`, returning the span inside `self`
    pub(crate) fn append_buffers(&mut self, source: &Geom, span: &Span) -> Span {
        let moved = Span {
            first_vertex: self.vertices.len() as u32,
            first_index: self.indices.len() as u32,
            ..*span
        };

        self.vertices
            .extend_from_slice(&source.vertices[span.vertices()]);
        self.indices.extend_from_slice(&source.indices[span.indices()]);

        moved
    }

    /// Props that are not unused slots
    pub fn live_props(&self) -> impl Iterator<Item = (usize, &GeomProp)> {
        self.props
            .iter()
            .enumerate()
            .filter(|(_, prop)| !prop.is_sentinel())
    }

    /// First live prop whose hash resolves to `name`
    pub fn find_prop(&self, dictionary: &HashDictionary, name: &str) -> Option<&GeomProp> {
        self.live_props()
            .map(|(_, prop)| prop)
            .find(|prop| dictionary.resolve(prop.hash) == name)
    }

    /// Position of the stage centre marker, falling back to the centre of the world bounds
    pub fn stage_center(&self, dictionary: &HashDictionary) -> Vec4 {
        self.find_prop(dictionary, STAGE_CENTER)
            .map(|prop| prop.position)
            .unwrap_or_else(|| self.world.center())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use stage_codec::{Aabb, Context, Title, Vec3, Vec4};

    use crate::error::{Error, Result};
    use crate::geom::Geom;
    use crate::types::{GeomMesh, GeomProp, MeshReference, Span};

    fn sample() -> Geom {
        Geom {
            world: Aabb::new(Vec4::new(-1.0, -1.0, -1.0, 0.0), Vec4::new(1.0, 1.0, 1.0, 0.0)),
            meshes: vec![GeomMesh {
                id: 0x10,
                material: 2,
                span: Span::new(0, 3, 0, 3),
                ..Default::default()
            }],
            references: vec![MeshReference {
                id: 0x20,
                target: 0x99,
                span: Span::new(3, 2, 3, 2),
                ..Default::default()
            }],
            props: vec![
                GeomProp {
                    hash: 0xAA,
                    position: Vec4::new(1.0, 2.0, 3.0, 0.5),
                },
                GeomProp {
                    hash: 0xBB,
                    position: Vec4::ZERO,
                },
            ],
            vertices: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(5.0, 5.0, 5.0),
                Vec3::new(6.0, 6.0, 6.0),
            ],
            indices: vec![0, 1, 2, 0, 1],
            ..Default::default()
        }
    }

    #[test]
    fn write_then_parse_both_orders() -> Result<()> {
        let geom = sample();
        for title in [Title::Mgo2, Title::Mga] {
            let ctx = Context::new(title);
            let bytes = geom.to_bytes(ctx)?;

            assert_eq!(&bytes[..4], b"GEOM");
            assert_eq!(bytes.len() % 4, 0);
            assert_eq!(Geom::parse(&bytes, ctx)?, geom);
        }

        Ok(())
    }

    #[test]
    fn header_layout() -> Result<()> {
        let bytes = Geom::default().to_bytes(Context::new(Title::Mgo2))?;

        #[rustfmt::skip]
        let expected = [
            0x47, 0x45, 0x4F, 0x4D,
            0x00, 0x00, 0x00, 0x01,
        ];
        assert_eq!(bytes.len(), 68);
        assert_eq!(&bytes[..8], &expected);

        Ok(())
    }

    #[test]
    fn trailing_bytes_are_rejected() -> Result<()> {
        let ctx = Context::default();
        let mut bytes = sample().to_bytes(ctx)?;
        bytes.extend_from_slice(&[0, 0, 0, 0]);

        assert!(matches!(Geom::parse(&bytes, ctx), Err(Error::Format(_))));
        Ok(())
    }

    #[test]
    fn span_outside_buffers_is_rejected() -> Result<()> {
        let ctx = Context::default();
        let mut geom = sample();
        geom.meshes[0].span = Span::new(4, 3, 0, 3);

        let bytes = geom.to_bytes(ctx)?;
        assert!(matches!(Geom::parse(&bytes, ctx), Err(Error::Format(_))));
        Ok(())
    }

    #[test]
    fn truncated_file_is_rejected() -> Result<()> {
        let ctx = Context::default();
        let bytes = sample().to_bytes(ctx)?;

        assert!(matches!(
            Geom::parse(&bytes[..bytes.len() - 12], ctx),
            Err(Error::Format(_))
        ));
        Ok(())
    }

    #[test]
    fn reference_only_compacts_buffers() {
        let stripped = sample().reference_only();

        assert!(stripped.meshes.is_empty());
        assert!(stripped.props.is_empty());
        assert_eq!(stripped.references.len(), 1);
        assert_eq!(stripped.references[0].span, Span::new(0, 2, 0, 2));
        assert_eq!(
            stripped.vertices,
            vec![Vec3::new(5.0, 5.0, 5.0), Vec3::new(6.0, 6.0, 6.0)]
        );
        assert_eq!(stripped.indices, vec![0, 1]);
    }

    #[test]
    fn live_props_skip_sentinels() {
        let geom = sample();
        let live = geom.live_props().map(|(i, _)| i).collect::<Vec<_>>();
        assert_eq!(live, vec![0]);
    }
}
