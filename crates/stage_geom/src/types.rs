//! Records stored in the tables of a geometry file.

use binrw::{BinRead, BinWrite};
use derive_more::Constructor;
use stage_codec::{Aabb, Vec4};

/// Version written into newly created geometry files
pub const GEOM_VERSION: u32 = 1;

/// Size of [`GeomHeader`] on disk, including the magic
pub const HEADER_SIZE: usize = 68;

/// Geometry file header
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(magic = b"GEOM")]
pub struct GeomHeader {
    pub version: u32,
    pub group_count: u32,
    pub mesh_count: u32,
    pub reference_count: u32,
    pub boundary_count: u32,
    pub prop_count: u32,
    pub vertex_count: u32,
    pub index_count: u32,
    /// Bounding volume of the whole stage, used to place the camera
    pub world: Aabb,
}

/// Range of the shared vertex and index buffers used by one block
///
/// Indices inside the range are relative to `first_vertex`.
#[derive(BinRead, BinWrite, Constructor, Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Span {
    pub first_vertex: u32,
    pub vertex_count: u32,
    pub first_index: u32,
    pub index_count: u32,
}

impl Span {
    /// The same span moved by the given buffer offsets
    pub fn rebased(self, vertex_base: u32, index_base: u32) -> Span {
        Span {
            first_vertex: self.first_vertex + vertex_base,
            first_index: self.first_index + index_base,
            ..self
        }
    }

    pub fn vertices(&self) -> std::ops::Range<usize> {
        self.first_vertex as usize..(self.first_vertex + self.vertex_count) as usize
    }

    pub fn indices(&self) -> std::ops::Range<usize> {
        self.first_index as usize..(self.first_index + self.index_count) as usize
    }
}

/// A group of consecutive meshes
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
pub struct MeshGroup {
    pub id: u32,
    pub flags: u32,
    pub first_mesh: u32,
    pub mesh_count: u32,
    pub bounds: Aabb,
}

/// A drawable mesh
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
pub struct GeomMesh {
    pub id: u32,
    pub material: u32,
    pub span: Span,
    pub bounds: Aabb,
}

/// A spatial link to geometry of another stage
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
pub struct MeshReference {
    pub id: u32,
    pub target: u32,
    pub flags: u32,
    pub span: Span,
    pub bounds: Aabb,
}

/// Collision or trigger volume
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
pub struct BoundaryVolume {
    pub id: u32,
    pub kind: u32,
    pub span: Span,
    pub bounds: Aabb,
}

/// A placed object
///
/// A prop whose position is all zeros marks an unused slot. It is kept on save but skipped by
/// [`crate::category::categorize`].
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
pub struct GeomProp {
    pub hash: u32,
    pub position: Vec4,
}

impl GeomProp {
    pub fn is_sentinel(&self) -> bool {
        self.position.is_zero()
    }
}
