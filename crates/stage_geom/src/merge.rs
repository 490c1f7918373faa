//! Merging the tables of one geometry into another.
//!
//! Merging appends, it never deduplicates: merging the same source twice yields its blocks twice.
//! Both operations check every count first and only then touch `self`, so a failed merge leaves
//! the target unchanged.

use tracing::{info, instrument};

use crate::error::Result;
use crate::geom::{count, Geom};
use crate::types::{BoundaryVolume, GeomMesh, MeshGroup, MeshReference};

impl Geom {
    /// Append all groups, meshes, references, boundaries and props of `other`
    ///
    /// Mesh ranges of the appended groups and buffer spans of the appended blocks are rebased onto
    /// the combined tables. The world bounds become the union of both.
    #[instrument(skip_all, err)]
    pub fn merge(&mut self, other: &Geom) -> Result<()> {
        other.validate()?;

        let mesh_base = count(self.meshes.len(), "meshes")?;
        let vertex_base = count(self.vertices.len(), "vertices")?;
        let index_base = count(self.indices.len(), "indices")?;

        count(self.meshes.len() + other.meshes.len(), "meshes")?;
        count(self.groups.len() + other.groups.len(), "groups")?;
        count(self.references.len() + other.references.len(), "references")?;
        count(self.boundaries.len() + other.boundaries.len(), "boundaries")?;
        count(self.props.len() + other.props.len(), "props")?;
        count(self.vertices.len() + other.vertices.len(), "vertices")?;
        count(self.indices.len() + other.indices.len(), "indices")?;

        self.groups.extend(other.groups.iter().map(|group| MeshGroup {
            first_mesh: group.first_mesh + mesh_base,
            ..*group
        }));
        self.meshes.extend(other.meshes.iter().map(|mesh| GeomMesh {
            span: mesh.span.rebased(vertex_base, index_base),
            ..*mesh
        }));
        self.references
            .extend(other.references.iter().map(|reference| MeshReference {
                span: reference.span.rebased(vertex_base, index_base),
                ..*reference
            }));
        self.boundaries
            .extend(other.boundaries.iter().map(|boundary| BoundaryVolume {
                span: boundary.span.rebased(vertex_base, index_base),
                ..*boundary
            }));
        self.props.extend_from_slice(&other.props);
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend_from_slice(&other.indices);
        self.world = self.world.union(&other.world);

        info!(
            "merged {} meshes and {} props",
            other.meshes.len(),
            other.props.len()
        );

        Ok(())
    }

    /// Append only the reference blocks of `other`, with the buffer ranges they use
    ///
    /// Groups, meshes, boundaries and props of both sides are left alone.
    #[instrument(skip_all, err)]
    pub fn merge_references(&mut self, other: &Geom) -> Result<()> {
        other.validate()?;

        let (vertices, indices) = other
            .references
            .iter()
            .fold((0usize, 0usize), |(v, i), r| {
                (v + r.span.vertex_count as usize, i + r.span.index_count as usize)
            });
        count(self.vertices.len() + vertices, "vertices")?;
        count(self.indices.len() + indices, "indices")?;
        count(self.references.len() + other.references.len(), "references")?;

        for reference in &other.references {
            let span = self.append_buffers(other, &reference.span);
            self.references.push(MeshReference { span, ..*reference });
        }

        info!("merged {} references", other.references.len());
        Ok(())
    }
}
