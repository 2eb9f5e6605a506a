//! CPU-side mesh output data.

use crate::math::Aabb;

use super::layout::VertexLayout;

/// Primitive topology of a sub-mesh after strip/fan/loop expansion.
///
/// The importer flattens every glTF draw mode into one of these list
/// topologies; strips, fans, and loops never reach the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Each vertex is a separate point.
    PointList,
    /// Every two indices form a line.
    LineList,
    /// Every three indices form a triangle.
    #[default]
    TriangleList,
}

/// One drawable range within a shared vertex/index buffer pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SubMesh {
    /// Added to every index of this range when fetching vertices.
    pub base_vertex: u32,
    /// First index in the shared index buffer.
    pub index_start: u32,
    /// Number of indices.
    pub index_count: u32,
    /// Topology of the range.
    pub topology: PrimitiveTopology,
    /// glTF material index, if assigned.
    pub material: Option<usize>,
    /// Bounds of this range's vertices.
    pub bounds: Aabb,
}

/// Named blend-shape frame covering the whole shared vertex buffer.
///
/// Deltas are indexed by global vertex index (i.e. `base_vertex` + local
/// index); vertices of primitives without this target stay zero.
#[derive(Debug, Clone, PartialEq)]
pub struct MorphFrame {
    /// Frame name (`extras.targetNames` entry or a generated fallback).
    pub name: String,
    /// Position deltas, one per vertex.
    pub positions: Vec<[f32; 3]>,
    /// Normal deltas, one per vertex, when any primitive supplies them.
    pub normals: Option<Vec<[f32; 3]>>,
    /// Tangent deltas, one per vertex, when any primitive supplies them.
    pub tangents: Option<Vec<[f32; 3]>>,
}

/// One renderer-ready vertex buffer with its sub-meshes.
///
/// Produced per primitive cluster: primitives sharing identical attribute
/// accessors share one `MeshData` and address it through their [`SubMesh`]
/// ranges. The vertex data is interleaved according to [`VertexLayout`];
/// indices are always signed 32-bit with target winding already applied.
#[derive(Clone)]
pub struct MeshData {
    layout: VertexLayout,
    vertex_data: Vec<u8>,
    vertex_count: u32,
    indices: Vec<i32>,
    submeshes: Vec<SubMesh>,
    bounds: Aabb,
    morphs: Vec<MorphFrame>,
    label: Option<String>,
}

impl MeshData {
    /// Create a new mesh from converted buffers.
    pub fn new(layout: VertexLayout, vertex_data: Vec<u8>, indices: Vec<i32>) -> Self {
        let stride = layout.stride() as usize;
        let vertex_count = if stride > 0 {
            (vertex_data.len() / stride) as u32
        } else {
            0
        };
        Self {
            layout,
            vertex_data,
            vertex_count,
            indices,
            submeshes: Vec::new(),
            bounds: Aabb::empty(),
            morphs: Vec::new(),
            label: None,
        }
    }

    /// Set the sub-mesh ranges.
    pub fn with_submeshes(mut self, submeshes: Vec<SubMesh>) -> Self {
        self.submeshes = submeshes;
        self
    }

    /// Set the overall bounds.
    pub fn with_bounds(mut self, bounds: Aabb) -> Self {
        self.bounds = bounds;
        self
    }

    /// Set the morph frames.
    pub fn with_morphs(mut self, morphs: Vec<MorphFrame>) -> Self {
        self.morphs = morphs;
        self
    }

    /// Set a debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Vertex layout of the interleaved buffer.
    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    /// Raw interleaved vertex bytes.
    pub fn vertex_data(&self) -> &[u8] {
        &self.vertex_data
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Shared index buffer (signed 32-bit, target winding).
    pub fn indices(&self) -> &[i32] {
        &self.indices
    }

    /// Sub-mesh ranges, one per source primitive.
    pub fn submeshes(&self) -> &[SubMesh] {
        &self.submeshes
    }

    /// Union bounds of all sub-meshes.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Morph frames over this buffer's vertex index space.
    pub fn morphs(&self) -> &[MorphFrame] {
        &self.morphs
    }

    /// Debug label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Read one attribute value of one vertex as f32 components.
    ///
    /// Test and tooling convenience; renderers consume the raw buffer.
    pub fn attribute_f32(
        &self,
        semantic: crate::mesh::VertexSemantic,
        vertex: usize,
        components: usize,
    ) -> Option<Vec<f32>> {
        let attr = self.layout.find(semantic)?;
        let stride = self.layout.stride() as usize;
        let start = vertex * stride + attr.offset as usize;
        let mut out = Vec::with_capacity(components);
        for c in 0..components {
            let at = start + c * 4;
            let bytes: [u8; 4] = self.vertex_data.get(at..at + 4)?.try_into().ok()?;
            out.push(f32::from_le_bytes(bytes));
        }
        Some(out)
    }
}

impl std::fmt::Debug for MeshData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshData")
            .field("label", &self.label)
            .field("vertex_count", &self.vertex_count)
            .field("index_count", &self.indices.len())
            .field("submeshes", &self.submeshes.len())
            .field("morphs", &self.morphs.len())
            .field("stride", &self.layout.stride())
            .finish()
    }
}
