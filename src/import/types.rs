//! Importer output types.

use std::collections::HashMap;

use crate::mesh::MeshData;

use super::buffers::GlbBinChunk;
use super::error::ErrorCode;

/// One shared vertex buffer assigned to a mesh, with the source primitives
/// that became its sub-meshes.
///
/// The i-th entry of `primitive_indices` names the glTF primitive behind
/// `data.submeshes()[i]`.
#[derive(Debug)]
pub struct MeshAssignment {
    /// glTF mesh index this buffer belongs to.
    pub mesh_index: usize,
    /// The converted buffer and its sub-meshes.
    pub data: MeshData,
    /// glTF primitive indices in sub-mesh order.
    pub primitive_indices: Vec<usize>,
}

/// Record of one primitive that failed to convert.
///
/// Failures are isolated: the rest of the asset still loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveFailure {
    /// glTF mesh index.
    pub mesh_index: usize,
    /// glTF primitive index within the mesh.
    pub prim_index: usize,
    /// Stable diagnostic code.
    pub code: ErrorCode,
    /// Human-readable context.
    pub detail: String,
}

/// A converted accessor stream retained past volatile cleanup.
///
/// Only accessors whose usage carries `REQUIRED_FOR_INSTANTIATION` (inverse
/// bind matrices, animation channels, instance transforms) are kept; mesh
/// attribute conversions live inside their [`MeshData`] and are not
/// duplicated here.
#[derive(Debug, Clone, PartialEq)]
pub enum ConvertedStream {
    /// Key times, morph weights.
    Scalars(Vec<f32>),
    /// Translations and scales (handedness-corrected).
    Vectors(Vec<[f32; 3]>),
    /// Unit quaternions (handedness-corrected), `[x, y, z, w]`.
    Rotations(Vec<[f32; 4]>),
    /// Column-major 4x4 matrices (handedness-corrected).
    Matrices(Vec<[f32; 16]>),
}

/// Converted skin data.
#[derive(Debug, Clone)]
pub struct SkinData {
    /// Skin name from the document.
    pub name: Option<String>,
    /// Joint node indices.
    pub joints: Vec<usize>,
    /// One handedness-corrected inverse bind matrix per joint.
    pub inverse_bind_matrices: Vec<[f32; 16]>,
    /// Skeleton root node, if declared.
    pub skeleton: Option<usize>,
}

/// Animated node property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelProperty {
    /// Node translation.
    Translation,
    /// Node rotation.
    Rotation,
    /// Node scale.
    Scale,
    /// Mesh morph target weights.
    MorphWeights,
}

/// Keyframe interpolation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// Linear (spherical-linear for rotations).
    Linear,
    /// Step (constant until the next key).
    Step,
    /// Cubic spline with in/out tangents.
    CubicSpline,
}

/// One animation channel; its converted key data lives in
/// [`ImportOutput::streams`] under the two accessor indices.
#[derive(Debug, Clone)]
pub struct ChannelData {
    /// Target node index.
    pub target_node: usize,
    /// Animated property.
    pub property: ChannelProperty,
    /// Interpolation mode.
    pub interpolation: Interpolation,
    /// Accessor index of the key times stream.
    pub input: usize,
    /// Accessor index of the key values stream.
    pub output: usize,
}

/// Converted animation clip structure.
#[derive(Debug, Clone)]
pub struct AnimationData {
    /// Clip name from the document.
    pub name: Option<String>,
    /// All channels of the clip.
    pub channels: Vec<ChannelData>,
}

/// Everything the importer hands to the host renderer.
#[derive(Debug, Default)]
pub struct ImportOutput {
    /// Converted vertex/index buffers, one per primitive cluster.
    pub meshes: Vec<MeshAssignment>,
    /// `(mesh, primitive)` → `(meshes index, submesh index)`.
    pub primitive_map: HashMap<(usize, usize), (usize, usize)>,
    /// Retained converted streams keyed by accessor index.
    pub streams: HashMap<usize, ConvertedStream>,
    /// Converted skins.
    pub skins: Vec<SkinData>,
    /// Converted animation clips.
    pub animations: Vec<AnimationData>,
    /// Primitives that failed to convert.
    pub failures: Vec<PrimitiveFailure>,
    /// GLB binary chunk record, when the asset was a GLB.
    pub bin_chunk: Option<GlbBinChunk>,
}

impl ImportOutput {
    /// Whether every primitive converted successfully.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Locate a glTF primitive's output buffer and sub-mesh.
    pub fn find_primitive(&self, mesh: usize, primitive: usize) -> Option<(usize, usize)> {
        self.primitive_map.get(&(mesh, primitive)).copied()
    }
}
