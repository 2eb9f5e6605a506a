//! Vertex buffer assembly.
//!
//! Builds one interleaved buffer per [`MeshOrder`]: the buffer is allocated
//! for the cluster's total vertex count, statically partitioned into
//! per-primitive chunks, and every chunk converts in parallel. Within a
//! chunk, each attribute's dense kernel runs first and its sparse overlay
//! (when present) immediately after, which is the only ordering the
//! pipeline needs — attributes write disjoint byte ranges, chunks write
//! disjoint buffer ranges, and nothing takes a lock.
//!
//! Any kernel failure aborts the whole buffer: a mesh cannot be partially
//! valid, so the caller records a failure for every member primitive and
//! the rest of the asset continues.

use gltf_dep::Document;
use gltf_dep::accessor::Accessor;

use crate::jobs;
use crate::math::{Aabb, Vec3};
use crate::mesh::{MeshData, SubMesh, VertexSemantic};

use super::ImportSettings;
use super::access::{declared_bounds, resolve_bytes, sparse_overlay};
use super::cluster::{MeshOrder, PrimitiveRecipe};
use super::convert::index::{convert_indices, primitive_indices, sequential_indices};
use super::convert::sparse;
use super::convert::vec3::{Vec3Mode, convert_tangents, convert_vec3};
use super::convert::{color, skin, uv};
use super::error::{ConvertError, ErrorCode};
use super::morph;

/// Read-only context shared by all conversion jobs of one import.
pub(crate) struct ConvertCx<'a> {
    pub document: &'a Document,
    pub buffers: &'a [Vec<u8>],
    pub settings: &'a ImportSettings,
    /// All accessors, collected once for O(1) lookup from worker threads.
    pub accessors: Vec<Accessor<'a>>,
}

impl<'a> ConvertCx<'a> {
    pub fn new(
        document: &'a Document,
        buffers: &'a [Vec<u8>],
        settings: &'a ImportSettings,
    ) -> Self {
        let accessors = document.accessors().collect();
        Self {
            document,
            buffers,
            settings,
            accessors,
        }
    }

    pub fn accessor(&self, index: usize) -> Result<&Accessor<'a>, ConvertError> {
        self.accessors.get(index).ok_or_else(|| {
            ConvertError::new(
                ErrorCode::TruncatedData,
                format!("accessor index {index} out of range"),
            )
        })
    }
}

/// Result of one primitive's chunk conversion.
struct PrimOut {
    indices: Vec<i32>,
    topology: crate::mesh::PrimitiveTopology,
    bounds: Aabb,
}

/// Build the shared buffer for one order.
///
/// On error, returns the index of the primitive whose conversion failed and
/// the kernel error; the caller fails every member primitive of the order.
pub(crate) fn build_order(
    order: &MeshOrder,
    cx: &ConvertCx<'_>,
) -> Result<MeshData, (usize, ConvertError)> {
    let stride = order.layout.stride() as usize;
    let mut vertex_data = vec![0u8; order.total_vertices * stride];

    let sizes: Vec<usize> = order
        .primitives
        .iter()
        .map(|recipe| recipe.vertex_count * stride)
        .collect();
    let chunks = jobs::split_ranges(&mut vertex_data, &sizes);

    let outs = jobs::convert_chunks(chunks, &order.primitives, |chunk, recipe| {
        convert_primitive(chunk, recipe, order, cx).map_err(|e| (recipe.prim_index, e))
    })?;

    // Join complete: stitch per-primitive index ranges into one buffer.
    let total_indices: usize = outs.iter().map(|o| o.indices.len()).sum();
    let mut indices = Vec::with_capacity(total_indices);
    let mut submeshes = Vec::with_capacity(outs.len());
    let mut bounds = Aabb::empty();

    for (recipe, out) in order.primitives.iter().zip(&outs) {
        let index_start = indices.len() as u32;
        indices.extend_from_slice(&out.indices);
        bounds.merge(&out.bounds);
        submeshes.push(SubMesh {
            base_vertex: recipe.base_vertex as u32,
            index_start,
            index_count: out.indices.len() as u32,
            topology: out.topology,
            material: recipe.material,
            bounds: out.bounds,
        });
    }

    let morphs = morph::build_frames(order, cx)?;

    let mut data = MeshData::new(order.layout.clone(), vertex_data, indices)
        .with_submeshes(submeshes)
        .with_bounds(bounds)
        .with_morphs(morphs);
    if let Some(label) = &order.label {
        data = data.with_label(label.clone());
    }
    Ok(data)
}

/// Convert every attribute of one primitive into its chunk, then its
/// indices and bounds.
fn convert_primitive(
    chunk: &mut [u8],
    recipe: &PrimitiveRecipe,
    order: &MeshOrder,
    cx: &ConvertCx<'_>,
) -> Result<PrimOut, ConvertError> {
    let layout = &order.layout;
    let stride = layout.stride() as usize;
    let count = recipe.vertex_count;
    let validate = cx.settings.validate_sparse_indices;

    if order.compressed {
        return convert_compressed(chunk, recipe, order, cx);
    }

    // POSITION: dense (or zero base), then sparse overlay.
    let pos_offset = layout.offset_of(VertexSemantic::Position).unwrap_or(0) as usize;
    let pos_acc = cx.accessor(recipe.attributes.position)?;
    convert_vec3_attribute(
        Vec3Mode::Position,
        pos_acc,
        cx,
        count,
        chunk,
        pos_offset,
        stride,
        validate,
    )?;

    if let (Some(offset), Some(acc_index)) = (
        layout.offset_of(VertexSemantic::Normal),
        recipe.attributes.normal,
    ) {
        let acc = cx.accessor(acc_index)?;
        convert_vec3_attribute(
            Vec3Mode::Normal,
            acc,
            cx,
            count,
            chunk,
            offset as usize,
            stride,
            validate,
        )?;
    }

    if let (Some(offset), Some(acc_index)) = (
        layout.offset_of(VertexSemantic::Tangent),
        recipe.attributes.tangent,
    ) {
        let acc = cx.accessor(acc_index)?;
        let offset = offset as usize;
        if let Some((src, src_stride)) = resolve_bytes(acc, cx.buffers)? {
            convert_tangents(
                acc.data_type(),
                acc.normalized(),
                src,
                src_stride,
                count,
                chunk,
                offset,
                stride,
            )?;
        }
        if let Some(overlay) = sparse_overlay(acc, cx.buffers)? {
            sparse::apply_tangent(
                &overlay,
                acc.data_type(),
                acc.normalized(),
                count,
                chunk,
                offset,
                stride,
                validate,
            )?;
        }
    }

    for (set, &acc_index) in recipe.attributes.tex_coords.iter().enumerate() {
        let Some(offset) = layout.offset_of(VertexSemantic::TexCoord(set as u8)) else {
            continue;
        };
        let acc = cx.accessor(acc_index)?;
        let (src, src_stride) = require_bytes(acc, cx)?;
        uv::convert_uvs(
            acc.data_type(),
            acc.normalized(),
            src,
            src_stride,
            count,
            chunk,
            offset as usize,
            stride,
        )?;
        warn_unsupported_sparse(acc, "TEXCOORD");
    }

    if let (Some(offset), Some(acc_index)) = (
        layout.offset_of(VertexSemantic::Color),
        recipe.attributes.color,
    ) {
        let acc = cx.accessor(acc_index)?;
        let (src, src_stride) = require_bytes(acc, cx)?;
        color::convert_colors(
            acc.dimensions(),
            acc.data_type(),
            src,
            src_stride,
            count,
            chunk,
            offset as usize,
            stride,
        )?;
        warn_unsupported_sparse(acc, "COLOR");
    }

    if let (Some(joints_offset), Some(weights_offset), Some(joints_index), Some(weights_index)) = (
        layout.offset_of(VertexSemantic::Joints),
        layout.offset_of(VertexSemantic::Weights),
        recipe.attributes.joints,
        recipe.attributes.weights,
    ) {
        let acc = cx.accessor(joints_index)?;
        let (src, src_stride) = require_bytes(acc, cx)?;
        skin::convert_joints(
            acc.data_type(),
            src,
            src_stride,
            count,
            chunk,
            joints_offset as usize,
            stride,
        )?;
        warn_unsupported_sparse(acc, "JOINTS");

        let acc = cx.accessor(weights_index)?;
        let (src, src_stride) = require_bytes(acc, cx)?;
        skin::convert_weights(
            acc.data_type(),
            src,
            src_stride,
            count,
            chunk,
            weights_offset as usize,
            stride,
        )?;
        warn_unsupported_sparse(acc, "WEIGHTS");
    }

    let (indices, topology) = convert_primitive_indices(recipe, cx)?;
    let bounds = primitive_bounds(pos_acc, chunk, pos_offset, stride, count, recipe);

    Ok(PrimOut {
        indices,
        topology,
        bounds,
    })
}

/// Dense-then-sparse conversion for a vec3 attribute.
///
/// A metadata-only accessor with sparse data overlays a zero base; a
/// metadata-only accessor without sparse data converts nothing (codec
/// placeholders are routed to [`convert_compressed`] before this point).
#[allow(clippy::too_many_arguments)]
fn convert_vec3_attribute(
    mode: Vec3Mode,
    acc: &Accessor<'_>,
    cx: &ConvertCx<'_>,
    count: usize,
    dst: &mut [u8],
    dst_offset: usize,
    dst_stride: usize,
    validate: bool,
) -> Result<(), ConvertError> {
    if let Some((src, src_stride)) = resolve_bytes(acc, cx.buffers)? {
        convert_vec3(
            mode,
            acc.data_type(),
            acc.normalized(),
            src,
            src_stride,
            count,
            dst,
            dst_offset,
            dst_stride,
        )?;
    }
    if let Some(overlay) = sparse_overlay(acc, cx.buffers)? {
        sparse::apply_vec3(
            &overlay,
            mode,
            acc.data_type(),
            acc.normalized(),
            count,
            dst,
            dst_offset,
            dst_stride,
            validate,
        )?;
    }
    Ok(())
}

/// Resolve bytes for a role that has no zero-base fallback.
fn require_bytes<'a>(
    acc: &Accessor<'_>,
    cx: &ConvertCx<'a>,
) -> Result<(&'a [u8], usize), ConvertError> {
    resolve_bytes(acc, cx.buffers)?.ok_or_else(|| {
        ConvertError::new(
            ErrorCode::TruncatedData,
            format!("accessor {} has no buffer view", acc.index()),
        )
    })
}

/// Log the sparse-on-unsupported-role warning; dense values stand.
fn warn_unsupported_sparse(acc: &Accessor<'_>, role: &str) {
    if acc.sparse().is_some() {
        log::warn!(
            "[{}] sparse override on {role} accessor {} ignored",
            ErrorCode::SparseUnsupportedRole,
            acc.index()
        );
    }
}

/// Widen/compute the index list and expand it for the draw mode.
fn convert_primitive_indices(
    recipe: &PrimitiveRecipe,
    cx: &ConvertCx<'_>,
) -> Result<(Vec<i32>, crate::mesh::PrimitiveTopology), ConvertError> {
    let raw = match recipe.indices {
        Some(acc_index) => {
            let acc = cx.accessor(acc_index)?;
            let (src, src_stride) = require_bytes(acc, cx)?;
            convert_indices(acc.data_type(), src, src_stride, acc.count())?
        }
        None => sequential_indices(recipe.vertex_count),
    };
    primitive_indices(recipe.mode, raw)
}

/// Declared bounds when present, recomputed from converted data otherwise.
///
/// Recomputation reads the chunk after all position writes (dense and
/// sparse), so it reflects the final values; the slow path is logged.
fn primitive_bounds(
    pos_acc: &Accessor<'_>,
    chunk: &[u8],
    pos_offset: usize,
    stride: usize,
    count: usize,
    recipe: &PrimitiveRecipe,
) -> Aabb {
    if let Some(bounds) = declared_bounds(pos_acc) {
        return bounds;
    }
    log::warn!(
        "[{}] mesh {} primitive {}: position accessor {} has no min/max, recomputing bounds",
        ErrorCode::MissingBounds,
        recipe.mesh_index,
        recipe.prim_index,
        pos_acc.index()
    );
    bounds_from_chunk(chunk, pos_offset, stride, count)
}

fn bounds_from_chunk(chunk: &[u8], pos_offset: usize, stride: usize, count: usize) -> Aabb {
    let mut bounds = Aabb::empty();
    for i in 0..count {
        let at = i * stride + pos_offset;
        let x = f32::from_le_bytes([chunk[at], chunk[at + 1], chunk[at + 2], chunk[at + 3]]);
        let y = f32::from_le_bytes([
            chunk[at + 4],
            chunk[at + 5],
            chunk[at + 6],
            chunk[at + 7],
        ]);
        let z = f32::from_le_bytes([
            chunk[at + 8],
            chunk[at + 9],
            chunk[at + 10],
            chunk[at + 11],
        ]);
        bounds.grow(Vec3::new(x, y, z));
    }
    bounds
}

/// Convert a codec-placeholder primitive through the decompressor
/// collaborator.
///
/// The decoder hands back glTF-convention f32 arrays; they run through the
/// same kernels as raw accessor data (viewed as tightly packed bytes), so
/// the handedness and winding conversions stay in one place.
fn convert_compressed(
    chunk: &mut [u8],
    recipe: &PrimitiveRecipe,
    order: &MeshOrder,
    cx: &ConvertCx<'_>,
) -> Result<PrimOut, ConvertError> {
    let Some(decompressor) = &cx.settings.decompressor else {
        return Err(ConvertError::new(
            ErrorCode::CompressedPrimitive,
            format!(
                "mesh {} primitive {} carries compressed data and no decompressor is configured",
                recipe.mesh_index, recipe.prim_index
            ),
        ));
    };
    let decoded = decompressor
        .decode(recipe.mesh_index, recipe.prim_index)
        .ok_or_else(|| {
            ConvertError::new(
                ErrorCode::CompressedPrimitive,
                format!(
                    "decompressor produced no data for mesh {} primitive {}",
                    recipe.mesh_index, recipe.prim_index
                ),
            )
        })?;

    let count = recipe.vertex_count;
    if decoded.positions.len() != count {
        return Err(ConvertError::new(
            ErrorCode::CompressedPrimitive,
            format!(
                "decompressor returned {} vertices, accessor declares {count}",
                decoded.positions.len()
            ),
        ));
    }

    let layout = &order.layout;
    let stride = layout.stride() as usize;
    use gltf_dep::accessor::DataType;

    let pos_offset = layout.offset_of(VertexSemantic::Position).unwrap_or(0) as usize;
    convert_vec3(
        Vec3Mode::Position,
        DataType::F32,
        false,
        bytemuck::cast_slice(&decoded.positions),
        12,
        count,
        chunk,
        pos_offset,
        stride,
    )?;

    if let (Some(offset), Some(normals)) =
        (layout.offset_of(VertexSemantic::Normal), &decoded.normals)
    {
        convert_vec3(
            Vec3Mode::Normal,
            DataType::F32,
            false,
            bytemuck::cast_slice(normals),
            12,
            count,
            chunk,
            offset as usize,
            stride,
        )?;
    }

    if let (Some(offset), Some(tangents)) =
        (layout.offset_of(VertexSemantic::Tangent), &decoded.tangents)
    {
        convert_tangents(
            DataType::F32,
            false,
            bytemuck::cast_slice(tangents),
            16,
            count,
            chunk,
            offset as usize,
            stride,
        )?;
    }

    for (set, coords) in decoded.tex_coords.iter().enumerate() {
        let Some(offset) = layout.offset_of(VertexSemantic::TexCoord(set as u8)) else {
            continue;
        };
        uv::convert_uvs(
            DataType::F32,
            false,
            bytemuck::cast_slice(coords),
            8,
            count,
            chunk,
            offset as usize,
            stride,
        )?;
    }

    let raw = match &decoded.indices {
        Some(source) => {
            let bytes: &[u8] = bytemuck::cast_slice(source);
            convert_indices(DataType::U32, bytes, 4, source.len())?
        }
        None => sequential_indices(count),
    };
    let (indices, topology) = primitive_indices(recipe.mode, raw)?;

    let pos_acc = cx.accessor(recipe.attributes.position)?;
    let bounds = primitive_bounds(pos_acc, chunk, pos_offset, stride, count, recipe);

    Ok(PrimOut {
        indices,
        topology,
        bounds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_from_chunk_tracks_extremes() {
        let mut chunk = Vec::new();
        for v in [[0.0f32, 0.0, 0.0], [-2.0, 1.0, 0.5], [1.0, -3.0, 2.0]] {
            for c in v {
                chunk.extend_from_slice(&c.to_le_bytes());
            }
        }
        let bounds = bounds_from_chunk(&chunk, 0, 12, 3);
        assert_eq!(bounds.min, Vec3::new(-2.0, -3.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 1.0, 2.0));
    }
}
