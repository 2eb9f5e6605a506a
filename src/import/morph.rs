//! Morph target (blend shape) generation.
//!
//! Every morph target slot becomes one named frame of per-vertex deltas
//! covering the cluster's whole vertex index space: each contributing
//! primitive converts its delta accessors into the `base_vertex` range it
//! owns, and vertices of primitives without that target stay zero. Deltas
//! are positions-style conversions (X negated) and are never renormalized,
//! including normal and tangent deltas. Sparse overlays — the common
//! encoding for morph data — apply on top of the dense (or zero) base.

use gltf_dep::mesh::Mesh;

use crate::jobs;
use crate::mesh::MorphFrame;

use super::access::{resolve_bytes, sparse_overlay};
use super::assemble::ConvertCx;
use super::cluster::MeshOrder;
use super::convert::sparse::apply_vec3_typed;
use super::convert::vec3::{Vec3Mode, convert_vec3_typed};
use super::error::ConvertError;

/// Build all morph frames for one order.
///
/// Frames build in parallel — each writes only its own delta arrays. An
/// error in any frame fails the order, attributed to the primitive whose
/// delta conversion failed.
pub(crate) fn build_frames(
    order: &MeshOrder,
    cx: &ConvertCx<'_>,
) -> Result<Vec<MorphFrame>, (usize, ConvertError)> {
    let target_count = order.descriptor.morph_target_count as usize;
    if target_count == 0 {
        return Ok(Vec::new());
    }

    let names = cx
        .document
        .meshes()
        .nth(order.mesh_index)
        .and_then(|mesh| target_names(&mesh))
        .unwrap_or_default();

    let slots: Vec<usize> = (0..target_count).collect();
    let frames = jobs::run_parallel(&slots, |&slot| {
        build_frame(order, cx, slot, names.get(slot).cloned())
    });
    frames.into_iter().collect()
}

/// Read `extras.targetNames`, the ecosystem convention for morph names.
fn target_names(mesh: &Mesh<'_>) -> Option<Vec<String>> {
    let raw = mesh.extras().as_deref()?;
    let value: serde_json::Value = serde_json::from_str(raw.get()).ok()?;
    let names = value.get("targetNames")?.as_array()?;
    Some(
        names
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
    )
}

fn build_frame(
    order: &MeshOrder,
    cx: &ConvertCx<'_>,
    slot: usize,
    name: Option<String>,
) -> Result<MorphFrame, (usize, ConvertError)> {
    let total = order.total_vertices;
    let has_normals = order
        .primitives
        .iter()
        .any(|r| r.targets.get(slot).is_some_and(|t| t.normals.is_some()));
    let has_tangents = order
        .primitives
        .iter()
        .any(|r| r.targets.get(slot).is_some_and(|t| t.tangents.is_some()));

    let mut positions = vec![[0.0f32; 3]; total];
    let mut normals = has_normals.then(|| vec![[0.0f32; 3]; total]);
    let mut tangents = has_tangents.then(|| vec![[0.0f32; 3]; total]);

    for recipe in &order.primitives {
        let Some(target) = recipe.targets.get(slot) else {
            continue;
        };
        let range = recipe.base_vertex..recipe.base_vertex + recipe.vertex_count;

        if let Some(acc_index) = target.positions {
            convert_deltas(cx, acc_index, &mut positions[range.clone()])
                .map_err(|e| (recipe.prim_index, e))?;
        }
        if let (Some(deltas), Some(acc_index)) = (normals.as_mut(), target.normals) {
            convert_deltas(cx, acc_index, &mut deltas[range.clone()])
                .map_err(|e| (recipe.prim_index, e))?;
        }
        if let (Some(deltas), Some(acc_index)) = (tangents.as_mut(), target.tangents) {
            convert_deltas(cx, acc_index, &mut deltas[range.clone()])
                .map_err(|e| (recipe.prim_index, e))?;
        }
    }

    Ok(MorphFrame {
        name: name.unwrap_or_else(|| format!("morph_{slot}")),
        positions,
        normals,
        tangents,
    })
}

/// Dense-then-sparse delta conversion into one primitive's vertex range.
fn convert_deltas(
    cx: &ConvertCx<'_>,
    acc_index: usize,
    dst: &mut [[f32; 3]],
) -> Result<(), ConvertError> {
    let acc = cx.accessor(acc_index)?;
    let count = acc.count().min(dst.len());

    if let Some((src, src_stride)) = resolve_bytes(acc, cx.buffers)? {
        convert_vec3_typed(
            Vec3Mode::Delta,
            acc.data_type(),
            acc.normalized(),
            src,
            src_stride,
            count,
            &mut dst[..count],
        )?;
    }
    if let Some(overlay) = sparse_overlay(acc, cx.buffers)? {
        apply_vec3_typed(
            &overlay,
            Vec3Mode::Delta,
            acc.data_type(),
            acc.normalized(),
            dst,
            cx.settings.validate_sparse_indices,
        )?;
    }
    Ok(())
}
