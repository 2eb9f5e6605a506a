//! Accessor resolution and usage tracking.
//!
//! Resolution maps an accessor to its raw byte slice and effective stride
//! inside the already-validated buffers. Accessors without a buffer view
//! (codec placeholders, sparse-over-zero bases) resolve to `None` and
//! callers decide what that means for their role.
//!
//! The usage table records every semantic role each accessor is used in. It
//! is built in a single pass over meshes, skins, and animations before any
//! conversion is issued, then read-only — conversion jobs never mutate
//! shared state.

use bitflags::bitflags;
use gltf_dep::accessor::{Accessor, DataType};
use gltf_dep::{Document, Semantic};

use crate::math::{Aabb, Vec3};

use super::convert::sparse::SparseOverlay;
use super::error::{ConvertError, ErrorCode, ImportError};

bitflags! {
    /// Semantic roles an accessor is consumed in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccessorUsage: u32 {
        /// Index buffer, source winding kept.
        const INDEX = 1 << 0;
        /// Index buffer with the triangle winding flip applied.
        const INDEX_FLIPPED = 1 << 1;
        /// Vertex position or morph position delta.
        const POSITION = 1 << 2;
        /// Vertex normal or morph normal delta.
        const NORMAL = 1 << 3;
        /// Vertex tangent or morph tangent delta.
        const TANGENT = 1 << 4;
        /// Texture coordinates (any set).
        const UV = 1 << 5;
        /// Vertex color.
        const COLOR = 1 << 6;
        /// Bone joint indices.
        const BONE_INDEX = 1 << 7;
        /// Bone or morph weights.
        const WEIGHT = 1 << 8;
        /// Skin inverse bind matrices.
        const INVERSE_BIND_MATRIX = 1 << 9;
        /// Animation sampler input (key times).
        const ANIMATION_TIMES = 1 << 10;
        /// Animation or instance translation stream.
        const TRANSLATION = 1 << 11;
        /// Animation or instance rotation stream.
        const ROTATION = 1 << 12;
        /// Animation or instance scale stream.
        const SCALE = 1 << 13;
        /// Converted data must outlive volatile cleanup.
        const REQUIRED_FOR_INSTANTIATION = 1 << 14;
    }
}

impl AccessorUsage {
    /// The role bits, excluding the retention marker.
    pub fn roles(self) -> AccessorUsage {
        self & !Self::REQUIRED_FOR_INSTANTIATION
    }
}

/// Resolution policy when one accessor is used in two different roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UsagePolicy {
    /// Keep the first recorded role, ignore later ones.
    FirstWins,
    /// Later roles replace earlier ones (reference behavior).
    #[default]
    LastWins,
    /// Treat the conflict as a structural failure.
    Fail,
}

/// Per-accessor usage, built once before conversion.
#[derive(Debug, Default)]
pub struct UsageTable {
    usages: Vec<AccessorUsage>,
}

impl UsageTable {
    /// Usage of an accessor; empty for indices never referenced.
    pub fn usage(&self, accessor: usize) -> AccessorUsage {
        self.usages.get(accessor).copied().unwrap_or_default()
    }

    /// Whether the accessor's converted data must be retained.
    pub fn is_retained(&self, accessor: usize) -> bool {
        self.usage(accessor)
            .contains(AccessorUsage::REQUIRED_FOR_INSTANTIATION)
    }

    fn mark(
        &mut self,
        accessor: usize,
        usage: AccessorUsage,
        policy: UsagePolicy,
    ) -> Result<(), ImportError> {
        if accessor >= self.usages.len() {
            self.usages.resize(accessor + 1, AccessorUsage::empty());
        }

        let existing = self.usages[accessor].roles();
        let requested = usage.roles();
        if !existing.is_empty() && existing != requested {
            log::error!(
                "[{}] accessor {accessor} used as {existing:?} and {requested:?}",
                ErrorCode::InconsistentUsage
            );
            match policy {
                UsagePolicy::FirstWins => {
                    // Keep existing roles; still honor a retention request.
                    self.usages[accessor] |= usage & AccessorUsage::REQUIRED_FOR_INSTANTIATION;
                    return Ok(());
                }
                UsagePolicy::LastWins => {
                    let retained = self.usages[accessor] & AccessorUsage::REQUIRED_FOR_INSTANTIATION;
                    self.usages[accessor] = usage | retained;
                    return Ok(());
                }
                UsagePolicy::Fail => {
                    return Err(ImportError::UsageConflict {
                        accessor,
                        previous: format!("{existing:?}"),
                        requested: format!("{requested:?}"),
                    });
                }
            }
        }

        self.usages[accessor] |= usage;
        Ok(())
    }
}

/// Build the usage table in one pass over the document.
///
/// Caller-supplied instancing accessor sets are folded in so their streams
/// carry the retention flag like any other instantiation-required data.
pub(crate) fn build_usage_table(
    document: &Document,
    policy: UsagePolicy,
    instance_transforms: &[super::InstanceTransformAccessors],
) -> Result<UsageTable, ImportError> {
    let mut table = UsageTable::default();

    for mesh in document.meshes() {
        for primitive in mesh.primitives() {
            if let Some(indices) = primitive.indices() {
                let usage = match primitive.mode() {
                    gltf_dep::mesh::Mode::Triangles
                    | gltf_dep::mesh::Mode::TriangleStrip
                    | gltf_dep::mesh::Mode::TriangleFan => AccessorUsage::INDEX_FLIPPED,
                    _ => AccessorUsage::INDEX,
                };
                table.mark(indices.index(), usage, policy)?;
            }

            for (semantic, accessor) in primitive.attributes() {
                let usage = match semantic {
                    Semantic::Positions => AccessorUsage::POSITION,
                    Semantic::Normals => AccessorUsage::NORMAL,
                    Semantic::Tangents => AccessorUsage::TANGENT,
                    Semantic::TexCoords(_) => AccessorUsage::UV,
                    Semantic::Colors(_) => AccessorUsage::COLOR,
                    Semantic::Joints(_) => AccessorUsage::BONE_INDEX,
                    Semantic::Weights(_) => AccessorUsage::WEIGHT,
                    // Custom application-specific attributes are not imported
                    // (cf. cluster.rs, which ignores them), so skip marking.
                    Semantic::Extras(_) => continue,
                };
                table.mark(accessor.index(), usage, policy)?;
            }

            for target in primitive.morph_targets() {
                if let Some(acc) = target.positions() {
                    table.mark(acc.index(), AccessorUsage::POSITION, policy)?;
                }
                if let Some(acc) = target.normals() {
                    table.mark(acc.index(), AccessorUsage::NORMAL, policy)?;
                }
                if let Some(acc) = target.tangents() {
                    table.mark(acc.index(), AccessorUsage::TANGENT, policy)?;
                }
            }
        }
    }

    for skin in document.skins() {
        if let Some(acc) = skin.inverse_bind_matrices() {
            table.mark(
                acc.index(),
                AccessorUsage::INVERSE_BIND_MATRIX | AccessorUsage::REQUIRED_FOR_INSTANTIATION,
                policy,
            )?;
        }
    }

    for animation in document.animations() {
        for channel in animation.channels() {
            let sampler = channel.sampler();
            table.mark(
                sampler.input().index(),
                AccessorUsage::ANIMATION_TIMES | AccessorUsage::REQUIRED_FOR_INSTANTIATION,
                policy,
            )?;
            let output_usage = match channel.target().property() {
                gltf_dep::animation::Property::Translation => AccessorUsage::TRANSLATION,
                gltf_dep::animation::Property::Rotation => AccessorUsage::ROTATION,
                gltf_dep::animation::Property::Scale => AccessorUsage::SCALE,
                gltf_dep::animation::Property::MorphTargetWeights => AccessorUsage::WEIGHT,
            };
            table.mark(
                sampler.output().index(),
                output_usage | AccessorUsage::REQUIRED_FOR_INSTANTIATION,
                policy,
            )?;
        }
    }

    for set in instance_transforms {
        if let Some(accessor) = set.translation {
            table.mark(
                accessor,
                AccessorUsage::TRANSLATION | AccessorUsage::REQUIRED_FOR_INSTANTIATION,
                policy,
            )?;
        }
        if let Some(accessor) = set.rotation {
            table.mark(
                accessor,
                AccessorUsage::ROTATION | AccessorUsage::REQUIRED_FOR_INSTANTIATION,
                policy,
            )?;
        }
        if let Some(accessor) = set.scale {
            table.mark(
                accessor,
                AccessorUsage::SCALE | AccessorUsage::REQUIRED_FOR_INSTANTIATION,
                policy,
            )?;
        }
    }

    Ok(table)
}

/// Resolve an accessor's raw bytes and effective stride.
///
/// Returns `None` for metadata-only accessors (no buffer view). The slice
/// is clipped to the view's byte range; per-element bounds are checked by
/// the kernels. The stride defaults to the tightly-packed element size when
/// the view declares none.
pub(crate) fn resolve_bytes<'a>(
    accessor: &Accessor,
    buffers: &'a [Vec<u8>],
) -> Result<Option<(&'a [u8], usize)>, ConvertError> {
    let Some(view) = accessor.view() else {
        return Ok(None);
    };

    let buffer_index = view.buffer().index();
    let buffer = buffers.get(buffer_index).ok_or_else(|| {
        ConvertError::new(
            ErrorCode::TruncatedData,
            format!("buffer index {buffer_index} out of range"),
        )
    })?;

    let element_size = accessor.size();
    let stride = view.stride().unwrap_or(element_size);
    let start = view.offset() + accessor.offset();
    let end = view.offset() + view.length();
    if start > end || end > buffer.len() {
        return Err(ConvertError::new(
            ErrorCode::TruncatedData,
            format!(
                "accessor {} starts at {start} beyond its view ({}..{end})",
                accessor.index(),
                view.offset()
            ),
        ));
    }

    Ok(Some((&buffer[start..end], stride)))
}

/// Resolve a sparse accessor's index/value streams, if it has any.
pub(crate) fn sparse_overlay<'a>(
    accessor: &Accessor,
    buffers: &'a [Vec<u8>],
) -> Result<Option<SparseOverlay<'a>>, ConvertError> {
    let Some(sparse) = accessor.sparse() else {
        return Ok(None);
    };

    let count = sparse.count() as usize;
    let indices = sparse.indices();
    let values = sparse.values();

    let index_type = match indices.index_type() {
        gltf_dep::accessor::sparse::IndexType::U8 => DataType::U8,
        gltf_dep::accessor::sparse::IndexType::U16 => DataType::U16,
        gltf_dep::accessor::sparse::IndexType::U32 => DataType::U32,
    };
    let index_size = index_type.size();

    let index_view = indices.view();
    let index_buffer = buffers.get(index_view.buffer().index()).ok_or_else(|| {
        ConvertError::new(ErrorCode::TruncatedData, "sparse index buffer out of range")
    })?;
    let index_start = index_view.offset() + indices.offset() as usize;
    let index_end = index_view.offset() + index_view.length();
    let index_stride = index_view.stride().unwrap_or(index_size);

    let value_view = values.view();
    let value_buffer = buffers.get(value_view.buffer().index()).ok_or_else(|| {
        ConvertError::new(ErrorCode::TruncatedData, "sparse value buffer out of range")
    })?;
    let value_start = value_view.offset() + values.offset() as usize;
    let value_end = value_view.offset() + value_view.length();
    let value_stride = value_view.stride().unwrap_or(accessor.size());

    if index_start > index_end || index_end > index_buffer.len() {
        return Err(ConvertError::new(
            ErrorCode::TruncatedData,
            "sparse index view out of range",
        ));
    }
    if value_start > value_end || value_end > value_buffer.len() {
        return Err(ConvertError::new(
            ErrorCode::TruncatedData,
            "sparse value view out of range",
        ));
    }

    Ok(Some(SparseOverlay {
        count,
        indices: &index_buffer[index_start..index_end],
        index_type,
        index_stride,
        values: &value_buffer[value_start..value_end],
        value_stride,
    }))
}

/// Read an accessor's declared min/max as position bounds.
///
/// The handedness conversion negates X, so the declared X extremes swap:
/// `out.min.x = -in.max.x` and `out.max.x = -in.min.x`.
pub(crate) fn declared_bounds(accessor: &Accessor) -> Option<Aabb> {
    let min = parse_vec3(accessor.min()?)?;
    let max = parse_vec3(accessor.max()?)?;
    Some(Aabb::new(
        Vec3::new(-max[0], min[1], min[2]),
        Vec3::new(-min[0], max[1], max[2]),
    ))
}

fn parse_vec3(value: serde_json::Value) -> Option<[f32; 3]> {
    let array = value.as_array()?;
    if array.len() < 3 {
        return None;
    }
    let mut out = [0.0f32; 3];
    for (slot, item) in out.iter_mut().zip(array.iter()) {
        *slot = item.as_f64()? as f32;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_roles_excludes_retention() {
        let u = AccessorUsage::TRANSLATION | AccessorUsage::REQUIRED_FOR_INSTANTIATION;
        assert_eq!(u.roles(), AccessorUsage::TRANSLATION);
    }

    #[test]
    fn mark_same_role_twice_is_not_a_conflict() {
        let mut table = UsageTable::default();
        table.mark(0, AccessorUsage::UV, UsagePolicy::Fail).unwrap();
        table.mark(0, AccessorUsage::UV, UsagePolicy::Fail).unwrap();
        assert_eq!(table.usage(0), AccessorUsage::UV);
    }

    #[test]
    fn conflict_last_wins() {
        let mut table = UsageTable::default();
        table
            .mark(2, AccessorUsage::POSITION, UsagePolicy::LastWins)
            .unwrap();
        table
            .mark(2, AccessorUsage::NORMAL, UsagePolicy::LastWins)
            .unwrap();
        assert_eq!(table.usage(2), AccessorUsage::NORMAL);
    }

    #[test]
    fn conflict_first_wins() {
        let mut table = UsageTable::default();
        table
            .mark(2, AccessorUsage::POSITION, UsagePolicy::FirstWins)
            .unwrap();
        table
            .mark(2, AccessorUsage::NORMAL, UsagePolicy::FirstWins)
            .unwrap();
        assert_eq!(table.usage(2), AccessorUsage::POSITION);
    }

    #[test]
    fn conflict_fail_policy_errors() {
        let mut table = UsageTable::default();
        table
            .mark(1, AccessorUsage::INDEX, UsagePolicy::Fail)
            .unwrap();
        let err = table.mark(1, AccessorUsage::POSITION, UsagePolicy::Fail);
        assert!(matches!(err, Err(ImportError::UsageConflict { accessor: 1, .. })));
    }

    #[test]
    fn retention_survives_conflict_resolution() {
        let mut table = UsageTable::default();
        table
            .mark(
                0,
                AccessorUsage::ANIMATION_TIMES | AccessorUsage::REQUIRED_FOR_INSTANTIATION,
                UsagePolicy::LastWins,
            )
            .unwrap();
        table
            .mark(0, AccessorUsage::UV, UsagePolicy::LastWins)
            .unwrap();
        assert!(table.is_retained(0));
        assert_eq!(table.usage(0).roles(), AccessorUsage::UV);
    }

    #[test]
    fn unreferenced_accessor_has_empty_usage() {
        let table = UsageTable::default();
        assert!(table.usage(99).is_empty());
        assert!(!table.is_retained(99));
    }

    #[test]
    fn parse_vec3_accepts_numbers() {
        let v: serde_json::Value = serde_json::json!([1.0, 2.5, -3.0]);
        assert_eq!(parse_vec3(v), Some([1.0, 2.5, -3.0]));
        let short: serde_json::Value = serde_json::json!([1.0]);
        assert_eq!(parse_vec3(short), None);
    }
}
