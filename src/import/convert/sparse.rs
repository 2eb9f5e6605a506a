//! Sparse accessor overlays.
//!
//! A sparse accessor overrides a dense (or zero-initialized) base at the
//! element indices it lists. Overlays always run after the dense kernel for
//! the same accessor — within the pipeline that ordering holds by
//! construction, because both run inside the same per-primitive job.
//!
//! Overlays are applied for vec3-shaped roles only (position, normal,
//! tangent, morph deltas); a sparse accessor in any other role keeps its
//! dense values and logs a warning upstream.

use gltf_dep::accessor::DataType;

use super::super::error::{ConvertError, ErrorCode};
use super::vec3::{Vec3Mode, convert_one, convert_one_tangent};
use super::{Component, check_source, write_f32};

/// Resolved byte views of a sparse accessor's index and value streams.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SparseOverlay<'a> {
    /// Number of overridden elements.
    pub count: usize,
    /// Override index stream.
    pub indices: &'a [u8],
    /// Component type of the index stream (U8/U16/U32).
    pub index_type: DataType,
    /// Byte stride of the index stream.
    pub index_stride: usize,
    /// Override value stream (same element shape as the base accessor).
    pub values: &'a [u8],
    /// Byte stride of the value stream.
    pub value_stride: usize,
}

impl<'a> SparseOverlay<'a> {
    /// Bounds-check both streams against `count`.
    pub fn validate_streams(&self, value_element_size: usize) -> Result<(), ConvertError> {
        check_source(self.indices, self.index_stride, self.count, 1, index_size(self.index_type)?)?;
        check_source(self.values, self.value_stride, self.count, 1, value_element_size)?;
        Ok(())
    }

    /// Read the k-th override index.
    pub fn index(&self, k: usize) -> Result<usize, ConvertError> {
        let at = k * self.index_stride;
        Ok(match self.index_type {
            DataType::U8 => u8::load(&self.indices[at..]) as usize,
            DataType::U16 => u16::load(&self.indices[at..]) as usize,
            DataType::U32 => u32::load(&self.indices[at..]) as usize,
            other => {
                return Err(ConvertError::unsupported(format!(
                    "sparse index component type {other:?}"
                )));
            }
        })
    }
}

fn index_size(index_type: DataType) -> Result<usize, ConvertError> {
    match index_type {
        DataType::U8 => Ok(1),
        DataType::U16 => Ok(2),
        DataType::U32 => Ok(4),
        other => Err(ConvertError::unsupported(format!(
            "sparse index component type {other:?}"
        ))),
    }
}

/// Run an overlay, resolving each override to a target element index.
///
/// Out-of-range indices are skipped; when `validate` is set they are also
/// logged with a stable code (the reference behavior left them undefined —
/// this implementation always refuses the write).
fn for_each_override(
    overlay: &SparseOverlay,
    element_count: usize,
    validate: bool,
    mut apply: impl FnMut(usize, &[u8]) -> Result<(), ConvertError>,
) -> Result<(), ConvertError> {
    for k in 0..overlay.count {
        let target = overlay.index(k)?;
        if target >= element_count {
            if validate {
                log::error!(
                    "[{}] sparse override {k} targets element {target} of {element_count}",
                    ErrorCode::SparseIndexOutOfRange
                );
            }
            continue;
        }
        let value = &overlay.values[k * overlay.value_stride..];
        apply(target, value)?;
    }
    Ok(())
}

/// Overlay a vec3 stream inside an interleaved byte buffer.
pub(crate) fn apply_vec3(
    overlay: &SparseOverlay,
    mode: Vec3Mode,
    data_type: DataType,
    normalized: bool,
    element_count: usize,
    dst: &mut [u8],
    dst_offset: usize,
    dst_stride: usize,
    validate: bool,
) -> Result<(), ConvertError> {
    overlay.validate_streams(3 * data_type.size())?;
    for_each_override(overlay, element_count, validate, |target, value| {
        let v = convert_one(mode, data_type, normalized, value)?;
        let at = target * dst_stride + dst_offset;
        write_f32(dst, at, v[0]);
        write_f32(dst, at + 4, v[1]);
        write_f32(dst, at + 8, v[2]);
        Ok(())
    })
}

/// Overlay a tangent (vec4) stream inside an interleaved byte buffer.
pub(crate) fn apply_tangent(
    overlay: &SparseOverlay,
    data_type: DataType,
    normalized: bool,
    element_count: usize,
    dst: &mut [u8],
    dst_offset: usize,
    dst_stride: usize,
    validate: bool,
) -> Result<(), ConvertError> {
    overlay.validate_streams(4 * data_type.size())?;
    for_each_override(overlay, element_count, validate, |target, value| {
        let t = convert_one_tangent(data_type, normalized, value)?;
        let at = target * dst_stride + dst_offset;
        write_f32(dst, at, t[0]);
        write_f32(dst, at + 4, t[1]);
        write_f32(dst, at + 8, t[2]);
        write_f32(dst, at + 12, t[3]);
        Ok(())
    })
}

/// Overlay a vec3 stream inside a typed delta array (morph targets).
pub(crate) fn apply_vec3_typed(
    overlay: &SparseOverlay,
    mode: Vec3Mode,
    data_type: DataType,
    normalized: bool,
    dst: &mut [[f32; 3]],
    validate: bool,
) -> Result<(), ConvertError> {
    overlay.validate_streams(3 * data_type.size())?;
    let element_count = dst.len();
    for_each_override(overlay, element_count, validate, |target, value| {
        dst[target] = convert_one(mode, data_type, normalized, value)?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn overlay<'a>(
        count: usize,
        indices: &'a [u8],
        index_type: DataType,
        values: &'a [u8],
    ) -> SparseOverlay<'a> {
        SparseOverlay {
            count,
            indices,
            index_type,
            index_stride: index_size(index_type).unwrap(),
            values,
            value_stride: 12,
        }
    }

    #[test]
    fn overrides_replace_dense_values() {
        // dense base: three vec3 elements already converted
        let mut dst = f32_bytes(&[0.0; 9]);
        let indices = [2u8];
        let values = f32_bytes(&[1.0, 2.0, 3.0]);
        let o = overlay(1, &indices, DataType::U8, &values);

        apply_vec3(&o, Vec3Mode::Position, DataType::F32, false, 3, &mut dst, 0, 12, true)
            .unwrap();

        // elements 0 and 1 untouched, element 2 overridden (with X flip)
        let out: Vec<f32> = dst
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(&out[0..6], &[0.0; 6]);
        assert_eq!(&out[6..9], &[-1.0, 2.0, 3.0]);
    }

    #[test]
    fn out_of_range_override_is_skipped() {
        let mut dst = f32_bytes(&[0.0; 6]);
        let indices = [5u8]; // only 2 elements exist
        let values = f32_bytes(&[1.0, 1.0, 1.0]);
        let o = overlay(1, &indices, DataType::U8, &values);

        apply_vec3(&o, Vec3Mode::Delta, DataType::F32, false, 2, &mut dst, 0, 12, true).unwrap();
        assert!(dst.iter().all(|&b| b == 0));
    }

    #[test]
    fn typed_overlay_for_morph_deltas() {
        let mut deltas = vec![[0.0f32; 3]; 4];
        let mut indices = Vec::new();
        for v in [1u16, 3] {
            indices.extend_from_slice(&v.to_le_bytes());
        }
        let values = f32_bytes(&[1.0, 0.0, 0.0, 0.0, 2.0, 0.0]);
        let o = SparseOverlay {
            count: 2,
            indices: &indices,
            index_type: DataType::U16,
            index_stride: 2,
            values: &values,
            value_stride: 12,
        };

        apply_vec3_typed(&o, Vec3Mode::Delta, DataType::F32, false, &mut deltas, true).unwrap();

        assert_eq!(deltas[0], [0.0, 0.0, 0.0]);
        assert_eq!(deltas[1], [-1.0, 0.0, 0.0]);
        assert_eq!(deltas[3], [0.0, 2.0, 0.0]);
    }

    #[test]
    fn quantized_sparse_values() {
        let mut deltas = vec![[0.0f32; 3]; 2];
        let indices = [0u8];
        let values: Vec<u8> = vec![127i8 as u8, 0, 0];
        let o = SparseOverlay {
            count: 1,
            indices: &indices,
            index_type: DataType::U8,
            index_stride: 1,
            values: &values,
            value_stride: 3,
        };

        apply_vec3_typed(&o, Vec3Mode::Delta, DataType::I8, true, &mut deltas, true).unwrap();
        assert_eq!(deltas[0], [-1.0, 0.0, 0.0]);
    }

    #[test]
    fn truncated_index_stream_is_reported() {
        let indices = [0u8]; // one byte, but two u16 indices claimed
        let values = f32_bytes(&[0.0; 6]);
        let o = SparseOverlay {
            count: 2,
            indices: &indices,
            index_type: DataType::U16,
            index_stride: 2,
            values: &values,
            value_stride: 12,
        };
        let mut deltas = vec![[0.0f32; 3]; 4];
        let err = apply_vec3_typed(&o, Vec3Mode::Delta, DataType::F32, false, &mut deltas, true);
        assert!(err.is_err());
    }
}
