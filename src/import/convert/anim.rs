//! Scalar, quaternion, and matrix kernels for animation and skinning
//! streams.
//!
//! The quaternion handedness conversion negates Y and Z, matching the X
//! negation applied to vectors. Inverse bind matrices get the equivalent
//! element-wise flip: every element with exactly one of row/column equal to
//! zero changes sign (the expansion of `F * M * F` with `F = diag(-1,1,1,1)`,
//! written out instead of multiplied for speed).

use gltf_dep::accessor::DataType;

use super::super::error::ConvertError;
use super::{Component, check_source, scale_fn};

/// Convert a scalar stream (sample times, morph weights) to f32.
pub(crate) fn convert_scalars(
    data_type: DataType,
    normalized: bool,
    src: &[u8],
    src_stride: usize,
    count: usize,
) -> Result<Vec<f32>, ConvertError> {
    fn run<T: Component>(
        normalized: bool,
        src: &[u8],
        src_stride: usize,
        count: usize,
    ) -> Result<Vec<f32>, ConvertError> {
        check_source(src, src_stride, count, 1, T::SIZE)?;
        let scale = scale_fn::<T>(normalized);
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            out.push(scale(T::load(&src[i * src_stride..])));
        }
        Ok(out)
    }

    match data_type {
        DataType::F32 => run::<f32>(normalized, src, src_stride, count),
        DataType::I8 => run::<i8>(normalized, src, src_stride, count),
        DataType::U8 => run::<u8>(normalized, src, src_stride, count),
        DataType::I16 => run::<i16>(normalized, src, src_stride, count),
        DataType::U16 => run::<u16>(normalized, src, src_stride, count),
        other => Err(ConvertError::unsupported(format!(
            "scalar component type {other:?}"
        ))),
    }
}

/// Convert a rotation stream to unit quaternions with Y/Z negated.
///
/// Quantized forms (i16/i8) are always normalized per the glTF animation
/// spec; the result is renormalized to unit length either way.
pub(crate) fn convert_rotations(
    data_type: DataType,
    src: &[u8],
    src_stride: usize,
    count: usize,
) -> Result<Vec<[f32; 4]>, ConvertError> {
    fn run<T: Component>(
        src: &[u8],
        src_stride: usize,
        count: usize,
    ) -> Result<Vec<[f32; 4]>, ConvertError> {
        check_source(src, src_stride, count, 4, T::SIZE)?;
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            let s = i * src_stride;
            let x = T::load(&src[s..]).normalized();
            let y = -T::load(&src[s + T::SIZE..]).normalized();
            let z = -T::load(&src[s + 2 * T::SIZE..]).normalized();
            let w = T::load(&src[s + 3 * T::SIZE..]).normalized();
            let len = (x * x + y * y + z * z + w * w).sqrt();
            if len > 0.0 {
                out.push([x / len, y / len, z / len, w / len]);
            } else {
                out.push([0.0, 0.0, 0.0, 1.0]);
            }
        }
        Ok(out)
    }

    match data_type {
        DataType::F32 => run::<f32>(src, src_stride, count),
        DataType::I16 => run::<i16>(src, src_stride, count),
        DataType::I8 => run::<i8>(src, src_stride, count),
        other => Err(ConvertError::unsupported(format!(
            "rotation component type {other:?}"
        ))),
    }
}

/// Convert a MAT4 stream (inverse bind matrices) with the handedness flip.
///
/// Elements are column-major; the flipped element set is
/// `{e[c*4+r] : (r == 0) XOR (c == 0)}`.
pub(crate) fn convert_matrices(
    data_type: DataType,
    src: &[u8],
    src_stride: usize,
    count: usize,
) -> Result<Vec<[f32; 16]>, ConvertError> {
    if data_type != DataType::F32 {
        return Err(ConvertError::unsupported(format!(
            "matrix component type {data_type:?}"
        )));
    }
    check_source(src, src_stride, count, 16, 4)?;

    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let s = i * src_stride;
        let mut m = [0.0f32; 16];
        for (e, slot) in m.iter_mut().enumerate() {
            let value = f32::load(&src[s + e * 4..]);
            let row = e % 4;
            let col = e / 4;
            *slot = if (row == 0) != (col == 0) { -value } else { value };
        }
        out.push(m);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn scalar_f32_passthrough() {
        let src = f32_bytes(&[0.0, 0.5, 1.5]);
        let out = convert_scalars(DataType::F32, false, &src, 4, 3).unwrap();
        assert_eq!(out, vec![0.0, 0.5, 1.5]);
    }

    #[test]
    fn scalar_normalized_i16() {
        let mut src = Vec::new();
        for v in [32767i16, -32768, 0] {
            src.extend_from_slice(&v.to_le_bytes());
        }
        let out = convert_scalars(DataType::I16, true, &src, 2, 3).unwrap();
        assert_eq!(out, vec![1.0, -1.0, 0.0]);
    }

    #[test]
    fn scalar_u32_is_unsupported() {
        let err = convert_scalars(DataType::U32, false, &[0u8; 4], 4, 1).unwrap_err();
        assert_eq!(err.code, crate::import::error::ErrorCode::UnsupportedFormat);
    }

    #[test]
    fn rotation_negates_y_and_z() {
        let src = f32_bytes(&[0.1, 0.2, 0.3, 0.927]);
        let out = convert_rotations(DataType::F32, &src, 16, 1).unwrap();
        let [x, y, z, w] = out[0];
        assert!(x > 0.0);
        assert!(y < 0.0);
        assert!(z < 0.0);
        assert!(w > 0.0);
        let len = (x * x + y * y + z * z + w * w).sqrt();
        assert!((len - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rotation_identity_stays_identity() {
        let src = f32_bytes(&[0.0, 0.0, 0.0, 1.0]);
        let out = convert_rotations(DataType::F32, &src, 16, 1).unwrap();
        assert_eq!(out[0], [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn rotation_quantized_i16() {
        let mut src = Vec::new();
        for v in [0i16, 0, 0, 32767] {
            src.extend_from_slice(&v.to_le_bytes());
        }
        let out = convert_rotations(DataType::I16, &src, 8, 1).unwrap();
        let [x, y, z, w] = out[0];
        assert_eq!([x, y, z], [0.0, 0.0, 0.0]);
        assert!((w - 1.0).abs() < 1e-6);
    }

    #[test]
    fn matrix_identity_is_unchanged() {
        let mut identity = [0.0f32; 16];
        identity[0] = 1.0;
        identity[5] = 1.0;
        identity[10] = 1.0;
        identity[15] = 1.0;
        let src = f32_bytes(&identity);
        let out = convert_matrices(DataType::F32, &src, 64, 1).unwrap();
        assert_eq!(out[0], identity);
    }

    #[test]
    fn matrix_flips_first_row_and_column_off_diagonals() {
        let m: [f32; 16] = std::array::from_fn(|i| (i + 1) as f32);
        let src = f32_bytes(&m);
        let out = convert_matrices(DataType::F32, &src, 64, 1).unwrap();
        for (e, &value) in out[0].iter().enumerate() {
            let row = e % 4;
            let col = e / 4;
            let expected = if (row == 0) != (col == 0) { -m[e] } else { m[e] };
            assert_eq!(value, expected, "element {e}");
        }
        // spot checks: e[0] (0,0) unchanged, e[1] (row 1, col 0) negated,
        // e[4] (row 0, col 1) negated, e[12] (translation x) negated
        assert_eq!(out[0][0], 1.0);
        assert_eq!(out[0][1], -2.0);
        assert_eq!(out[0][4], -5.0);
        assert_eq!(out[0][12], -13.0);
    }

    #[test]
    fn matrix_rejects_quantized_types() {
        let err = convert_matrices(DataType::U16, &[0u8; 32], 32, 1).unwrap_err();
        assert_eq!(err.code, crate::import::error::ErrorCode::UnsupportedFormat);
    }
}
