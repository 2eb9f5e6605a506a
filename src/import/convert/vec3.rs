//! Three-component vector kernels (positions, normals, morph deltas,
//! translations, scales).
//!
//! The handedness conversion negates X. True normals are additionally
//! renormalized to unit length after quantized decoding; positions and
//! deltas never are. Scales carry per-axis magnitudes and pass through
//! without any sign change.

use gltf_dep::accessor::DataType;

use super::super::error::ConvertError;
use super::{Component, check_source, scale_fn, write_f32};

/// Semantic role of a vec3 stream, selecting the coordinate correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Vec3Mode {
    /// Object-space position: X negated.
    Position,
    /// Morph/animation delta: X negated, no renormalization.
    Delta,
    /// Unit normal: X negated, renormalized.
    Normal,
    /// Per-axis scale factor: unchanged.
    Scale,
}

impl Vec3Mode {
    fn flip_x(self) -> bool {
        !matches!(self, Self::Scale)
    }

    fn renormalize(self) -> bool {
        matches!(self, Self::Normal)
    }
}

/// Apply the mode's correction to one decoded element.
#[inline]
fn correct(mode: Vec3Mode, mut v: [f32; 3]) -> [f32; 3] {
    if mode.flip_x() {
        v[0] = -v[0];
    }
    if mode.renormalize() {
        let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
        if len > 0.0 {
            v[0] /= len;
            v[1] /= len;
            v[2] /= len;
        }
    }
    v
}

/// Decode `count` vec3 elements and hand each to `emit`.
fn for_each<T: Component>(
    normalized: bool,
    src: &[u8],
    src_stride: usize,
    count: usize,
    mut emit: impl FnMut(usize, [f32; 3]),
) -> Result<(), ConvertError> {
    check_source(src, src_stride, count, 3, T::SIZE)?;
    let scale = scale_fn::<T>(normalized);
    for i in 0..count {
        let s = i * src_stride;
        let x = scale(T::load(&src[s..]));
        let y = scale(T::load(&src[s + T::SIZE..]));
        let z = scale(T::load(&src[s + 2 * T::SIZE..]));
        emit(i, [x, y, z]);
    }
    Ok(())
}

/// Dispatch on the source component type.
fn dispatch(
    data_type: DataType,
    normalized: bool,
    src: &[u8],
    src_stride: usize,
    count: usize,
    emit: impl FnMut(usize, [f32; 3]),
) -> Result<(), ConvertError> {
    match data_type {
        DataType::F32 => for_each::<f32>(normalized, src, src_stride, count, emit),
        DataType::U8 => for_each::<u8>(normalized, src, src_stride, count, emit),
        DataType::I8 => for_each::<i8>(normalized, src, src_stride, count, emit),
        DataType::U16 => for_each::<u16>(normalized, src, src_stride, count, emit),
        DataType::I16 => for_each::<i16>(normalized, src, src_stride, count, emit),
        DataType::U32 => for_each::<u32>(false, src, src_stride, count, emit),
    }
}

/// Convert a vec3 stream into an interleaved byte buffer.
pub(crate) fn convert_vec3(
    mode: Vec3Mode,
    data_type: DataType,
    normalized: bool,
    src: &[u8],
    src_stride: usize,
    count: usize,
    dst: &mut [u8],
    dst_offset: usize,
    dst_stride: usize,
) -> Result<(), ConvertError> {
    dispatch(data_type, normalized, src, src_stride, count, |i, v| {
        let v = correct(mode, v);
        let at = i * dst_stride + dst_offset;
        write_f32(dst, at, v[0]);
        write_f32(dst, at + 4, v[1]);
        write_f32(dst, at + 8, v[2]);
    })
}

/// Convert a vec3 stream into a typed array.
pub(crate) fn convert_vec3_typed(
    mode: Vec3Mode,
    data_type: DataType,
    normalized: bool,
    src: &[u8],
    src_stride: usize,
    count: usize,
    dst: &mut [[f32; 3]],
) -> Result<(), ConvertError> {
    dispatch(data_type, normalized, src, src_stride, count, |i, v| {
        dst[i] = correct(mode, v);
    })
}

/// Convert a vec3 stream into a freshly allocated typed array.
pub(crate) fn convert_vec3s(
    mode: Vec3Mode,
    data_type: DataType,
    normalized: bool,
    src: &[u8],
    src_stride: usize,
    count: usize,
) -> Result<Vec<[f32; 3]>, ConvertError> {
    let mut out = vec![[0.0f32; 3]; count];
    convert_vec3_typed(mode, data_type, normalized, src, src_stride, count, &mut out)?;
    Ok(out)
}

/// Decode and correct a single vec3 element (sparse overlay path).
pub(crate) fn convert_one(
    mode: Vec3Mode,
    data_type: DataType,
    normalized: bool,
    src: &[u8],
) -> Result<[f32; 3], ConvertError> {
    let mut value = [0.0f32; 3];
    dispatch(data_type, normalized, src, 0, 1, |_, v| {
        value = correct(mode, v);
    })?;
    Ok(value)
}

/// Decode and correct a single tangent element (sparse overlay path).
pub(crate) fn convert_one_tangent(
    data_type: DataType,
    normalized: bool,
    src: &[u8],
) -> Result<[f32; 4], ConvertError> {
    fn run<T: Component>(normalized: bool, src: &[u8]) -> Result<[f32; 4], ConvertError> {
        check_source(src, 0, 1, 4, T::SIZE)?;
        let scale = scale_fn::<T>(normalized);
        let v = correct(
            Vec3Mode::Normal,
            [
                scale(T::load(src)),
                scale(T::load(&src[T::SIZE..])),
                scale(T::load(&src[2 * T::SIZE..])),
            ],
        );
        let w = -scale(T::load(&src[3 * T::SIZE..]));
        Ok([v[0], v[1], v[2], w])
    }

    match data_type {
        DataType::F32 => run::<f32>(normalized, src),
        DataType::I8 => run::<i8>(normalized, src),
        DataType::I16 => run::<i16>(normalized, src),
        DataType::U8 => run::<u8>(normalized, src),
        DataType::U16 => run::<u16>(normalized, src),
        DataType::U32 => run::<u32>(false, src),
    }
}

/// Convert a tangent stream (vec4: xyz direction + w bitangent sign).
///
/// X and W are negated; xyz is renormalized. Only float and the two signed
/// quantized forms carry tangents in practice, but every component type
/// decodes the same way.
pub(crate) fn convert_tangents(
    data_type: DataType,
    normalized: bool,
    src: &[u8],
    src_stride: usize,
    count: usize,
    dst: &mut [u8],
    dst_offset: usize,
    dst_stride: usize,
) -> Result<(), ConvertError> {
    fn run<T: Component>(
        normalized: bool,
        src: &[u8],
        src_stride: usize,
        count: usize,
        dst: &mut [u8],
        dst_offset: usize,
        dst_stride: usize,
    ) -> Result<(), ConvertError> {
        check_source(src, src_stride, count, 4, T::SIZE)?;
        let scale = scale_fn::<T>(normalized);
        for i in 0..count {
            let s = i * src_stride;
            let v = correct(
                Vec3Mode::Normal,
                [
                    scale(T::load(&src[s..])),
                    scale(T::load(&src[s + T::SIZE..])),
                    scale(T::load(&src[s + 2 * T::SIZE..])),
                ],
            );
            let w = -scale(T::load(&src[s + 3 * T::SIZE..]));
            let at = i * dst_stride + dst_offset;
            write_f32(dst, at, v[0]);
            write_f32(dst, at + 4, v[1]);
            write_f32(dst, at + 8, v[2]);
            write_f32(dst, at + 12, w);
        }
        Ok(())
    }

    match data_type {
        DataType::F32 => run::<f32>(normalized, src, src_stride, count, dst, dst_offset, dst_stride),
        DataType::I8 => run::<i8>(normalized, src, src_stride, count, dst, dst_offset, dst_stride),
        DataType::I16 => run::<i16>(normalized, src, src_stride, count, dst, dst_offset, dst_stride),
        DataType::U8 => run::<u8>(normalized, src, src_stride, count, dst, dst_offset, dst_stride),
        DataType::U16 => run::<u16>(normalized, src, src_stride, count, dst, dst_offset, dst_stride),
        DataType::U32 => run::<u32>(false, src, src_stride, count, dst, dst_offset, dst_stride),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn read_vec3(dst: &[u8], stride: usize, offset: usize, i: usize) -> [f32; 3] {
        let at = i * stride + offset;
        [
            f32::from_le_bytes(dst[at..at + 4].try_into().unwrap()),
            f32::from_le_bytes(dst[at + 4..at + 8].try_into().unwrap()),
            f32::from_le_bytes(dst[at + 8..at + 12].try_into().unwrap()),
        ]
    }

    #[test]
    fn position_negates_x_only() {
        let src = f32_bytes(&[1.0, 2.0, 3.0]);
        let mut dst = vec![0u8; 12];
        convert_vec3(Vec3Mode::Position, DataType::F32, false, &src, 12, 1, &mut dst, 0, 12)
            .unwrap();
        assert_eq!(read_vec3(&dst, 12, 0, 0), [-1.0, 2.0, 3.0]);
    }

    #[test]
    fn scale_passes_through() {
        let src = f32_bytes(&[2.0, 3.0, 4.0]);
        let out = convert_vec3s(Vec3Mode::Scale, DataType::F32, false, &src, 12, 1).unwrap();
        assert_eq!(out[0], [2.0, 3.0, 4.0]);
    }

    #[test]
    fn normal_is_renormalized() {
        // Quantized normal that does not decode to unit length.
        let src: Vec<u8> = vec![127, 0, 127i8 as u8];
        let out = convert_vec3s(Vec3Mode::Normal, DataType::I8, true, &src, 3, 1).unwrap();
        let [x, y, z] = out[0];
        let len = (x * x + y * y + z * z).sqrt();
        assert!((len - 1.0).abs() < 1e-6);
        assert!(x < 0.0, "x must be negated");
        assert!(z > 0.0);
        assert_eq!(y, 0.0);
    }

    #[test]
    fn delta_is_not_renormalized() {
        let src = f32_bytes(&[0.5, 0.0, 0.0]);
        let out = convert_vec3s(Vec3Mode::Delta, DataType::F32, false, &src, 12, 1).unwrap();
        assert_eq!(out[0], [-0.5, 0.0, 0.0]);
    }

    #[test]
    fn normalized_u16_positions() {
        let mut src = Vec::new();
        for v in [65535u16, 0, 32767] {
            src.extend_from_slice(&v.to_le_bytes());
        }
        let out = convert_vec3s(Vec3Mode::Position, DataType::U16, true, &src, 6, 1).unwrap();
        assert_eq!(out[0][0], -1.0);
        assert_eq!(out[0][1], 0.0);
        assert!((out[0][2] - 32767.0 / 65535.0).abs() < 1e-6);
    }

    #[test]
    fn strided_input() {
        // Two vec3<f32> with 4 bytes of padding between elements.
        let mut src = f32_bytes(&[1.0, 0.0, 0.0]);
        src.extend_from_slice(&[0u8; 4]);
        src.extend(f32_bytes(&[0.0, 1.0, 0.0]));
        let out = convert_vec3s(Vec3Mode::Position, DataType::F32, false, &src, 16, 2).unwrap();
        assert_eq!(out[0], [-1.0, 0.0, 0.0]);
        assert_eq!(out[1], [0.0, 1.0, 0.0]);
    }

    #[test]
    fn interleaved_output_offsets() {
        let src = f32_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        // stride 32, normal at offset 12
        let mut dst = vec![0u8; 64];
        convert_vec3(Vec3Mode::Normal, DataType::F32, false, &src, 12, 2, &mut dst, 12, 32)
            .unwrap();
        let n0 = read_vec3(&dst, 32, 12, 0);
        assert!((n0[0] + 1.0 / (14.0f32).sqrt()).abs() < 1e-6);
        // bytes outside the attribute untouched
        assert_eq!(&dst[0..12], &[0u8; 12]);
    }

    #[test]
    fn truncated_source_is_reported() {
        let src = f32_bytes(&[1.0, 2.0]); // 8 bytes, one vec3 needs 12
        let err = convert_vec3s(Vec3Mode::Position, DataType::F32, false, &src, 12, 1);
        assert!(err.is_err());
    }

    #[test]
    fn tangent_flips_x_and_w() {
        let src = f32_bytes(&[1.0, 0.0, 0.0, 1.0]);
        let mut dst = vec![0u8; 16];
        convert_tangents(DataType::F32, false, &src, 16, 1, &mut dst, 0, 16).unwrap();
        let x = f32::from_le_bytes(dst[0..4].try_into().unwrap());
        let w = f32::from_le_bytes(dst[12..16].try_into().unwrap());
        assert_eq!(x, -1.0);
        assert_eq!(w, -1.0);
    }
}
