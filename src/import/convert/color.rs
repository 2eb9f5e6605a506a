//! Vertex color kernels.
//!
//! COLOR_0 accepts VEC3 or VEC4 in u8/u16/f32; the output is always RGBA
//! f32. RGB inputs get an opaque alpha; integer inputs scale by their
//! maximum value (glTF colors are always normalized).

use gltf_dep::accessor::{DataType, Dimensions};

use super::super::error::ConvertError;
use super::{Component, check_source, write_f32};

/// Convert a color stream into an interleaved byte buffer as RGBA f32.
pub(crate) fn convert_colors(
    dimensions: Dimensions,
    data_type: DataType,
    src: &[u8],
    src_stride: usize,
    count: usize,
    dst: &mut [u8],
    dst_offset: usize,
    dst_stride: usize,
) -> Result<(), ConvertError> {
    let components = match dimensions {
        Dimensions::Vec3 => 3,
        Dimensions::Vec4 => 4,
        other => {
            return Err(ConvertError::unsupported(format!(
                "color dimensions {other:?}"
            )));
        }
    };

    fn run<T: Component>(
        components: usize,
        src: &[u8],
        src_stride: usize,
        count: usize,
        dst: &mut [u8],
        dst_offset: usize,
        dst_stride: usize,
    ) -> Result<(), ConvertError> {
        check_source(src, src_stride, count, components, T::SIZE)?;
        for i in 0..count {
            let s = i * src_stride;
            let at = i * dst_stride + dst_offset;
            for c in 0..components {
                let value = T::load(&src[s + c * T::SIZE..]).normalized();
                write_f32(dst, at + c * 4, value);
            }
            if components == 3 {
                write_f32(dst, at + 12, 1.0);
            }
        }
        Ok(())
    }

    match data_type {
        DataType::U8 => run::<u8>(components, src, src_stride, count, dst, dst_offset, dst_stride),
        DataType::U16 => run::<u16>(components, src, src_stride, count, dst, dst_offset, dst_stride),
        DataType::F32 => run::<f32>(components, src, src_stride, count, dst, dst_offset, dst_stride),
        other => Err(ConvertError::unsupported(format!(
            "color component type {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_rgba(dst: &[u8], at: usize) -> [f32; 4] {
        [
            f32::from_le_bytes(dst[at..at + 4].try_into().unwrap()),
            f32::from_le_bytes(dst[at + 4..at + 8].try_into().unwrap()),
            f32::from_le_bytes(dst[at + 8..at + 12].try_into().unwrap()),
            f32::from_le_bytes(dst[at + 12..at + 16].try_into().unwrap()),
        ]
    }

    #[test]
    fn rgb_u8_gets_opaque_alpha() {
        let src = [255u8, 0, 51];
        let mut dst = vec![0u8; 16];
        convert_colors(Dimensions::Vec3, DataType::U8, &src, 3, 1, &mut dst, 0, 16).unwrap();
        let rgba = read_rgba(&dst, 0);
        assert_eq!(rgba[0], 1.0);
        assert_eq!(rgba[1], 0.0);
        assert!((rgba[2] - 0.2).abs() < 1e-3);
        assert_eq!(rgba[3], 1.0);
    }

    #[test]
    fn rgba_u16_scales_by_max() {
        let mut src = Vec::new();
        for v in [65535u16, 0, 65535, 32767] {
            src.extend_from_slice(&v.to_le_bytes());
        }
        let mut dst = vec![0u8; 16];
        convert_colors(Dimensions::Vec4, DataType::U16, &src, 8, 1, &mut dst, 0, 16).unwrap();
        let rgba = read_rgba(&dst, 0);
        assert_eq!(rgba[0], 1.0);
        assert_eq!(rgba[2], 1.0);
        assert!((rgba[3] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn rgba_f32_passthrough() {
        let mut src = Vec::new();
        for c in [0.2f32, 0.4, 0.6, 0.8] {
            src.extend_from_slice(&c.to_le_bytes());
        }
        let mut dst = vec![0u8; 16];
        convert_colors(Dimensions::Vec4, DataType::F32, &src, 16, 1, &mut dst, 0, 16).unwrap();
        assert_eq!(read_rgba(&dst, 0), [0.2, 0.4, 0.6, 0.8]);
    }

    #[test]
    fn signed_color_types_are_unsupported() {
        let err =
            convert_colors(Dimensions::Vec3, DataType::I8, &[0u8; 3], 3, 1, &mut [0u8; 16], 0, 16)
                .unwrap_err();
        assert_eq!(err.code, crate::import::error::ErrorCode::UnsupportedFormat);
    }

    #[test]
    fn scalar_color_dimensions_are_unsupported() {
        let err =
            convert_colors(Dimensions::Scalar, DataType::U8, &[0u8; 1], 1, 1, &mut [0u8; 16], 0, 16)
                .unwrap_err();
        assert_eq!(err.code, crate::import::error::ErrorCode::UnsupportedFormat);
    }
}
