//! Bone joint and weight kernels.
//!
//! Joints widen u8/u16 to four zero-extended u32 components; weights widen
//! f32/u16/u8 to four f32 components scaled into [0, 1].

use gltf_dep::accessor::DataType;

use super::super::error::ConvertError;
use super::{Component, check_source, write_f32, write_u32};

/// Convert a JOINTS_0 stream into an interleaved byte buffer as u32x4.
pub(crate) fn convert_joints(
    data_type: DataType,
    src: &[u8],
    src_stride: usize,
    count: usize,
    dst: &mut [u8],
    dst_offset: usize,
    dst_stride: usize,
) -> Result<(), ConvertError> {
    fn run<T: Component + Into<u32>>(
        src: &[u8],
        src_stride: usize,
        count: usize,
        dst: &mut [u8],
        dst_offset: usize,
        dst_stride: usize,
    ) -> Result<(), ConvertError> {
        check_source(src, src_stride, count, 4, T::SIZE)?;
        for i in 0..count {
            let s = i * src_stride;
            let at = i * dst_stride + dst_offset;
            for c in 0..4 {
                let value: u32 = T::load(&src[s + c * T::SIZE..]).into();
                write_u32(dst, at + c * 4, value);
            }
        }
        Ok(())
    }

    match data_type {
        DataType::U8 => run::<u8>(src, src_stride, count, dst, dst_offset, dst_stride),
        DataType::U16 => run::<u16>(src, src_stride, count, dst, dst_offset, dst_stride),
        other => Err(ConvertError::unsupported(format!(
            "joint component type {other:?}"
        ))),
    }
}

/// Convert a WEIGHTS_0 stream into an interleaved byte buffer as f32x4.
pub(crate) fn convert_weights(
    data_type: DataType,
    src: &[u8],
    src_stride: usize,
    count: usize,
    dst: &mut [u8],
    dst_offset: usize,
    dst_stride: usize,
) -> Result<(), ConvertError> {
    fn run<T: Component>(
        src: &[u8],
        src_stride: usize,
        count: usize,
        dst: &mut [u8],
        dst_offset: usize,
        dst_stride: usize,
    ) -> Result<(), ConvertError> {
        check_source(src, src_stride, count, 4, T::SIZE)?;
        for i in 0..count {
            let s = i * src_stride;
            let at = i * dst_stride + dst_offset;
            for c in 0..4 {
                let value = T::load(&src[s + c * T::SIZE..]).normalized();
                write_f32(dst, at + c * 4, value);
            }
        }
        Ok(())
    }

    match data_type {
        DataType::F32 => run::<f32>(src, src_stride, count, dst, dst_offset, dst_stride),
        DataType::U16 => run::<u16>(src, src_stride, count, dst, dst_offset, dst_stride),
        DataType::U8 => run::<u8>(src, src_stride, count, dst, dst_offset, dst_stride),
        other => Err(ConvertError::unsupported(format!(
            "weight component type {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joints_u8_zero_extend() {
        let src = [3u8, 0, 200, 7];
        let mut dst = vec![0u8; 16];
        convert_joints(DataType::U8, &src, 4, 1, &mut dst, 0, 16).unwrap();
        let j: Vec<u32> = dst
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(j, vec![3, 0, 200, 7]);
    }

    #[test]
    fn joints_u16_zero_extend() {
        let mut src = Vec::new();
        for v in [1000u16, 0, 65535, 42] {
            src.extend_from_slice(&v.to_le_bytes());
        }
        let mut dst = vec![0u8; 16];
        convert_joints(DataType::U16, &src, 8, 1, &mut dst, 0, 16).unwrap();
        let j: Vec<u32> = dst
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(j, vec![1000, 0, 65535, 42]);
    }

    #[test]
    fn joints_reject_float() {
        let err = convert_joints(DataType::F32, &[0u8; 16], 16, 1, &mut [0u8; 16], 0, 16)
            .unwrap_err();
        assert_eq!(err.code, crate::import::error::ErrorCode::UnsupportedFormat);
    }

    #[test]
    fn weights_u8_scale_to_unit() {
        let src = [255u8, 0, 51, 204];
        let mut dst = vec![0u8; 16];
        convert_weights(DataType::U8, &src, 4, 1, &mut dst, 0, 16).unwrap();
        let w: Vec<f32> = dst
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(w[0], 1.0);
        assert_eq!(w[1], 0.0);
        assert!(w.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn weights_f32_passthrough() {
        let mut src = Vec::new();
        for c in [0.5f32, 0.25, 0.25, 0.0] {
            src.extend_from_slice(&c.to_le_bytes());
        }
        let mut dst = vec![0u8; 16];
        convert_weights(DataType::F32, &src, 16, 1, &mut dst, 0, 16).unwrap();
        let w0 = f32::from_le_bytes(dst[0..4].try_into().unwrap());
        assert_eq!(w0, 0.5);
    }
}
