//! Texture coordinate kernels.
//!
//! glTF texture coordinates have a top-left origin; the target convention is
//! bottom-left, so every V becomes `1 - v`. Up to
//! [`VertexLayout::MAX_TEXCOORD_SETS`](crate::mesh::VertexLayout::MAX_TEXCOORD_SETS)
//! interleaved sets are supported, each at its own fixed output offset.

use gltf_dep::accessor::DataType;

use super::super::error::ConvertError;
use super::{Component, check_source, scale_fn, write_f32};

/// Convert a UV stream into an interleaved byte buffer, flipping V.
pub(crate) fn convert_uvs(
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
        check_source(src, src_stride, count, 2, T::SIZE)?;
        let scale = scale_fn::<T>(normalized);
        for i in 0..count {
            let s = i * src_stride;
            let u = scale(T::load(&src[s..]));
            let v = 1.0 - scale(T::load(&src[s + T::SIZE..]));
            let at = i * dst_stride + dst_offset;
            write_f32(dst, at, u);
            write_f32(dst, at + 4, v);
        }
        Ok(())
    }

    match data_type {
        DataType::F32 => run::<f32>(normalized, src, src_stride, count, dst, dst_offset, dst_stride),
        DataType::U8 => run::<u8>(normalized, src, src_stride, count, dst, dst_offset, dst_stride),
        DataType::I8 => run::<i8>(normalized, src, src_stride, count, dst, dst_offset, dst_stride),
        DataType::U16 => run::<u16>(normalized, src, src_stride, count, dst, dst_offset, dst_stride),
        DataType::I16 => run::<i16>(normalized, src, src_stride, count, dst, dst_offset, dst_stride),
        DataType::U32 => run::<u32>(false, src, src_stride, count, dst, dst_offset, dst_stride),
    }
}
