//! Index kernels: widening to signed 32-bit, winding correction, and
//! topology expansion.
//!
//! glTF winds triangles counter-clockwise; the target expects clockwise, so
//! every triangle `(a, b, c)` becomes `(a, c, b)`. Strip, fan, loop, and
//! line-strip encodings are expanded to flat lists — the strip and fan
//! formulas below already emit the corrected winding.

use gltf_dep::accessor::DataType;
use gltf_dep::mesh::Mode;

use crate::mesh::PrimitiveTopology;

use super::super::error::{ConvertError, ErrorCode};
use super::{Component, check_source};

/// Widen an unsigned index stream to signed 32-bit, unflipped.
pub(crate) fn convert_indices(
    data_type: DataType,
    src: &[u8],
    src_stride: usize,
    count: usize,
) -> Result<Vec<i32>, ConvertError> {
    fn run<T: Component + Into<u32>>(
        src: &[u8],
        src_stride: usize,
        count: usize,
    ) -> Result<Vec<i32>, ConvertError> {
        check_source(src, src_stride, count, 1, T::SIZE)?;
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            let value: u32 = T::load(&src[i * src_stride..]).into();
            if value > i32::MAX as u32 {
                return Err(ConvertError::new(
                    ErrorCode::IndexOutOfRange,
                    format!("index value {value} exceeds the signed 32-bit range"),
                ));
            }
            out.push(value as i32);
        }
        Ok(out)
    }

    match data_type {
        DataType::U8 => run::<u8>(src, src_stride, count),
        DataType::U16 => run::<u16>(src, src_stride, count),
        DataType::U32 => run::<u32>(src, src_stride, count),
        other => Err(ConvertError::unsupported(format!(
            "index component type {other:?}"
        ))),
    }
}

/// Computed indices for an implicit (indices-absent) primitive.
pub(crate) fn sequential_indices(count: usize) -> Vec<i32> {
    (0..count as i32).collect()
}

/// Reverse the winding of every complete triangle: `(a, b, c) → (a, c, b)`.
///
/// Applying the flip twice restores the original order.
pub(crate) fn flip_winding(indices: &mut [i32]) {
    for tri in indices.chunks_exact_mut(3) {
        tri.swap(1, 2);
    }
}

/// Expand a triangle strip into a flat triangle list with target winding.
///
/// Triangle i is `{v[i], v[i + 1 + i%2], v[i + 2 - i%2]}`.
pub(crate) fn expand_triangle_strip(v: &[i32]) -> Vec<i32> {
    if v.len() < 3 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity((v.len() - 2) * 3);
    for i in 0..v.len() - 2 {
        out.push(v[i]);
        out.push(v[i + 1 + i % 2]);
        out.push(v[i + 2 - i % 2]);
    }
    out
}

/// Expand a triangle fan into a flat triangle list with target winding.
///
/// Triangle i is `{v[i + 1], v[i + 2], v[0]}`.
pub(crate) fn expand_triangle_fan(v: &[i32]) -> Vec<i32> {
    if v.len() < 3 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity((v.len() - 2) * 3);
    for i in 0..v.len() - 2 {
        out.push(v[i + 1]);
        out.push(v[i + 2]);
        out.push(v[0]);
    }
    out
}

/// Expand a line strip into a flat line list.
pub(crate) fn expand_line_strip(v: &[i32]) -> Vec<i32> {
    if v.len() < 2 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity((v.len() - 1) * 2);
    for i in 0..v.len() - 1 {
        out.push(v[i]);
        out.push(v[i + 1]);
    }
    out
}

/// Expand a line loop into a flat line list (closing segment included).
pub(crate) fn expand_line_loop(v: &[i32]) -> Vec<i32> {
    if v.len() < 2 {
        return Vec::new();
    }
    let mut out = expand_line_strip(v);
    out.push(v[v.len() - 1]);
    out.push(v[0]);
    out
}

/// Turn a primitive's raw index list into the output list and topology.
///
/// `raw` is the widened (or computed) index list in source order; the draw
/// mode selects the winding flip or expansion applied.
pub(crate) fn primitive_indices(
    mode: Mode,
    mut raw: Vec<i32>,
) -> Result<(Vec<i32>, PrimitiveTopology), ConvertError> {
    match mode {
        Mode::Triangles => {
            flip_winding(&mut raw);
            Ok((raw, PrimitiveTopology::TriangleList))
        }
        Mode::TriangleStrip => Ok((expand_triangle_strip(&raw), PrimitiveTopology::TriangleList)),
        Mode::TriangleFan => Ok((expand_triangle_fan(&raw), PrimitiveTopology::TriangleList)),
        Mode::Lines => Ok((raw, PrimitiveTopology::LineList)),
        Mode::LineStrip => Ok((expand_line_strip(&raw), PrimitiveTopology::LineList)),
        Mode::LineLoop => Ok((expand_line_loop(&raw), PrimitiveTopology::LineList)),
        Mode::Points => Ok((raw, PrimitiveTopology::PointList)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widen_u8_indices() {
        let src = [0u8, 1, 2, 255];
        let out = convert_indices(DataType::U8, &src, 1, 4).unwrap();
        assert_eq!(out, vec![0, 1, 2, 255]);
    }

    #[test]
    fn widen_u16_with_stride() {
        let mut src = Vec::new();
        for v in [10u16, 20, 30] {
            src.extend_from_slice(&v.to_le_bytes());
            src.extend_from_slice(&[0u8; 2]); // padding
        }
        let out = convert_indices(DataType::U16, &src, 4, 3).unwrap();
        assert_eq!(out, vec![10, 20, 30]);
    }

    #[test]
    fn u32_out_of_signed_range_is_rejected() {
        let src = (i32::MAX as u32 + 1).to_le_bytes();
        let err = convert_indices(DataType::U32, &src, 4, 1).unwrap_err();
        assert_eq!(err.code, ErrorCode::IndexOutOfRange);
    }

    #[test]
    fn float_indices_are_unsupported() {
        let err = convert_indices(DataType::F32, &[0u8; 4], 4, 1).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedFormat);
    }

    #[test]
    fn winding_flip_is_involutive() {
        let original = vec![0, 1, 2, 3, 4, 5];
        let mut flipped = original.clone();
        flip_winding(&mut flipped);
        assert_eq!(flipped, vec![0, 2, 1, 3, 5, 4]);
        flip_winding(&mut flipped);
        assert_eq!(flipped, original);
    }

    #[test]
    fn strip_expansion_alternates() {
        // 4 strip vertices → 2 triangles
        let out = expand_triangle_strip(&[0, 1, 2, 3]);
        // i=0 (even): {v0, v1, v2}; i=1 (odd): {v1, v3, v2}
        assert_eq!(out, vec![0, 1, 2, 1, 3, 2]);
    }

    #[test]
    fn fan_expansion_pivots_on_first() {
        let out = expand_triangle_fan(&[0, 1, 2, 3]);
        assert_eq!(out, vec![1, 2, 0, 2, 3, 0]);
    }

    #[test]
    fn line_strip_and_loop() {
        assert_eq!(expand_line_strip(&[0, 1, 2]), vec![0, 1, 1, 2]);
        assert_eq!(expand_line_loop(&[0, 1, 2]), vec![0, 1, 1, 2, 2, 0]);
    }

    #[test]
    fn degenerate_inputs_expand_empty() {
        assert!(expand_triangle_strip(&[0, 1]).is_empty());
        assert!(expand_triangle_fan(&[0]).is_empty());
        assert!(expand_line_strip(&[5]).is_empty());
        assert!(expand_line_loop(&[]).is_empty());
    }

    #[test]
    fn triangle_mode_flips_winding() {
        let (out, topo) = primitive_indices(Mode::Triangles, vec![0, 1, 2]).unwrap();
        assert_eq!(out, vec![0, 2, 1]);
        assert_eq!(topo, PrimitiveTopology::TriangleList);
    }

    #[test]
    fn sequential_indices_count() {
        assert_eq!(sequential_indices(4), vec![0, 1, 2, 3]);
    }
}
