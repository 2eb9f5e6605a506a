//! Typed conversion kernels.
//!
//! Each kernel is a pure function reading `count` elements at a fixed input
//! stride and writing them at a fixed output offset/stride, applying the
//! right-handed → left-handed coordinate conversion and normalization
//! scaling for its semantic role.
//!
//! Kernels are monomorphized over the [`Component`] trait (one instantiation
//! per source component type); the per-role entry points are total matches
//! over the declared component-type space, so an unsupported combination is
//! always a reported [`ConvertError`](super::error::ConvertError), never a
//! silently wrong conversion.

pub(crate) mod anim;
pub(crate) mod color;
pub(crate) mod index;
pub(crate) mod skin;
pub(crate) mod sparse;
pub(crate) mod uv;
pub(crate) mod vec3;

use super::error::{ConvertError, ErrorCode};

/// A numeric source component type the kernels can read.
///
/// `normalized` applies the glTF normalized-integer scaling: signed types
/// divide by their maximum magnitude and clamp to [-1, 1], unsigned types
/// divide by their maximum value.
pub(crate) trait Component: Copy + Send + Sync {
    /// Size of one component in bytes.
    const SIZE: usize;

    /// Read one component from little-endian bytes.
    ///
    /// Callers must have bounds-checked `src` (see [`check_source`]).
    fn load(src: &[u8]) -> Self;

    /// Reinterpret as f32 without scaling.
    fn raw(self) -> f32;

    /// Convert to f32 with normalized-integer scaling.
    fn normalized(self) -> f32;
}

impl Component for f32 {
    const SIZE: usize = 4;

    fn load(src: &[u8]) -> Self {
        f32::from_le_bytes([src[0], src[1], src[2], src[3]])
    }

    fn raw(self) -> f32 {
        self
    }

    fn normalized(self) -> f32 {
        self
    }
}

impl Component for u8 {
    const SIZE: usize = 1;

    fn load(src: &[u8]) -> Self {
        src[0]
    }

    fn raw(self) -> f32 {
        self as f32
    }

    fn normalized(self) -> f32 {
        self as f32 / 255.0
    }
}

impl Component for i8 {
    const SIZE: usize = 1;

    fn load(src: &[u8]) -> Self {
        src[0] as i8
    }

    fn raw(self) -> f32 {
        self as f32
    }

    fn normalized(self) -> f32 {
        (self as f32 / 127.0).max(-1.0)
    }
}

impl Component for u16 {
    const SIZE: usize = 2;

    fn load(src: &[u8]) -> Self {
        u16::from_le_bytes([src[0], src[1]])
    }

    fn raw(self) -> f32 {
        self as f32
    }

    fn normalized(self) -> f32 {
        self as f32 / 65535.0
    }
}

impl Component for i16 {
    const SIZE: usize = 2;

    fn load(src: &[u8]) -> Self {
        i16::from_le_bytes([src[0], src[1]])
    }

    fn raw(self) -> f32 {
        self as f32
    }

    fn normalized(self) -> f32 {
        (self as f32 / 32767.0).max(-1.0)
    }
}

impl Component for u32 {
    const SIZE: usize = 4;

    fn load(src: &[u8]) -> Self {
        u32::from_le_bytes([src[0], src[1], src[2], src[3]])
    }

    fn raw(self) -> f32 {
        self as f32
    }

    fn normalized(self) -> f32 {
        self as f32 / u32::MAX as f32
    }
}

/// Select the scaling function for a component type ahead of the hot loop.
pub(crate) fn scale_fn<T: Component>(normalized: bool) -> fn(T) -> f32 {
    if normalized {
        Component::normalized
    } else {
        Component::raw
    }
}

/// Verify that `count` elements of `components` components each, at
/// `stride`, fit inside `src`.
pub(crate) fn check_source(
    src: &[u8],
    stride: usize,
    count: usize,
    components: usize,
    component_size: usize,
) -> Result<(), ConvertError> {
    if count == 0 {
        return Ok(());
    }
    let needed = stride * (count - 1) + components * component_size;
    if src.len() < needed {
        return Err(ConvertError::new(
            ErrorCode::TruncatedData,
            format!(
                "need {needed} bytes for {count} elements, have {}",
                src.len()
            ),
        ));
    }
    Ok(())
}

/// Write one f32 into a byte buffer at the given offset.
#[inline]
pub(crate) fn write_f32(dst: &mut [u8], at: usize, value: f32) {
    dst[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

/// Write one u32 into a byte buffer at the given offset.
#[inline]
pub(crate) fn write_u32(dst: &mut [u8], at: usize, value: u32) {
    dst[at..at + 4].copy_from_slice(&value.to_le_bytes());
}
