//! # gltf-import
//!
//! Data-driven glTF 2.0 accessor-to-vertex-buffer conversion: reads the
//! heterogeneous, strided, possibly quantized or sparse binary attribute
//! streams of a glTF asset and produces uniformly typed, interleaved,
//! coordinate-corrected vertex and index buffers for a left-handed
//! renderer, scheduled as parallel conversion jobs with explicit joins.
//!
//! The document layer (JSON/GLB parsing) comes from the `gltf` crate; this
//! crate owns everything downstream of accessor metadata: kernel selection,
//! handedness conversion, primitive clustering, sparse overlays, morph
//! targets, and skinning/animation stream retention. See [`import`] for the
//! entry points.

pub mod compute;
pub mod import;
pub mod jobs;
pub mod math;
pub mod mesh;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
