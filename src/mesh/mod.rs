//! Renderer-ready mesh data structures.
//!
//! This module provides the importer's output types:
//!
//! - [`VertexLayout`] - Describes the interleaved vertex attributes
//! - [`MeshData`] - One shared vertex buffer with its sub-mesh ranges
//! - [`SubMesh`] - Per-primitive index range within a shared buffer
//! - [`MorphFrame`] - Named blend-shape delta arrays

mod data;
mod layout;

pub use data::{MeshData, MorphFrame, PrimitiveTopology, SubMesh};
pub use layout::{VertexAttribute, VertexFormat, VertexLayout, VertexSemantic};
