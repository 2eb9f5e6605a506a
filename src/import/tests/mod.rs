//! Integration tests for the import pipeline.
//!
//! Tests build small synthetic glTF JSON documents with base64 data-URI
//! buffers (the JSON twin of a GLB, so no binary fixtures are needed) and
//! run them through the public entry points.

use serde_json::{Value, json};


/// Base64 encoder, the inverse of the loader's decoder.
fn base64_encode(data: &[u8]) -> String {
    const TABLE: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        let b0 = chunk[0] as u32;
        let b1 = chunk.get(1).copied().unwrap_or(0) as u32;
        let b2 = chunk.get(2).copied().unwrap_or(0) as u32;
        let triple = (b0 << 16) | (b1 << 8) | b2;

        out.push(TABLE[(triple >> 18) as usize & 63] as char);
        out.push(TABLE[(triple >> 12) as usize & 63] as char);
        out.push(if chunk.len() > 1 {
            TABLE[(triple >> 6) as usize & 63] as char
        } else {
            '='
        });
        out.push(if chunk.len() > 2 {
            TABLE[triple as usize & 63] as char
        } else {
            '='
        });
    }
    out
}

/// Builder for synthetic glTF JSON documents.
#[derive(Default)]
struct DocBuilder {
    buffers: Vec<Value>,
    views: Vec<Value>,
    accessors: Vec<Value>,
    meshes: Vec<Value>,
    nodes: Vec<Value>,
    skins: Vec<Value>,
    animations: Vec<Value>,
}

impl DocBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// Add a byte blob as one buffer + one full-range view; returns the
    /// view index. `stride` adds an explicit byteStride.
    fn add_blob(&mut self, data: &[u8], stride: Option<usize>) -> usize {
        let buffer_index = self.buffers.len();
        self.buffers.push(json!({
            "byteLength": data.len(),
            "uri": format!("data:application/octet-stream;base64,{}", base64_encode(data)),
        }));
        let mut view = json!({
            "buffer": buffer_index,
            "byteOffset": 0,
            "byteLength": data.len(),
        });
        if let Some(stride) = stride {
            view["byteStride"] = json!(stride);
        }
        self.views.push(view);
        self.views.len() - 1
    }

    /// Add a raw accessor JSON object; returns the accessor index.
    fn add_accessor(&mut self, accessor: Value) -> usize {
        self.accessors.push(accessor);
        self.accessors.len() - 1
    }

    /// Add a tightly packed VEC3 f32 accessor with declared bounds.
    fn add_positions(&mut self, positions: &[[f32; 3]]) -> usize {
        self.add_positions_with_bounds(positions, true)
    }

    fn add_positions_with_bounds(&mut self, positions: &[[f32; 3]], bounds: bool) -> usize {
        let bytes = vec3_bytes(positions);
        let view = self.add_blob(&bytes, None);
        let mut accessor = json!({
            "bufferView": view,
            "componentType": 5126,
            "count": positions.len(),
            "type": "VEC3",
        });
        if bounds {
            let (min, max) = min_max(positions);
            accessor["min"] = json!(min);
            accessor["max"] = json!(max);
        }
        self.add_accessor(accessor)
    }

    /// Add a tightly packed u16 index accessor.
    fn add_indices_u16(&mut self, indices: &[u16]) -> usize {
        let bytes: Vec<u8> = indices.iter().flat_map(|i| i.to_le_bytes()).collect();
        let view = self.add_blob(&bytes, None);
        self.add_accessor(json!({
            "bufferView": view,
            "componentType": 5123,
            "count": indices.len(),
            "type": "SCALAR",
        }))
    }

    /// Add a mesh from raw primitive JSON objects; returns the mesh index.
    fn add_mesh(&mut self, primitives: Vec<Value>) -> usize {
        self.meshes.push(json!({ "primitives": primitives }));
        self.meshes.len() - 1
    }

    fn add_mesh_value(&mut self, mesh: Value) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    /// Serialize to glTF JSON bytes.
    fn build(&self) -> Vec<u8> {
        let mut root = json!({
            "asset": { "version": "2.0" },
        });
        if !self.buffers.is_empty() {
            root["buffers"] = json!(self.buffers);
        }
        if !self.views.is_empty() {
            root["bufferViews"] = json!(self.views);
        }
        if !self.accessors.is_empty() {
            root["accessors"] = json!(self.accessors);
        }
        if !self.meshes.is_empty() {
            root["meshes"] = json!(self.meshes);
        }
        if !self.nodes.is_empty() {
            root["nodes"] = json!(self.nodes);
        }
        if !self.skins.is_empty() {
            root["skins"] = json!(self.skins);
        }
        if !self.animations.is_empty() {
            root["animations"] = json!(self.animations);
        }
        serde_json::to_vec(&root).expect("document serializes")
    }
}

fn vec3_bytes(values: &[[f32; 3]]) -> Vec<u8> {
    values
        .iter()
        .flat_map(|v| v.iter().flat_map(|c| c.to_le_bytes()))
        .collect()
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|c| c.to_le_bytes()).collect()
}

fn min_max(positions: &[[f32; 3]]) -> ([f32; 3], [f32; 3]) {
    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];
    for p in positions {
        for c in 0..3 {
            min[c] = min[c].min(p[c]);
            max[c] = max[c].max(p[c]);
        }
    }
    (min, max)
}

/// Assemble a GLB container from JSON and binary chunk payloads.
fn build_glb(json: &[u8], bin: &[u8]) -> Vec<u8> {
    let mut json = json.to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let mut bin = bin.to_vec();
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(b"JSON");
    out.extend_from_slice(&json);
    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(b"BIN\0");
    out.extend_from_slice(&bin);
    out
}

#[test]
fn glb_container_resolves_bin_chunk() {
    use crate::import::{ImportSettings, import_gltf};
    use crate::mesh::VertexSemantic;

    let positions = vec3_bytes(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    let json = format!(
        concat!(
            "{{\"asset\":{{\"version\":\"2.0\"}},",
            "\"buffers\":[{{\"byteLength\":{len}}}],",
            "\"bufferViews\":[{{\"buffer\":0,\"byteOffset\":0,\"byteLength\":{len}}}],",
            "\"accessors\":[{{\"bufferView\":0,\"componentType\":5126,\"count\":3,",
            "\"type\":\"VEC3\",\"min\":[0,0,0],\"max\":[1,1,0]}}],",
            "\"meshes\":[{{\"primitives\":[{{\"attributes\":{{\"POSITION\":0}},\"mode\":0}}]}}]}}"
        ),
        len = positions.len()
    );
    let glb = build_glb(json.as_bytes(), &positions);

    let out = import_gltf(&glb, ImportSettings::default()).unwrap();
    assert!(out.is_complete(), "failures: {:?}", out.failures);
    assert!(out.bin_chunk.is_some());
    assert_eq!(
        out.meshes[0]
            .data
            .attribute_f32(VertexSemantic::Position, 1, 3)
            .unwrap(),
        vec![-1.0, 0.0, 0.0]
    );
}

#[test]
fn truncated_glb_fails_structurally() {
    use crate::import::{ImportSettings, import_gltf};

    let positions = vec3_bytes(&[[0.0, 0.0, 0.0]]);
    let json = format!(
        concat!(
            "{{\"asset\":{{\"version\":\"2.0\"}},",
            "\"buffers\":[{{\"byteLength\":{len}}}]}}"
        ),
        len = positions.len()
    );
    let glb = build_glb(json.as_bytes(), &positions);

    // Chop the binary chunk off mid-payload.
    let truncated = &glb[..glb.len() - 6];
    assert!(import_gltf(truncated, ImportSettings::default()).is_err());
}

#[test]
fn base64_encode_matches_decoder() {
    use crate::import::buffers::base64_decode;

    for data in [
        b"Hello World".to_vec(),
        b"a".to_vec(),
        vec![1, 2, 3],
        (0u8..=255).collect::<Vec<u8>>(),
    ] {
        let encoded = base64_encode(&data);
        assert_eq!(base64_decode(&encoded).unwrap(), data);
    }
}

#[test]
fn doc_builder_produces_parseable_documents() {
    let mut doc = DocBuilder::new();
    let positions = doc.add_positions(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    doc.add_mesh(vec![json!({
        "attributes": { "POSITION": positions },
    })]);

    let gltf = gltf_dep::Gltf::from_slice(&doc.build()).expect("document parses");
    assert_eq!(gltf.document.meshes().count(), 1);
    assert_eq!(gltf.document.accessors().count(), 1);
}
