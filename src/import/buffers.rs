//! Buffer data resolution.
//!
//! Produces one byte vector per glTF buffer from either the embedded GLB
//! binary chunk or a base64 data URI, and validates every buffer view range
//! up front so the conversion kernels can slice without re-checking buffer
//! bounds. External file URIs are a collaborator concern and rejected here.

use gltf_dep::Document;

use super::error::ImportError;

/// Descriptor of the embedded binary chunk of a GLB container.
///
/// At most one exists per asset; JSON-form assets have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlbBinChunk {
    /// Offset of the chunk payload relative to the start of the blob.
    pub offset: usize,
    /// Payload length in bytes.
    pub length: usize,
}

/// Resolved buffer data plus the GLB chunk record.
pub(crate) struct ResolvedBuffers {
    /// One byte vector per glTF buffer, in document order.
    pub data: Vec<Vec<u8>>,
    /// The embedded binary chunk, when the asset is a GLB.
    pub bin_chunk: Option<GlbBinChunk>,
}

/// Resolve all buffer data from the document.
///
/// The first `Bin`-sourced buffer maps to the GLB blob; data URIs decode
/// inline. A missing blob or unsupported URI is a structural failure.
pub(crate) fn resolve_buffers(
    document: &Document,
    blob: Option<Vec<u8>>,
) -> Result<ResolvedBuffers, ImportError> {
    let mut data = Vec::new();
    let mut bin_chunk = None;

    for buffer in document.buffers() {
        match buffer.source() {
            gltf_dep::buffer::Source::Bin => {
                let blob = blob.as_ref().ok_or_else(|| {
                    ImportError::Buffer("binary buffer referenced but no blob present".into())
                })?;
                if buffer.length() > blob.len() {
                    return Err(ImportError::Buffer(format!(
                        "buffer {} declares {} bytes but the binary chunk holds {}",
                        buffer.index(),
                        buffer.length(),
                        blob.len()
                    )));
                }
                bin_chunk = Some(GlbBinChunk {
                    offset: 0,
                    length: blob.len(),
                });
                data.push(blob.clone());
            }
            gltf_dep::buffer::Source::Uri(uri) => {
                let Some(decoded) = parse_data_uri(uri) else {
                    return Err(ImportError::Buffer(format!(
                        "external buffer URIs not supported: {uri}"
                    )));
                };
                if buffer.length() > decoded.len() {
                    return Err(ImportError::Buffer(format!(
                        "buffer {} declares {} bytes but its data URI decodes to {}",
                        buffer.index(),
                        buffer.length(),
                        decoded.len()
                    )));
                }
                data.push(decoded);
            }
        }
    }

    Ok(ResolvedBuffers { data, bin_chunk })
}

/// Validate that every buffer view fits inside its buffer.
///
/// Runs once after [`resolve_buffers`]; a view outside its buffer is
/// structural corruption and fails the whole asset.
pub(crate) fn validate_views(
    document: &Document,
    buffers: &[Vec<u8>],
) -> Result<(), ImportError> {
    for view in document.views() {
        let buffer_index = view.buffer().index();
        let buffer = buffers.get(buffer_index).ok_or_else(|| {
            ImportError::Buffer(format!(
                "view {} references buffer {buffer_index} which does not exist",
                view.index()
            ))
        })?;
        let end = view.offset() + view.length();
        if end > buffer.len() {
            return Err(ImportError::Buffer(format!(
                "view {} spans {}..{end} of buffer {buffer_index} ({} bytes)",
                view.index(),
                view.offset(),
                buffer.len()
            )));
        }
    }
    Ok(())
}

/// Parse a data URI (e.g. `data:application/octet-stream;base64,...`).
pub(crate) fn parse_data_uri(uri: &str) -> Option<Vec<u8>> {
    let rest = uri.strip_prefix("data:")?;
    let base64_start = rest.find(";base64,")?;
    base64_decode(&rest[base64_start + 8..])
}

/// Simple base64 decoder (avoids adding a dependency).
pub(crate) fn base64_decode(input: &str) -> Option<Vec<u8>> {
    const TABLE: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

    fn decode_char(c: u8) -> Option<u8> {
        TABLE.iter().position(|&b| b == c).map(|p| p as u8)
    }

    let input: Vec<u8> = input
        .bytes()
        .filter(|&b| b != b'\n' && b != b'\r' && b != b' ')
        .collect();
    let mut result = Vec::with_capacity(input.len() * 3 / 4);

    for chunk in input.chunks(4) {
        let mut buf = [0u8; 4];
        let mut pad = 0;

        for (i, &byte) in chunk.iter().enumerate() {
            if byte == b'=' {
                pad += 1;
                buf[i] = 0;
            } else {
                buf[i] = decode_char(byte)?;
            }
        }

        result.push((buf[0] << 2) | (buf[1] >> 4));
        if pad < 2 {
            result.push((buf[1] << 4) | (buf[2] >> 2));
        }
        if pad < 1 {
            result.push((buf[2] << 6) | buf[3]);
        }
    }

    Some(result)
}
