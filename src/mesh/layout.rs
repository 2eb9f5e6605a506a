//! Interleaved vertex layout description.

/// Semantic role of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexSemantic {
    /// Object-space position.
    Position,
    /// Unit surface normal.
    Normal,
    /// Unit tangent with bitangent sign in W.
    Tangent,
    /// Texture coordinate set (up to [`VertexLayout::MAX_TEXCOORD_SETS`]).
    TexCoord(u8),
    /// Vertex color (RGBA).
    Color,
    /// Bone joint indices.
    Joints,
    /// Bone weights.
    Weights,
}

/// Data format of a vertex attribute in the output buffer.
///
/// The importer always widens source data to one of these; quantized input
/// formats never survive into the output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// Two f32 components.
    Float2,
    /// Three f32 components.
    Float3,
    /// Four f32 components.
    Float4,
    /// Four u32 components.
    Uint4,
}

impl VertexFormat {
    /// Size of one attribute value in bytes.
    pub fn size(&self) -> u32 {
        match self {
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::Float4 | Self::Uint4 => 16,
        }
    }
}

/// One attribute within an interleaved vertex layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Semantic role.
    pub semantic: VertexSemantic,
    /// Output data format.
    pub format: VertexFormat,
    /// Byte offset within one vertex.
    pub offset: u32,
}

/// An interleaved single-buffer vertex layout.
///
/// Attributes are appended in order; each lands at the current end of the
/// vertex and bumps the stride. Two layouts are equal when their attribute
/// lists are equal, which makes the layout usable as a clustering key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VertexLayout {
    attributes: Vec<VertexAttribute>,
    stride: u32,
}

impl VertexLayout {
    /// Maximum number of texture coordinate sets in one layout.
    pub const MAX_TEXCOORD_SETS: u8 = 8;

    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute at the current end of the vertex.
    pub fn push(&mut self, semantic: VertexSemantic, format: VertexFormat) {
        self.attributes.push(VertexAttribute {
            semantic,
            format,
            offset: self.stride,
        });
        self.stride += format.size();
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, semantic: VertexSemantic, format: VertexFormat) -> Self {
        self.push(semantic, format);
        self
    }

    /// Bytes per vertex.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// All attributes in declaration order.
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Find an attribute by semantic.
    pub fn find(&self, semantic: VertexSemantic) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.semantic == semantic)
    }

    /// Byte offset of a semantic within one vertex, if present.
    pub fn offset_of(&self, semantic: VertexSemantic) -> Option<u32> {
        self.find(semantic).map(|a| a.offset)
    }

    /// Whether the layout carries the given semantic.
    pub fn has(&self, semantic: VertexSemantic) -> bool {
        self.find(semantic).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_accumulates_offsets_and_stride() {
        let layout = VertexLayout::new()
            .with(VertexSemantic::Position, VertexFormat::Float3)
            .with(VertexSemantic::Normal, VertexFormat::Float3)
            .with(VertexSemantic::TexCoord(0), VertexFormat::Float2);

        assert_eq!(layout.stride(), 32);
        assert_eq!(layout.offset_of(VertexSemantic::Position), Some(0));
        assert_eq!(layout.offset_of(VertexSemantic::Normal), Some(12));
        assert_eq!(layout.offset_of(VertexSemantic::TexCoord(0)), Some(24));
        assert_eq!(layout.offset_of(VertexSemantic::Color), None);
    }

    #[test]
    fn equality_is_structural() {
        let a = VertexLayout::new()
            .with(VertexSemantic::Position, VertexFormat::Float3)
            .with(VertexSemantic::Tangent, VertexFormat::Float4);
        let b = VertexLayout::new()
            .with(VertexSemantic::Position, VertexFormat::Float3)
            .with(VertexSemantic::Tangent, VertexFormat::Float4);
        let c = VertexLayout::new().with(VertexSemantic::Position, VertexFormat::Float3);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn format_sizes() {
        assert_eq!(VertexFormat::Float2.size(), 8);
        assert_eq!(VertexFormat::Float3.size(), 12);
        assert_eq!(VertexFormat::Float4.size(), 16);
        assert_eq!(VertexFormat::Uint4.size(), 16);
    }

    #[test]
    fn multiple_texcoord_sets() {
        let mut layout = VertexLayout::new().with(VertexSemantic::Position, VertexFormat::Float3);
        for set in 0..4 {
            layout.push(VertexSemantic::TexCoord(set), VertexFormat::Float2);
        }
        assert_eq!(layout.stride(), 12 + 4 * 8);
        assert_eq!(layout.offset_of(VertexSemantic::TexCoord(3)), Some(12 + 24));
    }
}
