//! Error types for the import pipeline.
//!
//! Structural failures ([`ImportError`]) abort the whole asset and nothing
//! partially constructed is returned. Everything else is isolated: the
//! failing primitive or cluster is recorded, logged with a stable
//! [`ErrorCode`], and the rest of the asset continues to load.

use thiserror::Error;

use crate::compute::Cancelled;

/// Structural failure that aborts the whole asset load.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The glTF/GLB container failed to parse (invalid header, truncated
    /// chunk, malformed JSON).
    #[error("glTF parse error: {0}")]
    Parse(#[from] gltf_dep::Error),

    /// Buffer data could not be resolved or a view range falls outside its
    /// buffer.
    #[error("buffer error: {0}")]
    Buffer(String),

    /// An accessor references data that does not exist.
    #[error("accessor error: {0}")]
    Accessor(String),

    /// An accessor was used in two incompatible roles and the usage policy
    /// is [`UsagePolicy::Fail`](super::UsagePolicy::Fail).
    #[error("accessor {accessor} used as {previous} and {requested}")]
    UsageConflict {
        /// The conflicting accessor index.
        accessor: usize,
        /// The role recorded first.
        previous: String,
        /// The role requested later.
        requested: String,
    },

    /// The caller cancelled the import at a phase boundary.
    #[error("import cancelled")]
    Cancelled,
}

impl From<Cancelled> for ImportError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

/// Stable diagnostic code attached to every isolated-failure log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// No kernel exists for this component-type/role combination.
    UnsupportedFormat,
    /// A primitive has no POSITION attribute.
    MissingPositions,
    /// A position accessor lacks declared min/max; bounds were recomputed.
    MissingBounds,
    /// Sparse override on a role that does not take overlays; dense kept.
    SparseUnsupportedRole,
    /// A sparse override index is outside the dense element count.
    SparseIndexOutOfRange,
    /// The same accessor was used in two different roles.
    InconsistentUsage,
    /// An index value does not fit the signed 32-bit output range.
    IndexOutOfRange,
    /// Compressed primitive with no decompressor collaborator wired in.
    CompressedPrimitive,
    /// Accessor data slice is shorter than count * stride requires.
    TruncatedData,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            Self::UnsupportedFormat => "E_UNSUPPORTED_FORMAT",
            Self::MissingPositions => "E_MISSING_POSITIONS",
            Self::MissingBounds => "W_MISSING_BOUNDS",
            Self::SparseUnsupportedRole => "W_SPARSE_UNSUPPORTED_ROLE",
            Self::SparseIndexOutOfRange => "E_SPARSE_INDEX_RANGE",
            Self::InconsistentUsage => "E_INCONSISTENT_USAGE",
            Self::IndexOutOfRange => "E_INDEX_RANGE",
            Self::CompressedPrimitive => "E_COMPRESSED_PRIMITIVE",
            Self::TruncatedData => "E_TRUNCATED_DATA",
        };
        f.write_str(code)
    }
}

/// Failure of a single kernel invocation or primitive conversion.
///
/// Carries the stable code plus enough context to log; never crosses the
/// public API directly (it becomes a `PrimitiveFailure` record).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConvertError {
    pub code: ErrorCode,
    pub detail: String,
}

impl ConvertError {
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }

    pub fn unsupported(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnsupportedFormat, detail)
    }
}

impl std::fmt::Display for ConvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.detail)
    }
}
