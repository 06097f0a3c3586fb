use std::fmt;
use std::path::PathBuf;

use crate::embed::EngineError;

// ---------------------------------------------------------------------------
// Stream role – which of the two IDX streams a failure belongs to
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRole {
    Labels,
    Images,
}

impl fmt::Display for StreamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamRole::Labels => write!(f, "label stream"),
            StreamRole::Images => write!(f, "image stream"),
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineError – every failure of decode → parse → embed
// ---------------------------------------------------------------------------

/// Fatal errors of a single pipeline run. None of them is retried.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt gzip archive {}: {source}", .path.display())]
    CorruptArchive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{role}: magic number {found} does not match expected {expected}")]
    FormatMismatch {
        role: StreamRole,
        expected: u32,
        found: u32,
    },

    #[error("{role}: header field '{field}' has invalid value {value}")]
    InvalidHeader {
        role: StreamRole,
        field: &'static str,
        value: i32,
    },

    #[error("{role}: need {needed} bytes but only {available} are available")]
    TruncatedData {
        role: StreamRole,
        needed: usize,
        available: usize,
    },

    #[error("label stream has {labels} records but image stream has {images}")]
    RecordCountMismatch { labels: usize, images: usize },

    #[error("embedding computation failed: {0}")]
    EmbeddingComputation(#[from] EngineError),

    #[error("staged run misuse: {0}")]
    ProtocolViolation(&'static str),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
