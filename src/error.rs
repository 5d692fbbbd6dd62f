//! Error type shared by the readers, encoders and drawing surfaces.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VizError>;

#[derive(Debug, Error)]
pub enum VizError {
    #[error("\"{}\" is not a file", .0.display())]
    MissingSource(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a valid container: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed source: {0}")]
    Malformed(String),

    #[error("missing dimension \"{0}\"")]
    MissingDimension(String),

    #[error("missing variable \"{0}\"")]
    MissingVariable(String),

    #[error("unknown column \"{0}\"")]
    UnknownColumn(String),

    #[error("frame {index} is out of range ({total} frames)")]
    FrameOutOfRange { index: usize, total: usize },

    #[error("cache artifact {}: {reason}", path.display())]
    Cache { path: PathBuf, reason: String },

    #[error("render failed: {0}")]
    Render(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl VizError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        VizError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        VizError::Malformed(msg.into())
    }
}
