use std::path::PathBuf;
use thiserror::Error;

/// Fatal scan failures. Filtering exclusions are never errors; everything
/// here aborts the invocation and carries its original cause.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to resolve artifact {path}")]
    Resolution {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("language metadata accessor failed for {class_name}: {detail}")]
    ReflectiveAccess { class_name: String, detail: String },

    #[error("failed to write API file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    pub fn resolution(
        path: impl Into<PathBuf>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Resolution {
            path: path.into(),
            source: Box::new(source),
        }
    }
}
