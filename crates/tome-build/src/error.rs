use std::path::PathBuf;

use tome_render::RenderError;
use tome_site::{NavigationError, ResolveError};
use tome_source::LoadError;

/// Output writer failures.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid output path \"{0}\"")]
    InvalidPath(String),

    #[error("\"{0}\" is generated by the build and cannot be supplied as a static file")]
    ReservedPath(String),

    #[error("failed to serialize navigation index: {0}")]
    Json(#[from] serde_json::Error),
}

/// Build failures, one variant per pipeline stage.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("build cancelled")]
    Cancelled,
}
