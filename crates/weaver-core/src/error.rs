//! Error types for Weaver

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("refusing to write outside repo root: {path} (root {root})")]
    WriteRefused { path: PathBuf, root: PathBuf },

    #[error("generation failed: {provider} - {message}")]
    Generation { provider: String, message: String },

    #[error("version control error: {0}")]
    VersionControl(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn write_refused(path: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self::WriteRefused {
            path: path.into(),
            root: root.into(),
        }
    }

    pub fn generation(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Generation {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Boundary breaches must stop the current operation; everything else is
    /// isolated to the cycle that raised it.
    pub fn is_boundary_breach(&self) -> bool {
        matches!(self, Self::WriteRefused { .. })
    }
}
