use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use thiserror::Error;

/// How many of the largest matching files one run processes
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// The only file extension the scanner picks up (compared case-insensitively)
pub const TARGET_EXTENSION: &str = "mp4";

/// Invalid runtime configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("root is not a directory: {0}")]
    RootNotDirectory(PathBuf),
    #[error("jobs must be at least 1")]
    ZeroJobs,
    #[error("target extension must not be empty")]
    EmptyExtension,
}

/// Runtime configuration for one batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqueezeConfig {
    /// Directory tree to scan for candidates
    pub root: PathBuf,
    /// File extension to match, without the leading dot
    pub extension: String,
    /// Maximum number of files processed in one batch
    pub batch_size: usize,
    /// Maximum number of encodes in flight (1 = strictly sequential)
    pub jobs: usize,
    /// Path to the ffmpeg binary
    pub ffmpeg_bin: PathBuf,
}

impl Default for SqueezeConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl SqueezeConfig {
    /// Scan the current directory, top 20, one encode at a time
    pub fn default_config() -> Self {
        Self {
            root: PathBuf::from("."),
            extension: TARGET_EXTENSION.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            jobs: 1,
            ffmpeg_bin: PathBuf::from("ffmpeg"),
        }
    }

    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = root.as_ref().to_path_buf();
        self
    }

    /// Check the configuration before any filesystem work starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs == 0 {
            return Err(ConfigError::ZeroJobs);
        }
        if self.extension.trim_start_matches('.').is_empty() {
            return Err(ConfigError::EmptyExtension);
        }
        if !self.root.is_dir() {
            return Err(ConfigError::RootNotDirectory(self.root.clone()));
        }
        Ok(())
    }

    /// Resolve `root` to an absolute path so candidates come out absolute
    pub fn canonicalize_root(mut self) -> Result<Self> {
        self.root = std::fs::canonicalize(&self.root)
            .with_context(|| format!("Failed to resolve root: {}", self.root.display()))?;
        Ok(self)
    }
}
