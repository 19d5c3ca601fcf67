//! Semantic error types for the sdlx application.
//!
//! This module defines the error hierarchy for sdlx, following the principle of
//! using semantic error enums (via `thiserror`) for conditions the caller might
//! inspect or map to an exit code, while reserving opaque errors
//! (`eyre::Report`) for the application boundary.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found at the expected path.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// The path where the configuration file was expected.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration file: {message}")]
    ParseError {
        /// A description of the parse error.
        message: String,
    },

    /// A configuration value failed validation.
    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// The reason the value is invalid.
        reason: String,
    },

    /// The `OrthoConfig` library returned an error during configuration loading.
    #[error("configuration loading failed: {0}")]
    OrthoConfig(Arc<ortho_config::OrthoError>),
}

/// Errors raised while building a bundle artifact.
#[derive(Debug, Error)]
pub enum BundleError {
    /// The runtime binary to embed could not be found.
    #[error("runtime binary not found: {path}")]
    RuntimeMissing {
        /// The expected runtime binary location.
        path: PathBuf,
    },

    /// A plugin referenced by the project configuration could not be found.
    #[error("plugin source not found: {path}")]
    PluginMissing {
        /// The resolved plugin source path.
        path: PathBuf,
    },

    /// The bundle archive could not be assembled.
    #[error("failed to assemble bundle archive: {message}")]
    ArchiveFailed {
        /// A description of the archive failure.
        message: String,
    },

    /// The artifact file could not be written.
    #[error("failed to write artifact '{path}': {message}")]
    ArtifactWriteFailed {
        /// The output path of the artifact.
        path: PathBuf,
        /// A description of the write failure.
        message: String,
    },
}

/// Errors raised when an artifact cannot be unpacked.
///
/// A self-extracting artifact has no fallback source, so every variant is
/// fatal for the invocation.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The artifact does not contain the data marker line.
    #[error("data marker not found in artifact: {path}")]
    MarkerNotFound {
        /// The artifact path.
        path: PathBuf,
    },

    /// The payload following the marker is not valid base64.
    #[error("artifact payload is not valid base64: {message}")]
    InvalidEncoding {
        /// A description of the decoding failure.
        message: String,
    },

    /// The decoded payload is not a readable bundle archive.
    #[error("artifact archive is corrupt: {message}")]
    CorruptArchive {
        /// A description of the archive failure.
        message: String,
    },
}

/// Errors raised while operating inside an extracted sandbox.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// No workspace contains the requested directory.
    #[error("no workspace found in project '{project_cwd}' for directory '{cwd}'")]
    WorkspaceRequired {
        /// The project root that was searched.
        project_cwd: PathBuf,
        /// The directory that needed a workspace.
        cwd: PathBuf,
    },

    /// The bundle does not contain a command record.
    #[error("command record not found: {path}")]
    CommandRecordMissing {
        /// The expected command record path.
        path: PathBuf,
    },

    /// The command record is not a non-empty JSON array of strings.
    #[error("malformed command record: {message}")]
    CommandRecordMalformed {
        /// A description of the problem.
        message: String,
    },
}

/// Errors raised by the package-manager engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No engine program is configured.
    #[error(
        "no engine program configured: set engine.program, SDLX_ENGINE_PROGRAM or --engine"
    )]
    ProgramNotConfigured,

    /// The engine process could not be started.
    #[error("failed to start engine '{program}': {message}")]
    SpawnFailed {
        /// The engine program.
        program: String,
        /// A description of the spawn failure.
        message: String,
    },

    /// The engine reported an install error.
    #[error("install failed: {message}")]
    InstallFailed {
        /// The first error reported by the engine.
        message: String,
    },
}

/// Errors that can occur during filesystem operations.
#[derive(Debug, Error)]
pub enum FilesystemError {
    /// A file or directory was not found.
    #[error("path not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// Permission denied when accessing a path.
    #[error("permission denied: {path}")]
    PermissionDenied {
        /// The path that could not be accessed.
        path: PathBuf,
    },

    /// An I/O error occurred.
    #[error("I/O error at '{path}': {message}")]
    IoError {
        /// The path where the error occurred.
        path: PathBuf,
        /// A description of the I/O error.
        message: String,
    },
}

impl FilesystemError {
    /// Classify an `io::Error` observed at `path`.
    #[must_use]
    pub fn from_io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let path_buf = path.into();
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path: path_buf },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path: path_buf },
            _ => Self::IoError {
                path: path_buf,
                message: error.to_string(),
            },
        }
    }
}

/// Top-level error type for the sdlx application.
///
/// This enum aggregates all domain-specific errors into a single type that can
/// be used throughout the application. At the application boundary (main.rs),
/// these errors are converted to `eyre::Report` for human-readable reporting.
#[derive(Debug, Error)]
pub enum SdlxError {
    /// An error occurred during configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred while building a bundle.
    #[error(transparent)]
    Bundle(#[from] BundleError),

    /// An artifact could not be unpacked.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// An error occurred inside a sandbox.
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    /// The package-manager engine failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// An error occurred during filesystem operations.
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// A specialised `Result` type for sdlx operations.
pub type Result<T> = std::result::Result<T, SdlxError>;
