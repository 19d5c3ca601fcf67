//! Bundle construction.
//!
//! A bundle is a directory tree laid out per [`layout`], whose configuration
//! refers to bundle-internal paths through the [`placeholder`] token. The
//! tree is staged on disk ([`staging`]), packed into a compressed archive
//! ([`archive`]) and wrapped into a self-executing script ([`wrapper`]).

pub mod archive;
pub mod layout;
pub mod placeholder;
pub mod projector;
pub mod staging;
pub mod wrapper;

pub use archive::{ArchiveImage, ArchiveWriter};
pub use projector::{PluginCopy, ProjectedConfig, project_bundle_config, project_dlx_config};
pub use staging::{StagingArea, stage_bundle, write_scratch_project};
pub use wrapper::{DATA_MARKER, render_wrapper, write_artifact};
