//! Portable, self-executing command bundles.
//!
//! `sdlx` packages a command-execution environment into one executable
//! script: the sdlx runtime itself, the project's plugins and configuration,
//! a throwaway manifest and lockfile, and the command to run. Executed on a
//! machine without a project, the script extracts itself into a private
//! sandbox, points the bundled configuration at that sandbox and hands
//! control to the bundled runtime, which installs dependencies immutably and
//! runs the command in the caller's directory, propagating its exit code.
//!
//! # Architecture
//!
//! Building and running are symmetric. At build time the project
//! configuration is projected into bundle-relative form, staged next to a
//! scratch project where the host package manager adds the requested
//! packages, archived and wrapped. At run time a small bash loader unpacks
//! the archive and the bundled runtime takes over. The package manager
//! itself is reached only through the [`engine::PackageManager`] seam.
//!
//! # Modules
//!
//! - [`api`]: Orchestration functions behind each command
//! - [`bootstrap`]: Artifact extraction, relocation and delegation
//! - [`bundle`]: Bundle layout, projection, staging, archives and wrappers
//! - [`config`]: Configuration system with layered precedence (CLI > env > project > user file > defaults)
//! - [`engine`]: Package-manager seam and its process-backed implementation
//! - [`error`]: Semantic error types for the application
//! - [`process`]: Child process exit-code handling
//! - [`project`]: Project and workspace discovery
//! - [`runtime`]: Process flags and runtime pinning

pub mod api;
pub mod bootstrap;
pub mod bundle;
pub mod config;
pub mod engine;
pub mod error;
pub mod process;
pub mod project;
pub mod runtime;
