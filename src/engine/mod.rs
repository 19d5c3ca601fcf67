//! Package-manager engine seam.
//!
//! Dependency resolution, installs and binary lookup belong to the host
//! package manager. sdlx drives it through the [`PackageManager`] trait;
//! [`HostEngine`] is the production implementation, which spawns the
//! configured engine program.

mod host;
mod report;


pub use host::HostEngine;
pub use report::{InstallReport, ThrowReport};

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::AppConfig;
use crate::error::Result;
use crate::project::Workspace;

/// Whether engine invocations may report usage telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Telemetry {
    /// Telemetry follows the configuration.
    Enabled,
    /// Telemetry is off regardless of configuration.
    Disabled,
}

impl Telemetry {
    /// Whether telemetry is effectively on for `config`.
    #[must_use]
    pub const fn allows(self, config: &AppConfig) -> bool {
        matches!(self, Self::Enabled) && config.enable_telemetry
    }
}

/// Install behaviour requested from the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Fail instead of modifying the lockfile.
    pub immutable: bool,
    /// Fail instead of adding or removing cache entries.
    pub immutable_cache: bool,
}

impl InstallOptions {
    /// Options for an install that must not change the lockfile or cache.
    #[must_use]
    pub const fn frozen() -> Self {
        Self {
            immutable: true,
            immutable_cache: true,
        }
    }
}

/// Everything an engine invocation needs to know about the project.
#[derive(Debug, Clone)]
pub struct EngineContext {
    /// Root of the project the engine operates on.
    pub project_cwd: Utf8PathBuf,
    /// Configuration resolved for that project.
    pub config: AppConfig,
    /// Telemetry policy for this invocation.
    pub telemetry: Telemetry,
    /// Suppress non-critical engine output.
    pub quiet: bool,
}

/// Operations sdlx delegates to the host package manager.
#[cfg_attr(test, mockall::automock)]
pub trait PackageManager {
    /// Add `packages` to the project and return the engine's exit code.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be invoked.
    fn add(&self, ctx: &EngineContext, packages: &[String]) -> Result<i32>;

    /// Install the project's dependencies, reporting problems to `report`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be invoked or `report` aborts
    /// on a reported error.
    fn install(
        &self,
        ctx: &EngineContext,
        options: InstallOptions,
        report: &mut dyn InstallReport,
    ) -> Result<()>;

    /// Run a binary accessible from `workspace` with `cwd` as its working
    /// directory and return its exit code.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be invoked.
    fn execute_binary(
        &self,
        ctx: &EngineContext,
        workspace: &Workspace,
        binary: &str,
        args: &[String],
        cwd: &Utf8Path,
    ) -> Result<i32>;
}
