//! Configuration data types for sdlx.

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoResult, PostMergeContext, PostMergeHook};
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// A plugin entry from the `plugins` list.
///
/// Plugins are declared either as a bare path or as a table carrying the
/// path together with the specification it was installed from:
///
/// ```toml
/// plugins = [
///     ".sdlx/plugins/workspace-tools.js",
///     { path = ".sdlx/plugins/interactive.js", spec = "interactive-tools" },
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PluginReference {
    /// A bare plugin path.
    Path(Utf8PathBuf),
    /// A plugin table, optionally carrying its origin specification.
    Detailed {
        /// Path to the plugin file.
        path: Utf8PathBuf,
        /// Version or origin metadata, passed through untouched.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        spec: Option<String>,
    },
}

impl PluginReference {
    /// Return the plugin file path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        match self {
            Self::Path(path) | Self::Detailed { path, .. } => path,
        }
    }
}

/// Package-manager engine configuration.
///
/// There is no default program: the engine must understand the `SDLX_*`
/// environment protocol spoken by [`crate::engine::HostEngine`], which stock
/// package managers do not.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// The engine program, resolved on `PATH` when not absolute.
    pub program: Option<String>,
}

/// Root application configuration.
///
/// This structure is loaded from configuration files, environment variables,
/// and command-line arguments with layered precedence. The precedence order
/// (lowest to highest) is: defaults, user configuration file, project
/// `.sdlxrc.toml`, environment variables, command-line arguments.
///
/// Relative paths are interpreted against the project root by
/// [`AppConfig::resolve_path`].
#[derive(Debug, Clone, SmartDefault, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(
    prefix = "SDLX",
    post_merge_hook,
    discovery(
        app_name = "sdlx",
        env_var = "SDLX_CONFIG_PATH",
        config_file_name = "config.toml",
        dotfile_name = ".sdlx.toml",
        config_cli_long = "config",
        config_cli_visible = true,
    )
)]
pub struct AppConfig {
    /// Runtime binary the project is pinned to.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub runtime_path: Option<Utf8PathBuf>,

    /// Folder holding package archives.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub cache_folder: Option<Utf8PathBuf>,

    /// Share the user-wide cache instead of `cache_folder`.
    #[default = true]
    #[serde(default = "enabled")]
    #[ortho_config(skip_cli)]
    pub enable_global_cache: bool,

    /// Allow the engine to report usage telemetry.
    #[default = true]
    #[serde(default = "enabled")]
    #[ortho_config(skip_cli)]
    pub enable_telemetry: bool,

    /// Plugins loaded by the engine, in declaration order.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub plugins: Vec<PluginReference>,

    /// Engine configuration.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub engine: EngineConfig,
}

const fn enabled() -> bool {
    true
}

impl AppConfig {
    /// Resolve a configured path against the project root.
    ///
    /// Absolute paths are returned unchanged.
    #[must_use]
    pub fn resolve_path(project_cwd: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            project_cwd.join(path)
        }
    }

    /// Return every plugin path resolved against the project root.
    #[must_use]
    pub fn resolved_plugins(&self, project_cwd: &Utf8Path) -> Vec<Utf8PathBuf> {
        self.plugins
            .iter()
            .map(|plugin| Self::resolve_path(project_cwd, plugin.path()))
            .collect()
    }
}

impl PostMergeHook for AppConfig {
    fn post_merge(&mut self, _ctx: &PostMergeContext) -> OrthoResult<()> {
        if self
            .engine
            .program
            .as_deref()
            .is_some_and(|program| program.trim().is_empty())
        {
            self.engine = EngineConfig::default();
        }
        Ok(())
    }
}
