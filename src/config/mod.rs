//! Configuration system for sdlx.
//!
//! This module provides the configuration structures and CLI definitions for the
//! sdlx application. Configuration loading and precedence merging is handled by
//! the `ortho_config` crate. Precedence: CLI flags override environment
//! variables, which override the project `.sdlxrc.toml`, which overrides the
//! user configuration file, which overrides defaults.
//!
//! # Example Configuration
//!
//! ```toml
//! runtime_path = ".sdlx/releases/sdlx"
//! cache_folder = ".sdlx/cache"
//! enable_global_cache = false
//! enable_telemetry = false
//! plugins = [
//!     ".sdlx/plugins/workspace-tools.js",
//!     { path = ".sdlx/plugins/interactive.js", spec = "interactive-tools" },
//! ]
//!
//! [engine]
//! program = "sdlx-engine"
//! ```

mod cli;
mod loader;
mod types;

#[cfg(test)]
mod tests;

pub use cli::{BootstrapArgs, Cli, Commands, CreateBundleArgs, DlxArgs, RunBundleArgs};
pub use loader::{
    ConfigRequest, env_var_names, load_config, load_project_config, read_project_table,
};
pub use types::{AppConfig, EngineConfig, PluginReference};
