//! Projection of a project's configuration into bundle-local configuration.
//!
//! The projector works on the raw TOML table so that settings sdlx does not
//! model itself (registry servers, engine-specific keys) travel into the
//! bundle unchanged.

use camino::{Utf8Path, Utf8PathBuf};
use toml::{Table, Value};

use super::layout::{CACHE_FOLDER, RELEASE_PATH, plugin_slot};
use super::placeholder::tokenize;
use crate::config::AppConfig;
use crate::error::{ConfigError, Result};

const KEY_RUNTIME_PATH: &str = "runtime_path";
const KEY_CACHE_FOLDER: &str = "cache_folder";
const KEY_ENABLE_GLOBAL_CACHE: &str = "enable_global_cache";
const KEY_ENABLE_TELEMETRY: &str = "enable_telemetry";
const KEY_PLUGINS: &str = "plugins";

/// A plugin file to copy into its bundle slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginCopy {
    /// Absolute source path on the build machine.
    pub source: Utf8PathBuf,
    /// Bundle-relative destination slot.
    pub slot: Utf8PathBuf,
}

/// Bundle configuration together with the plugin files it refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedConfig {
    /// The bundle-local configuration, bundle paths tokenized.
    pub table: Table,
    /// Plugins to copy, in slot order.
    pub copies: Vec<PluginCopy>,
}

impl ProjectedConfig {
    /// Render the configuration as TOML text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` if the table cannot be serialised.
    pub fn to_toml_string(&self) -> Result<String> {
        render_table(&self.table)
    }
}

/// Render a configuration table as TOML text.
///
/// # Errors
///
/// Returns `ConfigError::ParseError` if the table cannot be serialised.
pub fn render_table(table: &Table) -> Result<String> {
    toml::to_string(table).map_err(|e| {
        ConfigError::ParseError {
            message: format!("failed to serialise configuration: {e}"),
        }
        .into()
    })
}

/// Project the invoking project's configuration into bundle configuration.
///
/// Telemetry is disabled, the runtime and cache paths are pointed at their
/// bundle locations and every plugin is assigned the slot matching its
/// position in the `plugins` array. Without a source table a minimal
/// configuration is synthesized.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` if `plugins` is not an array of paths
/// or path tables.
pub fn project_bundle_config(
    source: Option<&Table>,
    project_cwd: &Utf8Path,
    include_cache: bool,
) -> Result<ProjectedConfig> {
    let mut table = source.cloned().unwrap_or_default();
    let mut copies = Vec::new();

    table.insert(KEY_ENABLE_TELEMETRY.to_owned(), Value::Boolean(false));
    table.insert(
        KEY_RUNTIME_PATH.to_owned(),
        Value::String(tokenize(Utf8Path::new(RELEASE_PATH))),
    );
    table.insert(
        KEY_CACHE_FOLDER.to_owned(),
        Value::String(tokenize(Utf8Path::new(CACHE_FOLDER))),
    );
    table.insert(
        KEY_ENABLE_GLOBAL_CACHE.to_owned(),
        Value::Boolean(!include_cache),
    );

    if let Some(plugins) = table.get_mut(KEY_PLUGINS) {
        let entries = plugin_entries_mut(plugins)?;
        for (index, entry) in entries.iter_mut().enumerate() {
            let source_path = plugin_entry_path(entry, index)?;
            let slot = plugin_slot(index);
            copies.push(PluginCopy {
                source: AppConfig::resolve_path(project_cwd, &source_path),
                slot: slot.clone(),
            });
            set_plugin_entry_path(entry, tokenize(&slot));
        }
    }

    Ok(ProjectedConfig { table, copies })
}

/// Project the invoking project's configuration for a temporary `dlx` run.
///
/// The shared cache is enabled, telemetry disabled and relative plugin paths
/// are made absolute so they keep resolving from the temporary project.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` if `plugins` is malformed.
pub fn project_dlx_config(source: Option<&Table>, project_cwd: &Utf8Path) -> Result<Table> {
    let mut table = source.cloned().unwrap_or_default();

    table.insert(KEY_ENABLE_GLOBAL_CACHE.to_owned(), Value::Boolean(true));
    table.insert(KEY_ENABLE_TELEMETRY.to_owned(), Value::Boolean(false));

    if let Some(plugins) = table.get_mut(KEY_PLUGINS) {
        let entries = plugin_entries_mut(plugins)?;
        for (index, entry) in entries.iter_mut().enumerate() {
            let source_path = plugin_entry_path(entry, index)?;
            let absolute = AppConfig::resolve_path(project_cwd, &source_path);
            set_plugin_entry_path(entry, absolute.into_string());
        }
    }

    Ok(table)
}

fn plugin_entries_mut(plugins: &mut Value) -> Result<&mut Vec<Value>> {
    plugins.as_array_mut().ok_or_else(|| {
        ConfigError::InvalidValue {
            field: KEY_PLUGINS.to_owned(),
            reason: String::from("expected an array of plugins"),
        }
        .into()
    })
}

fn plugin_entry_path(entry: &Value, index: usize) -> Result<Utf8PathBuf> {
    let path = match entry {
        Value::String(path) => Some(path.as_str()),
        Value::Table(fields) => fields.get("path").and_then(Value::as_str),
        _ => None,
    };

    path.map(Utf8PathBuf::from).ok_or_else(|| {
        ConfigError::InvalidValue {
            field: format!("{KEY_PLUGINS}[{index}]"),
            reason: String::from("expected a path string or a table with a 'path' key"),
        }
        .into()
    })
}

fn set_plugin_entry_path(entry: &mut Value, path: String) {
    match entry {
        Value::Table(fields) => {
            fields.insert(String::from("path"), Value::String(path));
        }
        other => *other = Value::String(path),
    }
}
