//! Configuration loading with layered precedence.
//!
//! This module provides functions to load configuration with the precedence order
//! (lowest to highest): application defaults, user configuration file, project
//! `.sdlxrc.toml`, environment variables, command-line arguments.
//!
//! # Architecture Note: Why Manual Layer Composition?
//!
//! The `OrthoConfig` derive macro provides `load()` and `compose_layers()` methods
//! that handle discovery, environment variables, and CLI parsing automatically.
//! This loader uses `MergeComposer` manually because:
//!
//! 1. **Subcommand separation**: The CLI (`Cli` struct) handles subcommand dispatch
//!    via clap's `#[command(subcommand)]`, while `AppConfig` holds configuration
//!    values.
//!
//! 2. **Project layer**: the project `.sdlxrc.toml` lives next to the lockfile,
//!    which is only known after project discovery. Extracted bundles also need
//!    the user-level file skipped entirely.
//!
//! 3. **Environment variable validation**: typed values that do not parse return
//!    an error instead of silently falling back to defaults.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use ortho_config::MergeComposer;
use ortho_config::discovery::ConfigDiscovery;
use ortho_config::serde_json::{self, Map, Value};

use crate::bundle::layout::CONFIG_FILE;
use crate::config::{AppConfig, EngineConfig};
use crate::error::{ConfigError, Result};

// ============================================================================
// Environment Variable Specification Table
// ============================================================================

/// The type of value expected from an environment variable.
#[derive(Clone, Copy)]
enum EnvVarType {
    /// String value (always accepted).
    String,
    /// Boolean value (`true`/`false`). Invalid values return an error.
    Bool,
}

/// Specification for a single environment variable mapping.
struct EnvVarSpec {
    /// The environment variable name (e.g., `SDLX_CACHE_FOLDER`).
    env_var: &'static str,
    /// The JSON path segments (e.g., `["engine", "program"]`).
    path: &'static [&'static str],
    /// The expected value type.
    var_type: EnvVarType,
}

/// Table of all environment variables and their JSON paths.
const ENV_VAR_SPECS: &[EnvVarSpec] = &[
    EnvVarSpec {
        env_var: "SDLX_RUNTIME_PATH",
        path: &["runtime_path"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "SDLX_CACHE_FOLDER",
        path: &["cache_folder"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "SDLX_ENABLE_GLOBAL_CACHE",
        path: &["enable_global_cache"],
        var_type: EnvVarType::Bool,
    },
    EnvVarSpec {
        env_var: "SDLX_ENABLE_TELEMETRY",
        path: &["enable_telemetry"],
        var_type: EnvVarType::Bool,
    },
    EnvVarSpec {
        env_var: "SDLX_ENGINE_PROGRAM",
        path: &["engine", "program"],
        var_type: EnvVarType::String,
    },
];

/// Returns the list of environment variable names recognised by the config loader.
#[must_use]
pub fn env_var_names() -> Vec<&'static str> {
    ENV_VAR_SPECS.iter().map(|spec| spec.env_var).collect()
}

/// Inputs that decide which layers take part in a configuration load.
#[derive(Debug, Clone, Default)]
pub struct ConfigRequest {
    /// Explicit user-level configuration file (`--config`).
    pub config_path: Option<Utf8PathBuf>,
    /// Engine program override (`--engine`).
    pub engine: Option<String>,
    /// Project root whose `.sdlxrc.toml` should be layered in.
    pub project_cwd: Option<Utf8PathBuf>,
    /// Whether the user-level configuration file is consulted at all.
    pub include_user_file: bool,
}

impl ConfigRequest {
    /// Build a request that only reads the given project's configuration.
    #[must_use]
    pub fn project_only(project_cwd: impl Into<Utf8PathBuf>) -> Self {
        Self {
            project_cwd: Some(project_cwd.into()),
            ..Self::default()
        }
    }
}

/// Read a TOML file through a capability handle on its parent directory.
fn read_toml_file(path: &Utf8Path) -> Result<Option<String>> {
    let current_dir = Utf8PathBuf::from(".");
    let parent = path.parent().unwrap_or_else(|| current_dir.as_ref());
    let file_name = path.file_name().unwrap_or(path.as_str());

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|e| {
        ConfigError::ParseError {
            message: format!("failed to open directory {parent}: {e}"),
        }
    })?;

    if !dir.exists(file_name) {
        return Ok(None);
    }

    dir.read_to_string(file_name)
        .map(Some)
        .map_err(|e| {
            ConfigError::ParseError {
                message: format!("failed to read {path}: {e}"),
            }
            .into()
        })
}

/// Load a configuration file and push it to the composer.
fn load_config_file(path: &Utf8Path, composer: &mut MergeComposer) -> Result<()> {
    let Some(content) = read_toml_file(path)? else {
        return Ok(());
    };

    let value =
        toml::from_str::<serde_json::Value>(&content).map_err(|e| ConfigError::ParseError {
            message: format!("failed to parse {path}: {e}"),
        })?;

    composer.push_file(value, Some(path.to_path_buf()));
    Ok(())
}

/// Read a project's `.sdlxrc.toml` as an editable table.
///
/// Returns `Ok(None)` when the project has no configuration file.
///
/// # Errors
///
/// Returns `ConfigError::ParseError` when the file exists but cannot be read
/// or is not valid TOML.
pub fn read_project_table(project_cwd: &Utf8Path) -> Result<Option<toml::Table>> {
    let path = project_cwd.join(CONFIG_FILE);
    let Some(content) = read_toml_file(&path)? else {
        return Ok(None);
    };

    toml::from_str::<toml::Table>(&content)
        .map(Some)
        .map_err(|e| {
            ConfigError::ParseError {
                message: format!("failed to parse {path}: {e}"),
            }
            .into()
        })
}

/// Locate the user-level configuration file.
///
/// An explicit path must exist; discovered candidates are optional.
fn discover_user_config(request: &ConfigRequest) -> Result<Option<Utf8PathBuf>> {
    if let Some(ref explicit) = request.config_path {
        if !explicit.is_file() {
            return Err(ConfigError::FileNotFound {
                path: explicit.as_std_path().to_path_buf(),
            }
            .into());
        }
        return Ok(Some(explicit.clone()));
    }

    let discovery = ConfigDiscovery::builder("sdlx")
        .env_var("SDLX_CONFIG_PATH")
        .config_file_name("config.toml")
        .dotfile_name(".sdlx.toml")
        .build();
    Ok(discovery
        .candidates()
        .into_iter()
        .filter(|p| p.exists())
        .find_map(|p| Utf8PathBuf::try_from(p).ok()))
}

/// Load configuration with full layer precedence.
///
/// This function loads configuration from all available sources:
/// 1. Application defaults defined in the struct
/// 2. User configuration file (`--config`, `SDLX_CONFIG_PATH` or XDG paths),
///    unless the request excludes it
/// 3. The project's `.sdlxrc.toml`
/// 4. Environment variables prefixed with `SDLX_`
/// 5. Command-line overrides
///
/// Later sources override earlier ones.
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if an explicit configuration path does
/// not exist, and other `ConfigError` variants for malformed configuration
/// files, invalid typed environment variable values or a failed layer merge.
pub fn load_config<E: mockable::Env>(request: &ConfigRequest, env: &E) -> Result<AppConfig> {
    let env_values = collect_env_vars(env)?;
    merge_layers(request, env_values)
}

/// Load the configuration of a generated project.
///
/// Only defaults and the project's `.sdlxrc.toml` take part, with `engine`
/// carried over from the invoking configuration. Used for the scratch
/// projects sdlx creates itself, which must not pick up ambient settings.
///
/// # Errors
///
/// Returns `ConfigError` if the project configuration is malformed.
pub fn load_project_config(project_cwd: &Utf8Path, engine: &EngineConfig) -> Result<AppConfig> {
    let request = ConfigRequest {
        engine: engine.program.clone(),
        ..ConfigRequest::project_only(project_cwd)
    };
    merge_layers(&request, Value::Null)
}

fn merge_layers(request: &ConfigRequest, env_values: Value) -> Result<AppConfig> {
    let mut composer = MergeComposer::new();

    let defaults =
        serde_json::to_value(AppConfig::default()).map_err(|e| ConfigError::ParseError {
            message: format!("failed to serialise defaults: {e}"),
        })?;
    composer.push_defaults(defaults);

    if request.include_user_file {
        if let Some(ref path) = discover_user_config(request)? {
            load_config_file(path, &mut composer)?;
        }
    }

    if let Some(ref project_cwd) = request.project_cwd {
        load_config_file(&project_cwd.join(CONFIG_FILE), &mut composer)?;
    }

    if !env_values.is_null() {
        composer.push_environment(env_values);
    }

    let cli_overrides = build_cli_overrides(request);
    if !cli_overrides.is_null() {
        composer.push_cli(cli_overrides);
    }

    let config =
        AppConfig::merge_from_layers(composer.layers()).map_err(ConfigError::OrthoConfig)?;

    Ok(config)
}

/// Collect environment variables with the `SDLX_` prefix into a JSON value.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` if a typed environment variable has an
/// unparseable value.
fn collect_env_vars<E: mockable::Env>(env: &E) -> Result<Value> {
    let mut root = Map::new();

    for spec in ENV_VAR_SPECS {
        let Some(raw_value) = env.string(spec.env_var) else {
            continue;
        };

        let json_value = match spec.var_type {
            EnvVarType::String => Value::String(raw_value),
            EnvVarType::Bool => match raw_value.parse::<bool>() {
                Ok(b) => Value::Bool(b),
                Err(_) => {
                    return Err(ConfigError::InvalidValue {
                        field: spec.env_var.to_owned(),
                        reason: format!("expected bool (true/false), got '{raw_value}'"),
                    }
                    .into());
                }
            },
        };

        insert_at_path(&mut root, spec.path, json_value);
    }

    if root.is_empty() {
        Ok(Value::Null)
    } else {
        Ok(Value::Object(root))
    }
}

/// Insert a value at a nested path in a JSON map, creating intermediate
/// objects as needed.
fn insert_at_path(root: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((&field, parents)) = path.split_last() else {
        return;
    };

    let mut current = root;
    for &segment in parents {
        let entry = current
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(obj) = entry.as_object_mut() else {
            return;
        };
        current = obj;
    }

    current.insert(field.to_owned(), value);
}

/// Build a JSON value containing CLI overrides.
fn build_cli_overrides(request: &ConfigRequest) -> Value {
    let Some(ref engine) = request.engine else {
        return Value::Null;
    };

    let mut overrides = Map::new();
    insert_at_path(&mut overrides, &["engine", "program"], Value::String(engine.clone()));
    Value::Object(overrides)
}
