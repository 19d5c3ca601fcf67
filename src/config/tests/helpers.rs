//! Shared fixtures and helper functions for config tests.

use crate::config::{AppConfig, PluginReference};
use camino::Utf8PathBuf;
use mockable::MockEnv;
use ortho_config::MergeComposer;
use rstest::fixture;
use std::sync::Arc;

/// Fixture providing an `AppConfig` parsed from a full TOML example.
#[fixture]
pub fn app_config_from_full_toml() -> AppConfig {
    let toml = r#"
        runtime_path = "%%SDLX%%/.sdlx/releases/sdlx"
        cache_folder = "%%SDLX%%/.sdlx/cache"
        enable_global_cache = false
        enable_telemetry = false
        plugins = [
            "/opt/plugins/workspace-tools.js",
            { path = "/opt/plugins/interactive.js", spec = "interactive-tools" },
        ]

        [engine]
        program = "/usr/local/bin/sdlx-engine"
    "#;

    toml::from_str(toml).expect("TOML parsing should succeed")
}

/// Fixture providing an `AppConfig` parsed from a minimal TOML example.
#[fixture]
pub fn app_config_from_partial_toml() -> AppConfig {
    let toml = r#"
        enable_telemetry = false
    "#;

    toml::from_str(toml).expect("TOML parsing should succeed")
}

/// Fixture providing a `MockEnv` without any variables set.
#[fixture]
pub fn empty_env() -> MockEnv {
    let mut env = MockEnv::new();
    env.expect_string().returning(|_| None);
    env
}

/// Helper: Creates a `MockEnv` answering from a fixed list of variables.
pub fn env_with(vars: &'static [(&'static str, &'static str)]) -> MockEnv {
    let mut env = MockEnv::new();
    env.expect_string().returning(move |key| {
        vars.iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| String::from(*value))
    });
    env
}

/// Helper: Creates a `MergeComposer` with defaults layer already pushed.
pub fn create_composer_with_defaults() -> Result<MergeComposer, serde_json::Error> {
    let mut composer = MergeComposer::new();
    let defaults = ortho_config::serde_json::to_value(AppConfig::default())?;
    composer.push_defaults(defaults);
    Ok(composer)
}

/// Helper: Merges layers from a composer into `AppConfig`.
pub fn merge_config(composer: MergeComposer) -> Result<AppConfig, Arc<ortho_config::OrthoError>> {
    AppConfig::merge_from_layers(composer.layers())
}

/// Helper: Asserts that a config has all default values.
pub fn assert_config_has_defaults(config: &AppConfig) {
    assert!(config.runtime_path.is_none(), "runtime_path should be None");
    assert!(config.cache_folder.is_none(), "cache_folder should be None");
    assert!(
        config.enable_global_cache,
        "enable_global_cache should be true"
    );
    assert!(config.enable_telemetry, "enable_telemetry should be true");
    assert!(config.plugins.is_empty(), "plugins should be empty");
    assert!(config.engine.program.is_none(), "engine.program should be unset");
}

/// Helper: Builds a bare plugin reference.
pub fn bare_plugin(path: &str) -> PluginReference {
    PluginReference::Path(Utf8PathBuf::from(path))
}

/// Helper: Creates a `MergeComposer` with defaults, file, and env layers for
/// testing layer precedence.
pub fn create_composer_with_file_and_env() -> Result<MergeComposer, serde_json::Error> {
    use ortho_config::serde_json::json;

    let mut composer = create_composer_with_defaults()?;

    composer.push_file(
        json!({
            "cache_folder": "/from/file/cache",
            "engine": { "program": "file-engine" }
        }),
        None,
    );

    composer.push_environment(json!({
        "cache_folder": "/from/env/cache"
    }));

    Ok(composer)
}
