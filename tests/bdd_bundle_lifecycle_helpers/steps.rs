//! Given/when steps for bundle lifecycle scenarios.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use rstest_bdd_macros::{given, when};
use sdlx::api::{CreateBundleParams, RunBundleParams, create_bundle, run_bundle};
use sdlx::bootstrap::{BootstrapRequest, prepare_sandbox};
use sdlx::config::AppConfig;
use tempfile::TempDir;

use super::StepResult;
use super::engine::ScriptedEngine;
use super::state::{BundleState, LifecycleResult};

fn write_file(root: &Utf8Path, relative: &str, contents: &str) -> StepResult<()> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| format!("create {parent}: {e}"))?;
    }
    std::fs::write(&path, contents).map_err(|e| format!("write {path}: {e}"))
}

fn root(bundle_state: &BundleState) -> StepResult<Utf8PathBuf> {
    bundle_state
        .root
        .get()
        .ok_or_else(|| String::from("source project should be set up"))
}

fn engine(bundle_state: &BundleState) -> ScriptedEngine {
    ScriptedEngine::new(
        bundle_state.add_exit.get().unwrap_or(0),
        bundle_state.run_exit.get().unwrap_or(0),
        bundle_state.install_error.get(),
    )
}

fn tokio_runtime() -> StepResult<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| format!("failed to create runtime: {e}"))
}

#[given("a source project with one plugin")]
fn given_source_project(bundle_state: &BundleState) -> StepResult<()> {
    let tmp = TempDir::new().map_err(|e| format!("failed to create temp dir: {e}"))?;
    let root = Utf8PathBuf::try_from(tmp.path().to_path_buf())
        .map_err(|e| format!("temp dir is not UTF-8: {e}"))?;

    write_file(&root, "bin/sdlx", "runtime")?;
    write_file(&root, "project/yarn.lock", "")?;
    write_file(&root, "project/package.json", "{}\n")?;
    write_file(&root, "project/.sdlxrc.toml", "plugins = [\"tools.js\"]\n")?;
    write_file(&root, "project/tools.js", "plugin")?;
    std::fs::create_dir_all(root.join("out")).map_err(|e| format!("create out: {e}"))?;
    std::fs::create_dir_all(root.join("sandboxes"))
        .map_err(|e| format!("create sandboxes: {e}"))?;

    bundle_state.temp_dir.set(Arc::new(tmp));
    bundle_state.root.set(root);
    Ok(())
}

#[given("the bundled command is {command}")]
fn given_bundled_command(bundle_state: &BundleState, command: String) {
    let parts: Vec<String> = command.split_whitespace().map(String::from).collect();
    bundle_state.command.set(parts);
}

#[given("the engine fails to add packages with code {code}")]
fn given_add_fails(bundle_state: &BundleState, code: i32) {
    bundle_state.add_exit.set(code);
}

#[given("the bundled command exits with code {code}")]
fn given_command_exit_code(bundle_state: &BundleState, code: i32) {
    bundle_state.run_exit.set(code);
}

#[given("the immutable install reports {message}")]
fn given_install_error(bundle_state: &BundleState, message: String) {
    bundle_state.install_error.set(message);
}

fn create(bundle_state: &BundleState) -> StepResult<()> {
    let root = root(bundle_state)?;
    let command = bundle_state
        .command
        .get()
        .ok_or_else(|| String::from("command should be configured"))?;
    let Some((binary, args)) = command.split_first() else {
        return Err(String::from("command should not be empty"));
    };

    let engine = engine(bundle_state);
    let config = AppConfig::default();
    let tokio = tokio_runtime()?;
    let project = root.join("project");
    let runtime_binary = root.join("bin/sdlx");
    let output = root.join("out/tool.sh");
    let packages = [String::from("hello-pkg@1.0.0")];

    let result = create_bundle(CreateBundleParams {
        engine: &engine,
        config: &config,
        cwd: &project,
        runtime_binary: &runtime_binary,
        output: &output,
        packages: &packages,
        command: binary,
        args,
        include_cache: false,
        quiet: true,
        runtime_handle: tokio.handle(),
    });

    bundle_state.artifact.set(output);
    bundle_state.result.set(LifecycleResult::from(result));
    Ok(())
}

#[given("a bundle has been created")]
fn given_bundle_created(bundle_state: &BundleState) -> StepResult<()> {
    create(bundle_state)?;
    match bundle_state.result.get() {
        Some(LifecycleResult::Ok(_)) => Ok(()),
        other => Err(format!("bundle creation should succeed, got {other:?}")),
    }
}

#[when("a bundle is created")]
fn when_bundle_created(bundle_state: &BundleState) -> StepResult<()> {
    create(bundle_state)
}

fn request(bundle_state: &BundleState, args: Vec<String>) -> StepResult<BootstrapRequest> {
    let root = root(bundle_state)?;
    let artifact = bundle_state
        .artifact
        .get()
        .ok_or_else(|| String::from("artifact should be written"))?;
    Ok(BootstrapRequest {
        artifact,
        sandbox: None,
        sandbox_parent: Some(root.join("sandboxes")),
        caller_cwd: root,
        args,
    })
}

#[when("the bundle is extracted")]
fn when_bundle_extracted(bundle_state: &BundleState) -> StepResult<()> {
    let request = request(bundle_state, Vec::new())?;
    let sandbox = prepare_sandbox(&request).map_err(|e| format!("extraction failed: {e}"))?;
    let config_path = sandbox.path().join(".sdlxrc.toml");
    let text = std::fs::read_to_string(&config_path)
        .map_err(|e| format!("read {config_path}: {e}"))?;
    bundle_state.sandbox_config.set(text);
    Ok(())
}

#[when("the bundle is extracted and run with {extra}")]
fn when_bundle_run(bundle_state: &BundleState, extra: String) -> StepResult<()> {
    let args: Vec<String> = extra.split_whitespace().map(String::from).collect();
    let request = request(bundle_state, args)?;
    let sandbox = prepare_sandbox(&request).map_err(|e| format!("extraction failed: {e}"))?;

    let engine = engine(bundle_state);
    let config = AppConfig::default();
    let result = run_bundle(RunBundleParams {
        engine: &engine,
        config: &config,
        bundle_dir: sandbox.path(),
        caller_cwd: &request.caller_cwd,
        args: &request.args,
    });

    bundle_state.executed.set(engine.executed());
    bundle_state.result.set(LifecycleResult::from(result));
    Ok(())
}
