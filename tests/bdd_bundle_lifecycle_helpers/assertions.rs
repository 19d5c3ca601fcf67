//! Assertion helpers for bundle lifecycle behavioural tests.

use camino::Utf8Path;
use rstest_bdd_macros::then;
use sdlx::api::CommandOutcome;
use sdlx::bootstrap::mount_artifact;
use sdlx::bundle::ArchiveImage;
use sdlx::bundle::layout::{CONFIG_FILE, RELEASE_PATH, plugin_slot};
use sdlx::bundle::placeholder::PLACEHOLDER_TOKEN;

use super::StepResult;
use super::state::{BundleState, LifecycleResult};

fn artifact_bytes(bundle_state: &BundleState) -> StepResult<Vec<u8>> {
    let artifact = bundle_state
        .artifact
        .get()
        .ok_or_else(|| String::from("artifact path should be set"))?;
    std::fs::read(&artifact).map_err(|e| format!("read {artifact}: {e}"))
}

fn image(bundle_state: &BundleState) -> StepResult<ArchiveImage> {
    let bytes = artifact_bytes(bundle_state)?;
    mount_artifact(Utf8Path::new("tool.sh"), &bytes).map_err(|e| format!("mount failed: {e}"))
}

#[then("the outcome is success")]
fn outcome_is_success(bundle_state: &BundleState) -> StepResult<()> {
    let result = bundle_state
        .result
        .get()
        .ok_or_else(|| String::from("result should be set"))?;

    match result {
        LifecycleResult::Ok(CommandOutcome::Success) => Ok(()),
        LifecycleResult::Ok(CommandOutcome::CommandExit { code }) => Err(format!(
            "expected Success, got CommandExit {{ code: {code} }}"
        )),
        LifecycleResult::Err(msg) => Err(format!("expected Success, got error: {msg}")),
    }
}

#[then("the outcome is command exit with code {expected_code}")]
fn outcome_is_command_exit(bundle_state: &BundleState, expected_code: i32) -> StepResult<()> {
    let result = bundle_state
        .result
        .get()
        .ok_or_else(|| String::from("result should be set"))?;

    match result {
        LifecycleResult::Ok(CommandOutcome::CommandExit { code }) if code == expected_code => {
            Ok(())
        }
        LifecycleResult::Ok(CommandOutcome::CommandExit { code }) => {
            Err(format!("expected exit code {expected_code}, got {code}"))
        }
        LifecycleResult::Ok(CommandOutcome::Success) => Err(format!(
            "expected CommandExit {{ code: {expected_code} }}, got Success"
        )),
        LifecycleResult::Err(msg) => Err(format!(
            "expected CommandExit {{ code: {expected_code} }}, got error: {msg}"
        )),
    }
}

#[then("the run fails with {message}")]
fn run_fails_with(bundle_state: &BundleState, message: String) -> StepResult<()> {
    match bundle_state.result.get() {
        Some(LifecycleResult::Err(actual)) if actual == message => Ok(()),
        other => Err(format!("expected error '{message}', got {other:?}")),
    }
}

#[then("the artifact starts with a shebang")]
fn artifact_starts_with_shebang(bundle_state: &BundleState) -> StepResult<()> {
    let bytes = artifact_bytes(bundle_state)?;
    if bytes.starts_with(b"#!/usr/bin/env bash\n") {
        Ok(())
    } else {
        Err(String::from("artifact should start with a bash shebang"))
    }
}

#[then("the artifact contains the runtime")]
fn artifact_contains_runtime(bundle_state: &BundleState) -> StepResult<()> {
    let image = image(bundle_state)?;
    match image.file(Utf8Path::new(RELEASE_PATH)) {
        Some(b"runtime") => Ok(()),
        other => Err(format!("unexpected runtime contents: {other:?}")),
    }
}

#[then("the artifact contains plugin slot {index}")]
fn artifact_contains_plugin(bundle_state: &BundleState, index: usize) -> StepResult<()> {
    let image = image(bundle_state)?;
    let slot = plugin_slot(index);
    match image.file(&slot) {
        Some(b"plugin") => Ok(()),
        other => Err(format!("unexpected contents at {slot}: {other:?}")),
    }
}

#[then("the bundled configuration points inside the bundle")]
fn bundled_configuration_is_tokenized(bundle_state: &BundleState) -> StepResult<()> {
    let image = image(bundle_state)?;
    let config = image
        .file(Utf8Path::new(CONFIG_FILE))
        .ok_or_else(|| String::from("configuration should be bundled"))?;
    let text = String::from_utf8_lossy(config);
    let expected = format!("{PLACEHOLDER_TOKEN}/{RELEASE_PATH}");
    if text.contains(&expected) {
        Ok(())
    } else {
        Err(format!("expected '{expected}' in bundled configuration:\n{text}"))
    }
}

#[then("no artifact is written")]
fn no_artifact_written(bundle_state: &BundleState) -> StepResult<()> {
    let artifact = bundle_state
        .artifact
        .get()
        .ok_or_else(|| String::from("artifact path should be set"))?;
    if artifact.exists() {
        Err(format!("artifact {artifact} should not exist"))
    } else {
        Ok(())
    }
}

#[then("the engine ran {binary} with {args}")]
fn engine_ran(bundle_state: &BundleState, binary: String, args: String) -> StepResult<()> {
    let executed = bundle_state.executed.get().unwrap_or_default();
    let expected: Vec<String> = std::iter::once(binary)
        .chain(args.split_whitespace().map(String::from))
        .collect();
    if executed.len() == 1 && executed.first() == Some(&expected) {
        Ok(())
    } else {
        Err(format!("expected one execution of {expected:?}, got {executed:?}"))
    }
}

#[then("the bundled command was not executed")]
fn command_not_executed(bundle_state: &BundleState) -> StepResult<()> {
    let executed = bundle_state.executed.get().unwrap_or_default();
    if executed.is_empty() {
        Ok(())
    } else {
        Err(format!("expected no executions, got {executed:?}"))
    }
}

#[then("the sandbox configuration has no placeholder left")]
fn sandbox_configuration_relocated(bundle_state: &BundleState) -> StepResult<()> {
    let text = bundle_state
        .sandbox_config
        .get()
        .ok_or_else(|| String::from("sandbox configuration should be captured"))?;
    let expected = format!("./{RELEASE_PATH}");
    if !text.contains(PLACEHOLDER_TOKEN) && text.contains(&expected) {
        Ok(())
    } else {
        Err(format!("configuration was not relocated:\n{text}"))
    }
}
