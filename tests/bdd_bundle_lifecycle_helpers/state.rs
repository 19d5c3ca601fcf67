//! Scenario state for bundle lifecycle behavioural tests.

use std::sync::Arc;

use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;
use sdlx::api::CommandOutcome;
use tempfile::TempDir;

/// High-level outcome of a create or run call.
#[derive(Debug, Clone)]
pub(crate) enum LifecycleResult {
    /// The call returned a `CommandOutcome`.
    Ok(CommandOutcome),
    /// The call returned an error.
    Err(String),
}

impl From<sdlx::error::Result<CommandOutcome>> for LifecycleResult {
    fn from(result: sdlx::error::Result<CommandOutcome>) -> Self {
        match result {
            Ok(outcome) => Self::Ok(outcome),
            Err(e) => Self::Err(e.to_string()),
        }
    }
}

#[derive(Default, ScenarioState)]
pub(crate) struct BundleState {
    /// Temporary directory holding the project, runtime and artifact.
    pub(crate) temp_dir: Slot<Arc<TempDir>>,
    /// UTF-8 path of `temp_dir`.
    pub(crate) root: Slot<Utf8PathBuf>,
    /// Recorded command: binary followed by its arguments.
    pub(crate) command: Slot<Vec<String>>,
    /// Exit code of the dependency add.
    pub(crate) add_exit: Slot<i32>,
    /// Exit code of the bundled command.
    pub(crate) run_exit: Slot<i32>,
    /// Error reported by the immutable install, if any.
    pub(crate) install_error: Slot<String>,
    /// Path of the written artifact.
    pub(crate) artifact: Slot<Utf8PathBuf>,
    /// Outcome of the most recent call.
    pub(crate) result: Slot<LifecycleResult>,
    /// Commands the engine executed, one argv per entry.
    pub(crate) executed: Slot<Vec<Vec<String>>>,
    /// Configuration text of the last extracted sandbox.
    pub(crate) sandbox_config: Slot<String>,
}

#[fixture]
pub(crate) fn bundle_state() -> BundleState {
    let state = BundleState::default();
    state.command.set(vec![String::from("hello")]);
    state.add_exit.set(0);
    state.run_exit.set(0);
    state.executed.set(Vec::new());
    state
}
