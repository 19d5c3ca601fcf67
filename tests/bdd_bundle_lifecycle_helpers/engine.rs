//! Scripted package manager for lifecycle scenarios.

use std::sync::Mutex;

use camino::Utf8Path;
use sdlx::engine::{EngineContext, InstallOptions, InstallReport, PackageManager};
use sdlx::error::{EngineError, FilesystemError, Result};
use sdlx::project::Workspace;

/// Engine whose results are fixed up front and whose executions are
/// recorded.
#[derive(Debug)]
pub(crate) struct ScriptedEngine {
    add_exit: i32,
    run_exit: i32,
    install_error: Option<String>,
    executed: Mutex<Vec<Vec<String>>>,
}

impl ScriptedEngine {
    pub(crate) fn new(add_exit: i32, run_exit: i32, install_error: Option<String>) -> Self {
        Self {
            add_exit,
            run_exit,
            install_error,
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Commands executed so far.
    pub(crate) fn executed(&self) -> Vec<Vec<String>> {
        self.executed
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl PackageManager for ScriptedEngine {
    fn add(&self, ctx: &EngineContext, _packages: &[String]) -> Result<i32> {
        if self.add_exit == 0 {
            let lockfile = ctx.project_cwd.join("yarn.lock");
            std::fs::write(&lockfile, "# resolved\n")
                .map_err(|e| FilesystemError::from_io(lockfile.as_std_path(), &e))?;
        }
        Ok(self.add_exit)
    }

    fn install(
        &self,
        _ctx: &EngineContext,
        options: InstallOptions,
        report: &mut dyn InstallReport,
    ) -> Result<()> {
        if options != InstallOptions::frozen() {
            return Err(EngineError::InstallFailed {
                message: format!("expected a frozen install, got {options:?}"),
            }
            .into());
        }
        report.report_info("resolution step");
        match self.install_error {
            Some(ref message) => report.report_error(message),
            None => Ok(()),
        }
    }

    fn execute_binary(
        &self,
        _ctx: &EngineContext,
        _workspace: &Workspace,
        binary: &str,
        args: &[String],
        _cwd: &Utf8Path,
    ) -> Result<i32> {
        let argv = std::iter::once(binary.to_owned())
            .chain(args.iter().cloned())
            .collect();
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(argv);
        }
        Ok(self.run_exit)
    }
}
