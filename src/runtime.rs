//! Process flags and runtime pinning.
//!
//! A project may pin the sdlx runtime through `runtime_path`. Unless
//! `SDLX_IGNORE_PATH` is set, an sdlx binary that is not the pinned one
//! re-executes the pinned binary with the same arguments. `SDLX_IGNORE_CWD`
//! makes discovery start at the process working directory regardless of
//! `--cwd`; the bootstrap sets both flags for the command it delegates to.

use std::ffi::OsString;
use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::config::AppConfig;
use crate::error::{ConfigError, Result};
use crate::process::run_to_completion;

/// Start discovery at the process working directory.
pub const IGNORE_CWD_ENV: &str = "SDLX_IGNORE_CWD";

/// Do not redirect to the project's pinned runtime.
pub const IGNORE_PATH_ENV: &str = "SDLX_IGNORE_PATH";

/// Flags read from the process environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessFlags {
    /// `SDLX_IGNORE_CWD` is set.
    pub ignore_cwd: bool,
    /// `SDLX_IGNORE_PATH` is set.
    pub ignore_path: bool,
}

impl ProcessFlags {
    /// Read the flags through `env`.
    ///
    /// A flag is set when its variable is `1` or `true`.
    #[must_use]
    pub fn from_env<E: mockable::Env>(env: &E) -> Self {
        Self {
            ignore_cwd: is_set(env, IGNORE_CWD_ENV),
            ignore_path: is_set(env, IGNORE_PATH_ENV),
        }
    }
}

fn is_set<E: mockable::Env>(env: &E, name: &str) -> bool {
    env.string(name)
        .is_some_and(|value| matches!(value.trim(), "1" | "true"))
}

/// Choose the directory discovery starts from.
///
/// `--cwd` wins unless `SDLX_IGNORE_CWD` is set; relative values resolve
/// against the process working directory.
#[must_use]
pub fn effective_cwd(
    flags: ProcessFlags,
    requested: Option<&Utf8Path>,
    process_cwd: &Utf8Path,
) -> Utf8PathBuf {
    match requested {
        Some(path) if !flags.ignore_cwd => AppConfig::resolve_path(process_cwd, path),
        _ => process_cwd.to_path_buf(),
    }
}

/// Return the pinned runtime the current process should hand over to.
///
/// Returns `Ok(None)` when nothing is pinned, when redirection is disabled
/// or when the pinned binary is the running one.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` if the pinned runtime does not exist.
pub fn pinned_runtime(
    config: &AppConfig,
    project_cwd: &Utf8Path,
    flags: ProcessFlags,
    current_exe: &Utf8Path,
) -> Result<Option<Utf8PathBuf>> {
    if flags.ignore_path {
        return Ok(None);
    }
    let Some(ref runtime_path) = config.runtime_path else {
        return Ok(None);
    };

    let pinned = AppConfig::resolve_path(project_cwd, runtime_path);
    let canonical = pinned.canonicalize_utf8().map_err(|e| ConfigError::InvalidValue {
        field: String::from("runtime_path"),
        reason: format!("cannot use pinned runtime {pinned}: {e}"),
    })?;
    let current = current_exe
        .canonicalize_utf8()
        .unwrap_or_else(|_| current_exe.to_path_buf());

    if canonical == current {
        Ok(None)
    } else {
        Ok(Some(canonical))
    }
}

/// Re-execute `runtime` with `args`, marking the child so it does not
/// redirect again, and return its exit code.
///
/// # Errors
///
/// Returns `EngineError::SpawnFailed` if the runtime cannot be started.
pub fn redirect(runtime: &Utf8Path, args: &[OsString]) -> Result<i32> {
    info!(%runtime, "redirecting to pinned runtime");
    let mut command = Command::new(runtime);
    command.args(args).env(IGNORE_PATH_ENV, "1");
    run_to_completion(&mut command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SdlxError;
    use mockable::MockEnv;
    use rstest::rstest;

    fn env_with(values: &'static [(&'static str, &'static str)]) -> MockEnv {
        let mut env = MockEnv::new();
        env.expect_string().returning(move |name| {
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_owned())
        });
        env
    }

    #[rstest]
    #[case(&[], false, false)]
    #[case(&[("SDLX_IGNORE_CWD", "1")], true, false)]
    #[case(&[("SDLX_IGNORE_PATH", "true"), ("SDLX_IGNORE_CWD", "0")], false, true)]
    fn flags_follow_the_environment(
        #[case] values: &'static [(&'static str, &'static str)],
        #[case] ignore_cwd: bool,
        #[case] ignore_path: bool,
    ) {
        let flags = ProcessFlags::from_env(&env_with(values));

        assert_eq!(
            flags,
            ProcessFlags {
                ignore_cwd,
                ignore_path,
            }
        );
    }

    #[rstest]
    #[case(false, Some("sub"), "/work/sub")]
    #[case(false, Some("/elsewhere"), "/elsewhere")]
    #[case(true, Some("/elsewhere"), "/work")]
    #[case(false, None, "/work")]
    fn effective_cwd_honours_ignore_cwd(
        #[case] ignore_cwd: bool,
        #[case] requested: Option<&str>,
        #[case] expected: &str,
    ) {
        let flags = ProcessFlags {
            ignore_cwd,
            ignore_path: false,
        };

        let cwd = effective_cwd(flags, requested.map(Utf8Path::new), Utf8Path::new("/work"));

        assert_eq!(cwd.as_str(), expected);
    }

    fn pinned_config(path: &str) -> AppConfig {
        AppConfig {
            runtime_path: Some(Utf8PathBuf::from(path)),
            ..AppConfig::default()
        }
    }

    #[rstest]
    fn unpinned_projects_never_redirect() {
        let result = pinned_runtime(
            &AppConfig::default(),
            Utf8Path::new("/work"),
            ProcessFlags::default(),
            Utf8Path::new("/usr/bin/sdlx"),
        )
        .expect("unpinned lookup should succeed");

        assert!(result.is_none());
    }

    #[rstest]
    fn ignore_path_disables_redirection() {
        let flags = ProcessFlags {
            ignore_cwd: false,
            ignore_path: true,
        };

        let result = pinned_runtime(
            &pinned_config("/does/not/exist"),
            Utf8Path::new("/work"),
            flags,
            Utf8Path::new("/usr/bin/sdlx"),
        )
        .expect("ignored pin should succeed");

        assert!(result.is_none());
    }

    #[rstest]
    fn pinned_runtime_resolves_against_the_project() {
        let tmp = tempfile::tempdir().expect("temp dir should be created");
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
            .expect("temp dir path should be UTF-8");
        std::fs::create_dir_all(root.join(".sdlx/releases")).expect("dirs should be created");
        std::fs::write(root.join(".sdlx/releases/sdlx"), b"").expect("runtime written");
        std::fs::write(root.join("other-sdlx"), b"").expect("other runtime written");

        let config = pinned_config(".sdlx/releases/sdlx");
        let redirect_to = pinned_runtime(
            &config,
            &root,
            ProcessFlags::default(),
            &root.join("other-sdlx"),
        )
        .expect("pinned lookup should succeed");
        let same = pinned_runtime(
            &config,
            &root,
            ProcessFlags::default(),
            &root.join(".sdlx/releases/sdlx"),
        )
        .expect("pinned lookup should succeed");

        let expected = root
            .join(".sdlx/releases/sdlx")
            .canonicalize_utf8()
            .expect("runtime should canonicalize");
        assert_eq!(redirect_to, Some(expected));
        assert!(same.is_none());
    }

    #[rstest]
    fn missing_pinned_runtime_is_a_configuration_error() {
        let result = pinned_runtime(
            &pinned_config("/does/not/exist/sdlx"),
            Utf8Path::new("/work"),
            ProcessFlags::default(),
            Utf8Path::new("/usr/bin/sdlx"),
        );

        assert!(matches!(
            result,
            Err(SdlxError::Config(ConfigError::InvalidValue { .. }))
        ));
    }
}
