//! Fixed relative layout of a bundle and of the projects sdlx operates on.

use camino::Utf8PathBuf;

/// Runtime binary inside the bundle.
pub const RELEASE_PATH: &str = ".sdlx/releases/sdlx";

/// Directory holding the indexed plugin slots.
pub const PLUGINS_DIR: &str = ".sdlx/plugins";

/// Package cache folder inside the bundle.
pub const CACHE_FOLDER: &str = ".sdlx/cache";

/// Project configuration file name.
pub const CONFIG_FILE: &str = ".sdlxrc.toml";

/// Project manifest file name.
pub const MANIFEST_FILE: &str = "package.json";

/// Lockfile name; its presence marks a project root.
pub const LOCKFILE: &str = "yarn.lock";

/// Serialized `[command, ...args]` record.
pub const COMMAND_RECORD: &str = "command.json";

/// Contents of the generated empty manifest.
pub const EMPTY_MANIFEST: &str = "{}\n";

/// Unix mode applied to the runtime binary and to artifacts.
pub const EXECUTABLE_MODE: u32 = 0o775;

/// Return the bundle-relative slot for the plugin at `index`.
#[must_use]
pub fn plugin_slot(index: usize) -> Utf8PathBuf {
    Utf8PathBuf::from(PLUGINS_DIR).join(format!("plugin-{index}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, ".sdlx/plugins/plugin-0")]
    #[case(12, ".sdlx/plugins/plugin-12")]
    fn plugin_slots_are_indexed(#[case] index: usize, #[case] expected: &str) {
        assert_eq!(plugin_slot(index).as_str(), expected);
    }
}
