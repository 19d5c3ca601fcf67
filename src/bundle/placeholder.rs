//! Bundle-root placeholder handling.
//!
//! Paths that point inside a bundle are written into its configuration with
//! the [`PLACEHOLDER_TOKEN`] standing in for the bundle root. The token is
//! replaced textually once the real root is known: with `.` inside an
//! extracted sandbox, or with a relative path while the bundle is still being
//! staged next to the scratch project.

use std::borrow::Cow;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Sentinel standing in for the bundle root.
pub const PLACEHOLDER_TOKEN: &str = "%%SDLX%%";

/// Prefix a bundle-relative path with the placeholder token.
#[must_use]
pub fn tokenize(relative: &Utf8Path) -> String {
    format!("{PLACEHOLDER_TOKEN}/{relative}")
}

/// Tokenize `path` if it lies under `bundle_root`.
///
/// Returns `None` for paths outside the bundle, which must be kept as-is.
#[must_use]
pub fn tokenize_path(path: &Utf8Path, bundle_root: &Utf8Path) -> Option<String> {
    let relative = path.strip_prefix(bundle_root).ok()?;
    if relative.as_str().is_empty() {
        return Some(String::from(PLACEHOLDER_TOKEN));
    }
    Some(tokenize(relative))
}

/// Replace every placeholder occurrence in `text` with `root`.
///
/// Text without the token is returned borrowed and unchanged.
#[must_use]
pub fn substitute<'a>(text: &'a str, root: &str) -> Cow<'a, str> {
    if text.contains(PLACEHOLDER_TOKEN) {
        Cow::Owned(text.replace(PLACEHOLDER_TOKEN, root))
    } else {
        Cow::Borrowed(text)
    }
}

/// Compute the path leading from `from_dir` to `bundle_root`.
///
/// Both paths are expected to be absolute and normalized. Identical paths
/// yield `.`.
#[must_use]
pub fn relative_root(from_dir: &Utf8Path, bundle_root: &Utf8Path) -> Utf8PathBuf {
    let from: Vec<Utf8Component<'_>> = from_dir.components().collect();
    let to: Vec<Utf8Component<'_>> = bundle_root.components().collect();

    let shared = from
        .iter()
        .zip(to.iter())
        .take_while(|(left, right)| left == right)
        .count();

    let mut relative = Utf8PathBuf::new();
    for _ in from.iter().skip(shared) {
        relative.push("..");
    }
    for component in to.iter().skip(shared) {
        relative.push(component.as_str());
    }

    if relative.as_str().is_empty() {
        Utf8PathBuf::from(".")
    } else {
        relative
    }
}
