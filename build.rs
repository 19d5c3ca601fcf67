//! Build script embedding the compressed artifact loader.
//!
//! `hook/loader.sh` is stripped of comment and blank lines and gzipped into
//! `OUT_DIR/loader.sh.gz`, which the wrapper emitter includes at compile time.

use std::io::{self, Write};
use std::path::PathBuf;

use flate2::Compression;
use flate2::write::GzEncoder;

const LOADER_SOURCE: &str = "hook/loader.sh";
const LOADER_OUTPUT: &str = "loader.sh.gz";

fn minify(source: &str) -> String {
    source
        .lines()
        .map(str::trim_end)
        .filter(|line| {
            let trimmed = line.trim_start();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .fold(String::new(), |mut acc, line| {
            acc.push_str(line);
            acc.push('\n');
            acc
        })
}

#[expect(
    clippy::print_stdout,
    reason = "cargo reads build script directives from stdout"
)]
fn main() -> io::Result<()> {
    println!("cargo::rerun-if-changed={LOADER_SOURCE}");

    let out_dir = std::env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .ok_or_else(|| io::Error::other("OUT_DIR is not set"))?;

    let source = std::fs::read_to_string(LOADER_SOURCE)?;
    let mut encoder = GzEncoder::new(vec![], Compression::best());
    encoder.write_all(minify(&source).as_bytes())?;
    let compressed = encoder.finish()?;

    std::fs::write(out_dir.join(LOADER_OUTPUT), compressed)
}
