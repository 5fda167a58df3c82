//! Command: print version information.
use std::io::Write;

/// Version string baked in at build time.
#[must_use]
pub fn version() -> &'static str {
    option_env!("MAZIQ_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Write `maziq <version>` to `out`.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn run(out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "maziq {}", version())
}
