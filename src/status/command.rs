//! Command probe: run a version command and parse its first line.
use super::{Probe, first_line, version};
use crate::exec::Executor;

/// Probe by running `program args…`.
///
/// A program missing from `PATH` or a non-zero exit means not installed.
/// Output that does not match the pattern still counts as installed.
pub(super) fn probe(
    executor: &dyn Executor,
    program: &str,
    args: &[String],
    pattern: Option<&str>,
) -> Probe {
    if !executor.which(program) {
        return Probe::Absent;
    }
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match executor.run_unchecked(program, &args) {
        Ok(result) if result.success => {
            Probe::Present(first_line(&result).and_then(|line| version::extract(line, pattern)))
        }
        Ok(_) => Probe::Absent,
        Err(e) => {
            tracing::warn!(program, "version probe failed: {e:#}");
            Probe::Indeterminate
        }
    }
}
