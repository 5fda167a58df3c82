//! Version string extraction and comparison.
use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

/// Default pattern: the first dotted numeric run (`1.2`, `20.11.0`).
const DEFAULT_PATTERN: &str = r"\d+(?:\.\d+)+";

static DEFAULT_REGEX: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(DEFAULT_PATTERN).ok());

/// Extract a version from one line of probe output.
///
/// With a `pattern`, capture group 1 is used when the pattern has one,
/// otherwise the whole match. Without a pattern the first dotted numeric
/// run is taken. A leading `v` is dropped.
#[must_use]
pub fn extract(line: &str, pattern: Option<&str>) -> Option<String> {
    let compiled;
    let regex = match pattern {
        Some(p) => match Regex::new(p) {
            Ok(r) => {
                compiled = r;
                &compiled
            }
            Err(e) => {
                tracing::warn!(pattern = p, "invalid version pattern: {e}");
                return None;
            }
        },
        None => DEFAULT_REGEX.as_ref()?,
    };
    let caps = regex.captures(line)?;
    let matched = caps.get(1).or_else(|| caps.get(0))?.as_str().trim();
    let version = matched.strip_prefix('v').unwrap_or(matched);
    (!version.is_empty()).then(|| version.to_string())
}

/// Compare two version strings component by component.
///
/// Components are split on `.`, `-` and `+`; each compares by its leading
/// digits, with missing components counting as zero, so `1.2` equals
/// `1.2.0` and `1.10` is newer than `1.9`.
#[must_use]
pub fn compare(a: &str, b: &str) -> Ordering {
    let left = components(a);
    let right = components(b);
    let len = left.len().max(right.len());
    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

/// Return `true` if `installed` is strictly older than `latest`.
#[must_use]
pub fn is_older(installed: &str, latest: &str) -> bool {
    compare(installed, latest) == Ordering::Less
}

fn components(version: &str) -> Vec<u64> {
    let version = version.trim();
    let version = version.strip_prefix('v').unwrap_or(version);
    version
        .split(['.', '-', '+'])
        .map(|part| {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().unwrap_or(0)
        })
        .collect()
}
