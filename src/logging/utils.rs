//! Path resolution, ANSI stripping, terminal width and time formatting.
use std::fs;
use std::path::PathBuf;

/// Strip ANSI escape sequences from a string.
///
/// Handles SGR sequences (ending in `m`) and other CSI sequences (ending
/// in any letter in the `@`..`~` range). Installer output is full of
/// progress bars and colors, and none of it belongs in the log file.
pub(super) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            if let Some(next) = chars.next()
                && next == '['
            {
                for inner in chars.by_ref() {
                    if ('@'..='~').contains(&inner) {
                        break;
                    }
                }
            }
        } else if c != '\r' {
            out.push(c);
        }
    }
    out
}

/// Return the terminal width in columns.
///
/// `COLUMNS` wins when set, then the size of the attached terminal, then 80.
pub(super) fn terminal_columns() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .or_else(|| terminal_size::terminal_size().map(|(w, _)| usize::from(w.0)))
        .unwrap_or(80)
}

/// Shorten `line` to at most `width` characters, marking the cut with `…`.
pub(super) fn truncate(line: &str, width: usize) -> String {
    if line.chars().count() <= width {
        return line.to_string();
    }
    let kept: String = line.chars().take(width.saturating_sub(1)).collect();
    format!("{kept}…")
}

/// Return the `$XDG_CACHE_HOME/maziq/` directory, creating it if needed.
pub(super) fn cache_dir() -> Option<PathBuf> {
    let cache_home = std::env::var("XDG_CACHE_HOME").map_or_else(
        |_| {
            std::env::var("HOME")
                .map_or_else(|_| PathBuf::from("."), PathBuf::from)
                .join(".cache")
        },
        PathBuf::from,
    );
    let dir = cache_home.join("maziq");
    fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

/// Return the log file path for `command` under the cache directory.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    Some(cache_dir()?.join(format!("{command}.log")))
}

/// Format the current UTC time as `YYYY-MM-DD HH:MM:SS`.
pub(super) fn format_utc_datetime() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Format the current UTC time as `HH:MM:SS`.
pub(super) fn format_utc_time() -> String {
    chrono::Utc::now().format("%H:%M:%S").to_string()
}
