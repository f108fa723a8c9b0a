//! Heuristic log line classification and port announcement parsing.
//!
//! Backend output is free-form text; the mapping to severity levels is a
//! best-effort heuristic, not a guarantee. Both functions here are pure so
//! they can be tested exhaustively without any I/O.

use crate::logs::LogLevel;

/// Token the backend prints exactly once at startup to announce its
/// listening port: `BACKEND_PORT:<digits>`.
const PORT_ANNOUNCEMENT_PREFIX: &str = "BACKEND_PORT:";

/// Explicit level prefixes, checked before any vocabulary matching.
/// Uvicorn and the backend's own logging both use the `level:` form.
const LEVEL_PREFIXES: [(&str, LogLevel); 5] = [
    ("debug:", LogLevel::Debug),
    ("info:", LogLevel::Info),
    ("warning:", LogLevel::Warn),
    ("warn:", LogLevel::Warn),
    ("error:", LogLevel::Error),
];

/// Substrings that force `error` when no explicit prefix matched.
const ERROR_VOCABULARY: [&str; 5] = ["error", "exception", "traceback", "critical", "fatal"];

/// Substrings that force `warn` when nothing stronger matched.
const WARN_VOCABULARY: [&str; 2] = ["warn", "deprecat"];

/// Classify a raw output line into a severity level.
///
/// Precedence: explicit level prefix, then error vocabulary, then warning
/// vocabulary, then the caller-supplied fallback (stdout lines default to
/// `info`, stderr lines to `warn`).
#[must_use]
pub fn classify(line: &str, fallback: LogLevel) -> LogLevel {
    let trimmed = line.trim_start();
    let lower = trimmed.to_ascii_lowercase();

    for (prefix, level) in LEVEL_PREFIXES {
        if lower.starts_with(prefix) {
            return level;
        }
    }
    if ERROR_VOCABULARY.iter().any(|word| lower.contains(word)) {
        return LogLevel::Error;
    }
    if WARN_VOCABULARY.iter().any(|word| lower.contains(word)) {
        return LogLevel::Warn;
    }
    fallback
}

/// Parse a port announcement line of the form `BACKEND_PORT:<digits>`.
///
/// Returns `None` for anything else, including lines that merely contain
/// the token somewhere in the middle - the backend prints it at the start
/// of its own line.
#[must_use]
pub fn parse_port_announcement(line: &str) -> Option<u16> {
    let rest = line.trim().strip_prefix(PORT_ANNOUNCEMENT_PREFIX)?;
    rest.trim().parse::<u16>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_stdout(line: &str) -> LogLevel {
        classify(line, LogLevel::Info)
    }

    fn on_stderr(line: &str) -> LogLevel {
        classify(line, LogLevel::Warn)
    }

    #[test]
    fn explicit_prefixes_win() {
        assert_eq!(on_stdout("INFO:     Application startup complete."), LogLevel::Info);
        assert_eq!(on_stdout("DEBUG: loading event list"), LogLevel::Debug);
        assert_eq!(on_stderr("info: shutting down"), LogLevel::Info);
        assert_eq!(on_stdout("WARNING: low disk"), LogLevel::Warn);
        assert_eq!(on_stdout("ERROR: something failed"), LogLevel::Error);
    }

    #[test]
    fn prefix_beats_vocabulary() {
        // "error" appears in the text but the explicit prefix decides.
        assert_eq!(on_stdout("INFO: no error detected"), LogLevel::Info);
        assert_eq!(on_stdout("debug: previous warning cleared"), LogLevel::Debug);
    }

    #[test]
    fn error_vocabulary() {
        assert_eq!(on_stdout("Traceback (most recent call last):"), LogLevel::Error);
        assert_eq!(on_stdout("unhandled exception in worker"), LogLevel::Error);
        assert_eq!(on_stderr("FATAL: out of memory"), LogLevel::Error);
        assert_eq!(on_stdout("CRITICAL failure in solver"), LogLevel::Error);
    }

    #[test]
    fn warn_vocabulary() {
        assert_eq!(on_stdout("astropy deprecation notice"), LogLevel::Warn);
        assert_eq!(on_stdout("warned about chunk size"), LogLevel::Warn);
    }

    #[test]
    fn error_beats_warn_vocabulary() {
        assert_eq!(on_stdout("previous warning caused an exception"), LogLevel::Error);
        assert_eq!(on_stderr("errors while applying deprecated filter"), LogLevel::Error);
    }

    #[test]
    fn fallback_depends_on_stream() {
        assert_eq!(on_stdout("loaded 120000 events"), LogLevel::Info);
        assert_eq!(on_stderr("loaded 120000 events"), LogLevel::Warn);
    }

    #[test]
    fn leading_whitespace_is_ignored() {
        assert_eq!(on_stdout("   ERROR: indented"), LogLevel::Error);
    }

    #[test]
    fn port_announcement_parses() {
        assert_eq!(parse_port_announcement("BACKEND_PORT:8765"), Some(8765));
        assert_eq!(parse_port_announcement("BACKEND_PORT: 9100"), Some(9100));
        assert_eq!(parse_port_announcement("  BACKEND_PORT:8765  "), Some(8765));
    }

    #[test]
    fn port_announcement_rejects_noise() {
        assert_eq!(parse_port_announcement("BACKEND_PORT:"), None);
        assert_eq!(parse_port_announcement("BACKEND_PORT:notaport"), None);
        assert_eq!(parse_port_announcement("BACKEND_PORT:99999"), None);
        assert_eq!(parse_port_announcement("listening BACKEND_PORT:8765"), None);
        assert_eq!(parse_port_announcement("starting backend"), None);
    }
}
