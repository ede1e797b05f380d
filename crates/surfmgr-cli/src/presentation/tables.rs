//! Table formatting utilities for CLI output.

use surfmgr_core::Session;

/// Truncates a string to a maximum length in characters, adding "..." if needed.
///
/// # Examples
///
/// ```rust
/// use surfmgr_cli::presentation::truncate_string;
///
/// assert_eq!(truncate_string("Hello", 10), "Hello");
/// assert_eq!(truncate_string("Hello World", 8), "Hello...");
/// ```
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Print a horizontal separator line.
pub fn print_separator(width: usize) {
    println!("{}", "-".repeat(width));
}

/// Short marker column for a session: `*` active, `A` automatic.
pub fn format_session_flags(session: &Session) -> String {
    let mut flags = String::new();
    if session.is_active {
        flags.push('*');
    }
    if session.is_auto {
        flags.push('A');
    }
    flags
}

#[cfg(test)]
mod tests {
    use chrono::Local;

    use super::*;

    #[test]
    fn test_truncate_string_exact_length() {
        assert_eq!(truncate_string("exactly10c", 10), "exactly10c");
    }

    #[test]
    fn test_truncate_string_counts_characters() {
        assert_eq!(truncate_string("sesión-de-trabajo", 9), "sesión...");
    }

    #[test]
    fn test_session_flags() {
        let mut session = Session {
            name: "auto-20240101_000000".into(),
            app: "cursor".into(),
            size: 0,
            modified: Local::now(),
            is_active: true,
            is_auto: true,
        };
        assert_eq!(format_session_flags(&session), "*A");
        session.is_active = false;
        session.is_auto = false;
        assert_eq!(format_session_flags(&session), "");
    }
}
