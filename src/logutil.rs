//! Helpers that keep player-supplied text on a single log line.
//!
//! Player ids, dragon names and raw chat input all reach the log; anything that
//! could split a line or flood the file is escaped and truncated here first.

use std::fmt::Write;

/// Default preview length for [`escape_log`].
pub const MAX_PREVIEW: usize = 300;

/// Escape control characters and truncate to [`MAX_PREVIEW`] characters.
pub fn escape_log(s: &str) -> String {
    escape_log_with(s, MAX_PREVIEW)
}

/// Escape `s` for single-line logging, keeping at most `max_chars` characters.
///
/// Newlines, carriage returns, tabs and backslashes get their usual escapes;
/// any other control character becomes `\xNN`. Truncated output ends with `…`.
pub fn escape_log_with(s: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(s.len().min(max_chars) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= max_chars {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Short tag for the player behind a request, e.g. `ann ("Ann Lee")`.
pub fn actor_tag(id: &str, display_name: &str) -> String {
    if id == display_name {
        escape_log_with(id, 64)
    } else {
        format!(
            "{} (\"{}\")",
            escape_log_with(id, 64),
            escape_log_with(display_name, 64)
        )
    }
}
