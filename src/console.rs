//! Status output that stays readable while the keyboard holds the terminal
//! in raw mode. Raw mode turns off output post-processing, so a bare `\n`
//! no longer returns the cursor to column 0.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

static RAW_MODE: AtomicBool = AtomicBool::new(false);

/// Record whether the terminal is currently in raw mode
pub fn set_raw_mode(raw: bool) {
    RAW_MODE.store(raw, Ordering::SeqCst);
}

pub fn is_raw_mode() -> bool {
    RAW_MODE.load(Ordering::SeqCst)
}

/// Line terminator for the current terminal mode
pub fn newline() -> &'static str {
    if is_raw_mode() {
        "\r\n"
    } else {
        "\n"
    }
}

/// Turn every bare `\n` into `\r\n` when `raw` is set. Existing `\r\n`
/// pairs are left alone.
pub fn terminate_lines(text: &str, raw: bool) -> String {
    if !raw {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + 8);
    let mut prev = '\0';
    for c in text.chars() {
        if c == '\n' && prev != '\r' {
            out.push('\r');
        }
        out.push(c);
        prev = c;
    }
    out
}

/// Write `text` plus a line break to stdout
pub fn print_line(text: &str) {
    write_line(&mut io::stdout().lock(), text);
}

/// Write `text` plus a line break to stderr
pub fn eprint_line(text: &str) {
    write_line(&mut io::stderr().lock(), text);
}

/// Write `text` as-is (no trailing break added), fixing line endings
pub fn print_raw(text: &str) {
    let mut out = io::stdout().lock();
    let _ = out.write_all(terminate_lines(text, is_raw_mode()).as_bytes());
    let _ = out.flush();
}

fn write_line(out: &mut dyn Write, text: &str) {
    let raw = is_raw_mode();
    let mut line = terminate_lines(text, raw);
    line.push_str(if raw { "\r\n" } else { "\n" });
    let _ = out.write_all(line.as_bytes());
    let _ = out.flush();
}

/// `println!` that works in raw mode
macro_rules! outln {
    ($($arg:tt)*) => {
        $crate::console::print_line(&format!($($arg)*))
    };
}

/// `eprintln!` that works in raw mode
macro_rules! errln {
    ($($arg:tt)*) => {
        $crate::console::eprint_line(&format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooked_text_untouched() {
        assert_eq!(terminate_lines("a\nb\n", false), "a\nb\n");
    }

    #[test]
    fn test_raw_adds_carriage_returns() {
        assert_eq!(terminate_lines("a\nb\n", true), "a\r\nb\r\n");
        assert_eq!(terminate_lines("\nExiting...", true), "\r\nExiting...");
    }

    #[test]
    fn test_raw_keeps_existing_crlf() {
        assert_eq!(terminate_lines("Distance: 7\r\nok\n", true), "Distance: 7\r\nok\r\n");
        assert_eq!(terminate_lines("no break", true), "no break");
    }

    #[test]
    fn test_line_ends_in_raw_mode() {
        let mut buf = Vec::new();
        set_raw_mode(true);
        assert_eq!(newline(), "\r\n");
        write_line(&mut buf, "✓ Opened\nnext");
        set_raw_mode(false);
        assert_eq!(newline(), "\n");
        write_line(&mut buf, "closed");
        assert_eq!(String::from_utf8(buf).unwrap(), "✓ Opened\r\nnext\r\nclosed\n");
    }
}
