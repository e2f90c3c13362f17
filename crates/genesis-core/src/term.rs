//! Terminal utilities for colored output and formatting.

use colored::*;
use std::io::{self, IsTerminal};

/// Check if we're running in a controlling terminal.
pub fn in_controlling_terminal() -> bool {
    io::stdin().is_terminal() && io::stdout().is_terminal()
}

/// Format a string with Genesis color codes.
///
/// Supports codes like #R{text}, #G{text}, #Y{text}, #B{text}, #M{text},
/// #C{text}, #W{text}, #K{text}
pub fn colorize(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find('#') {
        let tail = &rest[start..];
        let code = tail.chars().nth(1);
        let is_code = matches!(code, Some('R' | 'G' | 'Y' | 'B' | 'M' | 'C' | 'W' | 'K'))
            && tail.chars().nth(2) == Some('{');

        if !is_code {
            result.push_str(&rest[..start + 1]);
            rest = &rest[start + 1..];
            continue;
        }

        result.push_str(&rest[..start]);
        let body_start = start + 3;
        let Some(close) = rest[body_start..].find('}') else {
            result.push_str(&rest[start..]);
            return result;
        };
        let text = &rest[body_start..body_start + close];

        let painted = match code.unwrap() {
            'R' => text.red().to_string(),
            'G' => text.green().to_string(),
            'Y' => text.yellow().to_string(),
            'B' => text.blue().to_string(),
            'M' => text.magenta().to_string(),
            'C' => text.cyan().to_string(),
            'W' => text.white().to_string(),
            'K' => text.black().to_string(),
            _ => text.to_string(),
        };
        result.push_str(&painted);
        rest = &rest[body_start + close + 1..];
    }

    result.push_str(rest);
    result
}

/// Glyph for a validation check status line.
pub fn status_glyph(ok: bool) -> String {
    if ok {
        "✔".green().to_string()
    } else {
        "✘".red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colorize_leaves_plain_text_alone() {
        colored::control::set_override(false);
        assert_eq!(colorize("no codes here"), "no codes here");
        assert_eq!(colorize("50% #done"), "50% #done");
        colored::control::unset_override();
    }

    #[test]
    fn test_colorize_strips_codes_when_disabled() {
        colored::control::set_override(false);
        assert_eq!(colorize("#G{ok} and #R{bad}"), "ok and bad");
        colored::control::unset_override();
    }

    #[test]
    fn test_status_glyph_strips_to_symbol() {
        colored::control::set_override(false);
        assert_eq!(status_glyph(true), "✔");
        assert_eq!(status_glyph(false), "✘");
        colored::control::unset_override();
    }
}
