//! Tolerant line-oriented G-code parser.
//!
//! Accepts the usual liberties found in sliced files: arbitrary whitespace
//! between words, lowercase letters, flag parameters without a value, `;`
//! comments and `*` checksums. A line the parser cannot make sense of is
//! returned as an opaque pass-through command rather than an error.

use super::{CommandWord, Parameter, ParsedCommand};

/// Parse one line of G-code (without its line ending).
pub fn parse_line(line: &str) -> ParsedCommand {
    let (body, comment) = split_comment(line);
    let body = body.trim();

    if body.is_empty() {
        return ParsedCommand {
            command: None,
            parameters: Vec::new(),
            comment,
            text: line.to_string(),
            malformed: false,
        };
    }

    let mut chars = body.chars().peekable();

    let command = match parse_command_word(&mut chars) {
        Some(word) => word,
        None => return ParsedCommand::text_only(line, true),
    };

    let mut parameters: Vec<Parameter> = Vec::new();
    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let letter = match chars.next() {
            None => break,
            // Everything after a checksum is ignored.
            Some('*') => break,
            Some(c) if c.is_ascii_alphabetic() => c.to_ascii_uppercase(),
            Some(_) => return ParsedCommand::text_only(line, true),
        };
        let value = match parse_number(&mut chars) {
            Ok(value) => value.unwrap_or(0.0),
            Err(()) => return ParsedCommand::text_only(line, true),
        };
        if !parameters.iter().any(|p| p.letter == letter) {
            parameters.push(Parameter { letter, value });
        }
    }

    ParsedCommand {
        command: Some(command),
        parameters,
        comment,
        text: line.to_string(),
        malformed: false,
    }
}

/// Split a line at the first `;`, returning the code part and the comment.
fn split_comment(line: &str) -> (&str, Option<String>) {
    match line.find(';') {
        Some(idx) => (&line[..idx], Some(line[idx + 1..].to_string())),
        None => (line, None),
    }
}

/// Parse the leading command word: a letter followed by an integer number.
///
/// A fractional sub-code (`G38.2`) is consumed but only the integer part is
/// kept; such commands are unknown to the tracker anyway.
fn parse_command_word(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Option<CommandWord> {
    let letter = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => c.to_ascii_uppercase(),
        _ => return None,
    };

    let mut digits = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            digits.push(c);
            chars.next();
        } else {
            break;
        }
    }
    if digits.is_empty() {
        return None;
    }

    if chars.peek() == Some(&'.') {
        chars.next();
        while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
            chars.next();
        }
    }

    let number = digits.parse().ok()?;
    Some(CommandWord::new(letter, number))
}

/// Parse an optional numeric value after a parameter letter.
///
/// Returns `Ok(None)` for a flag parameter with no value, `Err` when the
/// characters form no valid number.
fn parse_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<Option<f64>, ()> {
    let mut text = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() || c == '.' || c == '-' || c == '+' {
            text.push(c);
            chars.next();
        } else {
            break;
        }
    }
    if text.is_empty() {
        return Ok(None);
    }
    text.parse().map(Some).map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_move() {
        let cmd = parse_line("G1 X10.5 Y-2 E0.123 F1800");
        assert!(cmd.is('G', 1));
        assert_eq!(cmd.parameter('X'), Some(10.5));
        assert_eq!(cmd.parameter('Y'), Some(-2.0));
        assert_eq!(cmd.parameter('E'), Some(0.123));
        assert_eq!(cmd.parameter('F'), Some(1800.0));
        assert!(!cmd.malformed);
    }

    #[test]
    fn test_parse_lowercase_and_packed() {
        let cmd = parse_line("g1x10y20");
        assert!(cmd.is('G', 1));
        assert_eq!(cmd.parameter('X'), Some(10.0));
        assert_eq!(cmd.parameter('Y'), Some(20.0));
    }

    #[test]
    fn test_parse_flag_parameter() {
        let cmd = parse_line("G28 X Y");
        assert!(cmd.is('G', 28));
        assert_eq!(cmd.parameter('X'), Some(0.0));
        assert_eq!(cmd.parameter('Y'), Some(0.0));
        assert!(!cmd.has_parameter('Z'));
    }

    #[test]
    fn test_parse_comment_only() {
        let cmd = parse_line("; layer 3");
        assert!(cmd.command.is_none());
        assert_eq!(cmd.comment.as_deref(), Some(" layer 3"));
        assert!(!cmd.malformed);
    }

    #[test]
    fn test_parse_inline_comment() {
        let cmd = parse_line("G1 X5 ; outer wall");
        assert!(cmd.is('G', 1));
        assert_eq!(cmd.comment.as_deref(), Some(" outer wall"));
    }

    #[test]
    fn test_parse_empty_line() {
        let cmd = parse_line("   ");
        assert!(cmd.command.is_none());
        assert!(!cmd.malformed);
    }

    #[test]
    fn test_parse_duplicate_parameter_first_wins() {
        let cmd = parse_line("G1 X1 X2");
        assert_eq!(cmd.parameter('X'), Some(1.0));
    }

    #[test]
    fn test_parse_checksum_ignored() {
        let cmd = parse_line("G1 X5 *71");
        assert!(cmd.is('G', 1));
        assert_eq!(cmd.parameter('X'), Some(5.0));
        assert!(!cmd.has_parameter('*'));
    }

    #[test]
    fn test_parse_subcode_command() {
        let cmd = parse_line("G38.2 X10");
        assert!(cmd.is('G', 38));
        assert_eq!(cmd.parameter('X'), Some(10.0));
    }

    #[test]
    fn test_parse_garbage_is_pass_through() {
        let cmd = parse_line("{not gcode}");
        assert!(cmd.command.is_none());
        assert!(cmd.malformed);
        assert_eq!(cmd.text, "{not gcode}");
    }

    #[test]
    fn test_parse_bad_number_is_pass_through() {
        let cmd = parse_line("G1 X--5");
        assert!(cmd.command.is_none());
        assert!(cmd.malformed);
    }

    #[test]
    fn test_parse_tool_change() {
        let cmd = parse_line("T0");
        assert!(cmd.is('T', 0));
    }

    #[test]
    fn test_original_text_preserved() {
        let text = "  g1   x1.0 ; hi ";
        assert_eq!(parse_line(text).text, text);
    }
}
