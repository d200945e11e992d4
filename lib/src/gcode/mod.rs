//! G-code command model, parsing, position tracking and output writing.

mod parser;
mod position;
mod writer;

pub use parser::parse_line;
pub use position::{MachineState, PositionTracker, PositionUpdate};
pub use writer::OutputWriter;

use std::fmt;

/// A command word: letter plus number, e.g. `G1` or `M104`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandWord {
    /// Upper-cased command letter.
    pub letter: char,
    /// Command number.
    pub number: u32,
}

impl CommandWord {
    /// Create a new command word.
    #[inline]
    pub fn new(letter: char, number: u32) -> Self {
        Self { letter, number }
    }
}

impl fmt::Display for CommandWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter, self.number)
    }
}

/// A parameter word: letter plus value, e.g. `X10.5`.
///
/// Flag parameters with no value carry `0.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Parameter {
    /// Upper-cased parameter letter.
    pub letter: char,
    pub value: f64,
}

/// One parsed line of G-code.
///
/// Lines that carry no command (pure comments, blank lines) have
/// `command == None`. Lines the parser could not make sense of also have no
/// command and are flagged `malformed`; the welder passes them through
/// verbatim and treats them as not-a-motion.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedCommand {
    /// The command word, if the line carries one.
    pub command: Option<CommandWord>,
    /// Parameters in source order. Letters are unique: on a duplicated
    /// letter the first occurrence wins.
    pub parameters: Vec<Parameter>,
    /// Inline comment (text after `;`), without the semicolon.
    pub comment: Option<String>,
    /// The verbatim original line, without its line ending.
    pub text: String,
    /// True when the line could not be parsed and must be treated as
    /// opaque text.
    pub malformed: bool,
}

impl ParsedCommand {
    /// A pass-through command wrapping unparseable text.
    pub fn text_only(text: &str, malformed: bool) -> Self {
        Self {
            command: None,
            parameters: Vec::new(),
            comment: None,
            text: text.to_string(),
            malformed,
        }
    }

    /// Look up a parameter value by letter.
    pub fn parameter(&self, letter: char) -> Option<f64> {
        self.parameters
            .iter()
            .find(|p| p.letter == letter)
            .map(|p| p.value)
    }

    /// Whether the parameter letter is present.
    #[inline]
    pub fn has_parameter(&self, letter: char) -> bool {
        self.parameter(letter).is_some()
    }

    /// Whether the line carries the given command word.
    #[inline]
    pub fn is(&self, letter: char, number: u32) -> bool {
        self.command == Some(CommandWord::new(letter, number))
    }

    /// `G0` or `G1`.
    #[inline]
    pub fn is_linear_move(&self) -> bool {
        self.is('G', 0) || self.is('G', 1)
    }

    /// `G2` or `G3`.
    #[inline]
    pub fn is_arc_move(&self) -> bool {
        self.is('G', 2) || self.is('G', 3)
    }

    /// Any motion command (`G0`-`G3`).
    #[inline]
    pub fn is_motion(&self) -> bool {
        self.is_linear_move() || self.is_arc_move()
    }
}
