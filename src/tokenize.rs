//! Splitting a command line into pipeline stages and argument vectors.
//!
//! Only single-character delimiters are recognised. There is no quoting or
//! escaping: `|` always separates stages and a plain space always separates
//! arguments. Tabs are ordinary argument characters.

/// Ordered arguments of one stage. The first element, if any, names the program.
///
/// The vector carries its own length; the NULL sentinel expected by `execvp`
/// is appended only when the vector is handed to the OS.
pub type ArgVector = Vec<String>;

pub const PIPE_DELIM: char = '|';
pub const ARG_DELIM: char = ' ';

/// Split `text` on `delim`, skipping runs of delimiters so no token is empty.
///
/// Returns `None` only when there is no text at all; text made up solely of
/// delimiters yields an empty sequence.
pub fn tokenize(text: Option<&str>, delim: char) -> Option<Vec<String>> {
    let text = text?;
    Some(text.split(delim).filter(|tok| !tok.is_empty()).map(str::to_owned).collect())
}

/// Stage strings of a command line, untrimmed. One element means no pipe was present.
pub fn split_pipeline(line: &str) -> Vec<String> {
    tokenize(Some(line), PIPE_DELIM).unwrap_or_default()
}

pub fn parse_args(stage: &str) -> ArgVector {
    tokenize(Some(stage), ARG_DELIM).unwrap_or_default()
}
