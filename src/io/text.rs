//! Line and token helpers for text formats

use crate::error::{Error, Result};

/// Call `on_line` for every non-empty, trimmed line of `text`
///
/// Lines are separated by `\n`; a trailing `\r` is removed by the trim.
pub fn read_lines<'a>(text: &'a str, mut on_line: impl FnMut(&'a str)) {
    for line in text.split('\n') {
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            on_line(trimmed);
        }
    }
}

/// Split a line into whitespace separated parameters
///
/// Everything from `comment_char` onwards is dropped first.
pub fn parameters_from_line(line: &str, comment_char: Option<char>) -> Vec<&str> {
    let content = match comment_char.and_then(|c| line.find(c)) {
        Some(index) => &line[..index],
        None => line,
    };
    content.split_whitespace().collect()
}

/// The rest of `line` after byte offset `start`, without comment and surrounding whitespace
///
/// Used for keywords whose argument may contain spaces (`g`, `newmtl`, `solid`).
pub fn name_from_line(line: &str, start: usize, comment_char: char) -> &str {
    let name = line.get(start..).unwrap_or("");
    let name = match name.find(comment_char) {
        Some(index) => &name[..index],
        None => name,
    };
    name.trim()
}

/// Parse a float token, naming `field` in the error
pub fn parse_number(token: &str, field: &str) -> Result<f64> {
    token
        .parse::<f64>()
        .map_err(|_| Error::parse_error_with_context(field, token, "floating-point number"))
}

/// Parse an integer token, naming `field` in the error
pub fn parse_integer(token: &str, field: &str) -> Result<i64> {
    token
        .parse::<i64>()
        .map_err(|_| Error::parse_error_with_context(field, token, "integer"))
}
