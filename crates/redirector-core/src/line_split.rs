use serde::{Deserialize, Serialize};

/// Terminators recognised when splitting a document into lines.
pub const DEFAULT_LINE_SEPARATORS: [&str; 2] = ["\r\n", "\n"];

/// Terminator written between lines when a document is reassembled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    Crlf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }
}

/// Split `text` into lines at any of `separators`.
///
/// Separators are tried longest first, so `"\r\n"` is never split into `"\r"`
/// and `"\n"`. The tail after the last separator is always the final line,
/// which means empty input yields a single empty line and a trailing newline
/// yields a trailing empty line. With `keep_separators` each line keeps the
/// terminator that closed it.
pub fn split_lines(text: &str, separators: &[&str], keep_separators: bool) -> Vec<String> {
    let mut seps: Vec<&str> = separators.iter().copied().filter(|s| !s.is_empty()).collect();
    seps.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut lines = Vec::new();
    let mut line_start = 0;
    let mut cursor = 0;

    while cursor < text.len() {
        let rest = &text[cursor..];
        match seps.iter().find(|sep| rest.starts_with(**sep)) {
            Some(sep) => {
                let line_end = if keep_separators { cursor + sep.len() } else { cursor };
                lines.push(text[line_start..line_end].to_string());
                cursor += sep.len();
                line_start = cursor;
            }
            None => {
                // Step a whole character so the cursor stays on a char boundary
                cursor += rest.chars().next().map_or(1, char::len_utf8);
            }
        }
    }

    lines.push(text[line_start..].to_string());
    lines
}

/// Join `lines` with `separator` between them (not after the last).
pub fn join_lines(lines: &[String], separator: &str) -> String {
    lines.join(separator)
}
