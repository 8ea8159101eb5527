//! Markdown formatter.

use std::sync::LazyLock;

use regex::Regex;

use crate::{Formatter, Row};

/// Characters escaped anywhere in the text.
///
/// `-` and `+` are only significant as list markers, see [`LIST_MARKER_RE`].
const SPECIAL_CHARS: &[char] = &[
    '\\', '#', '*', '`', '[', ']', '(', ')', '!', '&', '<', '>', '_', '{', '}', '|',
];

/// Dash or plus at the start of a line, after optional indentation.
static LIST_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(\s*)([-+])").expect("valid list marker regex"));

/// Replacement for line breaks inside table cells.
const LINE_BREAK: &str = "<br>";

/// [`Formatter`] producing `CommonMark` text and GFM pipe tables.
///
/// # Example
///
/// ```
/// use strand_format::{Formatter, MarkdownFormatter};
///
/// let md = MarkdownFormatter::new();
/// assert_eq!(md.escape("# A-B"), r"\# A-B");
/// assert_eq!(md.escape("- item"), r"\- item");
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct MarkdownFormatter;

impl MarkdownFormatter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Formatter for MarkdownFormatter {
    fn escape(&self, text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            if SPECIAL_CHARS.contains(&c) {
                escaped.push('\\');
            }
            escaped.push(c);
        }

        LIST_MARKER_RE
            .replace_all(&escaped, r"${1}\${2}")
            .into_owned()
    }

    fn table(&self, rows: &[Row], value_max_length: usize) -> String {
        let Some(first) = rows.first() else {
            return String::new();
        };
        let headers: Vec<&str> = first.columns().collect();

        let mut table = String::new();
        push_table_line(
            &mut table,
            headers.iter().map(|h| single_line(&self.escape(h))),
        );
        push_table_line(&mut table, headers.iter().map(|_| "---".to_owned()));

        for row in rows {
            // Cells are looked up by header so ragged rows stay aligned.
            let cells = headers
                .iter()
                .map(|h| single_line(&self.sanitize(row.get(h).flatten(), Some(value_max_length))));
            push_table_line(&mut table, cells);
        }

        table
    }
}

/// Keep a cell on one table line.
fn single_line(cell: &str) -> String {
    cell.replace("\r\n", LINE_BREAK)
        .replace(['\n', '\r'], LINE_BREAK)
}

/// Append `| a | b |\n`.
fn push_table_line(out: &mut String, cells: impl Iterator<Item = String>) {
    out.push_str("| ");
    out.push_str(&cells.collect::<Vec<_>>().join(" | "));
    out.push_str(" |\n");
}
