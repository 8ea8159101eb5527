//! Text escaping, truncation and table rendering for Strand.
//!
//! This crate provides the [`Formatter`] trait that decouples the template
//! engine and database introspection from the target output format. Two
//! operations are format-specific:
//!
//! - [`Formatter::escape`]: escape characters significant in the format
//! - [`Formatter::table`]: serialize query [`Row`]s to a table
//!
//! [`Formatter::limit`] and [`Formatter::sanitize`] are provided on top of them.
//!
//! # Implementations
//!
//! - [`MarkdownFormatter`]: `CommonMark` escaping and pipe tables
//!
//! # Example
//!
//! ```
//! use strand_format::{Formatter, MarkdownFormatter, Row};
//!
//! let md = MarkdownFormatter::new();
//! assert_eq!(md.sanitize(Some("a_b"), None), r"a\_b");
//! assert_eq!(md.sanitize(None, None), "NULL");
//!
//! let rows = vec![Row::new().with_value("id", "1")];
//! assert_eq!(md.table(&rows, 1000), "| id |\n| --- |\n| 1 |\n");
//! ```

mod markdown;
mod row;

use std::fmt;

pub use markdown::MarkdownFormatter;
pub use row::Row;

/// Placeholder rendered for SQL `NULL` values.
pub const NULL_PLACEHOLDER: &str = "NULL";

/// Suffix appended to truncated text.
pub const DEFAULT_SUFFIX: &str = "...";

/// Output format capability.
///
/// Implementors only provide escaping and table serialization. Truncation and
/// sanitization are shared across formats.
pub trait Formatter: Send + Sync + fmt::Debug {
    /// Escape characters that are significant in the target format.
    fn escape(&self, text: &str) -> String;

    /// Serialize rows to a table.
    ///
    /// Column order follows the first row. Every cell goes through
    /// [`sanitize`](Self::sanitize) with `value_max_length` as the bound.
    /// Callers must guard against an empty slice; implementations return an
    /// empty string for it.
    fn table(&self, rows: &[Row], value_max_length: usize) -> String;

    /// Truncate `text` to `max_length` characters and append `suffix`.
    ///
    /// A `max_length` of zero disables truncation.
    fn limit(&self, text: &str, max_length: usize, suffix: &str) -> String {
        limit(text, max_length, suffix)
    }

    /// Truncate, then escape. `None` becomes [`NULL_PLACEHOLDER`], never truncated.
    ///
    /// Escaping runs last so truncation never cuts an escape sequence in half.
    fn sanitize(&self, text: Option<&str>, max_length: Option<usize>) -> String {
        let Some(text) = text else {
            return self.escape(NULL_PLACEHOLDER);
        };
        match max_length {
            Some(max) => self.escape(&self.limit(text, max, DEFAULT_SUFFIX)),
            None => self.escape(text),
        }
    }
}

/// Truncate by character count, never splitting a multi-byte character.
///
/// # Example
///
/// ```
/// use strand_format::limit;
///
/// assert_eq!(limit("zażółć", 3, "..."), "zaż...");
/// assert_eq!(limit("short", 10, "..."), "short");
/// assert_eq!(limit("unbounded", 0, "..."), "unbounded");
/// ```
pub fn limit(text: &str, max_length: usize, suffix: &str) -> String {
    if max_length == 0 {
        return text.to_owned();
    }
    match text.char_indices().nth(max_length) {
        Some((cut, _)) => format!("{}{suffix}", &text[..cut]),
        None => text.to_owned(),
    }
}
