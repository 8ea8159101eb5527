//! Schema introspection rendered as Markdown.

use std::fmt::{self, Write as _};
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use strand_format::Formatter;

use crate::{DbConfig, Dialect, SqlClient, SqlxClient};

/// Default cell length bound for [`Database::query`].
pub const DEFAULT_VALUE_MAX_LENGTH: usize = 1000;

/// Cell length bound for sample records in [`Database::describe_full_table`].
pub const SAMPLE_VALUE_MAX_LENGTH: usize = 60;

const NOT_CONNECTED: &str = "Database connection is not set. Use connect.\n";

static TABLE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid table name regex"));

/// Check that `name` is safe to interpolate as a table identifier.
///
/// # Example
///
/// ```
/// use strand_db::is_valid_table_name;
///
/// assert!(is_valid_table_name("order_items2"));
/// assert!(!is_valid_table_name("users; DROP TABLE x"));
/// assert!(!is_valid_table_name(""));
/// ```
pub fn is_valid_table_name(name: &str) -> bool {
    TABLE_NAME_RE.is_match(name)
}

/// Structure section rendered by [`Database::describe_full_table`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StructureMode {
    /// Creation statement in a fenced SQL block.
    Create,
    /// Column description table.
    Describe,
}

impl FromStr for StructureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "describe" => Ok(Self::Describe),
            other => Err(format!(
                "unknown structure mode '{other}' (expected 'create' or 'describe')"
            )),
        }
    }
}

/// Database introspection over a single shared connection.
///
/// All operations return Markdown text. Failures are rendered inline.
pub struct Database {
    client: Option<Box<dyn SqlClient>>,
    formatter: Arc<dyn Formatter>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("connected", &self.is_connected())
            .field("formatter", &self.formatter)
            .finish()
    }
}

impl Database {
    /// Create an unconnected database.
    #[must_use]
    pub fn new(formatter: Arc<dyn Formatter>) -> Self {
        Self {
            client: None,
            formatter,
        }
    }

    /// Use an already connected client.
    #[must_use]
    pub fn with_client(mut self, client: impl SqlClient + 'static) -> Self {
        self.client = Some(Box::new(client));
        self
    }

    /// Connect using `config`.
    ///
    /// Failures are logged and leave the database unconnected, so later
    /// operations report a missing connection instead of failing.
    pub fn connect(&mut self, config: &DbConfig) {
        match SqlxClient::connect(config) {
            Ok(client) => self.client = Some(Box::new(client)),
            Err(e) => {
                tracing::warn!("Database connection error: {e}");
                self.client = None;
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Execute `sql` and render all rows as a table.
    pub fn query(&mut self, sql: &str, value_max_length: usize) -> String {
        let Some(client) = self.client.as_mut() else {
            return NOT_CONNECTED.to_owned();
        };

        match client.query(sql) {
            Ok(rows) if rows.is_empty() => format!("No results found for query: `{sql}`\n"),
            Ok(rows) => self.formatter.table(&rows, value_max_length),
            Err(e) => {
                tracing::warn!(sql, "query failed: {e}");
                format!("SQL query error: {e}\n")
            }
        }
    }

    /// Render the table's creation statement in a fenced SQL block.
    pub fn show_create_table(&mut self, name: &str) -> String {
        if let Err(message) = self.validate_table_name(name) {
            return message;
        }
        let Some(client) = self.client.as_mut() else {
            return NOT_CONNECTED.to_owned();
        };

        let sql = client.dialect().show_create_table(name);
        match client.query_one(&sql) {
            Ok(Some(row)) => match row.get(Dialect::CREATE_TABLE_COLUMN).flatten() {
                Some(statement) => format!("```sql\n{statement}\n```\n"),
                None => format!("No results found for table: `{name}`.\n"),
            },
            Ok(None) => format!("No results found for table: `{name}`.\n"),
            Err(e) => format!("SQL query error (SHOW CREATE TABLE): {e}\n"),
        }
    }

    /// Render the table's column description.
    pub fn describe_columns(&mut self, name: &str) -> String {
        self.table_query(name, Dialect::describe_columns)
    }

    /// Render the table's indexes.
    pub fn list_indexes(&mut self, name: &str) -> String {
        self.table_query(name, Dialect::list_indexes)
    }

    /// Render a complete Markdown section for a table.
    ///
    /// The section has an H2 heading followed by the optional structure
    /// (`mode`), indexes, and the first `sample_count` records.
    /// `name` is validated before any SQL is issued.
    pub fn describe_full_table(
        &mut self,
        name: &str,
        mode: Option<StructureMode>,
        with_indexes: bool,
        sample_count: usize,
    ) -> String {
        if let Err(message) = self.validate_table_name(name) {
            return message;
        }
        let Some(dialect) = self.client.as_ref().map(|c| c.dialect()) else {
            return NOT_CONNECTED.to_owned();
        };

        let mut output = format!("## Table: `{name}`\n\n");

        match mode {
            Some(StructureMode::Create) => {
                output.push_str("### Create Table SQL\n");
                output.push_str(&self.show_create_table(name));
                output.push('\n');
            }
            Some(StructureMode::Describe) => {
                output.push_str("### Table Structure\n");
                output.push_str(&self.describe_columns(name));
                output.push('\n');
            }
            None => {}
        }

        if with_indexes {
            output.push_str("### Indexes\n");
            output.push_str(&self.list_indexes(name));
            output.push('\n');
        }

        if sample_count > 0 {
            let _ = writeln!(output, "### First {sample_count} Records");
            let sql = dialect.select_sample(name, sample_count);
            output.push_str(&self.query(&sql, SAMPLE_VALUE_MAX_LENGTH));
            output.push('\n');
        }

        output
    }

    fn table_query(&mut self, name: &str, statement: fn(Dialect, &str) -> String) -> String {
        if let Err(message) = self.validate_table_name(name) {
            return message;
        }
        let Some(dialect) = self.client.as_ref().map(|c| c.dialect()) else {
            return NOT_CONNECTED.to_owned();
        };
        self.query(&statement(dialect, name), DEFAULT_VALUE_MAX_LENGTH)
    }

    fn validate_table_name(&self, name: &str) -> Result<(), String> {
        if is_valid_table_name(name) {
            return Ok(());
        }
        tracing::warn!(name, "rejected table name");
        Err(format!(
            "Invalid table name: {}. Only letters, digits and underscores are allowed.\n",
            self.formatter.sanitize(Some(name), Some(64))
        ))
    }
}
