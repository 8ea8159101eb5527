//! Introspection statements per database platform.
//!
//! Table names are interpolated verbatim (quoted as identifiers). Callers must
//! validate them with [`is_valid_table_name`](crate::is_valid_table_name)
//! first since identifiers cannot be bound as query arguments.

use crate::DbError;

/// Database platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Sqlite,
}

impl Dialect {
    /// Column holding the creation statement in [`show_create_table`](Self::show_create_table) results.
    pub const CREATE_TABLE_COLUMN: &'static str = "Create Table";

    /// Detect the platform from a DSN scheme.
    ///
    /// # Example
    ///
    /// ```
    /// use strand_db::Dialect;
    ///
    /// assert_eq!(Dialect::from_dsn("mysql://localhost/app").unwrap(), Dialect::MySql);
    /// assert_eq!(Dialect::from_dsn("sqlite::memory:").unwrap(), Dialect::Sqlite);
    /// assert!(Dialect::from_dsn("oracle://db").is_err());
    /// ```
    pub fn from_dsn(dsn: &str) -> Result<Self, DbError> {
        let scheme = dsn.split(':').next().unwrap_or_default();
        match scheme.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(DbError::UnsupportedDsn(scheme.to_owned())),
        }
    }

    fn quote(self, name: &str) -> String {
        match self {
            Self::MySql => format!("`{name}`"),
            Self::Sqlite => format!("\"{name}\""),
        }
    }

    /// Statement returning the table's creation SQL in [`Self::CREATE_TABLE_COLUMN`].
    pub fn show_create_table(self, name: &str) -> String {
        match self {
            Self::MySql => format!("SHOW CREATE TABLE {}", self.quote(name)),
            Self::Sqlite => format!(
                "SELECT sql AS \"{}\" FROM sqlite_master WHERE type = 'table' AND name = '{name}'",
                Self::CREATE_TABLE_COLUMN
            ),
        }
    }

    pub fn describe_columns(self, name: &str) -> String {
        match self {
            Self::MySql => format!("DESCRIBE {}", self.quote(name)),
            Self::Sqlite => format!("PRAGMA table_info({})", self.quote(name)),
        }
    }

    pub fn list_indexes(self, name: &str) -> String {
        match self {
            Self::MySql => format!("SHOW INDEXES FROM {}", self.quote(name)),
            Self::Sqlite => format!("PRAGMA index_list({})", self.quote(name)),
        }
    }

    pub fn select_sample(self, name: &str, count: usize) -> String {
        format!("SELECT * FROM {} LIMIT {count}", self.quote(name))
    }
}
