//! Mock SQL client for testing.
//!
//! Provides [`MockSqlClient`] for exercising introspection without a database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use strand_format::Row;

use crate::{DbError, Dialect, SqlClient};

/// Shared record of statements executed by a [`MockSqlClient`].
///
/// Clone it before handing the client to a [`Database`](crate::Database) to
/// inspect what was issued afterwards.
#[derive(Clone, Debug, Default)]
pub struct StatementLog(Arc<Mutex<Vec<String>>>);

impl StatementLog {
    /// Statements executed so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn push(&self, sql: &str) {
        self.0.lock().unwrap().push(sql.to_owned());
    }
}

/// In-memory SQL client answering canned results per statement.
///
/// Statements without a canned result return no rows.
///
/// # Example
///
/// ```ignore
/// use strand_db::{Dialect, MockSqlClient};
/// use strand_format::Row;
///
/// let client = MockSqlClient::new(Dialect::MySql)
///     .with_rows("SELECT 1", vec![Row::new().with_value("1", "1")])
///     .with_error("SELECT x", "Unknown column 'x'");
/// let log = client.log();
/// ```
#[derive(Debug)]
pub struct MockSqlClient {
    dialect: Dialect,
    results: HashMap<String, Result<Vec<Row>, String>>,
    log: StatementLog,
}

impl MockSqlClient {
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            results: HashMap::new(),
            log: StatementLog::default(),
        }
    }

    /// Answer `sql` with `rows`.
    #[must_use]
    pub fn with_rows(mut self, sql: impl Into<String>, rows: Vec<Row>) -> Self {
        self.results.insert(sql.into(), Ok(rows));
        self
    }

    /// Fail `sql` with `message`.
    #[must_use]
    pub fn with_error(mut self, sql: impl Into<String>, message: impl Into<String>) -> Self {
        self.results.insert(sql.into(), Err(message.into()));
        self
    }

    /// Handle to the executed statement log.
    #[must_use]
    pub fn log(&self) -> StatementLog {
        self.log.clone()
    }
}

impl SqlClient for MockSqlClient {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn query(&mut self, sql: &str) -> Result<Vec<Row>, DbError> {
        self.log.push(sql);
        match self.results.get(sql) {
            Some(Ok(rows)) => Ok(rows.clone()),
            Some(Err(message)) => Err(DbError::Query(message.clone())),
            None => Ok(Vec::new()),
        }
    }
}
