//! SQL client interface.

use strand_format::Row;

use crate::{DbError, Dialect};

/// Connection settings for [`SqlxClient::connect`](crate::SqlxClient::connect).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DbConfig {
    /// Connection URL, e.g. `mysql://localhost/app` or `sqlite://app.db`.
    pub dsn: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl DbConfig {
    #[must_use]
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }
}

/// Blocking, single-connection SQL client.
///
/// Implementations own one connection that is reused for every call.
pub trait SqlClient: Send {
    /// Platform of the connected database.
    fn dialect(&self) -> Dialect;

    /// Execute `sql` and fetch all rows.
    fn query(&mut self, sql: &str) -> Result<Vec<Row>, DbError>;

    /// Execute `sql` and fetch the first row, if any.
    fn query_one(&mut self, sql: &str) -> Result<Option<Row>, DbError> {
        Ok(self.query(sql)?.into_iter().next())
    }
}
