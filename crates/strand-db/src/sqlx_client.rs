//! `sqlx` backed [`SqlClient`].
//!
//! Holds a native `MySQL` or `SQLite` connection chosen by the DSN scheme.
//! Cells are read as text without type checks, so any column type renders.
//! Async calls are driven to completion on a current-thread tokio runtime
//! owned by the client, keeping the public interface blocking.

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use sqlx::{
    Column, Connection as _, Decode, MySqlConnection, SqliteConnection, TypeInfo, ValueRef,
};
use strand_format::Row;
use tokio::runtime::Runtime;

use crate::{DbConfig, DbError, Dialect, SqlClient};

enum Connection {
    MySql(MySqlConnection),
    Sqlite(SqliteConnection),
}

/// Single database connection.
pub struct SqlxClient {
    runtime: Runtime,
    conn: Connection,
}

impl SqlxClient {
    /// Open a connection described by `config`.
    ///
    /// `user` and `password` are merged into the DSN unless it already
    /// carries credentials.
    pub fn connect(config: &DbConfig) -> Result<Self, DbError> {
        let dialect = Dialect::from_dsn(&config.dsn)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let conn = match dialect {
            Dialect::MySql => {
                let url = dsn_with_credentials(
                    &config.dsn,
                    config.user.as_deref(),
                    config.password.as_deref(),
                );
                Connection::MySql(runtime.block_on(MySqlConnection::connect(&url))?)
            }
            Dialect::Sqlite => {
                Connection::Sqlite(runtime.block_on(SqliteConnection::connect(&config.dsn))?)
            }
        };
        tracing::debug!(?dialect, "database connected");

        Ok(Self { runtime, conn })
    }
}

impl SqlClient for SqlxClient {
    fn dialect(&self) -> Dialect {
        match self.conn {
            Connection::MySql(_) => Dialect::MySql,
            Connection::Sqlite(_) => Dialect::Sqlite,
        }
    }

    fn query(&mut self, sql: &str) -> Result<Vec<Row>, DbError> {
        tracing::debug!(sql, "executing query");
        // Unprepared execution: MySQL rejects some SHOW statements as prepared statements.
        let query = sqlx::raw_sql(sql);
        let rows = match &mut self.conn {
            Connection::MySql(conn) => {
                let rows = self.runtime.block_on(query.fetch_all(conn))?;
                rows.iter().map(convert_row).collect()
            }
            Connection::Sqlite(conn) => {
                let rows = self.runtime.block_on(query.fetch_all(conn))?;
                rows.iter().map(convert_row).collect()
            }
        };
        Ok(rows)
    }
}

fn convert_row<R>(row: &R) -> Row
where
    R: sqlx::Row,
    usize: sqlx::ColumnIndex<R>,
    for<'r> String: Decode<'r, R::Database>,
    for<'r> i64: Decode<'r, R::Database>,
    for<'r> f64: Decode<'r, R::Database>,
    for<'r> Vec<u8>: Decode<'r, R::Database>,
{
    row.columns()
        .iter()
        .map(|column| {
            let value = decode_value(row, column.ordinal());
            (column.name().to_owned(), value)
        })
        .collect()
}

/// Decode a cell to text, `None` for SQL `NULL`.
///
/// Text comes first: the `MySQL` text protocol and `SQLite` both yield a
/// textual form for dates, decimals, booleans and numbers.
fn decode_value<R>(row: &R, index: usize) -> Option<String>
where
    R: sqlx::Row,
    usize: sqlx::ColumnIndex<R>,
    for<'r> String: Decode<'r, R::Database>,
    for<'r> i64: Decode<'r, R::Database>,
    for<'r> f64: Decode<'r, R::Database>,
    for<'r> Vec<u8>: Decode<'r, R::Database>,
{
    if row.try_get_raw(index).is_ok_and(|value| value.is_null()) {
        return None;
    }
    if let Ok(v) = row.try_get_unchecked::<String, _>(index) {
        return Some(v);
    }
    if let Ok(v) = row.try_get_unchecked::<i64, _>(index) {
        return Some(v.to_string());
    }
    if let Ok(v) = row.try_get_unchecked::<f64, _>(index) {
        return Some(v.to_string());
    }
    if let Ok(v) = row.try_get_unchecked::<Vec<u8>, _>(index) {
        return Some(String::from_utf8_lossy(&v).into_owned());
    }

    let type_name = row.columns()[index].type_info().name().to_owned();
    tracing::debug!(index, type_name, "undecodable column value");
    Some(format!("<{type_name}>"))
}

/// Insert percent-encoded `user:password@` into a URL-style DSN.
fn dsn_with_credentials(dsn: &str, user: Option<&str>, password: Option<&str>) -> String {
    let Some(user) = user.filter(|u| !u.is_empty()) else {
        return dsn.to_owned();
    };
    let Some((scheme, rest)) = dsn.split_once("://") else {
        return dsn.to_owned();
    };
    let authority = rest.split('/').next().unwrap_or_default();
    if authority.contains('@') {
        return dsn.to_owned();
    }

    let mut userinfo = utf8_percent_encode(user, NON_ALPHANUMERIC).to_string();
    if let Some(password) = password.filter(|p| !p.is_empty()) {
        userinfo.push(':');
        userinfo.push_str(&utf8_percent_encode(password, NON_ALPHANUMERIC).to_string());
    }
    format!("{scheme}://{userinfo}@{rest}")
}
