//! Database schema introspection for Strand.
//!
//! [`Database`] issues read-only queries through an injected [`SqlClient`]
//! and renders every result through a [`Formatter`](strand_format::Formatter).
//! Every operation returns renderable text: connection problems, SQL errors
//! and empty results become inline messages instead of errors.
//!
//! # Architecture
//!
//! - [`SqlClient`]: blocking query interface (`query`, `query_one`)
//! - [`SqlxClient`]: `sqlx` backed client for `MySQL` and `SQLite` DSNs
//! - [`Dialect`]: introspection statements per database platform
//! - [`MockSqlClient`]: in-memory client for tests (behind `mock` feature)
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use strand_db::{Database, DbConfig};
//! use strand_format::MarkdownFormatter;
//!
//! let mut db = Database::new(Arc::new(MarkdownFormatter::new()));
//! db.connect(&DbConfig::new("sqlite://app.db"));
//! println!("{}", db.describe_full_table("users", None, true, 5));
//! ```

mod client;
mod dialect;
mod error;
mod introspect;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod sqlx_client;

pub use client::{DbConfig, SqlClient};
pub use dialect::Dialect;
pub use error::DbError;
pub use introspect::{
    DEFAULT_VALUE_MAX_LENGTH, Database, SAMPLE_VALUE_MAX_LENGTH, StructureMode,
    is_valid_table_name,
};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockSqlClient, StatementLog};
pub use sqlx_client::SqlxClient;
