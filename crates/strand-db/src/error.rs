//! Database error types.

/// Error raised by SQL clients.
///
/// [`Database`](crate::Database) never returns these to its callers; they are
/// rendered as inline messages.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// DSN scheme is not one of the supported platforms.
    #[error("unsupported DSN scheme: {0}")]
    UnsupportedDsn(String),
    /// Driver error (connect, syntax, connectivity loss).
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    /// Failed to start the blocking runtime.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Query rejected by a non-driver client.
    #[error("{0}")]
    Query(String),
}
