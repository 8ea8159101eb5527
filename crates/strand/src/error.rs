//! CLI error types.

use strand_config::ConfigError;
use strand_engine::PathError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Path(#[from] PathError),

    #[error("{0}")]
    Validation(String),
}
