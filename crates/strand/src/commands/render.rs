//! `strand <INPUT>` implementation.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use strand_config::{CliSettings, Config};
use strand_db::{Database, DbConfig};
use strand_engine::{Engine, PathContext, TemplateContext};
use strand_format::{Formatter, MarkdownFormatter};

use crate::error::CliError;
use crate::output::Output;

/// Shown when a configured database cannot be reached. Database sections then
/// render the "not set" notice inline.
const DB_UNAVAILABLE_WARNING: &str =
    "Warning: database connection failed, database sections will report \"Database connection is not set\"";

/// Arguments for rendering a template.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Template to render (e.g. `docs/README.md.tpl`).
    input: PathBuf,

    /// Project root for `file` and `dir` (default: input file directory).
    #[arg(long, visible_alias = "project-root", value_name = "DIR")]
    cwd: Option<PathBuf>,

    /// Doc root for `import` (default: input file directory).
    #[arg(long, value_name = "DIR")]
    doc_root: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover strand.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database DSN (overrides config).
    #[arg(long, env = "STRAND_DSN")]
    dsn: Option<String>,

    /// Database user (overrides config).
    #[arg(long, env = "STRAND_DB_USER")]
    db_user: Option<String>,

    /// Database password (overrides config).
    #[arg(long, env = "STRAND_DB_PASSWORD", hide_env_values = true)]
    db_password: Option<String>,

    /// Enable debug logging.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl RenderArgs {
    /// Render the input template to stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if the input or a root is invalid, or the config
    /// cannot be loaded.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let input = resolve_input(&self.input)?;
        let input_dir = input.parent().unwrap_or(Path::new("/"));

        let cli_settings = CliSettings {
            project_root: self.cwd.as_deref().map(require_dir).transpose()?,
            doc_root: self.doc_root.as_deref().map(require_dir).transpose()?,
            dsn: self.dsn,
            db_user: self.db_user,
            db_password: self.db_password,
        };
        let config = Config::load(self.config.as_deref(), input_dir, Some(&cli_settings))?;
        if let Some(path) = &config.config_path {
            tracing::debug!(path = %path.display(), "loaded config");
        }

        let paths = PathContext::new(
            config
                .paths_resolved
                .project_root
                .as_deref()
                .unwrap_or(input_dir),
            config.paths_resolved.doc_root.as_deref().unwrap_or(input_dir),
        )?;

        let formatter: Arc<dyn Formatter> = Arc::new(MarkdownFormatter::new());
        let mut database = Database::new(Arc::clone(&formatter));
        if let Some(db_config) = db_config(&config) {
            database.connect(&db_config);
            if !database.is_connected() {
                output.warning(DB_UNAVAILABLE_WARNING);
            }
        }

        let engine = Engine::builder(paths)
            .formatter(formatter)
            .database(database)
            .max_import_depth(config.render.max_import_depth)
            .build();

        let document = engine.import(&input.to_string_lossy(), TemplateContext::new());

        let mut stdout = std::io::stdout().lock();
        stdout.write_all(document.as_bytes())?;
        stdout.flush()?;

        Ok(())
    }
}

/// Make `input` absolute and require an existing file.
fn resolve_input(input: &Path) -> Result<PathBuf, CliError> {
    if input.as_os_str().is_empty() {
        return Err(CliError::Validation("No input file given".to_owned()));
    }
    let input = std::path::absolute(input)?;
    if !input.is_file() {
        return Err(CliError::Validation(format!(
            "Input file not found: {}",
            input.display()
        )));
    }
    Ok(input)
}

/// Make `dir` absolute and require an existing directory.
fn require_dir(dir: &Path) -> Result<PathBuf, CliError> {
    let dir = std::path::absolute(dir)?;
    if !dir.is_dir() {
        return Err(CliError::Validation(format!(
            "Not a directory: {}",
            dir.display()
        )));
    }
    Ok(dir)
}

fn db_config(config: &Config) -> Option<DbConfig> {
    let dsn = config.database.dsn.as_deref()?;
    Some(DbConfig {
        dsn: dsn.to_owned(),
        user: config.database.user.clone(),
        password: config.database.password.clone(),
    })
}
