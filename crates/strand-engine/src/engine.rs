use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use minijinja::{AutoEscape, Environment};
use strand_db::{Database, StructureMode};
use strand_format::{DEFAULT_SUFFIX, Formatter, MarkdownFormatter, Row};

use crate::context::TemplateContext;
use crate::fetch::{Fetch, UreqFetcher, is_url};
use crate::listing::{DirOptions, list_dir};
use crate::path::PathContext;

/// Default bound on nested imports.
pub const DEFAULT_MAX_IMPORT_DEPTH: usize = 32;

/// Rendered by [`Engine::table`] for an empty row list.
pub const NO_ROWS: &str = "No results found.\n";

/// Template import engine.
///
/// Cheap to clone; clones share the database connection and import stack.
/// The import stack is engine-local state, so one engine should render one
/// document at a time.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

struct Inner {
    paths: PathContext,
    formatter: Arc<dyn Formatter>,
    database: Mutex<Database>,
    fetcher: Box<dyn Fetch>,
    max_import_depth: usize,
    import_stack: Mutex<Vec<PathBuf>>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("paths", &self.inner.paths)
            .field("formatter", &self.inner.formatter)
            .field("fetcher", &self.inner.fetcher)
            .field("max_import_depth", &self.inner.max_import_depth)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Engine`].
///
/// Defaults: Markdown formatter, no database connection, `ureq` fetcher and
/// [`DEFAULT_MAX_IMPORT_DEPTH`].
pub struct EngineBuilder {
    paths: PathContext,
    formatter: Option<Arc<dyn Formatter>>,
    database: Option<Database>,
    fetcher: Option<Box<dyn Fetch>>,
    max_import_depth: usize,
}

impl EngineBuilder {
    #[must_use]
    pub fn formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Use `database` for introspection calls.
    ///
    /// Without one, the engine creates an unconnected database sharing its
    /// formatter.
    #[must_use]
    pub fn database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    #[must_use]
    pub fn fetcher(mut self, fetcher: impl Fetch + 'static) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    #[must_use]
    pub fn max_import_depth(mut self, depth: usize) -> Self {
        self.max_import_depth = depth;
        self
    }

    pub fn build(self) -> Engine {
        let formatter = self
            .formatter
            .unwrap_or_else(|| Arc::new(MarkdownFormatter::new()));
        let database = self
            .database
            .unwrap_or_else(|| Database::new(Arc::clone(&formatter)));
        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Box::new(UreqFetcher::default()));

        Engine {
            inner: Arc::new(Inner {
                paths: self.paths,
                formatter,
                database: Mutex::new(database),
                fetcher,
                max_import_depth: self.max_import_depth,
                import_stack: Mutex::new(Vec::new()),
            }),
        }
    }
}

/// Pops the import stack when an import finishes.
struct ImportGuard<'a> {
    stack: &'a Mutex<Vec<PathBuf>>,
}

impl Drop for ImportGuard<'_> {
    fn drop(&mut self) {
        lock(self.stack).pop();
    }
}

// A panic inside a template helper must not disable the engine for the rest
// of the run.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Engine {
    pub fn builder(paths: PathContext) -> EngineBuilder {
        EngineBuilder {
            paths,
            formatter: None,
            database: None,
            fetcher: None,
            max_import_depth: DEFAULT_MAX_IMPORT_DEPTH,
        }
    }

    /// Engine with default collaborators.
    pub fn new(paths: PathContext) -> Self {
        Self::builder(paths).build()
    }

    pub fn paths(&self) -> &PathContext {
        &self.inner.paths
    }

    pub fn formatter(&self) -> &dyn Formatter {
        self.inner.formatter.as_ref()
    }

    /// Render the template at `path` (resolved against the doc root).
    ///
    /// The engine is added to `context` under `"engine"` unless the caller
    /// set that key. Missing files, template errors, import cycles and
    /// exceeding the depth limit render as inline error text.
    pub fn import(&self, path: &str, context: TemplateContext) -> String {
        let resolved = self.inner.paths.resolve_doc(path);
        tracing::debug!(path, resolved = %resolved.display(), "importing template");

        let source = match fs::read_to_string(&resolved) {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(path = %resolved.display(), error = %e, "failed to read template");
                return file_read_error(&resolved);
            }
        };

        let _guard = match self.enter(&resolved) {
            Ok(guard) => guard,
            Err(message) => return message,
        };

        self.render(&resolved, &source, context.with_engine(self))
    }

    /// Raw content of a URL or of a file under the project root.
    ///
    /// The content is never evaluated, whatever its extension.
    pub fn file(&self, path: &str) -> String {
        if is_url(path) {
            return self.inner.fetcher.fetch(path);
        }

        let resolved = self.inner.paths.resolve_project(path);
        match fs::read(&resolved) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                tracing::warn!(path = %resolved.display(), error = %e, "failed to read file");
                file_read_error(&resolved)
            }
        }
    }

    /// Tree listing of a directory under the project root.
    pub fn dir(&self, path: &str, options: &DirOptions) -> String {
        let resolved = self.inner.paths.resolve_project(path);
        list_dir(self.formatter(), &resolved, options)
    }

    /// Run an introspection call against the shared database.
    pub fn with_database<T>(&self, f: impl FnOnce(&mut Database) -> T) -> T {
        f(&mut lock(&self.inner.database))
    }

    pub fn query(&self, sql: &str, value_max_length: usize) -> String {
        self.with_database(|db| db.query(sql, value_max_length))
    }

    pub fn show_create_table(&self, name: &str) -> String {
        self.with_database(|db| db.show_create_table(name))
    }

    pub fn describe_columns(&self, name: &str) -> String {
        self.with_database(|db| db.describe_columns(name))
    }

    pub fn list_indexes(&self, name: &str) -> String {
        self.with_database(|db| db.list_indexes(name))
    }

    pub fn describe_full_table(
        &self,
        name: &str,
        mode: Option<StructureMode>,
        with_indexes: bool,
        sample_count: usize,
    ) -> String {
        self.with_database(|db| db.describe_full_table(name, mode, with_indexes, sample_count))
    }

    /// Render rows as a table. No rows renders [`NO_ROWS`] instead of an empty table.
    pub fn table(&self, rows: &[Row], value_max_length: usize) -> String {
        if rows.is_empty() {
            return NO_ROWS.to_owned();
        }
        self.inner.formatter.table(rows, value_max_length)
    }

    fn enter(&self, path: &Path) -> Result<ImportGuard<'_>, String> {
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let mut stack = lock(&self.inner.import_stack);

        if let Some(start) = stack.iter().position(|p| *p == key) {
            let chain: Vec<String> = stack[start..]
                .iter()
                .chain(std::iter::once(&key))
                .map(|p| self.display_name(p))
                .collect();
            tracing::warn!(chain = %chain.join(" -> "), "import cycle detected");
            return Err(format!("Import cycle detected: {}\n", chain.join(" -> ")));
        }

        if stack.len() >= self.inner.max_import_depth {
            tracing::warn!(path = %path.display(), depth = stack.len(), "import depth limit exceeded");
            return Err(format!(
                "Import depth limit ({}) exceeded at {}\n",
                self.inner.max_import_depth,
                self.display_name(path)
            ));
        }

        stack.push(key);
        Ok(ImportGuard {
            stack: &self.inner.import_stack,
        })
    }

    /// Path relative to the doc root when possible.
    fn display_name(&self, path: &Path) -> String {
        let doc_root = self.inner.paths.doc_root();
        let doc_root = fs::canonicalize(doc_root).unwrap_or_else(|_| doc_root.to_path_buf());
        path.strip_prefix(&doc_root)
            .or_else(|_| path.strip_prefix(self.inner.paths.doc_root()))
            .unwrap_or(path)
            .display()
            .to_string()
    }

    fn render(&self, path: &Path, source: &str, context: TemplateContext) -> String {
        let name = path.display().to_string();
        let env = self.environment();
        match env.render_named_str(&name, source, context.into_value()) {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(path = %name, error = %e, "template error");
                format!("Template error in {name}: {e}\n")
            }
        }
    }

    fn environment(&self) -> Environment<'static> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_keep_trailing_newline(true);

        let formatter = Arc::clone(&self.inner.formatter);
        env.add_filter(
            "sanitize",
            move |value: minijinja::Value, max_length: Option<usize>| {
                crate::object::sanitize_value(formatter.as_ref(), &value, max_length)
            },
        );

        let formatter = Arc::clone(&self.inner.formatter);
        env.add_filter("md_escape", move |text: String| formatter.escape(&text));

        let formatter = Arc::clone(&self.inner.formatter);
        env.add_filter(
            "limit",
            move |text: String, max_length: usize, suffix: Option<String>| {
                formatter.limit(&text, max_length, suffix.as_deref().unwrap_or(DEFAULT_SUFFIX))
            },
        );

        env
    }
}

fn file_read_error(path: &Path) -> String {
    format!("File read error: {}\n", path.display())
}
