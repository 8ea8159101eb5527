//! Template import engine for Strand.
//!
//! Renders documentation templates written in minijinja. Every template sees
//! an `engine` object with methods to import other templates, embed raw files,
//! list directories and describe database tables.
//!
//! # Path resolution
//!
//! Two roots are kept in an immutable [`PathContext`]:
//!
//! - `import` resolves against the **doc root** (where templates live)
//! - `file` and `dir` resolve against the **project root** (the sources being documented)
//!
//! # Example
//!
//! ```ignore
//! use strand_engine::{Engine, PathContext, TemplateContext};
//!
//! let paths = PathContext::new("/srv/app", "/srv/app/docs")?;
//! let engine = Engine::new(paths);
//! let markdown = engine.import("README.md.tpl", TemplateContext::new());
//! ```
//!
//! Inside a template:
//!
//! ```text
//! {{ engine.import("partials/header.md.tpl", {"title": "API"}) }}
//! {{ engine.file("src/lib.rs") }}
//! {{ engine.dir("src", depth=1) }}
//! {{ engine.describe_full_table("users", mode="describe", indexes=true, sample=5) }}
//! ```

mod context;
mod engine;
mod fetch;
mod listing;
mod object;
mod path;

pub use context::{ENGINE_KEY, TemplateContext};
pub use engine::{DEFAULT_MAX_IMPORT_DEPTH, Engine, EngineBuilder, NO_ROWS};
pub use fetch::{DEFAULT_FETCH_TIMEOUT, Fetch, UreqFetcher, is_url};
pub use listing::DirOptions;
pub use path::{PathContext, PathError, is_absolute, resolve_against};
