//! Dual-root path resolution.
//!
//! Template imports resolve against the doc root, raw file reads and directory
//! listings against the project root. No `..` normalization is performed.

use std::path::{MAIN_SEPARATOR, Path, PathBuf};

/// Invalid root path.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// Project root given as a relative path.
    #[error("project root must be an absolute path: {0}")]
    RelativeProjectRoot(String),
    /// Root given as a relative path where an absolute one is required.
    #[error("root must be an absolute path: {}", .0.display())]
    NotAbsolute(PathBuf),
    /// Root does not exist or is not a directory.
    #[error("root is not an existing directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

/// Check whether `path` is absolute.
///
/// A path is absolute if it starts with a separator, or with a drive letter
/// prefix (`C:`) that is not followed by anything but a separator.
///
/// # Example
///
/// ```
/// use strand_engine::is_absolute;
///
/// assert!(is_absolute("/srv/docs"));
/// assert!(is_absolute("C:\\docs"));
/// assert!(is_absolute("c:/docs"));
/// assert!(!is_absolute("C:docs"));
/// assert!(!is_absolute("docs/intro.md"));
/// ```
pub fn is_absolute(path: &str) -> bool {
    let mut chars = path.chars();
    match chars.next() {
        Some(c) if c == '/' || c == MAIN_SEPARATOR => true,
        Some(c) if c.is_ascii_alphabetic() => {
            chars.next() == Some(':') && chars.next().is_none_or(|c| c == '/' || c == '\\')
        }
        _ => false,
    }
}

/// Resolve `path` against `base`.
///
/// Absolute paths are returned unchanged. Relative paths are joined onto
/// `base` after trimming one leading separator.
pub fn resolve_against(base: &Path, path: &str) -> PathBuf {
    if is_absolute(path) {
        return PathBuf::from(path);
    }
    let relative = path
        .strip_prefix('/')
        .or_else(|| path.strip_prefix('\\'))
        .unwrap_or(path);
    base.join(relative)
}

/// Project and doc roots for one run.
///
/// Both roots are absolute, existing directories. The value is immutable;
/// the `with_*` methods return a new context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathContext {
    project_root: PathBuf,
    doc_root: PathBuf,
}

impl PathContext {
    /// Create a context from two absolute directories.
    pub fn new(
        project_root: impl Into<PathBuf>,
        doc_root: impl Into<PathBuf>,
    ) -> Result<Self, PathError> {
        Ok(Self {
            project_root: require_dir(project_root.into())?,
            doc_root: require_dir(doc_root.into())?,
        })
    }

    /// Use the directory containing `input` as both roots.
    pub fn from_input(input: &Path) -> Result<Self, PathError> {
        let dir = input.parent().unwrap_or(Path::new("/"));
        Self::new(dir, dir)
    }

    /// Replace the project root. Relative paths are rejected.
    pub fn with_project_root(&self, path: &str) -> Result<Self, PathError> {
        if !is_absolute(path) {
            return Err(PathError::RelativeProjectRoot(path.to_owned()));
        }
        Ok(Self {
            project_root: require_dir(PathBuf::from(path))?,
            doc_root: self.doc_root.clone(),
        })
    }

    /// Replace the doc root. Relative paths resolve against the current doc root.
    pub fn with_doc_root(&self, path: &str) -> Result<Self, PathError> {
        Ok(Self {
            project_root: self.project_root.clone(),
            doc_root: require_dir(resolve_against(&self.doc_root, path))?,
        })
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn doc_root(&self) -> &Path {
        &self.doc_root
    }

    /// Resolve a source file path (`file`, `dir`).
    pub fn resolve_project(&self, path: &str) -> PathBuf {
        resolve_against(&self.project_root, path)
    }

    /// Resolve a template path (`import`).
    pub fn resolve_doc(&self, path: &str) -> PathBuf {
        resolve_against(&self.doc_root, path)
    }
}

fn require_dir(path: PathBuf) -> Result<PathBuf, PathError> {
    if !path.is_absolute() {
        return Err(PathError::NotAbsolute(path));
    }
    if !path.is_dir() {
        return Err(PathError::NotADirectory(path));
    }
    Ok(path)
}
