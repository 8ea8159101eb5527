//! Directory tree listing.

use std::fs;
use std::path::Path;

use strand_format::Formatter;

const INDENT: &str = "    ";
const DIR_MARKER: &str = "📂 ";
const FILE_MARKER: &str = "📄 ";
const NAME_MAX_LENGTH: usize = 64;

/// Options for [`Engine::dir`](crate::Engine::dir).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirOptions {
    /// Levels to list. `1` lists only the given directory.
    pub depth: usize,
    /// Entry names skipped entirely (exact match).
    pub exclude: Vec<String>,
    /// Indent level of the first line.
    pub indent: usize,
}

impl Default for DirOptions {
    fn default() -> Self {
        Self {
            depth: 2,
            exclude: vec![".git".to_owned(), "vendor".to_owned()],
            indent: 0,
        }
    }
}

pub(crate) fn list_dir(formatter: &dyn Formatter, dir: &Path, options: &DirOptions) -> String {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "failed to read directory");
            return format!("Directory read error: {}\n", dir.display());
        }
    };

    let mut items: Vec<(String, bool)> = entries
        .filter_map(Result::ok)
        .map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            // Follows symlinks, so a link to a directory lists as one
            let is_dir = entry.path().is_dir();
            (name, is_dir)
        })
        .filter(|(name, _)| !options.exclude.contains(name))
        .collect();

    items.sort_by(|(a, a_dir), (b, b_dir)| {
        b_dir
            .cmp(a_dir)
            .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
            .then_with(|| a.cmp(b))
    });

    let prefix = INDENT.repeat(options.indent);
    let mut output = String::new();
    for (name, is_dir) in items {
        output.push_str(&prefix);
        output.push_str(if is_dir { DIR_MARKER } else { FILE_MARKER });
        output.push_str(&formatter.sanitize(Some(&name), Some(NAME_MAX_LENGTH)));
        output.push('\n');

        if is_dir && options.depth > 1 {
            let nested = DirOptions {
                depth: options.depth - 1,
                exclude: options.exclude.clone(),
                indent: options.indent + 1,
            };
            output.push_str(&list_dir(formatter, &dir.join(&name), &nested));
        }
    }
    output
}
