//! Recursive discovery of article files under a directory.

use std::path::{Path, PathBuf};

use crate::IngestError;

/// Extensions matched when nothing else is configured.
pub const DEFAULT_EXTENSIONS: [&str; 2] = ["nxml", "xml"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Extensions without the leading dot, matched case-insensitively.
    pub extensions: Vec<String>,
    pub include_hidden: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            include_hidden: false,
        }
    }
}

impl DiscoveryOptions {
    fn matches(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|want| want.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Every matching file under `root`, sorted.
///
/// An unreadable `root` is an error; unreadable subdirectories are logged and
/// skipped.
pub fn list_xml_paths(root: &Path, options: &DiscoveryOptions) -> Result<Vec<PathBuf>, IngestError> {
    let root = expand_home(root);
    let entries = std::fs::read_dir(&root).map_err(|source| IngestError::Discovery {
        path: root.clone(),
        source,
    })?;

    let mut found = Vec::new();
    let mut pending: Vec<std::fs::ReadDir> = vec![entries];
    while let Some(read_dir) = pending.pop() {
        for entry in read_dir.flatten() {
            let path = entry.path();
            if !options.include_hidden && is_hidden(&path) {
                continue;
            }
            if path.is_dir() {
                match std::fs::read_dir(&path) {
                    Ok(sub) => pending.push(sub),
                    Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable directory"),
                }
            } else if options.matches(&path) {
                found.push(path);
            }
        }
    }

    found.sort();
    tracing::debug!(root = %root.display(), count = found.len(), "discovered articles");
    Ok(found)
}
