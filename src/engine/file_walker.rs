use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use regex::Regex;
use tracing::debug;

use crate::engine::ScanError;

/// File extension of the project files this tool audits.
pub const PROJECT_EXTENSION: &str = "csproj";

/// Walk a directory tree and collect the project files to examine.
///
/// - The root must be an existing directory, otherwise the whole scan fails
///   before any file is looked at.
/// - Every file whose extension is `.csproj` (case-insensitive) is selected,
///   including files under hidden or gitignored directories — the audit must
///   see the whole tree, so the walker's standard filters are off.
/// - An exclusion pattern discards files whose base name contains a match.
///
/// Returned paths are absolute, in traversal order. Only the set of files is
/// stable across platforms, not the order.
pub fn walk_project_files(root: &Path, exclude: Option<&Regex>) -> Result<Vec<PathBuf>, ScanError> {
    let root = std::fs::canonicalize(root)
        .ok()
        .filter(|p| p.is_dir())
        .ok_or_else(|| ScanError::DirectoryNotFound(root.to_path_buf()))?;

    let mut builder = WalkBuilder::new(&root);
    builder.standard_filters(false).follow_links(false);

    let mut files = Vec::new();

    for entry in builder.build() {
        match entry {
            Ok(entry) => {
                if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                    continue;
                }

                let path = entry.path();
                let is_project = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(PROJECT_EXTENSION));
                if !is_project {
                    continue;
                }

                if let Some(pattern) = exclude {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy())
                        .unwrap_or_default();
                    if pattern.is_match(&name) {
                        debug!("excluded: {}", path.display());
                        continue;
                    }
                }

                files.push(path.to_path_buf());
            }
            Err(e) => {
                debug!("walk error: {}", e);
            }
        }
    }

    Ok(files)
}
