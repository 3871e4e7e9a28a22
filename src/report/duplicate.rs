use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::engine::detector::ReferenceCounts;

/// One reference declared more than once within a single project file.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateReference {
    /// Deterministic ID (hash-based), e.g. "DUPR-a1b2c3d4", stable across
    /// runs so CI can track a finding over time.
    pub id: String,

    /// Normalized identity, e.g. "newtonsoft.json"
    pub identity: String,

    /// First-seen spelling from the project file
    pub name: String,

    /// Total occurrences within the file
    pub occurrences: usize,
}

impl DuplicateReference {
    pub fn generate_id(file_path: &Path, identity: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(file_path.to_string_lossy().as_bytes());
        hasher.update(identity.as_bytes());
        let hex = format!("{:x}", hasher.finalize());
        format!("DUPR-{}", &hex[..8])
    }
}

/// Duplicate report for one examined project file. Only files with at least
/// one duplicate get a report.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    /// The file examined
    pub file_path: PathBuf,

    /// Occurrence counts per normalized identity, first-seen order
    pub references: ReferenceCounts,

    /// The identities declared more than once
    pub duplicates: Vec<DuplicateReference>,

    /// Sum of (occurrences − 1) over the duplicated identities
    pub error_count: usize,
}

impl FileReport {
    pub fn new(file_path: PathBuf, references: ReferenceCounts) -> Self {
        let duplicates: Vec<DuplicateReference> = references
            .duplicates()
            .map(|entry| DuplicateReference {
                id: DuplicateReference::generate_id(&file_path, entry.identity.as_str()),
                identity: entry.identity.as_str().to_string(),
                name: entry.name.clone(),
                occurrences: entry.count,
            })
            .collect();
        let error_count = references.error_count();

        FileReport {
            file_path,
            references,
            duplicates,
            error_count,
        }
    }

    pub fn has_duplicates(&self) -> bool {
        self.references.has_duplicates()
    }
}

/// The complete scan result
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    /// duprefs version
    pub version: String,

    /// When the scan was performed
    pub timestamp: String,

    /// Root directory that was scanned
    pub root: PathBuf,

    /// Project files successfully evaluated
    pub files_examined: usize,

    /// Project files skipped because they could not be evaluated
    pub files_skipped: usize,

    /// Duration in milliseconds
    pub duration_ms: u64,

    /// Reports for the files that had duplicates, in selector order
    pub file_reports: Vec<FileReport>,

    /// Total (occurrences − 1) across all examined files
    pub total_error_count: usize,
}
