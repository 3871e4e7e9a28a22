pub mod detector;
pub mod file_walker;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use rayon::prelude::*;
use regex::Regex;
use tracing::{debug, info};

use crate::msbuild::{MsBuildProject, ProjectParser};
use crate::report::{FileReport, ReportSink, ScanResult};

/// Scan-aborting failures. Per-file parse errors are not represented here:
/// they are absorbed by the scanner, which skips the file and moves on.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("directory does not exist: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("invalid exclusion pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Outcome of one file's analysis. Each file is independent; the only
/// cross-file state is the running total accumulated afterwards.
enum FileOutcome {
    Clean,
    Duplicates(FileReport),
    Skipped,
}

/// The duplicate-reference scanner. Orchestrates file selection, per-file
/// project evaluation, duplicate counting, and report emission.
pub struct Scanner {
    /// Root directory to scan
    root: PathBuf,
    /// Build property overrides handed to the project parser
    properties: BTreeMap<String, String>,
    /// Optional exclusion pattern, matched against file base names
    exclude: Option<Regex>,
    /// Project-parser collaborator
    parser: Box<dyn ProjectParser>,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("root", &self.root)
            .field("properties", &self.properties)
            .field("exclude", &self.exclude)
            .finish_non_exhaustive()
    }
}

impl Scanner {
    /// Build a scanner. The exclusion pattern is compiled here, before any
    /// selection happens; a bad pattern fails the whole operation.
    pub fn new(
        root: impl Into<PathBuf>,
        properties: BTreeMap<String, String>,
        exclude: Option<&str>,
    ) -> Result<Self, ScanError> {
        let exclude = exclude.map(Regex::new).transpose()?;
        Ok(Scanner {
            root: root.into(),
            properties,
            exclude,
            parser: Box::new(MsBuildProject),
        })
    }

    /// Swap the project-parser collaborator (tests use a scripted fake).
    #[cfg(test)]
    pub fn with_parser(mut self, parser: Box<dyn ProjectParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Run the full scan pipeline.
    ///
    /// Files are evaluated in parallel but each file's parsing and counting
    /// is isolated; results are collected in selector order before emission,
    /// so the output and the accumulated total are reproducible.
    pub fn run(&self, sink: &mut dyn ReportSink) -> Result<ScanResult, ScanError> {
        let start = Instant::now();

        let files = file_walker::walk_project_files(&self.root, self.exclude.as_ref())?;
        let root = std::fs::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone());

        info!(
            "found {} project files under {}",
            files.len(),
            root.display()
        );

        let outcomes: Vec<FileOutcome> = files
            .par_iter()
            .map(|path| match self.parser.parse(path, &self.properties) {
                Ok(items) => {
                    let counts = detector::count_references(&items);
                    let report = FileReport::new(path.clone(), counts);
                    if report.has_duplicates() {
                        FileOutcome::Duplicates(report)
                    } else {
                        FileOutcome::Clean
                    }
                }
                Err(e) => {
                    debug!("skipping {}: {}", path.display(), e);
                    FileOutcome::Skipped
                }
            })
            .collect();

        let mut file_reports = Vec::new();
        let mut total_error_count = 0;
        let mut files_examined = 0;
        let mut files_skipped = 0;

        for outcome in outcomes {
            match outcome {
                FileOutcome::Clean => files_examined += 1,
                FileOutcome::Skipped => files_skipped += 1,
                FileOutcome::Duplicates(report) => {
                    files_examined += 1;
                    total_error_count += report.error_count;
                    sink.file_report(&report);
                    file_reports.push(report);
                }
            }
        }

        if total_error_count > 0 {
            sink.summary(total_error_count, &root);
        }

        info!(
            "examined {} files ({} skipped), {} duplicate references",
            files_examined, files_skipped, total_error_count
        );

        Ok(ScanResult {
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            root,
            files_examined,
            files_skipped,
            duration_ms: start.elapsed().as_millis() as u64,
            file_reports,
            total_error_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;
    use tempfile::TempDir;

    use crate::msbuild::{ParseError, ProjectItem};

    /// Parser fake scripted by file base name. Files not in the script
    /// evaluate to an empty item list.
    struct FakeParser {
        script: HashMap<String, Result<Vec<ProjectItem>, ()>>,
    }

    impl FakeParser {
        fn new() -> Self {
            FakeParser {
                script: HashMap::new(),
            }
        }

        fn references(mut self, file: &str, names: &[&str]) -> Self {
            let items = names
                .iter()
                .map(|n| ProjectItem {
                    item_type: "Reference".to_string(),
                    include: n.to_string(),
                })
                .collect();
            self.script.insert(file.to_string(), Ok(items));
            self
        }

        fn failing(mut self, file: &str) -> Self {
            self.script.insert(file.to_string(), Err(()));
            self
        }
    }

    impl ProjectParser for FakeParser {
        fn parse(
            &self,
            path: &Path,
            _properties: &BTreeMap<String, String>,
        ) -> Result<Vec<ProjectItem>, ParseError> {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            match self.script.get(&name) {
                Some(Ok(items)) => Ok(items.clone()),
                Some(Err(())) => Err(ParseError::NotAProject("broken".to_string())),
                None => Ok(Vec::new()),
            }
        }
    }

    #[derive(Default)]
    struct CollectingSink {
        reports: Vec<FileReport>,
        summary: Option<(usize, PathBuf)>,
    }

    impl ReportSink for CollectingSink {
        fn file_report(&mut self, report: &FileReport) {
            self.reports.push(report.clone());
        }

        fn summary(&mut self, total_error_count: usize, root: &Path) {
            self.summary = Some((total_error_count, root.to_path_buf()));
        }
    }

    fn tree_with(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            std::fs::write(dir.path().join(file), "<Project/>").unwrap();
        }
        dir
    }

    fn scanner(dir: &TempDir, parser: FakeParser) -> Scanner {
        Scanner::new(dir.path(), BTreeMap::new(), None)
            .unwrap()
            .with_parser(Box::new(parser))
    }

    #[test]
    fn reports_only_files_with_duplicates() {
        let dir = tree_with(&["Y.csproj", "Z.csproj"]);
        let parser = FakeParser::new()
            .references("Y.csproj", &["A", "A", "A"])
            .references("Z.csproj", &["B", "C"]);

        let mut sink = CollectingSink::default();
        let result = scanner(&dir, parser).run(&mut sink).unwrap();

        assert_eq!(result.total_error_count, 2);
        assert_eq!(result.files_examined, 2);
        assert_eq!(result.file_reports.len(), 1);
        assert!(result.file_reports[0].file_path.ends_with("Y.csproj"));

        assert_eq!(sink.reports.len(), 1);
        let (total, _) = sink.summary.expect("summary should fire");
        assert_eq!(total, 2);
    }

    #[test]
    fn clean_scan_emits_no_summary() {
        let dir = tree_with(&["A.csproj"]);
        let parser = FakeParser::new().references("A.csproj", &["X", "Y"]);

        let mut sink = CollectingSink::default();
        let result = scanner(&dir, parser).run(&mut sink).unwrap();

        assert_eq!(result.total_error_count, 0);
        assert!(result.file_reports.is_empty());
        assert!(sink.reports.is_empty());
        assert!(sink.summary.is_none());
    }

    #[test]
    fn parse_failure_is_isolated_to_its_file() {
        let dir = tree_with(&["Broken.csproj", "Good.csproj"]);
        let parser = FakeParser::new()
            .failing("Broken.csproj")
            .references("Good.csproj", &["Foo", "foo"]);

        let mut sink = CollectingSink::default();
        let result = scanner(&dir, parser).run(&mut sink).unwrap();

        // the broken file is skipped, not counted, and does not abort the scan
        assert_eq!(result.files_skipped, 1);
        assert_eq!(result.files_examined, 1);
        assert_eq!(result.total_error_count, 1);
        assert_eq!(result.file_reports.len(), 1);
        assert!(result.file_reports[0].file_path.ends_with("Good.csproj"));
    }

    #[test]
    fn case_and_metadata_variants_are_one_duplicate() {
        let dir = tree_with(&["X.csproj"]);
        let parser = FakeParser::new().references(
            "X.csproj",
            &["Foo", "foo, Version=1.0, Culture=neutral", "Bar"],
        );

        let mut sink = CollectingSink::default();
        let result = scanner(&dir, parser).run(&mut sink).unwrap();

        assert_eq!(result.total_error_count, 1);
        let dups = &result.file_reports[0].duplicates;
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].identity, "foo");
    }

    #[test]
    fn excluded_files_are_never_parsed() {
        let dir = tree_with(&["App.csproj", "App.Test.csproj"]);
        // the excluded file would trip the scan if it were parsed
        let parser = FakeParser::new()
            .references("App.csproj", &["A"])
            .references("App.Test.csproj", &["B", "B"]);

        let mut sink = CollectingSink::default();
        let result = Scanner::new(dir.path(), BTreeMap::new(), Some("Test"))
            .unwrap()
            .with_parser(Box::new(parser))
            .run(&mut sink)
            .unwrap();

        assert_eq!(result.files_examined, 1);
        assert_eq!(result.total_error_count, 0);
    }

    #[test]
    fn missing_root_aborts_with_no_reports() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent");

        let mut sink = CollectingSink::default();
        let err = Scanner::new(&missing, BTreeMap::new(), None)
            .unwrap()
            .run(&mut sink)
            .unwrap_err();

        assert!(matches!(err, ScanError::DirectoryNotFound(_)));
        assert!(sink.reports.is_empty());
        assert!(sink.summary.is_none());
    }

    #[test]
    fn bad_exclusion_pattern_fails_construction() {
        let err = Scanner::new("/tmp", BTreeMap::new(), Some("[unclosed")).unwrap_err();
        assert!(matches!(err, ScanError::InvalidPattern(_)));
    }
}
