pub mod duplicate;
pub mod json;
pub mod terminal;

use std::path::Path;

pub use duplicate::{DuplicateReference, FileReport, ScanResult};

/// Streaming presentation collaborator. The detector emits each file's
/// report as soon as it is built, and one summary event at the end of the
/// scan when duplicates were found; how the events are shown is entirely the
/// sink's business.
pub trait ReportSink {
    fn file_report(&mut self, report: &FileReport);

    fn summary(&mut self, total_error_count: usize, root: &Path);
}

/// Discards all events. Used when the report is rendered whole at the end,
/// e.g. for JSON output.
pub struct SilentSink;

impl ReportSink for SilentSink {
    fn file_report(&mut self, _report: &FileReport) {}

    fn summary(&mut self, _total_error_count: usize, _root: &Path) {}
}
