use std::path::Path;

use comfy_table::{presets::UTF8_BORDERS_ONLY, Table};
use owo_colors::OwoColorize;

use crate::report::{FileReport, ReportSink, ScanResult};

/// Streams duplicate reports to the terminal as the scan progresses, with
/// the duplicated names highlighted in red.
pub struct TerminalSink;

impl TerminalSink {
    pub fn new() -> Self {
        TerminalSink
    }
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportSink for TerminalSink {
    fn file_report(&mut self, report: &FileReport) {
        println!();
        println!(
            "File: {} {}",
            report.file_path.display().bold(),
            format!("({} references)", report.references.entries().len()).dimmed(),
        );
        for dup in &report.duplicates {
            println!(
                "  {}  duplicate reference: {} ({} occurrences)",
                dup.id.dimmed(),
                dup.name.red().bold(),
                dup.occurrences,
            );
        }
    }

    fn summary(&mut self, total_error_count: usize, root: &Path) {
        println!();
        println!(
            "{}",
            format!(
                "ERROR: found {} duplicate references in directory: {}",
                total_error_count,
                root.display()
            )
            .red()
            .bold()
        );
    }
}

/// Render the end-of-scan totals: a table of every duplicate plus scan
/// statistics.
pub fn render_totals(result: &ScanResult) {
    println!();

    if result.file_reports.is_empty() {
        println!("  {}  no duplicate references found", "✅".bold());
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["File", "Reference", "Occurrences"]);
        for report in &result.file_reports {
            for dup in &report.duplicates {
                table.add_row(vec![
                    report.file_path.display().to_string(),
                    dup.name.clone(),
                    dup.occurrences.to_string(),
                ]);
            }
        }
        println!("{table}");
    }

    println!();
    println!("{}", "━".repeat(60));
    println!(
        " Examined {} project files in {:.2}s — {} duplicate references",
        result.files_examined.to_string().bold(),
        result.duration_ms as f64 / 1000.0,
        result.total_error_count.to_string().bold(),
    );
    if result.files_skipped > 0 {
        println!(
            " ({} files skipped: could not be evaluated)",
            result.files_skipped.to_string().dimmed()
        );
    }
    println!("{}", "━".repeat(60));
    println!();
}
