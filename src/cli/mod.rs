pub mod commands;

use clap::Parser;

pub use commands::{Commands, ScanArgs};

/// duprefs — duplicate-reference auditor for MSBuild projects
///
/// Finds References declared more than once in the same project file.
/// Diagnostic only: nothing is ever modified.
#[derive(Parser, Debug)]
#[command(
    name = "duprefs",
    version,
    about = "Duplicate-reference auditor for MSBuild project files",
    long_about = "duprefs walks a directory tree, evaluates every .csproj it finds, and reports\nassembly References that are declared more than once within the same file.\nIt identifies the problem; it does not fix it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}
