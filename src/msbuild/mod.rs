pub mod evaluator;

use std::collections::BTreeMap;
use std::path::Path;

pub use evaluator::MsBuildProject;

/// A single declared item from a project file's `<ItemGroup>` sections,
/// e.g. `<Reference Include="System.Xml, Version=4.0.0.0" />`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectItem {
    /// Element name of the declaration, e.g. "Reference", "Compile".
    pub item_type: String,
    /// The `Include` attribute after property expansion, as written otherwise.
    pub include: String,
}

/// Errors raised while evaluating a single project file.
///
/// These are always recovered per file: the scanner skips the file and
/// continues with the rest of the tree.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("not an MSBuild project: root element is <{0}>, expected <Project>")]
    NotAProject(String),
}

/// The project-parser collaborator.
///
/// Each analyzed file is evaluated independently, with the command-line
/// property overrides ("global properties") applied on top of the file's own
/// `<PropertyGroup>` definitions.
pub trait ProjectParser: Send + Sync {
    fn parse(
        &self,
        path: &Path,
        properties: &BTreeMap<String, String>,
    ) -> Result<Vec<ProjectItem>, ParseError>;
}
