use serde::Serialize;

use crate::msbuild::ProjectItem;

/// Item type tag that marks a declared assembly reference.
pub const REFERENCE_ITEM_TYPE: &str = "Reference";

/// Identity of a declared reference with any comma-suffixed metadata
/// (version, culture, public key token) stripped and the name case-folded.
///
/// Equality on this type is the duplicate relation: two declarations are
/// duplicates iff their normalized identities are equal. Normalization is a
/// pure function of the raw include string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NormalizedIdentity(String);

impl NormalizedIdentity {
    pub fn from_raw(raw: &str) -> Self {
        NormalizedIdentity(assembly_name(raw).to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NormalizedIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The assembly name part of an include string: everything before the first
/// comma, e.g. `"Foo.Bar, Version=1.0"` → `"Foo.Bar"`.
fn assembly_name(raw: &str) -> &str {
    match raw.find(',') {
        Some(idx) => raw[..idx].trim(),
        None => raw.trim(),
    }
}

/// One counted identity with its first-seen original spelling.
#[derive(Debug, Clone, Serialize)]
pub struct CountEntry {
    pub identity: NormalizedIdentity,
    /// Spelling from the first declaration encountered, kept for display.
    pub name: String,
    pub count: usize,
}

/// Occurrence counts per normalized identity, in first-seen order.
///
/// An explicit ordered map rather than a lower-cased hash map, so the
/// case-insensitive key contract stays auditable on its own. Reference lists
/// in a project file are short; lookup is a linear scan.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ReferenceCounts {
    entries: Vec<CountEntry>,
}

impl ReferenceCounts {
    pub fn record(&mut self, raw: &str) {
        let identity = NormalizedIdentity::from_raw(raw);
        match self.entries.iter_mut().find(|e| e.identity == identity) {
            Some(entry) => entry.count += 1,
            None => self.entries.push(CountEntry {
                identity,
                name: assembly_name(raw).to_string(),
                count: 1,
            }),
        }
    }

    pub fn entries(&self) -> &[CountEntry] {
        &self.entries
    }

    /// Identities declared more than once.
    pub fn duplicates(&self) -> impl Iterator<Item = &CountEntry> {
        self.entries.iter().filter(|e| e.count > 1)
    }

    pub fn has_duplicates(&self) -> bool {
        self.entries.iter().any(|e| e.count > 1)
    }

    /// Sum of (occurrences − 1) over the duplicated identities: a reference
    /// declared three times contributes 2.
    pub fn error_count(&self) -> usize {
        self.duplicates().map(|e| e.count - 1).sum()
    }
}

/// Count the `Reference` declarations of a single project file. All other
/// declaration kinds (Compile, Content, ProjectReference, ...) are ignored.
pub fn count_references(items: &[ProjectItem]) -> ReferenceCounts {
    let mut counts = ReferenceCounts::default();
    for item in items {
        if item.item_type == REFERENCE_ITEM_TYPE {
            counts.record(&item.include);
        }
    }
    counts
}
