use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// duprefs configuration (loaded from .duprefs.toml)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DuprefsConfig {
    #[serde(default)]
    pub scan: ScanConfig,

    /// Build property overrides applied when evaluating project files.
    /// Values given on the command line win over these.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScanConfig {
    /// Regular expression; project files whose name matches are skipped
    #[serde(default)]
    pub exclude: Option<String>,
}

impl DuprefsConfig {
    /// Try to load .duprefs.toml from the scan path or its parents. Config
    /// problems are advisory: they are logged and the scan proceeds without.
    pub fn load(scan_path: &Path) -> Option<Self> {
        let start = std::fs::canonicalize(scan_path).unwrap_or_else(|_| scan_path.to_path_buf());
        let config_path = find_config_file(&start)?;
        debug!("found config: {}", config_path.display());

        match std::fs::read_to_string(&config_path) {
            Ok(content) => match toml::from_str::<DuprefsConfig>(&content) {
                Ok(config) => {
                    info!("loaded config from {}", config_path.display());
                    Some(config)
                }
                Err(e) => {
                    tracing::warn!("failed to parse {}: {}", config_path.display(), e);
                    None
                }
            },
            Err(e) => {
                debug!("could not read {}: {}", config_path.display(), e);
                None
            }
        }
    }
}

/// Walk up from the scan path to find .duprefs.toml
fn find_config_file(start: &Path) -> Option<std::path::PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let config = current.join(".duprefs.toml");
        if config.exists() {
            return Some(config);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Create a default .duprefs.toml in the current directory
pub fn init_config() -> Result<()> {
    let config_path = std::env::current_dir()?.join(".duprefs.toml");

    if config_path.exists() {
        println!("⚠️  .duprefs.toml already exists in this directory");
        return Ok(());
    }

    let default_config = r#"# duprefs configuration

[scan]
# Project files whose name matches this regular expression are skipped.
# A match anywhere in the file name counts.
# exclude = "\\.Test\\."

# Build properties applied when evaluating project files.
# Command-line --properties values take precedence.
[properties]
# Configuration = "Debug"
# Platform = "AnyCPU"
"#;

    std::fs::write(&config_path, default_config)?;
    println!("✅ Created .duprefs.toml");
    println!("   Edit it to customize your scan settings.");

    Ok(())
}
