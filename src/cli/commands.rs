use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::bail;
use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a directory tree for duplicate References
    Scan(ScanArgs),

    /// Initialize a .duprefs.toml config file in the current directory
    Init,
}

#[derive(clap::Args, Debug)]
pub struct ScanArgs {
    /// Root directory to scan (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Build property overrides for project evaluation, e.g.
    /// "properties:Configuration=Debug;Platform=AnyCPU" (the prefix is
    /// optional)
    #[arg(short, long)]
    pub properties: Option<String>,

    /// Exclude project files whose name matches this regular expression
    #[arg(short = 'x', long)]
    pub exclude: Option<String>,

    /// Output format: "terminal" or "json"
    #[arg(short, long, default_value = "terminal")]
    pub format: String,

    /// Write a JSON report to this file
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Ignore .duprefs.toml config files found near the scanned tree
    #[arg(long)]
    pub no_config: bool,
}

/// Parse the build-property argument into key/value overrides.
///
/// The accepted syntax is the historical one: an optional `properties:`
/// prefix, pairs delimited by semicolons, key and value separated by `=`,
/// e.g. `properties:Configuration=Debug;Platform=AnyCPU;Country=USA`.
/// A malformed pair fails fast so no scan runs on half-parsed input.
pub fn parse_properties(raw: &str) -> anyhow::Result<BTreeMap<String, String>> {
    let raw = raw.strip_prefix("properties:").unwrap_or(raw);

    let mut properties = BTreeMap::new();
    for pair in raw.split(';').filter(|p| !p.trim().is_empty()) {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("malformed property '{pair}': expected key=value");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("malformed property '{pair}': empty key");
        }
        properties.insert(key.to_string(), value.trim().to_string());
    }
    Ok(properties)
}
