mod cli;
mod config;
mod engine;
mod msbuild;
mod report;

use std::collections::BTreeMap;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use engine::Scanner;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("duprefs=debug")
    } else if cli.quiet {
        EnvFilter::new("duprefs=error")
    } else {
        EnvFilter::new("duprefs=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    match &cli.command {
        cli::Commands::Scan(args) => {
            // Resolve config + CLI inputs, failing fast on malformed
            // properties before any filesystem work
            let mut properties = BTreeMap::new();
            let mut exclude = args.exclude.clone();
            if !args.no_config {
                if let Some(cfg) = config::DuprefsConfig::load(&args.path) {
                    properties.extend(cfg.properties);
                    if exclude.is_none() {
                        exclude = cfg.scan.exclude;
                    }
                }
            }
            if let Some(raw) = &args.properties {
                properties.extend(cli::commands::parse_properties(raw)?);
            }

            let scanner = Scanner::new(&args.path, properties, exclude.as_deref())?;

            let result = match args.format.as_str() {
                "json" => scanner.run(&mut report::SilentSink)?,
                _ => {
                    let mut sink = report::terminal::TerminalSink::new();
                    let result = scanner.run(&mut sink)?;
                    report::terminal::render_totals(&result);
                    result
                }
            };

            match args.format.as_str() {
                "json" => {
                    let output = report::json::render(&result)?;
                    if let Some(ref path) = args.out {
                        std::fs::write(path, &output)?;
                        info!("report written to {}", path.display());
                    } else {
                        println!("{}", output);
                    }
                }
                _ => {
                    if let Some(ref path) = args.out {
                        let json_output = report::json::render(&result)?;
                        std::fs::write(path, &json_output)?;
                        info!("JSON report also written to {}", path.display());
                    }
                }
            }

            // The duplicate count doubles as the exit code for CI gating,
            // clamped below the exec-failure range
            if result.total_error_count > 0 {
                std::process::exit(result.total_error_count.min(101) as i32);
            }
        }
        cli::Commands::Init => {
            config::init_config()?;
        }
    }

    Ok(())
}
