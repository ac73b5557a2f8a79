use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::time::Instant;

use api_scanner::cli::{Cli, Commands};
use api_scanner::config::{MarkerConfig, MethodExcludes, ScanConfig};
use api_scanner::resolver::expand_classpath;
use api_scanner::scan::scan_all;
use api_scanner::universe::ExcludeFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Scan {
            targets,
            classpath,
            output_dir,
            exclude_packages,
            exclude_classes,
            exclude_methods,
            internal_annotation_suffix,
            internal_annotation,
            sealed_annotation,
            internal_package_segment,
        } => {
            let method_excludes = match exclude_methods {
                Some(path) => MethodExcludes::load(&path)?,
                None => MethodExcludes::default(),
            };

            let config = ScanConfig {
                classpath: expand_classpath(&classpath),
                output_dir,
                excludes: ExcludeFilter::new(exclude_packages, exclude_classes),
                method_excludes,
                markers: MarkerConfig {
                    internal_annotation_suffix,
                    internal_annotation,
                    sealed_annotation,
                    internal_package_segment,
                },
            };

            let start = Instant::now();
            let files = scan_all(&targets, &config).context("API scan failed")?;
            let summary = ScanSummary {
                scanned: targets.len(),
                duration_ms: start.elapsed().as_millis() as u64,
                files: files
                    .iter()
                    .map(|p| p.to_string_lossy().to_string())
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

#[derive(Debug, Serialize)]
struct ScanSummary {
    scanned: usize,
    duration_ms: u64,
    files: Vec<String>,
}
