//! Hubmap CLI: find the import hubs between your features and a UI package.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hubmap_core::config::{AnalysisConfig, AnalysisResult};
use hubmap_core::error::AnalysisError;
use hubmap_core::output::{output_path_for, read_facts, write_output};
use hubmap_core::pipeline;

#[derive(Parser)]
#[command(
    name = "hubmap",
    version,
    about = "Hubmap - Find the shared import hubs behind a package's usage"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a JavaScript/TypeScript repository
    Analyze {
        /// Path to the repository to analyse
        path: PathBuf,

        /// Package whose usage seeds the analysis (repeatable)
        #[arg(short, long = "package", required = true)]
        packages: Vec<String>,

        /// Glob patterns of files to analyse
        #[arg(long)]
        include: Vec<String>,

        /// Glob patterns of files to leave out
        #[arg(long)]
        exclude: Vec<String>,

        /// Import alias as PATTERN=TARGET, e.g. "@/*=src/*"
        #[arg(long = "alias", value_parser = parse_alias)]
        aliases: Vec<(String, String)>,

        /// Output JSON file path
        #[arg(short, long)]
        output: Option<String>,

        /// Maximum hops per importer chain
        #[arg(long)]
        max_depth: Option<usize>,

        /// Debug logging and per-phase timings
        #[arg(long)]
        verbose: bool,

        /// Suppress all output except errors
        #[arg(long)]
        quiet: bool,
    },
    /// Analyse a pre-extracted facts document
    Report {
        /// JSON facts file
        facts: PathBuf,

        /// Packages to track; defaults to every package in the facts
        #[arg(short, long = "package")]
        packages: Vec<String>,

        /// Output JSON file path
        #[arg(short, long)]
        output: Option<String>,

        /// Maximum hops per importer chain
        #[arg(long)]
        max_depth: Option<usize>,

        #[arg(long)]
        verbose: bool,

        #[arg(long)]
        quiet: bool,
    },
}

fn parse_alias(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((pattern, target)) if !pattern.is_empty() && !target.is_empty() => {
            Ok((pattern.to_string(), target.to_string()))
        }
        _ => Err(format!("expected PATTERN=TARGET, got `{raw}`")),
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(env_filter)
        .init();
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            path,
            packages,
            include,
            exclude,
            aliases,
            output,
            max_depth,
            verbose,
            quiet,
        } => {
            init_logging(verbose, quiet);
            let repo_path = path.canonicalize().unwrap_or(path);
            let repo_name = repo_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "repo".to_string());
            let config = AnalysisConfig {
                repo_path: repo_path.to_string_lossy().to_string(),
                output_path: output,
                tracked_packages: packages,
                include_patterns: include,
                exclude_patterns: exclude,
                aliases: aliases.into_iter().collect(),
                max_chain_depth: max_depth,
                verbose,
                quiet,
                ..Default::default()
            };

            run(&config, &repo_name, |progress| {
                pipeline::run_pipeline(&config, progress)
            });
        }
        Commands::Report {
            facts,
            packages,
            output,
            max_depth,
            verbose,
            quiet,
        } => {
            init_logging(verbose, quiet);
            let title = facts
                .file_stem()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "facts".to_string());
            let config = AnalysisConfig {
                output_path: output,
                tracked_packages: packages,
                max_chain_depth: max_depth,
                verbose,
                quiet,
                ..Default::default()
            };

            run(&config, &title, |progress| {
                let records = read_facts(&facts)?;
                pipeline::analyze_facts(&config, records, progress)
            });
        }
    }
}

fn run<F>(config: &AnalysisConfig, title: &str, analyse: F)
where
    F: FnOnce(Option<pipeline::ProgressCallback>) -> Result<AnalysisResult, AnalysisError>,
{
    let pb = if config.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
            pb.set_style(spinner.tick_strings(&[
                "⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏",
            ]));
        }
        pb.set_message("Initialising...");
        pb.enable_steady_tick(std::time::Duration::from_millis(80));
        pb
    };

    let progress: pipeline::ProgressCallback = {
        let pb = pb.clone();
        Box::new(move |_name, label| {
            pb.set_message(label.to_string());
        })
    };

    let start = Instant::now();
    let result = match analyse(Some(progress)) {
        Ok(r) => r,
        Err(e) => {
            pb.finish_and_clear();
            eprintln!("Analysis failed: {e}");
            std::process::exit(1);
        }
    };
    pb.finish_and_clear();

    let output_path = output_path_for(config, title);
    if let Err(e) = write_output(&result, &output_path) {
        eprintln!("Error writing output: {e}");
        std::process::exit(1);
    }

    if !config.quiet {
        print_summary(&result, title, start, config.verbose);
        println!(
            "\n  {} {}",
            style("Output written to:").green(),
            Path::new(&output_path).display()
        );
    }
}

fn print_summary(result: &AnalysisResult, title: &str, start: Instant, verbose: bool) {
    let stats = &result.intersections.stats;
    println!(
        "\n{}  Hubmap Analysis: {}",
        style("✓").green().bold(),
        style(title).bold()
    );
    println!("  {:<16} {}", "Packages:", stats.tracked_packages);
    println!("  {:<16} {}", "Target files:", stats.target_files);
    println!("  {:<16} {}", "Intersections:", stats.intersections);
    println!(
        "  {:<16} {} ({} main, {} intermediate, {} base, {} isolated)",
        "Hubs:",
        stats.hubs,
        stats.main_hubs,
        stats.intermediate_hubs,
        stats.base_hubs,
        stats.isolated_hubs
    );
    println!("  {:<16} {}", "Features:", stats.features);
    println!(
        "  {:<16} {:.1}ms",
        "Duration:",
        start.elapsed().as_secs_f64() * 1000.0
    );

    if verbose {
        if let Some(serde_json::Value::Object(timings)) = result.metadata.get("phase_timings") {
            println!("\n  Phase Timings:");
            for (phase, secs) in timings {
                if let Some(val) = secs.as_f64() {
                    println!("    {:<14} {:.1}ms", phase, val * 1000.0);
                }
            }
        }

        let top: Vec<_> = result.intersections.global_import_hubs.iter().take(5).collect();
        if !top.is_empty() {
            println!("\n  Top hubs:");
            for hub in top {
                let category = hub.category.map(|c| c.as_str()).unwrap_or("-");
                println!(
                    "    {:<24} {:>3} intersections  {:>4} chains  {}",
                    hub.name,
                    hub.intersection_count,
                    hub.chain_count,
                    style(category).dim()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_argument_parsing() {
        assert_eq!(
            parse_alias("@/*=src/*"),
            Ok(("@/*".to_string(), "src/*".to_string()))
        );
        assert!(parse_alias("nope").is_err());
        assert!(parse_alias("=src").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
