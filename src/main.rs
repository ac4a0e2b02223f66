mod config;
mod error;
mod fetch;
mod models;
mod parser;
mod pipeline;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use fetch::DamageFetcher;
use models::{CharacterRecord, DamageRecord};
use pipeline::FetchFailure;

#[derive(Parser)]
#[command(name = "bory", about = "Party OCR text → character records → total damage lookup")]
struct Cli {
    /// INI configuration file (default: config.ini, then ~/.bory.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse OCR text into character records
    Parse {
        /// OCR text file (default: stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Fetch one character page and print its total damage
    Damage {
        url: String,
    },
    /// Parse OCR text, then fetch total damage for every character
    Run {
        /// OCR text file (default: stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// URL template with a {name} placeholder (default: from config)
        #[arg(short, long)]
        template: Option<String>,
        /// Where the captured screenshot was stored
        #[arg(long)]
        screenshot: Option<PathBuf>,
        /// Parallel fetches (default: from config)
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Print the resolved configuration
    Config,
}

fn init_tracing(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let t0 = Instant::now();
    let cli = Cli::parse();

    let cfg = config::load(cli.config.as_deref())?;
    init_tracing(&cfg.log_level);
    info!(config_path = ?cfg.config_path_used, "Configuration loaded");

    match cli.command {
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&cfg)?);
        }
        Commands::Parse { input, json } => {
            let text = read_input(input.as_deref())?;
            let records = parser::parse_records(&text);
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No characters found.");
            } else {
                print_records(&records);
            }
        }
        Commands::Damage { url } => {
            let fetcher = DamageFetcher::with_policy(cfg.retry_policy()?);
            let page = fetcher
                .fetch_page(&url)
                .await
                .with_context(|| format!("Failed to fetch {}", url))?;
            info!(attempts = page.attempts, backoffs = ?page.backoffs, "Page fetched");
            let damage = fetch::extract::total_damage(&page.body)
                .with_context(|| format!("No total damage on {}", url))?;
            println!("{}", damage);
        }
        Commands::Run {
            input,
            template,
            screenshot,
            concurrency,
            json,
        } => {
            let text = read_input(input.as_deref())?;
            let snapshot = pipeline::capture_snapshot(&text, screenshot, cfg.max_party_members);
            if snapshot.characters().is_empty() {
                println!("No characters found. Recapture with the party list visible.");
                return Ok(());
            }

            let template = template.unwrap_or_else(|| cfg.url_template.clone());
            let concurrency = concurrency.unwrap_or(cfg.fetch_concurrency);
            let fetcher = Arc::new(DamageFetcher::with_policy(cfg.retry_policy()?));

            println!("Fetching total damage for {} characters...", snapshot.characters().len());
            let summary =
                pipeline::fetch_damages(fetcher, &template, snapshot.characters(), concurrency).await;
            let snapshot = snapshot.superseded_by(summary.damages);

            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                println!(
                    "Snapshot {}{}",
                    snapshot.captured_at().format("%Y-%m-%d %H:%M:%S UTC"),
                    snapshot
                        .screenshot()
                        .map(|p| format!(" ({})", p.display()))
                        .unwrap_or_default()
                );
                print_damages(snapshot.damages());
            }
            print_failures(&summary.failures);
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("Failed to read {:?}", p)),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read OCR text from stdin")?;
            Ok(buf)
        }
    }
}

fn print_records(records: &[CharacterRecord]) {
    println!("{:>3} | {:<16} | {:<16} | {:>10}", "#", "Name", "Job", "Fame");
    println!("{}", "-".repeat(55));
    for (i, r) in records.iter().enumerate() {
        println!(
            "{:>3} | {:<16} | {:<16} | {:>10}",
            i + 1,
            truncate(&r.name, 16),
            truncate(r.job.as_deref().unwrap_or("-"), 16),
            r.fame.map(|f| f.to_string()).unwrap_or_else(|| "-".into())
        );
    }
}

fn print_damages(damages: &[DamageRecord]) {
    println!(
        "{:>3} | {:<16} | {:<16} | {:>10} | {:>12}",
        "#", "Name", "Job", "Fame", "Damage"
    );
    println!("{}", "-".repeat(70));
    for (i, d) in damages.iter().enumerate() {
        println!(
            "{:>3} | {:<16} | {:<16} | {:>10} | {:>12}",
            i + 1,
            truncate(&d.name, 16),
            truncate(d.job.as_deref().unwrap_or("-"), 16),
            d.fame.map(|f| f.to_string()).unwrap_or_else(|| "-".into()),
            d.damage
        );
    }
}

fn print_failures(failures: &[FetchFailure]) {
    if failures.is_empty() {
        return;
    }
    println!("\n--- Failed ({}) ---", failures.len());
    for f in failures {
        println!("  {}: {}", f.name, f.error);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("보리사랑", 16), "보리사랑");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }

    #[test]
    fn cli_parses_run() {
        let cli = Cli::try_parse_from([
            "bory", "--config", "x.ini", "run", "-i", "ocr.txt", "-j", "3", "--json",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some(Path::new("x.ini")));
        match cli.command {
            Commands::Run {
                input,
                concurrency,
                json,
                template,
                ..
            } => {
                assert_eq!(input.as_deref(), Some(Path::new("ocr.txt")));
                assert_eq!(concurrency, Some(3));
                assert!(json);
                assert!(template.is_none());
            }
            _ => panic!("expected run"),
        }
    }
}
