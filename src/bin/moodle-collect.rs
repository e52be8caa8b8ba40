//! 対話型フロントエンド
//!
//! 資格情報と対象URLを受け取り、収集したZIPを保存して問題一覧を表示する。

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use moodle_collector::config::DEFAULT_BASE_URL;
use moodle_collector::{today_archive_file_name, MoodleCollector, MoodleConfig};

#[derive(Parser, Debug)]
#[command(name = "moodle-collect", about = "Download all student attachments from a Moodle quiz report as one ZIP")]
struct Args {
    /// Portal origin
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Quiz report URL (prompted if omitted)
    #[arg(short, long)]
    target_url: Option<String>,

    /// Moodle username (prompted if omitted)
    #[arg(short, long)]
    username: Option<String>,

    /// Directory the ZIP is written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Also write a JSON report next to the ZIP
    #[arg(long)]
    report: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn prompt_if_missing(value: Option<String>, label: &str) -> io::Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => prompt(label),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "info,moodle_collector=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    println!("=== Moodle Downloader ===");
    println!("Provide your Moodle login credentials and the target URL to download all student files.\n");

    let username = prompt_if_missing(args.username, "Username")?;
    let password = prompt("Password")?;
    let target_url = prompt_if_missing(args.target_url, "Target URL")?;

    let config = MoodleConfig::new(&username, &password).with_base_url(&args.base_url);
    let collector = MoodleCollector::from_config(config)?;

    if let Err(e) = collector.client().try_login(&username, &password).await {
        bail!("Error during login: {}", e);
    }

    let (archive, outcome) = match collector.collect_archive(&target_url).await {
        Ok(result) => result,
        Err(e) => bail!("Error during file download: {}", e),
    };

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;

    let zip_path = args.output_dir.join(today_archive_file_name());
    std::fs::write(&zip_path, &archive)
        .with_context(|| format!("writing {}", zip_path.display()))?;
    println!(
        "Saved {} ({} folders, {} files, {} bytes)",
        zip_path.display(),
        outcome.collected.len(),
        outcome.collected.file_count(),
        archive.len()
    );

    if args.report {
        let report_path = zip_path.with_extension("json");
        let json = serde_json::to_string_pretty(&outcome.report())?;
        std::fs::write(&report_path, json)
            .with_context(|| format!("writing {}", report_path.display()))?;
        println!("Report: {}", report_path.display());
    }

    let diagnostics = outcome.diagnostics();
    if !diagnostics.is_empty() {
        println!("\nThe following students had issues with their uploads:");
        for line in diagnostics {
            println!("  {}", line);
        }
    }

    Ok(())
}
