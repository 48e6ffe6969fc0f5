use anyhow::Result;
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use s3_deploy::{DeployArgs, RunSummary, UploadSpec, deploy};

#[derive(Parser, Debug)]
#[command(
    name = "s3deploy",
    version = env!("CARGO_PKG_VERSION"),
    author = "Tyr Chen <tyr.chen@gmail.com>",
    about = "Upload build artifacts matching a glob to an S3 bucket",
    long_about = "Selects files with an include glob (supports **) minus any exclude globs, maps them under a \
                  target prefix and uploads them one by one. Sets Content-Type from the file extension, \
                  optionally gzips bodies, grants public-read and sets Cache-Control. Stops at the first failure.",
    after_help = "Examples:\n  \
                  s3deploy --bucket my-site --source 'build/**' --strip-prefix build/ --target releases/v1\n  \
                  s3deploy --bucket my-site --source 'dist/**' --exclude 'dist/**/*.map' --compress --acl public\n  \
                  s3deploy --bucket my-site --source 'dist/*.html' --dry-run\n\n\
                  Configuration (.env or environment):\n  \
                  PLUGIN_CREDENTIALS={\"access_key_id\":\"...\",\"secret_access_key\":\"...\"}\n  \
                  AWS_REGION=us-west-2\n  \
                  PLUGIN_BUCKET=my-bucket\n  \
                  PLUGIN_SOURCE=build/**\n\n\
                  For more information: https://github.com/tyrchen/swiss-knife"
)]
struct Cli {
    #[command(flatten)]
    args: DeployArgs,

    /// Load additional environment variables from this file before reading flags
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file early to get LOG_LEVEL
    dotenv::dotenv().ok();

    let mut cli = Cli::parse();
    if let Some(env_file) = &cli.env_file {
        dotenv::from_path(env_file).ok();
        // re-read so values from the env file apply to env-backed flags
        cli = Cli::parse();
    }

    // Initialize tracing/logging with support for LOG_LEVEL from .env
    let log_level = std::env::var("LOG_LEVEL")
        .ok()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    info!("S3 Deploy v{}", env!("CARGO_PKG_VERSION"));

    let spec = match UploadSpec::try_from(cli.args) {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("{} {}", style("✗").red(), e.user_message());
            std::process::exit(1);
        }
    };

    println!(
        "{}",
        style(format!(
            "📦 Target: s3://{}/{}",
            spec.bucket,
            spec.target.trim_start_matches('/')
        ))
        .cyan()
        .bold()
    );
    if spec.dry_run {
        println!(
            "{}",
            style("🔍 DRY RUN MODE - No files will be uploaded")
                .yellow()
                .bold()
        );
    }

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    match deploy(&spec, Some(&pb)).await {
        Ok(summary) => {
            pb.finish_and_clear();
            print_summary(&summary, spec.dry_run, start);
            Ok(())
        }
        Err(e) => {
            pb.abandon();
            eprintln!("{} {}", style("✗").red(), style(e.user_message()).red());
            std::process::exit(1);
        }
    }
}

fn print_summary(summary: &RunSummary, dry_run: bool, start: Instant) {
    let duration = start.elapsed();

    for result in &summary.results {
        let marker = if dry_run {
            style("WOULD UPLOAD").green().bold()
        } else {
            style("✓").green()
        };
        println!(
            "{} {} → {} ({})",
            marker,
            result.entry.path.display(),
            style(&result.entry.target).green(),
            style(&result.entry.content_type).dim()
        );
    }

    println!("\n{}", style("═".repeat(70)).dim());
    let headline = if dry_run {
        format!(
            "Summary: {} file(s) would be uploaded, {} director(ies) skipped",
            summary.planned(),
            summary.skipped_dirs
        )
    } else {
        format!(
            "Summary: {} uploaded, {} director(ies) skipped",
            summary.uploaded(),
            summary.skipped_dirs
        )
    };
    println!("{}", style(headline).bold());

    if !summary.skipped_missing.is_empty() {
        println!(
            "{}",
            style(format!(
                "{} matched path(s) vanished before upload",
                summary.skipped_missing.len()
            ))
            .yellow()
        );
    }

    let (read, written) = summary.bytes();
    if read > 0 {
        println!(
            "{}",
            style(format!(
                "Total read: {}, written: {} ({} bytes)",
                format_size(read),
                format_size(written),
                written
            ))
            .dim()
        );
    }

    if duration.as_secs() > 0 {
        let speed = written as f64 / duration.as_secs_f64() / 1024.0 / 1024.0;
        println!(
            "{}",
            style(format!(
                "Time: {:.2}s, Average speed: {:.2} MB/s",
                duration.as_secs_f64(),
                speed
            ))
            .dim()
        );
    }
}

/// Format file size for display
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
