use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{Context, Result};
use clap::Parser;
use humansize::{format_size, DECIMAL};
use log::{info, warn};
use squeeze::{
    artifact, batch, scan,
    config::{SqueezeConfig, DEFAULT_BATCH_SIZE},
    EncodeProfile, FfmpegEncoder,
};

/// Re-encode the largest MP4 files under a directory, keeping smaller results
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory tree to scan
    #[arg(default_value = ".")]
    root: PathBuf,

    /// How many of the largest files to process
    #[arg(short = 'n', long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Maximum number of ffmpeg processes running at once
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,

    /// Path to the ffmpeg binary
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// List the files that would be processed and exit
    #[arg(long)]
    dry_run: bool,

    /// Do not check ffmpeg and its encoders before starting
    #[arg(long)]
    skip_preflight: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn to_config(&self) -> SqueezeConfig {
        SqueezeConfig {
            batch_size: self.batch_size,
            jobs: self.jobs,
            ffmpeg_bin: self.ffmpeg.clone(),
            ..SqueezeConfig::default_config().with_root(&self.root)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins; otherwise info, or debug with --verbose
    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();

    let cfg = args.to_config();
    cfg.validate().context("Invalid configuration")?;
    let cfg = cfg.canonicalize_root()?;

    info!("vsqueeze starting");
    info!("  Root: {}", cfg.root.display());
    info!("  Batch size: {}", cfg.batch_size);
    info!("  Jobs: {}", cfg.jobs);
    info!("  ffmpeg: {}", cfg.ffmpeg_bin.display());

    let profile = EncodeProfile::WEB;
    let encoder = Arc::new(FfmpegEncoder::new(cfg.ffmpeg_bin.clone()));

    if !args.skip_preflight && !args.dry_run {
        encoder
            .preflight(&profile)
            .await
            .context("ffmpeg preflight failed")?;
    }

    info!("Scanning for {} files...", cfg.extension.to_uppercase());
    let report = tokio::task::spawn_blocking({
        let root = cfg.root.clone();
        let extension = cfg.extension.clone();
        move || scan::scan_tree(&root, &extension)
    })
    .await
    .context("Scan task failed")?;

    if report.unreadable > 0 {
        warn!("Skipped {} unreadable entries", report.unreadable);
    }

    if !report.orphans.is_empty() && !args.dry_run {
        let removed = artifact::sweep_orphans(&report.orphans);
        info!("Cleaned up {} leftover temp artifact(s)", removed);
    }

    let found = report.candidates.len();
    let selected = scan::select_largest(report.candidates, cfg.batch_size);
    info!(
        "Found {} videos. Processing top {} largest...",
        found,
        selected.len()
    );

    if args.dry_run {
        for (i, candidate) in selected.iter().enumerate() {
            info!(
                "[{}/{}] {} ({})",
                i + 1,
                selected.len(),
                candidate.path.display(),
                format_size(candidate.size, DECIMAL)
            );
        }
        return Ok(());
    }

    info!("{}", "-".repeat(50));
    let summary = batch::run_batch(encoder, selected, cfg.jobs, profile).await;
    info!("{}", "-".repeat(50));

    if summary.failed > 0 {
        warn!("{} file(s) failed; see errors above", summary.failed);
    }

    Ok(())
}
