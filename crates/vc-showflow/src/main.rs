use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "showflow-clean")]
#[command(about = "Remove duration, in and out metadata from a showflow file", long_about = None)]
struct Args {
    /// Showflow JSON file, rewritten in place
    #[arg(default_value = "flow/showflow.json")]
    path: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level))
        )
        .with_target(false)
        .init();

    info!("Cleaning showflow: {}", args.path.display());

    let Some(report) = vc_showflow::clean_file(&args.path)? else {
        println!("No slots found in showflow file");
        return Ok(());
    };

    println!("[OK] Cleaned up: {}", args.path.display());
    println!("  - Removed {} clip duration/in/out fields", report.clip_fields_removed);
    println!("  - Removed {} slot durations", report.slot_durations_removed);
    println!("  - Simplified {} clips to just names", report.clips_simplified);
    Ok(())
}
