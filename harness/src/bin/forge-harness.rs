//! `forge-harness` — runs the full autonomy-tier policy matrix and prints
//! a pass/fail summary, for use in CI alongside `cargo test`.

use anyhow::Result;
use clap::Parser;

use forge_harness::TestRunner;

#[derive(Parser)]
#[command(name = "forge-harness", about = "Run the FORGE autonomy policy matrix")]
struct Cli {
    /// Run only this autonomy tier (0-3). Runs every tier when omitted.
    #[arg(long)]
    level: Option<u8>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let levels: Vec<u8> = match cli.level {
        Some(level) => vec![level],
        None => vec![0, 1, 2, 3],
    };

    let mut total_passed = 0;
    let mut total_failed = 0;

    for level in levels {
        let workspace = tempfile::tempdir()?;
        let runner = TestRunner::new(level, workspace.path());
        let (passed, failed) = runner.run_all();
        total_passed += passed;
        total_failed += failed;
    }

    println!("{total_passed} passed, {total_failed} failed");
    if total_failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
