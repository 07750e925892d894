use std::path::PathBuf;

use clap::Parser;

use factory_bench::config::{LevelConfig, ResolvedOutputs};
use factory_bench::logging::init_logging;
use factory_bench::runner::LevelRunner;

/// Headless harness for Bayesian Factory levels.
#[derive(Debug, Parser)]
#[command(
    name = "factory-bench",
    author,
    version,
    about = "Deterministic headless runner for factory levels"
)]
struct Cli {
    /// Path to the YAML level file.
    #[arg(short, long, value_name = "FILE", default_value = "levels/level.yaml")]
    level: PathBuf,

    /// Override the RNG seed for permutes and ball colors.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Exit after validating the level (no playback is run).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = LevelConfig::from_path(&cli.level)?;

    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let name = config.name.clone();
    let seed = config.seed();

    println!("Loaded level '{name}' (seed {seed})");

    let _logging_guard = init_logging(&config.logging, &outputs)?;

    if cli.validate_only {
        println!("Validation-only mode: playback skipped.");
        return Ok(());
    }

    let runner = LevelRunner::new(config, outputs);
    let summary = runner.run()?;

    if summary.script_errors.is_empty() {
        println!(
            "Run complete for '{name}': {} hypotheses, {} balls, {} ticks",
            summary.hypothesis_count, summary.ball_count, summary.ticks_rendered
        );
    } else {
        println!(
            "Script rejected for '{name}' with {} error{}:",
            summary.script_errors.len(),
            if summary.script_errors.len() == 1 { "" } else { "s" }
        );
        for error in &summary.script_errors {
            println!("  {error}");
        }
    }

    if let (Some(divergence), Some(stars)) = (summary.divergence, summary.stars) {
        println!("Submission scored: KL divergence {divergence:.4} → {stars}★");
    }
    println!("Report: {}", summary.report_path.display());

    Ok(())
}
