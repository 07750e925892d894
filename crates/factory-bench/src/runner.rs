use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use factory_core::betting::BettingRound;
use factory_core::hypothesis::HypothesisSpace;
use factory_core::model::level::PlayRecord;
use factory_core::script::{ScriptEngine, ScriptError, ScriptOutput};
use factory_sim::Playback;
use serde::Serialize;
use tracing::info;

use crate::config::{LevelConfig, ResolvedOutputs};

/// Snapshot cadence for the headless replay.
const TICK_SECONDS: f32 = 1.0 / 60.0;

/// Runs one level end-to-end: script execution, hypothesis enumeration,
/// full playback, and (when a submission is recorded) scoring.
pub struct LevelRunner {
    config: LevelConfig,
    outputs: ResolvedOutputs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub name: String,
    pub script_errors: Vec<ScriptError>,
    pub hypothesis_count: usize,
    pub ball_count: usize,
    pub ticks_rendered: usize,
    pub divergence: Option<f64>,
    pub stars: Option<u8>,
    pub report_path: PathBuf,
}

/// One JSONL report row, appended per run.
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    name: &'a str,
    seed: u64,
    script_errors: &'a [ScriptError],
    hypothesis_count: usize,
    ground_truth_index: Option<usize>,
    ball_count: usize,
    playback_duration: f32,
    ticks_rendered: usize,
    divergence: Option<f64>,
    stars: Option<u8>,
}

impl LevelRunner {
    pub fn new(config: LevelConfig, outputs: ResolvedOutputs) -> Self {
        Self { config, outputs }
    }

    pub fn run(&self) -> Result<RunSummary> {
        let seed = self.config.seed();
        let engine = ScriptEngine::new(seed);
        let output = engine.execute(&self.config.script);

        if output.is_clean() {
            self.run_clean(seed, &output)
        } else {
            info!(
                errors = output.errors.len(),
                "script rejected, skipping playback"
            );
            let summary = RunSummary {
                name: self.config.name.clone(),
                script_errors: output.errors.clone(),
                hypothesis_count: 0,
                ball_count: 0,
                ticks_rendered: 0,
                divergence: None,
                stars: None,
                report_path: self.outputs.report_jsonl.clone(),
            };
            self.append_report(&ReportRow {
                name: &self.config.name,
                seed,
                script_errors: &output.errors,
                hypothesis_count: 0,
                ground_truth_index: None,
                ball_count: 0,
                playback_duration: 0.0,
                ticks_rendered: 0,
                divergence: None,
                stars: None,
            })?;
            Ok(summary)
        }
    }

    fn run_clean(&self, seed: u64, output: &ScriptOutput) -> Result<RunSummary> {
        let space = HypothesisSpace::generate(&output.hypothesis_data);
        let ground_truth_index = space.ground_truth_index(&output.hypothesis_data);

        let playback = Playback::build(output, &self.config.layout, seed);
        let mut ticks_rendered = 0usize;
        let mut time = 0.0f32;
        while time <= playback.duration() {
            let _ = playback.snapshot_at(time);
            ticks_rendered += 1;
            time += TICK_SECONDS;
        }

        info!(
            hypotheses = space.len(),
            balls = output.ball_count,
            ticks = ticks_rendered,
            "playback complete"
        );

        let (divergence, stars) = match &self.config.submission {
            Some(submission) => {
                let outcome = self.score(output, &space, ground_truth_index, &submission.picks)?;
                self.append_history(outcome.0, outcome.1)?;
                (Some(outcome.0), Some(outcome.1))
            }
            None => (None, None),
        };

        self.append_report(&ReportRow {
            name: &self.config.name,
            seed,
            script_errors: &[],
            hypothesis_count: space.len(),
            ground_truth_index,
            ball_count: output.ball_count,
            playback_duration: playback.duration(),
            ticks_rendered,
            divergence,
            stars,
        })?;

        Ok(RunSummary {
            name: self.config.name.clone(),
            script_errors: Vec::new(),
            hypothesis_count: space.len(),
            ball_count: output.ball_count,
            ticks_rendered,
            divergence,
            stars,
            report_path: self.outputs.report_jsonl.clone(),
        })
    }

    fn score(
        &self,
        output: &ScriptOutput,
        space: &HypothesisSpace,
        ground_truth_index: Option<usize>,
        picks: &[f64],
    ) -> Result<(f64, u8)> {
        let bucket_count = output
            .bucket_count
            .context("a clean script always fixes a bucket count")?;
        if picks.len() != space.len() {
            bail!(
                "submission has {} picks but the level has {} hypotheses",
                picks.len(),
                space.len()
            );
        }
        let truth_index =
            ground_truth_index.context("a clean script always has a realized hypothesis")?;

        let mut round = BettingRound::new(space.len(), bucket_count, self.config.thresholds);
        for (column, pick) in picks.iter().enumerate() {
            round.pick_probability(column, *pick);
        }
        if space.len() > 2 {
            round
                .normalize()
                .map_err(|err| anyhow::anyhow!("submission cannot be normalized: {err}"))?;
        }
        let truth = space.truth_distribution(truth_index);
        let outcome = round
            .submit(&truth)
            .map_err(|err| anyhow::anyhow!("submission rejected: {err}"))?;
        Ok((outcome.divergence, outcome.stars))
    }

    /// Appends one play-history record next to the report, in the shape
    /// the level-storage collaborator persists.
    fn append_history(&self, divergence: f64, stars: u8) -> Result<()> {
        let timestamp_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);
        let record = PlayRecord {
            divergence,
            stars,
            timestamp_ms,
        };
        let path = self.outputs.report_jsonl.with_file_name("history.jsonl");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating history directory {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening history file {}", path.display()))?;
        let line = record.to_json().context("serializing play record")?;
        writeln!(file, "{line}").context("writing play record")?;
        Ok(())
    }

    fn append_report(&self, row: &ReportRow<'_>) -> Result<()> {
        if let Some(parent) = self.outputs.report_jsonl.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating report directory {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.outputs.report_jsonl)
            .with_context(|| {
                format!(
                    "opening report file {}",
                    self.outputs.report_jsonl.display()
                )
            })?;
        let line = serde_json::to_string(row).context("serializing report row")?;
        writeln!(file, "{line}").context("writing report row")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{LevelRunner, RunSummary};
    use crate::config::LevelConfig;

    fn run_level(yaml: &str) -> RunSummary {
        let mut cfg: LevelConfig = serde_yaml::from_str(yaml).expect("valid yaml");
        cfg.validate().expect("config validates");
        let outputs = cfg.resolved_outputs();
        LevelRunner::new(cfg, outputs).run().expect("run completes")
    }

    fn level_yaml(dir: &std::path::Path, submission: &str) -> String {
        format!(
            r#"
name: "runner_test"
seed: 99
script: |
  let bag = list()
  bag.define([{{red: 70, blue: 30}}, {{red: 30, blue: 70}}])
  bag.permute()
  export left = bag.select(0) for betting
  export right = bag.select(1)
  schedule([(left, 0.5), (right, 1.2)])
  buckets(4)
layout:
  - id: "left"
    kind: "sack"
    position: [60.0, 40.0]
    outputs: ["out"]
  - id: "right"
    kind: "sack"
    position: [180.0, 40.0]
    outputs: ["out"]
  - id: "out"
    kind: "bin"
    position: [120.0, 220.0]
{submission}outputs:
  report_jsonl: "{report}"
"#,
            submission = submission,
            report = dir.join("report.jsonl").display()
        )
    }

    #[test]
    fn clean_level_runs_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let summary = run_level(&level_yaml(dir.path(), ""));
        assert!(summary.script_errors.is_empty());
        assert_eq!(summary.hypothesis_count, 2);
        assert_eq!(summary.ball_count, 2);
        assert!(summary.ticks_rendered > 0);
        assert!(summary.divergence.is_none());
        assert!(summary.report_path.exists());
    }

    #[test]
    fn submission_is_scored_against_ground_truth() {
        let dir = tempfile::tempdir().unwrap();
        let submission = "submission:\n  picks: [0.5, 0.5]\n";
        let summary = run_level(&level_yaml(dir.path(), submission));
        let divergence = summary.divergence.unwrap();
        assert!((divergence - std::f64::consts::LN_2).abs() < 1e-9);
        assert_eq!(summary.stars, Some(1));
    }

    #[test]
    fn broken_script_reports_errors_without_playback() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = level_yaml(dir.path(), "").replace("buckets(4)", "buckets(11)");
        let summary = run_level(&yaml);
        assert!(!summary.script_errors.is_empty());
        assert_eq!(summary.ticks_rendered, 0);
        assert!(summary.report_path.exists());
    }

    #[test]
    fn runs_are_deterministic_for_a_seed() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let submission = "submission:\n  picks: [1.0, 0.0]\n";
        let a = run_level(&level_yaml(dir_a.path(), submission));
        let b = run_level(&level_yaml(dir_b.path(), submission));
        assert_eq!(a.divergence, b.divergence);
        assert_eq!(a.stars, b.stars);
        assert_eq!(a.ticks_rendered, b.ticks_rendered);
    }
}
