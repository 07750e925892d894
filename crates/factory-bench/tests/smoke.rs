use std::fs;

use factory_bench::config::LevelConfig;
use factory_bench::runner::LevelRunner;
use tempfile::tempdir;

fn load_config(output_dir: &std::path::Path) -> LevelConfig {
    let yaml = format!(
        r#"
name: "test_smoke"
seed: 4242
script: |
  let bag = list()
  bag.define([{{red: 70, blue: 30}}, {{red: 30, blue: 70}}])
  bag.permute()
  export left = bag.select(0) for betting
  export right = bag.select(1)
  schedule([(left, 0.5), (right, 1.5), ("left", 2.5)])
  buckets(4)
layout:
  - id: "left"
    kind: "sack"
    position: [60.0, 40.0]
    outputs: ["mix"]
  - id: "right"
    kind: "sack"
    position: [180.0, 40.0]
    outputs: ["mix"]
  - id: "mix"
    kind: "mixer"
    position: [120.0, 140.0]
    outputs: ["belt"]
    plex: true
  - id: "belt"
    kind: "conveyor"
    position: [120.0, 220.0]
    outputs: ["out"]
  - id: "out"
    kind: "bin"
    position: [240.0, 220.0]
submission:
  picks: [0.5, 0.5]
outputs:
  report_jsonl: "{report}"
logging:
  enable_structured: false
"#,
        report = output_dir.join("report.jsonl").display()
    );

    let mut cfg: LevelConfig = serde_yaml::from_str(&yaml).expect("valid yaml");
    cfg.validate().expect("config validates");
    cfg
}

#[test]
fn level_smoke_test_produces_a_stable_report() {
    let dir = tempdir().expect("temp dir");
    let config = load_config(dir.path());
    let outputs = config.resolved_outputs();

    let runner = LevelRunner::new(config.clone(), outputs.clone());
    let first = runner.run().expect("run completes");

    assert!(first.script_errors.is_empty());
    assert_eq!(first.hypothesis_count, 2);
    assert_eq!(first.ball_count, 3);
    assert!((first.divergence.unwrap() - std::f64::consts::LN_2).abs() < 1e-9);
    assert_eq!(first.stars, Some(1));

    // A second run with the same seed appends an identical row.
    let second = LevelRunner::new(config, outputs).run().expect("second run");
    assert_eq!(first.divergence, second.divergence);
    assert_eq!(first.ticks_rendered, second.ticks_rendered);

    let report = fs::read_to_string(&first.report_path).expect("report exists");
    let rows: Vec<&str> = report.lines().collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], rows[1]);

    let parsed: serde_json::Value = serde_json::from_str(rows[0]).expect("row is json");
    assert_eq!(parsed["name"], "test_smoke");
    assert_eq!(parsed["hypothesis_count"], 2);
    assert_eq!(parsed["ball_count"], 3);

    let history_path = first.report_path.with_file_name("history.jsonl");
    let history = fs::read_to_string(history_path).expect("history exists");
    assert_eq!(history.lines().count(), 2);
    let record: serde_json::Value =
        serde_json::from_str(history.lines().next().unwrap()).expect("record is json");
    assert_eq!(record["stars"], 1);
}
