//! Integration tests for the CLI interface

mod common;

use common::CliEnv;
use predicates::prelude::*;

#[test]
fn test_cli_help_flag() {
    let env = CliEnv::new();
    env.command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"));
}

#[test]
fn test_invalid_command() {
    let env = CliEnv::new();
    env.command()
        .arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_parse_prints_pipeline() {
    let env = CliEnv::new();
    env.command()
        .args(["parse", "add blur and rotate 15 degrees"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. Blur"))
        .stdout(predicate::str::contains("2. Rotate"))
        .stdout(predicate::str::contains("confidence 1.00"));
}

#[test]
fn test_parse_json_output() {
    let env = CliEnv::new();
    let output = env
        .command()
        .args(["parse", "--json", "motion blur"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let spec: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(spec["transforms"][0]["transform_id"], "MotionBlur");
}

#[test]
fn test_parse_nonsense_exits_with_parse_code() {
    let env = CliEnv::new();
    env.command()
        .args(["parse", "xyzabc nonsense"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Could not understand the prompt"))
        .stderr(predicate::str::contains("try:"));
}

#[test]
fn test_parse_suspicious_prompt_rejected() {
    let env = CliEnv::new();
    env.command()
        .args(["parse", "blur <script>alert(1)</script>"])
        .assert()
        .code(3);
}

#[test]
fn test_run_writes_session_record() {
    let env = CliEnv::new();
    let out = env.path().join("out");
    env.command()
        .args([
            "run",
            "--image",
            "cat.png",
            "--prompt",
            "flip horizontally and add slight noise",
            "--seed",
            "42",
            "--output-dir",
        ])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("completed"))
        .stdout(predicate::str::contains("seed: 42 (request)"));

    let files = env.json_files(&out);
    assert_eq!(files.len(), 1);
    let record: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&files[0]).unwrap()).unwrap();
    assert_eq!(record["final_status"], "completed");
    assert_eq!(record["stage_history"].as_array().unwrap().len(), 8);
}

#[test]
fn test_run_is_reproducible_with_seed() {
    let env = CliEnv::new();
    let run = || {
        let output = env
            .command()
            .args(["run", "--image", "cat.png", "--preset", "portrait", "--seed", "7", "--json"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        summary["output_image"]["id"].clone()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_run_requires_prompt_or_preset() {
    let env = CliEnv::new();
    env.command()
        .args(["run", "--image", "cat.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--prompt"));
}

#[test]
fn test_run_oversized_image_fails_at_intake() {
    let env = CliEnv::new();
    env.command()
        .args([
            "run", "--image", "big.png", "--prompt", "flip", "--width", "20000",
        ])
        .assert()
        .code(8)
        .stdout(predicate::str::contains("failed"))
        .stderr(predicate::str::contains("pre_intake"));
}

#[test]
fn test_transforms_and_presets_listings() {
    let env = CliEnv::new();
    env.command()
        .arg("transforms")
        .assert()
        .success()
        .stdout(predicate::str::contains("MotionBlur"))
        .stdout(predicate::str::contains("CLAHE"));

    env.command()
        .arg("presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("segmentation"))
        .stdout(predicate::str::contains("lowlight"));
}

#[test]
fn test_status_uses_config_file() {
    let env = CliEnv::new();
    let config = env.write_config(
        r#"
default_seed = 1234

[pipeline]
run_timeout = "1m"
"#,
    );
    env.command()
        .arg("status")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Default seed: 1234"))
        .stdout(predicate::str::contains("run 1m"))
        .stdout(predicate::str::contains("intake_guard"));
}

#[test]
fn test_missing_config_file_is_configuration_error() {
    let env = CliEnv::new();
    env.command()
        .args(["status", "--config"])
        .arg(env.path().join("nope.toml"))
        .assert()
        .code(7)
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn test_invalid_config_value_rejected() {
    let env = CliEnv::new();
    let config = env.write_config("[pipeline]\nhook_timeout = \"0s\"\n");
    env.command()
        .arg("status")
        .arg("-c")
        .arg(&config)
        .assert()
        .code(7);
}
