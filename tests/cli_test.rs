use bookrec_etl::config::slurm::JobScript;
use bookrec_etl::AcquisitionSchedule;
use chrono::NaiveDate;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn acquisition_command() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_obtain-historical-data"));
    // 不會真的發出請求；指向關閉的本機埠
    cmd.env("NYT_API_KEY", "cli-key")
        .env("BOOKS_BASE_URL", "http://127.0.0.1:9/svc/books/v3")
        .env("ARTICLES_BASE_URL", "http://127.0.0.1:9/svc/search/v2")
        .env_remove("RUST_LOG");
    cmd
}

fn slurm_command() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_slurm-job"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write_schedule(dir: &Path) -> String {
    let path = dir.join("acquisition_dates.csv");
    AcquisitionSchedule::generate(2010, 2011, NaiveDate::from_ymd_opt(2024, 7, 6).unwrap())
        .unwrap()
        .write_to_file(&path)
        .unwrap();
    path.to_str().unwrap().to_string()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn json_messages(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .filter_map(|v| v["fields"]["message"].as_str().map(str::to_string))
        .collect()
}

#[test]
fn test_no_schedule_match_exits_cleanly() {
    let temp_dir = TempDir::new().unwrap();
    let schedule = write_schedule(temp_dir.path());

    let output = acquisition_command()
        .args(["--schedule", &schedule, "--date", "2030-01-01", "--log-json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.lines().any(|l| l == "No match for acquisition date."));

    let messages = json_messages(&out);
    assert!(messages.iter().any(|m| m.contains("Starting historical bestseller acquisition")));
    assert!(messages.iter().any(|m| m.contains("Loading acquisition schedule")));
    assert!(messages.iter().any(|m| m == "No match for acquisition date."));
}

#[test]
fn test_dry_run_with_explicit_range_ignores_schedule() {
    let output = acquisition_command()
        .args([
            "--schedule",
            "does/not/exist.csv",
            "--start",
            "2014-01-01",
            "--end",
            "2014-06-30",
            "--dry-run",
        ])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Window: 2014-01-01 → 2014-06-30"));
    assert!(out.contains("List requests: 182 (limit 500)"));
}

#[test]
fn test_inverted_range_is_a_configuration_failure() {
    let output = acquisition_command()
        .args(["--start", "2014-06-30", "--end", "2014-01-01", "--dry-run"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("配置錯誤"));
}

#[test]
fn test_missing_schedule_names_the_path() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.csv");
    let missing = missing.to_str().unwrap();

    let output = acquisition_command()
        .args(["--schedule", missing, "--date", "2024-07-06", "--log-json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("nope.csv"));
    assert!(err.contains("create-schedule"));
    assert!(json_messages(&stdout(&output))
        .iter()
        .any(|m| m.contains("Acquisition failed")));
}

#[test]
fn test_missing_api_key_is_reported() {
    let output = acquisition_command()
        .env_remove("NYT_API_KEY")
        .args(["--start", "2014-01-01", "--end", "2014-06-30", "--dry-run"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("NYT_API_KEY"));
}

#[test]
fn test_slurm_check_continues_past_bad_files() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.sh");
    let good = temp_dir.path().join("daily.sh");
    std::fs::write(
        &good,
        JobScript::daily_fetch()
            .with_mail_user("someone@example.edu")
            .render(),
    )
    .unwrap();
    let broken = temp_dir.path().join("broken.sh");
    std::fs::write(&broken, "#!/bin/bash\n#SBATCH --gres=gpu:1\n").unwrap();

    let output = slurm_command()
        .arg("check")
        .arg(&missing)
        .arg(&good)
        .arg(&broken)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("daily.sh (obtain_historical_data, 24:00:00 on normal)"));
    let err = stderr(&output);
    assert!(err.contains("missing.sh"));
    assert!(err.contains("broken.sh"));
}

#[test]
fn test_slurm_render_then_check() {
    let temp_dir = TempDir::new().unwrap();
    let script = temp_dir.path().join("short.sh");

    let render = slurm_command()
        .args(["render", "--preset", "short", "--mail-user", "someone@example.edu", "-o"])
        .arg(&script)
        .output()
        .unwrap();
    assert!(render.status.success(), "stderr: {}", stderr(&render));

    let check = slurm_command().arg("check").arg(&script).output().unwrap();
    assert_eq!(check.status.code(), Some(0), "stderr: {}", stderr(&check));
}
