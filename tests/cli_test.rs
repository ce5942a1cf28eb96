//! Exit codes and artifacts of the three binaries

use std::fs;
use std::process::Command;

fn write_study(dir: &std::path::Path) -> std::path::PathBuf {
    let mut text = String::from("x1,x2,y\n");
    for i in 0..30_u32 {
        let y = 2.0 * f64::from(i) - f64::from((i * 7) % 11) + f64::from(i % 4) * 0.25;
        text.push_str(&format!("{i},{},{y}\n", (i * 7) % 11));
    }
    let path = dir.join("study.csv");
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn test_analyze_missing_dataset_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let outdir = dir.path().join("out");
    let log = dir.path().join("run.log");

    let status = Command::new(env!("CARGO_BIN_EXE_analyze"))
        .arg(dir.path().join("absent.csv"))
        .args(["--outcome", "y", "--predictors", "x1"])
        .arg("--outdir")
        .arg(&outdir)
        .arg("--log")
        .arg(&log)
        .status()
        .unwrap();

    assert!(!status.success());
    assert!(!outdir.exists());
    let logged = fs::read_to_string(&log).unwrap();
    assert!(logged.contains("ERROR"));
    assert!(logged.contains("Dataset not found"));
}

#[test]
fn test_analyze_writes_linear_summary() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_study(dir.path());
    let outdir = dir.path().join("out");

    let status = Command::new(env!("CARGO_BIN_EXE_analyze"))
        .arg(&csv)
        .args(["--outcome", "y", "--predictors", "x1", "x2"])
        .arg("--outdir")
        .arg(&outdir)
        .arg("--log")
        .arg(dir.path().join("run.log"))
        .status()
        .unwrap();

    assert!(status.success());
    assert!(outdir.join("linear_summary.txt").exists());
}

#[test]
fn test_validate_writes_cv_results() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_study(dir.path());
    let outdir = dir.path().join("out");

    let status = Command::new(env!("CARGO_BIN_EXE_validate"))
        .arg(&csv)
        .args(["--outcome", "y", "--predictors", "x1", "x2", "--folds", "3"])
        .arg("--outdir")
        .arg(&outdir)
        .status()
        .unwrap();

    assert!(status.success());
    let results = fs::read_to_string(outdir.join("cv_results.csv")).unwrap();
    assert!(results.starts_with("fold1,fold2,fold3\n"));
}

#[test]
fn test_validate_rejects_unknown_model() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_study(dir.path());

    let status = Command::new(env!("CARGO_BIN_EXE_validate"))
        .arg(&csv)
        .args(["--outcome", "y", "--predictors", "x1", "--model", "forest"])
        .status()
        .unwrap();

    assert!(!status.success());
}

#[test]
fn test_apa_table_markdown_and_latex() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_study(dir.path());
    let md = dir.path().join("table.md");
    let tex = dir.path().join("table.tex");

    let status = Command::new(env!("CARGO_BIN_EXE_apa-table"))
        .arg(&csv)
        .arg("--out")
        .arg(&md)
        .arg("--to-tex")
        .arg(&tex)
        .status()
        .unwrap();

    assert!(status.success());
    let markdown = fs::read_to_string(&md).unwrap();
    assert!(markdown.starts_with("| Variable"));
    assert_eq!(markdown.lines().count(), 5);
    assert!(fs::read_to_string(&tex).unwrap().contains("\\caption{Descriptive Statistics}"));
}
