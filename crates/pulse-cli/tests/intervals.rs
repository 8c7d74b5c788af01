use assert_cmd::cargo::cargo_bin_cmd;
use serde::Deserialize;
use serde_json::Value;
use std::error::Error;
use std::io::Write;
use tempfile::NamedTempFile;

#[derive(Deserialize)]
struct Sequence {
    kind: String,
    values: Vec<Value>,
}

#[derive(Deserialize)]
struct Summary {
    intervals: usize,
    ectopic: usize,
    long: usize,
    short: usize,
    missed: usize,
    extra: usize,
}

fn simulated_rr() -> Result<Vec<f64>, Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("pulse");
    cmd.args(["simulate-rr", "--seed", "3"]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let seq: Sequence = serde_json::from_slice(&out)?;
    assert_eq!(seq.kind, "rr_ms");
    Ok(seq.values.iter().filter_map(Value::as_f64).collect())
}

#[test]
fn simulated_artefacts_are_found() -> Result<(), Box<dyn Error>> {
    let rr = simulated_rr()?;
    assert_eq!(rr.len(), 350);
    let mut file = NamedTempFile::new()?;
    for v in &rr {
        writeln!(file, "{}", v)?;
    }

    let mut cmd = cargo_bin_cmd!("pulse");
    cmd.args([
        "rr-artefacts",
        "--input",
        &file.path().to_string_lossy(),
        "--summary",
    ]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let summary: Summary = serde_json::from_slice(&out)?;
    assert_eq!(summary.intervals, 350);
    assert!(summary.ectopic >= 2);
    assert!(summary.long >= 1);
    assert!(summary.short >= 1);
    assert!(summary.missed >= 1);
    assert!(summary.extra >= 1);
    Ok(())
}

#[test]
fn full_report_has_every_field() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("pulse");
    cmd.args(["rr-artefacts", "--kind", "rr_s"])
        .write_stdin("0.8\n0.81\n0.79\n0.8\n0.82\n0.78\n");
    let out = cmd.assert().success().get_output().stdout.clone();
    let report: Value = serde_json::from_slice(&out)?;
    for key in [
        "subspace1",
        "subspace2",
        "subspace3",
        "mRR",
        "ectopic",
        "long",
        "short",
        "missed",
        "extra",
        "threshold1",
        "threshold2",
    ] {
        assert_eq!(report[key].as_array().map(Vec::len), Some(6), "{}", key);
    }
    Ok(())
}

#[test]
fn two_column_input_is_rejected() {
    let mut cmd = cargo_bin_cmd!("pulse");
    cmd.args(["rr-artefacts"]).write_stdin("800,810\n790,805\n");
    let assert = cmd.assert().failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("Invalid shape"), "{}", stderr);
}

#[test]
fn converts_intervals_to_indices() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("pulse");
    cmd.args(["convert", "--from", "rr_ms", "--to", "peaks_idx", "--sfreq", "1000"])
        .write_stdin("800\n810\n790\n");
    let out = cmd.assert().success().get_output().stdout.clone();
    let seq: Sequence = serde_json::from_slice(&out)?;
    assert_eq!(seq.kind, "peaks_idx");
    let idx: Vec<u64> = seq.values.iter().filter_map(Value::as_u64).collect();
    assert_eq!(idx, vec![0, 800, 1610, 2400]);
    Ok(())
}

#[test]
fn peaks_vector_round_trip() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("pulse");
    cmd.args(["convert", "--from", "peaks", "--to", "rr_ms", "--sfreq", "100"])
        .write_stdin("1\n0\n0\n0\n0\n1\n0\n0\n1\n");
    let out = cmd.assert().success().get_output().stdout.clone();
    let seq: Sequence = serde_json::from_slice(&out)?;
    let rr: Vec<f64> = seq.values.iter().filter_map(Value::as_f64).collect();
    assert_eq!(rr, vec![50.0, 30.0]);
    Ok(())
}
