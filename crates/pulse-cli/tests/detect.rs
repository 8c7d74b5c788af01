use assert_cmd::cargo::cargo_bin_cmd;
use serde::Deserialize;
use std::error::Error;
use std::f64::consts::PI;
use std::io::Write;
use tempfile::NamedTempFile;

#[derive(Deserialize)]
struct DetectionOutput {
    sfreq: f64,
    signal_len: usize,
    peaks_idx: Vec<usize>,
    troughs_idx: Option<Vec<usize>>,
}

const RR: [f64; 8] = [0.82, 0.78, 0.8, 0.79, 0.81, 0.77, 0.84, 0.88];

fn ecg_at_1000hz() -> Vec<f64> {
    let mut beats = vec![0.5];
    for &interval in &RR {
        let last = beats[beats.len() - 1];
        beats.push(last + interval);
    }
    let duration = beats[beats.len() - 1] + 1.0;
    (0..(duration * 1000.0) as usize)
        .map(|i| {
            let t = i as f64 / 1000.0;
            let wave: f64 = beats
                .iter()
                .map(|b| 1.2 * (-0.5 * ((t - b) / 0.02).powi(2)).exp())
                .sum();
            0.05 * (2.0 * PI * t).sin() + wave
        })
        .collect()
}

fn write_lines(values: &[f64]) -> Result<NamedTempFile, Box<dyn Error>> {
    let mut file = NamedTempFile::new()?;
    for v in values {
        writeln!(file, "{}", v)?;
    }
    Ok(file)
}

#[test]
fn ecg_peaks_with_every_method() -> Result<(), Box<dyn Error>> {
    let file = write_lines(&ecg_at_1000hz())?;
    let path = file.path().to_string_lossy().to_string();
    for method in ["pan-tompkins", "moving-average", "hamilton", "engelse-zeelenberg"] {
        let mut cmd = cargo_bin_cmd!("pulse");
        cmd.args(["ecg-peaks", "--input", &path, "--method", method, "--find-local"]);
        let out = cmd.assert().success().get_output().stdout.clone();
        let value: DetectionOutput = serde_json::from_slice(&out)?;
        assert_eq!(value.sfreq, 1000.0);
        assert_eq!(value.peaks_idx.len(), RR.len() + 1, "{}", method);
        assert_eq!(value.peaks_idx[0], 500, "{}", method);
        assert!(value.troughs_idx.is_none());
    }
    Ok(())
}

#[test]
fn unknown_ecg_method_fails() {
    let mut cmd = cargo_bin_cmd!("pulse");
    cmd.args(["ecg-peaks", "--method", "christov"])
        .write_stdin("0\n1\n0\n");
    cmd.assert().failure();
}

#[test]
fn ppg_peaks_from_csv_column() -> Result<(), Box<dyn Error>> {
    let fs = 75.0;
    let mut beats = Vec::new();
    let mut t = 1.0;
    for k in 0..36 {
        beats.push(t);
        t += 0.8 + 0.06 * (k as f64 * 0.7).sin();
    }
    let mut file = NamedTempFile::new()?;
    writeln!(file, "time,ppg")?;
    for i in 0..(30.0 * fs) as usize {
        let t = i as f64 / fs;
        let mut v = 50.0;
        for &b in &beats {
            v += 100.0 * (-0.5 * ((t - b) / 0.08).powi(2)).exp();
            v += 35.0 * (-0.5 * ((t - b - 0.3) / 0.06).powi(2)).exp();
        }
        writeln!(file, "{},{}", t, v)?;
    }

    let mut cmd = cargo_bin_cmd!("pulse");
    cmd.args([
        "ppg-peaks",
        "--csv",
        &file.path().to_string_lossy(),
        "--column",
        "ppg",
        "--sfreq",
        "75",
    ]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let value: DetectionOutput = serde_json::from_slice(&out)?;
    assert_eq!(value.signal_len, 30_000);
    assert_eq!(value.peaks_idx.len(), 36);
    Ok(())
}

#[test]
fn rsp_troughs_only() -> Result<(), Box<dyn Error>> {
    let breathing: Vec<f64> = (0..3000)
        .map(|i| (2.0 * PI * i as f64 / 50.0 / 4.0).sin())
        .collect();
    let file = write_lines(&breathing)?;
    let mut cmd = cargo_bin_cmd!("pulse");
    cmd.args([
        "rsp-peaks",
        "--input",
        &file.path().to_string_lossy(),
        "--sfreq",
        "50",
        "--kind",
        "troughs",
    ]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let value: DetectionOutput = serde_json::from_slice(&out)?;
    assert!(value.peaks_idx.is_empty());
    assert_eq!(value.troughs_idx.map(|t| t.len()), Some(15));
    Ok(())
}

#[test]
fn config_file_selects_detector() -> Result<(), Box<dyn Error>> {
    let mut config = NamedTempFile::new()?;
    writeln!(config, "[ecg]\nmethod = \"hamilton\"\nfind_local = true")?;
    let file = write_lines(&ecg_at_1000hz())?;
    let mut cmd = cargo_bin_cmd!("pulse");
    cmd.args([
        "--config",
        &config.path().to_string_lossy(),
        "ecg-peaks",
        "--input",
        &file.path().to_string_lossy(),
    ]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let value: DetectionOutput = serde_json::from_slice(&out)?;
    assert_eq!(value.peaks_idx.len(), RR.len() + 1);
    Ok(())
}
