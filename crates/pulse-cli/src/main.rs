use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use pulse_lib::{
    artefacts::{rr_artefacts_from, ArtefactConfig},
    clipping::ClippingThresholds,
    config::DetectionConfig,
    convert::{RrData, RrKind},
    detectors::{
        ecg_peaks, ppg_peaks_with, rsp_peaks, EcgConfig, EcgMethod, PpgConfig, RspConfig, RspKind,
    },
    io::{csv as csv_io, text as text_io},
    signal::{PeakVector, TimeSeries},
    simulate::{simulate_rr, ArtefactPositions, RrSimulation},
};
use serde::Serialize;
use std::{
    io::{self, Read},
    path::PathBuf,
};

#[derive(Parser)]
#[command(
    name = "pulse",
    version,
    about = "Peak detection and RR artefact screening for PPG, ECG and respiration"
)]
struct Cli {
    /// Log every processing stage (same as RUST_LOG=debug)
    #[arg(long, global = true)]
    verbose: bool,
    /// TOML file with [ppg], [ecg], [rsp] and [artefacts] tables
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

/// Where samples come from: a text file, one CSV column, or stdin.
#[derive(Args)]
struct InputArgs {
    /// Newline-delimited samples (stdin when neither --input nor --csv is given)
    #[arg(long, conflicts_with = "csv")]
    input: Option<PathBuf>,
    /// CSV file with a header row
    #[arg(long, requires = "column")]
    csv: Option<PathBuf>,
    /// Column to read from --csv
    #[arg(long)]
    column: Option<String>,
    #[arg(long, default_value_t = ',')]
    delimiter: char,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect systolic peaks in a PPG recording
    PpgPeaks {
        #[command(flatten)]
        source: InputArgs,
        #[arg(long, default_value_t = 75.0)]
        sfreq: f64,
        #[arg(long)]
        new_sfreq: Option<f64>,
        #[arg(long)]
        win: Option<f64>,
        /// `auto`, `none`, or a `min,max` pair (either side may be `none`)
        #[arg(long)]
        clipping_thresholds: Option<ClippingThresholds>,
        #[arg(long)]
        no_clipping: bool,
        #[arg(long)]
        no_moving_average: bool,
        #[arg(long)]
        no_peak_enhancement: bool,
        #[arg(long)]
        distance: Option<f64>,
        #[arg(long)]
        clean_extra: bool,
        #[arg(long)]
        clean_nan: bool,
    },
    /// Detect R peaks in an ECG recording
    EcgPeaks {
        #[command(flatten)]
        source: InputArgs,
        #[arg(long, default_value_t = 1000.0)]
        sfreq: f64,
        #[arg(long)]
        new_sfreq: Option<f64>,
        /// pan-tompkins, moving-average, hamilton or engelse-zeelenberg
        #[arg(long)]
        method: Option<EcgMethod>,
        #[arg(long)]
        find_local: bool,
        #[arg(long)]
        win_size: Option<f64>,
        #[arg(long)]
        clean_nan: bool,
    },
    /// Detect end-inspiration peaks and end-expiration troughs
    RspPeaks {
        #[command(flatten)]
        source: InputArgs,
        #[arg(long, default_value_t = 75.0)]
        sfreq: f64,
        #[arg(long)]
        new_sfreq: Option<f64>,
        #[arg(long)]
        win: Option<f64>,
        /// peaks, troughs or peaks-troughs
        #[arg(long)]
        kind: Option<RspKind>,
        #[arg(long)]
        distance: Option<f64>,
        #[arg(long)]
        clean_nan: bool,
    },
    /// Label ectopic, long, short, missed and extra intervals
    RrArtefacts {
        #[command(flatten)]
        source: InputArgs,
        /// Representation of the input: peaks, peaks_idx, rr_ms or rr_s
        #[arg(long, default_value = "rr_ms")]
        kind: RrKind,
        /// Sampling rate that peak vectors and indices refer to
        #[arg(long, default_value_t = 1000.0)]
        sfreq: f64,
        #[arg(long)]
        c1: Option<f64>,
        #[arg(long)]
        c2: Option<f64>,
        #[arg(long)]
        alpha: Option<f64>,
        /// Print label counts instead of the full report
        #[arg(long)]
        summary: bool,
    },
    /// Convert between peaks, peaks_idx, rr_ms and rr_s
    Convert {
        #[command(flatten)]
        source: InputArgs,
        #[arg(long)]
        from: RrKind,
        #[arg(long)]
        to: RrKind,
        #[arg(long, default_value_t = 1000.0)]
        sfreq: f64,
    },
    /// Generate a synthetic RR series (ms)
    SimulateRr {
        #[arg(long, default_value_t = 350)]
        n_rr: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Leave out the injected artefacts
        #[arg(long)]
        clean: bool,
        /// Output representation
        #[arg(long, default_value = "rr_ms")]
        to: RrKind,
    },
}

#[derive(Serialize)]
struct DetectionOutput {
    sfreq: f64,
    signal_len: usize,
    peaks_idx: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    troughs_idx: Option<Vec<usize>>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    let config = match cli.config.as_deref() {
        Some(path) => DetectionConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DetectionConfig::default(),
    };

    match cli.command {
        Commands::PpgPeaks {
            source,
            sfreq,
            new_sfreq,
            win,
            clipping_thresholds,
            no_clipping,
            no_moving_average,
            no_peak_enhancement,
            distance,
            clean_extra,
            clean_nan,
        } => {
            let mut cfg: PpgConfig = config.ppg;
            override_with(&mut cfg.new_sfreq, new_sfreq);
            override_with(&mut cfg.win, win);
            override_with(&mut cfg.clipping_thresholds, clipping_thresholds);
            override_with(&mut cfg.distance, distance);
            cfg.clipping &= !no_clipping;
            cfg.moving_average &= !no_moving_average;
            cfg.peak_enhancement &= !no_peak_enhancement;
            cfg.clean_extra |= clean_extra;
            cfg.clean_nan |= clean_nan;
            cmd_ppg_peaks(&source, sfreq, &cfg, &config.artefacts)?
        }
        Commands::EcgPeaks {
            source,
            sfreq,
            new_sfreq,
            method,
            find_local,
            win_size,
            clean_nan,
        } => {
            let mut cfg: EcgConfig = config.ecg;
            override_with(&mut cfg.new_sfreq, new_sfreq);
            override_with(&mut cfg.method, method);
            override_with(&mut cfg.win_size, win_size);
            cfg.find_local |= find_local;
            cfg.clean_nan |= clean_nan;
            cmd_ecg_peaks(&source, sfreq, &cfg)?
        }
        Commands::RspPeaks {
            source,
            sfreq,
            new_sfreq,
            win,
            kind,
            distance,
            clean_nan,
        } => {
            let mut cfg: RspConfig = config.rsp;
            override_with(&mut cfg.new_sfreq, new_sfreq);
            override_with(&mut cfg.win, win);
            override_with(&mut cfg.kind, kind);
            override_with(&mut cfg.distance, distance);
            cfg.clean_nan |= clean_nan;
            cmd_rsp_peaks(&source, sfreq, &cfg)?
        }
        Commands::RrArtefacts {
            source,
            kind,
            sfreq,
            c1,
            c2,
            alpha,
            summary,
        } => {
            let mut cfg: ArtefactConfig = config.artefacts;
            override_with(&mut cfg.c1, c1);
            override_with(&mut cfg.c2, c2);
            override_with(&mut cfg.alpha, alpha);
            cmd_rr_artefacts(&source, kind, sfreq, &cfg, summary)?
        }
        Commands::Convert {
            source,
            from,
            to,
            sfreq,
        } => cmd_convert(&source, from, to, sfreq)?,
        Commands::SimulateRr {
            n_rr,
            seed,
            clean,
            to,
        } => cmd_simulate_rr(n_rr, seed, clean, to)?,
    }
    Ok(())
}

fn override_with<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn read_samples(source: &InputArgs) -> Result<Vec<f64>> {
    if let Some(path) = source.csv.as_deref() {
        let column = source.column.as_deref().context("--csv needs --column")?;
        let delimiter = u8::try_from(source.delimiter).context("delimiter must be ASCII")?;
        return csv_io::read_column(path, column, delimiter)
            .with_context(|| format!("reading column '{}' of {}", column, path.display()));
    }
    match source.input.as_deref() {
        Some(path) => text_io::read_f64_series(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => Ok(text_io::parse_f64_series(&read_stdin()?)?),
    }
}

/// Rows as written, so multi-column input can be rejected downstream.
fn read_rows(source: &InputArgs) -> Result<Vec<Vec<f64>>> {
    if source.csv.is_some() {
        return Ok(read_samples(source)?.into_iter().map(|v| vec![v]).collect());
    }
    match source.input.as_deref() {
        Some(path) => text_io::read_f64_table(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => Ok(text_io::parse_f64_table(&read_stdin()?)?),
    }
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("reading stdin")?;
    Ok(buf)
}

fn load_time_series(source: &InputArgs, sfreq: f64) -> Result<TimeSeries> {
    Ok(TimeSeries::new(sfreq, read_samples(source)?)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn detection_output(signal: &TimeSeries, peaks: &PeakVector) -> DetectionOutput {
    DetectionOutput {
        sfreq: signal.fs,
        signal_len: signal.len(),
        peaks_idx: peaks.indices(),
        troughs_idx: None,
    }
}

fn cmd_ppg_peaks(
    source: &InputArgs,
    sfreq: f64,
    cfg: &PpgConfig,
    artefacts: &ArtefactConfig,
) -> Result<()> {
    let ts = load_time_series(source, sfreq)?;
    let det = ppg_peaks_with(&ts, cfg, artefacts)?;
    print_json(&detection_output(&det.signal, &det.peaks))
}

fn cmd_ecg_peaks(source: &InputArgs, sfreq: f64, cfg: &EcgConfig) -> Result<()> {
    let ts = load_time_series(source, sfreq)?;
    let det = ecg_peaks(&ts, cfg)?;
    print_json(&detection_output(&det.signal, &det.peaks))
}

fn cmd_rsp_peaks(source: &InputArgs, sfreq: f64, cfg: &RspConfig) -> Result<()> {
    let ts = load_time_series(source, sfreq)?;
    let det = rsp_peaks(&ts, cfg)?;
    print_json(&DetectionOutput {
        sfreq: det.signal.fs,
        signal_len: det.signal.len(),
        peaks_idx: det.peaks.as_ref().map(PeakVector::indices).unwrap_or_default(),
        troughs_idx: det.troughs.as_ref().map(PeakVector::indices),
    })
}

fn cmd_rr_artefacts(
    source: &InputArgs,
    kind: RrKind,
    sfreq: f64,
    cfg: &ArtefactConfig,
    summary: bool,
) -> Result<()> {
    let data = RrData::from_rows(&read_rows(source)?, kind)?;
    let report = rr_artefacts_from(&data, sfreq, cfg)?;
    if summary {
        print_json(&report.summary())
    } else {
        print_json(&report)
    }
}

fn cmd_convert(source: &InputArgs, from: RrKind, to: RrKind, sfreq: f64) -> Result<()> {
    let data = RrData::from_rows(&read_rows(source)?, from)?;
    if data.is_empty() {
        bail!("nothing to convert");
    }
    print_json(&data.convert(to, sfreq)?)
}

fn cmd_simulate_rr(n_rr: usize, seed: u64, clean: bool, to: RrKind) -> Result<()> {
    let sim = RrSimulation {
        n_rr,
        seed,
        artefacts: if clean {
            ArtefactPositions::none()
        } else {
            ArtefactPositions::default()
        },
        ..RrSimulation::default()
    };
    let rr = RrData::RrMs(simulate_rr(&sim)?);
    print_json(&rr.convert(to, 1000.0)?)
}
