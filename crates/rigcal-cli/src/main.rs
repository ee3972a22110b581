use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use rigcal_pipeline::{
    load_intrinsics, load_json_file, run_calibration, CalibrationConfig, CalibrationReport,
    CalibrationSession, IterRoundSource, RoundCandidate,
};

/// Extrinsic calibration of a sensor rig from recorded target rounds.
#[derive(Debug, Parser)]
#[command(author, version, about = "Multi-sensor rig extrinsic calibration")]
struct Args {
    /// Path to JSON CalibrationConfig (reference sensor, sensor list, thresholds).
    #[arg(long)]
    config: PathBuf,

    /// Path to a JSON array of candidate rounds, in acquisition order.
    #[arg(long)]
    rounds: PathBuf,

    /// Optional JSON CameraIntrinsics shared by the camera sensors.
    #[arg(long)]
    intrinsics: Option<PathBuf>,

    /// Also write the full session checkpoint to this path.
    #[arg(long)]
    session: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    verbose: bool,
}

fn calibrate_from_files(
    config_path: &Path,
    rounds_path: &Path,
    intrinsics_path: Option<&Path>,
) -> Result<CalibrationSession> {
    let config: CalibrationConfig = load_json_file(config_path)?;
    let rounds: Vec<RoundCandidate> = load_json_file(rounds_path)?;
    log::info!(
        "loaded {} candidate rounds for {} sensors",
        rounds.len(),
        config.sensors.len()
    );

    let mut session = CalibrationSession::new(config).context("invalid configuration")?;
    if let Some(path) = intrinsics_path {
        session.set_intrinsics(load_intrinsics(path)?)?;
    } else if session.config().needs_intrinsics() {
        log::warn!("no intrinsics given; camera sensors fall back to point alignment");
    }

    run_calibration(&mut session, &mut IterRoundSource::new(rounds))?;
    Ok(session)
}

fn write_report_json(report: &CalibrationReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let session = calibrate_from_files(&args.config, &args.rounds, args.intrinsics.as_deref())?;
    if let Some(path) = &args.session {
        std::fs::write(path, session.to_json()?)
            .with_context(|| format!("cannot write session to {}", path.display()))?;
    }
    println!("{}", write_report_json(session.require_report()?)?);
    Ok(())
}
