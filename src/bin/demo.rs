//! demo - end-to-end synthetic run for the headcount pipeline

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use headcount::{to_csv, CounterConfigPatch, HeadcountConfig, ModelKind, Session};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Duration in seconds for the synthetic run.
    #[arg(long, default_value_t = 5)]
    seconds: u64,
    /// Sampling interval in milliseconds.
    #[arg(long, default_value_t = 250)]
    interval_ms: u64,
    /// Occupancy threshold, kept low to demonstrate alerting.
    #[arg(long, default_value_t = 2)]
    threshold: u32,
    /// Output directory for CSV exports.
    #[arg(long, default_value = "demo_out")]
    out: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if args.interval_ms == 0 {
        return Err(anyhow!("interval-ms must be >= 1"));
    }
    if args.threshold == 0 {
        return Err(anyhow!("threshold must be >= 1"));
    }

    let out_dir = PathBuf::from(&args.out);
    fs::create_dir_all(&out_dir)?;

    stage("build session (simulated strategy, stub camera)");
    let mut cfg = HeadcountConfig::default();
    cfg.detection.model = ModelKind::Simulated;
    cfg.camera.device = "stub://demo".to_string();
    cfg.sample_interval = Duration::from_millis(args.interval_ms);

    let mut session = Session::new(cfg);

    stage("start detection");
    session.start_detection()?;

    // The simulated strategy reports 0..=3 people per frame; a low
    // threshold makes the alert path observable in a short run.
    session.update_config(CounterConfigPatch {
        threshold: Some(args.threshold),
        ..CounterConfigPatch::default()
    })?;

    let deadline = Instant::now() + Duration::from_secs(args.seconds);
    while Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(100));
    }

    stage("stop detection");
    session.stop_detection()?;

    let stats = session.stats()?;
    let alerts = session.alerts()?;
    let telemetry = session.telemetry()?;

    stage("export traffic series");
    let hourly = session.hourly_traffic()?;
    let daily = session.daily_traffic()?;
    let hourly_path = out_dir.join("hourly.csv");
    let daily_path = out_dir.join("daily.csv");
    fs::write(&hourly_path, to_csv(&hourly))
        .with_context(|| format!("writing {}", hourly_path.display()))?;
    fs::write(&daily_path, to_csv(&daily))
        .with_context(|| format!("writing {}", daily_path.display()))?;

    stage("verify exports parse back");
    let verify_result =
        verify_csv(&hourly_path, hourly.len()).and_then(|_| verify_csv(&daily_path, daily.len()));

    println!("demo summary:");
    println!("  frames sampled: {}", telemetry.frames_sampled);
    println!(
        "  last detection: {} boxes in {} ms",
        telemetry.last_result.boxes.len(),
        telemetry.last_processing_ms
    );
    println!(
        "  entries: {}  exits: {}  occupancy: {}",
        stats.entries, stats.exits, stats.current
    );
    println!("  session duration: {}", stats.session_duration);
    println!("  peak occupancy: {}", session.session_peak()?);
    println!("  alerts raised: {}", alerts.len());
    for alert in &alerts {
        println!("    [{}] {}: {}", alert.severity, alert.title, alert.message);
    }
    println!("  hourly csv: {}", hourly_path.display());
    println!("  daily csv: {}", daily_path.display());
    println!(
        "  verify: {}",
        if verify_result.is_ok() { "OK" } else { "FAIL" }
    );
    println!("next steps:");
    println!("  cargo run --bin headcountd");
    println!("  ls -la {}", out_dir.display());

    verify_result
}

fn stage(msg: &str) {
    eprintln!("demo: {}", msg);
}

fn verify_csv(path: &Path, points: usize) -> Result<()> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut lines = raw.lines();
    match lines.next() {
        Some("Time,Entries,Exits,Peak Count") => {}
        other => {
            return Err(anyhow!(
                "unexpected csv header {:?} in {}",
                other,
                path.display()
            ))
        }
    }
    let mut rows = 0usize;
    for line in lines {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 4 {
            return Err(anyhow!(
                "malformed csv row {:?} in {}",
                line,
                path.display()
            ));
        }
        for value in &fields[1..] {
            value.parse::<u64>().with_context(|| {
                format!("non-numeric csv value {:?} in {}", value, path.display())
            })?;
        }
        rows += 1;
    }
    if rows != points {
        return Err(anyhow!(
            "{} has {} rows, expected {}",
            path.display(),
            rows,
            points
        ));
    }
    Ok(())
}
