//! headcountd - people-counting daemon
//!
//! This daemon:
//! 1. Loads configuration (file + environment)
//! 2. Builds a session and starts detection on the configured camera
//! 3. Logs live occupancy stats and newly raised alerts
//! 4. On Ctrl-C, stops detection and, when auto_log is enabled, writes the
//!    hourly traffic CSV to the configured export path

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use headcount::{to_csv, HeadcountConfig, Session};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = HeadcountConfig::load()?;
    log::info!(
        "headcountd starting: device={} model={} threshold={}",
        cfg.camera.device,
        cfg.detection.model,
        cfg.counter.threshold
    );

    let mut session = Session::new(cfg.clone());
    session.start_detection()?;

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .expect("error setting Ctrl-C handler");

    let mut seen_alerts: HashSet<String> = HashSet::new();
    let mut last_stats_log = Instant::now();

    log::info!("headcountd running (Ctrl-C to stop)");
    loop {
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
        }

        for alert in session.alerts()? {
            if seen_alerts.insert(alert.id.clone()) {
                log::warn!(
                    "alert [{}] {}: {}",
                    alert.severity,
                    alert.title,
                    alert.message
                );
            }
        }

        if last_stats_log.elapsed() >= Duration::from_secs(5) {
            let stats = session.stats()?;
            let telemetry = session.telemetry()?;
            log::info!(
                "occupancy={} entries={} exits={} session={} frames={} last_detect={}ms",
                stats.current,
                stats.entries,
                stats.exits,
                stats.session_duration,
                telemetry.frames_sampled,
                telemetry.last_processing_ms
            );
            if session.counter_config()?.show_detection_info {
                log::debug!(
                    "last detection: {}",
                    serde_json::to_string(&telemetry.last_result)?
                );
            }
            last_stats_log = Instant::now();
        }
    }

    log::info!("shutdown signal received, stopping detection...");
    session.stop_detection()?;

    if session.counter_config()?.auto_log {
        let csv = to_csv(&session.hourly_traffic()?);
        std::fs::write(&cfg.export_csv_path, csv).with_context(|| {
            format!(
                "failed to write traffic export {}",
                cfg.export_csv_path.display()
            )
        })?;
        log::info!(
            "hourly traffic written to {}",
            cfg.export_csv_path.display()
        );
    }

    let stats = session.stats()?;
    log::info!(
        "final: entries={} exits={} peak={} duration={}",
        stats.entries,
        stats.exits,
        session.session_peak()?,
        stats.session_duration
    );
    Ok(())
}
