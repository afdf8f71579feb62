//! Frame sampling loop.
//!
//! Couples a camera to a detection strategy on a periodic task. Each tick
//! captures one frame, runs detection, records telemetry, and feeds the
//! head-count delta to the counter through the shared session state. The
//! camera and strategy are owned by the loop; cancelling it drops both, so
//! the camera is released on every exit path, panics included.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use serde::Serialize;

use crate::camera::CameraSource;
use crate::counter::OccupancyTranslator;
use crate::detect::{DetectionResult, DetectionStrategy};
use crate::session::SharedState;
use crate::task::PeriodicTask;

/// Snapshot of the most recent detection work.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DetectionTelemetry {
    pub last_result: DetectionResult,
    pub last_processing_ms: u64,
    pub frames_sampled: u64,
}

pub(crate) struct SamplerHandle {
    task: PeriodicTask,
}

impl SamplerHandle {
    /// Cancel the sampling task. The loop's camera and strategy drop when
    /// the thread exits, which releases the capture device.
    pub(crate) fn stop(self) -> Result<()> {
        self.task.stop()
    }
}

/// Start sampling `camera` through `strategy` every `period`.
///
/// Refuses to start unless the strategy reports loaded; `load_model` is
/// idempotent, so probing it here is free when the caller already loaded.
pub(crate) fn start(
    mut camera: CameraSource,
    mut strategy: Box<dyn DetectionStrategy>,
    period: Duration,
    shared: Arc<SharedState>,
) -> Result<SamplerHandle> {
    if !strategy.load_model() {
        bail!(
            "cannot start sampling: {} model is not loaded",
            strategy.model_kind()
        );
    }

    // Fresh baseline per start so a new session never replays old deltas.
    let mut translator = OccupancyTranslator::new();

    let task = PeriodicTask::spawn("frame-sampler", period, move || {
        let frame = match camera.next_frame() {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("frame capture failed, skipping tick: {}", err);
                return;
            }
        };

        let started = Instant::now();
        let result = match strategy.detect_people(&frame) {
            Ok(result) => result,
            Err(err) => {
                // The load gate above makes this unreachable short of a
                // strategy bug; keep sampling either way.
                log::error!("detection failed, substituting empty result: {}", err);
                DetectionResult::default()
            }
        };
        let processing_ms = started.elapsed().as_millis() as u64;

        let count = result.count as u32;
        shared.record_detection(result, processing_ms);
        shared.apply_flow(translator.observe(count));
    });

    Ok(SamplerHandle { task })
}
