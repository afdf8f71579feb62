//! Session controller: one owner for the whole pipeline.
//!
//! Replaces ambient shared state with an explicit object. The session owns
//! the counter, the analytics aggregator, detection telemetry, and the two
//! periodic tasks (frame sampler and duration ticker). All mutation funnels
//! through the counter reducer; readers get snapshots.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use crate::analytics::{TrafficAggregator, TrafficPoint};
use crate::camera::CameraSource;
use crate::config::HeadcountConfig;
use crate::counter::{
    Alert, CounterConfig, CounterConfigPatch, CounterEvent, CounterState, Flow, OccupancyStats,
};
use crate::detect::{build_strategy, DetectionResult};
use crate::sampler::{self, DetectionTelemetry, SamplerHandle};
use crate::task::PeriodicTask;

/// State shared between the session and its sampling thread.
pub(crate) struct SharedState {
    counter: Mutex<CounterState>,
    analytics: Mutex<TrafficAggregator>,
    telemetry: Mutex<DetectionTelemetry>,
}

impl SharedState {
    fn new(counter_config: CounterConfig) -> Self {
        Self {
            counter: Mutex::new(CounterState::new(counter_config)),
            analytics: Mutex::new(TrafficAggregator::new()),
            telemetry: Mutex::new(DetectionTelemetry::default()),
        }
    }

    /// Fold one tick's flow into the counter and the analytics series.
    pub(crate) fn apply_flow(&self, flow: Flow) {
        if flow.entered == 0 && flow.exited == 0 {
            return;
        }
        let Ok(mut counter) = self.counter.lock() else {
            log::error!("counter lock poisoned, dropping flow");
            return;
        };
        let Ok(mut analytics) = self.analytics.lock() else {
            log::error!("analytics lock poisoned, dropping flow");
            return;
        };
        for _ in 0..flow.entered {
            counter.apply(CounterEvent::Entered);
            analytics.record_entry(counter.current());
        }
        for _ in 0..flow.exited {
            counter.apply(CounterEvent::Exited);
            analytics.record_exit(counter.current());
        }
    }

    pub(crate) fn record_detection(&self, result: DetectionResult, processing_ms: u64) {
        let Ok(mut telemetry) = self.telemetry.lock() else {
            log::error!("telemetry lock poisoned, dropping sample");
            return;
        };
        telemetry.last_result = result;
        telemetry.last_processing_ms = processing_ms;
        telemetry.frames_sampled += 1;
    }
}

pub struct Session {
    config: HeadcountConfig,
    shared: Arc<SharedState>,
    sampler: Option<SamplerHandle>,
    ticker: Option<PeriodicTask>,
}

impl Session {
    pub fn new(config: HeadcountConfig) -> Self {
        let shared = Arc::new(SharedState::new(config.counter.clone()));
        Self {
            config,
            shared,
            sampler: None,
            ticker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.sampler.is_some()
    }

    /// Build the configured strategy, load its model, open the camera, and
    /// start both periodic tasks. A load failure is retryable: call again
    /// once the model is available. A camera failure starts nothing.
    pub fn start_detection(&mut self) -> Result<()> {
        if self.is_running() {
            log::debug!("detection already running");
            return Ok(());
        }

        let mut strategy = build_strategy(&self.config.detection);
        if !strategy.load_model() {
            bail!("{} model failed to load; still loading", strategy.model_kind());
        }

        let camera = CameraSource::open(&self.config.camera)
            .context("camera acquisition failed; detection not started")?;

        let sampler = sampler::start(
            camera,
            strategy,
            self.config.sample_interval,
            self.shared.clone(),
        )?;

        // The ticker runs for the whole session; whether a tick lands is
        // decided by the live session_timer flag, which can be toggled.
        let shared = self.shared.clone();
        let ticker = PeriodicTask::spawn("session-clock", Duration::from_secs(1), move || {
            let Ok(mut counter) = shared.counter.lock() else {
                return;
            };
            if counter.config().session_timer {
                counter.apply(CounterEvent::Tick);
            }
        });

        self.sampler = Some(sampler);
        self.ticker = Some(ticker);
        log::info!(
            "detection started ({} model, {:?} cadence)",
            self.config.detection.model,
            self.config.sample_interval
        );
        Ok(())
    }

    /// Cancel both periodic tasks and release the camera. Safe to call when
    /// nothing is running.
    pub fn stop_detection(&mut self) -> Result<()> {
        let ticker = self.ticker.take();
        let sampler = self.sampler.take();
        if ticker.is_none() && sampler.is_none() {
            return Ok(());
        }

        // Both timers go down together even if one join fails.
        let ticker_stopped = match ticker {
            Some(task) => task.stop(),
            None => Ok(()),
        };
        let sampler_stopped = match sampler {
            Some(handle) => handle.stop(),
            None => Ok(()),
        };
        log::info!("detection stopped");
        ticker_stopped.and(sampler_stopped)
    }

    pub fn stats(&self) -> Result<OccupancyStats> {
        Ok(self.lock_counter()?.stats())
    }

    pub fn alerts(&self) -> Result<Vec<Alert>> {
        Ok(self.lock_counter()?.alerts().to_vec())
    }

    pub fn counter_config(&self) -> Result<CounterConfig> {
        Ok(self.lock_counter()?.config().clone())
    }

    pub fn update_config(&self, patch: CounterConfigPatch) -> Result<()> {
        self.lock_counter()?.apply(CounterEvent::UpdateConfig(patch));
        Ok(())
    }

    pub fn dismiss_alert(&self, id: &str) -> Result<()> {
        self.lock_counter()?
            .apply(CounterEvent::DismissAlert(id.to_string()));
        Ok(())
    }

    pub fn telemetry(&self) -> Result<DetectionTelemetry> {
        Ok(self
            .shared
            .telemetry
            .lock()
            .map_err(|_| anyhow!("telemetry lock poisoned"))?
            .clone())
    }

    pub fn hourly_traffic(&self) -> Result<Vec<TrafficPoint>> {
        Ok(self.lock_analytics()?.hourly())
    }

    pub fn daily_traffic(&self) -> Result<Vec<TrafficPoint>> {
        Ok(self.lock_analytics()?.daily())
    }

    pub fn session_peak(&self) -> Result<u32> {
        Ok(self.lock_analytics()?.session_peak())
    }

    fn lock_counter(&self) -> Result<MutexGuard<'_, CounterState>> {
        self.shared
            .counter
            .lock()
            .map_err(|_| anyhow!("counter lock poisoned"))
    }

    fn lock_analytics(&self) -> Result<MutexGuard<'_, TrafficAggregator>> {
        self.shared
            .analytics
            .lock()
            .map_err(|_| anyhow!("analytics lock poisoned"))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(err) = self.stop_detection() {
            log::error!("session teardown: {}", err);
        }
    }
}
