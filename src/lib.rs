//! headcount: a people-counting kernel.
//!
//! Frames flow one direction, from a camera source through a detection
//! strategy into an occupancy counter:
//!
//! ```text
//! CameraSource -> sampler -> DetectionStrategy
//!                                   |
//!                             DetectionResult
//!                                   |
//!             CounterState <- OccupancyTranslator
//! ```
//!
//! The [`session::Session`] controller owns every moving part: the two
//! periodic tasks (frame sampling and the session clock), the camera
//! handle, and the shared counter/analytics state. Nothing is ambient;
//! dropping the session tears the whole pipeline down.
//!
//! # Module Structure
//!
//! - `frame`: raw RGB frame buffer
//! - `camera`: frame acquisition (synthetic `stub://` devices)
//! - `detect`: detection strategies, boxes, non-maximum suppression
//! - `counter`: head-count translator and the occupancy reducer
//! - `sampler`: the periodic capture/detect/update loop
//! - `analytics`: hourly/daily traffic series and CSV export
//! - `session`: the owning controller
//! - `config`: file plus environment configuration

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod analytics;
pub mod camera;
pub mod config;
pub mod counter;
pub mod detect;
pub mod frame;
pub mod sampler;
pub mod session;
pub mod task;

pub use analytics::{to_csv, TrafficAggregator, TrafficPoint};
pub use camera::{CameraConfig, CameraSource};
pub use config::HeadcountConfig;
pub use counter::{
    Alert, CounterConfig, CounterConfigPatch, CounterEvent, CounterState, OccupancyStats,
    OccupancyTranslator, Severity,
};
pub use detect::{
    build_strategy, DetectionBox, DetectionConfig, DetectionResult, DetectionStrategy, ModelKind,
    ModelNotLoadedError, ObjectClass,
};
pub use frame::Frame;
pub use sampler::DetectionTelemetry;
pub use session::Session;
pub use task::PeriodicTask;

// -------------------- Time Buckets --------------------

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeBucket {
    /// start of bucket in seconds since epoch (coarse)
    pub start_epoch_s: u64,
    /// bucket size in seconds (e.g., 3600 = 1 hour)
    pub size_s: u32,
}

impl TimeBucket {
    /// Bucket containing `epoch_s`. A zero size is treated as one second.
    pub fn from_epoch_s(epoch_s: u64, size_s: u32) -> Self {
        let size_s = size_s.max(1);
        let size = u64::from(size_s);
        TimeBucket {
            start_epoch_s: (epoch_s / size) * size,
            size_s,
        }
    }

    pub fn coarsen_to(self, size_s: u32) -> Self {
        Self::from_epoch_s(self.start_epoch_s, size_s)
    }
}

/// Wall-clock seconds since the Unix epoch; zero if the clock reads earlier.
pub(crate) fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
