//! Occupancy counter state machine.
//!
//! `CounterState` is a reducer over `CounterEvent`s. Every transition is
//! total: events carrying bad input are corrected or ignored with a log
//! line, never an error. Presentation layers read snapshots through
//! `stats()` and `alerts()`; nothing mutates the state except `apply`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::epoch_seconds;

const THRESHOLD_ALERT_TITLE: &str = "Threshold Exceeded";

/// Alert severity classes, ordered by how loudly a UI should render them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Success,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Success => "success",
        };
        f.write_str(tag)
    }
}

/// A user-facing notification. Alerts stay active until explicitly
/// dismissed; nothing expires them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub id: String,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    /// Creation time, epoch seconds.
    pub created_at: u64,
}

/// Live counter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterConfig {
    /// Occupancy at or above this raises the threshold alert.
    pub threshold: u32,
    pub alerts_enabled: bool,
    pub email_alerts: bool,
    pub show_detection_info: bool,
    pub auto_log: bool,
    pub session_timer: bool,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            threshold: 10,
            alerts_enabled: true,
            email_alerts: false,
            show_detection_info: true,
            auto_log: true,
            session_timer: true,
        }
    }
}

/// Partial configuration update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterConfigPatch {
    pub threshold: Option<u32>,
    pub alerts_enabled: Option<bool>,
    pub email_alerts: Option<bool>,
    pub show_detection_info: Option<bool>,
    pub auto_log: Option<bool>,
    pub session_timer: Option<bool>,
}

/// Events the counter reduces over.
#[derive(Debug, Clone, PartialEq)]
pub enum CounterEvent {
    /// One person entered the monitored area.
    Entered,
    /// One person left the monitored area.
    Exited,
    DismissAlert(String),
    UpdateConfig(CounterConfigPatch),
    /// Refresh the formatted session duration.
    Tick,
}

/// Point-in-time occupancy summary for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OccupancyStats {
    pub current: u32,
    pub entries: u64,
    pub exits: u64,
    pub session_duration: String,
}

#[derive(Debug)]
pub struct CounterState {
    current: u32,
    entries: u64,
    exits: u64,
    alerts: Vec<Alert>,
    config: CounterConfig,
    session_start: u64,
    session_duration: String,
}

impl Default for CounterState {
    fn default() -> Self {
        Self::new(CounterConfig::default())
    }
}

impl CounterState {
    pub fn new(config: CounterConfig) -> Self {
        Self {
            current: 0,
            entries: 0,
            exits: 0,
            alerts: Vec::new(),
            config,
            session_start: epoch_seconds(),
            session_duration: String::from("00:00:00"),
        }
    }

    /// Apply one event. Transitions are total; nothing here can fail.
    pub fn apply(&mut self, event: CounterEvent) {
        match event {
            CounterEvent::Entered => {
                self.current = self.current.saturating_add(1);
                self.entries = self.entries.saturating_add(1);
                self.check_threshold();
            }
            CounterEvent::Exited => {
                // Exits can be over-reported; occupancy clamps at zero.
                self.current = self.current.saturating_sub(1);
                self.exits = self.exits.saturating_add(1);
                self.check_threshold();
            }
            CounterEvent::DismissAlert(id) => {
                self.alerts.retain(|alert| alert.id != id);
            }
            CounterEvent::UpdateConfig(patch) => self.merge_config(patch),
            CounterEvent::Tick => {
                let elapsed = epoch_seconds().saturating_sub(self.session_start);
                self.session_duration = format_hms(elapsed);
            }
        }
    }

    /// At most one threshold alert is active at a time; a fresh one may be
    /// raised only after the previous one has been dismissed.
    fn check_threshold(&mut self) {
        if !self.config.alerts_enabled || self.current < self.config.threshold {
            return;
        }
        if self.alerts.iter().any(is_threshold_alert) {
            return;
        }
        log::warn!(
            "occupancy {} reached threshold {}",
            self.current,
            self.config.threshold
        );
        self.alerts.push(Alert {
            id: alert_id(),
            severity: Severity::Warning,
            title: THRESHOLD_ALERT_TITLE.to_string(),
            message: format!(
                "Current occupancy ({}) has exceeded the threshold of {} people.",
                self.current, self.config.threshold
            ),
            created_at: epoch_seconds(),
        });
    }

    fn merge_config(&mut self, patch: CounterConfigPatch) {
        if let Some(threshold) = patch.threshold {
            if threshold == 0 {
                log::warn!("ignoring threshold update: must be at least 1");
            } else {
                self.config.threshold = threshold;
            }
        }
        if let Some(enabled) = patch.alerts_enabled {
            self.config.alerts_enabled = enabled;
        }
        if let Some(enabled) = patch.email_alerts {
            self.config.email_alerts = enabled;
        }
        if let Some(enabled) = patch.show_detection_info {
            self.config.show_detection_info = enabled;
        }
        if let Some(enabled) = patch.auto_log {
            self.config.auto_log = enabled;
        }
        if let Some(enabled) = patch.session_timer {
            self.config.session_timer = enabled;
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn stats(&self) -> OccupancyStats {
        OccupancyStats {
            current: self.current,
            entries: self.entries,
            exits: self.exits,
            session_duration: self.session_duration.clone(),
        }
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn config(&self) -> &CounterConfig {
        &self.config
    }
}

fn is_threshold_alert(alert: &Alert) -> bool {
    alert.severity == Severity::Warning && alert.title == THRESHOLD_ALERT_TITLE
}

fn alert_id() -> String {
    use rand::RngCore;

    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Zero-padded `HH:MM:SS`. Hours widen past two digits rather than wrap.
pub(crate) fn format_hms(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}
