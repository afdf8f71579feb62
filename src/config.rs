use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::camera::CameraConfig;
use crate::counter::CounterConfig;
use crate::detect::{DetectionConfig, ModelKind};

const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 1_000;
const DEFAULT_EXPORT_CSV_PATH: &str = "headcount_hourly.csv";

#[derive(Debug, Deserialize, Default)]
struct HeadcountConfigFile {
    camera: Option<CameraConfigFile>,
    detection: Option<DetectionConfigFile>,
    counter: Option<CounterConfigFile>,
    sample_interval_ms: Option<u64>,
    export_csv_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    model: Option<String>,
    confidence_threshold: Option<f32>,
    nms_threshold: Option<f32>,
    input_size: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct CounterConfigFile {
    threshold: Option<u32>,
    alerts_enabled: Option<bool>,
    email_alerts: Option<bool>,
    show_detection_info: Option<bool>,
    auto_log: Option<bool>,
    session_timer: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct HeadcountConfig {
    pub camera: CameraConfig,
    pub detection: DetectionConfig,
    pub counter: CounterConfig,
    pub sample_interval: Duration,
    pub export_csv_path: PathBuf,
}

impl Default for HeadcountConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            detection: DetectionConfig::default(),
            counter: CounterConfig::default(),
            sample_interval: Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS),
            export_csv_path: PathBuf::from(DEFAULT_EXPORT_CSV_PATH),
        }
    }
}

impl HeadcountConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("HEADCOUNT_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: HeadcountConfigFile) -> Result<Self> {
        let defaults = Self::default();

        let camera = CameraConfig {
            device: file
                .camera
                .as_ref()
                .and_then(|camera| camera.device.clone())
                .unwrap_or(defaults.camera.device),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(defaults.camera.width),
            height: file
                .camera
                .and_then(|camera| camera.height)
                .unwrap_or(defaults.camera.height),
        };

        let model = match file.detection.as_ref().and_then(|d| d.model.clone()) {
            Some(tag) => tag.parse::<ModelKind>()?,
            None => defaults.detection.model,
        };
        let detection = DetectionConfig {
            model,
            confidence_threshold: file
                .detection
                .as_ref()
                .and_then(|d| d.confidence_threshold)
                .unwrap_or(defaults.detection.confidence_threshold),
            nms_threshold: file
                .detection
                .as_ref()
                .and_then(|d| d.nms_threshold)
                .unwrap_or(defaults.detection.nms_threshold),
            input_size: file
                .detection
                .and_then(|d| d.input_size)
                .unwrap_or(defaults.detection.input_size),
        };

        let counter = match file.counter {
            Some(section) => CounterConfig {
                threshold: section.threshold.unwrap_or(defaults.counter.threshold),
                alerts_enabled: section
                    .alerts_enabled
                    .unwrap_or(defaults.counter.alerts_enabled),
                email_alerts: section
                    .email_alerts
                    .unwrap_or(defaults.counter.email_alerts),
                show_detection_info: section
                    .show_detection_info
                    .unwrap_or(defaults.counter.show_detection_info),
                auto_log: section.auto_log.unwrap_or(defaults.counter.auto_log),
                session_timer: section
                    .session_timer
                    .unwrap_or(defaults.counter.session_timer),
            },
            None => defaults.counter,
        };

        let sample_interval = Duration::from_millis(
            file.sample_interval_ms
                .unwrap_or(DEFAULT_SAMPLE_INTERVAL_MS),
        );
        let export_csv_path = file.export_csv_path.unwrap_or(defaults.export_csv_path);

        Ok(Self {
            camera,
            detection,
            counter,
            sample_interval,
            export_csv_path,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("HEADCOUNT_DEVICE") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(model) = std::env::var("HEADCOUNT_MODEL") {
            if !model.trim().is_empty() {
                self.detection.model = model.trim().parse()?;
            }
        }
        if let Ok(threshold) = std::env::var("HEADCOUNT_THRESHOLD") {
            let parsed: u32 = threshold
                .parse()
                .map_err(|_| anyhow!("HEADCOUNT_THRESHOLD must be a positive integer"))?;
            self.counter.threshold = parsed;
        }
        if let Ok(confidence) = std::env::var("HEADCOUNT_CONFIDENCE_THRESHOLD") {
            let parsed: f32 = confidence.parse().map_err(|_| {
                anyhow!("HEADCOUNT_CONFIDENCE_THRESHOLD must be a number between 0 and 1")
            })?;
            self.detection.confidence_threshold = parsed;
        }
        if let Ok(interval) = std::env::var("HEADCOUNT_SAMPLE_INTERVAL_MS") {
            let millis: u64 = interval.parse().map_err(|_| {
                anyhow!("HEADCOUNT_SAMPLE_INTERVAL_MS must be an integer number of milliseconds")
            })?;
            self.sample_interval = Duration::from_millis(millis);
        }
        if let Ok(path) = std::env::var("HEADCOUNT_EXPORT_PATH") {
            if !path.trim().is_empty() {
                self.export_csv_path = PathBuf::from(path);
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.detection.validate()?;

        if self.counter.threshold == 0 {
            return Err(anyhow!("counter threshold must be greater than zero"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera dimensions must be greater than zero"));
        }
        if self.sample_interval.as_millis() == 0 {
            return Err(anyhow!("sample interval must be at least one millisecond"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<HeadcountConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
