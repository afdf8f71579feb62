use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::detect::result::DetectionResult;
use crate::detect::strategies::{ClassicalCvStrategy, NeuralNetStrategy, SimulatedStrategy};
use crate::frame::Frame;

/// Model families a detection strategy can be built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    Simulated,
    NeuralNet,
    ClassicalCv,
}

impl ModelKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ModelKind::Simulated => "simulated",
            ModelKind::NeuralNet => "neural-net",
            ModelKind::ClassicalCv => "classical-cv",
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

impl std::str::FromStr for ModelKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "simulated" => Ok(ModelKind::Simulated),
            "neural-net" => Ok(ModelKind::NeuralNet),
            "classical-cv" => Ok(ModelKind::ClassicalCv),
            other => bail!(
                "unknown model kind '{}' (expected simulated, neural-net, or classical-cv)",
                other
            ),
        }
    }
}

/// Settings shared by every detection strategy.
#[derive(Clone, Debug)]
pub struct DetectionConfig {
    pub model: ModelKind,
    /// Minimum confidence for a person box to count, inclusive lower bound 0.
    pub confidence_threshold: f32,
    /// Overlap at which near-duplicate boxes are suppressed.
    pub nms_threshold: f32,
    /// Square input resolution the stub networks resize frames to.
    pub input_size: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::Simulated,
            confidence_threshold: 0.5,
            nms_threshold: 0.45,
            input_size: 300,
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            bail!("confidence_threshold must be within 0.0..=1.0");
        }
        if !(0.0..=1.0).contains(&self.nms_threshold) {
            bail!("nms_threshold must be within 0.0..=1.0");
        }
        if self.input_size == 0 {
            bail!("input_size must be at least 1");
        }
        Ok(())
    }
}

/// Returned by `detect_people` when called before a successful `load_model`.
#[derive(Clone, Debug)]
pub struct ModelNotLoadedError {
    pub model: ModelKind,
}

impl std::fmt::Display for ModelNotLoadedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} model is not loaded; call load_model first", self.model)
    }
}
impl std::error::Error for ModelNotLoadedError {}

/// Detection strategy trait.
///
/// Strategies are `Send` because the sampler moves them onto its timer
/// thread. Callers never inspect which concrete strategy they hold; the
/// choice is made once, at construction, from configuration.
pub trait DetectionStrategy: Send {
    /// Prepare the model for inference. Returns true once ready.
    ///
    /// Idempotent: a second call after a successful load is a cheap no-op
    /// that returns true. A failed load returns false and may be retried.
    fn load_model(&mut self) -> bool;

    /// Run person detection on a frame.
    ///
    /// Fails with [`ModelNotLoadedError`] until `load_model` has succeeded.
    /// Any fault inside a loaded pipeline (bad buffer, inference error) is
    /// logged and surfaces as an empty result, never as an error.
    fn detect_people(&mut self, frame: &Frame) -> Result<DetectionResult>;

    /// Which model family this strategy runs.
    fn model_kind(&self) -> ModelKind;
}

/// Build the strategy selected by configuration.
pub fn build_strategy(config: &DetectionConfig) -> Box<dyn DetectionStrategy> {
    match config.model {
        ModelKind::Simulated => Box::new(SimulatedStrategy::new(config)),
        ModelKind::NeuralNet => Box::new(NeuralNetStrategy::new(config)),
        ModelKind::ClassicalCv => Box::new(ClassicalCvStrategy::new(config)),
    }
}
