use anyhow::Result;
use rand::Rng;

use crate::detect::result::{DetectionBox, DetectionResult, ObjectClass};
use crate::detect::strategy::{DetectionConfig, DetectionStrategy, ModelKind, ModelNotLoadedError};
use crate::frame::Frame;

/// Simulated strategy: synthesizes 0-3 person boxes per call.
///
/// Ready immediately, needs no model assets, and ignores the frame contents.
/// The rest of the pipeline is tested against this strategy.
pub struct SimulatedStrategy {
    confidence_threshold: f32,
    loaded: bool,
}

impl SimulatedStrategy {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            loaded: false,
        }
    }
}

impl DetectionStrategy for SimulatedStrategy {
    fn load_model(&mut self) -> bool {
        if !self.loaded {
            self.loaded = true;
            log::debug!("simulated model ready");
        }
        true
    }

    fn detect_people(&mut self, _frame: &Frame) -> Result<DetectionResult> {
        if !self.loaded {
            return Err(ModelNotLoadedError {
                model: ModelKind::Simulated,
            }
            .into());
        }

        let mut rng = rand::thread_rng();
        let count = rng.gen_range(0..4);
        let boxes = (0..count)
            .map(|_| DetectionBox {
                x: rng.gen_range(0.0..500.0),
                y: rng.gen_range(0.0..300.0),
                width: rng.gen_range(50.0..150.0),
                height: rng.gen_range(100.0..250.0),
                confidence: rng.gen_range(0.5..1.0),
                class: ObjectClass::Person,
            })
            .collect();

        Ok(DetectionResult::from_boxes(boxes, self.confidence_threshold))
    }

    fn model_kind(&self) -> ModelKind {
        ModelKind::Simulated
    }
}
