mod nms;
mod result;
mod strategies;
mod strategy;

pub use nms::{iou, suppress};
pub use result::{DetectionBox, DetectionResult, ObjectClass};
pub use strategies::{ClassicalCvStrategy, NeuralNetStrategy, SimulatedStrategy};
pub use strategy::{
    build_strategy, DetectionConfig, DetectionStrategy, ModelKind, ModelNotLoadedError,
};
