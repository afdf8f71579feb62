use serde::Serialize;

/// Object classes the strategies can report.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectClass {
    Person,
    Vehicle,
    Unknown,
}

/// One detected object, in source-frame pixel coordinates.
#[derive(Clone, Debug, Serialize)]
pub struct DetectionBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    pub class: ObjectClass,
}

/// Result of running person detection on a frame.
///
/// `count` is derived, never stored independently: the number of person
/// boxes whose confidence strictly exceeds the configured threshold.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DetectionResult {
    pub boxes: Vec<DetectionBox>,
    pub count: usize,
}

impl DetectionResult {
    pub fn from_boxes(boxes: Vec<DetectionBox>, confidence_threshold: f32) -> Self {
        let count = boxes
            .iter()
            .filter(|b| b.class == ObjectClass::Person && b.confidence > confidence_threshold)
            .count();
        Self { boxes, count }
    }
}
