use anyhow::{bail, Result};

use crate::detect::nms;
use crate::detect::result::{DetectionBox, DetectionResult, ObjectClass};
use crate::detect::strategy::{DetectionConfig, DetectionStrategy, ModelKind, ModelNotLoadedError};
use crate::frame::Frame;

// COCO class ids the detection head emits.
const CLASS_PERSON: u32 = 0;
const CLASS_CAR: u32 = 2;

/// Neural-net strategy with a stubbed forward pass.
///
/// Preprocessing, output decoding, person filtering, and suppression are the
/// real pipeline; only the network itself is synthetic. Real inference is
/// out of scope for this build.
pub struct NeuralNetStrategy {
    confidence_threshold: f32,
    nms_threshold: f32,
    input_size: u32,
    net: Option<StubNet>,
}

impl NeuralNetStrategy {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            nms_threshold: config.nms_threshold,
            input_size: config.input_size,
            net: None,
        }
    }

    fn run_inference(&self, net: &StubNet, frame: &Frame) -> Result<Vec<DetectionBox>> {
        frame.ensure_rgb()?;
        if frame.width == 0 || frame.height == 0 {
            bail!("frame has zero dimensions");
        }

        // The input tensor lives only for this block; it is gone before the
        // boxes leave the strategy.
        let decoded = {
            let input = preprocess(frame, self.input_size);
            let rows = net.forward(&input)?;
            decode(&rows, frame, self.input_size)
        };

        let persons = decoded
            .into_iter()
            .filter(|b| b.class == ObjectClass::Person && b.confidence > self.confidence_threshold)
            .collect();
        Ok(nms::suppress(persons, self.nms_threshold))
    }
}

impl DetectionStrategy for NeuralNetStrategy {
    fn load_model(&mut self) -> bool {
        if self.net.is_some() {
            return true;
        }
        if self.input_size == 0 {
            log::error!("neural-net model load failed: zero input resolution");
            return false;
        }
        self.net = Some(StubNet {
            input_size: self.input_size,
        });
        log::info!(
            "neural-net model loaded ({}x{} input)",
            self.input_size,
            self.input_size
        );
        true
    }

    fn detect_people(&mut self, frame: &Frame) -> Result<DetectionResult> {
        let Some(net) = &self.net else {
            return Err(ModelNotLoadedError {
                model: ModelKind::NeuralNet,
            }
            .into());
        };

        match self.run_inference(net, frame) {
            Ok(boxes) => Ok(DetectionResult::from_boxes(boxes, self.confidence_threshold)),
            Err(err) => {
                log::warn!("neural-net inference failed, dropping frame: {}", err);
                Ok(DetectionResult::default())
            }
        }
    }

    fn model_kind(&self) -> ModelKind {
        ModelKind::NeuralNet
    }
}

/// Stand-in for the detection network. Consumes a CHW tensor and emits raw
/// rows of `[cx, cy, w, h, score, class]` in model coordinates, including
/// the near-duplicate and off-class rows a real head produces.
struct StubNet {
    input_size: u32,
}

impl StubNet {
    fn forward(&self, input: &[f32]) -> Result<Vec<[f32; 6]>> {
        let side = self.input_size as usize;
        let expected = 3 * side * side;
        if input.len() != expected {
            bail!(
                "input tensor has {} values, expected {}",
                input.len(),
                expected
            );
        }

        let mean = input.iter().map(|&v| v as f64).sum::<f64>() / expected as f64;
        if !mean.is_finite() {
            bail!("input tensor contains non-finite values");
        }

        // Scene occupancy is derived from the tensor so identical frames
        // produce identical detections.
        let people = 1 + ((mean * 255.0) as usize) % 3;
        let size = self.input_size as f32;

        let mut rows = Vec::with_capacity(people * 2 + 2);
        for i in 0..people {
            let cx = size * (i as f32 + 1.0) / (people as f32 + 1.0);
            let cy = size * 0.5;
            let w = size * 0.18;
            let h = size * 0.45;
            rows.push([cx, cy, w, h, 0.9 - 0.08 * i as f32, CLASS_PERSON as f32]);
            // Jittered duplicate of the same person; suppression removes it.
            rows.push([cx + size * 0.01, cy, w, h, 0.62, CLASS_PERSON as f32]);
        }
        rows.push([
            size * 0.5,
            size * 0.8,
            size * 0.3,
            size * 0.2,
            0.93,
            CLASS_CAR as f32,
        ]);
        rows.push([
            size * 0.1,
            size * 0.1,
            size * 0.1,
            size * 0.2,
            0.2,
            CLASS_PERSON as f32,
        ]);
        Ok(rows)
    }
}

/// Nearest-neighbour resize to the model resolution, normalised to [0,1],
/// CHW layout.
fn preprocess(frame: &Frame, input_size: u32) -> Vec<f32> {
    let side = input_size as usize;
    let plane = side * side;
    let mut input = vec![0.0f32; 3 * plane];

    for y in 0..side {
        let src_y = (y as u32 * frame.height / input_size).min(frame.height - 1) as usize;
        for x in 0..side {
            let src_x = (x as u32 * frame.width / input_size).min(frame.width - 1) as usize;
            let src = (src_y * frame.width as usize + src_x) * 3;
            for channel in 0..3 {
                input[channel * plane + y * side + x] = frame.pixels[src + channel] as f32 / 255.0;
            }
        }
    }
    input
}

/// Map raw model rows back to source-frame pixel boxes.
fn decode(rows: &[[f32; 6]], frame: &Frame, input_size: u32) -> Vec<DetectionBox> {
    let scale_x = frame.width as f32 / input_size as f32;
    let scale_y = frame.height as f32 / input_size as f32;

    rows.iter()
        .map(|row| {
            let [cx, cy, w, h, score, class] = *row;
            DetectionBox {
                x: (cx - w / 2.0) * scale_x,
                y: (cy - h / 2.0) * scale_y,
                width: w * scale_x,
                height: h * scale_y,
                confidence: score,
                class: class_for_id(class as u32),
            }
        })
        .collect()
}

fn class_for_id(id: u32) -> ObjectClass {
    match id {
        CLASS_PERSON => ObjectClass::Person,
        CLASS_CAR => ObjectClass::Vehicle,
        _ => ObjectClass::Unknown,
    }
}
