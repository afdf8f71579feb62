use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};

use crate::detect::nms;
use crate::detect::result::{DetectionBox, DetectionResult, ObjectClass};
use crate::detect::strategy::{DetectionConfig, DetectionStrategy, ModelKind, ModelNotLoadedError};
use crate::frame::Frame;

// MobileNet-SSD blob parameters (VOC-trained weights).
const BLOB_SCALE: f32 = 0.007843;
const BLOB_MEAN: f32 = 127.5;

// VOC class ids.
const CLASS_BACKGROUND: u32 = 0;
const CLASS_CAR: u32 = 7;
const CLASS_PERSON: u32 = 15;

/// Classical-cv strategy with a stubbed vision library.
///
/// Frame-to-mat conversion, blob normalisation, SSD output decoding, and
/// suppression run for real; the network forward pass is synthetic. Native
/// mat/blob handles are ledger-tracked and must all be returned before a
/// detect call finishes, on the error path included.
pub struct ClassicalCvStrategy {
    confidence_threshold: f32,
    nms_threshold: f32,
    input_size: u32,
    runtime: Option<VisionRuntime>,
}

impl ClassicalCvStrategy {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            nms_threshold: config.nms_threshold,
            input_size: config.input_size,
            runtime: None,
        }
    }

    /// Diagnostic: native handles currently alive in the stub runtime.
    pub fn live_native_handles(&self) -> usize {
        self.runtime
            .as_ref()
            .map(|r| r.live_handles.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    fn run_inference(&self, runtime: &VisionRuntime, frame: &Frame) -> Result<Vec<DetectionBox>> {
        // Mat and blob handles are released when this block ends, whether
        // the forward pass succeeded or not.
        let rows = {
            let mat = runtime.mat_from_frame(frame)?;
            let blob = runtime.blob_from_mat(&mat, BLOB_SCALE, self.input_size, BLOB_MEAN);
            runtime.forward(&blob)?
        };

        let persons = decode(&rows, frame)
            .into_iter()
            .filter(|b| b.class == ObjectClass::Person && b.confidence > self.confidence_threshold)
            .collect();
        Ok(nms::suppress(persons, self.nms_threshold))
    }
}

impl DetectionStrategy for ClassicalCvStrategy {
    fn load_model(&mut self) -> bool {
        if self.runtime.is_some() {
            return true;
        }
        if self.input_size == 0 {
            log::error!("classical-cv model load failed: zero blob resolution");
            return false;
        }
        self.runtime = Some(VisionRuntime::bind());
        log::info!(
            "classical-cv model loaded (blob {}x{}, scale {}, mean {})",
            self.input_size,
            self.input_size,
            BLOB_SCALE,
            BLOB_MEAN
        );
        true
    }

    fn detect_people(&mut self, frame: &Frame) -> Result<DetectionResult> {
        let Some(runtime) = &self.runtime else {
            return Err(ModelNotLoadedError {
                model: ModelKind::ClassicalCv,
            }
            .into());
        };

        match self.run_inference(runtime, frame) {
            Ok(boxes) => Ok(DetectionResult::from_boxes(boxes, self.confidence_threshold)),
            Err(err) => {
                log::warn!("classical-cv inference failed, dropping frame: {}", err);
                Ok(DetectionResult::default())
            }
        }
    }

    fn model_kind(&self) -> ModelKind {
        ModelKind::ClassicalCv
    }
}

/// Stub handle to the native vision library.
///
/// Tracks live mat/blob allocations the way real bindings track Mat
/// lifetimes, so leaks are observable.
struct VisionRuntime {
    live_handles: Arc<AtomicUsize>,
}

impl VisionRuntime {
    fn bind() -> Self {
        Self {
            live_handles: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn mat_from_frame(&self, frame: &Frame) -> Result<NativeMat> {
        frame.ensure_rgb()?;
        if frame.width == 0 || frame.height == 0 {
            bail!("frame has zero dimensions");
        }
        self.live_handles.fetch_add(1, Ordering::SeqCst);
        Ok(NativeMat {
            rows: frame.height,
            cols: frame.width,
            data: frame.pixels.iter().map(|&p| p as f32).collect(),
            ledger: self.live_handles.clone(),
        })
    }

    /// Resize to a square blob and normalise each value to `(v - mean) * scale`.
    fn blob_from_mat(&self, mat: &NativeMat, scale: f32, side: u32, mean: f32) -> NativeBlob {
        let side_px = side as usize;
        let mut data = vec![0.0f32; 3 * side_px * side_px];

        for y in 0..side_px {
            let src_y = (y as u32 * mat.rows / side).min(mat.rows - 1) as usize;
            for x in 0..side_px {
                let src_x = (x as u32 * mat.cols / side).min(mat.cols - 1) as usize;
                let src = (src_y * mat.cols as usize + src_x) * 3;
                for channel in 0..3 {
                    data[(y * side_px + x) * 3 + channel] =
                        (mat.data[src + channel] - mean) * scale;
                }
            }
        }

        self.live_handles.fetch_add(1, Ordering::SeqCst);
        NativeBlob {
            data,
            ledger: self.live_handles.clone(),
        }
    }

    /// Stub SSD forward pass: rows of `[class, confidence, x1, y1, x2, y2]`
    /// with corner coordinates normalised to [0,1].
    fn forward(&self, blob: &NativeBlob) -> Result<Vec<[f32; 6]>> {
        if blob.data.is_empty() {
            bail!("empty input blob");
        }
        let mean = blob.data.iter().map(|&v| v as f64).sum::<f64>() / blob.data.len() as f64;
        if !mean.is_finite() {
            bail!("input blob contains non-finite values");
        }

        // Undo the blob normalisation to recover the mean pixel intensity,
        // which drives the synthetic occupancy.
        let mean_pixel = mean / BLOB_SCALE as f64 + BLOB_MEAN as f64;
        let people = 1 + (mean_pixel.round().max(0.0) as usize) % 3;

        let mut rows = Vec::with_capacity(people * 2 + 3);
        for i in 0..people {
            let cx = (i as f32 + 1.0) / (people as f32 + 1.0);
            let w = 0.15;
            let x1 = cx - w / 2.0;
            rows.push([CLASS_PERSON as f32, 0.88 - 0.06 * i as f32, x1, 0.3, x1 + w, 0.85]);
            // Jittered duplicate, removed by suppression.
            rows.push([CLASS_PERSON as f32, 0.55, x1 + 0.01, 0.3, x1 + w + 0.01, 0.85]);
        }
        rows.push([CLASS_CAR as f32, 0.9, 0.6, 0.65, 0.95, 0.95]);
        rows.push([CLASS_BACKGROUND as f32, 0.99, 0.0, 0.0, 1.0, 1.0]);
        rows.push([CLASS_PERSON as f32, 0.3, 0.05, 0.05, 0.12, 0.2]);
        Ok(rows)
    }
}

struct NativeMat {
    rows: u32,
    cols: u32,
    data: Vec<f32>,
    ledger: Arc<AtomicUsize>,
}

impl Drop for NativeMat {
    fn drop(&mut self) {
        self.ledger.fetch_sub(1, Ordering::SeqCst);
    }
}

struct NativeBlob {
    data: Vec<f32>,
    ledger: Arc<AtomicUsize>,
}

impl Drop for NativeBlob {
    fn drop(&mut self) {
        self.ledger.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Map normalised SSD corners back to source-frame pixel boxes.
fn decode(rows: &[[f32; 6]], frame: &Frame) -> Vec<DetectionBox> {
    let width = frame.width as f32;
    let height = frame.height as f32;

    rows.iter()
        .map(|row| {
            let [class, confidence, x1, y1, x2, y2] = *row;
            DetectionBox {
                x: x1 * width,
                y: y1 * height,
                width: (x2 - x1) * width,
                height: (y2 - y1) * height,
                confidence,
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

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_frame(width: u32, height: u32, value: u8) -> Frame {
        Frame::new(vec![value; (width * height * 3) as usize], width, height)
    }

    #[test]
    fn detect_before_load_fails_with_model_not_loaded() {
        let mut strategy = ClassicalCvStrategy::new(&DetectionConfig::default());
        let err = strategy.detect_people(&filled_frame(8, 8, 0)).unwrap_err();
        assert!(err.downcast_ref::<ModelNotLoadedError>().is_some());
    }

    #[test]
    fn zero_blob_resolution_fails_to_load() {
        let config = DetectionConfig {
            input_size: 0,
            ..DetectionConfig::default()
        };
        let mut strategy = ClassicalCvStrategy::new(&config);
        assert!(!strategy.load_model());
    }

    #[test]
    fn pipeline_filters_and_releases_handles() {
        let mut strategy = ClassicalCvStrategy::new(&DetectionConfig::default());
        assert!(strategy.load_model());

        let frame = filled_frame(64, 48, 128);
        let result = strategy.detect_people(&frame).unwrap();

        assert_eq!(result.count, 3);
        for b in &result.boxes {
            assert_eq!(b.class, ObjectClass::Person);
            assert!(b.confidence > 0.5);
        }
        assert_eq!(strategy.live_native_handles(), 0);
    }

    #[test]
    fn malformed_frame_releases_handles_on_error_path() {
        let mut strategy = ClassicalCvStrategy::new(&DetectionConfig::default());
        assert!(strategy.load_model());

        let frame = Frame::new(vec![0u8; 5], 4, 2);
        let result = strategy.detect_people(&frame).unwrap();

        assert_eq!(result.count, 0);
        assert_eq!(strategy.live_native_handles(), 0);
    }

    #[test]
    fn load_is_idempotent() {
        let mut strategy = ClassicalCvStrategy::new(&DetectionConfig::default());
        assert!(strategy.load_model());
        assert!(strategy.load_model());
        assert_eq!(strategy.live_native_handles(), 0);
    }
}
