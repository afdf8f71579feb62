//! Non-maximum suppression.
//!
//! Both stubbed inference pipelines emit overlapping candidate boxes for the
//! same person; suppression keeps the most confident candidate per cluster.

use crate::detect::result::DetectionBox;

/// Intersection-over-union of two boxes.
pub fn iou(a: &DetectionBox, b: &DetectionBox) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let intersection = if x2 > x1 && y2 > y1 {
        (x2 - x1) * (y2 - y1)
    } else {
        0.0
    };

    let union = a.width * a.height + b.width * b.height - intersection;
    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Greedy suppression: keep boxes in descending confidence order, dropping
/// any remaining box whose overlap with a kept one reaches `iou_threshold`.
pub fn suppress(boxes: Vec<DetectionBox>, iou_threshold: f32) -> Vec<DetectionBox> {
    if boxes.is_empty() {
        return boxes;
    }

    let mut candidates = boxes;
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    while !candidates.is_empty() {
        let current = candidates.remove(0);
        candidates.retain(|other| iou(&current, other) < iou_threshold);
        keep.push(current);
    }

    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::ObjectClass;

    fn boxed(x: f32, y: f32, confidence: f32) -> DetectionBox {
        DetectionBox {
            x,
            y,
            width: 100.0,
            height: 200.0,
            confidence,
            class: ObjectClass::Person,
        }
    }

    #[test]
    fn identical_boxes_have_full_overlap() {
        let a = boxed(0.0, 0.0, 0.9);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn disjoint_boxes_have_zero_overlap() {
        let a = boxed(0.0, 0.0, 0.9);
        let b = boxed(500.0, 0.0, 0.8);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn suppression_collapses_near_duplicates() {
        let survivors = suppress(
            vec![boxed(0.0, 0.0, 0.9), boxed(4.0, 0.0, 0.6), boxed(500.0, 0.0, 0.8)],
            0.45,
        );

        assert_eq!(survivors.len(), 2);
        // The most confident of the overlapping pair survives.
        assert!((survivors[0].confidence - 0.9).abs() < 1e-6);
        assert!((survivors[1].confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn suppression_keeps_disjoint_boxes() {
        let survivors = suppress(
            vec![boxed(0.0, 0.0, 0.7), boxed(200.0, 300.0, 0.9)],
            0.45,
        );
        assert_eq!(survivors.len(), 2);
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(suppress(Vec::new(), 0.45).is_empty());
    }
}
