//! YOLO detector backend using ONNX Runtime.
//!
//! Expects a YOLOv8-style export with a single input `(1, 3, S, S)` and an
//! output `(1, 4 + classes, anchors)` where the first four features are
//! `[x_center, y_center, width, height]` in input pixels.

use std::path::Path;
use std::sync::Mutex;

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use tracing::{debug, info};

use crate::detector::{Detection, Detector};
use crate::error::{Error, Result};
use crate::geometry::BoundingBox;

/// Default model location, relative to the working directory.
pub const DEFAULT_MODEL_PATH: &str = "best.onnx";

/// Network input side length used by standard YOLOv8 exports.
pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default `IoU` threshold for non-maximum suppression.
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// A loaded YOLO model.
///
/// Load once and share (e.g. behind an `Arc`); inference is serialized
/// internally because the runtime needs exclusive access to the session.
pub struct YoloDetector {
    session: Mutex<Session>,
    input_size: u32,
    iou_threshold: f32,
}

impl YoloDetector {
    /// Load a model from `path` with default input size and NMS threshold.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelLoad`] if the file is missing or the runtime
    /// rejects it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let load_err = |reason: String| Error::ModelLoad {
            path: path.display().to_string(),
            reason,
        };
        if !path.is_file() {
            return Err(load_err("file not found".to_string()));
        }

        info!("Loading detection model from {}", path.display());
        let session = Session::builder()
            .map_err(|e| load_err(e.to_string()))?
            .commit_from_file(path)
            .map_err(|e| load_err(e.to_string()))?;
        info!("Detection model loaded");

        Ok(Self {
            session: Mutex::new(session),
            input_size: DEFAULT_INPUT_SIZE,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
        })
    }

    /// Override the network input size (must match the export).
    #[must_use]
    pub fn with_input_size(mut self, size: u32) -> Self {
        self.input_size = size;
        self
    }

    /// Override the NMS `IoU` threshold.
    #[must_use]
    pub fn with_iou_threshold(mut self, iou: f32) -> Self {
        self.iou_threshold = iou;
        self
    }

    /// Resize to the square input and convert to normalized CHW.
    fn preprocess(&self, region: &RgbImage) -> Array4<f32> {
        let size = self.input_size;
        let resized = imageops::resize(region, size, size, FilterType::Triangle);
        let s = size as usize;
        let mut input = Array4::zeros((1, 3, s, s));
        for (x, y, px) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                input[[0, c, y, x]] = f32::from(px[c]) / 255.0;
            }
        }
        input
    }
}

impl Detector for YoloDetector {
    fn detect(&self, region: &RgbImage, threshold: f32) -> Result<Vec<Detection>> {
        let input = self.preprocess(region);
        let tensor =
            TensorRef::from_array_view(input.view()).map_err(|e| Error::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| Error::Inference("detector session lock poisoned".to_string()))?;
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| Error::Inference(e.to_string()))?;
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::Inference(format!("failed to extract tensor: {e}")))?;

        decode_output(
            shape.as_ref(),
            data,
            region.dimensions(),
            self.input_size,
            threshold,
            self.iou_threshold,
        )
    }
}

/// Decode raw `(1, 4 + classes, anchors)` output into region-frame boxes.
///
/// Coordinates are in pixels of the `input_size` square and are scaled back
/// to `region` (width, height). A box's confidence is its best class score.
#[allow(clippy::cast_precision_loss)]
fn decode_output(
    dims: &[i64],
    data: &[f32],
    region: (u32, u32),
    input_size: u32,
    threshold: f32,
    iou_threshold: f32,
) -> Result<Vec<Detection>> {
    let bad_shape = || Error::Inference(format!("unexpected output shape {dims:?}"));
    let &[_, features, anchors] = dims else {
        return Err(bad_shape());
    };
    let features = usize::try_from(features).map_err(|_| bad_shape())?;
    let anchors = usize::try_from(anchors).map_err(|_| bad_shape())?;
    if features < 5 {
        return Err(bad_shape());
    }
    let needed = features.checked_mul(anchors).ok_or_else(bad_shape)?;
    if data.len() < needed {
        return Err(Error::Inference(format!(
            "output holds {} values, shape {dims:?} needs {needed}",
            data.len()
        )));
    }

    let sx = region.0 as f32 / input_size as f32;
    let sy = region.1 as f32 / input_size as f32;
    let at = |feature: usize, anchor: usize| data[feature * anchors + anchor];

    let mut found = Vec::new();
    for a in 0..anchors {
        let confidence = (4..features).map(|f| at(f, a)).fold(0.0f32, f32::max);
        if confidence < threshold {
            continue;
        }
        let (cx, cy, w, h) = (at(0, a), at(1, a), at(2, a), at(3, a));
        let bbox = BoundingBox::new(
            (cx - w / 2.0) * sx,
            (cy - h / 2.0) * sy,
            (cx + w / 2.0) * sx,
            (cy + h / 2.0) * sy,
        );
        found.push(Detection::new(bbox, confidence));
    }
    debug!(raw = found.len(), "boxes above threshold before NMS");
    Ok(non_max_suppression(found, iou_threshold))
}

/// Class-agnostic NMS, highest confidence first.
fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut keep: Vec<Detection> = Vec::with_capacity(detections.len());
    for det in detections {
        if keep.iter().all(|k| k.bbox.iou(&det.bbox) < iou_threshold) {
            keep.push(det);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x0: f32, y0: f32, x1: f32, y1: f32, conf: f32) -> Detection {
        Detection::new(BoundingBox::new(x0, y0, x1, y1), conf)
    }

    #[test]
    fn nms_drops_overlapping_lower_scores() {
        let kept = non_max_suppression(
            vec![
                det(0.0, 0.0, 10.0, 10.0, 0.6),
                det(1.0, 1.0, 10.0, 10.0, 0.9),
                det(50.0, 50.0, 60.0, 60.0, 0.7),
            ],
            0.45,
        );
        let scores: Vec<_> = kept.iter().map(|d| d.confidence).collect();
        assert_eq!(scores, [0.9, 0.7]);
    }

    #[test]
    fn missing_model_is_a_load_error() {
        let err = YoloDetector::load("/definitely/not/here.onnx").err().unwrap();
        assert!(matches!(err, Error::ModelLoad { .. }));
    }

    /// Lay out anchors as `(1, features, anchors)`, feature-major.
    fn tensor(anchors: &[[f32; 6]]) -> (Vec<i64>, Vec<f32>) {
        let n = anchors.len();
        let mut data = vec![0.0; 6 * n];
        for (a, feats) in anchors.iter().enumerate() {
            for (f, v) in feats.iter().enumerate() {
                data[f * n + a] = *v;
            }
        }
        (vec![1, 6, i64::try_from(n).unwrap()], data)
    }

    #[test]
    fn decode_scales_center_boxes_to_region() {
        // cx, cy, w, h, class0, class1
        let (dims, data) = tensor(&[[320.0, 320.0, 64.0, 128.0, 0.1, 0.8]]);
        let found = decode_output(&dims, &data, (320, 160), 640, 0.5, 0.45).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].bbox, BoundingBox::new(144.0, 64.0, 176.0, 96.0));
        assert!((found[0].confidence - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn decode_drops_anchor_below_threshold() {
        let (dims, data) = tensor(&[
            [100.0, 100.0, 20.0, 20.0, 0.49, 0.2],
            [400.0, 400.0, 20.0, 20.0, 0.3, 0.5],
        ]);
        let found = decode_output(&dims, &data, (640, 640), 640, 0.5, 0.45).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].bbox, BoundingBox::new(390.0, 390.0, 410.0, 410.0));
    }

    #[test]
    fn decode_rejects_bad_shapes() {
        let data = vec![0.0; 64];
        for dims in [
            vec![6, 8],
            vec![1, 4, 8],
            vec![1, -1, 8],
            vec![1, 6, -1],
            vec![1, 6, i64::MAX],
            vec![1, 6, 100],
        ] {
            let err = decode_output(&dims, &data, (10, 10), 640, 0.5, 0.45).unwrap_err();
            assert!(matches!(err, Error::Inference(_)), "{dims:?}");
        }
    }
}
