//! Detection capability used by the repair engine.
//!
//! Any backend that can turn an image into scored boxes implements
//! [`Detector`]. The engine never sees a concrete model type, so tests can
//! plug in a stub that returns fixed boxes.

use std::sync::Arc;

use image::RgbImage;

use crate::error::Result;
use crate::geometry::BoundingBox;

/// A scored box returned by a detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Box in the frame of the image passed to [`Detector::detect`].
    pub bbox: BoundingBox,
    /// Confidence score in `[0, 1]`.
    pub confidence: f32,
}

impl Detection {
    /// Create a detection from a box and a score.
    #[must_use]
    pub fn new(bbox: BoundingBox, confidence: f32) -> Self {
        Self { bbox, confidence }
    }
}

/// Object detector contract.
///
/// `detect` returns every box whose confidence is at least `threshold`,
/// each in `region`'s own coordinates (origin at its top-left corner).
/// An empty vector means nothing was found. Callers must not pass an
/// empty image.
pub trait Detector {
    /// Run detection on `region`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the backend itself fails (inference,
    /// tensor shape); "nothing found" is `Ok(vec![])`.
    fn detect(&self, region: &RgbImage, threshold: f32) -> Result<Vec<Detection>>;
}

impl<D: Detector + ?Sized> Detector for &D {
    fn detect(&self, region: &RgbImage, threshold: f32) -> Result<Vec<Detection>> {
        (**self).detect(region, threshold)
    }
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&self, region: &RgbImage, threshold: f32) -> Result<Vec<Detection>> {
        (**self).detect(region, threshold)
    }
}

impl<D: Detector + ?Sized> Detector for Arc<D> {
    fn detect(&self, region: &RgbImage, threshold: f32) -> Result<Vec<Detection>> {
        (**self).detect(region, threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<Detection>);

    impl Detector for Fixed {
        fn detect(&self, _region: &RgbImage, threshold: f32) -> Result<Vec<Detection>> {
            Ok(self
                .0
                .iter()
                .copied()
                .filter(|d| d.confidence >= threshold)
                .collect())
        }
    }

    #[test]
    fn shared_handles_forward_to_backend() {
        let det = Arc::new(Fixed(vec![Detection::new(
            BoundingBox::new(1.0, 2.0, 3.0, 4.0),
            0.9,
        )]));
        let img = RgbImage::new(8, 8);

        let dyn_handle: Arc<dyn Detector> = det.clone();
        assert_eq!(dyn_handle.detect(&img, 0.5).unwrap().len(), 1);
        assert!(det.detect(&img, 0.95).unwrap().is_empty());

        let boxed: Box<dyn Detector> = Box::new(Fixed(Vec::new()));
        assert!(boxed.detect(&img, 0.1).unwrap().is_empty());
    }
}
