//! Core patch repair engine.

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use tracing::debug;

use crate::config::RepairConfig;
use crate::detector::Detector;
use crate::error::{RepairFailure, Result};
use crate::geometry::{BoundingBox, PixelRect};
use crate::patch;

/// JPEG quality used when re-encoding repaired images.
pub const OUTPUT_JPEG_QUALITY: u8 = 98;

/// Report text for a successful repair.
pub const SUCCESS_MESSAGE: &str = "repair succeeded";

/// The repair engine holding a detector handle.
///
/// Create once with [`RepairEngine::new()`] and reuse for every pair; the
/// detector is borrowed read-only by each call.
pub struct RepairEngine<D> {
    detector: D,
}

impl<D: Detector> RepairEngine<D> {
    /// Wrap a loaded detector.
    pub fn new(detector: D) -> Self {
        Self { detector }
    }

    /// The detector this engine runs.
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Find the rectangle to patch in `image`.
    ///
    /// Runs the detector inside the configured search region, merges all
    /// boxes, moves the result into image coordinates, expands it by the
    /// configured ratios and clips it to the image.
    ///
    /// # Errors
    ///
    /// - [`RepairFailure::EmptySearchRegion`] if the region has no pixels.
    /// - [`RepairFailure::NotLocated`] if no box meets the threshold.
    /// - [`RepairFailure::Detector`] if the backend fails.
    pub fn locate(
        &self,
        image: &RgbImage,
        config: &RepairConfig,
    ) -> std::result::Result<PixelRect, RepairFailure> {
        let (w, h) = image.dimensions();
        let search = PixelRect::from_ratios(&config.search_region, w, h);
        if search.is_empty() {
            return Err(RepairFailure::EmptySearchRegion);
        }
        let region = patch::cut_patch(image, &search).ok_or(RepairFailure::EmptySearchRegion)?;

        let threshold = config.confidence_threshold;
        let mut detections = self
            .detector
            .detect(&region, threshold)
            .map_err(|e| RepairFailure::Detector(e.to_string()))?;
        detections.retain(|d| d.confidence >= threshold);
        debug!(search = %search, boxes = detections.len(), "detection finished");

        let merged = BoundingBox::enclosing(detections.iter().map(|d| &d.bbox))
            .ok_or(RepairFailure::NotLocated)?;
        let rect = merged
            .to_image(&search)
            .expand(config.width_expansion, config.height_expansion)
            .clip(w, h);
        debug!(?merged, patch = %rect, "patch rectangle computed");
        Ok(rect)
    }

    /// Repair `image` in place from `reference`.
    ///
    /// `reference` may be any size; it is resampled to `image`'s dimensions
    /// before the patch is cut. Returns the rectangle that was replaced.
    ///
    /// # Errors
    ///
    /// Everything [`locate`](Self::locate) returns, plus
    /// [`RepairFailure::InvalidPatch`] when clipping left nothing to copy.
    pub fn repair_image(
        &self,
        image: &mut RgbImage,
        reference: &RgbImage,
        config: &RepairConfig,
    ) -> std::result::Result<PixelRect, RepairFailure> {
        let rect = self.locate(image, config)?;
        if rect.is_empty() {
            return Err(RepairFailure::InvalidPatch);
        }

        let resampled = patch::resample_reference(reference, image.width(), image.height());
        let clean = patch::cut_patch(&resampled, &rect).ok_or(RepairFailure::InvalidPatch)?;
        patch::apply_patch(image, &clean, rect.x_start, rect.y_start);
        Ok(rect)
    }

    /// Repair an encoded watermarked image using an encoded reference.
    ///
    /// Both blobs are decoded, the watermarked image is patched, and the
    /// result is re-encoded as JPEG at [`OUTPUT_JPEG_QUALITY`].
    ///
    /// # Errors
    ///
    /// [`RepairFailure::Decode`] if either blob fails to decode (the
    /// detector is not run), otherwise as [`repair_image`](Self::repair_image)
    /// plus [`RepairFailure::Encode`].
    pub fn repair(
        &self,
        watermarked: &[u8],
        reference: &[u8],
        config: &RepairConfig,
    ) -> std::result::Result<Vec<u8>, RepairFailure> {
        let (Some(mut image), Some(reference)) = (decode(watermarked), decode(reference)) else {
            return Err(RepairFailure::Decode);
        };
        self.repair_image(&mut image, &reference, config)?;
        encode_jpeg(&image, OUTPUT_JPEG_QUALITY).map_err(|e| RepairFailure::Encode(e.to_string()))
    }
}

/// Decode any supported raster format to RGB.
///
/// Returns `None` on failure or for a zero-sized image.
#[must_use]
pub fn decode(bytes: &[u8]) -> Option<RgbImage> {
    let img = image::load_from_memory(bytes).ok()?.to_rgb8();
    if img.width() == 0 || img.height() == 0 {
        return None;
    }
    Some(img)
}

/// Encode an RGB image as JPEG.
///
/// # Errors
///
/// Returns [`Error::Image`](crate::Error::Image) if encoding fails.
pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
        encoder.encode_image(img)?;
    }
    Ok(buf)
}
