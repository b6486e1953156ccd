//! Pixel patching for watermark repair.
//!
//! The clean reference is resampled to the watermarked image's size, and the
//! rectangle covering the watermark is copied straight across:
//! `repaired[r] = resample(reference)[r]`, everything outside `r` untouched.

use image::imageops::{self, FilterType};
use image::{GenericImageView, RgbImage};

use crate::geometry::PixelRect;

/// Resample `reference` to exactly `width` x `height`.
///
/// Uses Lanczos3; the reference is normally smaller, so this is an upscale.
#[must_use]
pub fn resample_reference(reference: &RgbImage, width: u32, height: u32) -> RgbImage {
    if reference.dimensions() == (width, height) {
        return reference.clone();
    }
    imageops::resize(reference, width, height, FilterType::Lanczos3)
}

/// Copy the pixels of `rect` out of `source`.
///
/// Returns `None` when `rect` is empty or does not fit inside `source`.
#[must_use]
pub fn cut_patch(source: &RgbImage, rect: &PixelRect) -> Option<RgbImage> {
    if rect.is_empty() || rect.x_end > source.width() || rect.y_end > source.height() {
        return None;
    }
    Some(
        source
            .view(rect.x_start, rect.y_start, rect.width(), rect.height())
            .to_image(),
    )
}

/// Overwrite `image` with `patch`, top-left corner at `(x, y)`.
///
/// No blending at the seam. Parts of the patch that fall outside `image`
/// are dropped.
pub fn apply_patch(image: &mut RgbImage, patch: &RgbImage, x: u32, y: u32) {
    imageops::replace(image, patch, i64::from(x), i64::from(y));
}
