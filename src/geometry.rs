//! Coordinate math between the detector's frame and the full image.
//!
//! Three frames are kept apart by type:
//! - [`BoundingBox`]: float box relative to the search region's top-left.
//! - [`ImageBox`]: integer box in full-image coordinates, possibly out of bounds.
//! - [`PixelRect`]: integer rectangle clipped to the image, ready for slicing.

use crate::config::SearchRegion;

/// A detector box in the coordinate frame of the image it was run on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Left edge.
    pub x_min: f32,
    /// Top edge.
    pub y_min: f32,
    /// Right edge.
    pub x_max: f32,
    /// Bottom edge.
    pub y_max: f32,
}

impl BoundingBox {
    /// Create a box from its corners.
    #[must_use]
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Box width (zero for degenerate boxes).
    #[must_use]
    pub fn width(&self) -> f32 {
        (self.x_max - self.x_min).max(0.0)
    }

    /// Box height (zero for degenerate boxes).
    #[must_use]
    pub fn height(&self) -> f32 {
        (self.y_max - self.y_min).max(0.0)
    }

    /// Intersection over union with another box in the same frame.
    #[must_use]
    pub fn iou(&self, other: &Self) -> f32 {
        let iw = (self.x_max.min(other.x_max) - self.x_min.max(other.x_min)).max(0.0);
        let ih = (self.y_max.min(other.y_max) - self.y_min.max(other.y_min)).max(0.0);
        let inter = iw * ih;
        let union = self.width() * self.height() + other.width() * other.height() - inter;
        if union > 0.0 {
            inter / union
        } else {
            0.0
        }
    }

    /// Smallest box enclosing every box in `boxes`.
    ///
    /// Detectors sometimes split one watermark into fragments; this merges
    /// them back. Returns `None` for an empty input.
    #[must_use]
    pub fn enclosing<'a, I>(boxes: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        boxes.into_iter().copied().reduce(|acc, b| Self {
            x_min: acc.x_min.min(b.x_min),
            y_min: acc.y_min.min(b.y_min),
            x_max: acc.x_max.max(b.x_max),
            y_max: acc.y_max.max(b.y_max),
        })
    }

    /// Move this region-relative box into full-image coordinates.
    ///
    /// Each coordinate is truncated toward zero before `origin` is added.
    /// Non-finite or huge coordinates saturate instead of wrapping.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_image(&self, origin: &PixelRect) -> ImageBox {
        let ox = i64::from(origin.x_start);
        let oy = i64::from(origin.y_start);
        ImageBox {
            x_min: (self.x_min as i64).saturating_add(ox),
            y_min: (self.y_min as i64).saturating_add(oy),
            x_max: (self.x_max as i64).saturating_add(ox),
            y_max: (self.y_max as i64).saturating_add(oy),
        }
    }
}

/// A box in full-image pixel coordinates, not yet clipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBox {
    /// Left edge.
    pub x_min: i64,
    /// Top edge.
    pub y_min: i64,
    /// Right edge.
    pub x_max: i64,
    /// Bottom edge.
    pub y_max: i64,
}

impl ImageBox {
    /// Grow the box symmetrically.
    ///
    /// Each side moves out by `(size * ratio) / 2`, truncated. Coordinates
    /// saturate at the `i64` range, so any finite ratio is safe to clip.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn expand(&self, width_ratio: f64, height_ratio: f64) -> Self {
        let margin = |min: i64, max: i64, ratio: f64| {
            (max.saturating_sub(min) as f64 * ratio / 2.0) as i64
        };
        let w_margin = margin(self.x_min, self.x_max, width_ratio);
        let h_margin = margin(self.y_min, self.y_max, height_ratio);
        Self {
            x_min: self.x_min.saturating_sub(w_margin),
            y_min: self.y_min.saturating_sub(h_margin),
            x_max: self.x_max.saturating_add(w_margin),
            y_max: self.y_max.saturating_add(h_margin),
        }
    }

    /// Clip every coordinate to `[0, width]` / `[0, height]`.
    ///
    /// An inverted box collapses to zero size rather than wrapping.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn clip(&self, width: u32, height: u32) -> PixelRect {
        let cx = |v: i64| v.clamp(0, i64::from(width)) as u32;
        let cy = |v: i64| v.clamp(0, i64::from(height)) as u32;
        let x_start = cx(self.x_min);
        let y_start = cy(self.y_min);
        PixelRect {
            x_start,
            y_start,
            x_end: cx(self.x_max).max(x_start),
            y_end: cy(self.y_max).max(y_start),
        }
    }
}

/// A half-open pixel rectangle `[x_start, x_end) x [y_start, y_end)` inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    /// First column.
    pub x_start: u32,
    /// First row.
    pub y_start: u32,
    /// One past the last column.
    pub x_end: u32,
    /// One past the last row.
    pub y_end: u32,
}

impl PixelRect {
    /// Convert search-region ratios to pixels for a `width` x `height` image.
    ///
    /// Each ratio is multiplied by the matching dimension and floored.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_ratios(region: &SearchRegion, width: u32, height: u32) -> Self {
        let px = |ratio: f64, dim: u32| {
            ((f64::from(dim) * ratio).floor().max(0.0) as u32).min(dim)
        };
        let x_start = px(region.x_start, width);
        let y_start = px(region.y_start, height);
        Self {
            x_start,
            y_start,
            x_end: px(region.x_end, width).max(x_start),
            y_end: px(region.y_end, height).max(y_start),
        }
    }

    /// Number of columns.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.x_end - self.x_start
    }

    /// Number of rows.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.y_end - self.y_start
    }

    /// True when the rectangle covers no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

impl std::fmt::Display for PixelRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {})..({}, {})",
            self.x_start, self.y_start, self.x_end, self.y_end
        )
    }
}
