//! Repair configuration shared by every task in a batch.

use crate::error::{Error, Result};

/// Sub-rectangle of the watermarked image handed to the detector.
///
/// All four values are ratios of the image width/height in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchRegion {
    /// Left edge ratio.
    pub x_start: f64,
    /// Top edge ratio.
    pub y_start: f64,
    /// Right edge ratio.
    pub x_end: f64,
    /// Bottom edge ratio.
    pub y_end: f64,
}

impl SearchRegion {
    /// The whole image.
    pub const FULL: Self = Self {
        x_start: 0.0,
        y_start: 0.0,
        x_end: 1.0,
        y_end: 1.0,
    };

    /// Build a region from `(x_start, y_start, x_end, y_end)` ratios.
    #[must_use]
    pub fn new(x_start: f64, y_start: f64, x_end: f64, y_end: f64) -> Self {
        Self {
            x_start,
            y_start,
            x_end,
            y_end,
        }
    }

    fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("x_start", self.x_start),
            ("y_start", self.y_start),
            ("x_end", self.x_end),
            ("y_end", self.y_end),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(Error::InvalidConfig(format!(
                    "search region {name} must be within [0, 1], got {v}"
                )));
            }
        }
        if self.x_start > self.x_end || self.y_start > self.y_end {
            return Err(Error::InvalidConfig(format!(
                "search region is inverted: ({}, {}) .. ({}, {})",
                self.x_start, self.y_start, self.x_end, self.y_end
            )));
        }
        Ok(())
    }
}

impl Default for SearchRegion {
    /// Bottom half of the image.
    fn default() -> Self {
        Self::new(0.0, 0.5, 1.0, 1.0)
    }
}

/// Options controlling watermark detection and patching.
#[derive(Debug, Clone)]
pub struct RepairConfig {
    /// Minimum detector confidence for a box to count (0.0-1.0].
    pub confidence_threshold: f32,
    /// Where to look for the watermark.
    pub search_region: SearchRegion,
    /// Extra width added around the detected box, as a ratio of its width.
    pub width_expansion: f64,
    /// Extra height added around the detected box, as a ratio of its height.
    pub height_expansion: f64,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            search_region: SearchRegion::default(),
            width_expansion: 0.2,
            height_expansion: 0.1,
        }
    }
}

impl RepairConfig {
    /// Check every field is in range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let t = self.confidence_threshold;
        if t.is_nan() || t <= 0.0 || t > 1.0 {
            return Err(Error::InvalidConfig(format!(
                "confidence threshold must be within (0, 1], got {t}"
            )));
        }
        self.search_region.validate()?;
        for (name, v) in [
            ("width expansion", self.width_expansion),
            ("height expansion", self.height_expansion),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be a finite ratio >= 0, got {v}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        RepairConfig::default().validate().unwrap();
    }

    #[test]
    fn threshold_must_be_positive_and_at_most_one() {
        for t in [0.0, -0.1, 1.5, f32::NAN] {
            let cfg = RepairConfig {
                confidence_threshold: t,
                ..RepairConfig::default()
            };
            assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))), "{t}");
        }
        let cfg = RepairConfig {
            confidence_threshold: 1.0,
            ..RepairConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn inverted_region_is_rejected() {
        let cfg = RepairConfig {
            search_region: SearchRegion::new(0.6, 0.0, 0.4, 1.0),
            ..RepairConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("inverted"));
    }

    #[test]
    fn out_of_range_ratio_is_rejected() {
        let cfg = RepairConfig {
            search_region: SearchRegion::new(0.0, 0.0, 1.2, 1.0),
            ..RepairConfig::default()
        };
        assert!(cfg.validate().unwrap_err().to_string().contains("x_end"));
    }

    #[test]
    fn negative_expansion_is_rejected() {
        let cfg = RepairConfig {
            height_expansion: -0.5,
            ..RepairConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
