//! Repair watermarked images by patching from a clean, lower-resolution copy.
//!
//! An object detector finds the watermark inside a configurable search
//! region of the high-resolution image. The detected boxes are merged,
//! mapped back to full-image coordinates, expanded by a margin and clipped.
//! That rectangle is then copied from the clean reference image, after the
//! reference has been resampled to the watermarked image's size. Pixels
//! outside the rectangle are left exactly as they were.
//!
//! # Quick Start
//!
//! ```no_run
//! use image::RgbImage;
//! use watermark_patch::{Detection, Detector, RepairConfig, RepairEngine};
//!
//! struct MyDetector;
//!
//! impl Detector for MyDetector {
//!     fn detect(
//!         &self,
//!         region: &RgbImage,
//!         threshold: f32,
//!     ) -> watermark_patch::Result<Vec<Detection>> {
//!         Ok(Vec::new())
//!     }
//! }
//!
//! let engine = RepairEngine::new(MyDetector);
//! let wm = std::fs::read("42-wm.jpg").unwrap();
//! let orig = std::fs::read("42-orig.jpg").unwrap();
//! match engine.repair(&wm, &orig, &RepairConfig::default()) {
//!     Ok(jpeg) => std::fs::write("42-wm.jpg", jpeg).unwrap(),
//!     Err(reason) => eprintln!("not repaired: {reason}"),
//! }
//! ```
//!
//! # Batches
//!
//! [`BatchProcessor`] pairs `<id>-wm.*` with `<id>-orig.*` entries, repairs
//! each pair in turn and keeps going when a pair fails.
//! [`archive::repair_archive`] does the same for a ZIP archive in memory.
//!
//! ```no_run
//! # use watermark_patch::{BatchProcessor, RepairConfig, Detector};
//! # fn run<D: Detector>(detector: D) -> watermark_patch::Result<()> {
//! let processor = BatchProcessor::new(detector, RepairConfig::default())?;
//! let input = std::fs::read("pairs.zip")?;
//! let (zip, output) = watermark_patch::archive::repair_archive(&processor, &input, |p| {
//!     eprintln!("{p}");
//! })?;
//! std::fs::write("repaired.zip", zip)?;
//! println!("{}", output.report());
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod archive;
pub mod batch;
pub mod config;
pub mod detector;
mod engine;
pub mod error;
pub mod geometry;
pub mod pairing;
pub mod patch;
#[cfg(feature = "onnx")]
pub mod yolo;

pub use batch::{BatchOutput, BatchProcessor, NamedEntry, Progress, TaskResult};
pub use config::{RepairConfig, SearchRegion};
pub use detector::{Detection, Detector};
pub use engine::{
    decode, encode_jpeg, RepairEngine, OUTPUT_JPEG_QUALITY, SUCCESS_MESSAGE,
};
pub use error::{Error, RepairFailure, Result};
pub use geometry::{BoundingBox, PixelRect};
#[cfg(feature = "onnx")]
pub use yolo::YoloDetector;
