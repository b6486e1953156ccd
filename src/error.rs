//! Error types for the watermark-patch crate.
//!
//! Two tiers: [`Error`] aborts a whole run, [`RepairFailure`] ends a single
//! task and is recorded in the batch report.

/// Fatal errors that stop a run before any output is produced.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The detection model could not be loaded.
    #[error("failed to load detection model from {path}: {reason}")]
    ModelLoad {
        /// Path the model was loaded from.
        path: String,
        /// Backend-specific reason.
        reason: String,
    },

    /// The detection backend failed while running inference.
    #[error("inference error: {0}")]
    Inference(String),

    /// No `<id>-wm` / `<id>-orig` pair was found in the input.
    #[error("no valid image pairs found (expected names like 'id-wm.jpg' and 'id-orig.jpg')")]
    NoPairsFound,

    /// The repair configuration is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The archive container could not be read or written.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error occurred during image processing (load, save, encode).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Reason a single repair task produced no output.
///
/// The `Display` text is what appears in the batch report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepairFailure {
    /// Either image could not be decoded.
    #[error("decode failure")]
    Decode,

    /// The search region truncates to zero pixels for this image.
    #[error("search region is empty")]
    EmptySearchRegion,

    /// The detector returned no box at or above the threshold.
    #[error("watermark not located in specified region")]
    NotLocated,

    /// Clipping collapsed the patch rectangle to a line or a point.
    #[error("invalid patch dimensions")]
    InvalidPatch,

    /// The detector backend reported an error.
    #[error("detector error: {0}")]
    Detector(String),

    /// The repaired image could not be re-encoded.
    #[error("encode failure: {0}")]
    Encode(String),
}
