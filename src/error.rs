//! Error types for the svgstamp library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SvgStampError`] is **fatal**: the generation cannot proceed at all
//!   (template missing or malformed, image could not be fetched, SVG output
//!   could not be written). Returned as `Err(SvgStampError)` from the
//!   top-level `generate*` functions.
//!
//! * [`StageError`] is **non-fatal**: a late export stage (PNG or PDF) failed
//!   but the outputs written before it are fine. Stored inside
//!   [`crate::output::GenerationOutput`] so callers can inspect partial
//!   success instead of losing the SVG to a rasteriser glitch.

use crate::progress::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the svgstamp library.
///
/// Export-stage failures use [`StageError`] and are stored in
/// [`crate::output::GenerationOutput`] rather than propagated here.
#[derive(Debug, Error)]
pub enum SvgStampError {
    // ── Template errors ───────────────────────────────────────────────────
    /// Template file was not found at the given path.
    #[error("SVG template not found: '{path}'\nCheck the path exists and is readable.")]
    TemplateNotFound { path: PathBuf },

    /// Process does not have read permission on a file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The template is not well-formed markup.
    #[error("SVG template '{path}' is malformed: {detail}")]
    InvalidTemplate { path: PathBuf, detail: String },

    // ── Image errors ──────────────────────────────────────────────────────
    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// A local image source does not exist.
    #[error("Image file not found: '{path}'")]
    ImageNotFound { path: PathBuf },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The SVG was written but at least one later stage failed.
    ///
    /// Returned by [`crate::output::GenerationOutput::into_result`] when
    /// the caller wants to treat any stage failure as an error.
    #[error("{failed} stage(s) failed during generation; first: {first_error}")]
    PartialFailure { failed: usize, first_error: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single export stage.
///
/// The generation continues past it; whatever was already written stays on
/// disk.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum StageError {
    /// SVG → PNG rasterisation failed.
    #[error("rasterisation failed: {detail}")]
    RasterFailed { detail: String },

    /// PNG → PDF layout or write failed.
    #[error("PDF export failed: {detail}")]
    PdfFailed { detail: String },

    /// The stage produced its bytes but they could not be written.
    #[error("{stage}: failed to write '{path}': {detail}")]
    WriteFailed {
        stage: Stage,
        path: PathBuf,
        detail: String,
    },

    /// The stage never ran because its input was not produced.
    #[error("{stage} skipped: {reason}")]
    Skipped { stage: Stage, reason: String },
}

impl StageError {
    /// The stage this error belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            StageError::RasterFailed { .. } => Stage::Rasterize,
            StageError::PdfFailed { .. } => Stage::WritePdf,
            StageError::WriteFailed { stage, .. } | StageError::Skipped { stage, .. } => *stage,
        }
    }
}
