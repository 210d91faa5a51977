//! Progress-callback trait for per-stage generation events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::GenerationConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its stages.
//!
//! # Example
//!
//! ```rust
//! use svgstamp::{GenerationConfig, GenerationProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl GenerationProgressCallback for Printer {
//!     fn on_stage_complete(&self, stage: Stage, detail: &str) {
//!         eprintln!("{stage}: {detail}");
//!     }
//! }
//!
//! let config = GenerationConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn GenerationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One step of the generation pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    LoadTemplate,
    FetchImage,
    FillTemplate,
    WriteSvg,
    Rasterize,
    WritePdf,
}

impl Stage {
    /// All stages in the order the pipeline runs them.
    pub const ALL: [Stage; 6] = [
        Stage::LoadTemplate,
        Stage::FetchImage,
        Stage::FillTemplate,
        Stage::WriteSvg,
        Stage::Rasterize,
        Stage::WritePdf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::LoadTemplate => "load-template",
            Stage::FetchImage => "fetch-image",
            Stage::FillTemplate => "fill-template",
            Stage::WriteSvg => "write-svg",
            Stage::Rasterize => "rasterize",
            Stage::WritePdf => "write-pdf",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Called by the generation pipeline as it runs each stage.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called once before the template is read.
    fn on_generation_start(&self, total_stages: usize) {
        let _ = total_stages;
    }

    /// Called just before a stage starts.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes; `detail` is a short human-readable
    /// summary (bytes written, substitutions applied, …).
    fn on_stage_complete(&self, stage: Stage, detail: &str) {
        let _ = (stage, detail);
    }

    /// Called when a stage fails, fatally or not.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// Called once after the last stage has been attempted.
    ///
    /// `failed_stages` counts non-fatal stage errors.
    fn on_generation_complete(&self, failed_stages: usize) {
        let _ = failed_stages;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GenerationConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;
