//! Result types returned by [`crate::generate`].

use crate::error::{StageError, SvgStampError};
use crate::pipeline::fill::RegionGeometry;
use crate::pipeline::layout::FitPlacement;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything a generation run produced.
///
/// The SVG is always written when this value exists; the PNG and PDF are
/// `None` when their stage failed (see `stage_errors`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub svg_path: PathBuf,
    pub png_path: Option<PathBuf>,
    pub pdf_path: Option<PathBuf>,

    /// Geometry of the replaced region, `None` when the region id was not
    /// found and no image was inserted.
    pub image_region: Option<RegionGeometry>,

    /// Number of placeholder replacements applied.
    pub substitutions: usize,

    /// Pixel size of the PNG.
    pub raster_size: Option<(u32, u32)>,

    /// Where the PNG was drawn on the PDF page.
    pub placement: Option<FitPlacement>,

    /// Non-fatal stage failures, in pipeline order.
    pub stage_errors: Vec<StageError>,

    pub stats: GenerationStats,
}

impl GenerationOutput {
    pub fn image_inserted(&self) -> bool {
        self.image_region.is_some()
    }

    /// True when all three files were written.
    pub fn is_complete(&self) -> bool {
        self.stage_errors.is_empty() && self.png_path.is_some() && self.pdf_path.is_some()
    }

    /// Turn any stage failure into an error, for callers that want all three
    /// outputs or nothing to report.
    pub fn into_result(self) -> Result<Self, SvgStampError> {
        match self.stage_errors.first() {
            None => Ok(self),
            Some(first) => Err(SvgStampError::PartialFailure {
                failed: self.stage_errors.len(),
                first_error: first.to_string(),
            }),
        }
    }
}

/// Byte counts and timings of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    pub template_bytes: usize,
    pub image_bytes: usize,
    pub svg_bytes: usize,
    pub png_bytes: usize,
    pub pdf_bytes: usize,
    pub fetch_duration_ms: u64,
    pub raster_duration_ms: u64,
    pub pdf_duration_ms: u64,
    pub total_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Stage;

    fn output(errors: Vec<StageError>) -> GenerationOutput {
        GenerationOutput {
            svg_path: PathBuf::from("out.svg"),
            png_path: None,
            pdf_path: None,
            image_region: None,
            substitutions: 0,
            raster_size: None,
            placement: None,
            stage_errors: errors,
            stats: GenerationStats::default(),
        }
    }

    #[test]
    fn into_result_reports_first_failure() {
        let out = output(vec![
            StageError::RasterFailed {
                detail: "bad".into(),
            },
            StageError::Skipped {
                stage: Stage::WritePdf,
                reason: "no PNG".into(),
            },
        ]);
        assert!(!out.is_complete());
        let err = out.into_result().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("2 stage"), "got: {msg}");
        assert!(msg.contains("rasterisation failed"), "got: {msg}");
    }

    #[test]
    fn clean_output_passes_through() {
        let mut out = output(vec![]);
        out.png_path = Some(PathBuf::from("out.png"));
        out.pdf_path = Some(PathBuf::from("out.pdf"));
        assert!(out.is_complete());
        assert!(!out.image_inserted());
        assert!(out.into_result().is_ok());
    }

    #[test]
    fn serialises_to_json() {
        let json = serde_json::to_value(output(vec![])).unwrap();
        assert_eq!(json["svg_path"], "out.svg");
        assert!(json["image_region"].is_null());
    }
}
