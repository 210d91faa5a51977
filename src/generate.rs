//! Generation entry points.
//!
//! [`generate`] runs the whole pipeline once, top to bottom:
//!
//! 1. read the template (fatal on failure)
//! 2. fetch the image (fatal on failure, nothing has been written yet)
//! 3. fill the template (fatal if the markup is malformed)
//! 4. write the SVG (fatal on failure)
//! 5. rasterise and write the PNG (non-fatal)
//! 6. lay out and write the PDF (non-fatal, skipped without a PNG)
//!
//! Non-fatal failures are logged, reported to the progress callback and
//! collected in [`GenerationOutput::stage_errors`].

use crate::config::GenerationConfig;
use crate::error::{StageError, SvgStampError};
use crate::output::{GenerationOutput, GenerationStats};
use crate::pipeline::fill::{self, RegionGeometry};
use crate::pipeline::input::{self, FetchedImage};
use crate::pipeline::rasterize::{self, RasterImage, RasterOptions};
use crate::pipeline::template::Document;
use crate::pipeline::{encode, pdf};
use crate::progress::{GenerationProgressCallback, Stage};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// A filled template, serialised and ready to write.
#[derive(Debug, Clone)]
pub struct FilledTemplate {
    pub svg: String,
    pub substitutions: usize,
    /// `None` when the region id matched nothing.
    pub image_region: Option<RegionGeometry>,
}

/// Fill `markup` with the configured placeholders and `image`.
///
/// This is the pure core of [`generate`]: no I/O, no async.
pub fn fill_template(
    markup: &str,
    config: &GenerationConfig,
    image: &FetchedImage,
) -> Result<FilledTemplate, SvgStampError> {
    let mut doc = Document::parse(markup).map_err(|e| SvgStampError::InvalidTemplate {
        path: config.template_path.clone(),
        detail: e.to_string(),
    })?;

    let substitutions = fill::substitute_placeholders(
        &mut doc,
        &config.placeholders,
        config.strip_text_anchoring,
    );

    let href = encode::to_data_uri(image);
    let image_region = fill::replace_region(&mut doc, &config.region_id, &href);
    if image_region.is_none() {
        warn!(
            "Region '{}' not found in template; no image inserted",
            config.region_id
        );
    }

    Ok(FilledTemplate {
        svg: doc.to_svg_string(),
        substitutions,
        image_region,
    })
}

/// Run the full template → SVG/PNG/PDF pipeline.
///
/// # Returns
/// `Ok(GenerationOutput)` once the SVG is written, even if the PNG or PDF
/// stage failed (check `output.stage_errors`).
///
/// # Errors
/// Returns `Err(SvgStampError)` only for fatal errors: unreadable or
/// malformed template, image fetch failure, SVG write failure.
pub async fn generate(config: &GenerationConfig) -> Result<GenerationOutput, SvgStampError> {
    let total_start = Instant::now();
    let progress = Reporter(config.progress_callback.as_deref());
    let mut stats = GenerationStats::default();
    let mut stage_errors = Vec::new();

    info!("Starting generation: {}", config.template_path.display());
    progress.generation_start();

    // ── Step 1: Load template ────────────────────────────────────────────
    progress.start(Stage::LoadTemplate);
    let markup = input::load_template(&config.template_path)
        .await
        .map_err(|e| progress.fatal(Stage::LoadTemplate, e))?;
    stats.template_bytes = markup.len();
    progress.complete(Stage::LoadTemplate, &format!("{} bytes", markup.len()));

    // ── Step 2: Fetch image ──────────────────────────────────────────────
    progress.start(Stage::FetchImage);
    let fetch_start = Instant::now();
    let image = input::fetch_image(&config.image_source, config.download_timeout_secs)
        .await
        .map_err(|e| progress.fatal(Stage::FetchImage, e))?;
    stats.fetch_duration_ms = fetch_start.elapsed().as_millis() as u64;
    stats.image_bytes = image.bytes.len();
    progress.complete(
        Stage::FetchImage,
        &format!("{} bytes {}", image.bytes.len(), image.mime_type),
    );

    // ── Step 3: Fill template ────────────────────────────────────────────
    progress.start(Stage::FillTemplate);
    let filled = fill_template(&markup, config, &image)
        .map_err(|e| progress.fatal(Stage::FillTemplate, e))?;
    drop(image);
    progress.complete(
        Stage::FillTemplate,
        &format!(
            "{} substitution(s), image {}",
            filled.substitutions,
            if filled.image_region.is_some() {
                "inserted"
            } else {
                "not inserted"
            }
        ),
    );

    // ── Step 4: Write SVG ────────────────────────────────────────────────
    progress.start(Stage::WriteSvg);
    write_atomic(&config.svg_output, filled.svg.as_bytes())
        .await
        .map_err(|source| {
            progress.fatal(
                Stage::WriteSvg,
                SvgStampError::OutputWriteFailed {
                    path: config.svg_output.clone(),
                    source,
                },
            )
        })?;
    stats.svg_bytes = filled.svg.len();
    info!("Updated SVG saved as {}", config.svg_output.display());
    progress.complete(Stage::WriteSvg, &config.svg_output.display().to_string());

    // ── Step 5: Rasterise ────────────────────────────────────────────────
    progress.start(Stage::Rasterize);
    let raster_start = Instant::now();
    let raster_options = RasterOptions {
        scale: config.raster_scale,
        resources_dir: resources_dir(&config.template_path),
    };
    let raster = match rasterize::rasterize(filled.svg, raster_options).await {
        Ok(raster) => match write_atomic(&config.png_output, &raster.png).await {
            Ok(()) => Some(raster),
            Err(e) => {
                progress.stage_error(
                    &mut stage_errors,
                    StageError::WriteFailed {
                        stage: Stage::Rasterize,
                        path: config.png_output.clone(),
                        detail: e.to_string(),
                    },
                );
                None
            }
        },
        Err(e) => {
            progress.stage_error(&mut stage_errors, e);
            None
        }
    };
    stats.raster_duration_ms = raster_start.elapsed().as_millis() as u64;
    if let Some(ref r) = raster {
        stats.png_bytes = r.png.len();
        info!("PNG image saved as {}", config.png_output.display());
        progress.complete(
            Stage::Rasterize,
            &format!("{}x{} px → {}", r.width, r.height, config.png_output.display()),
        );
    }

    // ── Step 6: PDF ──────────────────────────────────────────────────────
    progress.start(Stage::WritePdf);
    let pdf_start = Instant::now();
    let pdf_doc = match raster {
        Some(ref raster) => match build_pdf(raster, config).await {
            Ok(doc) => match write_atomic(&config.pdf_output, &doc.bytes).await {
                Ok(()) => Some(doc),
                Err(e) => {
                    progress.stage_error(
                        &mut stage_errors,
                        StageError::WriteFailed {
                            stage: Stage::WritePdf,
                            path: config.pdf_output.clone(),
                            detail: e.to_string(),
                        },
                    );
                    None
                }
            },
            Err(e) => {
                progress.stage_error(&mut stage_errors, e);
                None
            }
        },
        None => {
            progress.stage_error(
                &mut stage_errors,
                StageError::Skipped {
                    stage: Stage::WritePdf,
                    reason: "no PNG was produced".into(),
                },
            );
            None
        }
    };
    stats.pdf_duration_ms = pdf_start.elapsed().as_millis() as u64;
    if let Some(ref doc) = pdf_doc {
        stats.pdf_bytes = doc.bytes.len();
        info!("PDF document saved as {}", config.pdf_output.display());
        progress.complete(Stage::WritePdf, &config.pdf_output.display().to_string());
    }

    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Generation complete: {} substitution(s), {} stage error(s), {}ms total",
        filled.substitutions,
        stage_errors.len(),
        stats.total_duration_ms
    );
    progress.generation_complete(stage_errors.len());

    Ok(GenerationOutput {
        svg_path: config.svg_output.clone(),
        png_path: raster.as_ref().map(|_| config.png_output.clone()),
        pdf_path: pdf_doc.as_ref().map(|_| config.pdf_output.clone()),
        image_region: filled.image_region,
        substitutions: filled.substitutions,
        raster_size: raster.as_ref().map(|r| (r.width, r.height)),
        placement: pdf_doc.as_ref().map(|d| d.placement),
        stage_errors,
        stats,
    })
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(config: &GenerationConfig) -> Result<GenerationOutput, SvgStampError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SvgStampError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn build_pdf(
    raster: &RasterImage,
    config: &GenerationConfig,
) -> Result<pdf::PdfDocument, StageError> {
    let png = raster.png.clone();
    let page = config.page_size;
    let title = config.pdf_title.clone();
    tokio::task::spawn_blocking(move || pdf::write_pdf(&png, &page, title.as_deref()))
        .await
        .map_err(|e| StageError::PdfFailed {
            detail: format!("PDF task panicked: {e}"),
        })?
}

/// Directory relative `href`s and local fonts are resolved against.
fn resources_dir(template_path: &Path) -> Option<PathBuf> {
    template_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// Write `bytes` to `path` via a sibling temp file and a rename, creating
/// parent directories as needed. Readers never see a half-written file.
async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Thin wrapper that fans stage events out to the optional callback and
/// the log.
struct Reporter<'a>(Option<&'a dyn GenerationProgressCallback>);

impl Reporter<'_> {
    fn generation_start(&self) {
        if let Some(cb) = self.0 {
            cb.on_generation_start(Stage::ALL.len());
        }
    }

    fn start(&self, stage: Stage) {
        debug!("Stage {} started", stage);
        if let Some(cb) = self.0 {
            cb.on_stage_start(stage);
        }
    }

    fn complete(&self, stage: Stage, detail: &str) {
        debug!("Stage {} complete: {}", stage, detail);
        if let Some(cb) = self.0 {
            cb.on_stage_complete(stage, detail);
        }
    }

    fn fatal(&self, stage: Stage, err: SvgStampError) -> SvgStampError {
        error!("Stage {} failed: {}", stage, err);
        if let Some(cb) = self.0 {
            cb.on_stage_error(stage, &err.to_string());
        }
        err
    }

    fn stage_error(&self, errors: &mut Vec<StageError>, err: StageError) {
        error!("Stage {} failed: {}", err.stage(), err);
        if let Some(cb) = self.0 {
            cb.on_stage_error(err.stage(), &err.to_string());
        }
        errors.push(err);
    }

    fn generation_complete(&self, failed: usize) {
        if let Some(cb) = self.0 {
            cb.on_generation_complete(failed);
        }
    }
}
