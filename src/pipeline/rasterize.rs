//! SVG rasterisation: render the filled SVG to a PNG via `usvg` + `resvg`.
//!
//! Rendering is CPU-bound and font loading touches the file system, so the
//! work runs inside `tokio::task::spawn_blocking`, keeping the Tokio worker
//! threads free.

use crate::error::StageError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Largest raster edge we are willing to allocate.
pub const MAX_RASTER_DIM: u32 = 16_384;

/// Rasterisation settings.
#[derive(Debug, Clone)]
pub struct RasterOptions {
    /// Pixels per SVG user unit.
    pub scale: f32,
    /// Base directory for relative `href`s and extra fonts (usually the
    /// template's directory).
    pub resources_dir: Option<PathBuf>,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            resources_dir: None,
        }
    }
}

/// A rendered PNG and its pixel size.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Render SVG markup to PNG on the blocking thread pool.
pub async fn rasterize(svg: String, options: RasterOptions) -> Result<RasterImage, StageError> {
    tokio::task::spawn_blocking(move || rasterize_blocking(&svg, &options))
        .await
        .map_err(|e| StageError::RasterFailed {
            detail: format!("render task panicked: {e}"),
        })?
}

/// Blocking implementation of [`rasterize`].
pub fn rasterize_blocking(svg: &str, options: &RasterOptions) -> Result<RasterImage, StageError> {
    let fail = |detail: String| StageError::RasterFailed { detail };

    let opts = usvg::Options {
        resources_dir: options.resources_dir.clone(),
        fontdb: build_fontdb(options.resources_dir.as_deref()),
        ..Default::default()
    };
    let tree = usvg::Tree::from_str(svg, &opts).map_err(|e| fail(format!("parse svg: {e}")))?;

    let size = tree.size();
    let (width, height) =
        raster_size(size.width(), size.height(), options.scale).map_err(fail)?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| fail(format!("failed to allocate {width}x{height} pixmap")))?;

    let sx = width as f32 / size.width();
    let sy = height as f32 / size.height();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(sx, sy),
        &mut pixmap.as_mut(),
    );

    let png = pixmap
        .encode_png()
        .map_err(|e| fail(format!("encode png: {e}")))?;
    debug!("Rendered SVG → {}x{} px, {} bytes PNG", width, height, png.len());

    Ok(RasterImage { png, width, height })
}

/// Pixel size of an SVG of `width`×`height` user units rendered at `scale`.
pub fn raster_size(width: f32, height: f32, scale: f32) -> Result<(u32, u32), String> {
    if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
        return Err(format!("svg has invalid size {width}x{height}"));
    }
    if !(scale.is_finite() && scale > 0.0) {
        return Err(format!("invalid raster scale {scale}"));
    }
    let w = (width * scale).ceil().max(1.0);
    let h = (height * scale).ceil().max(1.0);
    if w > MAX_RASTER_DIM as f32 || h > MAX_RASTER_DIM as f32 {
        return Err(format!(
            "raster size too large: {w}x{h} (max {MAX_RASTER_DIM}x{MAX_RASTER_DIM})"
        ));
    }
    Ok((w as u32, h as u32))
}

fn build_fontdb(resources_dir: Option<&Path>) -> Arc<usvg::fontdb::Database> {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();

    if let Some(dir) = resources_dir {
        load_fonts_from_dir(&mut db, dir);
        load_fonts_from_dir(&mut db, &dir.join("fonts"));
    }
    debug!("Font database ready: {} faces", db.len());

    Arc::new(db)
}

fn load_fonts_from_dir(db: &mut usvg::fontdb::Database, dir: &Path) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in rd.flatten() {
        let path = entry.path();
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if path.is_file() && matches!(ext.as_str(), "ttf" | "otf" | "ttc") {
            let _ = db.load_font_file(&path);
        }
    }
}
