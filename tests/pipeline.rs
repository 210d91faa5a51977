//! Integration tests for the full generation pipeline.
//!
//! Every test works inside its own temporary directory and uses a local
//! image file, so no network access is needed.
//!
//! Run with:
//!   cargo test --test pipeline -- --nocapture

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use svgstamp::{
    generate, generate_sync, GenerationConfig, GenerationProgressCallback, PageSize, Stage,
    StageError, SvgStampError,
};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

// ── Test helpers ─────────────────────────────────────────────────────────────

const TEMPLATE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="400" height="300" viewBox="0 0 400 300">
  <rect width="400" height="300" fill="#f4efe6"/>
  <text x="200" y="40" text-anchor="middle" font-size="24">$auctionName</text>
  <text x="20" y="280" dominant-baseline="middle"><tspan>Ends $auctionDate</tspan></text>
  <text x="20" y="260">Static caption</text>
  <rect id="rect5" x="50" y="60" width="300" height="180" fill="#cccccc"/>
</svg>
"##;

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        width,
        height,
        Rgba([200, 40, 40, 255]),
    ));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// Route library logs through the test harness; `RUST_LOG=debug` shows them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A temp dir with `template.svg` and `photo.png` in it.
fn workspace(template: &str) -> TempDir {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("template.svg"), template).unwrap();
    std::fs::write(dir.path().join("photo.png"), png_bytes(16, 9)).unwrap();
    dir
}

fn config_in(dir: &Path) -> svgstamp::GenerationConfigBuilder {
    GenerationConfig::builder()
        .template_path(dir.join("template.svg"))
        .image_source(dir.join("photo.png").to_string_lossy())
        .placeholder("$auctionName", "Harbour Estate Sale")
        .placeholder("$auctionDate", "June 3")
        .outputs_from_stem(dir.join("out/result"))
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()))
}

// ── Full run ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_run_writes_all_three_outputs() {
    let dir = workspace(TEMPLATE);
    let config = config_in(dir.path()).build().unwrap();

    let output = generate(&config).await.unwrap();

    assert!(output.is_complete(), "errors: {:?}", output.stage_errors);
    assert_eq!(output.substitutions, 2);

    let svg = read(&output.svg_path);
    assert!(svg.contains("Harbour Estate Sale"));
    assert!(svg.contains("Ends June 3"));
    assert!(!svg.contains("$auctionName"));
    assert!(!svg.contains("$auctionDate"));
    assert!(svg.contains("Static caption"));
    assert!(!svg.contains("text-anchor"));
    assert!(!svg.contains("dominant-baseline"));
    assert!(!svg.contains(r#"id="rect5""#));
    assert!(svg.contains("data:image/png;base64,"));

    let png_path = output.png_path.clone().unwrap();
    let png = std::fs::read(&png_path).unwrap();
    assert!(png.starts_with(b"\x89PNG"));
    assert_eq!(output.raster_size, Some((400, 300)));

    let pdf_path = output.pdf_path.clone().unwrap();
    let pdf = std::fs::read(&pdf_path).unwrap();
    assert!(pdf.starts_with(b"%PDF-"));
    assert_eq!(output.stats.pdf_bytes, pdf.len());

    assert!(!dir.path().join("out/result.svg.tmp").exists());
}

#[tokio::test]
async fn image_takes_over_region_geometry() {
    let dir = workspace(TEMPLATE);
    let config = config_in(dir.path()).build().unwrap();

    let output = generate(&config).await.unwrap();

    let region = output.image_region.expect("image should be inserted");
    assert_eq!(
        (
            region.x.as_str(),
            region.y.as_str(),
            region.width.as_str(),
            region.height.as_str()
        ),
        ("50", "60", "300", "180")
    );

    let svg = read(&output.svg_path);
    let image_tag = svg
        .split("<image")
        .nth(1)
        .and_then(|rest| rest.split("/>").next())
        .expect("an <image> element");
    for attr in [
        r#"x="50""#,
        r#"y="60""#,
        r#"width="300""#,
        r#"height="180""#,
        r#"preserveAspectRatio="xMidYMid slice""#,
        r#" href="data:image/png;base64,"#,
        r#" xlink:href="data:image/png;base64,"#,
    ] {
        assert!(image_tag.contains(attr), "missing {attr} in {image_tag}");
    }
}

#[tokio::test]
async fn pdf_is_scaled_to_fit_and_centred() {
    let dir = workspace(TEMPLATE);
    let config = config_in(dir.path())
        .page_size(PageSize::Custom {
            width: 595.0,
            height: 842.0,
        })
        .build()
        .unwrap();

    let output = generate(&config).await.unwrap();

    // 400x300 px on 595x842 pt: width-bound.
    let placement = output.placement.unwrap();
    assert!((placement.scale - 595.0 / 400.0).abs() < 1e-9);
    assert!((placement.width - 595.0).abs() < 1e-9);
    assert!((placement.height - 446.25).abs() < 1e-9);
    assert!(placement.x.abs() < 1e-9);
    assert!((placement.y - 197.875).abs() < 1e-9);
}

// ── Forgiving behaviour ──────────────────────────────────────────────────────

#[tokio::test]
async fn missing_region_completes_without_image() {
    let dir = workspace(&TEMPLATE.replace(r#"id="rect5""#, r#"id="frame""#));
    let config = config_in(dir.path()).build().unwrap();

    let output = generate(&config).await.unwrap();

    assert!(!output.image_inserted());
    assert!(output.stage_errors.is_empty());
    assert!(output.is_complete());
    let svg = read(&output.svg_path);
    assert!(!svg.contains("<image"));
    assert!(svg.contains(r#"id="frame""#));
}

#[tokio::test]
async fn anchoring_can_be_kept() {
    let dir = workspace(TEMPLATE);
    let config = config_in(dir.path())
        .strip_text_anchoring(false)
        .build()
        .unwrap();

    let output = generate(&config).await.unwrap();

    let svg = read(&output.svg_path);
    assert!(svg.contains(r#"text-anchor="middle""#));
}

#[tokio::test]
async fn zero_size_template_keeps_svg_and_records_stage_errors() {
    let template = r#"<svg xmlns="http://www.w3.org/2000/svg" width="0" height="0">
  <text>$auctionName</text>
</svg>"#;
    let dir = workspace(template);
    let config = config_in(dir.path()).build().unwrap();

    let output = generate(&config).await.unwrap();

    assert!(read(&output.svg_path).contains("Harbour Estate Sale"));
    assert!(output.png_path.is_none());
    assert!(output.pdf_path.is_none());
    assert_eq!(output.stage_errors.len(), 2);
    assert_eq!(output.stage_errors[0].stage(), Stage::Rasterize);
    assert!(matches!(
        output.stage_errors[1],
        StageError::Skipped {
            stage: Stage::WritePdf,
            ..
        }
    ));
    assert!(output.into_result().is_err());
}

// ── Fatal errors ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_template_is_fatal() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("photo.png"), png_bytes(4, 4)).unwrap();
    let config = config_in(dir.path()).build().unwrap();

    let err = generate(&config).await.unwrap_err();

    assert!(
        matches!(err, SvgStampError::TemplateNotFound { .. }),
        "got: {err}"
    );
    assert!(!dir.path().join("out/result.svg").exists());
}

#[tokio::test]
async fn missing_image_is_fatal_and_writes_nothing() {
    let dir = workspace(TEMPLATE);
    let config = config_in(dir.path())
        .image_source(dir.path().join("nope.jpg").to_string_lossy())
        .build()
        .unwrap();

    let err = generate(&config).await.unwrap_err();

    assert!(
        matches!(err, SvgStampError::ImageNotFound { .. }),
        "got: {err}"
    );
    assert!(!dir.path().join("out").exists());
}

#[tokio::test]
async fn malformed_template_is_fatal() {
    let dir = workspace("<svg><text>$auctionName</svg>");
    let config = config_in(dir.path()).build().unwrap();

    let err = generate(&config).await.unwrap_err();

    assert!(
        matches!(err, SvgStampError::InvalidTemplate { .. }),
        "got: {err}"
    );
}

// ── Progress callback ────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl GenerationProgressCallback for Recorder {
    fn on_generation_start(&self, total_stages: usize) {
        self.events.lock().unwrap().push(format!("start {total_stages}"));
    }
    fn on_stage_complete(&self, stage: Stage, _detail: &str) {
        self.events.lock().unwrap().push(format!("ok {stage}"));
    }
    fn on_stage_error(&self, stage: Stage, _error: &str) {
        self.events.lock().unwrap().push(format!("err {stage}"));
    }
    fn on_generation_complete(&self, failed_stages: usize) {
        self.events.lock().unwrap().push(format!("done {failed_stages}"));
    }
}

#[tokio::test]
async fn progress_callback_sees_every_stage_in_order() {
    let dir = workspace(TEMPLATE);
    let recorder = Arc::new(Recorder::default());
    let config = config_in(dir.path())
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    generate(&config).await.unwrap();

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "start 6",
            "ok load-template",
            "ok fetch-image",
            "ok fill-template",
            "ok write-svg",
            "ok rasterize",
            "ok write-pdf",
            "done 0",
        ]
    );
}

#[tokio::test]
async fn progress_callback_reports_fatal_stage() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let config = config_in(dir.path())
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    assert!(generate(&config).await.is_err());

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(events, vec!["start 6", "err load-template"]);
}

// ── Sync wrapper ─────────────────────────────────────────────────────────────

#[test]
fn generate_sync_runs_outside_a_runtime() {
    let dir = workspace(TEMPLATE);
    let config = config_in(dir.path()).build().unwrap();

    let output = generate_sync(&config).unwrap();

    assert_eq!(output.svg_path, PathBuf::from(dir.path().join("out/result.svg")));
    assert!(output.is_complete());
}
