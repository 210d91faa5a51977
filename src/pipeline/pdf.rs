//! PDF export: place the rendered PNG on a single fixed-size page.
//!
//! The page has no margins; the image is scaled uniformly to fit and
//! centred ([`crate::pipeline::layout::fit`]). Pixels are stored as a
//! Flate-compressed RGB image XObject, with a separate grey `SMask` only
//! when the PNG actually has transparency.

use crate::config::PageSize;
use crate::error::StageError;
use crate::pipeline::layout::{fit, FitPlacement};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::ImageFormat;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, TextStr};
use std::io::Write;
use tracing::debug;

/// A finished PDF and where its image was placed.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    pub bytes: Vec<u8>,
    pub placement: FitPlacement,
}

/// Lay `png` out on one `page` and serialise the PDF.
pub fn write_pdf(
    png: &[u8],
    page: &PageSize,
    title: Option<&str>,
) -> Result<PdfDocument, StageError> {
    let fail = |detail: String| StageError::PdfFailed { detail };

    let img = image::load_from_memory_with_format(png, ImageFormat::Png)
        .map_err(|e| fail(format!("decode png: {e}")))?
        .to_rgba8();
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(fail("png has zero size".into()));
    }

    let (page_w, page_h) = page.dimensions();
    let placement = fit(width as f64, height as f64, page_w, page_h);

    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    let mut alpha = Vec::with_capacity(width as usize * height as usize);
    for px in img.pixels() {
        rgb.extend_from_slice(&px.0[..3]);
        alpha.push(px.0[3]);
    }
    let has_alpha = alpha.iter().any(|&a| a != u8::MAX);

    let catalog_id = Ref::new(1);
    let page_tree_id = Ref::new(2);
    let page_id = Ref::new(3);
    let content_id = Ref::new(4);
    let image_id = Ref::new(5);
    let smask_id = Ref::new(6);
    let info_id = Ref::new(7);
    let image_name = Name(b"Im1");

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.pages(page_tree_id).kids([page_id]).count(1);

    let mut page_writer = pdf.page(page_id);
    page_writer.media_box(Rect::new(0.0, 0.0, page_w as f32, page_h as f32));
    page_writer.parent(page_tree_id);
    page_writer.contents(content_id);
    page_writer.resources().x_objects().pair(image_name, image_id);
    page_writer.finish();

    let rgb_data = deflate(&rgb).map_err(|e| fail(format!("compress image: {e}")))?;
    let mut xobject = pdf.image_xobject(image_id, &rgb_data);
    xobject.filter(Filter::FlateDecode);
    xobject.width(width as i32);
    xobject.height(height as i32);
    xobject.color_space().device_rgb();
    xobject.bits_per_component(8);
    if has_alpha {
        xobject.s_mask(smask_id);
    }
    xobject.finish();

    if has_alpha {
        let alpha_data = deflate(&alpha).map_err(|e| fail(format!("compress alpha: {e}")))?;
        let mut mask = pdf.image_xobject(smask_id, &alpha_data);
        mask.filter(Filter::FlateDecode);
        mask.width(width as i32);
        mask.height(height as i32);
        mask.color_space().device_gray();
        mask.bits_per_component(8);
        mask.finish();
    }

    // Image space is the unit square; scale it to the placement box.
    let mut content = Content::new();
    content.save_state();
    content.transform([
        placement.width as f32,
        0.0,
        0.0,
        placement.height as f32,
        placement.x as f32,
        placement.y as f32,
    ]);
    content.x_object(image_name);
    content.restore_state();
    pdf.stream(content_id, &content.finish());

    let mut info = pdf.document_info(info_id);
    info.producer(TextStr(concat!("svgstamp ", env!("CARGO_PKG_VERSION"))));
    if let Some(title) = title {
        info.title(TextStr(title));
    }
    info.finish();

    let bytes = pdf.finish();
    debug!(
        "PDF: {}x{} px image at ({:.2}, {:.2}) scale {:.4}, {} bytes",
        width,
        height,
        placement.x,
        placement.y,
        placement.scale,
        bytes.len()
    );

    Ok(PdfDocument { bytes, placement })
}

fn deflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}
