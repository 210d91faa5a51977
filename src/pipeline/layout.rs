//! Scale-to-fit placement of the raster image on a PDF page.

use serde::{Deserialize, Serialize};

/// Where and how large the image is drawn on the page, in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitPlacement {
    pub scale: f64,
    pub width: f64,
    pub height: f64,
    /// Left margin.
    pub x: f64,
    /// Top margin; equal to the bottom margin, so it is also the PDF
    /// (bottom-left origin) y offset.
    pub y: f64,
}

/// Scale an `img_w`×`img_h` image uniformly to fit a `page_w`×`page_h` page
/// and center it.
pub fn fit(img_w: f64, img_h: f64, page_w: f64, page_h: f64) -> FitPlacement {
    let scale = (page_w / img_w).min(page_h / img_h);
    let width = img_w * scale;
    let height = img_h * scale;
    FitPlacement {
        scale,
        width,
        height,
        x: (page_w - width) / 2.0,
        y: (page_h - height) / 2.0,
    }
}
