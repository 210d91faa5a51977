//! Image encoding: raw bytes → base64 `data:` URI for an SVG `href`.
//!
//! Inlining the image keeps the generated SVG self-contained: it renders the
//! same in a browser, in `resvg`, or after being mailed to someone, with no
//! network access at view time.

use crate::pipeline::input::FetchedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Encode a fetched image as `data:{mime};base64,{payload}`.
pub fn to_data_uri(image: &FetchedImage) -> String {
    let b64 = STANDARD.encode(&image.bytes);
    debug!("Encoded image → {} bytes base64", b64.len());
    format!("data:{};base64,{}", image.mime_type, b64)
}
