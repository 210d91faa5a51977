//! Pipeline stages for template generation.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ template ──▶ fill ──▶ rasterize ──▶ layout/pdf
//! (read/fetch) (data URI) (parse)  (edit)   (resvg)       (pdf-writer)
//! ```
//!
//! 1. [`input`]    : read the template; fetch the image from a URL or path
//! 2. [`encode`]   : base64-wrap the image as a `data:` URI
//! 3. [`template`] : parse markup into an editable tree and serialise it back
//! 4. [`fill`]     : substitute placeholders, swap the region for an `<image>`
//! 5. [`rasterize`]: render the SVG to PNG on the blocking pool
//! 6. [`layout`]   : scale-to-fit arithmetic for the PDF page
//! 7. [`pdf`]      : write the single-page PDF

pub mod encode;
pub mod fill;
pub mod input;
pub mod layout;
pub mod pdf;
pub mod rasterize;
pub mod template;
