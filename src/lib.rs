//! # svgstamp
//!
//! Fill an SVG template with text and a photo, then export it as SVG, PNG
//! and a single-page PDF.
//!
//! ## Why this crate?
//!
//! Flyers, listing cards and labels are usually designed once in a vector
//! editor and then reproduced many times with different text and a
//! different picture. Instead of scripting the editor, the designer marks
//! the variable text with literal tokens (`$title`, `$date`, …) and draws a
//! placeholder rectangle where the photo goes. This crate swaps the tokens
//! for real values, replaces the rectangle with the embedded photo, and
//! renders the result to every format the print shop asks for.
//!
//! ## Pipeline Overview
//!
//! ```text
//! template.svg + image URL/path
//!  │
//!  ├─ 1. Input   read the template, fetch the image (reqwest or local file)
//!  ├─ 2. Fill    substitute $tokens in <text>, swap the region for <image>
//!  ├─ 3. SVG     serialise and write atomically
//!  ├─ 4. PNG     rasterise via resvg (CPU-bound, spawn_blocking)
//!  └─ 5. PDF     scale-to-fit and centre on one page (pdf-writer)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use svgstamp::{generate, GenerationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GenerationConfig::builder()
//!         .template_path("flyer.svg")
//!         .image_source("https://example.com/photo.jpg")
//!         .placeholder("$title", "Estate Sale")
//!         .placeholder("$date", "Saturday 9am")
//!         .region_id("photo")
//!         .outputs_from_stem("out/flyer")
//!         .build()?;
//!     let output = generate(&config).await?;
//!     println!("{} substitution(s)", output.substitutions);
//!     for err in &output.stage_errors {
//!         eprintln!("warning: {err}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `svgstamp` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! svgstamp = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GenerationConfig, GenerationConfigBuilder, PageSize, PlaceholderTable};
pub use error::{StageError, SvgStampError};
pub use generate::{fill_template, generate, generate_sync, FilledTemplate};
pub use output::{GenerationOutput, GenerationStats};
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
