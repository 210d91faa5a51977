//! Configuration types for template generation.
//!
//! All generation behaviour is controlled through [`GenerationConfig`], built
//! via its [`GenerationConfigBuilder`]. The defaults reproduce the fixed
//! job the tool was first written for: `auctionit.svg` filled with the sample
//! auction table, region `rect5`, A4 output.

use crate::error::SvgStampError;
use crate::progress::ProgressCallback;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Image embedded by the default configuration.
pub const DEFAULT_IMAGE_URL: &str =
    "https://auctionitstorage.blob.core.windows.net/images/1c7abf65-793c-41fe-8c3c-2e18a048a40c.jpg";

/// Identifier of the element replaced by the image in the default template.
pub const DEFAULT_REGION_ID: &str = "rect5";

/// Configuration for one template generation run.
///
/// Built via [`GenerationConfig::builder()`] or using
/// [`GenerationConfig::default()`].
///
/// # Example
/// ```rust
/// use svgstamp::{GenerationConfig, PageSize};
///
/// let config = GenerationConfig::builder()
///     .template_path("card.svg")
///     .image_source("https://example.com/photo.jpg")
///     .placeholder("$name", "Spring Sale")
///     .outputs_from_stem("out/card")
///     .page_size(PageSize::Letter)
///     .build()
///     .unwrap();
/// assert_eq!(config.pdf_output.to_str(), Some("out/card.pdf"));
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// Path of the SVG template to fill.
    pub template_path: PathBuf,

    /// HTTP/HTTPS URL or local path of the image to embed.
    pub image_source: String,

    /// Placeholder tokens and their replacements, applied in insertion order.
    pub placeholders: PlaceholderTable,

    /// `id` of the element replaced by the image. Default: `rect5`.
    pub region_id: String,

    /// Where the filled SVG is written.
    pub svg_output: PathBuf,

    /// Where the rasterised PNG is written.
    pub png_output: PathBuf,

    /// Where the single-page PDF is written.
    pub pdf_output: PathBuf,

    /// PDF page size. Default: A4.
    pub page_size: PageSize,

    /// Pixels per SVG user unit when rasterising. Range: 0.1–16. Default: 1.0.
    pub raster_scale: f32,

    /// Remove `text-anchor` and `dominant-baseline` from every `<text>`.
    /// Default: true.
    ///
    /// Templates are usually drawn with centred labels; once a placeholder is
    /// replaced by text of a different length, centring shifts the label away
    /// from the position it was designed at.
    pub strip_text_anchoring: bool,

    /// Title stored in the PDF document info dictionary.
    pub pdf_title: Option<String>,

    /// Download timeout for URL image sources in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional per-stage progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from("auctionit.svg"),
            image_source: DEFAULT_IMAGE_URL.to_string(),
            placeholders: PlaceholderTable::sample(),
            region_id: DEFAULT_REGION_ID.to_string(),
            svg_output: PathBuf::from("auctionit_updated.svg"),
            png_output: PathBuf::from("auctionit_updated.png"),
            pdf_output: PathBuf::from("auctionit_updated.pdf"),
            page_size: PageSize::default(),
            raster_scale: 1.0,
            strip_text_anchoring: true,
            pdf_title: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("template_path", &self.template_path)
            .field("image_source", &self.image_source)
            .field("placeholders", &self.placeholders.len())
            .field("region_id", &self.region_id)
            .field("svg_output", &self.svg_output)
            .field("png_output", &self.png_output)
            .field("pdf_output", &self.pdf_output)
            .field("page_size", &self.page_size)
            .field("raster_scale", &self.raster_scale)
            .field("strip_text_anchoring", &self.strip_text_anchoring)
            .field("pdf_title", &self.pdf_title)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn GenerationProgressCallback>"),
            )
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
            custom_placeholders: false,
        }
    }
}

/// Builder for [`GenerationConfig`].
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
    custom_placeholders: bool,
}

impl GenerationConfigBuilder {
    pub fn template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.template_path = path.into();
        self
    }

    pub fn image_source(mut self, source: impl Into<String>) -> Self {
        self.config.image_source = source.into();
        self
    }

    /// Replace the whole placeholder table.
    pub fn placeholders(mut self, table: PlaceholderTable) -> Self {
        self.config.placeholders = table;
        self.custom_placeholders = true;
        self
    }

    /// Add one placeholder to the table.
    ///
    /// The first call discards the built-in sample table so a builder chain
    /// of `placeholder()` calls describes the complete table.
    pub fn placeholder(mut self, token: impl Into<String>, value: impl Into<String>) -> Self {
        if !self.custom_placeholders {
            self.config.placeholders = PlaceholderTable::new();
            self.custom_placeholders = true;
        }
        self.config.placeholders.insert(token, value);
        self
    }

    pub fn region_id(mut self, id: impl Into<String>) -> Self {
        self.config.region_id = id.into();
        self
    }

    pub fn svg_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.svg_output = path.into();
        self
    }

    pub fn png_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.png_output = path.into();
        self
    }

    pub fn pdf_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdf_output = path.into();
        self
    }

    /// Set all three output paths to `<stem>.svg`, `<stem>.png`, `<stem>.pdf`.
    pub fn outputs_from_stem(mut self, stem: impl AsRef<Path>) -> Self {
        let stem = stem.as_ref();
        self.config.svg_output = stem.with_extension("svg");
        self.config.png_output = stem.with_extension("png");
        self.config.pdf_output = stem.with_extension("pdf");
        self
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn raster_scale(mut self, scale: f32) -> Self {
        self.config.raster_scale = if scale.is_finite() {
            scale.clamp(0.1, 16.0)
        } else {
            1.0
        };
        self
    }

    pub fn strip_text_anchoring(mut self, v: bool) -> Self {
        self.config.strip_text_anchoring = v;
        self
    }

    pub fn pdf_title(mut self, title: impl Into<String>) -> Self {
        self.config.pdf_title = Some(title.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, SvgStampError> {
        let c = &self.config;
        if c.region_id.trim().is_empty() {
            return Err(SvgStampError::InvalidConfig(
                "region id must not be empty".into(),
            ));
        }
        if c.image_source.trim().is_empty() {
            return Err(SvgStampError::InvalidConfig(
                "image source must not be empty".into(),
            ));
        }
        let (w, h) = c.page_size.dimensions();
        if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
            return Err(SvgStampError::InvalidConfig(format!(
                "page size must be positive, got {w}x{h}"
            )));
        }
        if c.svg_output == c.png_output
            || c.svg_output == c.pdf_output
            || c.png_output == c.pdf_output
        {
            return Err(SvgStampError::InvalidConfig(
                "SVG, PNG and PDF outputs must be distinct paths".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Placeholder table ────────────────────────────────────────────────────

/// Ordered mapping from literal placeholder token to replacement text.
///
/// Iteration follows insertion order. Re-inserting an existing token updates
/// its value without moving it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderTable {
    entries: Vec<(String, String)>,
}

impl PlaceholderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sample auction table used by the default configuration.
    pub fn sample() -> Self {
        [
            ("$name", "Sample Auction"),
            ("$client", "Sample Auctioneer"),
            ("$date", "2024-12-01"),
            ("$time", "10:00 AM"),
            ("$venue_line1", "123 Auction Road"),
            ("$venue_line2", "Auction City"),
            ("$venue_line3", "Country"),
            ("$feature_line1", "Feature 1"),
            ("$feature_line2", "Feature 2"),
            ("$feature_line3", "Feature 3"),
            ("$description", "This is a sample description for the auction."),
            ("$start_pricing", "100,000"),
            ("$start_bidding", "500,000"),
        ]
        .into_iter()
        .collect()
    }

    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<String>) {
        let token = token.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(t, _)| *t == token) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((token, value)),
        }
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge `other` into `self`; tokens already present take the new value.
    pub fn extend(&mut self, other: PlaceholderTable) {
        for (token, value) in other.entries {
            self.insert(token, value);
        }
    }

    /// Parse a JSON object (`{"$name": "…", …}`), keeping key order.
    pub fn from_json_str(json: &str) -> Result<Self, SvgStampError> {
        serde_json::from_str(json)
            .map_err(|e| SvgStampError::InvalidConfig(format!("placeholder table: {e}")))
    }

    /// Parse a `TOKEN=VALUE` assignment. Only the first `=` splits.
    pub fn parse_assignment(s: &str) -> Result<(String, String), SvgStampError> {
        match s.split_once('=') {
            Some((token, value)) if !token.is_empty() => {
                Ok((token.to_string(), value.to_string()))
            }
            _ => Err(SvgStampError::InvalidConfig(format!(
                "expected TOKEN=VALUE, got '{s}'"
            ))),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PlaceholderTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = PlaceholderTable::new();
        for (token, value) in iter {
            table.insert(token, value);
        }
        table
    }
}

impl Serialize for PlaceholderTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (token, value) in &self.entries {
            map.serialize_entry(token, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PlaceholderTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = PlaceholderTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of placeholder tokens to replacement strings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut table = PlaceholderTable::new();
                while let Some((token, value)) = map.next_entry::<String, String>()? {
                    table.insert(token, value);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

// ── Page size ────────────────────────────────────────────────────────────

/// PDF page size in points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    /// 595.28 × 841.89 pt. (default)
    #[default]
    A4,
    /// 612 × 792 pt.
    Letter,
    /// Arbitrary width × height in points.
    Custom { width: f64, height: f64 },
}

impl PageSize {
    /// `(width, height)` in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

impl FromStr for PageSize {
    type Err = SvgStampError;

    /// Accepts `a4`, `letter`, or `WIDTHxHEIGHT` in points (e.g. `595x842`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "a4" => return Ok(PageSize::A4),
            "letter" => return Ok(PageSize::Letter),
            _ => {}
        }
        let invalid = || SvgStampError::InvalidConfig(format!("invalid page size '{s}'"));
        let (w, h) = s.split_once('x').ok_or_else(invalid)?;
        let width: f64 = w.trim().parse().map_err(|_| invalid())?;
        let height: f64 = h.trim().parse().map_err(|_| invalid())?;
        if !(width > 0.0 && height > 0.0) {
            return Err(invalid());
        }
        Ok(PageSize::Custom { width, height })
    }
}
