//! Template filling: placeholder substitution and image-region replacement.
//!
//! Both operations mutate the [`Document`] in place. A placeholder that
//! appears nowhere and a region id that does not exist are both skipped
//! without error.

use crate::config::PlaceholderTable;
use crate::pipeline::template::{Document, Element};
use serde::{Deserialize, Serialize};
use tracing::debug;

const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Aspect-ratio mode of the inserted image: cover the region, crop overflow.
pub const IMAGE_ASPECT_RATIO: &str = "xMidYMid slice";

/// Position and size of the replaced region, copied verbatim from its
/// attributes (units and percentages are kept as written).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionGeometry {
    pub x: String,
    pub y: String,
    pub width: String,
    pub height: String,
    /// `transform` of the region, carried over to the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
}

impl RegionGeometry {
    /// Read geometry from an element, defaulting to `0,0 100×100`.
    pub fn of(element: &Element) -> Self {
        let get = |name: &str, default: &str| {
            element
                .attr(name)
                .map(str::to_string)
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            x: get("x", "0"),
            y: get("y", "0"),
            width: get("width", "100"),
            height: get("height", "100"),
            transform: element.attr("transform").map(str::to_string),
        }
    }
}

/// Replace placeholders inside every `<text>` element.
///
/// For each text element, each token of `table` (in table order) that occurs
/// in the element's text content has its **first** occurrence replaced. The
/// element's content is rewritten as a single text node only when at least
/// one token matched; untouched elements keep their `<tspan>` children.
///
/// When `strip_anchoring` is set, `text-anchor` and `dominant-baseline` are
/// removed from every `<text>` element, matched or not.
///
/// Returns the number of replacements made.
pub fn substitute_placeholders(
    doc: &mut Document,
    table: &PlaceholderTable,
    strip_anchoring: bool,
) -> usize {
    let mut replaced = 0;
    doc.root.walk_mut(&mut |el: &mut Element| {
        if el.name != "text" {
            return;
        }
        if strip_anchoring {
            el.remove_attr("text-anchor");
            el.remove_attr("dominant-baseline");
        }

        let original = el.text_content();
        let mut content = original.clone();
        let mut hits = 0;
        for (token, value) in table.iter() {
            if token.is_empty() || !content.contains(token) {
                continue;
            }
            content = content.replacen(token, value, 1);
            hits += 1;
        }
        if hits > 0 {
            debug!("Filled {} placeholder(s) in <text>: {:?} → {:?}", hits, original, content);
            el.set_text_content(content);
            replaced += hits;
        }
    });
    replaced
}

/// Replace the element with id `region_id` by an `<image>` showing `href`.
///
/// The image takes the region's `x`, `y`, `width`, `height` and `transform`,
/// uses [`IMAGE_ASPECT_RATIO`], and carries the data in both `href` and
/// `xlink:href`.
/// Returns `None`, leaving the document untouched, when no such element
/// exists.
pub fn replace_region(doc: &mut Document, region_id: &str, href: &str) -> Option<RegionGeometry> {
    if doc.root.id() == Some(region_id) {
        debug!("Region '{}' is the document root; leaving it in place", region_id);
        return None;
    }
    let geometry = RegionGeometry::of(doc.find_by_id(region_id)?);

    let mut image = Element::new("image")
        .with_attr("x", geometry.x.as_str())
        .with_attr("y", geometry.y.as_str())
        .with_attr("width", geometry.width.as_str())
        .with_attr("height", geometry.height.as_str());
    if let Some(ref transform) = geometry.transform {
        image.set_attr("transform", transform.as_str());
    }
    image.set_attr("preserveAspectRatio", IMAGE_ASPECT_RATIO);
    if doc.root.attr("xmlns:xlink").is_none() {
        image.set_attr("xmlns:xlink", XLINK_NS);
    }
    image.set_attr("href", href);
    image.set_attr("xlink:href", href);

    doc.replace_by_id(region_id, image)?;
    debug!(
        "Replaced region '{}' with image at ({}, {}) {}×{}",
        region_id, geometry.x, geometry.y, geometry.width, geometry.height
    );
    Some(geometry)
}
