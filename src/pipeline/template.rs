//! SVG template tree: parse markup into owned nodes, edit, serialise back.
//!
//! `usvg` builds a render tree, not an editable one, so the template is
//! held in this small DOM instead. It keeps everything needed to write the
//! document back out faithfully: XML declaration, doctype, comments,
//! processing instructions, CDATA and attribute order.

use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// Markup could not be parsed into a [`Document`].
#[derive(Debug, Error)]
#[error("{message} (near byte {position})")]
pub struct ParseError {
    pub message: String,
    pub position: u64,
}

/// A node of the template tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    /// `<?xml …?>`; only found before the root element.
    Declaration(String),
    /// `<!DOCTYPE …>`; only found before the root element.
    DocType(String),
}

/// An element with its attributes in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Declaration, doctype, comments and PIs before the root element.
    pub prolog: Vec<Node>,
    pub root: Element,
    /// Comments and PIs after the root element.
    pub epilog: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style [`Element::set_attr`].
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let idx = self.attributes.iter().position(|(k, _)| k == name)?;
        Some(self.attributes.remove(idx).1)
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Concatenated text of all descendant text and CDATA nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// Replace every child with a single text node.
    pub fn set_text_content(&mut self, text: impl Into<String>) {
        self.children = vec![Node::Text(text.into())];
    }

    /// Depth-first search for the element with the given `id`, including `self`.
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        if self.id() == Some(id) {
            return Some(self);
        }
        self.child_elements().find_map(|child| child.find_by_id(id))
    }

    /// Swap the first descendant with the given `id` for `replacement`,
    /// in the same position among its siblings. Returns the removed element.
    ///
    /// The element itself is never replaced; only descendants are searched.
    pub fn replace_by_id(&mut self, id: &str, replacement: Element) -> Option<Element> {
        let mut replacement = Some(replacement);
        self.replace_by_id_inner(id, &mut replacement)
    }

    fn replace_by_id_inner(
        &mut self,
        id: &str,
        replacement: &mut Option<Element>,
    ) -> Option<Element> {
        for child in self.children.iter_mut() {
            let Node::Element(el) = child else { continue };
            if el.id() == Some(id) {
                let new = replacement.take()?;
                return Some(std::mem::replace(el, new));
            }
            if let Some(removed) = el.replace_by_id_inner(id, replacement) {
                return Some(removed);
            }
        }
        None
    }

    /// Visit `self` and every descendant element, parents before children.
    pub fn walk_mut(&mut self, f: &mut dyn FnMut(&mut Element)) {
        f(self);
        for child in self.children.iter_mut() {
            if let Node::Element(el) = child {
                el.walk_mut(f);
            }
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, String> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut element = Element::new(name);
        for attr in start.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            element.attributes.push((key, value.into_owned()));
        }
        Ok(element)
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            child.write_to(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(t) | Node::CData(t) => out.push_str(t),
            Node::Element(el) => collect_text(&el.children, out),
            _ => {}
        }
    }
}

impl Node {
    fn write_to(&self, out: &mut String) {
        match self {
            Node::Element(el) => el.write_to(out),
            Node::Text(t) => out.push_str(&partial_escape(t.as_str())),
            Node::CData(t) => {
                out.push_str("<![CDATA[");
                out.push_str(t);
                out.push_str("]]>");
            }
            Node::Comment(t) => {
                out.push_str("<!--");
                out.push_str(t);
                out.push_str("-->");
            }
            Node::ProcessingInstruction(t) | Node::Declaration(t) => {
                out.push_str("<?");
                out.push_str(t);
                out.push_str("?>");
            }
            Node::DocType(t) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(t.trim());
                out.push('>');
            }
        }
    }
}

impl Document {
    /// Parse SVG markup.
    pub fn parse(markup: &str) -> Result<Self, ParseError> {
        let mut reader = Reader::from_str(markup);
        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        let fail = |reader: &Reader<&[u8]>, message: String| ParseError {
            message,
            position: reader.buffer_position() as u64,
        };

        loop {
            let event = reader
                .read_event()
                .map_err(|e| fail(&reader, e.to_string()))?;

            let node = match event {
                Event::Start(e) => {
                    let el = Element::from_start(&e).map_err(|m| fail(&reader, m))?;
                    stack.push(el);
                    continue;
                }
                Event::End(_) => {
                    let el = stack
                        .pop()
                        .ok_or_else(|| fail(&reader, "unmatched closing tag".into()))?;
                    Node::Element(el)
                }
                Event::Empty(e) => {
                    Node::Element(Element::from_start(&e).map_err(|m| fail(&reader, m))?)
                }
                Event::Text(t) => {
                    let text = t.unescape().map_err(|e| fail(&reader, e.to_string()))?;
                    Node::Text(text.into_owned())
                }
                Event::CData(c) => Node::CData(String::from_utf8_lossy(&c).into_owned()),
                Event::Comment(c) => Node::Comment(String::from_utf8_lossy(&c).into_owned()),
                Event::PI(p) => {
                    Node::ProcessingInstruction(String::from_utf8_lossy(&p).into_owned())
                }
                Event::Decl(d) => Node::Declaration(String::from_utf8_lossy(&d).into_owned()),
                Event::DocType(d) => Node::DocType(String::from_utf8_lossy(&d).into_owned()),
                Event::Eof => break,
            };

            if let Some(parent) = stack.last_mut() {
                parent.children.push(node);
                continue;
            }

            match node {
                Node::Element(el) => {
                    if root.is_some() {
                        return Err(fail(&reader, "more than one root element".into()));
                    }
                    root = Some(el);
                }
                Node::Text(t) if t.trim().is_empty() => {}
                Node::Text(_) | Node::CData(_) => {
                    return Err(fail(&reader, "text outside the root element".into()));
                }
                other if root.is_none() => prolog.push(other),
                other => epilog.push(other),
            }
        }

        if let Some(open) = stack.last() {
            return Err(fail(&reader, format!("unclosed element <{}>", open.name)));
        }
        let root = root.ok_or_else(|| fail(&reader, "document has no root element".into()))?;

        Ok(Document {
            prolog,
            root,
            epilog,
        })
    }

    /// Find the element with `id`, the root included.
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        self.root.find_by_id(id)
    }

    /// Swap the first non-root element with `id` for `replacement`,
    /// returning the element that was removed.
    pub fn replace_by_id(&mut self, id: &str, replacement: Element) -> Option<Element> {
        self.root.replace_by_id(id, replacement)
    }

    /// Serialise the document back to markup.
    pub fn to_svg_string(&self) -> String {
        let mut out = String::new();
        for node in &self.prolog {
            node.write_to(&mut out);
            out.push('\n');
        }
        self.root.write_to(&mut out);
        for node in &self.epilog {
            out.push('\n');
            node.write_to(&mut out);
        }
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- made by hand -->
<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100">
  <g id="layer1">
    <rect id="rect5" x="10" y="20" width="30" height="40" style="fill:red"/>
    <text id="t1" x="5" y="90"><tspan>Hello </tspan><tspan>$name</tspan></text>
  </g>
</svg>"#;

    #[test]
    fn parses_structure_and_prolog() {
        let doc = Document::parse(SAMPLE).unwrap();
        assert_eq!(doc.root.name, "svg");
        assert!(matches!(doc.prolog[0], Node::Declaration(_)));
        assert_eq!(doc.prolog[1], Node::Comment(" made by hand ".into()));
        let rect = doc.root.find_by_id("rect5").unwrap();
        assert_eq!(rect.attr("width"), Some("30"));
        assert_eq!(rect.name, "rect");
    }

    #[test]
    fn text_content_spans_children() {
        let doc = Document::parse(SAMPLE).unwrap();
        let text = doc.root.find_by_id("t1").unwrap();
        assert_eq!(text.text_content(), "Hello $name");
    }

    #[test]
    fn round_trip_preserves_markup() {
        let doc = Document::parse(SAMPLE).unwrap();
        let out = doc.to_svg_string();
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- made by hand -->\n<svg"));
        assert!(out.contains(r#"<rect id="rect5" x="10" y="20" width="30" height="40" style="fill:red"/>"#));
        assert_eq!(Document::parse(&out).unwrap(), doc);
    }

    #[test]
    fn escapes_text_and_attributes() {
        let mut root = Element::new("svg").with_attr("data-q", r#"a "b" & <c>"#);
        root.children.push(Node::Element({
            let mut t = Element::new("text");
            t.set_text_content("Tom & Jerry <3");
            t
        }));
        let doc = Document {
            prolog: vec![],
            root,
            epilog: vec![],
        };
        let out = doc.to_svg_string();
        assert!(out.contains("&quot;b&quot; &amp; &lt;c&gt;"));
        assert!(out.contains("<text>Tom &amp; Jerry &lt;3</text>"));
        let back = Document::parse(&out).unwrap();
        assert_eq!(back.root.attr("data-q"), Some(r#"a "b" & <c>"#));
    }

    #[test]
    fn entities_are_decoded() {
        let doc = Document::parse("<svg><text>Fish &amp; Chips</text></svg>").unwrap();
        assert_eq!(doc.root.text_content(), "Fish & Chips");
    }

    #[test]
    fn replace_by_id_keeps_sibling_position() {
        let mut doc = Document::parse(SAMPLE).unwrap();
        let removed = doc
            .root
            .replace_by_id("rect5", Element::new("image").with_attr("id", "img"))
            .unwrap();
        assert_eq!(removed.name, "rect");
        let layer = doc.root.find_by_id("layer1").unwrap();
        let names: Vec<_> = layer.child_elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["image", "text"]);
        assert!(doc.root.find_by_id("rect5").is_none());
    }

    #[test]
    fn replace_by_id_missing_returns_none() {
        let mut doc = Document::parse(SAMPLE).unwrap();
        let before = doc.clone();
        assert!(doc.root.replace_by_id("nope", Element::new("image")).is_none());
        assert_eq!(doc, before);
    }

    #[test]
    fn remove_and_set_attr() {
        let mut el = Element::new("text")
            .with_attr("x", "1")
            .with_attr("text-anchor", "middle");
        assert_eq!(el.remove_attr("text-anchor").as_deref(), Some("middle"));
        assert_eq!(el.remove_attr("text-anchor"), None);
        el.set_attr("x", "2");
        assert_eq!(el.attributes, vec![("x".to_string(), "2".to_string())]);
    }

    #[test]
    fn rejects_malformed_markup() {
        assert!(Document::parse("<svg><g></svg>").is_err());
        assert!(Document::parse("<svg>").is_err());
        assert!(Document::parse("").is_err());
        assert!(Document::parse("<a/><b/>").is_err());
    }

    #[test]
    fn cdata_is_kept_verbatim() {
        let doc = Document::parse("<svg><style><![CDATA[.a > .b { fill: red }]]></style></svg>")
            .unwrap();
        let out = doc.to_svg_string();
        assert!(out.contains("<![CDATA[.a > .b { fill: red }]]>"));
    }
}
