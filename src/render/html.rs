//! HTML rendering of plans, measurement documents and pages.
//!
//! Measurement and page output share one stylesheet and one item renderer, so
//! an item measured off-screen takes exactly the height it gets on its page.

use std::collections::HashMap;

use crate::codec::{cell_nodes, DocumentCodec};
use crate::model::{DocumentNode, Mark, Page, PageSize, PlanDocument, PortableContentItem};
use crate::paginate::item_element_id;

use super::images::ImageSource;

/// Element id of a rendered page.
pub fn page_element_id(page_number: u32) -> String {
    format!("page-{}", page_number)
}

/// Renders plan content to HTML.
#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer {
    codec: DocumentCodec,
    page_size: PageSize,
    images: HashMap<String, ImageSource>,
}

impl HtmlRenderer {
    /// Create a renderer for the given page size.
    pub fn new(page_size: PageSize) -> Self {
        Self {
            codec: DocumentCodec::default(),
            page_size,
            images: HashMap::new(),
        }
    }

    /// Use a specific codec for decoding text items.
    pub fn with_codec(mut self, codec: DocumentCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Replace image sources, keyed by the original `src`.
    pub fn with_images(mut self, images: HashMap<String, ImageSource>) -> Self {
        self.images = images;
        self
    }

    /// Set image replacements in place.
    pub fn set_images(&mut self, images: HashMap<String, ImageSource>) {
        self.images = images;
    }

    /// Stylesheet shared by measurement and page documents.
    pub fn stylesheet(&self) -> String {
        let (width, height) = self.page_size.css_pixels();
        format!(
            "body{{margin:0;font-family:sans-serif;font-size:16px;line-height:24px}}\
             .page{{box-sizing:border-box;width:{w}px;height:{h}px;padding:48px;overflow:hidden;background:#fff}}\
             .measure{{position:absolute;visibility:hidden;left:-10000px;top:0;width:{w}px;padding:0 48px;box-sizing:border-box}}\
             .document-header{{height:120px}}\
             .section-header{{height:56px;margin:0 0 16px 0;font-size:22px}}\
             .item{{margin:0 0 12px 0}}\
             .item img{{max-width:100%}}\
             .spell-error{{text-decoration:underline wavy red}}\
             table{{border-collapse:collapse;width:100%}}\
             td,th{{border:1px solid #ccc;padding:4px 8px}}",
            w = width,
            h = height
        )
    }

    /// Hidden full-document render with one addressable element per item.
    pub fn measurement_document(&self, doc: &PlanDocument) -> String {
        let mut body = String::from("<div class=\"measure\">");
        for (s, section) in doc.sections.iter().enumerate() {
            body.push_str(&format!(
                "<h2 class=\"section-header\">{}</h2>",
                escape_html(&section.title)
            ));
            for (i, item) in section.items.iter().enumerate() {
                body.push_str(&format!(
                    "<div class=\"item\" id=\"{}\">{}</div>",
                    item_element_id(s, i),
                    self.render_item(item)
                ));
            }
        }
        body.push_str("</div>");
        self.wrap(&doc.title, &body)
    }

    /// One page as a standalone document.
    pub fn page_document(&self, doc: &PlanDocument, page: &Page) -> String {
        self.wrap(&doc.title, &self.render_page(doc, page))
    }

    /// All pages in one document, as the live preview shows them.
    pub fn pages_document(&self, doc: &PlanDocument, pages: &[Page]) -> String {
        let body: String = pages.iter().map(|p| self.render_page(doc, p)).collect();
        self.wrap(&doc.title, &body)
    }

    /// A single fixed-size page container.
    pub fn render_page(&self, doc: &PlanDocument, page: &Page) -> String {
        let mut out = format!(
            "<div class=\"page\" id=\"{}\">",
            page_element_id(page.number)
        );

        if page.show_document_header {
            out.push_str(&format!(
                "<header class=\"document-header\"><h1>{}</h1></header>",
                escape_html(&doc.title)
            ));
        }

        for placed in &page.items {
            let Some(section) = doc.sections.get(placed.section_index) else {
                log::warn!("page {} refers to missing section {}", page.number, placed.section_index);
                continue;
            };
            if placed.needs_section_header {
                out.push_str(&format!(
                    "<h2 class=\"section-header\">{}</h2>",
                    escape_html(&section.title)
                ));
            }
            if let Some(item) = section.items.get(placed.item_index) {
                out.push_str("<div class=\"item\">");
                out.push_str(&self.render_item(item));
                out.push_str("</div>");
            }
        }

        out.push_str("</div>");
        out
    }

    /// Render one portable item.
    pub fn render_item(&self, item: &PortableContentItem) -> String {
        match item {
            PortableContentItem::Text { .. } => {
                let tree = self.codec.decode(std::slice::from_ref(item));
                self.render_nodes(tree.children())
            }
            PortableContentItem::Image {
                src,
                caption,
                width,
                height,
            } => {
                let mut out = String::from("<figure>");
                out.push_str(&self.render_img(src, caption.as_deref(), *width, *height));
                if let Some(caption) = caption {
                    out.push_str(&format!("<figcaption>{}</figcaption>", escape_html(caption)));
                }
                out.push_str("</figure>");
                out
            }
            PortableContentItem::Table { columns, rows } => {
                let mut out = String::from("<table>");
                if !columns.is_empty() {
                    out.push_str("<tr>");
                    for c in columns {
                        out.push_str(&format!("<th>{}</th>", self.render_cell(c)));
                    }
                    out.push_str("</tr>");
                }
                for row in rows {
                    out.push_str("<tr>");
                    for c in row {
                        out.push_str(&format!("<td>{}</td>", self.render_cell(c)));
                    }
                    out.push_str("</tr>");
                }
                out.push_str("</table>");
                out
            }
        }
    }

    /// Render editor nodes.
    pub fn render_nodes(&self, nodes: &[DocumentNode]) -> String {
        nodes.iter().map(|n| self.render_node(n)).collect()
    }

    fn render_node(&self, node: &DocumentNode) -> String {
        match node {
            DocumentNode::Doc { content } => self.render_nodes(content),
            DocumentNode::Paragraph { content } => format!("<p>{}</p>", self.render_nodes(content)),
            DocumentNode::Heading { attrs, content } => format!(
                "<h{l}>{}</h{l}>",
                self.render_nodes(content),
                l = attrs.level.clamp(1, 6)
            ),
            DocumentNode::BulletList { content } => {
                format!("<ul>{}</ul>", self.render_nodes(content))
            }
            DocumentNode::OrderedList { attrs, content } => {
                let start = if attrs.start == 1 {
                    String::new()
                } else {
                    format!(" start=\"{}\"", attrs.start)
                };
                format!("<ol{}>{}</ol>", start, self.render_nodes(content))
            }
            DocumentNode::ListItem { content } => format!("<li>{}</li>", self.render_nodes(content)),
            DocumentNode::Table { content } => {
                format!("<table>{}</table>", self.render_nodes(content))
            }
            DocumentNode::TableRow { content } => format!("<tr>{}</tr>", self.render_nodes(content)),
            DocumentNode::TableCell { content } => {
                format!("<td>{}</td>", self.render_nodes(content))
            }
            DocumentNode::TableHeader { content } => {
                format!("<th>{}</th>", self.render_nodes(content))
            }
            DocumentNode::Image { attrs } => {
                self.render_img(&attrs.src, attrs.alt.as_deref(), attrs.width, attrs.height)
            }
            DocumentNode::HardBreak => "<br>".to_string(),
            DocumentNode::Text { text, marks } => render_marked(text, marks),
        }
    }

    fn render_cell(&self, value: &str) -> String {
        self.render_nodes(&cell_nodes(value, self.codec.decoder()))
    }

    fn render_img(
        &self,
        src: &str,
        alt: Option<&str>,
        width: Option<f64>,
        height: Option<f64>,
    ) -> String {
        let mut out = String::from("<img");
        match self.images.get(src) {
            Some(source) => {
                out.push_str(&format!(" src=\"{}\"", escape_html(source.src())));
                if let Some(mode) = source.cross_origin() {
                    out.push_str(&format!(" crossorigin=\"{}\"", mode));
                }
            }
            None => out.push_str(&format!(" src=\"{}\"", escape_html(src))),
        }
        out.push_str(&format!(" alt=\"{}\"", escape_html(alt.unwrap_or_default())));
        if let Some(w) = width {
            out.push_str(&format!(" width=\"{}\"", w));
        }
        if let Some(h) = height {
            out.push_str(&format!(" height=\"{}\"", h));
        }
        out.push('>');
        out
    }

    fn wrap(&self, title: &str, body: &str) -> String {
        format!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title><style>{}</style></head><body>{}</body></html>",
            escape_html(title),
            self.stylesheet(),
            body
        )
    }
}

/// Text with its marks as nested HTML elements, outermost first.
fn render_marked(text: &str, marks: &[Mark]) -> String {
    let mut sorted: Vec<&Mark> = marks.iter().collect();
    sorted.sort_by_key(|m| m.rank());

    let mut open = String::new();
    let mut close = Vec::new();
    for mark in sorted {
        let (start, end) = match mark {
            Mark::Bold => ("<strong>".to_string(), "</strong>"),
            Mark::Italic => ("<em>".to_string(), "</em>"),
            Mark::Code => ("<code>".to_string(), "</code>"),
            Mark::SpellError => ("<span class=\"spell-error\">".to_string(), "</span>"),
            Mark::Highlight { attrs } => match &attrs.color {
                Some(c) => (
                    format!("<mark style=\"background-color:{}\">", escape_html(c)),
                    "</mark>",
                ),
                None => ("<mark>".to_string(), "</mark>"),
            },
            Mark::TextStyle { attrs } => match &attrs.color {
                Some(c) => (
                    format!("<span style=\"color:{}\">", escape_html(c)),
                    "</span>",
                ),
                None => continue,
            },
        };
        open.push_str(&start);
        close.push(end);
    }

    let mut out = open;
    out.push_str(&escape_html(text));
    for end in close.iter().rev() {
        out.push_str(end);
    }
    out
}

/// Escape text for HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
