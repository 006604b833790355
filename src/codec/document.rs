//! Editor tree to portable block conversion.

use std::sync::OnceLock;

use regex::Regex;

use crate::model::{Block, DocumentNode, ImageAttrs, PortableContentItem, TextRun};

use super::inline::{image_item, image_token, image_token_regex, split_by_images};
use super::mark::{encode_runs, MarkDecoder};
use super::table::{build_table, extract_table};
use super::CodecOptions;

/// Bidirectional codec between editor trees and portable items.
#[derive(Debug, Clone, Default)]
pub struct DocumentCodec {
    options: CodecOptions,
    decoder: MarkDecoder,
}

impl DocumentCodec {
    /// Create a codec with the given options.
    pub fn new(options: CodecOptions) -> Self {
        let decoder = MarkDecoder::new(options.unmatched_markers);
        Self { options, decoder }
    }

    /// Get the codec options.
    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    /// Mark decoder configured from the options.
    pub fn decoder(&self) -> &MarkDecoder {
        &self.decoder
    }

    /// Encode a document tree into ordered portable items.
    ///
    /// Text-bearing nodes are grouped into one text item until a table or
    /// top-level image interrupts the group. A tree without content yields a
    /// single empty text item.
    pub fn encode(&self, tree: &DocumentNode) -> Vec<PortableContentItem> {
        let top_level: &[DocumentNode] = match tree {
            DocumentNode::Doc { content } => content,
            other => std::slice::from_ref(other),
        };

        let mut items = Vec::new();
        let mut group: Vec<&DocumentNode> = Vec::new();

        for node in top_level {
            match node {
                DocumentNode::Table { .. } => {
                    self.flush_group(&mut group, &mut items);
                    items.push(extract_table(node).into());
                }
                DocumentNode::Image { attrs } => {
                    self.flush_group(&mut group, &mut items);
                    items.push(image_item(attrs));
                }
                _ => group.push(node),
            }
        }
        self.flush_group(&mut group, &mut items);

        if items.is_empty() {
            items.push(PortableContentItem::text(""));
        }
        items
    }

    /// Decode portable items back into a `doc` tree.
    pub fn decode(&self, items: &[PortableContentItem]) -> DocumentNode {
        let mut content = Vec::new();

        for item in items {
            match item {
                PortableContentItem::Text { value } => {
                    for chunk in blank_line_regex().split(value) {
                        if !chunk.trim().is_empty() {
                            content.extend(self.decode_chunk(chunk));
                        }
                    }
                }
                PortableContentItem::Image {
                    src,
                    caption,
                    width,
                    height,
                } => content.push(DocumentNode::Image {
                    attrs: ImageAttrs {
                        src: src.clone(),
                        alt: caption.clone(),
                        width: *width,
                        height: *height,
                    },
                }),
                PortableContentItem::Table { columns, rows } => {
                    content.push(build_table(columns, rows, &self.decoder))
                }
            }
        }

        if content.is_empty() {
            content.push(DocumentNode::paragraph(Vec::new()));
        }
        DocumentNode::doc(content)
    }

    /// Encode a tree into a titled block.
    pub fn encode_block(&self, title: impl Into<String>, tree: &DocumentNode) -> Block {
        Block::new(title, self.encode(tree))
    }

    /// Decode a block's content into a tree.
    pub fn decode_block(&self, block: &Block) -> DocumentNode {
        self.decode(&block.content)
    }

    fn flush_group(&self, group: &mut Vec<&DocumentNode>, items: &mut Vec<PortableContentItem>) {
        if group.is_empty() {
            return;
        }

        let mut images = Vec::new();
        let mut blocks = Vec::new();
        for node in group.drain(..) {
            self.render_block(node, &mut blocks, &mut images);
        }

        let text = blocks
            .into_iter()
            .filter(|b| !b.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        items.extend(split_by_images(&text, &images));
    }

    /// Render one text-bearing node as one or more text blocks.
    fn render_block(&self, node: &DocumentNode, blocks: &mut Vec<String>, images: &mut Vec<ImageAttrs>) {
        match node {
            DocumentNode::Paragraph { content } => {
                let text = encode_inline(content, images);
                blocks.push(self.escape_block_markers(&text));
            }
            DocumentNode::Heading { attrs, content } => {
                let text = encode_inline(content, images);
                blocks.push(format!("{} {}", "#".repeat(usize::from(attrs.level)), text));
            }
            DocumentNode::BulletList { .. } | DocumentNode::OrderedList { .. } => {
                let mut lines = Vec::new();
                self.render_list(node, 0, &mut lines, images);
                blocks.push(lines.join("\n"));
            }
            DocumentNode::ListItem { .. } => {
                let mut lines = Vec::new();
                self.render_list(&DocumentNode::bullet_list(vec![node.clone()]), 0, &mut lines, images);
                blocks.push(lines.join("\n"));
            }
            DocumentNode::Doc { content } => {
                for child in content {
                    self.render_block(child, blocks, images);
                }
            }
            DocumentNode::Table { .. } | DocumentNode::TableRow { .. } => {
                for child in node.children() {
                    self.render_block(child, blocks, images);
                }
            }
            DocumentNode::TableCell { content } | DocumentNode::TableHeader { content } => {
                for child in content {
                    self.render_block(child, blocks, images);
                }
            }
            DocumentNode::Text { .. } | DocumentNode::HardBreak | DocumentNode::Image { .. } => {
                let text = encode_inline(std::slice::from_ref(node), images);
                blocks.push(self.escape_block_markers(&text));
            }
        }
    }

    fn render_list(
        &self,
        list: &DocumentNode,
        depth: usize,
        lines: &mut Vec<String>,
        images: &mut Vec<ImageAttrs>,
    ) {
        let start = match list {
            DocumentNode::OrderedList { attrs, .. } => Some(attrs.start),
            _ => None,
        };
        let indent = " ".repeat(depth * self.options.list_indent);

        for (i, item) in list.children().iter().enumerate() {
            let prefix = match start {
                Some(n) => format!("{}. ", n as usize + i),
                None => format!("{} ", self.options.list_marker),
            };

            let mut parts = Vec::new();
            let mut nested = Vec::new();
            for child in item.children() {
                match child {
                    DocumentNode::BulletList { .. } | DocumentNode::OrderedList { .. } => {
                        nested.push(child)
                    }
                    DocumentNode::Paragraph { content } | DocumentNode::Heading { content, .. } => {
                        parts.push(encode_inline(content, images))
                    }
                    other => parts.push(encode_inline(other.children(), images)),
                }
            }

            let text = parts.join(" ").replace('\n', " ");
            lines.push(format!("{}{}{}", indent, prefix, text.trim_end()));

            for list in nested {
                self.render_list(list, depth + 1, lines, images);
            }
        }
    }

    /// Prefix a backslash to paragraph text that would decode as a list item
    /// or heading.
    ///
    /// Every line is checked, and so is the text after each image token since
    /// it starts a text item of its own once the images are split out.
    fn escape_block_markers(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let mut last = 0;
            for token in image_token_regex().find_iter(line) {
                self.push_escaped(&mut out, &line[last..token.start()]);
                out.push_str(token.as_str());
                last = token.end();
            }
            self.push_escaped(&mut out, &line[last..]);
        }
        out
    }

    fn push_escaped(&self, out: &mut String, segment: &str) {
        if self.needs_escape(segment) {
            out.push('\\');
        }
        out.push_str(segment);
    }

    /// Whether a paragraph line must be escaped to stay a paragraph line.
    ///
    /// Lines already starting with a backslash are escaped again when the
    /// rest would need it, so unescaping strips exactly one.
    fn needs_escape(&self, line: &str) -> bool {
        self.parse_list_line(line).is_some()
            || heading_regex().is_match(line)
            || line
                .strip_prefix('\\')
                .is_some_and(|rest| self.needs_escape(rest))
    }

    /// Decode one blank-line separated chunk into block nodes.
    fn decode_chunk(&self, chunk: &str) -> Vec<DocumentNode> {
        let mut nodes = Vec::new();
        let mut paragraph: Vec<&str> = Vec::new();
        let mut entries: Vec<ListEntry> = Vec::new();

        for line in chunk.trim_matches(&['\r', '\n'][..]).lines() {
            if let Some(entry) = self.parse_list_line(line) {
                self.flush_paragraph(&mut paragraph, &mut nodes);
                entries.push(entry);
                continue;
            }
            self.flush_list(&mut entries, &mut nodes);

            if let Some(rest) = line.strip_prefix('\\').filter(|rest| self.needs_escape(rest)) {
                paragraph.push(rest);
                continue;
            }

            if let Some(caps) = heading_regex().captures(line) {
                self.flush_paragraph(&mut paragraph, &mut nodes);
                let level = caps[1].len() as u8;
                nodes.push(DocumentNode::heading(level, self.decode_inline(&caps[2])));
                continue;
            }

            paragraph.push(line);
        }

        self.flush_paragraph(&mut paragraph, &mut nodes);
        self.flush_list(&mut entries, &mut nodes);
        nodes
    }

    fn flush_paragraph(&self, lines: &mut Vec<&str>, nodes: &mut Vec<DocumentNode>) {
        if lines.is_empty() {
            return;
        }
        let mut content = Vec::new();
        for (i, line) in lines.drain(..).enumerate() {
            if i > 0 {
                content.push(DocumentNode::HardBreak);
            }
            content.extend(self.decode_inline(line));
        }
        nodes.push(DocumentNode::paragraph(content));
    }

    fn flush_list(&self, entries: &mut Vec<ListEntry>, nodes: &mut Vec<DocumentNode>) {
        let mut pos = 0;
        while pos < entries.len() {
            let indent = entries[pos].indent;
            nodes.push(self.build_list(entries, &mut pos, indent));
        }
        entries.clear();
    }

    /// Build one list starting at `pos`, consuming deeper entries as nested lists.
    fn build_list(&self, entries: &[ListEntry], pos: &mut usize, indent: usize) -> DocumentNode {
        let ordered = entries[*pos].number;
        let mut items: Vec<DocumentNode> = Vec::new();

        while *pos < entries.len() && entries[*pos].indent >= indent {
            let entry = &entries[*pos];

            if entry.indent > indent {
                let nested = self.build_list(entries, pos, entry.indent);
                match items.last_mut() {
                    Some(DocumentNode::ListItem { content }) => content.push(nested),
                    _ => items.push(DocumentNode::list_item(vec![nested])),
                }
                continue;
            }

            if entry.number.is_some() != ordered.is_some() {
                break;
            }

            items.push(DocumentNode::list_item(vec![DocumentNode::paragraph(
                self.decode_inline(&entry.text),
            )]));
            *pos += 1;
        }

        match ordered {
            Some(start) => DocumentNode::ordered_list(start, items),
            None => DocumentNode::bullet_list(items),
        }
    }

    fn parse_list_line(&self, line: &str) -> Option<ListEntry> {
        let caps = list_regex().captures(line)?;
        let marker = &caps[2];
        let number: Option<u32> = if marker.ends_with('.') || marker.ends_with(')') {
            Some(marker[..marker.len() - 1].parse().ok()?)
        } else {
            let bullet = marker.chars().next()?;
            if bullet != self.options.list_marker && bullet != '-' && bullet != '+' {
                return None;
            }
            None
        };

        Some(ListEntry {
            indent: caps[1].chars().count(),
            number,
            text: caps[3].to_string(),
        })
    }

    fn decode_inline(&self, line: &str) -> Vec<DocumentNode> {
        self.decoder
            .decode_line(line)
            .into_iter()
            .map(TextRun::into_node)
            .collect()
    }
}

/// A parsed list line awaiting nesting.
#[derive(Debug)]
struct ListEntry {
    indent: usize,
    number: Option<u32>,
    text: String,
}

/// Encode inline children, writing a token for each inline image.
///
/// Marks close around hard breaks and images and reopen after them.
pub(crate) fn encode_inline(nodes: &[DocumentNode], images: &mut Vec<ImageAttrs>) -> String {
    let mut out = String::new();
    let mut runs: Vec<TextRun> = Vec::new();

    for node in nodes {
        match node {
            DocumentNode::Text { text, marks } => {
                runs.push(TextRun::with_marks(text.clone(), marks.clone()))
            }
            DocumentNode::HardBreak => {
                out.push_str(&encode_runs(&runs));
                runs.clear();
                out.push('\n');
            }
            DocumentNode::Image { attrs } => {
                out.push_str(&encode_runs(&runs));
                runs.clear();
                out.push_str(&image_token(attrs));
                images.push(attrs.clone());
            }
            other => {
                out.push_str(&encode_runs(&runs));
                runs.clear();
                out.push_str(&encode_inline(other.children(), images));
            }
        }
    }

    out.push_str(&encode_runs(&runs));
    out
}

fn blank_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\r?\n[ \t]*\r?\n").expect("valid blank line regex"))
}

fn heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(#{1,6})\s+(.*)$").expect("valid heading regex"))
}

fn list_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^( *)([-*+]|\d{1,9}[.)])\s+(.*)$").expect("valid list regex"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Mark;

    fn codec() -> DocumentCodec {
        DocumentCodec::default()
    }

    #[test]
    fn test_encode_paragraphs_and_breaks() {
        let tree = DocumentNode::doc(vec![
            DocumentNode::paragraph(vec![
                DocumentNode::text("line one"),
                DocumentNode::HardBreak,
                DocumentNode::marked_text("line two", vec![Mark::Bold]),
            ]),
            DocumentNode::paragraph_text("second"),
        ]);
        let items = codec().encode(&tree);
        assert_eq!(
            items,
            vec![PortableContentItem::text("line one\n**line two**\n\nsecond")]
        );
    }

    #[test]
    fn test_encode_image_between_paragraphs() {
        let tree = DocumentNode::doc(vec![
            DocumentNode::paragraph_text("x"),
            DocumentNode::image("s1"),
            DocumentNode::paragraph_text("y"),
        ]);
        assert_eq!(
            codec().encode(&tree),
            vec![
                PortableContentItem::text("x"),
                PortableContentItem::image("s1"),
                PortableContentItem::text("y"),
            ]
        );
    }

    #[test]
    fn test_encode_inline_image_splits_text() {
        let tree = DocumentNode::doc(vec![DocumentNode::paragraph(vec![
            DocumentNode::text("see "),
            DocumentNode::Image {
                attrs: ImageAttrs::new("https://cdn/chart.png").with_alt("chart"),
            },
            DocumentNode::text(" above"),
        ])]);
        let items = codec().encode(&tree);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], PortableContentItem::text("see "));
        assert!(items[1].is_image());
        assert_eq!(items[2], PortableContentItem::text(" above"));
    }

    #[test]
    fn test_encode_empty_document() {
        assert_eq!(
            codec().encode(&DocumentNode::empty_doc()),
            vec![PortableContentItem::text("")]
        );
        let blank = DocumentNode::doc(vec![DocumentNode::paragraph(Vec::new())]);
        assert_eq!(codec().encode(&blank), vec![PortableContentItem::text("")]);
    }

    #[test]
    fn test_encode_lists_and_headings() {
        let tree = DocumentNode::doc(vec![
            DocumentNode::heading(2, vec![DocumentNode::text("Market")]),
            DocumentNode::bullet_list(vec![
                DocumentNode::list_item(vec![
                    DocumentNode::paragraph_text("first"),
                    DocumentNode::ordered_list(
                        3,
                        vec![
                            DocumentNode::list_item(vec![DocumentNode::paragraph_text("a")]),
                            DocumentNode::list_item(vec![DocumentNode::paragraph_text("b")]),
                        ],
                    ),
                ]),
                DocumentNode::list_item(vec![DocumentNode::paragraph_text("second")]),
            ]),
        ]);
        let items = codec().encode(&tree);
        assert_eq!(
            items,
            vec![PortableContentItem::text(
                "## Market\n\n- first\n  3. a\n  4. b\n- second"
            )]
        );
    }

    #[test]
    fn test_decode_structure() {
        let doc = codec().decode(&[PortableContentItem::text(
            "## Market\n\n- first\n  3. a\n  4. b\n- second\n\nplain\nnext",
        )]);
        let content = doc.children();
        assert_eq!(content.len(), 3);
        assert!(matches!(&content[0], DocumentNode::Heading { attrs, .. } if attrs.level == 2));

        let list = &content[1];
        assert_eq!(list.kind(), "bulletList");
        assert_eq!(list.children().len(), 2);
        let nested = &list.children()[0].children()[1];
        assert!(matches!(nested, DocumentNode::OrderedList { attrs, content } if attrs.start == 3 && content.len() == 2));

        let para = &content[2];
        assert_eq!(para.children().len(), 3);
        assert_eq!(para.children()[1], DocumentNode::HardBreak);
    }

    #[test]
    fn test_round_trip_structure() {
        let tree = DocumentNode::doc(vec![
            DocumentNode::heading(1, vec![DocumentNode::text("Plan")]),
            DocumentNode::paragraph(vec![
                DocumentNode::text("We "),
                DocumentNode::marked_text("grow", vec![Mark::Bold, Mark::Italic]),
                DocumentNode::text(" fast"),
            ]),
            DocumentNode::ordered_list(
                1,
                vec![
                    DocumentNode::list_item(vec![DocumentNode::paragraph_text("one")]),
                    DocumentNode::list_item(vec![DocumentNode::paragraph_text("two")]),
                ],
            ),
        ]);
        let codec = codec();
        let back = codec.decode(&codec.encode(&tree));
        assert_eq!(back, tree);
    }

    #[test]
    fn test_marker_like_paragraphs_round_trip() {
        let codec = codec();
        for text in ["1. Introduction", "- note", "# tag line", "  2) indented", "\\- literal"] {
            let tree = DocumentNode::doc(vec![DocumentNode::paragraph_text(text)]);
            let items = codec.encode(&tree);
            assert_eq!(codec.decode(&items), tree, "{:?} encoded as {:?}", text, items);
        }

        let items = codec.encode(&DocumentNode::doc(vec![DocumentNode::paragraph_text(
            "1. Introduction",
        )]));
        assert_eq!(items, vec![PortableContentItem::text("\\1. Introduction")]);
    }

    #[test]
    fn test_marker_like_line_after_break_and_image() {
        let codec = codec();
        let tree = DocumentNode::doc(vec![DocumentNode::paragraph(vec![
            DocumentNode::text("Goals"),
            DocumentNode::HardBreak,
            DocumentNode::text("- grow"),
        ])]);
        assert_eq!(codec.decode(&codec.encode(&tree)), tree);

        let with_image = DocumentNode::doc(vec![DocumentNode::paragraph(vec![
            DocumentNode::text("see"),
            DocumentNode::image("s1"),
            DocumentNode::text("# 2"),
        ])]);
        let items = codec.encode(&with_image);
        assert_eq!(items[2], PortableContentItem::text("\\# 2"));
        let back = codec.decode(&items);
        assert_eq!(back.children()[2], DocumentNode::paragraph_text("# 2"));
    }

    #[test]
    fn test_decode_crlf_paragraphs() {
        let doc = codec().decode(&[PortableContentItem::text("first\r\n\r\nsecond\r\nthird")]);
        assert_eq!(
            doc,
            DocumentNode::doc(vec![
                DocumentNode::paragraph_text("first"),
                DocumentNode::paragraph(vec![
                    DocumentNode::text("second"),
                    DocumentNode::HardBreak,
                    DocumentNode::text("third"),
                ]),
            ])
        );
    }

    #[test]
    fn test_decode_empty() {
        let doc = codec().decode(&[PortableContentItem::text("")]);
        assert_eq!(doc, DocumentNode::doc(vec![DocumentNode::paragraph(Vec::new())]));
    }

    #[test]
    fn test_block_helpers() {
        let tree = DocumentNode::doc(vec![DocumentNode::paragraph_text("hello")]);
        let block = codec().encode_block("Overview", &tree);
        assert_eq!(block.title, "Overview");
        assert_eq!(codec().decode_block(&block), tree);
    }
}
