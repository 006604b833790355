//! Editor tree types.
//!
//! The tree mirrors the JSON the rich-text editor emits: every node carries a
//! `"type"` tag, container nodes hold a `content` array and configurable nodes
//! keep their settings under `attrs`.

use serde::{Deserialize, Serialize};

/// A node in the editor document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DocumentNode {
    /// Root of one editable region
    Doc {
        /// Top-level block nodes
        #[serde(default)]
        content: Vec<DocumentNode>,
    },

    /// A paragraph of inline content
    Paragraph {
        /// Inline children (text, hard breaks, images)
        #[serde(default)]
        content: Vec<DocumentNode>,
    },

    /// A heading
    Heading {
        /// Heading level
        attrs: HeadingAttrs,
        /// Inline children
        #[serde(default)]
        content: Vec<DocumentNode>,
    },

    /// An unordered list
    BulletList {
        /// `listItem` children
        #[serde(default)]
        content: Vec<DocumentNode>,
    },

    /// A numbered list
    OrderedList {
        /// Starting number
        #[serde(default)]
        attrs: OrderedListAttrs,
        /// `listItem` children
        #[serde(default)]
        content: Vec<DocumentNode>,
    },

    /// A list item, holding paragraphs and nested lists
    ListItem {
        /// Block children
        #[serde(default)]
        content: Vec<DocumentNode>,
    },

    /// A table
    Table {
        /// `tableRow` children
        #[serde(default)]
        content: Vec<DocumentNode>,
    },

    /// A table row
    TableRow {
        /// `tableCell` / `tableHeader` children
        #[serde(default)]
        content: Vec<DocumentNode>,
    },

    /// A body cell
    TableCell {
        /// Paragraph children
        #[serde(default)]
        content: Vec<DocumentNode>,
    },

    /// A header cell
    TableHeader {
        /// Paragraph children
        #[serde(default)]
        content: Vec<DocumentNode>,
    },

    /// An image, either top-level or inline in a paragraph
    Image {
        /// Source and geometry
        attrs: ImageAttrs,
    },

    /// An explicit line break inside a paragraph
    HardBreak,

    /// A run of text with its marks
    Text {
        /// The text content
        text: String,
        /// Formatting marks
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        marks: Vec<Mark>,
    },
}

impl DocumentNode {
    /// Create a document root.
    pub fn doc(content: Vec<DocumentNode>) -> Self {
        DocumentNode::Doc { content }
    }

    /// Create an empty document root.
    pub fn empty_doc() -> Self {
        DocumentNode::Doc {
            content: Vec::new(),
        }
    }

    /// Create a paragraph from inline children.
    pub fn paragraph(content: Vec<DocumentNode>) -> Self {
        DocumentNode::Paragraph { content }
    }

    /// Create a paragraph holding one plain text run.
    pub fn paragraph_text(text: impl Into<String>) -> Self {
        DocumentNode::Paragraph {
            content: vec![DocumentNode::text(text)],
        }
    }

    /// Create a heading.
    pub fn heading(level: u8, content: Vec<DocumentNode>) -> Self {
        DocumentNode::Heading {
            attrs: HeadingAttrs {
                level: level.clamp(1, 6),
            },
            content,
        }
    }

    /// Create a bulleted list from items.
    pub fn bullet_list(items: Vec<DocumentNode>) -> Self {
        DocumentNode::BulletList { content: items }
    }

    /// Create a numbered list from items.
    pub fn ordered_list(start: u32, items: Vec<DocumentNode>) -> Self {
        DocumentNode::OrderedList {
            attrs: OrderedListAttrs { start },
            content: items,
        }
    }

    /// Create a list item.
    pub fn list_item(content: Vec<DocumentNode>) -> Self {
        DocumentNode::ListItem { content }
    }

    /// Create a plain text run.
    pub fn text(text: impl Into<String>) -> Self {
        DocumentNode::Text {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    /// Create a text run with marks.
    pub fn marked_text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        DocumentNode::Text {
            text: text.into(),
            marks,
        }
    }

    /// Create an image node.
    pub fn image(src: impl Into<String>) -> Self {
        DocumentNode::Image {
            attrs: ImageAttrs::new(src),
        }
    }

    /// Children of a container node; leaves return an empty slice.
    pub fn children(&self) -> &[DocumentNode] {
        match self {
            DocumentNode::Doc { content }
            | DocumentNode::Paragraph { content }
            | DocumentNode::Heading { content, .. }
            | DocumentNode::BulletList { content }
            | DocumentNode::OrderedList { content, .. }
            | DocumentNode::ListItem { content }
            | DocumentNode::Table { content }
            | DocumentNode::TableRow { content }
            | DocumentNode::TableCell { content }
            | DocumentNode::TableHeader { content } => content,
            DocumentNode::Image { .. } | DocumentNode::HardBreak | DocumentNode::Text { .. } => &[],
        }
    }

    /// The editor's name for this node kind.
    pub fn kind(&self) -> &'static str {
        match self {
            DocumentNode::Doc { .. } => "doc",
            DocumentNode::Paragraph { .. } => "paragraph",
            DocumentNode::Heading { .. } => "heading",
            DocumentNode::BulletList { .. } => "bulletList",
            DocumentNode::OrderedList { .. } => "orderedList",
            DocumentNode::ListItem { .. } => "listItem",
            DocumentNode::Table { .. } => "table",
            DocumentNode::TableRow { .. } => "tableRow",
            DocumentNode::TableCell { .. } => "tableCell",
            DocumentNode::TableHeader { .. } => "tableHeader",
            DocumentNode::Image { .. } => "image",
            DocumentNode::HardBreak => "hardBreak",
            DocumentNode::Text { .. } => "text",
        }
    }

    /// Concatenated text of this subtree, without formatting.
    pub fn plain_text(&self) -> String {
        match self {
            DocumentNode::Text { text, .. } => text.clone(),
            DocumentNode::HardBreak => "\n".to_string(),
            DocumentNode::Image { attrs } => attrs.alt.clone().unwrap_or_default(),
            DocumentNode::Paragraph { content } | DocumentNode::Heading { content, .. } => {
                content.iter().map(|c| c.plain_text()).collect()
            }
            other => other
                .children()
                .iter()
                .map(|c| c.plain_text())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Whether the subtree holds no visible content.
    pub fn is_blank(&self) -> bool {
        match self {
            DocumentNode::Image { .. } => false,
            DocumentNode::Text { text, .. } => text.trim().is_empty(),
            DocumentNode::HardBreak => true,
            other => other.children().iter().all(|c| c.is_blank()),
        }
    }
}

/// Heading attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingAttrs {
    /// Heading level (1-6)
    pub level: u8,
}

/// Ordered list attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedListAttrs {
    /// Number of the first item
    #[serde(default = "default_start")]
    pub start: u32,
}

impl Default for OrderedListAttrs {
    fn default() -> Self {
        Self { start: 1 }
    }
}

fn default_start() -> u32 {
    1
}

/// Image attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAttrs {
    /// Image URL (public upload URL or data URI)
    pub src: String,

    /// Alternative text, carried as the caption in portable form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,

    /// Display width in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,

    /// Display height in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl ImageAttrs {
    /// Create attributes with only a source.
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            alt: None,
            width: None,
            height: None,
        }
    }

    /// Set alt text.
    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = Some(alt.into());
        self
    }

    /// Set display size.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

/// Inline formatting attached to a text run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mark {
    /// Bold text
    Bold,
    /// Italic text
    Italic,
    /// Highlighted (marker pen) text. The colour is not kept in portable form.
    Highlight {
        /// Highlight colour
        #[serde(default)]
        attrs: ColorAttrs,
    },
    /// Coloured text
    TextStyle {
        /// Text colour
        #[serde(default)]
        attrs: ColorAttrs,
    },
    /// Inline code
    Code,
    /// Spell-checker annotation
    SpellError,
}

impl Mark {
    /// Highlight with the editor's default colour.
    pub fn highlight() -> Self {
        Mark::Highlight {
            attrs: ColorAttrs::default(),
        }
    }

    /// Inline colour.
    pub fn color(color: impl Into<String>) -> Self {
        Mark::TextStyle {
            attrs: ColorAttrs {
                color: Some(color.into()),
            },
        }
    }

    /// Nesting rank used by the encoder, outermost first.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Mark::TextStyle { .. } => 0,
            Mark::SpellError => 1,
            Mark::Bold => 2,
            Mark::Italic => 3,
            Mark::Highlight { .. } => 4,
            Mark::Code => 5,
        }
    }

    /// The colour carried by an inline colour mark, if any.
    pub fn text_color(&self) -> Option<&str> {
        match self {
            Mark::TextStyle { attrs } => attrs.color.as_deref(),
            _ => None,
        }
    }
}

/// Colour attribute shared by highlight and text-style marks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorAttrs {
    /// CSS colour value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A run of text with a set of marks, as produced by the mark decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    /// The text content
    pub text: String,

    /// Marks applying to the whole run
    pub marks: Vec<Mark>,
}

impl TextRun {
    /// Create an unformatted run.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    /// Create a run with marks.
    pub fn with_marks(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }

    /// Check if this run is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Whether both runs carry the same set of marks, ignoring order.
    pub fn same_marks(&self, other: &TextRun) -> bool {
        same_mark_set(&self.marks, &other.marks)
    }

    /// Convert into a `text` tree node.
    pub fn into_node(self) -> DocumentNode {
        DocumentNode::Text {
            text: self.text,
            marks: self.marks,
        }
    }
}

/// Set equality over two mark lists.
pub fn same_mark_set(a: &[Mark], b: &[Mark]) -> bool {
    a.len() == b.len() && a.iter().all(|m| b.contains(m)) && b.iter().all(|m| a.contains(m))
}
