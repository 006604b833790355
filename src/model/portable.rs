//! Portable block types used on the wire.

use serde::{Deserialize, Serialize};

/// One piece of section content in the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PortableContentItem {
    /// Delimiter-encoded text (paragraphs separated by blank lines)
    Text {
        /// Encoded text
        value: String,
    },

    /// An image reference
    Image {
        /// Image URL, passed through unchanged
        src: String,
        /// Caption (the editor's alt text)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
        /// Display width in pixels
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<f64>,
        /// Display height in pixels
        #[serde(default, skip_serializing_if = "Option::is_none")]
        height: Option<f64>,
    },

    /// A table, one line of text per cell
    Table {
        /// Header values
        columns: Vec<String>,
        /// Body rows
        rows: Vec<Vec<String>>,
    },
}

impl PortableContentItem {
    /// Create a text item.
    pub fn text(value: impl Into<String>) -> Self {
        PortableContentItem::Text {
            value: value.into(),
        }
    }

    /// Create an image item with only a source.
    pub fn image(src: impl Into<String>) -> Self {
        PortableContentItem::Image {
            src: src.into(),
            caption: None,
            width: None,
            height: None,
        }
    }

    /// Create a table item.
    pub fn table(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        PortableContentItem::Table { columns, rows }
    }

    /// Check if this item is text.
    pub fn is_text(&self) -> bool {
        matches!(self, PortableContentItem::Text { .. })
    }

    /// Check if this item is an image.
    pub fn is_image(&self) -> bool {
        matches!(self, PortableContentItem::Image { .. })
    }

    /// Check if this item is a table.
    pub fn is_table(&self) -> bool {
        matches!(self, PortableContentItem::Table { .. })
    }

    /// Text items whose value is empty or whitespace carry nothing.
    ///
    /// Images and tables always count as content.
    pub fn is_blank(&self) -> bool {
        match self {
            PortableContentItem::Text { value } => value.trim().is_empty(),
            PortableContentItem::Image { .. } | PortableContentItem::Table { .. } => false,
        }
    }
}

/// A titled group of portable content items.
///
/// On the wire the title sits under a `meta` object:
/// `{"meta": {"title": ...}, "content": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireBlock", into = "WireBlock")]
pub struct Block {
    /// Block title
    pub title: String,

    /// Ordered content items
    pub content: Vec<PortableContentItem>,
}

impl Block {
    /// Create a new block.
    pub fn new(title: impl Into<String>, content: Vec<PortableContentItem>) -> Self {
        Self {
            title: title.into(),
            content,
        }
    }

    /// Check if the block has no non-blank content.
    pub fn is_blank(&self) -> bool {
        self.content.iter().all(|item| item.is_blank())
    }

    /// Drop blank text items, keeping order.
    pub fn without_blank_items(&self) -> Block {
        Block {
            title: self.title.clone(),
            content: self
                .content
                .iter()
                .filter(|item| !item.is_blank())
                .cloned()
                .collect(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireBlock {
    meta: BlockMeta,
    #[serde(default)]
    content: Vec<PortableContentItem>,
}

#[derive(Serialize, Deserialize)]
struct BlockMeta {
    #[serde(default)]
    title: String,
}

impl From<WireBlock> for Block {
    fn from(wire: WireBlock) -> Self {
        Block {
            title: wire.meta.title,
            content: wire.content,
        }
    }
}

impl From<Block> for WireBlock {
    fn from(block: Block) -> Self {
        WireBlock {
            meta: BlockMeta { title: block.title },
            content: block.content,
        }
    }
}
