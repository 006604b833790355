//! Document-level types.

use super::PortableContentItem;
use serde::{Deserialize, Serialize};

/// A complete business plan, ready for measurement and pagination.
///
/// Built by value from the content store; nothing here refers back to an
/// editor tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanDocument {
    /// Title shown in the document header on the first page
    pub title: String,

    /// Sections in authored order
    pub sections: Vec<DocumentSection>,
}

impl PlanDocument {
    /// Create a new empty document.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sections: Vec::new(),
        }
    }

    /// Add a section.
    pub fn add_section(&mut self, section: DocumentSection) {
        self.sections.push(section);
    }

    /// Number of sections.
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Total number of paginated items.
    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }

    /// Look up an item by position.
    pub fn item(&self, section_index: usize, item_index: usize) -> Option<&PortableContentItem> {
        self.sections
            .get(section_index)
            .and_then(|s| s.items.get(item_index))
    }

    /// Get a section by identifier.
    pub fn section(&self, id: &str) -> Option<&DocumentSection> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Check if the document has no sections.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// One section of the plan with its flattened content items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSection {
    /// Section identifier
    pub id: String,

    /// Title rendered in the section header
    pub title: String,

    /// Items in authored order
    pub items: Vec<PortableContentItem>,
}

impl DocumentSection {
    /// Create a section.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        items: Vec<PortableContentItem>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            items,
        }
    }
}
