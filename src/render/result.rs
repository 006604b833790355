//! Export result with layout and statistics.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::Page;
use crate::paginate::HeightMap;

/// Result of exporting a plan: the PDF plus the layout it was built from.
#[derive(Debug, Clone)]
pub struct ExportResult {
    /// PDF bytes
    pub pdf: Vec<u8>,

    /// Pages, in output order
    pub pages: Vec<Page>,

    /// Heights measured for pagination
    pub heights: HeightMap,

    /// Export statistics
    pub stats: ExportStats,
}

impl ExportResult {
    /// Number of pages in the PDF.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Write the PDF to a file.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.pdf)?;
        Ok(())
    }
}

/// Statistics collected during an export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportStats {
    /// Sections in the document
    pub section_count: u32,

    /// Items placed on pages
    pub item_count: u32,

    /// Pages produced
    pub page_count: u32,

    /// Distinct images embedded as data URIs
    pub inlined_images: u32,

    /// Images that fell back to their remote URL
    pub fallback_images: u32,

    /// Items taller than a whole page
    pub oversize_items: u32,

    /// Size of the PDF in bytes
    pub pdf_bytes: u64,
}

impl ExportStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count pages and items, flagging items that overflow a page budget.
    pub fn count_pages(&mut self, pages: &[Page], page_budget: f32) {
        self.page_count += pages.len() as u32;
        for page in pages {
            self.item_count += page.items.len() as u32;
            self.oversize_items += page
                .items
                .iter()
                .filter(|i| i.rendered_height > page_budget)
                .count() as u32;
        }
    }

    /// Whether every image was embedded.
    pub fn fully_inlined(&self) -> bool {
        self.fallback_images == 0
    }
}
