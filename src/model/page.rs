//! Page-level layout types.

use serde::{Deserialize, Serialize};

/// One item placed on a page by the pagination engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLayoutItem {
    /// Index of the owning section
    pub section_index: usize,

    /// Index of the item within its section
    pub item_index: usize,

    /// Measured height in CSS pixels
    pub rendered_height: f32,

    /// Whether the section header is drawn above this item
    pub needs_section_header: bool,
}

/// A single output page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Page number (1-indexed)
    pub number: u32,

    /// Items on the page, in document order
    pub items: Vec<PageLayoutItem>,

    /// Only the first page carries the document title header
    pub show_document_header: bool,
}

impl Page {
    /// Create an empty page.
    pub fn new(number: u32) -> Self {
        Self {
            number,
            items: Vec::new(),
            show_document_header: number == 1,
        }
    }

    /// Check if the page has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of item heights on the page.
    pub fn content_height(&self) -> f32 {
        self.items.iter().map(|i| i.rendered_height).sum()
    }

    /// `(section, item)` coordinates of the items on the page.
    pub fn positions(&self) -> Vec<(usize, usize)> {
        self.items
            .iter()
            .map(|i| (i.section_index, i.item_index))
            .collect()
    }

    /// Sections whose header is drawn on this page.
    pub fn section_headers(&self) -> Vec<usize> {
        self.items
            .iter()
            .filter(|i| i.needs_section_header)
            .map(|i| i.section_index)
            .collect()
    }
}

/// Physical page size in PDF points (1 point = 1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    /// Width in points
    pub width: f32,

    /// Height in points
    pub height: f32,
}

impl PageSize {
    /// Standard A4 size (210 x 297 mm).
    pub fn a4() -> Self {
        Self {
            width: 595.0, // 210mm * 2.834
            height: 842.0, // 297mm * 2.834
        }
    }

    /// Standard Letter size (8.5 x 11 inches).
    pub fn letter() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
        }
    }

    /// Size in CSS pixels (96 per inch).
    pub fn css_pixels(&self) -> (u32, u32) {
        (
            (self.width * 96.0 / 72.0).round() as u32,
            (self.height * 96.0 / 72.0).round() as u32,
        )
    }

    /// Check if the page is in landscape orientation.
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::a4()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_new() {
        let first = Page::new(1);
        assert!(first.is_empty());
        assert!(first.show_document_header);
        assert!(!Page::new(2).show_document_header);
    }

    #[test]
    fn test_a4_pixels() {
        let a4 = PageSize::a4();
        assert!(!a4.is_landscape());
        assert_eq!(a4.css_pixels(), (793, 1123));
    }

    #[test]
    fn test_page_positions() {
        let mut page = Page::new(1);
        page.items.push(PageLayoutItem {
            section_index: 0,
            item_index: 0,
            rendered_height: 100.0,
            needs_section_header: true,
        });
        page.items.push(PageLayoutItem {
            section_index: 0,
            item_index: 1,
            rendered_height: 50.0,
            needs_section_header: false,
        });
        assert_eq!(page.positions(), vec![(0, 0), (0, 1)]);
        assert_eq!(page.section_headers(), vec![0]);
        assert_eq!(page.content_height(), 150.0);
    }
}
