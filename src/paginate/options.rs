//! Pagination options and configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::PageSize;

/// Height of the document title header on the first page, in CSS pixels.
pub const DOCUMENT_HEADER_HEIGHT: f32 = 120.0;

/// Page padding (top plus bottom), in CSS pixels.
pub const PAGE_PADDING: f32 = 96.0;

/// Layout parameters for the pagination engine.
///
/// All lengths are CSS pixels, the unit element heights are measured in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaginationOptions {
    /// Content budget of page 1 (document header and padding reserved)
    pub first_page_budget: f32,

    /// Content budget of every later page (padding reserved)
    pub page_budget: f32,

    /// Height of a section header
    pub section_header_height: f32,

    /// Space between a section header and its first item
    pub header_margin: f32,

    /// Space below every item
    pub item_margin: f32,

    /// Space below a section, replacing its last item's margin
    pub section_bottom_margin: f32,

    /// Allowed overrun of the budget before a page is flushed
    pub overflow_tolerance: f32,

    /// Forced page breaks
    pub break_policy: BreakPolicy,
}

impl PaginationOptions {
    /// Create options with A4 defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for an A4 page at 96 dpi.
    pub fn a4() -> Self {
        Self::for_page(PageSize::a4(), PAGE_PADDING, DOCUMENT_HEADER_HEIGHT)
    }

    /// Derive budgets from a page size, its padding and the document header.
    ///
    /// The document header only takes room on the first page.
    pub fn for_page(size: PageSize, padding: f32, document_header: f32) -> Self {
        let (_, height) = size.css_pixels();
        let page_budget = (height as f32 - padding).max(0.0);
        Self {
            first_page_budget: (page_budget - document_header).max(0.0),
            page_budget,
            section_header_height: 56.0,
            header_margin: 16.0,
            item_margin: 12.0,
            section_bottom_margin: 40.0,
            overflow_tolerance: 24.0,
            break_policy: BreakPolicy::Flow,
        }
    }

    /// One budget for every page, with no headers, margins or tolerance.
    pub fn uniform(budget: f32) -> Self {
        Self {
            first_page_budget: budget,
            page_budget: budget,
            section_header_height: 0.0,
            header_margin: 0.0,
            item_margin: 0.0,
            section_bottom_margin: 0.0,
            overflow_tolerance: 0.0,
            break_policy: BreakPolicy::Flow,
        }
    }

    /// Set the budget of every page.
    pub fn with_budget(mut self, budget: f32) -> Self {
        self.first_page_budget = budget;
        self.page_budget = budget;
        self
    }

    /// Set the first page budget.
    pub fn with_first_page_budget(mut self, budget: f32) -> Self {
        self.first_page_budget = budget;
        self
    }

    /// Set the budget of pages after the first.
    pub fn with_page_budget(mut self, budget: f32) -> Self {
        self.page_budget = budget;
        self
    }

    /// Set the section header height and the margin below it.
    pub fn with_section_header(mut self, height: f32, margin: f32) -> Self {
        self.section_header_height = height;
        self.header_margin = margin;
        self
    }

    /// Set the per-item bottom margin.
    pub fn with_item_margin(mut self, margin: f32) -> Self {
        self.item_margin = margin;
        self
    }

    /// Set the inter-section margin.
    pub fn with_section_bottom_margin(mut self, margin: f32) -> Self {
        self.section_bottom_margin = margin;
        self
    }

    /// Set the overflow tolerance.
    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.overflow_tolerance = tolerance.max(0.0);
        self
    }

    /// Set the forced page break policy.
    pub fn with_break_policy(mut self, policy: BreakPolicy) -> Self {
        self.break_policy = policy;
        self
    }

    /// Budget for the given 1-indexed page.
    pub fn budget(&self, page_number: u32) -> f32 {
        if page_number <= 1 {
            self.first_page_budget
        } else {
            self.page_budget
        }
    }
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self::a4()
    }
}

/// When a section must start on a fresh page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "sections", rename_all = "camelCase")]
pub enum BreakPolicy {
    /// Only the budget decides page breaks
    #[default]
    Flow,

    /// Start the listed sections (by index) on a new page
    ForceBeforeSections(BTreeSet<usize>),
}

impl BreakPolicy {
    /// Fresh pages for the first two sections.
    pub fn legacy_export() -> Self {
        BreakPolicy::ForceBeforeSections([0, 1].into_iter().collect())
    }

    /// Whether a break is forced before the given section.
    pub fn forces_before(&self, section_index: usize) -> bool {
        match self {
            BreakPolicy::Flow => false,
            BreakPolicy::ForceBeforeSections(sections) => sections.contains(&section_index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a4_budgets() {
        let options = PaginationOptions::a4();
        assert_eq!(options.page_budget, 1123.0 - PAGE_PADDING);
        assert_eq!(
            options.first_page_budget,
            options.page_budget - DOCUMENT_HEADER_HEIGHT
        );
        assert_eq!(options.budget(1), options.first_page_budget);
        assert_eq!(options.budget(2), options.page_budget);
        assert_eq!(options.overflow_tolerance, 24.0);
    }

    #[test]
    fn test_builder() {
        let options = PaginationOptions::new()
            .with_budget(900.0)
            .with_tolerance(-5.0)
            .with_break_policy(BreakPolicy::legacy_export());
        assert_eq!(options.budget(1), 900.0);
        assert_eq!(options.budget(3), 900.0);
        assert_eq!(options.overflow_tolerance, 0.0);
        assert!(options.break_policy.forces_before(1));
        assert!(!options.break_policy.forces_before(2));
    }

    #[test]
    fn test_deserialize_partial() {
        let json = r#"{"pageBudget": 800, "breakPolicy": {"mode": "forceBeforeSections", "sections": [2]}}"#;
        let options: PaginationOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.page_budget, 800.0);
        assert_eq!(options.item_margin, PaginationOptions::a4().item_margin);
        assert!(options.break_policy.forces_before(2));
    }
}
