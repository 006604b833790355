//! Pagination engine.
//!
//! Pagination is a pure function of measured heights and layout options: the
//! preview and the export pipeline only differ in how they measure, never in
//! how pages are built.

mod engine;
mod measure;
mod options;

pub use engine::{Pages, Paginator, SectionHeights};
pub use measure::{
    item_element_id, measure_document, EstimatingMeasurer, HeightMap, HeightMeasurer,
    MeasureRequest,
};
pub use options::{BreakPolicy, PaginationOptions, DOCUMENT_HEADER_HEIGHT, PAGE_PADDING};

use crate::model::Page;

/// Paginate a measured document.
pub fn paginate(heights: &HeightMap, options: &PaginationOptions) -> Vec<Page> {
    Paginator::new(options.clone()).paginate(heights.sections())
}
