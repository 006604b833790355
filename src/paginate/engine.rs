//! The page-building pass.
//!
//! Items are placed greedily in document order. A page is flushed when the
//! next item would overrun the page budget plus the overflow tolerance; an
//! item taller than a whole page still gets a page of its own.
//!
//! # Example
//!
//! ```
//! use plandoc::paginate::{PaginationOptions, Paginator, SectionHeights};
//!
//! let paginator = Paginator::new(PaginationOptions::uniform(900.0));
//! let pages = paginator.paginate(&[SectionHeights::new(vec![400.0, 400.0, 400.0])]);
//!
//! assert_eq!(pages.len(), 2);
//! assert_eq!(pages[0].items.len(), 2);
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{Page, PageLayoutItem};

use super::PaginationOptions;

/// Measured item heights of one section, in item order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionHeights {
    /// Rendered height of each item
    pub heights: Vec<f32>,
}

impl SectionHeights {
    /// Create section heights.
    pub fn new(heights: Vec<f32>) -> Self {
        Self { heights }
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.heights.len()
    }

    /// Check if the section has no items.
    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }
}

/// Lays out measured sections into pages.
#[derive(Debug, Clone, Default)]
pub struct Paginator {
    options: PaginationOptions,
}

impl Paginator {
    /// Create a paginator.
    pub fn new(options: PaginationOptions) -> Self {
        Self { options }
    }

    /// Get the pagination options.
    pub fn options(&self) -> &PaginationOptions {
        &self.options
    }

    /// Lay out all sections.
    ///
    /// The result always holds at least one page, so an empty document still
    /// gets its title page.
    pub fn paginate(&self, sections: &[SectionHeights]) -> Vec<Page> {
        let pages: Vec<Page> = self.pages(sections).collect();
        log::debug!(
            "paginated {} item(s) into {} page(s)",
            sections.iter().map(SectionHeights::len).sum::<usize>(),
            pages.len()
        );
        pages
    }

    /// Lazily yield pages one at a time.
    pub fn pages<'a>(&'a self, sections: &'a [SectionHeights]) -> Pages<'a> {
        Pages::new(&self.options, sections)
    }
}

/// State of the page-building pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassState {
    /// Adding items to the current page
    Accumulating,
    /// The current page is full and is handed out next
    Flush,
    /// Input exhausted, the last page is handed out next
    FinalFlush,
    /// Pass complete
    Done,
}

/// Iterator over pages, driven by the page-building state machine.
pub struct Pages<'a> {
    options: &'a PaginationOptions,
    sections: &'a [SectionHeights],
    state: PassState,
    section: usize,
    item: usize,
    current: Page,
    height: f32,
    shown: HashSet<usize>,
    last_with_items: Option<usize>,
    emitted: u32,
}

impl<'a> Pages<'a> {
    fn new(options: &'a PaginationOptions, sections: &'a [SectionHeights]) -> Self {
        Self {
            options,
            sections,
            state: PassState::Accumulating,
            section: 0,
            item: 0,
            current: Page::new(1),
            height: 0.0,
            shown: HashSet::new(),
            last_with_items: sections.iter().rposition(|s| !s.is_empty()),
            emitted: 0,
        }
    }

    /// Height accumulated on the page being built.
    pub fn current_height(&self) -> f32 {
        self.height
    }

    /// Check if the pass is complete.
    pub fn is_done(&self) -> bool {
        self.state == PassState::Done
    }

    /// Place the next item, or decide that the page must flush first.
    fn step(&mut self) {
        let Some(section) = self.sections.get(self.section) else {
            self.state = PassState::FinalFlush;
            return;
        };

        let Some(&height) = section.heights.get(self.item) else {
            if !section.is_empty() && Some(self.section) != self.last_with_items {
                self.height += self.options.section_bottom_margin - self.options.item_margin;
            }
            self.section += 1;
            self.item = 0;
            return;
        };

        let options = self.options;
        let first = !self.shown.contains(&self.section);
        let cost = if first {
            options.section_header_height + options.header_margin + height + options.item_margin
        } else {
            height + options.item_margin
        };

        if !self.current.is_empty() {
            let forced = first && options.break_policy.forces_before(self.section);
            let limit = options.budget(self.current.number) + options.overflow_tolerance;
            if forced || self.height + cost > limit {
                self.state = PassState::Flush;
                return;
            }
        }

        if first {
            self.shown.insert(self.section);
        }
        self.current.items.push(PageLayoutItem {
            section_index: self.section,
            item_index: self.item,
            rendered_height: height,
            needs_section_header: first,
        });
        self.height += cost;
        self.item += 1;
    }

    fn take_page(&mut self) -> Page {
        let next = Page::new(self.current.number + 1);
        self.height = 0.0;
        self.emitted += 1;
        std::mem::replace(&mut self.current, next)
    }
}

impl Iterator for Pages<'_> {
    type Item = Page;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                PassState::Accumulating => self.step(),

                PassState::Flush => {
                    self.state = PassState::Accumulating;
                    let page = self.take_page();
                    log::debug!(
                        "page {} full at {:.1}px with {} item(s)",
                        page.number,
                        page.content_height(),
                        page.items.len()
                    );
                    return Some(page);
                }

                PassState::FinalFlush => {
                    self.state = PassState::Done;
                    if !self.current.is_empty() || self.emitted == 0 {
                        return Some(self.take_page());
                    }
                }

                PassState::Done => return None,
            }
        }
    }
}
