//! Height measurement.
//!
//! The engine never lays out text itself. Heights come from a
//! [`HeightMeasurer`], usually a render context that renders each item
//! off-screen and reads its box height, and are collected into a
//! [`HeightMap`] before the page-building pass runs.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{PlanDocument, PortableContentItem};

use super::SectionHeights;

/// Element id of an item in the measurement document.
pub fn item_element_id(section_index: usize, item_index: usize) -> String {
    format!("item-{}-{}", section_index, item_index)
}

/// One item to be measured.
#[derive(Debug, Clone, Copy)]
pub struct MeasureRequest<'a> {
    /// Index of the owning section
    pub section_index: usize,

    /// Index of the item within its section
    pub item_index: usize,

    /// The item itself
    pub item: &'a PortableContentItem,
}

impl MeasureRequest<'_> {
    /// Element id of the item in the measurement document.
    pub fn element_id(&self) -> String {
        item_element_id(self.section_index, self.item_index)
    }
}

/// Source of rendered item heights.
pub trait HeightMeasurer {
    /// Prepare for a document before its items are measured.
    ///
    /// Render-backed measurers load the hidden measurement document here.
    fn begin(&mut self, _doc: &PlanDocument) -> Result<()> {
        Ok(())
    }

    /// Measured height of one item, in CSS pixels.
    fn measure(&mut self, request: &MeasureRequest<'_>) -> Result<f32>;
}

/// Measured heights of every item of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeightMap {
    sections: Vec<SectionHeights>,
}

impl HeightMap {
    /// Create a height map from per-section heights.
    pub fn new(sections: Vec<Vec<f32>>) -> Self {
        Self {
            sections: sections.into_iter().map(SectionHeights::new).collect(),
        }
    }

    /// Height of one item, if measured.
    pub fn get(&self, section_index: usize, item_index: usize) -> Option<f32> {
        self.sections
            .get(section_index)?
            .heights
            .get(item_index)
            .copied()
    }

    /// Engine input.
    pub fn sections(&self) -> &[SectionHeights] {
        &self.sections
    }

    /// Number of measured items.
    pub fn item_count(&self) -> usize {
        self.sections.iter().map(SectionHeights::len).sum()
    }

    /// Check that the map covers exactly the items of `doc`.
    pub fn validate(&self, doc: &PlanDocument) -> Result<()> {
        if self.sections.len() != doc.sections.len() {
            return Err(Error::InvalidDocument(format!(
                "height map has {} section(s), document has {}",
                self.sections.len(),
                doc.sections.len()
            )));
        }
        for (i, (heights, section)) in self.sections.iter().zip(&doc.sections).enumerate() {
            if heights.len() != section.items.len() {
                return Err(Error::InvalidDocument(format!(
                    "section {} has {} item(s) but {} height(s)",
                    i,
                    section.items.len(),
                    heights.len()
                )));
            }
            if let Some(h) = heights.heights.iter().find(|h| !h.is_finite() || **h < 0.0) {
                return Err(Error::InvalidDocument(format!(
                    "section {} has invalid height {}",
                    i, h
                )));
            }
        }
        Ok(())
    }
}

/// Measure every item of a document in order.
pub fn measure_document<M>(doc: &PlanDocument, measurer: &mut M) -> Result<HeightMap>
where
    M: HeightMeasurer + ?Sized,
{
    measurer.begin(doc)?;

    let mut sections = Vec::with_capacity(doc.sections.len());
    for (section_index, section) in doc.sections.iter().enumerate() {
        let mut heights = Vec::with_capacity(section.items.len());
        for (item_index, item) in section.items.iter().enumerate() {
            let request = MeasureRequest {
                section_index,
                item_index,
                item,
            };
            let height = measurer.measure(&request)?;
            heights.push(height.max(0.0));
        }
        sections.push(heights);
    }

    let map = HeightMap::new(sections);
    log::debug!("measured {} item(s)", map.item_count());
    Ok(map)
}

/// Approximate heights without a renderer.
///
/// Text is wrapped at a fixed number of characters per line, images are
/// scaled to the content width and tables get a fixed row height. Results are
/// deterministic, which makes the estimator useful for headless runs.
#[derive(Debug, Clone)]
pub struct EstimatingMeasurer {
    /// Height of one text line
    pub line_height: f32,

    /// Characters that fit on one line
    pub chars_per_line: usize,

    /// Gap between paragraphs within one text item
    pub paragraph_gap: f32,

    /// Width available to images
    pub content_width: f32,

    /// Height for images without intrinsic size
    pub default_image_height: f32,

    /// Height of one table row
    pub table_row_height: f32,
}

impl EstimatingMeasurer {
    /// Create an estimator with A4 defaults.
    pub fn new() -> Self {
        Self::default()
    }

    fn text_height(&self, value: &str) -> f32 {
        let cpl = self.chars_per_line.max(1);
        let mut height = 0.0;
        let mut paragraphs = 0;

        for paragraph in value.split("\n\n").filter(|p| !p.trim().is_empty()) {
            paragraphs += 1;
            for line in paragraph.lines() {
                let chars = line.chars().count();
                let wrapped = chars.div_ceil(cpl).max(1) as f32;
                let scale = if line.starts_with('#') { 1.5 } else { 1.0 };
                height += wrapped * self.line_height * scale;
            }
        }

        if paragraphs == 0 {
            return self.line_height;
        }
        height + (paragraphs - 1) as f32 * self.paragraph_gap
    }

    fn image_height(&self, width: Option<f64>, height: Option<f64>) -> f32 {
        match (width, height) {
            (Some(w), Some(h)) if w > 0.0 => {
                let scale = (self.content_width as f64 / w).min(1.0);
                (h * scale) as f32
            }
            (_, Some(h)) => h as f32,
            _ => self.default_image_height,
        }
    }
}

impl Default for EstimatingMeasurer {
    fn default() -> Self {
        Self {
            line_height: 24.0,
            chars_per_line: 90,
            paragraph_gap: 12.0,
            content_width: 697.0,
            default_image_height: 240.0,
            table_row_height: 32.0,
        }
    }
}

impl HeightMeasurer for EstimatingMeasurer {
    fn measure(&mut self, request: &MeasureRequest<'_>) -> Result<f32> {
        let height = match request.item {
            PortableContentItem::Text { value } => self.text_height(value),
            PortableContentItem::Image { width, height, .. } => self.image_height(*width, *height),
            PortableContentItem::Table { columns, rows } => {
                let header = usize::from(!columns.is_empty());
                (rows.len() + header).max(1) as f32 * self.table_row_height
            }
        };
        Ok(height)
    }
}
