//! # plandoc
//!
//! Business-plan document codec and deterministic pagination engine.
//!
//! This library converts rich-text editor trees into portable section blocks
//! and back, and lays those blocks out on fixed-size pages the same way for a
//! live preview and for PDF export.
//!
//! ## Quick Start
//!
//! ```
//! use plandoc::{DocumentCodec, DocumentNode, Mark};
//!
//! let tree = DocumentNode::doc(vec![DocumentNode::paragraph(vec![
//!     DocumentNode::text("Revenue grows "),
//!     DocumentNode::marked_text("fast", vec![Mark::Bold]),
//! ])]);
//!
//! let codec = DocumentCodec::default();
//! let items = codec.encode(&tree);
//! assert_eq!(codec.decode(&items), tree);
//! ```
//!
//! ## Features
//!
//! - **Lossless codec**: marks, lists, headings, tables and images survive a
//!   round trip through portable blocks
//! - **Deterministic pagination**: one pure function shared by preview and
//!   export
//! - **Render adapters**: live preview with debounced refresh, PDF export
//!   with scoped per-page render contexts
//! - **Section sync**: empty sections are never submitted

pub mod codec;
pub mod error;
pub mod model;
pub mod paginate;
pub mod render;
pub mod store;
pub mod sync;

#[cfg(feature = "ffi")]
pub mod ffi;

// Re-export commonly used types
pub use codec::{CodecOptions, DocumentCodec, MarkDecoder, UnmatchedMarkers};
pub use error::{Error, Result};
pub use model::{
    Block, DocumentNode, DocumentSection, ImageAttrs, ImageResource, Mark, Page, PageLayoutItem,
    PageSize, PlanDocument, PortableContentItem, SectionSubmission, SubmissionMeta, TextRun,
};
pub use paginate::{
    paginate, BreakPolicy, EstimatingMeasurer, HeightMap, HeightMeasurer, PaginationOptions,
    Paginator,
};
pub use render::{ExportOptions, ExportPipeline, JsonFormat, LivePreview, PreviewOptions};
pub use store::{ContentChange, ContentStore, SectionSchema, SectionSchemaProvider};
pub use sync::{ImageUploader, SectionSync, SectionTransport};

/// Encode an editor tree into portable items with default options.
///
/// # Example
///
/// ```
/// use plandoc::{encode, DocumentNode, PortableContentItem};
///
/// let tree = DocumentNode::doc(vec![DocumentNode::paragraph_text("Hello")]);
/// assert_eq!(encode(&tree), vec![PortableContentItem::text("Hello")]);
/// ```
pub fn encode(tree: &DocumentNode) -> Vec<PortableContentItem> {
    DocumentCodec::default().encode(tree)
}

/// Decode portable items into an editor tree with default options.
pub fn decode(items: &[PortableContentItem]) -> DocumentNode {
    DocumentCodec::default().decode(items)
}

/// Encode an editor tree given as JSON; returns the items as JSON.
pub fn encode_json(tree_json: &str, format: JsonFormat) -> Result<String> {
    let tree: DocumentNode = serde_json::from_str(tree_json)?;
    render::to_json(&encode(&tree), format)
}

/// Decode portable items given as JSON; returns the tree as JSON.
pub fn decode_json(items_json: &str, format: JsonFormat) -> Result<String> {
    let items: Vec<PortableContentItem> = serde_json::from_str(items_json)?;
    render::to_json(&decode(&items), format)
}

/// Builder-style API tying the codec and the pagination engine together.
///
/// # Example
///
/// ```
/// use plandoc::{DocumentCodec, DocumentNode, PaginationOptions, Plandoc};
///
/// let plandoc = Plandoc::new().with_pagination(PaginationOptions::uniform(900.0));
/// let tree = DocumentNode::doc(vec![DocumentNode::paragraph_text("Hello")]);
/// let doc = plandoc.document("Plan", vec![("intro", "Intro", &tree)]);
/// let pages = plandoc.estimate_pages(&doc)?;
/// assert_eq!(pages.len(), 1);
/// # Ok::<(), plandoc::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Plandoc {
    codec_options: CodecOptions,
    pagination: PaginationOptions,
}

impl Plandoc {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set codec options.
    pub fn with_codec_options(mut self, options: CodecOptions) -> Self {
        self.codec_options = options;
        self
    }

    /// Keep unmatched inline markers open to the end of the line.
    pub fn legacy_markers(mut self) -> Self {
        self.codec_options = self.codec_options.legacy_markers();
        self
    }

    /// Set pagination options.
    pub fn with_pagination(mut self, options: PaginationOptions) -> Self {
        self.pagination = options;
        self
    }

    /// Set the forced page break policy.
    pub fn with_break_policy(mut self, policy: BreakPolicy) -> Self {
        self.pagination = self.pagination.with_break_policy(policy);
        self
    }

    /// Build the configured codec.
    pub fn codec(&self) -> DocumentCodec {
        DocumentCodec::new(self.codec_options.clone())
    }

    /// Get the pagination options.
    pub fn pagination(&self) -> &PaginationOptions {
        &self.pagination
    }

    /// Encode `(id, title, tree)` triples into a paginated document.
    ///
    /// Blank items are dropped, so sections without content take no space.
    pub fn document<'a, I, S>(&self, title: &str, sections: I) -> PlanDocument
    where
        I: IntoIterator<Item = (S, S, &'a DocumentNode)>,
        S: Into<String>,
    {
        let codec = self.codec();
        let mut doc = PlanDocument::new(title);
        for (id, section_title, tree) in sections {
            let items = codec
                .encode(tree)
                .into_iter()
                .filter(|item| !item.is_blank())
                .collect();
            doc.add_section(DocumentSection::new(id, section_title, items));
        }
        doc
    }

    /// Build a save payload for one section, or `None` if it is empty.
    pub fn submission(
        &self,
        section_id: &str,
        title: &str,
        tree: &DocumentNode,
        checks: Vec<bool>,
        meta: SubmissionMeta,
    ) -> Option<SectionSubmission> {
        let block = self.codec().encode_block(title, tree);
        SectionSubmission::prepare(section_id, checks, meta, std::slice::from_ref(&block))
    }

    /// Measure a document with `measurer` and paginate it.
    pub fn pages<M: HeightMeasurer>(&self, doc: &PlanDocument, measurer: &mut M) -> Result<Vec<Page>> {
        let heights = paginate::measure_document(doc, measurer)?;
        heights.validate(doc)?;
        Ok(paginate(&heights, &self.pagination))
    }

    /// Paginate with estimated heights, without a renderer.
    pub fn estimate_pages(&self, doc: &PlanDocument) -> Result<Vec<Page>> {
        self.pages(doc, &mut EstimatingMeasurer::new())
    }
}
