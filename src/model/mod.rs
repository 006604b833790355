//! Data model shared by the codec, the pagination engine and the renderers.
//!
//! Two representations of section content live here: the editor tree
//! ([`DocumentNode`]) owned by an editing surface, and the portable wire form
//! ([`PortableContentItem`], [`Block`]) that crosses component boundaries by
//! value.

mod document;
mod node;
mod page;
mod portable;
mod resource;
mod submission;

pub use document::{DocumentSection, PlanDocument};
pub use node::{
    same_mark_set, ColorAttrs, DocumentNode, HeadingAttrs, ImageAttrs, Mark, OrderedListAttrs,
    TextRun,
};
pub use page::{Page, PageLayoutItem, PageSize};
pub use portable::{Block, PortableContentItem};
pub use resource::ImageResource;
pub use submission::{SectionSubmission, SubmissionMeta};
