//! Document model codec.
//!
//! Converts between the editor tree ([`DocumentNode`](crate::DocumentNode))
//! and portable items ([`PortableContentItem`](crate::PortableContentItem)).
//!
//! - [`mark`]: inline marks to delimiter/span text and back
//! - [`inline`]: splitting encoded text at inline image tokens
//! - [`table`]: table nodes to columns/rows and back
//! - [`document`]: whole-tree encoding with grouping and flushing
//!
//! The round trip preserves marks and structure for the supported node and
//! mark set. Delimiter spacing, highlight colours and the display size of
//! images inside table cells are not preserved. Paragraph lines that would
//! read as a list item or heading are written with a leading `\`.

pub mod document;
pub mod inline;
pub mod mark;
mod options;
pub mod table;

pub use document::DocumentCodec;
pub use inline::split_by_images;
pub use mark::{decode_line, encode_run, encode_runs, MarkDecoder};
pub use options::{CodecOptions, UnmatchedMarkers};
pub use table::{build_table, cell_images, cell_nodes, extract_table, TableContent};
