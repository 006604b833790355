//! Rendering adapters.
//!
//! Both adapters run the same pagination pass and differ only in how they
//! measure and where the pages go:
//!
//! - [`LivePreview`] measures in a long-lived hidden context and hands all
//!   pages to a [`PreviewSink`].
//! - [`ExportPipeline`] measures in an isolated context, then renders every
//!   page in a fresh context of its own and assembles the rasters into a PDF.

pub mod context;
mod export;
pub mod html;
pub mod images;
mod json;
mod pdf;
mod preview;
mod result;

pub use context::{ContextMeasurer, RenderContext, RenderContextFactory, ScopedContext};
pub use export::{ExportOptions, ExportPipeline};
pub use html::{escape_html, page_element_id, HtmlRenderer};
pub use images::{cache_bust, ImageFetcher, ImageInliner, ImageSource};
pub use json::{to_json, JsonFormat};
pub use pdf::PdfAssembler;
pub use preview::{Debouncer, LivePreview, PreviewOptions, PreviewSink};
pub use result::{ExportResult, ExportStats};

#[cfg(feature = "async")]
pub use preview::DebouncedPreview;
