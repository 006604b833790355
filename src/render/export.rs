//! Export pipeline: measured, paginated, rasterized PDF output.
//!
//! Measurement happens in one isolated context. Every page is then rendered
//! in a fresh context of its own, one page at a time, so tearing down page N
//! never overlaps with setting up page N+1 and pages come out in order. Any
//! failure aborts the export with a single error; no partial PDF is produced.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::codec::DocumentCodec;
use crate::error::Result;
use crate::model::{ImageResource, Page, PageSize, PlanDocument};
use crate::paginate::{measure_document, HeightMap, PaginationOptions, Paginator};

use super::context::{ContextMeasurer, RenderContext, RenderContextFactory, ScopedContext};
use super::html::{page_element_id, HtmlRenderer};
use super::images::{ImageFetcher, ImageInliner};
use super::pdf::PdfAssembler;
use super::result::{ExportResult, ExportStats};

/// Options for the export pipeline.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Layout parameters
    pub pagination: PaginationOptions,

    /// Physical page size of the PDF
    pub page_size: PageSize,

    /// Maximum wait for a measurement element
    pub layout_timeout: Duration,

    /// Rasterization scale (device pixels per CSS pixel)
    pub raster_scale: f32,
}

impl ExportOptions {
    /// Create export options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pagination options.
    pub fn with_pagination(mut self, pagination: PaginationOptions) -> Self {
        self.pagination = pagination;
        self
    }

    /// Set the page size.
    pub fn with_page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the layout timeout.
    pub fn with_layout_timeout(mut self, timeout: Duration) -> Self {
        self.layout_timeout = timeout;
        self
    }

    /// Set the rasterization scale.
    pub fn with_raster_scale(mut self, scale: f32) -> Self {
        self.raster_scale = scale.max(0.1);
        self
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            pagination: PaginationOptions::a4(),
            page_size: PageSize::a4(),
            layout_timeout: Duration::from_secs(5),
            raster_scale: 2.0,
        }
    }
}

/// Renders a plan into a paginated PDF.
pub struct ExportPipeline<F, I>
where
    F: RenderContextFactory,
    I: ImageFetcher,
{
    factory: F,
    inliner: ImageInliner<I>,
    renderer: HtmlRenderer,
    options: ExportOptions,
}

impl<F, I> ExportPipeline<F, I>
where
    F: RenderContextFactory,
    I: ImageFetcher,
{
    /// Create a pipeline over a context factory and an image fetcher.
    pub fn new(factory: F, fetcher: I, options: ExportOptions) -> Self {
        Self {
            factory,
            inliner: ImageInliner::new(fetcher),
            renderer: HtmlRenderer::new(options.page_size),
            options,
        }
    }

    /// Use a specific codec for decoding text items.
    pub fn with_codec(mut self, codec: DocumentCodec) -> Self {
        self.renderer = self.renderer.with_codec(codec);
        self
    }

    /// Get the export options.
    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Export a plan to PDF bytes.
    pub fn export(&mut self, doc: &PlanDocument) -> Result<ExportResult> {
        log::info!(
            "exporting '{}': {} section(s), {} item(s)",
            doc.title,
            doc.section_count(),
            doc.item_count()
        );
        self.inliner.clear();

        let heights = self.measure(doc)?;
        heights.validate(doc)?;

        let pages = Paginator::new(self.options.pagination.clone()).paginate(heights.sections());

        let mut rasters = Vec::with_capacity(pages.len());
        for page in &pages {
            rasters.push(self.render_page(doc, page)?);
        }

        let pdf = PdfAssembler::new(self.options.page_size).assemble(&rasters)?;

        let mut stats = ExportStats::new();
        stats.section_count = doc.section_count() as u32;
        stats.count_pages(&pages, self.options.pagination.page_budget);
        stats.fallback_images = self.inliner.fallback_count() as u32;
        stats.inlined_images = (self.inliner.resolved_count() - self.inliner.fallback_count()) as u32;
        stats.pdf_bytes = pdf.len() as u64;

        log::info!(
            "exported {} page(s), {} bytes, {} image fallback(s)",
            stats.page_count,
            stats.pdf_bytes,
            stats.fallback_images
        );

        Ok(ExportResult {
            pdf,
            pages,
            heights,
            stats,
        })
    }

    /// Export a plan and write the PDF to `path`.
    ///
    /// The file is only written once the whole export has succeeded.
    pub fn export_to_file(&mut self, doc: &PlanDocument, path: impl AsRef<Path>) -> Result<ExportResult> {
        let result = self.export(doc)?;
        result.write_to(path)?;
        Ok(result)
    }

    /// Measure all items in an isolated context.
    pub fn measure(&mut self, doc: &PlanDocument) -> Result<HeightMap> {
        self.renderer.set_images(HashMap::new());

        let mut ctx = ScopedContext::acquire(&mut self.factory)?;
        let heights = {
            let mut measurer =
                ContextMeasurer::new(&mut *ctx, &self.renderer, self.options.layout_timeout);
            measure_document(doc, &mut measurer)?
        };
        ctx.finish()?;
        Ok(heights)
    }

    /// Render and rasterize one page in its own context.
    fn render_page(&mut self, doc: &PlanDocument, page: &Page) -> Result<ImageResource> {
        let images = self.inliner.inline_page(doc, page);
        self.renderer.set_images(images);
        let html = self.renderer.page_document(doc, page);

        let mut ctx = ScopedContext::acquire(&mut self.factory)?;
        ctx.load_html(&html)?;
        let raster = ctx.rasterize(&page_element_id(page.number), self.options.raster_scale)?;
        ctx.finish()?;

        log::debug!("rasterized page {} ({} bytes)", page.number, raster.size());
        Ok(raster)
    }
}
