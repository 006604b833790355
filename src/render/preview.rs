//! Live preview adapter.
//!
//! The preview keeps one long-lived hidden context for measurement and hands
//! rendered pages to a [`PreviewSink`]. When a refresh fails the sink keeps
//! showing the last good pages.

use std::time::{Duration, Instant};

use crate::codec::DocumentCodec;
use crate::error::Result;
use crate::model::{Page, PageSize, PlanDocument};
use crate::paginate::{measure_document, HeightMap, PaginationOptions, Paginator};

use super::context::{ContextMeasurer, RenderContext};
use super::html::HtmlRenderer;

/// Receives rendered preview pages.
pub trait PreviewSink {
    /// Show pages; `html` holds all of them as fixed-size containers.
    fn show_pages(&mut self, html: &str, pages: &[Page]) -> Result<()>;
}

/// Options for the live preview.
#[derive(Debug, Clone)]
pub struct PreviewOptions {
    /// Layout parameters, shared with export
    pub pagination: PaginationOptions,

    /// Page size of the preview containers
    pub page_size: PageSize,

    /// Maximum wait for a measurement element
    pub layout_timeout: Duration,

    /// Quiet period before a change triggers a refresh
    pub debounce: Duration,
}

impl PreviewOptions {
    /// Create preview options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pagination options.
    pub fn with_pagination(mut self, pagination: PaginationOptions) -> Self {
        self.pagination = pagination;
        self
    }

    /// Set the layout timeout.
    pub fn with_layout_timeout(mut self, timeout: Duration) -> Self {
        self.layout_timeout = timeout;
        self
    }

    /// Set the debounce delay.
    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce = delay;
        self
    }
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            pagination: PaginationOptions::a4(),
            page_size: PageSize::a4(),
            layout_timeout: Duration::from_secs(2),
            debounce: Duration::from_millis(300),
        }
    }
}

/// Paginated on-screen preview.
pub struct LivePreview<C: RenderContext, S: PreviewSink> {
    context: C,
    sink: S,
    renderer: HtmlRenderer,
    options: PreviewOptions,
    pages: Vec<Page>,
    heights: HeightMap,
}

impl<C: RenderContext, S: PreviewSink> LivePreview<C, S> {
    /// Create a preview over a hidden measurement context and a sink.
    pub fn new(context: C, sink: S, options: PreviewOptions) -> Self {
        Self {
            context,
            sink,
            renderer: HtmlRenderer::new(options.page_size),
            options,
            pages: Vec::new(),
            heights: HeightMap::default(),
        }
    }

    /// Use a specific codec for decoding text items.
    pub fn with_codec(mut self, codec: DocumentCodec) -> Self {
        self.renderer = self.renderer.with_codec(codec);
        self
    }

    /// Measure, paginate and show a document.
    ///
    /// On failure the previous pages stay current and the error is returned.
    pub fn refresh(&mut self, doc: &PlanDocument) -> Result<&[Page]> {
        match self.try_refresh(doc) {
            Ok((pages, heights)) => {
                self.pages = pages;
                self.heights = heights;
                Ok(&self.pages)
            }
            Err(e) => {
                log::warn!(
                    "preview refresh failed, keeping {} page(s): {}",
                    self.pages.len(),
                    e
                );
                Err(e)
            }
        }
    }

    fn try_refresh(&mut self, doc: &PlanDocument) -> Result<(Vec<Page>, HeightMap)> {
        let heights = {
            let mut measurer =
                ContextMeasurer::new(&mut self.context, &self.renderer, self.options.layout_timeout);
            measure_document(doc, &mut measurer)?
        };
        heights.validate(doc)?;

        let pages = Paginator::new(self.options.pagination.clone()).paginate(heights.sections());
        let html = self.renderer.pages_document(doc, &pages);
        self.sink.show_pages(&html, &pages)?;
        Ok((pages, heights))
    }

    /// Pages currently shown.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Heights behind the current pages.
    pub fn heights(&self) -> &HeightMap {
        &self.heights
    }

    /// Get the preview options.
    pub fn options(&self) -> &PreviewOptions {
        &self.options
    }

    /// Get the sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Tear down the measurement context and return the sink.
    pub fn close(mut self) -> Result<S> {
        self.context.teardown()?;
        Ok(self.sink)
    }
}

/// Coalesces rapid changes so only the last one triggers work.
///
/// Every [`schedule`](Debouncer::schedule) cancels the pending deadline and
/// starts a new one.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: u64,
    deadline: Option<Instant>,
}

impl Debouncer {
    /// Create a debouncer with the given quiet period.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            deadline: None,
        }
    }

    /// Record a change at `now`; returns the generation of the new schedule.
    pub fn schedule(&mut self, now: Instant) -> u64 {
        self.generation += 1;
        self.deadline = Some(now + self.delay);
        self.generation
    }

    /// Drop any pending schedule.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Check if work is scheduled.
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Deadline of the pending schedule.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fire if the quiet period has elapsed, returning the generation that ran.
    pub fn poll(&mut self, now: Instant) -> Option<u64> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                Some(self.generation)
            }
            _ => None,
        }
    }
}

#[cfg(feature = "async")]
mod driver {
    use tokio::sync::mpsc;
    use tokio::time::{sleep_until, Instant};

    use super::{Debouncer, LivePreview, PreviewSink};
    use crate::model::PlanDocument;
    use crate::render::context::RenderContext;

    /// Drives a [`LivePreview`] from a stream of document snapshots.
    pub struct DebouncedPreview<C: RenderContext, S: PreviewSink> {
        preview: LivePreview<C, S>,
        debouncer: Debouncer,
        refreshes: u64,
    }

    impl<C: RenderContext, S: PreviewSink> DebouncedPreview<C, S> {
        /// Wrap a preview, using its configured debounce delay.
        pub fn new(preview: LivePreview<C, S>) -> Self {
            let delay = preview.options().debounce;
            Self {
                preview,
                debouncer: Debouncer::new(delay),
                refreshes: 0,
            }
        }

        /// Refresh after each quiet period until the sender is dropped.
        ///
        /// A snapshot still pending when the channel closes is rendered
        /// before returning.
        pub async fn run(mut self, mut changes: mpsc::Receiver<PlanDocument>) -> LivePreview<C, S> {
            let mut latest: Option<PlanDocument> = None;

            loop {
                let deadline = self.debouncer.deadline().map(Instant::from_std);
                tokio::select! {
                    change = changes.recv() => match change {
                        Some(doc) => {
                            latest = Some(doc);
                            self.debouncer.schedule(Instant::now().into_std());
                        }
                        None => break,
                    },
                    _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                        if self.debouncer.poll(Instant::now().into_std()).is_some() {
                            if let Some(doc) = latest.take() {
                                self.refresh(&doc);
                            }
                        }
                    }
                }
            }

            if let Some(doc) = latest.take() {
                self.debouncer.cancel();
                self.refresh(&doc);
            }
            log::debug!("preview driver stopped after {} refresh(es)", self.refreshes);
            self.preview
        }

        fn refresh(&mut self, doc: &PlanDocument) {
            self.refreshes += 1;
            // Failures are already logged and the last good pages stay up.
            let _ = self.preview.refresh(doc);
        }
    }
}

#[cfg(feature = "async")]
pub use driver::DebouncedPreview;
