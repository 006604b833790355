//! Integration tests for the export pipeline and the live preview.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Cursor;
use std::rc::Rc;
use std::time::Duration;

use image::{DynamicImage, ImageFormat, RgbImage};
use plandoc::error::{Error, Result};
use plandoc::render::{
    ExportOptions, ExportPipeline, LivePreview, PreviewOptions, PreviewSink, RenderContext,
    RenderContextFactory,
};
use plandoc::{DocumentSection, ImageResource, Page, PaginationOptions, PlanDocument, PortableContentItem};

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// What the mock contexts saw.
#[derive(Default)]
struct Journal {
    acquired: usize,
    teardowns: usize,
    loaded: Vec<String>,
    rasterized: Vec<String>,
}

/// Scripted behavior shared by every mock context.
#[derive(Default)]
struct Script {
    heights: HashMap<String, f32>,
    missing: Option<String>,
    failing_raster: Option<String>,
}

struct MockContext {
    journal: Rc<RefCell<Journal>>,
    script: Rc<Script>,
}

impl RenderContext for MockContext {
    fn load_html(&mut self, html: &str) -> Result<()> {
        self.journal.borrow_mut().loaded.push(html.to_string());
        Ok(())
    }

    fn measure_element(&mut self, element_id: &str, timeout: Duration) -> Result<f32> {
        if self.script.missing.as_deref() == Some(element_id) {
            return Err(Error::LayoutTimeout {
                element: element_id.to_string(),
                waited_ms: timeout.as_millis() as u64,
            });
        }
        Ok(self.script.heights.get(element_id).copied().unwrap_or(200.0))
    }

    fn rasterize(&mut self, element_id: &str, _scale: f32) -> Result<ImageResource> {
        if self.script.failing_raster.as_deref() == Some(element_id) {
            return Err(Error::Render(format!("cannot rasterize {}", element_id)));
        }
        self.journal
            .borrow_mut()
            .rasterized
            .push(element_id.to_string());
        Ok(ImageResource::new(png(8, 11), "image/png"))
    }

    fn teardown(&mut self) -> Result<()> {
        self.journal.borrow_mut().teardowns += 1;
        Ok(())
    }
}

struct MockFactory {
    journal: Rc<RefCell<Journal>>,
    script: Rc<Script>,
}

impl MockFactory {
    fn new(script: Script) -> (Self, Rc<RefCell<Journal>>) {
        let journal = Rc::new(RefCell::new(Journal::default()));
        let factory = Self {
            journal: journal.clone(),
            script: Rc::new(script),
        };
        (factory, journal)
    }

    fn context(&self) -> MockContext {
        MockContext {
            journal: self.journal.clone(),
            script: self.script.clone(),
        }
    }
}

impl RenderContextFactory for MockFactory {
    type Context = MockContext;

    fn acquire(&mut self) -> Result<MockContext> {
        self.journal.borrow_mut().acquired += 1;
        Ok(self.context())
    }
}

fn offline(_src: &str) -> Result<Vec<u8>> {
    Err(Error::ImageResource("offline".into()))
}

fn plan() -> PlanDocument {
    let mut doc = PlanDocument::new("Tea Shop");
    doc.add_section(DocumentSection::new(
        "overview",
        "Overview",
        vec![
            PortableContentItem::text("We sell **tea**."),
            PortableContentItem::text("Second paragraph."),
        ],
    ));
    doc.add_section(DocumentSection::new(
        "market",
        "Market",
        vec![PortableContentItem::text("Big market.")],
    ));
    doc
}

fn tall_heights() -> HashMap<String, f32> {
    [("item-0-0", 700.0), ("item-0-1", 700.0), ("item-1-0", 700.0)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[test]
fn test_export_one_pdf_page_per_layout_page() {
    let (factory, journal) = MockFactory::new(Script {
        heights: tall_heights(),
        ..Default::default()
    });
    let mut pipeline = ExportPipeline::new(factory, offline, ExportOptions::default());

    let result = pipeline.export(&plan()).unwrap();

    assert_eq!(result.page_count(), 3);
    assert_eq!(result.stats.page_count, 3);
    assert_eq!(result.stats.item_count, 3);

    let pdf = lopdf::Document::load_mem(&result.pdf).unwrap();
    assert_eq!(pdf.get_pages().len(), 3);

    let journal = journal.borrow();
    assert_eq!(journal.acquired, 4);
    assert_eq!(journal.teardowns, 4);
    assert_eq!(journal.rasterized, vec!["page-1", "page-2", "page-3"]);
    assert!(journal.loaded[0].contains("id=\"item-1-0\""));
}

#[test]
fn test_layout_timeout_aborts_without_output() {
    let (factory, journal) = MockFactory::new(Script {
        missing: Some("item-1-0".into()),
        ..Default::default()
    });
    let mut pipeline = ExportPipeline::new(factory, offline, ExportOptions::default());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plan.pdf");
    let err = pipeline.export_to_file(&plan(), &path).unwrap_err();

    assert!(matches!(err, Error::LayoutTimeout { ref element, .. } if element == "item-1-0"));
    assert!(!path.exists());

    let journal = journal.borrow();
    assert_eq!(journal.acquired, 1);
    assert_eq!(journal.teardowns, 1);
    assert!(journal.rasterized.is_empty());
}

#[test]
fn test_raster_failure_tears_down_every_context() {
    let (factory, journal) = MockFactory::new(Script {
        heights: tall_heights(),
        failing_raster: Some("page-2".into()),
        ..Default::default()
    });
    let mut pipeline = ExportPipeline::new(factory, offline, ExportOptions::default());

    let err = pipeline.export(&plan()).unwrap_err();
    assert!(matches!(err, Error::Render(_)));

    let journal = journal.borrow();
    assert_eq!(journal.acquired, 3);
    assert_eq!(journal.teardowns, 3);
    assert_eq!(journal.rasterized, vec!["page-1"]);
}

#[test]
fn test_images_inlined_with_remote_fallback() {
    let (factory, journal) = MockFactory::new(Script::default());
    let fetcher = |src: &str| -> Result<Vec<u8>> {
        if src.ends_with("ok.png") {
            Ok(png(2, 2))
        } else {
            Err(Error::ImageResource(format!("404 for {}", src)))
        }
    };
    let mut pipeline = ExportPipeline::new(factory, fetcher, ExportOptions::default());

    let mut doc = PlanDocument::new("Plan");
    doc.add_section(DocumentSection::new(
        "brand",
        "Brand",
        vec![
            PortableContentItem::image("https://cdn.example/ok.png"),
            PortableContentItem::image("https://cdn.example/broken.png"),
        ],
    ));

    let result = pipeline.export(&doc).unwrap();
    assert_eq!(result.stats.inlined_images, 1);
    assert_eq!(result.stats.fallback_images, 1);
    assert!(!result.stats.fully_inlined());

    let journal = journal.borrow();
    let page_html = journal.loaded.last().unwrap();
    assert!(page_html.contains("src=\"data:image/png;base64,"));
    assert!(page_html.contains("https://cdn.example/broken.png?t="));
    assert!(page_html.contains("crossorigin=\"anonymous\""));

    let measure_html = &journal.loaded[0];
    assert!(!measure_html.contains("data:image"));
}

#[test]
fn test_export_pages_match_pagination() {
    let (factory, _journal) = MockFactory::new(Script {
        heights: tall_heights(),
        ..Default::default()
    });
    let options = ExportOptions::default();
    let mut pipeline = ExportPipeline::new(factory, offline, options.clone());

    let result = pipeline.export(&plan()).unwrap();
    assert_eq!(
        result.pages,
        plandoc::paginate(&result.heights, &options.pagination)
    );
}

/// Sink recording what the preview showed.
#[derive(Default)]
struct RecordingSink {
    shown: Vec<Vec<Page>>,
    last_html: String,
}

impl PreviewSink for RecordingSink {
    fn show_pages(&mut self, html: &str, pages: &[Page]) -> Result<()> {
        self.shown.push(pages.to_vec());
        self.last_html = html.to_string();
        Ok(())
    }
}

#[test]
fn test_preview_and_export_agree() {
    let (factory, _journal) = MockFactory::new(Script {
        heights: tall_heights(),
        ..Default::default()
    });
    let context = factory.context();
    let mut pipeline = ExportPipeline::new(factory, offline, ExportOptions::default());
    let mut preview = LivePreview::new(context, RecordingSink::default(), PreviewOptions::default());

    let doc = plan();
    let preview_pages = preview.refresh(&doc).unwrap().to_vec();
    let export = pipeline.export(&doc).unwrap();

    assert_eq!(preview_pages, export.pages);
    assert_eq!(preview.sink().shown.len(), 1);
    assert!(preview.sink().last_html.contains("id=\"page-3\""));
}

#[test]
fn test_preview_keeps_last_pages_on_failure() {
    let script = Script {
        missing: Some("item-1-1".into()),
        ..Default::default()
    };
    let (factory, journal) = MockFactory::new(script);
    let mut preview = LivePreview::new(
        factory.context(),
        RecordingSink::default(),
        PreviewOptions::default().with_pagination(PaginationOptions::uniform(900.0)),
    );

    let good = plan();
    let shown = preview.refresh(&good).unwrap().len();
    assert_eq!(shown, 1);

    let mut bad = plan();
    bad.sections[1]
        .items
        .push(PortableContentItem::text("never lays out"));
    let err = preview.refresh(&bad).unwrap_err();
    assert!(matches!(err, Error::LayoutTimeout { .. }));

    assert_eq!(preview.pages().len(), shown);
    assert_eq!(preview.sink().shown.len(), 1);

    let sink = preview.close().unwrap();
    assert_eq!(sink.shown.len(), 1);
    assert_eq!(journal.borrow().teardowns, 1);
}

#[cfg(feature = "async")]
mod debounced {
    use super::*;
    use plandoc::render::DebouncedPreview;
    use tokio::sync::mpsc;
    use tokio::time::sleep;

    fn titled(title: &str) -> PlanDocument {
        let mut doc = plan();
        doc.title = title.to_string();
        doc
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_refreshes_once() {
        let (factory, _journal) = MockFactory::new(Script::default());
        let preview = LivePreview::new(
            factory.context(),
            RecordingSink::default(),
            PreviewOptions::default().with_debounce(Duration::from_millis(300)),
        );

        let (tx, rx) = mpsc::channel(8);
        let (preview, ()) = tokio::join!(DebouncedPreview::new(preview).run(rx), async move {
            for title in ["a", "ab", "abc"] {
                tx.send(titled(title)).await.unwrap();
                sleep(Duration::from_millis(50)).await;
            }
        });

        assert_eq!(preview.sink().shown.len(), 1);
        assert!(preview.sink().last_html.contains("<h1>abc</h1>"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_period_triggers_refresh() {
        let (factory, _journal) = MockFactory::new(Script::default());
        let preview = LivePreview::new(
            factory.context(),
            RecordingSink::default(),
            PreviewOptions::default().with_debounce(Duration::from_millis(300)),
        );

        let (tx, rx) = mpsc::channel(8);
        let (preview, ()) = tokio::join!(DebouncedPreview::new(preview).run(rx), async move {
            tx.send(titled("first")).await.unwrap();
            sleep(Duration::from_millis(500)).await;
            tx.send(titled("second")).await.unwrap();
        });

        assert_eq!(preview.sink().shown.len(), 2);
        assert!(preview.sink().last_html.contains("<h1>second</h1>"));
    }
}
