//! Section save and restore.
//!
//! [`SectionSync`] turns the store's editor tree into a filtered
//! [`SectionSubmission`] and hands it to a [`SectionTransport`]. Loading goes
//! the other way. The transport is called once per request: retry policy
//! belongs to whoever implements it.

use std::collections::BTreeSet;
use std::time::Instant;

use crate::codec::DocumentCodec;
use crate::error::{Error, Result};
use crate::model::{Block, DocumentNode, ImageAttrs, SectionSubmission, SubmissionMeta};
use crate::render::Debouncer;
use crate::store::{ContentChange, ContentStore, SectionSchemaProvider};

/// Persists section submissions.
pub trait SectionTransport {
    /// Store a submission.
    fn save(&mut self, submission: &SectionSubmission) -> Result<()>;

    /// Load the saved blocks of a section; `None` if it was never saved.
    fn load(&mut self, section_id: &str) -> Result<Option<Vec<Block>>>;
}

/// Uploads image blobs and returns a public URL.
pub trait ImageUploader {
    /// Upload `bytes` under a suggested file name.
    fn upload(&mut self, file_name: &str, bytes: &[u8]) -> Result<String>;
}

/// Upload an image and build the editor node that points at it.
///
/// The returned URL is used as `src` unchanged.
pub fn upload_image<U: ImageUploader + ?Sized>(
    uploader: &mut U,
    file_name: &str,
    bytes: &[u8],
) -> Result<DocumentNode> {
    let src = uploader.upload(file_name, bytes).map_err(into_transport)?;
    log::debug!("uploaded '{}' ({} bytes) to {}", file_name, bytes.len(), src);
    Ok(DocumentNode::Image {
        attrs: ImageAttrs::new(src).with_alt(file_name),
    })
}

fn into_transport(err: Error) -> Error {
    match err {
        Error::Transport(_) => err,
        other => Error::Transport(other.to_string()),
    }
}

/// Saves and restores sections between a [`ContentStore`] and a transport.
pub struct SectionSync<P: SectionSchemaProvider, T: SectionTransport> {
    codec: DocumentCodec,
    schema: P,
    transport: T,
    author: String,
    debouncer: Debouncer,
    dirty: BTreeSet<String>,
}

impl<P: SectionSchemaProvider, T: SectionTransport> SectionSync<P, T> {
    /// Create a sync over a schema and a transport.
    pub fn new(schema: P, transport: T, author: impl Into<String>) -> Self {
        Self {
            codec: DocumentCodec::default(),
            schema,
            transport,
            author: author.into(),
            debouncer: Debouncer::new(std::time::Duration::from_millis(1000)),
            dirty: BTreeSet::new(),
        }
    }

    /// Use a specific codec.
    pub fn with_codec(mut self, codec: DocumentCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Use a specific save debouncer.
    pub fn with_debouncer(mut self, debouncer: Debouncer) -> Self {
        self.debouncer = debouncer;
        self
    }

    /// Get the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get the schema provider.
    pub fn schema(&self) -> &P {
        &self.schema
    }

    /// Build the submission for a section without sending it.
    ///
    /// Returns `None` when the section has nothing worth saving.
    pub fn submission(&self, store: &ContentStore, section_id: &str) -> Result<Option<SectionSubmission>> {
        let section = self
            .schema
            .section(section_id)
            .ok_or_else(|| Error::UnknownSection(section_id.to_string()))?;

        let tree = store
            .tree(section_id)
            .cloned()
            .unwrap_or_else(DocumentNode::empty_doc);
        let block = self.codec.encode_block(&section.title, &tree);

        Ok(SectionSubmission::prepare(
            section_id,
            store.checks(section_id, section.checklist.len()),
            SubmissionMeta::today(&self.author),
            std::slice::from_ref(&block),
        ))
    }

    /// Save a section; returns the submission that was sent, if any.
    pub fn save(&mut self, store: &ContentStore, section_id: &str) -> Result<Option<SectionSubmission>> {
        let Some(submission) = self.submission(store, section_id)? else {
            log::debug!("section '{}' is empty, nothing to save", section_id);
            self.dirty.remove(section_id);
            return Ok(None);
        };

        self.transport.save(&submission).map_err(into_transport)?;
        self.dirty.remove(section_id);
        log::debug!(
            "saved section '{}' ({} item(s))",
            section_id,
            submission.item_count()
        );
        Ok(Some(submission))
    }

    /// Load a section from the transport into the store.
    ///
    /// Returns `false` when the section was never saved; the store is left
    /// untouched in that case.
    pub fn restore(&mut self, store: &mut ContentStore, section_id: &str) -> Result<bool> {
        if self.schema.section(section_id).is_none() {
            return Err(Error::UnknownSection(section_id.to_string()));
        }

        let Some(blocks) = self.transport.load(section_id).map_err(into_transport)? else {
            return Ok(false);
        };

        let items: Vec<_> = blocks.into_iter().flat_map(|b| b.content).collect();
        let tree = self.codec.decode(&items);
        store.apply_change(ContentChange::ReplaceTree {
            section_id: section_id.to_string(),
            tree,
        })?;
        self.dirty.remove(section_id);
        Ok(true)
    }

    /// Record an edit to a section; the save happens after the quiet period.
    pub fn mark_dirty(&mut self, section_id: &str, now: Instant) {
        self.dirty.insert(section_id.to_string());
        self.debouncer.schedule(now);
    }

    /// Sections edited since their last save.
    pub fn dirty_sections(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    /// Save every dirty section if the quiet period has elapsed.
    ///
    /// Returns the ids of sections that were saved. A failing section stays
    /// dirty and its error is returned after the others were tried.
    pub fn flush_due(&mut self, store: &ContentStore, now: Instant) -> Result<Vec<String>> {
        if self.debouncer.poll(now).is_none() {
            return Ok(Vec::new());
        }
        self.flush(store)
    }

    /// Save every dirty section now.
    pub fn flush(&mut self, store: &ContentStore) -> Result<Vec<String>> {
        self.debouncer.cancel();

        let pending: Vec<String> = self.dirty.iter().cloned().collect();
        let mut saved = Vec::new();
        let mut first_error = None;

        for section_id in pending {
            match self.save(store, &section_id) {
                Ok(Some(_)) => saved.push(section_id),
                Ok(None) => {}
                Err(e) => {
                    log::warn!("saving section '{}' failed: {}", section_id, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(saved),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PortableContentItem;
    use crate::store::SectionSchema;
    use std::collections::HashMap;
    use std::time::Duration;

    #[derive(Default)]
    struct MemoryTransport {
        saved: HashMap<String, SectionSubmission>,
        calls: usize,
        fail: bool,
    }

    impl SectionTransport for MemoryTransport {
        fn save(&mut self, submission: &SectionSubmission) -> Result<()> {
            self.calls += 1;
            if self.fail {
                return Err(Error::Other("503".into()));
            }
            self.saved
                .insert(submission.section_id.clone(), submission.clone());
            Ok(())
        }

        fn load(&mut self, section_id: &str) -> Result<Option<Vec<Block>>> {
            Ok(self.saved.get(section_id).map(|s| s.blocks.clone()))
        }
    }

    fn sync() -> SectionSync<Vec<SectionSchema>, MemoryTransport> {
        let schema = vec![SectionSchema::new("overview", "Overview")
            .with_checklist(vec!["Mission".into()])];
        SectionSync::new(schema, MemoryTransport::default(), "Kim")
    }

    fn store_with(text: &str) -> ContentStore {
        let mut store = ContentStore::new();
        store
            .apply_change(ContentChange::ReplaceTree {
                section_id: "overview".into(),
                tree: DocumentNode::doc(vec![DocumentNode::paragraph_text(text)]),
            })
            .unwrap();
        store
    }

    #[test]
    fn test_save_and_restore() {
        let mut sync = sync();
        let store = store_with("We sell tea.");

        let sent = sync.save(&store, "overview").unwrap().unwrap();
        assert_eq!(sent.checks, vec![false]);
        assert_eq!(sent.blocks[0].title, "Overview");
        assert_eq!(
            sent.blocks[0].content,
            vec![PortableContentItem::text("We sell tea.")]
        );

        let mut fresh = ContentStore::new();
        assert!(sync.restore(&mut fresh, "overview").unwrap());
        assert_eq!(fresh.tree("overview").unwrap().plain_text(), "We sell tea.");
    }

    #[test]
    fn test_whitespace_section_not_sent() {
        let mut sync = sync();
        let store = store_with("   ");
        assert!(sync.save(&store, "overview").unwrap().is_none());
        assert_eq!(sync.transport().calls, 0);
    }

    #[test]
    fn test_transport_failure_not_retried() {
        let mut sync = sync();
        sync.transport.fail = true;
        let store = store_with("x");

        let err = sync.save(&store, "overview").unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(sync.transport().calls, 1);
    }

    #[test]
    fn test_unknown_section() {
        let mut sync = sync();
        let err = sync.save(&ContentStore::new(), "nope").unwrap_err();
        assert!(matches!(err, Error::UnknownSection(_)));
    }

    #[test]
    fn test_debounced_flush() {
        let start = Instant::now();
        let mut sync = sync().with_debouncer(Debouncer::new(Duration::from_millis(500)));
        let store = store_with("x");

        sync.mark_dirty("overview", start);
        sync.mark_dirty("overview", start + Duration::from_millis(300));
        assert!(sync
            .flush_due(&store, start + Duration::from_millis(600))
            .unwrap()
            .is_empty());

        let saved = sync
            .flush_due(&store, start + Duration::from_millis(800))
            .unwrap();
        assert_eq!(saved, vec!["overview".to_string()]);
        assert_eq!(sync.dirty_sections().count(), 0);
        assert_eq!(sync.transport().calls, 1);
    }

    #[test]
    fn test_upload_image_keeps_url() {
        struct Cdn;
        impl ImageUploader for Cdn {
            fn upload(&mut self, file_name: &str, _bytes: &[u8]) -> Result<String> {
                Ok(format!("https://cdn.example/{}", file_name))
            }
        }

        let node = upload_image(&mut Cdn, "chart.png", &[1, 2]).unwrap();
        match node {
            DocumentNode::Image { attrs } => assert_eq!(attrs.src, "https://cdn.example/chart.png"),
            other => panic!("expected image, got {}", other.kind()),
        }
    }
}
