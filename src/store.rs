//! In-memory content store.
//!
//! The store owns one editor tree per section plus its checklist state. It is
//! changed only through [`ContentStore::apply_change`] and read by value via
//! [`ContentStore::snapshot`], so the renderers never see a live tree.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::codec::DocumentCodec;
use crate::error::{Error, Result};
use crate::model::{DocumentNode, DocumentSection, PlanDocument};

/// Static description of one plan section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSchema {
    /// Section identifier
    pub id: String,

    /// Display title, also used as the block title on save
    pub title: String,

    /// Checklist prompts, in display order
    #[serde(default)]
    pub checklist: Vec<String>,
}

impl SectionSchema {
    /// Create a section schema without a checklist.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            checklist: Vec::new(),
        }
    }

    /// Set the checklist prompts.
    pub fn with_checklist(mut self, checklist: Vec<String>) -> Self {
        self.checklist = checklist;
        self
    }
}

/// Supplies the ordered list of plan sections.
pub trait SectionSchemaProvider {
    /// All sections, in document order.
    fn sections(&self) -> &[SectionSchema];

    /// Look up a section by identifier.
    fn section(&self, id: &str) -> Option<&SectionSchema> {
        self.sections().iter().find(|s| s.id == id)
    }
}

impl SectionSchemaProvider for Vec<SectionSchema> {
    fn sections(&self) -> &[SectionSchema] {
        self
    }
}

impl SectionSchemaProvider for [SectionSchema] {
    fn sections(&self) -> &[SectionSchema] {
        self
    }
}

/// An edit coming from the editing surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ContentChange {
    /// Replace the whole tree of a section.
    #[serde(rename_all = "camelCase")]
    ReplaceTree {
        section_id: String,
        tree: DocumentNode,
    },

    /// Tick or untick one checklist entry.
    #[serde(rename_all = "camelCase")]
    SetCheck {
        section_id: String,
        index: usize,
        checked: bool,
    },

    /// Drop a section's content and checklist state.
    #[serde(rename_all = "camelCase")]
    Clear { section_id: String },
}

impl ContentChange {
    /// Section the change applies to.
    pub fn section_id(&self) -> &str {
        match self {
            ContentChange::ReplaceTree { section_id, .. }
            | ContentChange::SetCheck { section_id, .. }
            | ContentChange::Clear { section_id } => section_id,
        }
    }
}

/// Largest checklist a section may carry.
pub const MAX_CHECKLIST_ITEMS: usize = 256;

/// Editor trees and checklist state, keyed by section.
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    trees: HashMap<String, DocumentNode>,
    checks: HashMap<String, Vec<bool>>,
    revision: u64,
}

impl ContentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an edit and return the new revision.
    pub fn apply_change(&mut self, change: ContentChange) -> Result<u64> {
        match change {
            ContentChange::ReplaceTree { section_id, tree } => {
                if !matches!(tree, DocumentNode::Doc { .. }) {
                    return Err(Error::InvalidDocument(format!(
                        "section '{}' root must be doc, got {}",
                        section_id,
                        tree.kind()
                    )));
                }
                self.trees.insert(section_id, tree);
            }
            ContentChange::SetCheck {
                section_id,
                index,
                checked,
            } => {
                if index >= MAX_CHECKLIST_ITEMS {
                    return Err(Error::InvalidDocument(format!(
                        "section '{}' check index {} out of range (max {})",
                        section_id, index, MAX_CHECKLIST_ITEMS
                    )));
                }
                let checks = self.checks.entry(section_id).or_default();
                if checks.len() <= index {
                    checks.resize(index + 1, false);
                }
                checks[index] = checked;
            }
            ContentChange::Clear { section_id } => {
                self.trees.remove(&section_id);
                self.checks.remove(&section_id);
            }
        }

        self.revision += 1;
        Ok(self.revision)
    }

    /// Revision counter, bumped on every applied change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Editor tree of a section, if one was ever set.
    pub fn tree(&self, section_id: &str) -> Option<&DocumentNode> {
        self.trees.get(section_id)
    }

    /// Checklist state of a section, padded or cut to `len` entries.
    pub fn checks(&self, section_id: &str, len: usize) -> Vec<bool> {
        let mut checks = self.checks.get(section_id).cloned().unwrap_or_default();
        checks.resize(len, false);
        checks
    }

    /// Build the paginated document for the sections in `schema`.
    ///
    /// Blank items are left out so a section with nothing written yet gets
    /// no header on the page.
    pub fn snapshot<P>(&self, title: &str, schema: &P, codec: &DocumentCodec) -> PlanDocument
    where
        P: SectionSchemaProvider + ?Sized,
    {
        let mut doc = PlanDocument::new(title);
        for section in schema.sections() {
            let items = match self.trees.get(&section.id) {
                Some(tree) => codec
                    .encode(tree)
                    .into_iter()
                    .filter(|item| !item.is_blank())
                    .collect(),
                None => Vec::new(),
            };
            doc.add_section(DocumentSection::new(&section.id, &section.title, items));
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PortableContentItem;

    fn schema() -> Vec<SectionSchema> {
        vec![
            SectionSchema::new("overview", "Overview")
                .with_checklist(vec!["Mission".into(), "Team".into()]),
            SectionSchema::new("market", "Market"),
        ]
    }

    #[test]
    fn test_apply_change_bumps_revision() {
        let mut store = ContentStore::new();
        let tree = DocumentNode::doc(vec![DocumentNode::paragraph_text("Hi")]);

        let rev = store
            .apply_change(ContentChange::ReplaceTree {
                section_id: "overview".into(),
                tree: tree.clone(),
            })
            .unwrap();
        assert_eq!(rev, 1);
        assert_eq!(store.tree("overview"), Some(&tree));

        store
            .apply_change(ContentChange::Clear {
                section_id: "overview".into(),
            })
            .unwrap();
        assert!(store.tree("overview").is_none());
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn test_rejects_non_doc_root() {
        let mut store = ContentStore::new();
        let result = store.apply_change(ContentChange::ReplaceTree {
            section_id: "overview".into(),
            tree: DocumentNode::paragraph_text("Hi"),
        });
        assert!(matches!(result, Err(Error::InvalidDocument(_))));
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_checks_padded() {
        let mut store = ContentStore::new();
        store
            .apply_change(ContentChange::SetCheck {
                section_id: "overview".into(),
                index: 1,
                checked: true,
            })
            .unwrap();

        assert_eq!(store.checks("overview", 3), vec![false, true, false]);
        assert_eq!(store.checks("market", 2), vec![false, false]);
    }

    #[test]
    fn test_rejects_out_of_range_check() {
        let mut store = ContentStore::new();
        let change: ContentChange = serde_json::from_str(
            r#"{"kind":"setCheck","sectionId":"overview","index":18446744073709551615,"checked":true}"#,
        )
        .unwrap();
        assert!(matches!(
            store.apply_change(change),
            Err(Error::InvalidDocument(_))
        ));

        let result = store.apply_change(ContentChange::SetCheck {
            section_id: "overview".into(),
            index: MAX_CHECKLIST_ITEMS,
            checked: true,
        });
        assert!(result.is_err());
        assert_eq!(store.revision(), 0);
        assert_eq!(store.checks("overview", 1), vec![false]);
    }

    #[test]
    fn test_snapshot_follows_schema_order() {
        let mut store = ContentStore::new();
        store
            .apply_change(ContentChange::ReplaceTree {
                section_id: "market".into(),
                tree: DocumentNode::doc(vec![DocumentNode::paragraph_text("Big")]),
            })
            .unwrap();

        let doc = store.snapshot("Plan", &schema(), &DocumentCodec::default());
        assert_eq!(doc.title, "Plan");
        assert_eq!(doc.section_count(), 2);
        assert_eq!(doc.sections[0].id, "overview");
        assert!(doc.sections[0].items.is_empty());
        assert_eq!(doc.sections[1].items, vec![PortableContentItem::text("Big")]);
    }

    #[test]
    fn test_change_json_shape() {
        let change: ContentChange = serde_json::from_str(
            r#"{"kind":"setCheck","sectionId":"overview","index":0,"checked":true}"#,
        )
        .unwrap();
        assert_eq!(change.section_id(), "overview");
    }
}
