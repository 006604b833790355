//! Section save payload.

use super::Block;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Payload sent to the backend when a section is saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSubmission {
    /// Section identifier from the schema
    pub section_id: String,

    /// Checklist state, in schema order
    pub checks: Vec<bool>,

    /// Authoring metadata
    pub meta: SubmissionMeta,

    /// Non-empty blocks
    pub blocks: Vec<Block>,
}

impl SectionSubmission {
    /// Build a submission, dropping blank text items and blocks left empty.
    ///
    /// Returns `None` when nothing remains, so empty sections are never sent.
    pub fn prepare(
        section_id: impl Into<String>,
        checks: Vec<bool>,
        meta: SubmissionMeta,
        blocks: &[Block],
    ) -> Option<Self> {
        let blocks: Vec<Block> = blocks
            .iter()
            .map(Block::without_blank_items)
            .filter(|b| !b.content.is_empty())
            .collect();

        if blocks.is_empty() {
            return None;
        }

        Some(Self {
            section_id: section_id.into(),
            checks,
            meta,
            blocks,
        })
    }

    /// Total number of content items across blocks.
    pub fn item_count(&self) -> usize {
        self.blocks.iter().map(|b| b.content.len()).sum()
    }
}

/// Author and creation date of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMeta {
    /// Author display name
    pub author: String,

    /// Creation date, serialized as `YYYY-MM-DD`
    pub created_at: NaiveDate,
}

impl SubmissionMeta {
    /// Create metadata with an explicit date.
    pub fn new(author: impl Into<String>, created_at: NaiveDate) -> Self {
        Self {
            author: author.into(),
            created_at,
        }
    }

    /// Create metadata dated today (UTC).
    pub fn today(author: impl Into<String>) -> Self {
        Self::new(author, Utc::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PortableContentItem;

    fn meta() -> SubmissionMeta {
        SubmissionMeta::new("Kim", NaiveDate::from_ymd_opt(2024, 3, 9).unwrap())
    }

    #[test]
    fn test_wire_shape() {
        let blocks = vec![Block::new(
            "Overview",
            vec![PortableContentItem::text("We sell tea.")],
        )];
        let sub = SectionSubmission::prepare("overview", vec![true, false], meta(), &blocks).unwrap();
        let json = serde_json::to_value(&sub).unwrap();

        assert_eq!(json["sectionId"], "overview");
        assert_eq!(json["checks"], serde_json::json!([true, false]));
        assert_eq!(json["meta"]["author"], "Kim");
        assert_eq!(json["meta"]["createdAt"], "2024-03-09");
        assert_eq!(json["blocks"][0]["meta"]["title"], "Overview");
    }

    #[test]
    fn test_empty_section_not_submitted() {
        let blocks = vec![Block::new("Overview", vec![PortableContentItem::text("")])];
        assert!(SectionSubmission::prepare("overview", vec![], meta(), &blocks).is_none());

        let blocks = vec![Block::new(
            "Overview",
            vec![PortableContentItem::text("   \n\n ")],
        )];
        assert!(SectionSubmission::prepare("overview", vec![], meta(), &blocks).is_none());
    }

    #[test]
    fn test_empty_blocks_dropped() {
        let blocks = vec![
            Block::new("A", vec![PortableContentItem::text("")]),
            Block::new(
                "B",
                vec![
                    PortableContentItem::text(" "),
                    PortableContentItem::image("https://cdn/b.png"),
                ],
            ),
        ];
        let sub = SectionSubmission::prepare("s", vec![], meta(), &blocks).unwrap();
        assert_eq!(sub.blocks.len(), 1);
        assert_eq!(sub.blocks[0].title, "B");
        assert_eq!(sub.item_count(), 1);
    }
}
