//! Table extraction and reconstruction.

use serde::{Deserialize, Serialize};

use crate::model::{DocumentNode, ImageAttrs, PortableContentItem};

use super::document::encode_inline;
use super::inline::image_token_regex;
use super::mark::MarkDecoder;

/// Columns and rows of a table in portable form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableContent {
    /// Header values
    pub columns: Vec<String>,

    /// Body rows
    pub rows: Vec<Vec<String>>,
}

impl TableContent {
    /// Number of body rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

impl From<TableContent> for PortableContentItem {
    fn from(table: TableContent) -> Self {
        PortableContentItem::table(table.columns, table.rows)
    }
}

/// Extract columns and rows from a `table` node.
///
/// The first row is the header only when every one of its cells is a
/// `tableHeader`. Otherwise the first row's values double as the columns and
/// every row, the first included, is kept as a body row.
pub fn extract_table(table: &DocumentNode) -> TableContent {
    let rows: Vec<&DocumentNode> = table
        .children()
        .iter()
        .filter(|n| matches!(n, DocumentNode::TableRow { .. }))
        .collect();

    let Some(first) = rows.first() else {
        return TableContent::default();
    };

    let header_row = !first.children().is_empty()
        && first
            .children()
            .iter()
            .all(|c| matches!(c, DocumentNode::TableHeader { .. }));

    let columns = row_values(first);
    let body = rows
        .iter()
        .skip(usize::from(header_row))
        .map(|r| row_values(r))
        .collect();

    TableContent {
        columns,
        rows: body,
    }
}

/// Rebuild a `table` node from portable columns and rows.
///
/// A header row is created only for non-empty columns. A first body row equal
/// to the columns is a captured duplicate of the header and is dropped.
pub fn build_table(columns: &[String], rows: &[Vec<String>], decoder: &MarkDecoder) -> DocumentNode {
    let mut table_rows = Vec::with_capacity(rows.len() + 1);

    if !columns.is_empty() {
        table_rows.push(DocumentNode::TableRow {
            content: columns
                .iter()
                .map(|v| DocumentNode::TableHeader {
                    content: vec![cell_paragraph(v, decoder)],
                })
                .collect(),
        });
    }

    let skip = usize::from(!columns.is_empty() && rows.first().is_some_and(|r| r == columns));
    if skip == 1 {
        log::debug!("dropping body row that repeats the header");
    }

    for row in rows.iter().skip(skip) {
        table_rows.push(DocumentNode::TableRow {
            content: row
                .iter()
                .map(|v| DocumentNode::TableCell {
                    content: vec![cell_paragraph(v, decoder)],
                })
                .collect(),
        });
    }

    DocumentNode::Table {
        content: table_rows,
    }
}

fn row_values(row: &DocumentNode) -> Vec<String> {
    row.children().iter().map(cell_text).collect()
}

/// Single-line cell text: encoded paragraphs joined by spaces.
///
/// Inline images stay in the text as `![alt](src)` tokens; their display
/// size is not kept.
fn cell_text(cell: &DocumentNode) -> String {
    let mut images: Vec<ImageAttrs> = Vec::new();
    let parts: Vec<String> = cell
        .children()
        .iter()
        .map(|block| match block {
            DocumentNode::Paragraph { content } | DocumentNode::Heading { content, .. } => {
                encode_inline(content, &mut images)
            }
            other => encode_inline(other.children(), &mut images),
        })
        .collect();

    let sized = images
        .iter()
        .filter(|i| i.width.is_some() || i.height.is_some())
        .count();
    if sized > 0 {
        log::debug!("table cell image size dropped for {} image(s)", sized);
    }

    parts
        .join("\n")
        .split('\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn cell_paragraph(value: &str, decoder: &MarkDecoder) -> DocumentNode {
    DocumentNode::paragraph(cell_nodes(value, decoder))
}

/// Inline nodes of one cell value, with image tokens turned back into images.
pub fn cell_nodes(value: &str, decoder: &MarkDecoder) -> Vec<DocumentNode> {
    let mut nodes = Vec::new();
    let mut last = 0;

    for caps in image_token_regex().captures_iter(value) {
        let Some(token) = caps.get(0) else {
            continue;
        };
        nodes.extend(
            decoder
                .decode_line(&value[last..token.start()])
                .into_iter()
                .map(|run| run.into_node()),
        );
        nodes.push(DocumentNode::Image {
            attrs: token_attrs(&caps[1], &caps[2]),
        });
        last = token.end();
    }

    nodes.extend(
        decoder
            .decode_line(&value[last..])
            .into_iter()
            .map(|run| run.into_node()),
    );
    nodes
}

/// Images referenced by tokens in a cell value.
pub fn cell_images(value: &str) -> Vec<ImageAttrs> {
    image_token_regex()
        .captures_iter(value)
        .map(|caps| token_attrs(&caps[1], &caps[2]))
        .collect()
}

fn token_attrs(alt: &str, src: &str) -> ImageAttrs {
    let attrs = ImageAttrs::new(src);
    if alt.is_empty() {
        attrs
    } else {
        attrs.with_alt(alt)
    }
}
