//! Inline image splitting.
//!
//! Paragraph text is encoded with an `![alt](src)` placeholder wherever an
//! inline image sat in the tree. The splitter walks those placeholders and
//! turns the encoded text back into an ordered list of text and image items.

use std::collections::VecDeque;
use std::sync::OnceLock;

use regex::Regex;

use crate::model::{ImageAttrs, PortableContentItem};

pub(crate) fn image_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!\[([^\]]*)\]\(([^)\s]*)\)").expect("valid image token regex"))
}

/// Placeholder token written for an inline image.
pub fn image_token(attrs: &ImageAttrs) -> String {
    format!("![{}]({})", attrs.alt.as_deref().unwrap_or_default(), attrs.src)
}

/// Split encoded text at image tokens.
///
/// Each token consumes the next queued descriptor from `images`; once the
/// queue is exhausted the token's own alt and source are used. Text pieces
/// are trimmed of surrounding newlines and dropped when empty.
pub fn split_by_images(text: &str, images: &[ImageAttrs]) -> Vec<PortableContentItem> {
    let mut queue: VecDeque<&ImageAttrs> = images.iter().collect();
    let mut items = Vec::new();
    let mut last = 0;

    for caps in image_token_regex().captures_iter(text) {
        let Some(token) = caps.get(0) else {
            continue;
        };

        push_text(&mut items, &text[last..token.start()]);

        let item = match queue.pop_front() {
            Some(attrs) => image_item(attrs),
            None => {
                log::debug!("image token without descriptor, using literal values");
                let alt = &caps[1];
                PortableContentItem::Image {
                    src: caps[2].to_string(),
                    caption: (!alt.is_empty()).then(|| alt.to_string()),
                    width: None,
                    height: None,
                }
            }
        };
        items.push(item);
        last = token.end();
    }

    push_text(&mut items, &text[last..]);

    if !queue.is_empty() {
        log::debug!("{} inline image descriptor(s) had no token", queue.len());
    }

    items
}

/// Convert image attributes into a portable image item.
pub(crate) fn image_item(attrs: &ImageAttrs) -> PortableContentItem {
    PortableContentItem::Image {
        src: attrs.src.clone(),
        caption: attrs.alt.clone().filter(|a| !a.is_empty()),
        width: attrs.width,
        height: attrs.height,
    }
}

fn push_text(items: &mut Vec<PortableContentItem>, piece: &str) {
    let piece = piece.trim_matches('\n');
    if !piece.is_empty() {
        items.push(PortableContentItem::text(piece));
    }
}
