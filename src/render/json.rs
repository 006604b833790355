//! JSON output for blocks, submissions and page layouts.

use serde::Serialize;

use crate::error::{Error, Result};

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Serialize any wire value to JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value),
        JsonFormat::Compact => serde_json::to_string(value),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, Page, PortableContentItem};

    #[test]
    fn test_to_json_pretty() {
        let block = Block::new("Overview", vec![PortableContentItem::text("Hello")]);
        let json = to_json(&block, JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"title\""));
        assert!(json.contains("Overview"));
        assert!(json.contains('\n'));
    }

    #[test]
    fn test_to_json_compact() {
        let pages = vec![Page::new(1)];
        let json = to_json(&pages, JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n'));
        assert_eq!(json, r#"[{"number":1,"items":[],"showDocumentHeader":true}]"#);
    }
}
