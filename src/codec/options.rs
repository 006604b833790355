//! Codec options and configuration.

/// How the mark decoder treats a delimiter that has no closing partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmatchedMarkers {
    /// Emit the unpaired delimiter as literal text (default)
    #[default]
    Literal,
    /// Keep the mark open until the end of the line
    OpenToEndOfLine,
}

/// Options for encoding and decoding section content.
#[derive(Debug, Clone)]
pub struct CodecOptions {
    /// Policy for delimiters without a partner
    pub unmatched_markers: UnmatchedMarkers,

    /// Character used for unordered list markers
    pub list_marker: char,

    /// Spaces of indentation per nested list level
    pub list_indent: usize,
}

impl CodecOptions {
    /// Create new codec options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unmatched-marker policy.
    pub fn with_unmatched_markers(mut self, policy: UnmatchedMarkers) -> Self {
        self.unmatched_markers = policy;
        self
    }

    /// Keep unmatched marks open to the end of the line.
    pub fn legacy_markers(mut self) -> Self {
        self.unmatched_markers = UnmatchedMarkers::OpenToEndOfLine;
        self
    }

    /// Set the list marker character.
    pub fn with_list_marker(mut self, marker: char) -> Self {
        self.list_marker = marker;
        self
    }

    /// Set the nested list indentation width.
    pub fn with_list_indent(mut self, spaces: usize) -> Self {
        self.list_indent = spaces.max(1);
        self
    }
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            unmatched_markers: UnmatchedMarkers::Literal,
            list_marker: '-',
            list_indent: 2,
        }
    }
}
