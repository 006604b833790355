//! Inline mark encoding.
//!
//! Marks travel as Markdown-like delimiters (`**`, `*`, `==`, `` ` ``) and as
//! HTML spans for colour and spell-error annotations. Decoding extracts spans
//! first, then scans every span segment for delimiters in fixed precedence
//! (`**`, `==`, `*`, `` ` ``) with toggle state carried across the segments
//! of one line.

use std::sync::OnceLock;

use regex::Regex;

use crate::model::{same_mark_set, Mark, TextRun};

use super::UnmatchedMarkers;

const BOLD: &str = "**";
const ITALIC: &str = "*";
const HIGHLIGHT: &str = "==";
const CODE: &str = "`";
const SPAN_CLOSE: &str = "</span>";

/// Encode a single run, wrapping it once per mark.
///
/// The wrapping order is canonical, so the output does not depend on the
/// order in which marks were applied in the editor.
pub fn encode_run(text: &str, marks: &[Mark]) -> String {
    encode_runs(&[TextRun::with_marks(text, marks.to_vec())])
}

/// Encode a line of runs.
///
/// Delimiters are only emitted where the mark set changes, so adjacent runs
/// sharing a mark stay inside one delimiter pair. Whitespace at the edges of
/// a run is kept outside the delimiters.
pub fn encode_runs(runs: &[TextRun]) -> String {
    let mut out = String::new();
    let mut state = EncodeState::default();
    let mut pending_ws = String::new();

    for run in runs {
        if run.text.is_empty() {
            continue;
        }
        if run.text.trim().is_empty() {
            pending_ws.push_str(&run.text);
            continue;
        }

        let target = encodable_marks(&run.marks);
        let (lead, core, trail) = split_edges(&run.text);

        state.close_for(&target, &mut out);
        out.push_str(&pending_ws);
        pending_ws.clear();
        out.push_str(lead);
        state.open_for(&target, &mut out);

        out.push_str(core);
        pending_ws.push_str(trail);
    }

    state.close_for(&[], &mut out);
    out.push_str(&pending_ws);
    out
}

/// Open delimiters while encoding a line.
///
/// Spans nest as a stack. Bold, italic and highlight delimiters are toggles,
/// so their relative order is free, but no toggle may fire twice in one
/// transition: `*` `**` `*` would rescan as `**` `**`. Code content is
/// literal, so code closes before any toggle fires.
#[derive(Debug, Default)]
struct EncodeState {
    spans: Vec<Mark>,
    toggles: Vec<Mark>,
    code: bool,
}

impl EncodeState {
    fn close_for(&mut self, target: &[Mark], out: &mut String) {
        let wants_code = target.contains(&Mark::Code);
        let toggles_change = self.toggles.iter().any(|m| !target.contains(m))
            || target
                .iter()
                .any(|m| is_toggle(m) && !self.toggles.contains(m));

        if self.code && (!wants_code || toggles_change) {
            out.push_str(CODE);
            self.code = false;
        }

        let mut closing: Vec<Mark> = self
            .toggles
            .iter()
            .filter(|m| !target.contains(m))
            .cloned()
            .collect();
        closing.sort_by_key(|m| std::cmp::Reverse(m.rank()));
        for mark in closing {
            out.push_str(close_delimiter(&mark));
            self.toggles.retain(|m| *m != mark);
        }

        if let Some(idx) = self.spans.iter().position(|m| !target.contains(m)) {
            for _ in idx..self.spans.len() {
                out.push_str(SPAN_CLOSE);
            }
            self.spans.truncate(idx);
        }
    }

    fn open_for(&mut self, target: &[Mark], out: &mut String) {
        for mark in target {
            let open = match mark {
                Mark::Code => !self.code,
                m if is_toggle(m) => !self.toggles.contains(m),
                m => !self.spans.contains(m),
            };
            if !open {
                continue;
            }
            out.push_str(&open_delimiter(mark));
            match mark {
                Mark::Code => self.code = true,
                m if is_toggle(m) => self.toggles.push(m.clone()),
                m => self.spans.push(m.clone()),
            }
        }
    }
}

fn is_toggle(mark: &Mark) -> bool {
    matches!(mark, Mark::Bold | Mark::Italic | Mark::Highlight { .. })
}

/// Decode one encoded line with the default (literal) unmatched-marker policy.
pub fn decode_line(line: &str) -> Vec<TextRun> {
    MarkDecoder::new(UnmatchedMarkers::default()).decode_line(line)
}

/// Decoder for delimiter-encoded lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkDecoder {
    policy: UnmatchedMarkers,
}

impl MarkDecoder {
    /// Create a decoder with the given unmatched-marker policy.
    pub fn new(policy: UnmatchedMarkers) -> Self {
        Self { policy }
    }

    /// Decode a single line into runs.
    ///
    /// Toggle state never crosses a newline; callers split multi-line text
    /// first. Malformed markup never fails: it degrades to literal text or,
    /// under [`UnmatchedMarkers::OpenToEndOfLine`], to a mark running to the
    /// end of the line.
    pub fn decode_line(&self, line: &str) -> Vec<TextRun> {
        let segments = self.split_spans(line);
        let mut pieces = self.scan_markers(&segments);

        if self.policy == UnmatchedMarkers::Literal {
            demote_unpaired(&mut pieces);
        }

        let mut runs: Vec<TextRun> = Vec::new();
        let mut active: Vec<Mark> = Vec::new();

        for piece in pieces {
            match piece {
                Piece::Marker { mark, .. } => {
                    if let Some(pos) = active.iter().position(|m| *m == mark) {
                        active.remove(pos);
                    } else {
                        active.push(mark);
                    }
                }
                Piece::Text { text, segment } => {
                    if text.is_empty() {
                        continue;
                    }
                    let mut marks: Vec<Mark> = segments[segment].marks.clone();
                    for m in &active {
                        if !marks.contains(m) {
                            marks.push(m.clone());
                        }
                    }
                    marks.sort_by_key(|m| m.rank());

                    match runs.last_mut() {
                        Some(last) if same_mark_set(&last.marks, &marks) => {
                            last.text.push_str(&text)
                        }
                        _ => runs.push(TextRun::with_marks(text, marks)),
                    }
                }
            }
        }

        runs
    }

    /// Split a line into span segments, each carrying the span marks in force.
    fn split_spans(&self, line: &str) -> Vec<Segment> {
        let mut tokens = tokenize_spans(line);

        // Match open/close tags; unmatched tags degrade.
        let mut open: Vec<usize> = Vec::new();
        let mut unmatched: Vec<usize> = Vec::new();
        for (i, token) in tokens.iter().enumerate() {
            match token {
                SpanToken::Open { .. } => open.push(i),
                SpanToken::Close => {
                    if open.pop().is_none() {
                        unmatched.push(i);
                    }
                }
                SpanToken::Text(_) => {}
            }
        }
        if self.policy == UnmatchedMarkers::Literal {
            unmatched.extend(open);
        }
        if !unmatched.is_empty() {
            log::debug!("{} unmatched span tag(s) kept as text", unmatched.len());
        }
        for i in unmatched {
            let raw = match &tokens[i] {
                SpanToken::Open { raw, .. } => raw.clone(),
                SpanToken::Close => SPAN_CLOSE.to_string(),
                SpanToken::Text(t) => t.clone(),
            };
            tokens[i] = SpanToken::Text(raw);
        }

        let mut segments = vec![Segment::default()];
        let mut stack: Vec<Vec<Mark>> = Vec::new();
        for token in tokens {
            match token {
                SpanToken::Text(text) => {
                    let marks: Vec<Mark> = stack.iter().flatten().cloned().collect();
                    match segments.last_mut() {
                        Some(last) if last.marks == marks => last.text.push_str(&text),
                        _ => segments.push(Segment { text, marks }),
                    }
                }
                SpanToken::Open { marks, .. } => stack.push(marks),
                SpanToken::Close => {
                    stack.pop();
                }
            }
        }
        segments
    }

    /// Scan segments for delimiters in precedence order.
    fn scan_markers(&self, segments: &[Segment]) -> Vec<Piece> {
        let backticks: Vec<(usize, usize)> = segments
            .iter()
            .enumerate()
            .flat_map(|(s, seg)| seg.text.match_indices(CODE).map(move |(i, _)| (s, i)))
            .collect();

        let mut pieces = Vec::new();
        let mut in_code = false;

        for (seg_idx, segment) in segments.iter().enumerate() {
            let text = segment.text.as_str();
            let mut buf = String::new();
            let mut i = 0;

            while i < text.len() {
                let rest = &text[i..];

                if in_code {
                    if rest.starts_with(CODE) {
                        flush_text(&mut pieces, &mut buf, seg_idx);
                        pieces.push(Piece::marker(Mark::Code, CODE, seg_idx));
                        in_code = false;
                        i += CODE.len();
                        continue;
                    }
                } else if rest.starts_with(BOLD) {
                    flush_text(&mut pieces, &mut buf, seg_idx);
                    pieces.push(Piece::marker(Mark::Bold, BOLD, seg_idx));
                    i += BOLD.len();
                    continue;
                } else if rest.starts_with(HIGHLIGHT) {
                    flush_text(&mut pieces, &mut buf, seg_idx);
                    pieces.push(Piece::marker(Mark::highlight(), HIGHLIGHT, seg_idx));
                    i += HIGHLIGHT.len();
                    continue;
                } else if rest.starts_with(ITALIC) {
                    flush_text(&mut pieces, &mut buf, seg_idx);
                    pieces.push(Piece::marker(Mark::Italic, ITALIC, seg_idx));
                    i += ITALIC.len();
                    continue;
                } else if rest.starts_with(CODE) {
                    let closes = backticks.iter().any(|&pos| pos > (seg_idx, i));
                    if closes || self.policy == UnmatchedMarkers::OpenToEndOfLine {
                        flush_text(&mut pieces, &mut buf, seg_idx);
                        pieces.push(Piece::marker(Mark::Code, CODE, seg_idx));
                        in_code = true;
                        i += CODE.len();
                        continue;
                    }
                    log::debug!("unmatched '`' kept as text");
                }

                let ch = rest.chars().next().unwrap_or_default();
                buf.push(ch);
                i += ch.len_utf8().max(1);
            }

            flush_text(&mut pieces, &mut buf, seg_idx);
        }

        pieces
    }
}

/// A stretch of text under a fixed set of span marks.
#[derive(Debug, Clone, Default)]
struct Segment {
    text: String,
    marks: Vec<Mark>,
}

#[derive(Debug, Clone)]
enum SpanToken {
    Text(String),
    Open { marks: Vec<Mark>, raw: String },
    Close,
}

#[derive(Debug, Clone)]
enum Piece {
    Text { text: String, segment: usize },
    Marker { mark: Mark, delimiter: &'static str, segment: usize },
}

impl Piece {
    fn marker(mark: Mark, delimiter: &'static str, segment: usize) -> Self {
        Piece::Marker {
            mark,
            delimiter,
            segment,
        }
    }
}

fn flush_text(pieces: &mut Vec<Piece>, buf: &mut String, segment: usize) {
    if !buf.is_empty() {
        pieces.push(Piece::Text {
            text: std::mem::take(buf),
            segment,
        });
    }
}

/// Turn the last delimiter of each odd-count kind back into text.
fn demote_unpaired(pieces: &mut [Piece]) {
    for kind in [Mark::Bold, Mark::highlight(), Mark::Italic, Mark::Code] {
        let positions: Vec<usize> = pieces
            .iter()
            .enumerate()
            .filter(|(_, p)| matches!(p, Piece::Marker { mark, .. } if *mark == kind))
            .map(|(i, _)| i)
            .collect();

        if positions.len() % 2 == 1 {
            if let Some(&last) = positions.last() {
                if let Piece::Marker {
                    delimiter, segment, ..
                } = pieces[last]
                {
                    log::debug!("unmatched '{}' kept as text", delimiter);
                    pieces[last] = Piece::Text {
                        text: delimiter.to_string(),
                        segment,
                    };
                }
            }
        }
    }
}

fn span_open_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)^<span(\s[^>]*)?>"#).expect("valid span regex"))
}

fn color_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"color\s*:\s*([^;"']+)"#).expect("valid color regex"))
}

fn tokenize_spans(line: &str) -> Vec<SpanToken> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    while i < line.len() {
        let rest = &line[i..];
        if rest.starts_with('<') {
            if let Some(m) = span_open_regex().find(rest) {
                if !text.is_empty() {
                    tokens.push(SpanToken::Text(std::mem::take(&mut text)));
                }
                let raw = m.as_str().to_string();
                tokens.push(SpanToken::Open {
                    marks: span_marks(&raw),
                    raw,
                });
                i += m.end();
                continue;
            }
            if rest.len() >= SPAN_CLOSE.len()
                && rest[..SPAN_CLOSE.len()].eq_ignore_ascii_case(SPAN_CLOSE)
            {
                if !text.is_empty() {
                    tokens.push(SpanToken::Text(std::mem::take(&mut text)));
                }
                tokens.push(SpanToken::Close);
                i += SPAN_CLOSE.len();
                continue;
            }
        }
        let ch = rest.chars().next().unwrap_or_default();
        text.push(ch);
        i += ch.len_utf8().max(1);
    }

    if !text.is_empty() {
        tokens.push(SpanToken::Text(text));
    }
    tokens
}

/// Marks implied by a `<span ...>` open tag.
fn span_marks(tag: &str) -> Vec<Mark> {
    let mut marks = Vec::new();
    if let Some(caps) = color_regex().captures(tag) {
        let color = caps[1].trim();
        if !color.is_empty() {
            marks.push(Mark::color(color));
        }
    }
    if tag.contains("spell-error") {
        marks.push(Mark::SpellError);
    }
    marks
}

/// Marks that have a textual encoding, deduplicated and in rank order.
fn encodable_marks(marks: &[Mark]) -> Vec<Mark> {
    let mut out: Vec<Mark> = Vec::new();
    for mark in marks {
        let mark = match mark {
            Mark::Highlight { .. } => Mark::highlight(),
            Mark::TextStyle { attrs } if attrs.color.as_deref().map_or(true, str::is_empty) => {
                continue
            }
            other => other.clone(),
        };
        if !out.contains(&mark) {
            out.push(mark);
        }
    }
    out.sort_by_key(|m| m.rank());
    out
}

fn open_delimiter(mark: &Mark) -> String {
    match mark {
        Mark::Bold => BOLD.to_string(),
        Mark::Italic => ITALIC.to_string(),
        Mark::Highlight { .. } => HIGHLIGHT.to_string(),
        Mark::Code => CODE.to_string(),
        Mark::TextStyle { attrs } => format!(
            "<span style=\"color:{}\">",
            attrs.color.as_deref().unwrap_or_default()
        ),
        Mark::SpellError => "<span class=\"spell-error\">".to_string(),
    }
}

fn close_delimiter(mark: &Mark) -> &'static str {
    match mark {
        Mark::Bold => BOLD,
        Mark::Italic => ITALIC,
        Mark::Highlight { .. } => HIGHLIGHT,
        Mark::Code => CODE,
        Mark::TextStyle { .. } | Mark::SpellError => SPAN_CLOSE,
    }
}

/// Split text into leading whitespace, core and trailing whitespace.
fn split_edges(text: &str) -> (&str, &str, &str) {
    let trimmed_start = text.trim_start();
    let lead = &text[..text.len() - trimmed_start.len()];
    let core = trimmed_start.trim_end();
    let trail = &trimmed_start[core.len()..];
    (lead, core, trail)
}
