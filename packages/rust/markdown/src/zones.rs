//! Markdown zone classification for a byte offset.
//!
//! Every predicate is a pure backward/forward scan over the raw text; there is
//! no parse tree and no state carried between queries. The heuristics are
//! intentionally textual and inherit their failure modes:
//!
//! - an unbalanced ```` ``` ```` anywhere earlier flips every later fence answer;
//! - an unmatched `[` or `(` earlier in the document keeps later text in a
//!   link zone until a closing bracket appears;
//! - indented code blocks and `~~~` fences are not recognized.
//!
//! All markers are ASCII, so scanning bytes is exact for UTF-8 input.

const FENCE: &[u8] = b"```";

/// Where a position sits in a markdown document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    CodeFence,
    InlineCode,
    LinkText,
    LinkUrl,
    BareUrl,
    Heading,
    Plain,
}

/// Classify `offset` within `doc`.
///
/// Total function: offsets past the end are clamped. When several zones apply
/// the first in declaration order of [`Zone`] is reported.
pub fn classify(doc: &str, offset: usize) -> Zone {
    let offset = offset.min(doc.len());

    if in_code_fence(doc, offset) {
        Zone::CodeFence
    } else if in_inline_code(doc, offset) {
        Zone::InlineCode
    } else if in_link_text(doc, offset) {
        Zone::LinkText
    } else if in_link_url(doc, offset) {
        Zone::LinkUrl
    } else if in_bare_url(doc, offset) {
        Zone::BareUrl
    } else if in_heading(doc, offset) {
        Zone::Heading
    } else {
        Zone::Plain
    }
}

/// `true` when `offset` is in none of the excluded zones.
pub fn is_plain(doc: &str, offset: usize) -> bool {
    classify(doc, offset) == Zone::Plain
}

/// Odd number of fence markers before `offset`.
pub fn in_code_fence(doc: &str, offset: usize) -> bool {
    count_fences(before(doc, offset)) % 2 == 1
}

/// Between two single back-ticks, neither of which belongs to a fence.
///
/// A dangling back-tick with no partner after `offset` never matches.
pub fn in_inline_code(doc: &str, offset: usize) -> bool {
    let bytes = doc.as_bytes();
    let offset = offset.min(bytes.len());

    let Some(start) = bytes[..offset].iter().rposition(|&b| b == b'`') else {
        return false;
    };
    if is_fence_tick(bytes, start) {
        return false;
    }

    let Some(end) = bytes[offset..].iter().position(|&b| b == b'`') else {
        return false;
    };
    !is_fence_tick(bytes, offset + end)
}

/// An opening `[` before `offset` with no `]` after it.
pub fn in_link_text(doc: &str, offset: usize) -> bool {
    let head = before(doc, offset);
    match (rfind(head, b'['), rfind(head, b']')) {
        (Some(open), Some(close)) => open > close,
        (Some(_), None) => true,
        _ => false,
    }
}

/// Inside the `(url)` half of `[text](url)`.
pub fn in_link_url(doc: &str, offset: usize) -> bool {
    let head = before(doc, offset);
    let Some(open) = rfind(head, b'(') else {
        return false;
    };
    if rfind(head, b')').is_some_and(|close| close > open) {
        return false;
    }
    open > 0 && head[open - 1] == b']'
}

/// The whitespace-delimited token ending at `offset` starts with a URL scheme.
pub fn in_bare_url(doc: &str, offset: usize) -> bool {
    let head = before(doc, offset);
    let token = match head
        .iter()
        .rposition(|&b| b == b' ' || b == b'\n' || b == b'\t')
    {
        Some(ws) => &head[ws + 1..],
        None => head,
    };
    token.starts_with(b"http://") || token.starts_with(b"https://")
}

/// The line containing `offset` is an ATX heading.
pub fn in_heading(doc: &str, offset: usize) -> bool {
    let bytes = doc.as_bytes();
    let offset = offset.min(bytes.len());

    let line_start = rfind(&bytes[..offset], b'\n').map_or(0, |i| i + 1);
    let line_end = bytes[offset..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |i| offset + i);

    doc.get(line_start..line_end)
        .is_some_and(|line| line.trim_start().starts_with('#'))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn before(doc: &str, offset: usize) -> &[u8] {
    let bytes = doc.as_bytes();
    &bytes[..offset.min(bytes.len())]
}

fn rfind(haystack: &[u8], needle: u8) -> Option<usize> {
    haystack.iter().rposition(|&b| b == needle)
}

/// Non-overlapping count, left to right.
fn count_fences(bytes: &[u8]) -> usize {
    let mut count = 0;
    let mut i = 0;
    while i + FENCE.len() <= bytes.len() {
        if &bytes[i..i + FENCE.len()] == FENCE {
            count += 1;
            i += FENCE.len();
        } else {
            i += 1;
        }
    }
    count
}

/// Whether the back-tick at `idx` is the first, middle, or last of a "```".
fn is_fence_tick(bytes: &[u8], idx: usize) -> bool {
    let window = |start: usize| bytes.get(start..start + FENCE.len()) == Some(FENCE);
    (idx >= 2 && window(idx - 2)) || (idx >= 1 && window(idx - 1)) || window(idx)
}
