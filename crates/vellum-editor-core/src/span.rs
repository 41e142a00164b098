//! Span location: finding the active formatting construct at an offset.
//!
//! Inline matching is scoped to the caret's line and works the way the
//! renderer's inline pass does: code spans are computed first and suppress
//! every other delimiter inside them, remaining delimiters pair
//! sequentially (first unconsumed opener with the next closer), and
//! anything unpaired is inactive. A caret sitting exactly on a delimiter
//! boundary counts as inside the span.
//!
//! Line-level spans (headings, list items) come straight from the shared
//! marker grammar in `vellum_renderer::syntax`.

use std::ops::Range;

use vellum_renderer::inline::{CodeSpan, code_spans, in_code};
use vellum_renderer::syntax::{self, MarkerKind};

use crate::text::TextBuffer;
use crate::types::{FormatSpan, SpanKind};

/// Char offset of the start of the line containing `offset`.
pub fn line_start<B: TextBuffer>(buf: &B, offset: usize) -> usize {
    let mut pos = offset.min(buf.len_chars());
    while pos > 0 {
        if buf.char_at(pos - 1) == Some('\n') {
            break;
        }
        pos -= 1;
    }
    pos
}

/// Char offset just past the last char of the line containing `offset`,
/// excluding the newline.
pub fn line_end<B: TextBuffer>(buf: &B, offset: usize) -> usize {
    let mut pos = offset.min(buf.len_chars());
    while pos < buf.len_chars() {
        if buf.char_at(pos) == Some('\n') {
            break;
        }
        pos += 1;
    }
    pos
}

/// The caret's line as (start offset, text).
pub(crate) fn line_at<B: TextBuffer>(buf: &B, offset: usize) -> (usize, String) {
    let start = line_start(buf, offset);
    let end = line_end(buf, offset);
    let text = buf
        .slice(start..end)
        .map(|s| s.to_string())
        .unwrap_or_default();
    (start, text)
}

/// True when `offset` sits inside a fenced code block. A fence boundary
/// line itself counts as inside.
pub fn inside_fence<B: TextBuffer>(buf: &B, offset: usize) -> bool {
    let target = line_start(buf, offset);
    let mut open = false;
    let mut pos = 0;
    loop {
        let end = line_end(buf, pos);
        let line = buf
            .slice(pos..end)
            .map(|s| s.to_string())
            .unwrap_or_default();
        let boundary = syntax::fence_marker(&line).is_some();
        if pos == target {
            return open || boundary;
        }
        if boundary {
            open = !open;
        }
        if end >= buf.len_chars() {
            return false;
        }
        pos = end + 1;
    }
}

/// Find the active span of `kind` containing `offset`.
///
/// The query's payload is ignored; the returned span carries what was
/// actually found (level, number, marker char, checked state).
pub fn locate_span<B: TextBuffer>(buf: &B, offset: usize, kind: SpanKind) -> Option<FormatSpan> {
    let offset = offset.min(buf.len_chars());
    let (start, line) = line_at(buf, offset);
    let end = start + line.chars().count();

    match kind {
        SpanKind::Heading(_) => {
            // Heading markers sit after a list marker when both are present.
            let base = syntax::list_marker(&line).map(|m| m.content_start).unwrap_or(0);
            let (level, consumed) = syntax::heading_marker(&line[base..])?;
            Some(FormatSpan {
                kind: SpanKind::Heading(level),
                open: start + base..start + base + consumed,
                close: end..end,
                content: start + base + consumed..end,
            })
        }
        SpanKind::OrderedItem(_) | SpanKind::UnorderedItem(_) | SpanKind::TaskItem(_) => {
            let m = syntax::list_marker(&line)?;
            let found = match m.kind {
                MarkerKind::Bullet(c) => SpanKind::UnorderedItem(c),
                MarkerKind::Ordered(n) => SpanKind::OrderedItem(n),
                MarkerKind::Task(checked) => SpanKind::TaskItem(checked),
            };
            if !found.same_kind(&kind) {
                return None;
            }
            Some(FormatSpan {
                kind: found,
                open: start + m.indent_chars..start + m.content_start,
                close: end..end,
                content: start + m.content_start..end,
            })
        }
        SpanKind::InlineCode => {
            let code = code_spans(&line);
            code.iter()
                .map(|s| FormatSpan {
                    kind: SpanKind::InlineCode,
                    open: abs(&line, start, s.all.start)..abs(&line, start, s.content.start),
                    close: abs(&line, start, s.content.end)..abs(&line, start, s.all.end),
                    content: abs(&line, start, s.content.start)..abs(&line, start, s.content.end),
                })
                .find(|span| span.open.start <= offset && offset <= span.close.end)
        }
        SpanKind::Bold | SpanKind::Italic | SpanKind::Strikethrough => {
            let delim = kind.marker()?;
            let code = code_spans(&line);
            mark_pairs(&line, delim, &code)
                .into_iter()
                .map(|(open, close)| FormatSpan {
                    kind,
                    open: abs(&line, start, open.start)..abs(&line, start, open.end),
                    close: abs(&line, start, close.start)..abs(&line, start, close.end),
                    content: abs(&line, start, open.end)..abs(&line, start, close.start),
                })
                .find(|span| span.open.start <= offset && offset <= span.close.end)
        }
        SpanKind::Link | SpanKind::Image => {
            let image = matches!(kind, SpanKind::Image);
            let code = code_spans(&line);
            bracket_spans(&line, image, &code)
                .into_iter()
                .map(|(open, content, close)| FormatSpan {
                    kind,
                    open: abs(&line, start, open.start)..abs(&line, start, open.end),
                    close: abs(&line, start, close.start)..abs(&line, start, close.end),
                    content: abs(&line, start, content.start)..abs(&line, start, content.end),
                })
                .find(|span| span.open.start <= offset && offset <= span.close.end)
        }
    }
}

/// Byte offset in `line` to absolute char offset.
fn abs(line: &str, line_start: usize, byte: usize) -> usize {
    line_start + line[..byte].chars().count()
}

/// Occurrences of a symmetric delimiter outside code spans, paired
/// sequentially. Byte ranges. The single `*` of emphasis must not touch
/// another `*` or it belongs to a bold delimiter.
fn mark_pairs(line: &str, delim: &str, code: &[CodeSpan]) -> Vec<(Range<usize>, Range<usize>)> {
    let bytes = line.as_bytes();
    let d = delim.as_bytes();
    let mut positions = Vec::new();
    let mut i = 0;
    while i + d.len() <= bytes.len() {
        if in_code(i, code) || &bytes[i..i + d.len()] != d {
            i += 1;
            continue;
        }
        if delim == "*" {
            let before = i.checked_sub(1).map(|p| bytes[p]);
            let after = bytes.get(i + 1).copied();
            if before == Some(b'*') || after == Some(b'*') {
                i += 1;
                continue;
            }
        }
        positions.push(i);
        i += d.len();
    }
    positions
        .chunks(2)
        .filter(|pair| pair.len() == 2)
        .map(|pair| (pair[0]..pair[0] + d.len(), pair[1]..pair[1] + d.len()))
        .collect()
}

/// Link/image constructs on the line as (open, text, close) byte ranges,
/// where close covers `](dest)`.
fn bracket_spans(
    line: &str,
    image: bool,
    code: &[CodeSpan],
) -> Vec<(Range<usize>, Range<usize>, Range<usize>)> {
    let bytes = line.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if in_code(i, code) {
            i += 1;
            continue;
        }
        let (open_len, matches_here) = if image {
            (2, bytes[i] == b'!' && bytes.get(i + 1).copied() == Some(b'['))
        } else {
            let escaped_by_bang = i > 0 && bytes[i - 1] == b'!';
            (1, bytes[i] == b'[' && !escaped_by_bang)
        };
        if !matches_here {
            i += 1;
            continue;
        }
        let text_start = i + open_len;
        let Some(rb) = (text_start..bytes.len()).find(|&p| bytes[p] == b']' && !in_code(p, code))
        else {
            i += 1;
            continue;
        };
        if bytes.get(rb + 1).copied() != Some(b'(') {
            i = rb + 1;
            continue;
        }
        let Some(paren) = (rb + 2..bytes.len()).find(|&p| bytes[p] == b')') else {
            i = rb + 1;
            continue;
        };
        out.push((i..text_start, text_start..rb, rb..paren + 1));
        i = paren + 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::EditorRope;

    fn rope(s: &str) -> EditorRope {
        EditorRope::from_str(s)
    }

    #[test]
    fn test_bold_span() {
        let buf = rope("a **bold** b");
        let span = locate_span(&buf, 5, SpanKind::Bold).unwrap();
        assert_eq!(span.open, 2..4);
        assert_eq!(span.content, 4..8);
        assert_eq!(span.close, 8..10);
    }

    #[test]
    fn test_delimiter_boundary_is_inside() {
        let buf = rope("**x**");
        // Between the two stars of the opener.
        assert!(locate_span(&buf, 1, SpanKind::Bold).is_some());
        // At the very start and very end.
        assert!(locate_span(&buf, 0, SpanKind::Bold).is_some());
        assert!(locate_span(&buf, 5, SpanKind::Bold).is_some());
    }

    #[test]
    fn test_outside_span() {
        let buf = rope("a **b** c");
        assert!(locate_span(&buf, 0, SpanKind::Bold).is_none());
        assert!(locate_span(&buf, 9, SpanKind::Bold).is_none());
    }

    #[test]
    fn test_sequential_pairing() {
        let buf = rope("*a* b *c*");
        // Between the pairs nothing is active.
        assert!(locate_span(&buf, 4, SpanKind::Italic).is_none());
        let first = locate_span(&buf, 1, SpanKind::Italic).unwrap();
        assert_eq!(first.content, 1..2);
        let second = locate_span(&buf, 7, SpanKind::Italic).unwrap();
        assert_eq!(second.content, 7..8);
    }

    #[test]
    fn test_unpaired_delimiter_inactive() {
        let buf = rope("a *b c");
        assert!(locate_span(&buf, 3, SpanKind::Italic).is_none());
    }

    #[test]
    fn test_code_span_suppresses_marks() {
        let buf = rope("`**` x **y**");
        // The stars inside backticks are literal.
        assert!(locate_span(&buf, 2, SpanKind::Bold).is_none());
        let span = locate_span(&buf, 9, SpanKind::Bold).unwrap();
        assert_eq!(span.content, 9..10);
    }

    #[test]
    fn test_inline_code_span() {
        let buf = rope("x `let` y");
        let span = locate_span(&buf, 4, SpanKind::InlineCode).unwrap();
        assert_eq!(span.open, 2..3);
        assert_eq!(span.content, 3..6);
        assert_eq!(span.close, 6..7);
    }

    #[test]
    fn test_bold_stars_are_not_emphasis() {
        let buf = rope("**bold**");
        assert!(locate_span(&buf, 3, SpanKind::Italic).is_none());
        assert!(locate_span(&buf, 3, SpanKind::Bold).is_some());
    }

    #[test]
    fn test_link_span() {
        let buf = rope("see [docs](https://e.com) now");
        let span = locate_span(&buf, 6, SpanKind::Link).unwrap();
        assert_eq!(span.open, 4..5);
        assert_eq!(span.content, 5..9);
        assert_eq!(span.close, 9..25);
    }

    #[test]
    fn test_image_is_not_a_link() {
        let buf = rope("![alt](pic.png)");
        assert!(locate_span(&buf, 3, SpanKind::Link).is_none());
        let span = locate_span(&buf, 3, SpanKind::Image).unwrap();
        assert_eq!(span.open, 0..2);
        assert_eq!(span.content, 2..5);
    }

    #[test]
    fn test_heading_span() {
        let buf = rope("## title");
        let span = locate_span(&buf, 4, SpanKind::Heading(1)).unwrap();
        assert_eq!(span.kind, SpanKind::Heading(2));
        assert_eq!(span.open, 0..3);
        assert_eq!(span.content, 3..8);
    }

    #[test]
    fn test_heading_after_list_marker() {
        let buf = rope("- ## x");
        let span = locate_span(&buf, 4, SpanKind::Heading(1)).unwrap();
        assert_eq!(span.open, 2..5);
        let item = locate_span(&buf, 4, SpanKind::UnorderedItem(' ')).unwrap();
        assert_eq!(item.kind, SpanKind::UnorderedItem('-'));
        assert_eq!(item.open, 0..2);
    }

    #[test]
    fn test_list_item_payload_returned() {
        let buf = rope("  7. seventh");
        let span = locate_span(&buf, 8, SpanKind::OrderedItem(1)).unwrap();
        assert_eq!(span.kind, SpanKind::OrderedItem(7));
        assert_eq!(span.open, 2..5);
        assert_eq!(span.content, 5..12);
        // A bullet query does not match an ordered item.
        assert!(locate_span(&buf, 8, SpanKind::UnorderedItem('-')).is_none());
    }

    #[test]
    fn test_second_line_scoping() {
        let buf = rope("**a**\nplain **b** text");
        let span = locate_span(&buf, 14, SpanKind::Bold).unwrap();
        assert_eq!(span.open, 12..14);
        assert_eq!(span.content, 14..15);
    }

    #[test]
    fn test_inside_fence() {
        let buf = rope("before\n```rust\nlet x;\n```\nafter");
        assert!(!inside_fence(&buf, 2));
        assert!(inside_fence(&buf, 8)); // on the opening fence line
        assert!(inside_fence(&buf, 16)); // inside
        assert!(inside_fence(&buf, 23)); // on the closing fence line
        assert!(!inside_fence(&buf, 27));
    }

    #[test]
    fn test_line_bounds() {
        let buf = rope("one\ntwo\nthree");
        assert_eq!(line_start(&buf, 5), 4);
        assert_eq!(line_end(&buf, 5), 7);
        assert_eq!(line_start(&buf, 0), 0);
        assert_eq!(line_end(&buf, 13), 13);
    }
}
