//! Inline parsing within one block's text.
//!
//! A scan-and-commit loop: at each step the earliest well-formed construct
//! after the cursor wins, its content recurses, and the cursor jumps past
//! it. Code spans are computed up front and suppress every other delimiter
//! inside them; delimiters that never pair stay literal text.
//!
//! Ranges are byte ranges into the block text. All delimiter syntax is
//! ASCII, so the arithmetic never lands inside a multi-byte char.

use std::collections::HashMap;
use std::ops::Range;

use smol_str::SmolStr;

use crate::block::Options;
use crate::tree::{NodeKind, RenderNode};

/// Shared inline-pass state, threaded through the whole render so footnote
/// numbers are assigned by first occurrence in document order.
pub(crate) struct InlineCx<'a> {
    options: Options,
    defs: &'a HashMap<SmolStr, String>,
    /// Labels in first-reference order; a label's number is its index + 1.
    pub(crate) order: Vec<SmolStr>,
}

impl<'a> InlineCx<'a> {
    pub(crate) fn new(options: Options, defs: &'a HashMap<SmolStr, String>) -> Self {
        Self {
            options,
            defs,
            order: Vec::new(),
        }
    }

    pub(crate) fn definition(&self, label: &str) -> Option<&'a str> {
        self.defs.get(label).map(String::as_str)
    }

    fn defined(&self, label: &str) -> bool {
        self.defs.contains_key(label)
    }

    /// Number for a defined label, assigned on first use.
    fn reference(&mut self, label: &str) -> Option<usize> {
        if !self.defined(label) {
            return None;
        }
        if let Some(pos) = self.order.iter().position(|l| l == label) {
            Some(pos + 1)
        } else {
            self.order.push(SmolStr::new(label));
            Some(self.order.len())
        }
    }
}

/// A fully delimited code span: the whole range including backticks, and
/// the literal content between them.
pub struct CodeSpan {
    pub all: Range<usize>,
    pub content: Range<usize>,
}

/// Pair backtick runs sequentially: each run pairs with the next run of the
/// same length; runs that never pair are literal.
pub fn code_spans(text: &str) -> Vec<CodeSpan> {
    let bytes = text.as_bytes();
    let mut runs = Vec::new();
    let mut p = 0;
    while p < bytes.len() {
        if bytes[p] == b'`' {
            let start = p;
            while p < bytes.len() && bytes[p] == b'`' {
                p += 1;
            }
            runs.push((start, p - start));
        } else {
            p += 1;
        }
    }

    let mut spans = Vec::new();
    let mut i = 0;
    while i < runs.len() {
        let (open, len) = runs[i];
        if let Some(j) = (i + 1..runs.len()).find(|&j| runs[j].1 == len) {
            let (close, _) = runs[j];
            spans.push(CodeSpan {
                all: open..close + len,
                content: open + len..close,
            });
            i = j + 1;
        } else {
            i += 1;
        }
    }
    spans
}

pub fn in_code(pos: usize, spans: &[CodeSpan]) -> bool {
    spans.iter().any(|s| s.all.contains(&pos))
}

/// What the scanner found, with content/payload byte ranges.
enum Piece {
    Code(Range<usize>),
    Strong(Range<usize>),
    Emphasis(Range<usize>),
    Strikethrough(Range<usize>),
    Link { text: Range<usize>, dest: Range<usize> },
    Image { alt: Range<usize>, dest: Range<usize> },
    Footnote(Range<usize>),
}

struct Candidate {
    start: usize,
    end: usize,
    piece: Piece,
}

/// Next double-char delimiter at or after `from`, outside code spans.
fn find_double(text: &str, from: usize, ch: u8, spans: &[CodeSpan]) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut p = from;
    while p + 1 < bytes.len() {
        if bytes[p] == ch && bytes[p + 1] == ch && !in_code(p, spans) && !in_code(p + 1, spans) {
            return Some(p);
        }
        p += 1;
    }
    None
}

/// Next single-char delimiter at or after `from`: not part of a run of two,
/// outside code spans.
fn find_single(text: &str, from: usize, ch: u8, spans: &[CodeSpan]) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut p = from;
    while p < bytes.len() {
        if bytes[p] == ch
            && bytes.get(p + 1) != Some(&ch)
            && (p == 0 || bytes[p - 1] != ch)
            && !in_code(p, spans)
        {
            return Some(p);
        }
        p += 1;
    }
    None
}

fn find_code(spans: &[CodeSpan], from: usize) -> Option<Candidate> {
    spans
        .iter()
        .find(|s| s.all.start >= from)
        .map(|s| Candidate {
            start: s.all.start,
            end: s.all.end,
            piece: Piece::Code(s.content.clone()),
        })
}

fn find_paired_double(text: &str, from: usize, ch: u8, spans: &[CodeSpan]) -> Option<(usize, Range<usize>, usize)> {
    let open = find_double(text, from, ch, spans)?;
    let close = find_double(text, open + 3, ch, spans)?;
    Some((open, open + 2..close, close + 2))
}

fn find_strong(text: &str, from: usize, spans: &[CodeSpan]) -> Option<Candidate> {
    find_paired_double(text, from, b'*', spans).map(|(start, content, end)| Candidate {
        start,
        end,
        piece: Piece::Strong(content),
    })
}

fn find_strikethrough(text: &str, from: usize, spans: &[CodeSpan]) -> Option<Candidate> {
    find_paired_double(text, from, b'~', spans).map(|(start, content, end)| Candidate {
        start,
        end,
        piece: Piece::Strikethrough(content),
    })
}

fn find_emphasis(text: &str, from: usize, spans: &[CodeSpan]) -> Option<Candidate> {
    let open = find_single(text, from, b'*', spans)?;
    let close = find_single(text, open + 2, b'*', spans)?;
    Some(Candidate {
        start: open,
        end: close + 1,
        piece: Piece::Emphasis(open + 1..close),
    })
}

/// Parse `[...](...)` starting at an opening bracket. Returns the bracketed
/// range, the parenthesised range, and the end offset.
fn bracket_paren(text: &str, open: usize, spans: &[CodeSpan]) -> Option<(Range<usize>, Range<usize>, usize)> {
    let bytes = text.as_bytes();
    let mut p = open + 1;
    let close_b = loop {
        if p >= bytes.len() {
            return None;
        }
        if bytes[p] == b']' && !in_code(p, spans) {
            break p;
        }
        p += 1;
    };
    if bytes.get(close_b + 1) != Some(&b'(') {
        return None;
    }
    let rel = text[close_b + 2..].find(')')?;
    let close_p = close_b + 2 + rel;
    Some((open + 1..close_b, close_b + 2..close_p, close_p + 1))
}

fn find_image(text: &str, from: usize, spans: &[CodeSpan]) -> Option<Candidate> {
    let mut search = from;
    while let Some(rel) = text[search..].find("![") {
        let p = search + rel;
        if !in_code(p, spans) {
            if let Some((alt, dest, end)) = bracket_paren(text, p + 1, spans) {
                return Some(Candidate {
                    start: p,
                    end,
                    piece: Piece::Image { alt, dest },
                });
            }
        }
        search = p + 1;
    }
    None
}

fn find_link(text: &str, from: usize, spans: &[CodeSpan]) -> Option<Candidate> {
    let mut search = from;
    while let Some(rel) = text[search..].find('[') {
        let p = search + rel;
        if !in_code(p, spans) {
            if let Some((txt, dest, end)) = bracket_paren(text, p, spans) {
                return Some(Candidate {
                    start: p,
                    end,
                    piece: Piece::Link { text: txt, dest },
                });
            }
        }
        search = p + 1;
    }
    None
}

fn valid_label(label: &str) -> bool {
    !label.is_empty()
        && !label.contains(['[', ']', '^'])
        && !label.chars().any(char::is_whitespace)
}

/// Footnote references are only candidates when their label is defined;
/// an unresolved reference stays literal text.
fn find_footnote(text: &str, from: usize, spans: &[CodeSpan], cx: &InlineCx) -> Option<Candidate> {
    let mut search = from;
    while let Some(rel) = text[search..].find("[^") {
        let p = search + rel;
        if !in_code(p, spans) {
            if let Some(rel_close) = text[p + 2..].find(']') {
                let close = p + 2 + rel_close;
                let label = &text[p + 2..close];
                if valid_label(label) && cx.defined(label) {
                    return Some(Candidate {
                        start: p,
                        end: close + 1,
                        piece: Piece::Footnote(p + 2..close),
                    });
                }
            }
        }
        search = p + 1;
    }
    None
}

/// Earliest candidate at or after `from`; ties go to the earlier entry in
/// the priority order (image before link, footnote before link).
fn next_candidate(text: &str, from: usize, spans: &[CodeSpan], cx: &InlineCx) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    let mut consider = |c: Option<Candidate>| {
        if let Some(c) = c {
            match &best {
                Some(b) if b.start <= c.start => {}
                _ => best = Some(c),
            }
        }
    };

    consider(find_code(spans, from));
    consider(find_image(text, from, spans));
    if cx.options.contains(Options::FOOTNOTES) {
        consider(find_footnote(text, from, spans, cx));
    }
    consider(find_link(text, from, spans));
    consider(find_strong(text, from, spans));
    if cx.options.contains(Options::STRIKETHROUGH) {
        consider(find_strikethrough(text, from, spans));
    }
    consider(find_emphasis(text, from, spans));
    best
}

/// Literal text between constructs; newlines become soft breaks.
fn flush_text(segment: &str, nodes: &mut Vec<RenderNode>) {
    for (i, part) in segment.split('\n').enumerate() {
        if i > 0 {
            nodes.push(RenderNode::new(NodeKind::SoftBreak));
        }
        if !part.is_empty() {
            nodes.push(RenderNode::text(part));
        }
    }
}

pub(crate) fn parse_inline(text: &str, cx: &mut InlineCx) -> Vec<RenderNode> {
    let spans = code_spans(text);
    let mut nodes = Vec::new();
    let mut plain = 0;
    let mut cursor = 0;

    while let Some(c) = next_candidate(text, cursor, &spans, cx) {
        flush_text(&text[plain..c.start], &mut nodes);
        match c.piece {
            Piece::Code(content) => {
                nodes.push(RenderNode::new(NodeKind::Code(SmolStr::new(&text[content]))));
            }
            Piece::Strong(content) => {
                let mut node = RenderNode::new(NodeKind::Strong);
                node.children = parse_inline(&text[content], cx);
                nodes.push(node);
            }
            Piece::Emphasis(content) => {
                let mut node = RenderNode::new(NodeKind::Emphasis);
                node.children = parse_inline(&text[content], cx);
                nodes.push(node);
            }
            Piece::Strikethrough(content) => {
                let mut node = RenderNode::new(NodeKind::Strikethrough);
                node.children = parse_inline(&text[content], cx);
                nodes.push(node);
            }
            Piece::Link { text: txt, dest } => {
                let mut node = RenderNode::new(NodeKind::Link {
                    dest: SmolStr::new(&text[dest]),
                });
                node.children = parse_inline(&text[txt], cx);
                nodes.push(node);
            }
            Piece::Image { alt, dest } => {
                nodes.push(RenderNode::new(NodeKind::Image {
                    dest: SmolStr::new(&text[dest]),
                    alt: SmolStr::new(&text[alt]),
                }));
            }
            Piece::Footnote(label) => {
                let label = &text[label];
                match cx.reference(label) {
                    Some(number) => nodes.push(RenderNode::new(NodeKind::FootnoteReference {
                        label: SmolStr::new(label),
                        number,
                    })),
                    None => flush_text(&text[c.start..c.end], &mut nodes),
                }
            }
        }
        plain = c.end;
        cursor = c.end;
    }
    flush_text(&text[plain..], &mut nodes);
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<RenderNode> {
        let defs = HashMap::new();
        let mut cx = InlineCx::new(Options::all(), &defs);
        parse_inline(text, &mut cx)
    }

    fn kinds(nodes: &[RenderNode]) -> Vec<&NodeKind> {
        nodes.iter().map(|n| &n.kind).collect()
    }

    #[test]
    fn test_plain_text() {
        let nodes = parse("hello world");
        assert_eq!(nodes, vec![RenderNode::text("hello world")]);
    }

    #[test]
    fn test_strong_emphasis_code() {
        let nodes = parse("**a** *b* `c`");
        assert_eq!(nodes.len(), 5);
        assert_eq!(nodes[0].kind, NodeKind::Strong);
        assert_eq!(nodes[0].children, vec![RenderNode::text("a")]);
        assert_eq!(nodes[2].kind, NodeKind::Emphasis);
        assert_eq!(nodes[4].kind, NodeKind::Code("c".into()));
    }

    #[test]
    fn test_unmatched_delimiters_stay_literal() {
        assert_eq!(parse("a ** b"), vec![RenderNode::text("a ** b")]);
        assert_eq!(parse("*a"), vec![RenderNode::text("*a")]);
        assert_eq!(parse("`x"), vec![RenderNode::text("`x")]);
    }

    #[test]
    fn test_code_span_suppresses_markers() {
        let nodes = parse("`**not bold**`");
        assert_eq!(
            kinds(&nodes),
            vec![&NodeKind::Code("**not bold**".into())]
        );

        // The closing ** sits inside a code span, so the bold never pairs.
        let nodes = parse("a ** b `c**d` e");
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0], RenderNode::text("a ** b "));
        assert_eq!(nodes[1].kind, NodeKind::Code("c**d".into()));
        assert_eq!(nodes[2], RenderNode::text(" e"));
    }

    #[test]
    fn test_bold_containing_code_span() {
        let nodes = parse("**a `b` c**");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].kind, NodeKind::Strong);
        assert_eq!(nodes[0].children.len(), 3);
        assert_eq!(nodes[0].children[1].kind, NodeKind::Code("b".into()));
    }

    #[test]
    fn test_sequential_pairing() {
        let nodes = parse("**a** no **b**");
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].children, vec![RenderNode::text("a")]);
        assert_eq!(nodes[2].children, vec![RenderNode::text("b")]);
    }

    #[test]
    fn test_emphasis_ignores_strong_delimiters() {
        // No single-star pair exists here; the double stars pair as strong.
        let nodes = parse("**x**");
        assert_eq!(kinds(&nodes), vec![&NodeKind::Strong]);
    }

    #[test]
    fn test_link_and_image() {
        let nodes = parse("see [docs](https://example.com) and ![logo](img.png)");
        assert_eq!(nodes.len(), 4);
        assert_eq!(
            nodes[1].kind,
            NodeKind::Link {
                dest: "https://example.com".into()
            }
        );
        assert_eq!(nodes[1].children, vec![RenderNode::text("docs")]);
        assert_eq!(
            nodes[3].kind,
            NodeKind::Image {
                dest: "img.png".into(),
                alt: "logo".into()
            }
        );
    }

    #[test]
    fn test_malformed_link_is_literal() {
        assert_eq!(parse("[a](b"), vec![RenderNode::text("[a](b")]);
        assert_eq!(parse("[a] (b)"), vec![RenderNode::text("[a] (b)")]);
    }

    #[test]
    fn test_nested_formatting_in_link_text() {
        let nodes = parse("[**bold** link](u)");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].children.len(), 2);
        assert_eq!(nodes[0].children[0].kind, NodeKind::Strong);
    }

    #[test]
    fn test_footnote_reference_resolution() {
        let mut defs = HashMap::new();
        defs.insert(SmolStr::new("a"), "def".to_string());
        let mut cx = InlineCx::new(Options::all(), &defs);

        let nodes = parse_inline("x[^a] y[^missing] z[^a]", &mut cx);
        assert_eq!(
            nodes[1].kind,
            NodeKind::FootnoteReference {
                label: "a".into(),
                number: 1
            }
        );
        // Unresolved stays literal, merged into surrounding text.
        assert_eq!(nodes[2], RenderNode::text(" y[^missing] z"));
        // Same label reuses its number.
        assert_eq!(
            nodes[3].kind,
            NodeKind::FootnoteReference {
                label: "a".into(),
                number: 1
            }
        );
        assert_eq!(cx.order.len(), 1);
    }

    #[test]
    fn test_soft_break() {
        let nodes = parse("one\ntwo");
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1].kind, NodeKind::SoftBreak);
    }

    #[test]
    fn test_strikethrough_option_gate() {
        let defs = HashMap::new();
        let mut cx = InlineCx::new(Options::all() - Options::STRIKETHROUGH, &defs);
        let nodes = parse_inline("~~gone~~", &mut cx);
        assert_eq!(nodes, vec![RenderNode::text("~~gone~~")]);
    }
}
