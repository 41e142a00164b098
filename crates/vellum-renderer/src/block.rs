//! Block-level parsing: a single line-based pass over the buffer.
//!
//! Dispatch order per line is fence, quote, heading, rule, list, table,
//! paragraph. Footnote definitions are collected up front (outside fenced
//! regions) and their definition blocks are appended after the body, in
//! first-reference order.

use std::collections::{HashMap, HashSet};

use bitflags::bitflags;
use smol_str::SmolStr;

use crate::inline::{InlineCx, parse_inline};
use crate::syntax::{self, ListMarker, MarkerKind};
use crate::tree::{Alignment, HeadingLevel, NodeKind, RenderNode};

bitflags! {
    /// Dialect extension switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Options: u8 {
        const TABLES = 1 << 0;
        const FOOTNOTES = 1 << 1;
        const TASKLISTS = 1 << 2;
        const STRIKETHROUGH = 1 << 3;
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::all()
    }
}

/// Render with every extension enabled.
pub fn render(source: &str) -> RenderNode {
    render_with_options(source, Options::default())
}

/// One full parse pass: blocks, then inline spans within each block.
pub fn render_with_options(source: &str, options: Options) -> RenderNode {
    let (defs, def_lines) = collect_definitions(source, options);
    let mut cx = InlineCx::new(options, &defs);
    let lines: Vec<&str> = source.split('\n').collect();

    let mut doc = RenderNode::new(NodeKind::Document);
    doc.children = parse_blocks(&lines, &def_lines, options, &mut cx);
    if options.contains(Options::FOOTNOTES) {
        append_footnotes(&mut doc, &mut cx);
    }
    tracing::trace!(blocks = doc.children.len(), "render pass");
    doc
}

/// Footnote definitions by label, plus the line indices they occupy.
/// First definition of a label wins; fenced regions are opaque.
fn collect_definitions(
    source: &str,
    options: Options,
) -> (HashMap<SmolStr, String>, HashSet<usize>) {
    let mut defs = HashMap::new();
    let mut def_lines = HashSet::new();
    if !options.contains(Options::FOOTNOTES) {
        return (defs, def_lines);
    }

    let mut in_fence = false;
    for (idx, line) in source.split('\n').enumerate() {
        if syntax::fence_marker(line).is_some() {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some((label, content)) = syntax::footnote_definition(line) {
            defs.entry(SmolStr::new(label))
                .or_insert_with(|| content.to_string());
            def_lines.insert(idx);
        }
    }
    (defs, def_lines)
}

/// True when a table opens at `i`: a row line followed by a separator row.
fn table_starts_at(lines: &[&str], i: usize, options: Options) -> bool {
    options.contains(Options::TABLES)
        && lines[i].contains('|')
        && i + 1 < lines.len()
        && separator_alignments(lines[i + 1]).is_some()
}

/// True when line `i` opens a non-paragraph block (or cannot belong to one).
fn breaks_paragraph(lines: &[&str], i: usize, skip: &HashSet<usize>, options: Options) -> bool {
    let line = lines[i];
    skip.contains(&i)
        || syntax::is_blank(line)
        || syntax::fence_marker(line).is_some()
        || syntax::quote_marker(line).is_some()
        || syntax::heading_marker(line).is_some()
        || syntax::is_rule(line)
        || syntax::list_marker(line).is_some()
        || table_starts_at(lines, i, options)
}

fn parse_blocks(
    lines: &[&str],
    skip: &HashSet<usize>,
    options: Options,
    cx: &mut InlineCx,
) -> Vec<RenderNode> {
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if skip.contains(&i) || syntax::is_blank(lines[i]) {
            i += 1;
            continue;
        }
        let line = lines[i];

        if let Some(info) = syntax::fence_marker(line) {
            let lang = info.split(' ').next().filter(|l| !l.is_empty());
            let language = lang.map(SmolStr::new);
            i += 1;
            let start = i;
            while i < lines.len() && syntax::fence_marker(lines[i]) != Some("") {
                i += 1;
            }
            let mut literal = lines[start..i].join("\n");
            if !literal.is_empty() {
                literal.push('\n');
            }
            // Tolerate a missing closing fence at end of input.
            if i < lines.len() {
                i += 1;
            }
            let mut block = RenderNode::new(NodeKind::CodeBlock { language });
            block.push(RenderNode::text(literal));
            blocks.push(block);
            continue;
        }

        if syntax::quote_marker(line).is_some() {
            let start = i;
            while i < lines.len() {
                match syntax::quote_marker(lines[i]) {
                    Some(_) => i += 1,
                    None => break,
                }
            }
            // Prefix chars are ASCII, so char counts slice as bytes.
            let inner: Vec<&str> = lines[start..i]
                .iter()
                .map(|l| {
                    let consumed = syntax::quote_marker(l).unwrap_or(0);
                    &l[consumed..]
                })
                .collect();
            let mut quote = RenderNode::new(NodeKind::BlockQuote);
            quote.children = parse_blocks(&inner, &HashSet::new(), options, cx);
            blocks.push(quote);
            continue;
        }

        if let Some((level, consumed)) = syntax::heading_marker(line) {
            if let Some(level) = HeadingLevel::new(level) {
                let mut heading = RenderNode::new(NodeKind::Heading(level));
                heading.children = parse_inline(&line[consumed..], cx);
                blocks.push(heading);
            }
            i += 1;
            continue;
        }

        if syntax::is_rule(line) {
            blocks.push(RenderNode::new(NodeKind::Rule));
            i += 1;
            continue;
        }

        if syntax::list_marker(line).is_some() {
            let mut items: Vec<(ListMarker, &str)> = Vec::new();
            while i < lines.len() {
                let Some(mut marker) = syntax::list_marker(lines[i]) else {
                    break;
                };
                // Without the tasklist extension, `- [x] ` is a plain
                // bullet and the checkbox text stays in the content.
                if marker.kind.is_task() && !options.contains(Options::TASKLISTS) {
                    marker = ListMarker {
                        kind: MarkerKind::Bullet('-'),
                        content_start: marker.content_start - 4,
                        ..marker
                    };
                }
                items.push((marker, &lines[i][marker.content_start..]));
                i += 1;
            }
            let mut pos = 0;
            while pos < items.len() {
                blocks.push(build_list(&items, &mut pos, options, cx));
            }
            continue;
        }

        if table_starts_at(lines, i, options) {
            blocks.push(parse_table(lines, &mut i, cx));
            continue;
        }

        let start = i;
        i += 1;
        while i < lines.len() && !breaks_paragraph(lines, i, skip, options) {
            i += 1;
        }
        let text = lines[start..i].join("\n");
        let mut para = RenderNode::new(NodeKind::Paragraph);
        para.children = parse_inline(&text, cx);
        blocks.push(para);
    }

    blocks
}

/// Ordered and unordered items never share a list; bullets and tasks do.
fn grouped(a: MarkerKind, b: MarkerKind) -> bool {
    a.is_ordered() == b.is_ordered()
}

/// Build one list whose depth and family are set by the item at `*pos`.
/// Deeper runs nest into the preceding item; a family change or shallower
/// item ends the list.
fn build_list(
    items: &[(ListMarker, &str)],
    pos: &mut usize,
    options: Options,
    cx: &mut InlineCx,
) -> RenderNode {
    let (first, _) = items[*pos];
    let depth = first.depth();
    let start = match first.kind {
        MarkerKind::Ordered(n) => Some(n),
        _ => None,
    };
    let mut list = RenderNode::new(NodeKind::List { start });

    while *pos < items.len() {
        let (marker, content) = items[*pos];
        if marker.depth() < depth {
            break;
        }
        if marker.depth() > depth {
            let nested = build_list(items, pos, options, cx);
            match list.children.last_mut() {
                Some(item) => item.push(nested),
                None => list.push(nested),
            }
            continue;
        }
        if !grouped(marker.kind, first.kind) {
            break;
        }
        let task = match marker.kind {
            MarkerKind::Task(checked) => Some(checked),
            _ => None,
        };
        let mut item = RenderNode::new(NodeKind::Item { task });
        item.children = parse_inline(content, cx);
        list.push(item);
        *pos += 1;
    }
    list
}

/// Split a row into trimmed cells, tolerating optional outer pipes.
fn split_row(line: &str) -> Vec<&str> {
    let t = line.trim();
    let t = t.strip_prefix('|').unwrap_or(t);
    let t = t.strip_suffix('|').unwrap_or(t);
    t.split('|').map(str::trim).collect()
}

/// Parse a separator row (`---`, `:--`, `--:`, `:-:` cells) into alignments.
fn separator_alignments(line: &str) -> Option<Vec<Alignment>> {
    let t = line.trim();
    if !t.contains('-') || !t.bytes().all(|b| matches!(b, b'-' | b':' | b'|' | b' ' | b'\t')) {
        return None;
    }
    let mut out = Vec::new();
    for cell in split_row(line) {
        let left = cell.starts_with(':');
        let right = cell.len() > 1 && cell.ends_with(':');
        let dashes = cell.trim_start_matches(':').trim_end_matches(':');
        if dashes.is_empty() || dashes.bytes().any(|b| b != b'-') {
            return None;
        }
        out.push(match (left, right) {
            (true, true) => Alignment::Center,
            (true, false) => Alignment::Left,
            (false, true) => Alignment::Right,
            (false, false) => Alignment::None,
        });
    }
    Some(out)
}

/// The header row fixes the column count; the separator confirms the table
/// and sets alignment; body rows are padded or truncated to fit.
fn parse_table(lines: &[&str], i: &mut usize, cx: &mut InlineCx) -> RenderNode {
    let header_cells = split_row(lines[*i]);
    let cols = header_cells.len();
    let mut alignments = separator_alignments(lines[*i + 1]).unwrap_or_default();
    alignments.resize(cols, Alignment::None);

    let mut table = RenderNode::new(NodeKind::Table { alignments });
    let mut head = RenderNode::new(NodeKind::TableHead);
    for cell in header_cells {
        let mut node = RenderNode::new(NodeKind::TableCell);
        node.children = parse_inline(cell, cx);
        head.push(node);
    }
    table.push(head);
    *i += 2;

    while *i < lines.len() && lines[*i].contains('|') && !syntax::is_blank(lines[*i]) {
        let mut cells = split_row(lines[*i]);
        cells.resize(cols, "");
        let mut row = RenderNode::new(NodeKind::TableRow);
        for cell in cells {
            let mut node = RenderNode::new(NodeKind::TableCell);
            node.children = parse_inline(cell, cx);
            row.push(node);
        }
        table.push(row);
        *i += 1;
    }
    table
}

/// Append definition blocks for every referenced label, in first-reference
/// order. References inside definition text can extend the list; the loop
/// re-checks the length so chained definitions resolve too.
fn append_footnotes(doc: &mut RenderNode, cx: &mut InlineCx) {
    let mut idx = 0;
    while idx < cx.order.len() {
        let label = cx.order[idx].clone();
        let number = idx + 1;
        if let Some(content) = cx.definition(&label) {
            let mut def = RenderNode::new(NodeKind::FootnoteDefinition { label, number });
            let mut para = RenderNode::new(NodeKind::Paragraph);
            para.children = parse_inline(content, cx);
            def.push(para);
            doc.push(def);
        }
        idx += 1;
    }
}
