//! The formatting engine: `apply_format` and the command implementations
//! behind it.
//!
//! Every operation reads the caller's buffer, plans its edits as splices,
//! applies them to a working rope back to front, and returns the rewritten
//! buffer with the selection remapped. The caller's buffer is never
//! touched; a refused command comes back as `Blocked` with nothing else
//! done.

use vellum_renderer::HeadingLevel;
use vellum_renderer::syntax::{self, MarkerKind};

use crate::span::{inside_fence, line_at, line_end, line_start, locate_span};
use crate::text::{EditorRope, TextBuffer};
use crate::types::{
    Blocked, EditOutcome, FormatCommand, FormatSpan, ImageParams, LinkParams, Selection, SpanKind,
    TableParams,
};

/// Apply a formatting command to the selection.
///
/// Out-of-range selections are clamped. Malformed markup degrades to
/// best-effort re-synthesis; the only refusal is a structural insertion
/// into a fenced code block.
pub fn apply_format<B: TextBuffer>(
    buf: &B,
    selection: Selection,
    command: &FormatCommand,
) -> Result<EditOutcome, Blocked> {
    let sel = selection.clamp(buf.len_chars());
    tracing::debug!(?command, anchor = sel.anchor, head = sel.head, "apply format");
    match command {
        FormatCommand::Bold => Ok(toggle_inline(buf, sel, SpanKind::Bold)),
        FormatCommand::Italic => Ok(toggle_inline(buf, sel, SpanKind::Italic)),
        FormatCommand::InlineCode => Ok(toggle_inline(buf, sel, SpanKind::InlineCode)),
        FormatCommand::Strikethrough => Ok(toggle_inline(buf, sel, SpanKind::Strikethrough)),
        FormatCommand::Heading(level) => Ok(toggle_heading(buf, sel, *level)),
        FormatCommand::BulletList => Ok(toggle_list(buf, sel, MarkerKind::Bullet('-'))),
        FormatCommand::NumberedList => Ok(toggle_list(buf, sel, MarkerKind::Ordered(1))),
        FormatCommand::TaskList => Ok(toggle_list(buf, sel, MarkerKind::Task(false))),
        FormatCommand::BlockQuote => Ok(toggle_quote(buf, sel)),
        FormatCommand::InsertLink(params) => insert_link(buf, sel, params),
        FormatCommand::InsertImage(params) => insert_image(buf, sel, params),
        FormatCommand::InsertTable(params) => insert_table(buf, sel, params),
        FormatCommand::InsertCodeBlock { language } => {
            insert_code_block(buf, sel, language.as_deref())
        }
        FormatCommand::InsertRule => insert_rule(buf, sel),
    }
}

/// One planned replacement at an absolute char offset.
pub(crate) struct Splice {
    pub at: usize,
    pub remove: usize,
    pub insert: String,
}

impl Splice {
    fn delta(&self) -> i64 {
        self.insert.chars().count() as i64 - self.remove as i64
    }
}

/// Apply ascending, non-overlapping splices, back to front so earlier
/// offsets stay valid.
pub(crate) fn apply_splices(work: &mut EditorRope, splices: &[Splice]) {
    for s in splices.iter().rev() {
        work.replace(s.at..s.at + s.remove, &s.insert);
    }
}

/// Map a pre-edit offset through the splices. An offset inside a replaced
/// range clamps into the replacement.
pub(crate) fn remap(offset: usize, splices: &[Splice]) -> usize {
    let mut delta = 0i64;
    for s in splices {
        if s.at + s.remove <= offset {
            delta += s.delta();
        } else if s.at <= offset {
            let into = (offset - s.at).min(s.insert.chars().count());
            return ((s.at + into) as i64 + delta) as usize;
        } else {
            break;
        }
    }
    (offset as i64 + delta) as usize
}

pub(crate) fn rope_of<B: TextBuffer>(buf: &B) -> EditorRope {
    EditorRope::from_str(&buf.to_string())
}

fn finish<B: TextBuffer>(buf: &B, sel: Selection, splices: Vec<Splice>) -> EditOutcome {
    let mut work = rope_of(buf);
    apply_splices(&mut work, &splices);
    EditOutcome::new(
        work.to_string(),
        Selection::new(remap(sel.anchor, &splices), remap(sel.head, &splices)),
    )
}

fn toggle_inline<B: TextBuffer>(buf: &B, sel: Selection, kind: SpanKind) -> EditOutcome {
    let Some(marker) = kind.marker() else {
        return EditOutcome::new(buf.to_string(), sel);
    };
    let mlen = marker.chars().count();

    // An active span of this kind around the selection toggles off.
    if let Some(span) = locate_span(buf, sel.start(), kind) {
        if span.open.start <= sel.start() && sel.end() <= span.close.end {
            return unwrap_span(buf, sel, &span);
        }
    }

    if sel.is_collapsed() {
        let caret = sel.head;
        let placeholder = kind.placeholder();
        let mut work = rope_of(buf);
        work.insert(caret, &format!("{marker}{placeholder}{marker}"));
        let start = caret + mlen;
        EditOutcome::new(
            work.to_string(),
            Selection::new(start, start + placeholder.chars().count()),
        )
    } else {
        let mut work = rope_of(buf);
        // Insert the closing delimiter first so the start offset stays valid.
        work.insert(sel.end(), marker);
        work.insert(sel.start(), marker);
        EditOutcome::caret(work.to_string(), sel.end() + mlen * 2)
    }
}

fn unwrap_span<B: TextBuffer>(buf: &B, sel: Selection, span: &FormatSpan) -> EditOutcome {
    let mut work = rope_of(buf);
    // Remove the closing delimiter first so the opener's offsets stay valid.
    work.delete(span.close.clone());
    work.delete(span.open.clone());
    EditOutcome::new(
        work.to_string(),
        Selection::new(
            remap_unwrap(sel.anchor, span),
            remap_unwrap(sel.head, span),
        ),
    )
}

/// Where a pre-unwrap offset lands once both delimiters are gone. Offsets
/// inside a delimiter collapse to its inner edge.
fn remap_unwrap(offset: usize, span: &FormatSpan) -> usize {
    let open_len = span.open.len();
    if offset <= span.open.start {
        offset
    } else if offset <= span.open.end {
        span.open.start
    } else if offset <= span.close.start {
        offset - open_len
    } else if offset <= span.close.end {
        span.close.start - open_len
    } else {
        offset - open_len - span.close.len()
    }
}

/// Start offsets of every line the selection touches.
fn selected_line_starts<B: TextBuffer>(buf: &B, sel: Selection) -> Vec<usize> {
    let last_offset = if sel.is_collapsed() {
        sel.end()
    } else {
        // A selection ending at a line start does not touch that line.
        sel.end() - 1
    };
    let last = line_start(buf, last_offset);
    let mut starts = Vec::new();
    let mut pos = line_start(buf, sel.start());
    loop {
        starts.push(pos);
        if pos >= last {
            break;
        }
        let end = line_end(buf, pos);
        if end >= buf.len_chars() {
            break;
        }
        pos = end + 1;
    }
    starts
}

fn toggle_heading<B: TextBuffer>(buf: &B, sel: Selection, level: HeadingLevel) -> EditOutcome {
    let mark = format!("{} ", "#".repeat(usize::from(level.level())));
    let mut splices = Vec::new();
    for start in selected_line_starts(buf, sel) {
        let (_, line) = line_at(buf, start);
        // Heading markers live after a list marker when both are present.
        let base = syntax::list_marker(&line).map(|m| m.content_start).unwrap_or(0);
        let splice = match syntax::heading_marker(&line[base..]) {
            Some((found, consumed)) if found == level.level() => Splice {
                at: start + base,
                remove: consumed,
                insert: String::new(),
            },
            Some((_, consumed)) => Splice {
                at: start + base,
                remove: consumed,
                insert: mark.clone(),
            },
            None => Splice {
                at: start + base,
                remove: 0,
                insert: mark.clone(),
            },
        };
        splices.push(splice);
    }
    finish(buf, sel, splices)
}

fn marker_text(kind: MarkerKind) -> &'static str {
    match kind {
        MarkerKind::Bullet(_) => "- ",
        MarkerKind::Ordered(_) => "1. ",
        MarkerKind::Task(_) => "- [ ] ",
    }
}

fn toggle_list<B: TextBuffer>(buf: &B, sel: Selection, target: MarkerKind) -> EditOutcome {
    let mut splices = Vec::new();
    for start in selected_line_starts(buf, sel) {
        let (_, line) = line_at(buf, start);
        let splice = match syntax::list_marker(&line) {
            // Same family toggles off; a different family switches in place.
            Some(m) if m.kind.same_family(target) => Splice {
                at: start + m.indent_chars,
                remove: m.marker_len(),
                insert: String::new(),
            },
            Some(m) => Splice {
                at: start + m.indent_chars,
                remove: m.marker_len(),
                insert: marker_text(target).to_string(),
            },
            None => {
                let (_, indent_chars) = syntax::leading_indent(&line);
                Splice {
                    at: start + indent_chars,
                    remove: 0,
                    insert: marker_text(target).to_string(),
                }
            }
        };
        splices.push(splice);
    }
    let outcome = finish(buf, sel, splices);

    if target.is_ordered() {
        // Fresh markers all say `1. `; the renumber pass fixes the run.
        let rope = EditorRope::from_str(&outcome.buffer);
        return crate::list::renumber_list(&rope, outcome.selection);
    }
    outcome
}

fn toggle_quote<B: TextBuffer>(buf: &B, sel: Selection) -> EditOutcome {
    let starts = selected_line_starts(buf, sel);
    let all_quoted = starts.iter().all(|&s| {
        let (_, line) = line_at(buf, s);
        syntax::quote_marker(&line).is_some()
    });
    let mut splices = Vec::new();
    for start in starts {
        let (_, line) = line_at(buf, start);
        match syntax::quote_marker(&line) {
            Some(consumed) if all_quoted => splices.push(Splice {
                at: start,
                remove: consumed,
                insert: String::new(),
            }),
            Some(_) => {}
            None => splices.push(Splice {
                at: start,
                remove: 0,
                insert: "> ".to_string(),
            }),
        }
    }
    finish(buf, sel, splices)
}

fn guard_fence<B: TextBuffer>(buf: &B, sel: Selection) -> Result<(), Blocked> {
    if inside_fence(buf, sel.start()) || inside_fence(buf, sel.end()) {
        tracing::debug!("insertion refused inside code fence");
        return Err(Blocked::InsideCodeBlock);
    }
    Ok(())
}

fn insert_link<B: TextBuffer>(
    buf: &B,
    sel: Selection,
    params: &LinkParams,
) -> Result<EditOutcome, Blocked> {
    guard_fence(buf, sel)?;
    let snippet = format!("[{}]({})", params.text, params.url);
    let mut work = rope_of(buf);
    work.replace(sel.to_range(), &snippet);
    // Selection lands on the link-text slot.
    let text_start = sel.start() + 1;
    Ok(EditOutcome::new(
        work.to_string(),
        Selection::new(text_start, text_start + params.text.chars().count()),
    ))
}

fn insert_image<B: TextBuffer>(
    buf: &B,
    sel: Selection,
    params: &ImageParams,
) -> Result<EditOutcome, Blocked> {
    guard_fence(buf, sel)?;
    let snippet = format!("![{}]({})", params.alt, params.url);
    let mut work = rope_of(buf);
    work.replace(sel.to_range(), &snippet);
    let alt_start = sel.start() + 2;
    Ok(EditOutcome::new(
        work.to_string(),
        Selection::new(alt_start, alt_start + params.alt.chars().count()),
    ))
}

/// Replace the selection with a block snippet, padding with newlines so the
/// snippet starts and ends at line boundaries. The resulting selection is
/// `select_len` chars starting `caret_in_core` chars into the snippet.
fn insert_block_snippet<B: TextBuffer>(
    buf: &B,
    sel: Selection,
    core: &str,
    caret_in_core: usize,
    select_len: usize,
) -> Result<EditOutcome, Blocked> {
    guard_fence(buf, sel)?;
    let needs_prefix = sel.start() > 0 && buf.char_at(sel.start() - 1) != Some('\n');
    let needs_suffix = sel.end() < buf.len_chars() && buf.char_at(sel.end()) != Some('\n');
    let mut snippet = String::new();
    if needs_prefix {
        snippet.push('\n');
    }
    snippet.push_str(core);
    if needs_suffix {
        snippet.push('\n');
    }
    let mut work = rope_of(buf);
    work.replace(sel.to_range(), &snippet);
    let base = sel.start() + usize::from(needs_prefix) + caret_in_core;
    Ok(EditOutcome::new(
        work.to_string(),
        Selection::new(base, base + select_len),
    ))
}

fn insert_table<B: TextBuffer>(
    buf: &B,
    sel: Selection,
    params: &TableParams,
) -> Result<EditOutcome, Blocked> {
    // `rows` counts the header; at least one body row, at least one column.
    let rows = params.rows.max(2);
    let cols = params.cols.max(1);
    let mut core = String::new();
    for _ in 0..cols {
        core.push_str("| Header ");
    }
    core.push_str("|\n");
    for _ in 0..cols {
        core.push_str("| --- ");
    }
    core.push_str("|\n");
    for r in 0..rows - 1 {
        for _ in 0..cols {
            core.push_str("| Cell ");
        }
        core.push('|');
        if r + 1 < rows - 1 {
            core.push('\n');
        }
    }
    // Selection covers the first Header placeholder.
    insert_block_snippet(buf, sel, &core, 2, 6)
}

fn insert_code_block<B: TextBuffer>(
    buf: &B,
    sel: Selection,
    language: Option<&str>,
) -> Result<EditOutcome, Blocked> {
    let lang = language.unwrap_or("");
    let core = format!("```{lang}\n\n```");
    // Caret on the empty line between the fences.
    let caret = 3 + lang.chars().count() + 1;
    insert_block_snippet(buf, sel, &core, caret, 0)
}

fn insert_rule<B: TextBuffer>(buf: &B, sel: Selection) -> Result<EditOutcome, Blocked> {
    insert_block_snippet(buf, sel, "---", 3, 0)
}
