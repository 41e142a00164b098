//! List handling for the Enter key: continuation, termination, and
//! renumbering of ordered runs.

use vellum_renderer::syntax::{self, MarkerKind};

use crate::format::{Splice, apply_splices, remap, rope_of};
use crate::span::{inside_fence, line_at};
use crate::text::TextBuffer;
use crate::types::{EditOutcome, Selection};

/// The list context at an offset.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum ListState {
    /// The offset's line is not a list item.
    Outside,
    Ordered { depth: usize, number: u64 },
    Unordered { depth: usize, marker: char },
    Task { depth: usize, checked: bool },
}

/// Report the list context at `offset`. Lines inside a code fence are
/// never list items, whatever they look like.
pub fn list_state<B: TextBuffer>(buf: &B, offset: usize) -> ListState {
    if inside_fence(buf, offset) {
        return ListState::Outside;
    }
    let (_, line) = line_at(buf, offset);
    match syntax::list_marker(&line) {
        Some(m) => match m.kind {
            MarkerKind::Ordered(number) => ListState::Ordered { depth: m.depth(), number },
            MarkerKind::Bullet(marker) => ListState::Unordered { depth: m.depth(), marker },
            MarkerKind::Task(checked) => ListState::Task { depth: m.depth(), checked },
        },
        None => ListState::Outside,
    }
}

/// What pressing Enter did to the list structure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnterOutcome {
    /// The caret is not on a list item; the caller inserts its own newline.
    NotInList,
    /// A new item was started below the current one.
    Continued(EditOutcome),
    /// The empty item was removed and the list ends here.
    Terminated(EditOutcome),
}

/// Handle Enter pressed at `selection.head` on a list item.
///
/// An item with content splits at the caret and the remainder moves onto a
/// fresh item with the same indent and kind. An item that is nothing but
/// its marker terminates the list instead. A caret inside the marker
/// splits at the content start, never mid-marker.
pub fn handle_enter_in_list<B: TextBuffer>(buf: &B, selection: Selection) -> EnterOutcome {
    let sel = selection.clamp(buf.len_chars());
    let caret = sel.head;
    if inside_fence(buf, caret) {
        return EnterOutcome::NotInList;
    }
    let (start, line) = line_at(buf, caret);
    let Some(marker) = syntax::list_marker(&line) else {
        return EnterOutcome::NotInList;
    };
    let end = start + line.chars().count();
    let content_start = start + marker.content_start;

    if content_start == end {
        tracing::trace!("empty item terminates list");
        let mut work = rope_of(buf);
        work.delete(start..content_start);
        return EnterOutcome::Terminated(EditOutcome::caret(work.to_string(), start));
    }

    let split = caret.clamp(content_start, end);
    let indent: String = line.chars().take(marker.indent_chars).collect();
    let insert = format!("\n{indent}{}", marker.continuation());
    let mut work = rope_of(buf);
    work.insert(split, &insert);
    let caret_after = split + insert.chars().count();

    let outcome = if marker.kind.is_ordered() {
        renumber_list(&work, Selection::collapsed(caret_after))
    } else {
        EditOutcome::caret(work.to_string(), caret_after)
    };
    EnterOutcome::Continued(outcome)
}

/// Renumber the ordered run around `selection.head` to count up by one
/// from the run's first number.
///
/// The run extends over consecutive ordered lines at the same depth; any
/// other line, blank lines included, ends it in both directions. When the
/// head's line is not an ordered item the buffer comes back unchanged.
pub fn renumber_list<B: TextBuffer>(buf: &B, selection: Selection) -> EditOutcome {
    let sel = selection.clamp(buf.len_chars());
    let (cur_start, cur_line) = line_at(buf, sel.head);
    let depth = match syntax::list_marker(&cur_line) {
        Some(m) if m.kind.is_ordered() => m.depth(),
        _ => return EditOutcome::new(buf.to_string(), sel),
    };

    // Walk back to the first consecutive ordered line at this depth.
    let mut first_start = cur_start;
    while first_start > 0 {
        let (prev_start, prev_line) = line_at(buf, first_start - 1);
        match syntax::list_marker(&prev_line) {
            Some(m) if m.kind.is_ordered() && m.depth() == depth => first_start = prev_start,
            _ => break,
        }
    }

    // The run keeps whatever number it starts with.
    let (_, first_line) = line_at(buf, first_start);
    let start_number = match syntax::list_marker(&first_line).map(|m| m.kind) {
        Some(MarkerKind::Ordered(n)) => n,
        _ => 1,
    };

    let mut splices = Vec::new();
    let mut expected = start_number;
    let mut pos = first_start;
    loop {
        let (line_pos, line) = line_at(buf, pos);
        match syntax::list_marker(&line) {
            Some(m) if m.kind.is_ordered() && m.depth() == depth => {
                if m.kind != MarkerKind::Ordered(expected) {
                    splices.push(Splice {
                        at: line_pos + m.indent_chars,
                        remove: m.marker_len(),
                        insert: format!("{expected}. "),
                    });
                }
                expected = expected.saturating_add(1);
            }
            _ => break,
        }
        let line_end = line_pos + line.chars().count();
        if line_end >= buf.len_chars() {
            break;
        }
        pos = line_end + 1;
    }

    if splices.is_empty() {
        return EditOutcome::new(buf.to_string(), sel);
    }
    tracing::trace!(rewrites = splices.len(), "renumber pass");
    let mut work = rope_of(buf);
    apply_splices(&mut work, &splices);
    EditOutcome::new(
        work.to_string(),
        Selection::new(remap(sel.anchor, &splices), remap(sel.head, &splices)),
    )
}
