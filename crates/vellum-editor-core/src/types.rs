//! Core editor types: selection, format spans, commands, and outcomes.
//!
//! These types are framework-agnostic; the orchestration layer owns the
//! buffer and the selection and hands both in by value for every call.

use std::ops::Range;

use smol_str::SmolStr;
use vellum_renderer::HeadingLevel;

/// A text selection with anchor and head.
///
/// When anchor == head, this is a cursor position (collapsed selection).
/// The head is the end that moves when extending.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Where selection started
    pub anchor: usize,
    /// Where cursor is now
    pub head: usize,
}

impl Selection {
    /// Create a new selection.
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Create a collapsed selection (cursor position).
    pub fn collapsed(offset: usize) -> Self {
        Self {
            anchor: offset,
            head: offset,
        }
    }

    /// Get the start (lower bound) of the selection.
    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    /// Get the end (upper bound) of the selection.
    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// Check if the selection is collapsed (empty, cursor only).
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// Check if an offset is within the selection.
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start() && offset < self.end()
    }

    /// Get the selection length.
    pub fn len(&self) -> usize {
        self.end() - self.start()
    }

    /// Check if empty (same as is_collapsed).
    pub fn is_empty(&self) -> bool {
        self.is_collapsed()
    }

    /// Convert to a Range<usize> (ordered).
    pub fn to_range(&self) -> Range<usize> {
        self.start()..self.end()
    }

    /// Check if the selection is backwards (head before anchor).
    pub fn is_backwards(&self) -> bool {
        self.head < self.anchor
    }

    /// Clamp both ends into a buffer of `len` chars. Out-of-range
    /// selections degrade, they are never an error.
    pub fn clamp(&self, len: usize) -> Self {
        Self {
            anchor: self.anchor.min(len),
            head: self.head.min(len),
        }
    }
}

/// Result of an engine call: the rewritten buffer plus where the selection
/// lands in it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditOutcome {
    pub buffer: String,
    pub selection: Selection,
}

impl EditOutcome {
    pub fn new(buffer: String, selection: Selection) -> Self {
        Self { buffer, selection }
    }

    /// Outcome with a collapsed selection.
    pub fn caret(buffer: String, offset: usize) -> Self {
        Self {
            buffer,
            selection: Selection::collapsed(offset),
        }
    }
}

/// The kinds of span `locate_span` can find.
///
/// Payloads describe what was found; when used as a query, the payload is
/// ignored and matching is by kind alone.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum SpanKind {
    // === Inline marks ===
    Bold,
    Italic,
    InlineCode,
    Strikethrough,
    Link,
    Image,
    // === Line prefixes ===
    /// ATX heading, level 1-6.
    Heading(u8),
    /// Ordered item with its declared number.
    OrderedItem(u64),
    /// Bullet item with its marker char.
    UnorderedItem(char),
    /// Task item with its checked state.
    TaskItem(bool),
}

impl SpanKind {
    /// Symmetric delimiter for the wrapping marks; None for the rest.
    pub fn marker(&self) -> Option<&'static str> {
        match self {
            Self::Bold => Some("**"),
            Self::Italic => Some("*"),
            Self::InlineCode => Some("`"),
            Self::Strikethrough => Some("~~"),
            _ => None,
        }
    }

    /// Placeholder text inserted when toggling a mark at a bare caret.
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Bold => "bold text",
            Self::Italic => "italic text",
            Self::InlineCode => "code",
            Self::Strikethrough => "strikethrough",
            _ => "",
        }
    }

    /// Same variant, payload ignored.
    pub fn same_kind(&self, other: &SpanKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// An active formatting construct located in the buffer. Char ranges;
/// derived on demand, never stored.
///
/// `open` and `close` are the delimiter (or marker prefix) ranges and
/// `content` is what sits between them. Line-level spans have an empty
/// `close` at the line end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatSpan {
    pub kind: SpanKind,
    pub open: Range<usize>,
    pub close: Range<usize>,
    pub content: Range<usize>,
}

/// Externally validated link fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkParams {
    pub url: String,
    pub text: String,
}

/// Externally validated image fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageParams {
    pub url: String,
    pub alt: String,
}

/// Table shape; `rows` counts the header row.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct TableParams {
    pub rows: usize,
    pub cols: usize,
}

/// A formatting command from the toolbar or a shortcut.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormatCommand {
    // === Inline marks ===
    /// Toggle `**bold**`.
    Bold,
    /// Toggle `*italic*`.
    Italic,
    /// Toggle `` `code` ``.
    InlineCode,
    /// Toggle `~~strikethrough~~`.
    Strikethrough,

    // === Line prefixes ===
    /// Set, replace or remove an ATX heading marker.
    Heading(HeadingLevel),
    /// Toggle bullet list markers on the selected lines.
    BulletList,
    /// Toggle ordered list markers, then renumber the run.
    NumberedList,
    /// Toggle task list markers.
    TaskList,
    /// Toggle `> ` quote prefixes.
    BlockQuote,

    // === Structural insertions ===
    /// Insert `[text](url)`.
    InsertLink(LinkParams),
    /// Insert `![alt](url)`.
    InsertImage(ImageParams),
    /// Insert an empty table skeleton.
    InsertTable(TableParams),
    /// Insert a fenced code block with the caret inside.
    InsertCodeBlock { language: Option<SmolStr> },
    /// Insert a thematic break on its own line.
    InsertRule,
}

/// Why a command was refused. The buffer is untouched when this comes back.
#[derive(Clone, Debug, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Blocked {
    /// Structural insertions cannot land inside a fenced code block.
    #[error("selection is inside a fenced code block")]
    InsideCodeBlock,
}
