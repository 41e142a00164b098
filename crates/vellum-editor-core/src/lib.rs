//! vellum-editor-core: Pure Rust editor logic without framework dependencies.
//!
//! This crate provides:
//! - `TextBuffer` trait for text storage abstraction
//! - `EditorRope` - ropey-backed implementation
//! - `apply_format` - toggle and insert markdown formatting at a selection
//! - `handle_enter_in_list` / `renumber_list` - list continuation on Enter
//! - `locate_span` - the formatting span around an offset
//!
//! Everything is generic over `TextBuffer` and pure: operations read the
//! caller's buffer and return a rewritten copy with a remapped selection,
//! never mutating in place. All offsets are char offsets.

pub mod format;
pub mod list;
pub mod span;
pub mod text;
pub mod types;

pub use format::apply_format;
pub use list::{EnterOutcome, ListState, handle_enter_in_list, list_state, renumber_list};
pub use smol_str::SmolStr;
pub use span::{inside_fence, line_end, line_start, locate_span};
pub use text::{EditorRope, TextBuffer};
pub use types::{
    Blocked, EditOutcome, FormatCommand, FormatSpan, ImageParams, LinkParams, Selection, SpanKind,
    TableParams,
};
pub use vellum_renderer::HeadingLevel;
