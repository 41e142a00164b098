//! Vellum renderer
//!
//! Markdown dialect parsing and HTML production for the vellum editor. The
//! pipeline is `render` (source to block tree), `push_html` (tree to markup)
//! and `sanitize` (markup to trusted markup); `render_html` chains the first
//! two. The editor core leans on `syntax` for the line-level marker grammar
//! so both sides agree on what counts as a list item or a fence.

pub mod block;
pub mod escape;
pub mod html;
pub mod inline;
pub mod sanitize;
pub mod syntax;
pub mod tree;

pub use block::{Options, render, render_with_options};
pub use html::{push_html, render_html};
pub use sanitize::sanitize;
pub use tree::{Alignment, HeadingLevel, NodeKind, RenderNode};
