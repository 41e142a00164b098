//! Render tree produced by a parse pass.
//!
//! The tree is ephemeral: every render pass rebuilds it from the buffer text
//! and hands it to the caller as plain data. Nothing here is diffed or
//! retained between passes.

use std::fmt;

use serde::Serialize;
use smol_str::SmolStr;

/// ATX heading level, `#` through `######`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
}

impl HeadingLevel {
    /// Level from a marker count. Returns None outside 1..=6.
    pub fn new(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::H1),
            2 => Some(Self::H2),
            3 => Some(Self::H3),
            4 => Some(Self::H4),
            5 => Some(Self::H5),
            6 => Some(Self::H6),
            _ => None,
        }
    }

    /// Marker count for this level.
    pub fn level(self) -> u8 {
        match self {
            Self::H1 => 1,
            Self::H2 => 2,
            Self::H3 => 3,
            Self::H4 => 4,
            Self::H5 => 5,
            Self::H6 => 6,
        }
    }
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.level())
    }
}

/// Column alignment from a table separator row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Alignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

/// The closed set of node kinds the dialect produces.
///
/// Block kinds carry their block-level attributes (heading level, list start,
/// table alignments); leaf kinds carry their text payload directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    /// Root of a render pass.
    Document,
    Paragraph,
    Heading(HeadingLevel),
    BlockQuote,
    /// Fenced code block. Contents are a single literal text child,
    /// never inline-parsed.
    CodeBlock { language: Option<SmolStr> },
    /// `start` is Some for ordered lists, None for bullet/task lists.
    List { start: Option<u64> },
    /// `task` is Some(checked) for task-list items.
    Item { task: Option<bool> },
    Table { alignments: Vec<Alignment> },
    TableHead,
    TableRow,
    TableCell,
    Rule,
    Emphasis,
    Strong,
    Strikethrough,
    /// Inline code span; payload is the literal span text.
    Code(SmolStr),
    Link { dest: SmolStr },
    Image { dest: SmolStr, alt: SmolStr },
    /// Reference marker in running text. `number` is assigned by first
    /// occurrence order in the body.
    FootnoteReference { label: SmolStr, number: usize },
    /// Definition block appended at the end of the document, in first
    /// occurrence order.
    FootnoteDefinition { label: SmolStr, number: usize },
    Text(SmolStr),
    SoftBreak,
}

/// One node of the render tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderNode {
    pub kind: NodeKind,
    pub children: Vec<RenderNode>,
}

impl RenderNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    /// Leaf text node.
    pub fn text(text: impl Into<SmolStr>) -> Self {
        Self::new(NodeKind::Text(text.into()))
    }

    pub fn push(&mut self, child: RenderNode) {
        self.children.push(child);
    }

    /// Concatenated text content of the subtree, in document order.
    ///
    /// Code spans and code block contents count as text; soft breaks count
    /// as newlines. Structural kinds contribute nothing of their own.
    pub fn flatten_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.kind {
            NodeKind::Text(text) | NodeKind::Code(text) => out.push_str(text),
            NodeKind::SoftBreak => out.push('\n'),
            _ => {}
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// Depth-first count of nodes matching a predicate.
    pub fn count_nodes(&self, pred: &impl Fn(&NodeKind) -> bool) -> usize {
        let own = usize::from(pred(&self.kind));
        own + self
            .children
            .iter()
            .map(|c| c.count_nodes(pred))
            .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_level_roundtrip() {
        for n in 1..=6u8 {
            let level = HeadingLevel::new(n).unwrap();
            assert_eq!(level.level(), n);
        }
        assert_eq!(HeadingLevel::new(0), None);
        assert_eq!(HeadingLevel::new(7), None);
    }

    #[test]
    fn test_heading_level_display() {
        assert_eq!(HeadingLevel::H1.to_string(), "h1");
        assert_eq!(HeadingLevel::H6.to_string(), "h6");
    }

    #[test]
    fn test_flatten_text() {
        let mut para = RenderNode::new(NodeKind::Paragraph);
        let mut strong = RenderNode::new(NodeKind::Strong);
        strong.push(RenderNode::text("a"));
        para.push(strong);
        para.push(RenderNode::text(" "));
        para.push(RenderNode::new(NodeKind::Code("b".into())));
        assert_eq!(para.flatten_text(), "a b");
    }

    #[test]
    fn test_tree_serializes() {
        let mut doc = RenderNode::new(NodeKind::Document);
        doc.push(RenderNode::new(NodeKind::Rule));
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("Rule"));
    }
}
