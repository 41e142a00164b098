//! Line classification for the markup dialect.
//!
//! One definition of what a line *is* (list item, heading, fence, rule,
//! quote, footnote definition), shared by the block parser and the editor
//! core, so the two sides can never disagree about structure. Offsets
//! returned here are char offsets from the line start; marker syntax is
//! ASCII, so marker widths are the same in chars and bytes.

use smol_str::{SmolStr, format_smolstr};

/// Width a tab contributes to leading indentation.
pub const TAB_WIDTH: usize = 4;

/// Indentation width of one list nesting level.
pub const INDENT_UNIT: usize = 2;

/// Kind of marker at the head of a list-item line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// `- `, `* ` or `+ `; payload is the marker char.
    Bullet(char),
    /// `N. `; payload is the declared number.
    Ordered(u64),
    /// `- [ ] ` or `- [x] `; payload is the checked state.
    Task(bool),
}

impl MarkerKind {
    pub fn is_ordered(self) -> bool {
        matches!(self, Self::Ordered(_))
    }

    pub fn is_task(self) -> bool {
        matches!(self, Self::Task(_))
    }

    /// Same marker family (bullet vs ordered vs task), payload ignored.
    pub fn same_family(self, other: Self) -> bool {
        std::mem::discriminant(&self) == std::mem::discriminant(&other)
    }
}

/// A parsed list marker: indentation, kind, and where the item text begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListMarker {
    pub kind: MarkerKind,
    /// Leading indentation width with tabs expanded at [`TAB_WIDTH`].
    pub indent_width: usize,
    /// Chars of leading whitespace, unexpanded.
    pub indent_chars: usize,
    /// Char offset of the item text from the line start.
    pub content_start: usize,
}

impl ListMarker {
    /// Nesting depth derived from indentation.
    pub fn depth(&self) -> usize {
        self.indent_width / INDENT_UNIT
    }

    /// Chars the marker itself occupies, excluding indentation.
    pub fn marker_len(&self) -> usize {
        self.content_start - self.indent_chars
    }

    /// Canonical text of this marker, without indentation.
    pub fn text(&self) -> SmolStr {
        match self.kind {
            MarkerKind::Bullet(c) => format_smolstr!("{c} "),
            MarkerKind::Ordered(n) => format_smolstr!("{n}. "),
            MarkerKind::Task(true) => SmolStr::new_static("- [x] "),
            MarkerKind::Task(false) => SmolStr::new_static("- [ ] "),
        }
    }

    /// Marker text for the item continued after this one.
    ///
    /// Ordered markers increment; task markers always continue unchecked.
    pub fn continuation(&self) -> SmolStr {
        match self.kind {
            MarkerKind::Bullet(c) => format_smolstr!("{c} "),
            MarkerKind::Ordered(n) => format_smolstr!("{}. ", n.saturating_add(1)),
            MarkerKind::Task(_) => SmolStr::new_static("- [ ] "),
        }
    }
}

/// Leading whitespace of a line as (expanded width, char count).
pub fn leading_indent(line: &str) -> (usize, usize) {
    let mut width = 0;
    let mut chars = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width += TAB_WIDTH,
            _ => break,
        }
        chars += 1;
    }
    (width, chars)
}

/// Classify a line as a list item.
///
/// Task markers win over plain bullets (`- [x] ` is a task, not a bullet
/// with `[x]` content). A bare marker with no trailing space is not a list
/// item.
pub fn list_marker(line: &str) -> Option<ListMarker> {
    let (indent_width, indent_chars) = leading_indent(line);
    // Indent chars are ' ' or '\t', one byte each.
    let rest = &line[indent_chars..];

    let (kind, marker_len) = if rest.starts_with("- [ ] ") {
        (MarkerKind::Task(false), 6)
    } else if rest.starts_with("- [x] ") || rest.starts_with("- [X] ") {
        (MarkerKind::Task(true), 6)
    } else if let Some(c) = rest.chars().next().filter(|c| matches!(c, '-' | '*' | '+')) {
        if rest[1..].starts_with(' ') {
            (MarkerKind::Bullet(c), 2)
        } else {
            return None;
        }
    } else {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 || !rest[digits..].starts_with(". ") {
            return None;
        }
        let number = rest[..digits].parse::<u64>().ok()?;
        (MarkerKind::Ordered(number), digits + 2)
    };

    Some(ListMarker {
        kind,
        indent_width,
        indent_chars,
        content_start: indent_chars + marker_len,
    })
}

/// Classify text as an ATX heading prefix.
///
/// `text` starts after any indentation and list marker (heading markers are
/// orthogonal to list markers). Returns (level, chars consumed including the
/// separating space). A bare `#`-run with nothing after it is an empty
/// heading.
pub fn heading_marker(text: &str) -> Option<(u8, usize)> {
    let hashes = text.bytes().take_while(|&b| b == b'#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let level = hashes as u8;
    match text[hashes..].chars().next() {
        None => Some((level, hashes)),
        Some(' ') => Some((level, hashes + 1)),
        Some(_) => None,
    }
}

/// Classify a line as a code fence boundary. Returns the info string
/// (trimmed); an empty info string is also how a closing fence looks.
pub fn fence_marker(line: &str) -> Option<&str> {
    line.trim_start().strip_prefix("```").map(str::trim)
}

/// A thematic break: three or more dashes and nothing else.
pub fn is_rule(line: &str) -> bool {
    let t = line.trim();
    t.len() >= 3 && t.bytes().all(|b| b == b'-')
}

pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Classify a line as a block quote. Returns chars consumed by the prefix
/// (indent, `>`, and one following space if present).
pub fn quote_marker(line: &str) -> Option<usize> {
    let (_, indent_chars) = leading_indent(line);
    let rest = &line[indent_chars..];
    if !rest.starts_with('>') {
        return None;
    }
    let space = usize::from(rest[1..].starts_with(' '));
    Some(indent_chars + 1 + space)
}

/// Classify a line as a footnote definition `[^label]: content`.
///
/// Definitions sit at the line start; the label must be non-empty and
/// bracket-free. Returns (label, content).
pub fn footnote_definition(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix("[^")?;
    let close = rest.find("]:")?;
    let label = &rest[..close];
    if label.is_empty()
        || label.contains(['[', ']', '^'])
        || label.chars().any(char::is_whitespace)
    {
        return None;
    }
    Some((label, rest[close + 2..].trim_start()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bullet_markers() {
        for c in ['-', '*', '+'] {
            let line = format!("{c} item");
            let m = list_marker(&line).unwrap();
            assert_eq!(m.kind, MarkerKind::Bullet(c));
            assert_eq!(m.content_start, 2);
            assert_eq!(m.depth(), 0);
        }
    }

    #[test]
    fn test_ordered_marker() {
        let m = list_marker("12. item").unwrap();
        assert_eq!(m.kind, MarkerKind::Ordered(12));
        assert_eq!(m.content_start, 4);
    }

    #[test]
    fn test_task_markers() {
        let unchecked = list_marker("- [ ] todo").unwrap();
        assert_eq!(unchecked.kind, MarkerKind::Task(false));
        assert_eq!(unchecked.content_start, 6);

        let checked = list_marker("- [x] done").unwrap();
        assert_eq!(checked.kind, MarkerKind::Task(true));

        let upper = list_marker("- [X] done").unwrap();
        assert_eq!(upper.kind, MarkerKind::Task(true));
    }

    #[test]
    fn test_indent_depth() {
        let m = list_marker("  - nested").unwrap();
        assert_eq!(m.depth(), 1);
        assert_eq!(m.indent_chars, 2);
        assert_eq!(m.content_start, 4);

        // One tab expands to width 4, depth 2.
        let m = list_marker("\t- nested").unwrap();
        assert_eq!(m.indent_width, TAB_WIDTH);
        assert_eq!(m.depth(), 2);
        assert_eq!(m.indent_chars, 1);
        assert_eq!(m.content_start, 3);
    }

    #[test]
    fn test_not_list_items() {
        assert_eq!(list_marker("-no space"), None);
        assert_eq!(list_marker("1.no space"), None);
        assert_eq!(list_marker("text"), None);
        assert_eq!(list_marker("-"), None);
        assert_eq!(list_marker("1."), None);
    }

    #[test]
    fn test_marker_text_roundtrip() {
        let m = list_marker("3. x").unwrap();
        assert_eq!(m.text(), "3. ");
        assert_eq!(m.continuation(), "4. ");

        let t = list_marker("- [x] x").unwrap();
        assert_eq!(t.text(), "- [x] ");
        assert_eq!(t.continuation(), "- [ ] ");
    }

    #[test]
    fn test_heading_marker() {
        assert_eq!(heading_marker("## title"), Some((2, 3)));
        assert_eq!(heading_marker("######"), Some((6, 6)));
        assert_eq!(heading_marker("#######"), None);
        assert_eq!(heading_marker("#title"), None);
        assert_eq!(heading_marker("title"), None);
    }

    #[test]
    fn test_fence_marker() {
        assert_eq!(fence_marker("```rust"), Some("rust"));
        assert_eq!(fence_marker("```"), Some(""));
        assert_eq!(fence_marker("  ``` "), Some(""));
        assert_eq!(fence_marker("``"), None);
    }

    #[test]
    fn test_rule() {
        assert!(is_rule("---"));
        assert!(is_rule("-----"));
        assert!(!is_rule("--"));
        assert!(!is_rule("--- x"));
    }

    #[test]
    fn test_quote_marker() {
        assert_eq!(quote_marker("> quoted"), Some(2));
        assert_eq!(quote_marker(">bare"), Some(1));
        assert_eq!(quote_marker(">"), Some(1));
        assert_eq!(quote_marker("no"), None);
    }

    #[test]
    fn test_footnote_definition() {
        assert_eq!(footnote_definition("[^a]: note"), Some(("a", "note")));
        assert_eq!(footnote_definition("[^]: empty"), None);
        assert_eq!(footnote_definition("[a]: link def"), None);
    }
}
