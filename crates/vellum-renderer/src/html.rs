//! HTML serialization of the render tree.
//!
//! Emission conventions (tag shapes, newline placement, attribute forms)
//! follow the usual event-writer output so rendered documents diff cleanly
//! against other tooling: block closers end with a newline, a block opener
//! emits a leading newline only when the previous write left none.

use crate::block::render;
use crate::escape::{escape_href, escape_html, escape_html_body_text};
use crate::tree::{Alignment, NodeKind, RenderNode};

/// Parse and serialize in one step, with default options.
pub fn render_html(source: &str) -> String {
    let tree = render(source);
    let mut output = String::new();
    push_html(&mut output, &tree);
    output
}

/// Serialize a render tree, appending to `output`.
pub fn push_html(output: &mut String, node: &RenderNode) {
    let mut writer = HtmlWriter::new(output);
    writer.node(node);
}

struct HtmlWriter<'a> {
    out: &'a mut String,
    /// Whether the last write ended with a newline.
    end_newline: bool,
}

impl<'a> HtmlWriter<'a> {
    fn new(out: &'a mut String) -> Self {
        let end_newline = out.is_empty() || out.ends_with('\n');
        Self { out, end_newline }
    }

    fn write(&mut self, s: &str) {
        self.out.push_str(s);
        if !s.is_empty() {
            self.end_newline = s.ends_with('\n');
        }
    }

    fn text(&mut self, s: &str) {
        escape_html_body_text(self.out, s);
        if !s.is_empty() {
            self.end_newline = s.ends_with('\n');
        }
    }

    fn attr(&mut self, s: &str) {
        escape_html(self.out, s);
        if !s.is_empty() {
            self.end_newline = false;
        }
    }

    fn href(&mut self, s: &str) {
        escape_href(self.out, s);
        if !s.is_empty() {
            self.end_newline = false;
        }
    }

    /// Leading newline for a block opener, unless one is already there.
    fn fresh_line(&mut self) {
        if !self.end_newline {
            self.write("\n");
        }
    }

    fn children(&mut self, node: &RenderNode) {
        for child in &node.children {
            self.node(child);
        }
    }

    fn node(&mut self, node: &RenderNode) {
        match &node.kind {
            NodeKind::Document => self.children(node),
            NodeKind::Paragraph => {
                self.fresh_line();
                self.write("<p>");
                self.children(node);
                self.write("</p>\n");
            }
            NodeKind::Heading(level) => {
                self.fresh_line();
                self.write("<");
                self.write(&level.to_string());
                self.write(">");
                self.children(node);
                self.write("</");
                self.write(&level.to_string());
                self.write(">\n");
            }
            NodeKind::BlockQuote => {
                self.fresh_line();
                self.write("<blockquote>\n");
                self.children(node);
                self.write("</blockquote>\n");
            }
            NodeKind::CodeBlock { language } => {
                self.fresh_line();
                match language {
                    Some(lang) => {
                        self.write("<pre><code class=\"language-");
                        self.attr(lang);
                        self.write("\">");
                    }
                    None => self.write("<pre><code>"),
                }
                self.children(node);
                self.write("</code></pre>\n");
            }
            NodeKind::List { start } => {
                self.fresh_line();
                match start {
                    None => {
                        self.write("<ul>\n");
                        self.children(node);
                        self.write("</ul>\n");
                    }
                    Some(1) => {
                        self.write("<ol>\n");
                        self.children(node);
                        self.write("</ol>\n");
                    }
                    Some(start) => {
                        self.write("<ol start=\"");
                        self.write(&start.to_string());
                        self.write("\">\n");
                        self.children(node);
                        self.write("</ol>\n");
                    }
                }
            }
            NodeKind::Item { task } => {
                self.fresh_line();
                self.write("<li>");
                match task {
                    Some(true) => self.write("<input disabled=\"\" type=\"checkbox\" checked=\"\"/>\n"),
                    Some(false) => self.write("<input disabled=\"\" type=\"checkbox\"/>\n"),
                    None => {}
                }
                self.children(node);
                self.write("</li>\n");
            }
            NodeKind::Table { alignments } => self.table(alignments, node),
            // Table sections are emitted by `table`; loose ones render
            // their contents only.
            NodeKind::TableHead | NodeKind::TableRow | NodeKind::TableCell => {
                self.children(node)
            }
            NodeKind::Rule => {
                self.fresh_line();
                self.write("<hr />\n");
            }
            NodeKind::Emphasis => {
                self.write("<em>");
                self.children(node);
                self.write("</em>");
            }
            NodeKind::Strong => {
                self.write("<strong>");
                self.children(node);
                self.write("</strong>");
            }
            NodeKind::Strikethrough => {
                self.write("<del>");
                self.children(node);
                self.write("</del>");
            }
            NodeKind::Code(code) => {
                self.write("<code>");
                self.text(code);
                self.write("</code>");
            }
            NodeKind::Link { dest } => {
                self.write("<a href=\"");
                self.href(dest);
                self.write("\">");
                self.children(node);
                self.write("</a>");
            }
            NodeKind::Image { dest, alt } => {
                self.write("<img src=\"");
                self.href(dest);
                self.write("\" alt=\"");
                self.attr(alt);
                self.write("\" />");
            }
            NodeKind::FootnoteReference { label, number } => {
                self.write("<sup class=\"footnote-reference\"><a href=\"#");
                self.attr(label);
                self.write("\">");
                self.write(&number.to_string());
                self.write("</a></sup>");
            }
            NodeKind::FootnoteDefinition { label, number } => {
                self.fresh_line();
                self.write("<div class=\"footnote-definition\" id=\"");
                self.attr(label);
                self.write("\"><sup class=\"footnote-definition-label\">");
                self.write(&number.to_string());
                self.write("</sup>");
                self.children(node);
                self.write("</div>\n");
            }
            NodeKind::Text(text) => self.text(text),
            NodeKind::SoftBreak => self.write("\n"),
        }
    }

    fn table(&mut self, alignments: &[Alignment], node: &RenderNode) {
        self.fresh_line();
        self.write("<table>");
        for section in &node.children {
            match &section.kind {
                NodeKind::TableHead => {
                    self.write("<thead><tr>");
                    for (idx, cell) in section.children.iter().enumerate() {
                        self.cell(cell, "th", alignments.get(idx));
                    }
                    self.write("</tr></thead><tbody>\n");
                }
                NodeKind::TableRow => {
                    self.write("<tr>");
                    for (idx, cell) in section.children.iter().enumerate() {
                        self.cell(cell, "td", alignments.get(idx));
                    }
                    self.write("</tr>\n");
                }
                _ => {}
            }
        }
        self.write("</tbody></table>\n");
    }

    fn cell(&mut self, cell: &RenderNode, tag: &str, align: Option<&Alignment>) {
        self.write("<");
        self.write(tag);
        match align {
            Some(Alignment::Left) => self.write(" style=\"text-align: left\">"),
            Some(Alignment::Center) => self.write(" style=\"text-align: center\">"),
            Some(Alignment::Right) => self.write(" style=\"text-align: right\">"),
            _ => self.write(">"),
        }
        self.children(cell);
        self.write("</");
        self.write(tag);
        self.write(">");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph() {
        assert_eq!(render_html("hello"), "<p>hello</p>\n");
    }

    #[test]
    fn test_heading() {
        assert_eq!(render_html("## title"), "<h2>title</h2>\n");
    }

    #[test]
    fn test_inline_marks() {
        assert_eq!(
            render_html("**a** *b* `c`"),
            "<p><strong>a</strong> <em>b</em> <code>c</code></p>\n"
        );
    }

    #[test]
    fn test_body_text_escaped() {
        assert_eq!(
            render_html("a <b> & \"q\""),
            "<p>a &lt;b&gt; &amp; \"q\"</p>\n"
        );
    }

    #[test]
    fn test_code_block() {
        assert_eq!(
            render_html("```rust\nlet x;\n```"),
            "<pre><code class=\"language-rust\">let x;\n</code></pre>\n"
        );
    }

    #[test]
    fn test_code_block_contents_escaped() {
        assert_eq!(
            render_html("```\n<tag>\n```"),
            "<pre><code>&lt;tag&gt;\n</code></pre>\n"
        );
    }

    #[test]
    fn test_bullet_list() {
        assert_eq!(
            render_html("- a\n- b"),
            "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n"
        );
    }

    #[test]
    fn test_ordered_list_start_attr() {
        assert_eq!(
            render_html("3. a"),
            "<ol start=\"3\">\n<li>a</li>\n</ol>\n"
        );
        assert_eq!(render_html("1. a"), "<ol>\n<li>a</li>\n</ol>\n");
    }

    #[test]
    fn test_nested_list() {
        assert_eq!(
            render_html("- a\n  - b"),
            "<ul>\n<li>a\n<ul>\n<li>b</li>\n</ul>\n</li>\n</ul>\n"
        );
    }

    #[test]
    fn test_task_items() {
        assert_eq!(
            render_html("- [x] done"),
            "<ul>\n<li><input disabled=\"\" type=\"checkbox\" checked=\"\"/>\ndone</li>\n</ul>\n"
        );
        assert_eq!(
            render_html("- [ ] open"),
            "<ul>\n<li><input disabled=\"\" type=\"checkbox\"/>\nopen</li>\n</ul>\n"
        );
    }

    #[test]
    fn test_block_quote() {
        assert_eq!(
            render_html("> q"),
            "<blockquote>\n<p>q</p>\n</blockquote>\n"
        );
    }

    #[test]
    fn test_rule() {
        assert_eq!(render_html("---"), "<hr />\n");
    }

    #[test]
    fn test_link_and_image() {
        assert_eq!(
            render_html("[t](u)"),
            "<p><a href=\"u\">t</a></p>\n"
        );
        assert_eq!(
            render_html("![alt](src.png)"),
            "<p><img src=\"src.png\" alt=\"alt\" /></p>\n"
        );
    }

    #[test]
    fn test_href_escaped() {
        assert_eq!(
            render_html("[x](a b)"),
            "<p><a href=\"a%20b\">x</a></p>\n"
        );
    }

    #[test]
    fn test_table() {
        let html = render_html("| a | b |\n| :-- | --: |\n| 1 | 2 |");
        assert_eq!(
            html,
            "<table><thead><tr><th style=\"text-align: left\">a</th>\
             <th style=\"text-align: right\">b</th></tr></thead><tbody>\n\
             <tr><td style=\"text-align: left\">1</td>\
             <td style=\"text-align: right\">2</td></tr>\n\
             </tbody></table>\n"
        );
    }

    #[test]
    fn test_footnotes() {
        let html = render_html("text[^a]\n\n[^a]: note");
        assert_eq!(
            html,
            "<p>text<sup class=\"footnote-reference\"><a href=\"#a\">1</a></sup></p>\n\
             <div class=\"footnote-definition\" id=\"a\">\
             <sup class=\"footnote-definition-label\">1</sup>\n\
             <p>note</p>\n</div>\n"
        );
    }

    #[test]
    fn test_soft_break() {
        assert_eq!(render_html("a\nb"), "<p>a\nb</p>\n");
    }
}
