//! HTML sanitizer: the single trust boundary for anything injected into the
//! preview DOM.
//!
//! A lenient char-level tokenizer feeds an allow-list filter feeding a
//! canonical serializer. Canonical output (lowercase names, source-order
//! attributes, entities decoded then re-encoded, voids as `<x />`, stray end
//! tags dropped, open elements closed at end of input) is what makes the
//! pass idempotent: sanitized output re-tokenizes to the same token stream.
//!
//! Elements off the allow-list are unwrapped, keeping their children.
//! Content-dangerous elements are removed with everything inside them.
//! Attribute values are checked decoded, so entity-masked schemes
//! (`&#106;avascript:`) cannot slip through.

use url::{ParseError, Url};

use crate::escape::{escape_html, escape_html_body_text};

/// Elements whose entire contents are dropped with them.
const DROP_WITH_CONTENT: &[&str] = &["script", "style", "iframe", "object", "embed"];

/// Elements allowed through. Everything else is unwrapped.
const ALLOWED_ELEMENTS: &[&str] = &[
    "a",
    "blockquote",
    "br",
    "code",
    "del",
    "div",
    "em",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "hr",
    "img",
    "input",
    "li",
    "ol",
    "p",
    "pre",
    "strong",
    "sup",
    "table",
    "tbody",
    "td",
    "th",
    "thead",
    "tr",
    "ul",
];

const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input"];

const CELL_STYLES: &[&str] = &[
    "text-align: left",
    "text-align: center",
    "text-align: right",
];

/// Filter untrusted HTML down to the allow-list. Pure and idempotent.
pub fn sanitize(html: &str) -> String {
    let mut s = Sanitizer {
        src: html,
        pos: 0,
        out: String::with_capacity(html.len()),
        stack: Vec::new(),
    };
    s.run();
    s.out
}

fn allowed_element(name: &str) -> Option<&'static str> {
    ALLOWED_ELEMENTS.iter().find(|&&t| t == name).copied()
}

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

struct Sanitizer<'a> {
    src: &'a str,
    pos: usize,
    out: String,
    stack: Vec<&'static str>,
}

impl Sanitizer<'_> {
    fn run(&mut self) {
        while self.pos < self.src.len() {
            match self.src[self.pos..].find('<') {
                Some(rel) => {
                    self.text(self.pos..self.pos + rel);
                    self.pos += rel;
                    self.token();
                }
                None => {
                    self.text(self.pos..self.src.len());
                    self.pos = self.src.len();
                }
            }
        }
        while let Some(tag) = self.stack.pop() {
            self.close_tag(tag);
        }
    }

    fn text(&mut self, range: std::ops::Range<usize>) {
        if range.is_empty() {
            return;
        }
        let decoded = decode_entities(&self.src[range]);
        escape_html_body_text(&mut self.out, &decoded);
    }

    fn close_tag(&mut self, tag: &str) {
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push('>');
    }

    /// One token starting at `<`. Advances past it; emits whatever the
    /// allow-list keeps.
    fn token(&mut self) {
        let rest = &self.src[self.pos..];

        if rest.starts_with("<!--") {
            // Comments vanish, unterminated ones eat to end of input.
            self.pos = match rest[4..].find("-->") {
                Some(rel) => self.pos + 4 + rel + 3,
                None => self.src.len(),
            };
            return;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            self.pos = match rest.find('>') {
                Some(rel) => self.pos + rel + 1,
                None => self.src.len(),
            };
            return;
        }
        if let Some(after) = rest.strip_prefix("</") {
            let name: String = after
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
                .to_ascii_lowercase();
            self.pos = match rest.find('>') {
                Some(rel) => self.pos + rel + 1,
                None => self.src.len(),
            };
            if !name.is_empty() {
                self.end_tag(&name);
            }
            return;
        }
        if rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            self.start_tag();
            return;
        }
        // Literal `<` in text.
        self.out.push_str("&lt;");
        self.pos += 1;
    }

    /// An end tag closes the nearest matching open element, implicitly
    /// closing anything opened inside it. Unmatched end tags are dropped.
    fn end_tag(&mut self, name: &str) {
        if let Some(found) = self.stack.iter().rposition(|t| *t == name) {
            while self.stack.len() > found {
                if let Some(tag) = self.stack.pop() {
                    self.close_tag(tag);
                }
            }
        }
    }

    fn start_tag(&mut self) {
        self.pos += 1;
        let name = self.read_name();
        let Some((attrs, self_closing)) = self.read_attrs() else {
            // Ran off the end of input mid-tag: drop the fragment.
            self.pos = self.src.len();
            return;
        };

        if DROP_WITH_CONTENT.contains(&name.as_str()) {
            tracing::warn!(element = %name, "sanitize: removed active content");
            if !self_closing {
                self.skip_content_of(&name);
            }
            return;
        }
        let Some(tag) = allowed_element(&name) else {
            return;
        };

        let mut attrs = filter_attrs(tag, attrs);
        if tag == "input"
            && !attrs.iter().any(|(n, v)| n == "type" && v == "checkbox")
        {
            // Only checkbox inputs (task markers) have any business here.
            return;
        }
        if tag == "a" {
            force_anchor_attrs(&mut attrs);
        }

        self.out.push('<');
        self.out.push_str(tag);
        for (attr_name, value) in &attrs {
            self.out.push(' ');
            self.out.push_str(attr_name);
            self.out.push_str("=\"");
            escape_html(&mut self.out, value);
            self.out.push('"');
        }
        if is_void(tag) {
            self.out.push_str(" />");
        } else if self_closing {
            self.out.push('>');
            self.close_tag(tag);
        } else {
            self.out.push('>');
            self.stack.push(tag);
        }
    }

    fn read_name(&mut self) -> String {
        let start = self.pos;
        let bytes = self.src.as_bytes();
        while self.pos < bytes.len()
            && (bytes[self.pos].is_ascii_alphanumeric() || bytes[self.pos] == b'-')
        {
            self.pos += 1;
        }
        self.src[start..self.pos].to_ascii_lowercase()
    }

    /// Attributes up to the closing `>`. Returns None when input ends
    /// mid-tag. Values come back entity-decoded.
    fn read_attrs(&mut self) -> Option<(Vec<(String, String)>, bool)> {
        let bytes = self.src.as_bytes();
        let mut attrs = Vec::new();
        loop {
            while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            let b = *bytes.get(self.pos)?;
            if b == b'>' {
                self.pos += 1;
                return Some((attrs, false));
            }
            if b == b'/' {
                if bytes.get(self.pos + 1) == Some(&b'>') {
                    self.pos += 2;
                    return Some((attrs, true));
                }
                self.pos += 1;
                continue;
            }

            let name_start = self.pos;
            while self.pos < bytes.len()
                && !matches!(bytes[self.pos], b'=' | b'>' | b'/' | b'"' | b'\'')
                && !bytes[self.pos].is_ascii_whitespace()
            {
                self.pos += 1;
            }
            if self.pos == name_start {
                // Not attribute material; skip a byte and carry on.
                self.pos += 1;
                continue;
            }
            let attr_name = self.src[name_start..self.pos].to_ascii_lowercase();

            while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            let value = if bytes.get(self.pos) == Some(&b'=') {
                self.pos += 1;
                while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
                    self.pos += 1;
                }
                match bytes.get(self.pos).copied() {
                    Some(quote) if quote == b'"' || quote == b'\'' => {
                        self.pos += 1;
                        let start = self.pos;
                        let rel = self.src[start..].find(quote as char)?;
                        self.pos = start + rel + 1;
                        decode_entities(&self.src[start..start + rel])
                    }
                    Some(_) => {
                        let start = self.pos;
                        while self.pos < bytes.len()
                            && bytes[self.pos] != b'>'
                            && !bytes[self.pos].is_ascii_whitespace()
                        {
                            self.pos += 1;
                        }
                        decode_entities(&self.src[start..self.pos])
                    }
                    None => return None,
                }
            } else {
                String::new()
            };
            attrs.push((attr_name, value));
        }
    }

    /// Skip everything up to and including the matching close tag.
    /// No close tag means the rest of the input is content: drop it all.
    fn skip_content_of(&mut self, name: &str) {
        let bytes = self.src.as_bytes();
        let mut p = self.pos;
        while p + 1 < bytes.len() {
            if bytes[p] == b'<' && bytes[p + 1] == b'/' {
                let start = p + 2;
                let end = start + name.len();
                if end <= bytes.len()
                    && bytes[start..end].eq_ignore_ascii_case(name.as_bytes())
                    && matches!(bytes.get(end).copied(), None | Some(b'>' | b' ' | b'\t' | b'\n'))
                {
                    self.pos = match self.src[end..].find('>') {
                        Some(rel) => end + rel + 1,
                        None => self.src.len(),
                    };
                    return;
                }
            }
            p += 1;
        }
        self.pos = self.src.len();
    }
}

/// Per-element attribute allow-list, value-checked where the value space
/// is closed.
fn attr_allowed(tag: &str, name: &str, value: &str) -> bool {
    match (tag, name) {
        ("a", "href") | ("a", "title") => true,
        ("img", "src") | ("img", "alt") | ("img", "title") => true,
        ("input", "type") => value == "checkbox",
        ("input", "checked") | ("input", "disabled") => true,
        ("ol", "start") => !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()),
        ("th", "style") | ("td", "style") => CELL_STYLES.contains(&value),
        ("code", "class") => {
            value.starts_with("language-") && !value.contains(char::is_whitespace)
        }
        ("div", "class") => value == "footnote-definition",
        ("div", "id") => true,
        ("sup", "class") => {
            value == "footnote-reference" || value == "footnote-definition-label"
        }
        _ => false,
    }
}

fn is_uri_attr(tag: &str, name: &str) -> bool {
    matches!((tag, name), ("a", "href") | ("img", "src"))
}

fn filter_attrs(tag: &str, attrs: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    for (name, value) in attrs {
        if out.iter().any(|(n, _)| *n == name) {
            continue;
        }
        // Event handlers never pass, whatever the element.
        if name.starts_with("on") {
            continue;
        }
        if !attr_allowed(tag, &name, &value) {
            continue;
        }
        if is_uri_attr(tag, &name) && !safe_url(&value, tag == "img") {
            continue;
        }
        out.push((name, value));
    }
    out
}

/// Anchors always leave with a safe rel/target, whatever they arrived with.
fn force_anchor_attrs(attrs: &mut Vec<(String, String)>) {
    attrs.retain(|(n, _)| n != "rel" && n != "target");
    attrs.push(("rel".to_string(), "noopener noreferrer".to_string()));
    attrs.push(("target".to_string(), "_blank".to_string()));
}

/// Protocol allow-list over the decoded value. Control chars and embedded
/// whitespace are stripped before classification so `jav\tascript:` does
/// not dodge the scheme check; the stored value is left as-is.
fn safe_url(value: &str, allow_data_image: bool) -> bool {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_control() && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return true;
    }
    match Url::parse(&cleaned) {
        Ok(url) => match url.scheme() {
            "http" | "https" | "mailto" => true,
            "data" => allow_data_image && data_image_ok(url.path()),
            _ => false,
        },
        // No scheme at all: relative paths and fragments are fine.
        Err(ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}

fn data_image_ok(path: &str) -> bool {
    for mime in ["image/png", "image/gif", "image/jpeg", "image/webp"] {
        if let Some(rest) = path.strip_prefix(mime) {
            return rest.is_empty() || rest.starts_with(';') || rest.starts_with(',');
        }
    }
    false
}

/// Decode the small entity set the dialect can produce, plus numeric
/// references. Unknown entities stay literal and re-encode stably.
fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];
        match entity(rest) {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn entity(rest: &str) -> Option<(char, usize)> {
    let semi = rest[1..].find(';').filter(|&n| n <= 32)?;
    let body = &rest[1..1 + semi];
    let consumed = semi + 2;
    let c = match body {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        _ => {
            let code = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok()?
            } else {
                return None;
            };
            char::from_u32(code)?
        }
    };
    Some((c, consumed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plain_markup_passes() {
        let html = "<p>hello <strong>world</strong></p>\n";
        assert_eq!(sanitize(html), html);
    }

    #[test]
    fn test_script_removed_with_contents() {
        assert_eq!(sanitize("<script>alert(1)</script>"), "");
        assert_eq!(
            sanitize("<p>before</p><script>alert(1)</script><p>after</p>"),
            "<p>before</p><p>after</p>"
        );
    }

    #[test]
    fn test_all_content_dangerous_elements_removed() {
        for tag in ["script", "style", "iframe", "object", "embed"] {
            let html = format!("a<{tag}>payload</{tag}>b");
            assert_eq!(sanitize(&html), "ab", "{tag}");
        }
    }

    #[test]
    fn test_unterminated_script_eats_rest() {
        assert_eq!(sanitize("<p>x</p><script>evil"), "<p>x</p>");
    }

    #[test]
    fn test_case_insensitive_close() {
        assert_eq!(sanitize("<SCRIPT>x</ScRiPt>after"), "after");
    }

    #[test]
    fn test_unknown_element_unwrapped() {
        assert_eq!(sanitize("<span>x</span>"), "x");
        assert_eq!(sanitize("<widget><em>y</em></widget>"), "<em>y</em>");
    }

    #[test]
    fn test_javascript_src_dropped_element_kept() {
        assert_eq!(
            sanitize("<img src=\"javascript:alert(1)\" alt=\"a\">"),
            "<img alt=\"a\" />"
        );
    }

    #[test]
    fn test_entity_masked_scheme_dropped() {
        assert_eq!(
            sanitize("<a href=\"&#106;avascript:alert(1)\">c</a>"),
            "<a rel=\"noopener noreferrer\" target=\"_blank\">c</a>"
        );
    }

    #[test]
    fn test_whitespace_masked_scheme_dropped() {
        assert_eq!(
            sanitize("<a href=\"jav\tascript:alert(1)\">c</a>"),
            "<a rel=\"noopener noreferrer\" target=\"_blank\">c</a>"
        );
    }

    #[test]
    fn test_protocol_allow_list() {
        for ok in [
            "https://example.com/x",
            "http://example.com",
            "mailto:a@b.c",
            "/relative/path",
            "#fragment",
            "sibling.html",
        ] {
            let html = format!("<a href=\"{ok}\">x</a>");
            assert!(sanitize(&html).contains("href"), "{ok} should survive");
        }
        for bad in ["javascript:x", "vbscript:x", "file:///etc/passwd", "data:text/html,x"] {
            let html = format!("<a href=\"{bad}\">x</a>");
            assert!(!sanitize(&html).contains("href"), "{bad} should be dropped");
        }
    }

    #[test]
    fn test_data_image_src() {
        let ok = "<img src=\"data:image/png;base64,iVBOR\">";
        assert!(sanitize(ok).contains("src"));
        let bad = "<img src=\"data:text/html,<script>\">";
        assert!(!sanitize(bad).contains("src"));
        // data: is only for images, never for links.
        let link = "<a href=\"data:image/png;base64,AA\">x</a>";
        assert!(!sanitize(link).contains("href"));
    }

    #[test]
    fn test_anchor_rel_target_forced() {
        assert_eq!(
            sanitize("<a href=\"https://e.com\">x</a>"),
            "<a href=\"https://e.com\" rel=\"noopener noreferrer\" target=\"_blank\">x</a>"
        );
        // Attacker-supplied rel/target are replaced, not merged.
        assert_eq!(
            sanitize("<a href=\"/p\" target=\"_top\" rel=\"opener\">x</a>"),
            "<a href=\"/p\" rel=\"noopener noreferrer\" target=\"_blank\">x</a>"
        );
    }

    #[test]
    fn test_event_handlers_dropped() {
        assert_eq!(sanitize("<p onclick=\"x()\">y</p>"), "<p>y</p>");
        assert_eq!(
            sanitize("<img src=\"a.png\" onerror=\"x()\">"),
            "<img src=\"a.png\" />"
        );
    }

    #[test]
    fn test_comments_removed() {
        assert_eq!(sanitize("a<!-- hidden -->b"), "ab");
        assert_eq!(sanitize("a<!-- unterminated"), "a");
    }

    #[test]
    fn test_stray_end_tag_dropped() {
        assert_eq!(sanitize("a</p>b"), "ab");
    }

    #[test]
    fn test_unclosed_elements_closed_at_eof() {
        assert_eq!(sanitize("<em>a"), "<em>a</em>");
        assert_eq!(sanitize("<ul><li>a"), "<ul><li>a</li></ul>");
    }

    #[test]
    fn test_misnesting_repaired() {
        assert_eq!(sanitize("<p><em>a</p></em>"), "<p><em>a</em></p>");
    }

    #[test]
    fn test_text_escaping() {
        assert_eq!(sanitize("a < b & c"), "a &lt; b &amp; c");
        // Already-escaped text is stable.
        assert_eq!(sanitize("a &lt; b &amp; c"), "a &lt; b &amp; c");
        assert_eq!(sanitize("&amp;lt;"), "&amp;lt;");
    }

    #[test]
    fn test_non_checkbox_input_dropped() {
        assert_eq!(sanitize("<input type=\"text\" value=\"x\">"), "");
        assert_eq!(
            sanitize("<input disabled=\"\" type=\"checkbox\"/>"),
            "<input disabled=\"\" type=\"checkbox\" />"
        );
    }

    #[test]
    fn test_style_attr_value_checked() {
        assert_eq!(
            sanitize("<td style=\"text-align: center\">x</td>"),
            "<td style=\"text-align: center\">x</td>"
        );
        assert_eq!(
            sanitize("<td style=\"position: fixed\">x</td>"),
            "<td>x</td>"
        );
    }

    #[test]
    fn test_renderer_output_passes_unchanged() {
        let html = crate::html::render_html(
            "# title\n\n> quote\n\n- a\n  - b\n\n| h | i |\n| --- | :-: |\n| 1 | 2 |\n\n```rust\nlet x;\n```\n\n![alt](img.png) and **bold**",
        );
        assert_eq!(sanitize(&html), html);
    }

    #[test]
    fn test_idempotent_on_hostile_samples() {
        let samples = [
            "<p title=\"a>b\">x</p>",
            "<img alt=a<b>",
            "a<b",
            "<p/><p>x",
            "&#zzz; &amp;amp; &#x41;",
            "<div class=\"footnote-definition\" id=\"n\"><sup>1</sup>x</div>",
            "<<em>>text</em>",
        ];
        for input in samples {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "input: {input:?}");
        }
    }

    proptest! {
        #[test]
        fn prop_sanitize_idempotent(input in "\\PC{0,200}") {
            let once = sanitize(&input);
            prop_assert_eq!(sanitize(&once), once);
        }

        #[test]
        fn prop_no_script_survives(input in "\\PC{0,100}") {
            let wrapped = format!("<script>{input}</script>");
            let out = sanitize(&wrapped);
            prop_assert!(!out.to_ascii_lowercase().contains("<script"));
        }
    }
}
