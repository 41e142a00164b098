//! HTML escaping helpers.
//!
//! Split the usual three ways: attribute values, body text (quotes are fine
//! there), and hrefs (entity-escape the quoting chars, percent-encode the
//! rest). Everything appends to a `String`; the writer and the sanitizer
//! share these so their output agrees byte for byte.

/// Escape for attribute-value position: `&`, `<`, `>`, `"`.
pub fn escape_html(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

/// Escape for body-text position: `&`, `<`, `>`.
pub fn escape_html_body_text(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

/// Escape for href/src position.
///
/// URL-safe bytes pass through, the HTML-significant quoting chars become
/// entities, everything else is percent-encoded UTF-8. Already-encoded `%XX`
/// sequences pass through untouched, so the escape is stable under repeats.
pub fn escape_href(out: &mut String, s: &str) {
    let mut buf = [0u8; 4];
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&#x27;"),
            '"' => out.push_str("&quot;"),
            c if c.is_ascii() && href_byte_safe(c as u8) => out.push(c),
            c => {
                for b in c.encode_utf8(&mut buf).bytes() {
                    push_percent(out, b);
                }
            }
        }
    }
}

fn href_byte_safe(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'-' | b'_'
                | b'.'
                | b'~'
                | b'!'
                | b'*'
                | b'('
                | b')'
                | b','
                | b';'
                | b':'
                | b'@'
                | b'$'
                | b'+'
                | b'='
                | b'/'
                | b'?'
                | b'#'
                | b'%'
        )
}

fn push_percent(out: &mut String, b: u8) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    out.push('%');
    out.push(HEX[(b >> 4) as usize] as char);
    out.push(HEX[(b & 0xf) as usize] as char);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn href(s: &str) -> String {
        let mut out = String::new();
        escape_href(&mut out, s);
        out
    }

    #[test]
    fn test_escape_html() {
        let mut out = String::new();
        escape_html(&mut out, "a<b>&\"c\"");
        assert_eq!(out, "a&lt;b&gt;&amp;&quot;c&quot;");
    }

    #[test]
    fn test_body_text_keeps_quotes() {
        let mut out = String::new();
        escape_html_body_text(&mut out, "\"a\" & <b>");
        assert_eq!(out, "\"a\" &amp; &lt;b&gt;");
    }

    #[test]
    fn test_escape_href() {
        assert_eq!(href("https://example.com/a?b=c#d"), "https://example.com/a?b=c#d");
        assert_eq!(href("a b"), "a%20b");
        assert_eq!(href("a\"b'c"), "a&quot;b&#x27;c");
        // Multi-byte chars percent-encode as UTF-8.
        assert_eq!(href("é"), "%C3%A9");
    }
}
