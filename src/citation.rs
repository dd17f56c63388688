//! Citation links embedded in answer markup.
//!
//! The server marks each inline citation with a `data-reference` attribute
//! holding a JSON-encoded [`Reference`]. Links are collected when a message
//! is inspected; payloads are only deserialized when a link is opened, so a
//! malformed payload costs that one citation and nothing else.

use tracing::debug;

use crate::Reference;

/// Attribute carrying the serialized reference.
pub const REFERENCE_ATTRIBUTE: &str = "data-reference";

/// One citation element found in bot markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationLink {
    /// Visible text of the link, tags removed.
    pub label: String,
    /// Unescaped value of the `data-reference` attribute.
    pub payload: String,
}

impl CitationLink {
    /// Deserializes the payload, or `None` if it is malformed.
    pub fn reference(&self) -> Option<Reference> {
        match Reference::from_payload(&self.payload) {
            Ok(reference) => Some(reference),
            Err(err) => {
                debug!(label = %self.label, error = %err, "skipping malformed citation payload");
                None
            }
        }
    }
}

/// Collects the citation links of `markup` in document order.
pub fn extract_citations(markup: &str) -> Vec<CitationLink> {
    let mut links = Vec::new();
    let mut rest = markup;
    while let Some(open) = rest.find('<') {
        let Some(close) = find_tag_end(&rest[open..]) else {
            break;
        };
        let tag = &rest[open + 1..open + close];
        rest = &rest[open + close + 1..];
        let Some(payload) = attribute(tag, REFERENCE_ATTRIBUTE) else {
            continue;
        };
        let name = tag_name(tag);
        let (inner, after) = match find_closing(rest, name) {
            Some((inner_end, after)) => (&rest[..inner_end], &rest[after..]),
            None => ("", rest),
        };
        links.push(CitationLink {
            label: strip_markup(inner).trim().to_string(),
            payload: unescape(&payload),
        });
        rest = after;
    }
    links
}

/// Renders the panel shown for an opened citation.
pub fn tooltip_html(reference: &Reference) -> String {
    let source = match &reference.url {
        Some(url) => format!(
            r#"<a href="{}" target="_blank" class="source-link">View source →</a>"#,
            escape(url)
        ),
        None => String::new(),
    };
    format!(
        r#"<div class="reference-tooltip"><div class="title">{}</div><div class="metadata">{}</div><div class="content">{}</div>{}</div>"#,
        escape(&reference.title),
        escape(&reference.byline()),
        escape(&reference.text),
        source
    )
}

/// Escapes text for inclusion in markup or a quoted attribute.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Replaces the character references the server emits with their characters.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';').filter(|semi| *semi <= 10) else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        match decode_entity(&rest[1..semi]) {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
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

/// Reduces markup to display text: tags removed, breaks and block ends
/// turned into newlines, entities decoded.
pub fn strip_markup(markup: &str) -> String {
    let mut text = String::with_capacity(markup.len());
    let mut rest = markup;
    while let Some(open) = rest.find('<') {
        text.push_str(&unescape(&rest[..open]));
        let Some(close) = find_tag_end(&rest[open..]) else {
            text.push_str(&unescape(&rest[open..]));
            return text;
        };
        let tag = &rest[open + 1..open + close];
        let name = tag_name(tag.trim_start_matches('/'));
        let is_break = name.eq_ignore_ascii_case("br");
        let ends_block = tag.starts_with('/')
            && ["p", "div", "li", "h1", "h2", "h3", "h4", "ul", "ol"]
                .iter()
                .any(|block| name.eq_ignore_ascii_case(block));
        if (is_break || ends_block) && !text.ends_with('\n') {
            text.push('\n');
        }
        rest = &rest[open + close + 1..];
    }
    text.push_str(&unescape(rest));
    text
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "quot" => Some('"'),
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}

// Offset of the `>` closing the tag that starts at `markup[0]`, skipping
// over quoted attribute values.
fn find_tag_end(markup: &str) -> Option<usize> {
    let mut quote = None;
    for (index, c) in markup.char_indices().skip(1) {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), _) if c == q => quote = None,
            (None, '>') => return Some(index),
            _ => {}
        }
    }
    None
}

fn tag_name(tag: &str) -> &str {
    let end = tag
        .find(|c: char| c.is_ascii_whitespace() || c == '/')
        .unwrap_or(tag.len());
    &tag[..end]
}

// Finds `</name>` in `markup`: returns where the inner content ends and where
// the text after the closing tag begins.
fn find_closing(markup: &str, name: &str) -> Option<(usize, usize)> {
    let needle = format!("</{}", name.to_ascii_lowercase());
    let start = markup.to_ascii_lowercase().find(&needle)?;
    let end = markup[start..].find('>')? + start + 1;
    Some((start, end))
}

fn attribute(tag: &str, name: &str) -> Option<String> {
    let mut rest = &tag[tag_name(tag).len()..];
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_ascii_whitespace() || c == '/');
        if rest.is_empty() {
            return None;
        }
        let key_end = rest
            .find(|c: char| c.is_ascii_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        let key = &rest[..key_end];
        rest = rest[key_end..].trim_start();
        let value = if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            match after_eq.chars().next() {
                Some(q @ ('"' | '\'')) => {
                    let body = &after_eq[1..];
                    let close = body.find(q).unwrap_or(body.len());
                    rest = body.get(close + 1..).unwrap_or("");
                    Some(&body[..close])
                }
                _ => {
                    let end = after_eq
                        .find(|c: char| c.is_ascii_whitespace())
                        .unwrap_or(after_eq.len());
                    rest = &after_eq[end..];
                    Some(&after_eq[..end])
                }
            }
        } else {
            None
        };
        if key.eq_ignore_ascii_case(name) {
            return value.map(str::to_string);
        }
        if key.is_empty() && value.is_none() {
            // Unparsable leftovers; stop rather than spin.
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANSWER: &str = r##"<p>Open science helps <a href="#" class="reference-link" data-reference="{&quot;title&quot;:&quot;Open Science &amp; Society&quot;,&quot;authors&quot;:&quot;Doe, J.&quot;,&quot;year&quot;:2021,&quot;text&quot;:&quot;Sharing &lt;data&gt; widely.&quot;,&quot;url&quot;:&quot;https://example.org/p&quot;}">[1]</a> and collaboration<a class='reference-link' data-reference='{"title":"Teams","authors":"Roe, R.","year":"2019","text":"Working together."}'><b>[2]</b></a>.</p>"##;

    #[test]
    fn extracts_links_in_order() {
        let links = extract_citations(ANSWER);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].label, "[1]");
        assert_eq!(links[1].label, "[2]");

        let first = links[0].reference().unwrap();
        assert_eq!(first.title, "Open Science & Society");
        assert_eq!(first.text, "Sharing <data> widely.");
        assert_eq!(first.year, "2021");

        let second = links[1].reference().unwrap();
        assert_eq!(second.authors, "Roe, R.");
        assert!(second.url.is_none());
    }

    #[test]
    fn malformed_payload_only_costs_that_citation() {
        let markup = r#"<a data-reference="{not json">[1]</a><a data-reference="{&quot;title&quot;:&quot;ok&quot;}">[2]</a>"#;
        let links = extract_citations(markup);
        assert_eq!(links.len(), 2);
        assert!(links[0].reference().is_none());
        assert_eq!(links[1].reference().unwrap().title, "ok");
    }

    #[test]
    fn markup_without_citations() {
        assert!(extract_citations("<p>No <em>links</em> here</p>").is_empty());
        assert!(extract_citations("plain text").is_empty());
        assert!(extract_citations("<a href=\"x\" unterminated").is_empty());
    }

    #[test]
    fn tooltip_escapes_fields() {
        let reference = Reference {
            title: "<script>".to_string(),
            authors: "A & B".to_string(),
            year: "2020".to_string(),
            text: "quote".to_string(),
            url: Some("https://example.org/?a=1&b=2".to_string()),
        };
        let html = tooltip_html(&reference);
        assert!(html.contains(r#"<div class="title">&lt;script&gt;</div>"#));
        assert!(html.contains(r#"<div class="metadata">A &amp; B (2020)</div>"#));
        assert!(html.contains(r#"href="https://example.org/?a=1&amp;b=2""#));
        assert!(html.contains("View source"));

        let without_url = Reference {
            url: None,
            ..reference
        };
        assert!(!tooltip_html(&without_url).contains("source-link"));
    }

    #[test]
    fn strip_markup_keeps_text() {
        assert_eq!(
            strip_markup("<p>Line one<br>Line &amp; two</p><p>Next</p>"),
            "Line one\nLine & two\nNext\n"
        );
        assert_eq!(strip_markup("no tags"), "no tags");
    }

    #[test]
    fn unescape_numeric_and_unknown() {
        assert_eq!(unescape("&#34;a&#x27;&bogus; & b"), "\"a'&bogus; & b");
    }
}
