//! Narrow start-tag scanning for tuning and SimData text.
//!
//! Only the root declaration (and SimData's first instance tag) is ever read
//! or rewritten, so this works on spans of the original text and leaves every
//! other byte untouched.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_:][\w:.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("valid attribute regex")
});

/// A start tag located in a larger text. `span` covers `<name ... >`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StartTag {
    pub span: Range<usize>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Attribute {
    pub name: String,
    pub value: String,
    /// Absolute range of the raw (escaped) value, without quotes.
    pub value_span: Range<usize>,
}

/// Locate the root element's start tag, skipping the XML declaration,
/// comments and doctype.
pub(crate) fn find_root(text: &str) -> Option<StartTag> {
    let mut pos = if text.starts_with('\u{feff}') { 3 } else { 0 };

    loop {
        let rest = &text[pos..];
        let trimmed = rest.trim_start();
        pos += rest.len() - trimmed.len();

        if trimmed.starts_with("<?") {
            pos += trimmed.find("?>")? + 2;
        } else if trimmed.starts_with("<!--") {
            pos += trimmed.find("-->")? + 3;
        } else if trimmed.starts_with("<!") {
            pos += trimmed.find('>')? + 1;
        } else if trimmed.starts_with('<') {
            return start_tag_at(text, pos);
        } else {
            return None;
        }
    }
}

/// First start tag named `name` at or after `from`.
pub(crate) fn find_start_tag(text: &str, name: &str, from: usize) -> Option<StartTag> {
    let needle = format!("<{name}");
    let mut cursor = from;
    while let Some(offset) = text.get(cursor..)?.find(&needle) {
        let start = cursor + offset;
        let after = text[start + needle.len()..].chars().next();
        if matches!(after, Some(c) if c.is_whitespace() || c == '>' || c == '/') {
            return start_tag_at(text, start);
        }
        cursor = start + needle.len();
    }
    None
}

fn start_tag_at(text: &str, start: usize) -> Option<StartTag> {
    let name: String = text[start + 1..]
        .chars()
        .take_while(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '.' | '-'))
        .collect();
    if name.is_empty() {
        return None;
    }

    let mut quote = None;
    for (offset, ch) in text[start..].char_indices() {
        match (quote, ch) {
            (None, '"' | '\'') => quote = Some(ch),
            (Some(q), c) if c == q => quote = None,
            (None, '>') => {
                return Some(StartTag {
                    span: start..start + offset + 1,
                    name,
                })
            }
            _ => {}
        }
    }
    None
}

pub(crate) fn attributes(text: &str, tag: &StartTag) -> Vec<Attribute> {
    let body_start = tag.span.start + 1 + tag.name.len();
    let body = &text[body_start..tag.span.end];

    ATTRIBUTE
        .captures_iter(body)
        .filter_map(|caps| {
            let value = caps.get(2).or_else(|| caps.get(3))?;
            Some(Attribute {
                name: caps[1].to_string(),
                value: unescape(value.as_str()),
                value_span: body_start + value.start()..body_start + value.end(),
            })
        })
        .collect()
}

pub(crate) fn attribute(text: &str, tag: &StartTag, name: &str) -> Option<String> {
    attributes(text, tag)
        .into_iter()
        .find(|attr| attr.name == name)
        .map(|attr| attr.value)
}

/// Set (or append) an attribute on `tag`, returning the new text.
pub(crate) fn set_attribute(text: &str, tag: &StartTag, name: &str, value: &str) -> String {
    let escaped = escape(value);
    let mut out = String::with_capacity(text.len() + escaped.len() + name.len() + 4);

    if let Some(existing) = attributes(text, tag).into_iter().find(|a| a.name == name) {
        out.push_str(&text[..existing.value_span.start]);
        out.push_str(&escaped);
        out.push_str(&text[existing.value_span.end..]);
        return out;
    }

    let close = if text[..tag.span.end].ends_with("/>") {
        tag.span.end - 2
    } else {
        tag.span.end - 1
    };
    let head = text[..close].trim_end();
    out.push_str(head);
    out.push_str(&format!(" {name}=\"{escaped}\""));
    out.push_str(&text[close..]);
    out
}

pub(crate) fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

pub(crate) fn unescape(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TUNING: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!-- note -->\n<I c=\"Buff\" i=\"buff\" n=\"creator:buff_A&amp;B\" s=\"42\">\n  <T n=\"x\">1</T>\n</I>";

    #[test]
    fn finds_root_after_prolog() {
        let root = find_root(TUNING).expect("root");
        assert_eq!(root.name, "I");
        assert!(TUNING[root.span.clone()].starts_with("<I c="));
        assert!(TUNING[root.span.clone()].ends_with("\">"));
        assert_eq!(
            attribute(TUNING, &root, "n").as_deref(),
            Some("creator:buff_A&B")
        );
    }

    #[test]
    fn no_root_in_plain_text() {
        assert_eq!(find_root("just text"), None);
        assert_eq!(find_root("<?xml version=\"1.0\"?>"), None);
        assert_eq!(find_root(""), None);
    }

    #[test]
    fn set_attribute_replaces_and_appends() {
        let root = find_root(TUNING).expect("root");
        let renamed = set_attribute(TUNING, &root, "n", "creator:new<1>");
        assert!(renamed.contains("n=\"creator:new&lt;1&gt;\" s=\"42\""));

        let root = find_root(&renamed).expect("root");
        let appended = set_attribute(&renamed, &root, "m", "buffs.buff");
        assert!(appended.contains("s=\"42\" m=\"buffs.buff\">"));
        assert!(appended.ends_with("</I>"));
    }

    #[test]
    fn set_attribute_on_self_closing_tag() {
        let text = "<M n=\"a.b\"/>";
        let root = find_root(text).expect("root");
        assert_eq!(set_attribute(text, &root, "s", "7"), "<M n=\"a.b\" s=\"7\"/>");
    }

    #[test]
    fn find_start_tag_requires_name_boundary() {
        let text = "<SimData><Instances><Item/><I name=\"x\" /></Instances></SimData>";
        let tag = find_start_tag(text, "I", 0).expect("tag");
        assert_eq!(attribute(text, &tag, "name").as_deref(), Some("x"));
    }
}
