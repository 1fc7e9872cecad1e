//! Tokenizer for the raw HTML fragments that markdown passes through.
//!
//! Only what the sanitizer needs: tag name, open/close/self-closing, and
//! attributes. Comments, doctypes and processing instructions are skipped.

use crate::escape::decode_entities;

/// One raw HTML fragment, split into text runs and tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Raw text between tags, still entity-encoded.
    Text(&'a str),
    Tag(HtmlTag),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlTag {
    /// Lower-cased tag name.
    pub name: String,
    pub closing: bool,
    pub self_closing: bool,
    /// Attribute names (lower-cased) and decoded values.
    pub attrs: Vec<(String, String)>,
}

impl HtmlTag {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Elements that never have content or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Canonical name used to pair opening and closing tags, so that
/// `<strong>..</b>` and `<del>..</strike>` close each other.
pub fn canonical_name(name: &str) -> &str {
    match name {
        "b" | "strong" => "b",
        "i" | "em" => "i",
        "s" | "strike" | "del" => "s",
        "u" | "ins" => "u",
        "ul" | "ol" => "ul",
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "h1",
        other => other,
    }
}

/// Split a raw HTML fragment into text runs and tags.
///
/// A `<` that does not start a well-formed tag is returned as text.
pub fn tokenize(fragment: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = fragment;

    while let Some(pos) = rest.find('<') {
        if pos > 0 {
            tokens.push(Token::Text(&rest[..pos]));
        }
        let tail = &rest[pos..];

        if let Some(len) = skip_declaration(tail) {
            rest = &tail[len..];
            continue;
        }

        match parse_tag(tail) {
            Some((tag, len)) => {
                tokens.push(Token::Tag(tag));
                rest = &tail[len..];
            }
            None => {
                tokens.push(Token::Text("<"));
                rest = &tail[1..];
            }
        }
    }

    if !rest.is_empty() {
        tokens.push(Token::Text(rest));
    }
    tokens
}

/// Length of a comment, doctype or processing instruction at the start of `s`.
fn skip_declaration(s: &str) -> Option<usize> {
    if s.starts_with("<!--") {
        return Some(s[4..].find("-->").map_or(s.len(), |end| 4 + end + 3));
    }
    if s.starts_with("<!") || s.starts_with("<?") {
        return Some(s.find('>').map_or(s.len(), |end| end + 1));
    }
    None
}

/// Parse a tag at the start of `s`; returns the tag and its byte length.
fn parse_tag(s: &str) -> Option<(HtmlTag, usize)> {
    let body = s.strip_prefix('<')?;
    let (closing, body) = match body.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, body),
    };

    if !body.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let name_len = body
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(body.len());
    let name = body[..name_len].to_ascii_lowercase();

    let after_name = &body[name_len..];
    if !after_name.starts_with(|c: char| c == '>' || c == '/' || c.is_whitespace()) {
        return None;
    }
    let end = find_tag_end(after_name)?;
    let inner = &after_name[..end];
    let (inner, self_closing) = match inner.trim_end().strip_suffix('/') {
        Some(stripped) => (stripped, true),
        None => (inner, false),
    };

    let consumed = s.len() - after_name.len() + end + 1;
    Some((
        HtmlTag {
            name,
            closing,
            self_closing,
            attrs: parse_attrs(inner),
        },
        consumed,
    ))
}

/// Byte offset of the `>` that ends the tag, skipping quoted values.
fn find_tag_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, ch) in s.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '>') => return Some(i),
            (None, '<') => return None,
            _ => {}
        }
    }
    None
}

fn parse_attrs(s: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut rest = s.trim_start();

    while !rest.is_empty() {
        let name_len = rest
            .find(|c: char| c.is_whitespace() || c == '=')
            .unwrap_or(rest.len());
        let name = rest[..name_len].to_ascii_lowercase();
        rest = rest[name_len..].trim_start();

        let value = match rest.strip_prefix('=') {
            Some(after_eq) => {
                let after_eq = after_eq.trim_start();
                let (value, remaining) = split_attr_value(after_eq);
                rest = remaining;
                decode_entities(value)
            }
            None => String::new(),
        };

        if !name.is_empty() {
            attrs.push((name, value));
        }
        rest = rest.trim_start();
    }
    attrs
}

/// Split an attribute value (quoted or bare) from the remaining input.
fn split_attr_value(s: &str) -> (&str, &str) {
    for quote in ['"', '\''] {
        if let Some(body) = s.strip_prefix(quote) {
            return match body.find(quote) {
                Some(end) => (&body[..end], &body[end + 1..]),
                None => (body, ""),
            };
        }
    }
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    (&s[..end], &s[end..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag<'a>(token: &'a Token<'a>) -> &'a HtmlTag {
        match token {
            Token::Tag(t) => t,
            Token::Text(t) => panic!("expected tag, got text {t:?}"),
        }
    }

    #[test]
    fn splits_text_and_tags() {
        let tokens = tokenize("a<b>c</b>d");
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0], Token::Text("a"));
        assert_eq!(tag(&tokens[1]).name, "b");
        assert!(!tag(&tokens[1]).closing);
        assert_eq!(tokens[2], Token::Text("c"));
        assert!(tag(&tokens[3]).closing);
        assert_eq!(tokens[4], Token::Text("d"));
    }

    #[test]
    fn parses_quoted_attributes() {
        let tokens = tokenize(r#"<a href="https://x.test/?a=1&amp;b=2" title='t > u'>"#);
        let a = tag(&tokens[0]);
        assert_eq!(a.attr("href"), Some("https://x.test/?a=1&b=2"));
        assert_eq!(a.attr("title"), Some("t > u"));
    }

    #[test]
    fn parses_bare_and_valueless_attributes() {
        let tokens = tokenize("<code class=language-rust hidden>");
        let code = tag(&tokens[0]);
        assert_eq!(code.attr("class"), Some("language-rust"));
        assert_eq!(code.attr("hidden"), Some(""));
    }

    #[test]
    fn detects_self_closing() {
        let tokens = tokenize("<br/><hr />");
        assert!(tag(&tokens[0]).self_closing);
        assert!(tag(&tokens[1]).self_closing);
        assert_eq!(tag(&tokens[1]).name, "hr");
    }

    #[test]
    fn lone_angle_bracket_is_text() {
        let tokens = tokenize("1 < 2 and <3");
        assert!(tokens.iter().all(|t| matches!(t, Token::Text(_))));
    }

    #[test]
    fn comments_are_skipped() {
        let tokens = tokenize("a<!-- hidden <b> -->b");
        assert_eq!(tokens, vec![Token::Text("a"), Token::Text("b")]);
    }

    #[test]
    fn unterminated_comment_swallows_rest() {
        assert_eq!(tokenize("a<!-- open"), vec![Token::Text("a")]);
    }

    #[test]
    fn canonical_names_pair_synonyms() {
        assert_eq!(canonical_name("strong"), canonical_name("b"));
        assert_eq!(canonical_name("del"), canonical_name("strike"));
        assert_eq!(canonical_name("h3"), canonical_name("h1"));
        assert_eq!(canonical_name("span"), "span");
    }
}
