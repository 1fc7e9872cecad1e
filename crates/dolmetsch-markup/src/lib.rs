//! Markdown to Telegram's constrained HTML dialect.
//!
//! Language models answer in markdown; Telegram renders only a handful of
//! HTML tags and rejects the whole message when it meets anything else. The
//! sanitizer turns arbitrary markdown (including embedded HTML) into output
//! that uses only:
//!
//! | construct      | tag                                 |
//! |----------------|-------------------------------------|
//! | bold           | `<b>`                               |
//! | italic         | `<i>`                               |
//! | strikethrough  | `<s>`                               |
//! | underline      | `<u>`                               |
//! | inline code    | `<code>`                            |
//! | code block     | `<pre>`, `<pre><code class="language-x">` |
//! | link           | `<a href="...">`                    |
//! | blockquote     | `<blockquote>`                      |
//!
//! Paragraphs become line breaks, list items become `• ` lines, every other
//! tag is removed with its text kept. Sanitizing sanitized output is a no-op.

pub mod escape;
pub mod html;
pub mod render;
pub mod tree;

use std::sync::LazyLock;

use regex::Regex;

pub use escape::escape_text;

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("Invalid newline regex"));

/// Convert markdown into the constrained HTML dialect.
pub fn sanitize(markdown: &str) -> String {
    let rendered = render::render(&tree::parse(markdown));
    EXCESS_NEWLINES
        .replace_all(&rendered, "\n\n")
        .trim()
        .to_string()
}

/// The text a client displays for rendered markup: tags dropped, entities
/// decoded.
pub fn visible_text(html: &str) -> String {
    html::tokenize(html)
        .into_iter()
        .filter_map(|token| match token {
            html::Token::Text(text) => Some(escape::decode_entities(text)),
            html::Token::Tag(_) => None,
        })
        .collect()
}
