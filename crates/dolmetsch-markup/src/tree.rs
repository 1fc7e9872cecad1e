//! Markdown (with embedded HTML) to a tagged-variant element tree.
//!
//! Markdown events and inline HTML tags are folded into one tree. Synonymous
//! tags are normalized to a single [`Kind`] while building, so the renderer
//! only ever sees canonical kinds.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};

use crate::escape::decode_entities;
use crate::html::{self, HtmlTag, Token};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    Bold,
    Italic,
    Strike,
    Underline,
    /// Inline code, or the language-tagged `<code>` inside a code block.
    Code { language: Option<String> },
    /// Code block.
    Pre { language: Option<String> },
    Link { href: String },
    Blockquote,
    Paragraph,
    Heading,
    List,
    Item,
    /// Any element outside the dialect; rendered as its content only.
    Stripped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Decoded text; escaped at render time. Adjacent runs are merged.
    Text(String),
    Break,
    Element(Element),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub kind: Kind,
    pub children: Vec<Node>,
}

impl Element {
    fn new(kind: Kind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }
}

/// Parse markdown into the element tree.
pub fn parse(markdown: &str) -> Vec<Node> {
    let mut builder = TreeBuilder::new();
    for event in Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH) {
        builder.event(event);
    }
    builder.finish()
}

struct Frame {
    element: Element,
    /// Canonical tag name for frames opened by raw HTML; `None` for frames
    /// opened by markdown syntax.
    html_name: Option<String>,
}

/// Stack-based builder. Markdown start/end events are always balanced, raw
/// HTML tags are not: an HTML closing tag may only close HTML frames above
/// the innermost markdown frame, and unclosed HTML frames are closed when
/// their enclosing markdown frame ends.
struct TreeBuilder {
    stack: Vec<Frame>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Frame {
                element: Element::new(Kind::Stripped),
                html_name: None,
            }],
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(_) => self.close_markdown(),
            Event::Text(text) => self.push(Node::Text(text.into_string())),
            Event::Code(code) => {
                let mut element = Element::new(Kind::Code { language: None });
                element.children.push(Node::Text(code.into_string()));
                self.push(Node::Element(element));
            }
            Event::Html(raw) | Event::InlineHtml(raw) => self.html(&raw),
            Event::SoftBreak | Event::HardBreak | Event::Rule => self.push(Node::Break),
            Event::FootnoteReference(name) => self.push(Node::Text(format!("[{name}]"))),
            Event::TaskListMarker(done) => {
                self.push(Node::Text(if done { "[x] " } else { "[ ] " }.to_string()))
            }
            Event::InlineMath(math) | Event::DisplayMath(math) => {
                self.push(Node::Text(math.into_string()))
            }
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let kind = match tag {
            Tag::Paragraph => Kind::Paragraph,
            Tag::Heading { .. } => Kind::Heading,
            Tag::BlockQuote(_) => Kind::Blockquote,
            Tag::CodeBlock(CodeBlockKind::Fenced(info)) => Kind::Pre {
                language: code_language(info.split_whitespace().next().unwrap_or("")),
            },
            Tag::CodeBlock(CodeBlockKind::Indented) => Kind::Pre { language: None },
            Tag::List(_) => Kind::List,
            Tag::Item => Kind::Item,
            Tag::Emphasis => Kind::Italic,
            Tag::Strong => Kind::Bold,
            Tag::Strikethrough => Kind::Strike,
            Tag::Link { dest_url, .. } if is_linkable(&dest_url) => Kind::Link {
                href: dest_url.into_string(),
            },
            _ => Kind::Stripped,
        };
        self.open(kind, None);
    }

    fn html(&mut self, raw: &str) {
        for token in html::tokenize(raw) {
            match token {
                Token::Text(text) => self.push(Node::Text(decode_entities(text))),
                Token::Tag(tag) => self.html_tag(&tag),
            }
        }
    }

    fn html_tag(&mut self, tag: &HtmlTag) {
        let name = html::canonical_name(&tag.name).to_string();

        if html::is_void(&tag.name) {
            if matches!(tag.name.as_str(), "br" | "hr") {
                self.push(Node::Break);
            }
            return;
        }
        if tag.closing {
            self.close_html(&name);
            return;
        }
        if tag.self_closing {
            return;
        }

        let kind = match name.as_str() {
            "b" => Kind::Bold,
            "i" => Kind::Italic,
            "s" => Kind::Strike,
            "u" => Kind::Underline,
            "code" => Kind::Code {
                language: tag
                    .attr("class")
                    .and_then(|class| class.strip_prefix("language-"))
                    .and_then(code_language),
            },
            "pre" => Kind::Pre { language: None },
            "a" => match tag.attr("href").map(str::trim) {
                Some(href) if is_linkable(href) => Kind::Link {
                    href: href.to_string(),
                },
                _ => Kind::Stripped,
            },
            "blockquote" => Kind::Blockquote,
            "p" => Kind::Paragraph,
            "li" => Kind::Item,
            "ul" => Kind::List,
            "h1" => Kind::Heading,
            _ => Kind::Stripped,
        };
        self.open(kind, Some(name));
    }

    fn push(&mut self, node: Node) {
        let Some(top) = self.stack.last_mut() else {
            return;
        };
        match (top.element.children.last_mut(), node) {
            (Some(Node::Text(last)), Node::Text(text)) => last.push_str(&text),
            (_, node) => top.element.children.push(node),
        }
    }

    fn open(&mut self, kind: Kind, html_name: Option<String>) {
        self.stack.push(Frame {
            element: Element::new(kind),
            html_name,
        });
    }

    /// Pop the top frame into its parent. The root frame is never popped.
    fn pop(&mut self) -> bool {
        if self.stack.len() <= 1 {
            return false;
        }
        if let Some(frame) = self.stack.pop() {
            self.push(Node::Element(frame.element));
        }
        true
    }

    /// Close the innermost markdown frame and any HTML frames left open inside it.
    fn close_markdown(&mut self) {
        while self.stack.len() > 1 {
            let is_markdown = self.stack.last().is_some_and(|f| f.html_name.is_none());
            self.pop();
            if is_markdown {
                break;
            }
        }
    }

    /// Close the nearest matching HTML frame; unmatched closing tags are dropped.
    fn close_html(&mut self, name: &str) {
        let mut target = None;
        for (index, frame) in self.stack.iter().enumerate().rev() {
            match frame.html_name.as_deref() {
                None => break,
                Some(open) if open == name => {
                    target = Some(index);
                    break;
                }
                Some(_) => {}
            }
        }
        if let Some(index) = target {
            while self.stack.len() > index {
                self.pop();
            }
        }
    }

    fn finish(mut self) -> Vec<Node> {
        while self.pop() {}
        self.stack
            .pop()
            .map(|root| root.element.children)
            .unwrap_or_default()
    }
}

/// The renderer only resolves absolute web, mail and `tg:` links.
fn is_linkable(href: &str) -> bool {
    const SCHEMES: [&str; 4] = ["http://", "https://", "mailto:", "tg://"];
    let lower = href.to_ascii_lowercase();
    SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) && !href.contains(char::is_whitespace)
}

/// Accept a code block language only if it is a plain identifier such as
/// `rust`, `c++` or `objective-c`.
fn code_language(lang: &str) -> Option<String> {
    let valid = !lang.is_empty()
        && lang.len() <= 32
        && lang
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '#' | '.'));
    valid.then(|| lang.to_string())
}
