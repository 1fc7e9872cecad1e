//! Element tree to the constrained HTML dialect.
//!
//! The allowlist check happens here: every [`Kind`] is either written as one
//! of the dialect's tags or flattened to its content. The renderer's nesting
//! rules are enforced through [`Scope`].

use std::sync::LazyLock;

use regex::Regex;

use crate::escape::{escape_attr, push_literal, push_newline};
use crate::tree::{Element, Kind, Node};

/// Glyph that replaces list item markers.
pub const BULLET: &str = "• ";

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("Invalid blank-line regex"));

/// Where in the output tree the renderer currently is.
#[derive(Debug, Clone, Copy, Default)]
struct Scope {
    in_pre: bool,
    in_code: bool,
    in_link: bool,
    in_quote: bool,
    in_list: bool,
}

impl Scope {
    /// Inside code nothing but text is allowed.
    fn verbatim(self) -> bool {
        self.in_pre || self.in_code
    }
}

/// Render a parsed tree. Newline collapsing and trimming are left to the caller.
pub fn render(nodes: &[Node]) -> String {
    let mut out = String::new();
    render_nodes(nodes, Scope::default(), &mut out);
    out
}

fn render_nodes(nodes: &[Node], scope: Scope, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => push_literal(out, text),
            Node::Break => push_newline(out),
            Node::Element(element) => render_element(element, scope, out),
        }
    }
}

fn render_children(element: &Element, scope: Scope) -> String {
    let mut inner = String::new();
    render_nodes(&element.children, scope, &mut inner);
    inner
}

fn render_element(element: &Element, scope: Scope, out: &mut String) {
    match &element.kind {
        Kind::Stripped => render_nodes(&element.children, scope, out),
        Kind::Paragraph | Kind::Heading => {
            render_nodes(&element.children, scope, out);
            push_newline(out);
            push_newline(out);
        }
        Kind::List => {
            let nested = scope.in_list;
            render_nodes(
                &element.children,
                Scope {
                    in_list: true,
                    ..scope
                },
                out,
            );
            if !nested {
                push_newline(out);
            }
        }
        Kind::Item => {
            if !out.is_empty() && !out.ends_with('\n') {
                push_newline(out);
            }
            // Rendered after the bullet so text starting the item is not at a line start.
            let mut item = String::from(BULLET);
            render_nodes(&element.children, scope, &mut item);
            out.push_str(BULLET);
            out.push_str(item[BULLET.len()..].trim_start());
            if !out.ends_with('\n') {
                push_newline(out);
            }
        }
        Kind::Bold | Kind::Italic | Kind::Strike | Kind::Underline if scope.verbatim() => {
            render_nodes(&element.children, scope, out)
        }
        Kind::Bold => inline_tag(out, "<b>", "</b>", &render_children(element, scope)),
        Kind::Italic => inline_tag(out, "<i>", "</i>", &render_children(element, scope)),
        Kind::Strike => inline_tag(out, "<s>", "</s>", &render_children(element, scope)),
        Kind::Underline => inline_tag(out, "<u>", "</u>", &render_children(element, scope)),
        Kind::Link { .. } if scope.verbatim() || scope.in_link => {
            render_nodes(&element.children, scope, out)
        }
        Kind::Link { href } => {
            let inner = render_children(
                element,
                Scope {
                    in_link: true,
                    ..scope
                },
            );
            let open = format!("<a href=\"{}\">", escape_attr(href));
            inline_tag(out, &open, "</a>", &inner);
        }
        Kind::Code { .. } if scope.in_code => render_nodes(&element.children, scope, out),
        Kind::Code { language } => {
            let inner = render_children(
                element,
                Scope {
                    in_code: true,
                    ..scope
                },
            );
            if inner.is_empty() {
                return;
            }
            match language {
                Some(lang) if scope.in_pre => {
                    out.push_str(&format!("<code class=\"language-{}\">", escape_attr(lang)));
                }
                _ => out.push_str("<code>"),
            }
            out.push_str(&inner);
            out.push_str("</code>");
        }
        Kind::Pre { .. } if scope.verbatim() => render_nodes(&element.children, scope, out),
        Kind::Pre { language } => {
            let inner = render_children(
                element,
                Scope {
                    in_pre: true,
                    ..scope
                },
            );
            let inner = inner.trim_end_matches('\n');
            if inner.trim().is_empty() {
                return;
            }
            out.push_str("<pre>");
            match language {
                Some(lang) => {
                    out.push_str(&format!("<code class=\"language-{}\">", escape_attr(lang)));
                    out.push_str(inner);
                    out.push_str("</code>");
                }
                None => out.push_str(inner),
            }
            out.push_str("</pre>\n\n");
        }
        Kind::Blockquote if scope.verbatim() || scope.in_quote => {
            render_nodes(&element.children, scope, out)
        }
        Kind::Blockquote => {
            let inner = render_children(
                element,
                Scope {
                    in_quote: true,
                    ..scope
                },
            );
            // A blank line would end the quote when the output is parsed again.
            let inner = BLANK_LINES.replace_all(inner.trim(), "\n");
            if inner.is_empty() {
                return;
            }
            out.push_str("<blockquote>");
            out.push_str(&inner);
            out.push_str("</blockquote>\n\n");
        }
    }
}

/// Write an inline tag around `inner`, moving edge whitespace outside the tag
/// and dropping the tag entirely when it would be empty.
fn inline_tag(out: &mut String, open: &str, close: &str, inner: &str) {
    let start_trimmed = inner.trim_start();
    let leading = &inner[..inner.len() - start_trimmed.len()];
    let body = start_trimmed.trim_end();
    let trailing = &start_trimmed[body.len()..];

    out.push_str(leading);
    if !body.is_empty() {
        out.push_str(open);
        out.push_str(body);
        out.push_str(close);
    }
    out.push_str(trailing);
}
