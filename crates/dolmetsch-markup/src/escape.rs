//! Escaping rules of the constrained HTML dialect.
//!
//! Only `&lt;`, `&gt;`, `&amp;`, `&quot;` and numeric character references are
//! understood by the renderer; every other `&` must be escaped.

use std::fmt::Write;

/// Escape decoded text for use between tags.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape decoded text for use inside a double-quoted attribute value.
pub fn escape_attr(text: &str) -> String {
    escape_text(text).replace('"', "&quot;")
}

/// Append decoded text to rendered output.
///
/// Rendered output is itself valid markdown input, and parsing it again must
/// give back the same text. Characters markdown acts on are therefore written
/// as numeric references. Block markers (`#`, `-`, `+`, `=`, `1.`, `1)`) and
/// indentation only matter at the start of a line, so those are encoded only
/// there. Blanks before a line break are dropped, since two of them would
/// read as a hard break.
pub fn push_literal(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '*' | '_' | '`' | '~' | '[' | '\\' => push_numeric(out, ch),
            '\n' => push_newline(out),
            ' ' | '\t' if in_indent(out) => push_numeric(out, ch),
            '#' | '-' | '+' | '=' if at_line_start(out) => push_numeric(out, ch),
            '.' | ')' if after_line_number(out) => push_numeric(out, ch),
            _ => out.push(ch),
        }
    }
}

/// Line break with trailing blanks of the current line removed.
pub fn push_newline(out: &mut String) {
    let kept = out.trim_end_matches([' ', '\t']).len();
    out.truncate(kept);
    out.push('\n');
}

fn push_numeric(out: &mut String, ch: char) {
    let _ = write!(out, "&#{};", u32::from(ch));
}

fn current_line(out: &str) -> &str {
    out.rfind('\n').map_or(out, |i| &out[i + 1..])
}

fn at_line_start(out: &str) -> bool {
    current_line(out).trim_start_matches([' ', '\t']).is_empty()
}

/// Only blanks, already encoded, since the last line break.
fn in_indent(out: &str) -> bool {
    let Some(i) = out.rfind('\n') else {
        return false;
    };
    let mut rest = &out[i + 1..];
    while !rest.is_empty() {
        match rest
            .strip_prefix("&#32;")
            .or_else(|| rest.strip_prefix("&#9;"))
        {
            Some(tail) => rest = tail,
            None => return false,
        }
    }
    true
}

fn after_line_number(out: &str) -> bool {
    let digits = current_line(out).trim_start_matches([' ', '\t']);
    !digits.is_empty() && digits.len() <= 9 && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Decode the entities the dialect supports (plus `&#39;`, which is numeric).
pub fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match supported_entity_len(tail).and_then(|len| decode_entity(&tail[..len]).map(|c| (c, len))) {
            Some((ch, len)) => {
                out.push(ch);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Length of the supported entity at the start of `s`, if there is one.
fn supported_entity_len(s: &str) -> Option<usize> {
    const NAMED: [&str; 4] = ["&lt;", "&gt;", "&amp;", "&quot;"];
    if let Some(named) = NAMED.iter().find(|n| s.starts_with(**n)) {
        return Some(named.len());
    }

    let body = s.strip_prefix("&#")?;
    let (digits, radix, prefix_len) = match body.strip_prefix(['x', 'X']) {
        Some(hex) => (hex, 16, 3),
        None => (body, 10, 2),
    };
    let count = digits.chars().take_while(|c| c.is_digit(radix)).count();
    if count == 0 || count > 7 || !digits[count..].starts_with(';') {
        return None;
    }
    let value = u32::from_str_radix(&digits[..count], radix).ok()?;
    char::from_u32(value)?;
    Some(prefix_len + count + 1)
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "&lt;" => Some('<'),
        "&gt;" => Some('>'),
        "&amp;" => Some('&'),
        "&quot;" => Some('"'),
        _ => {
            let body = entity.strip_prefix("&#")?.strip_suffix(';')?;
            let value = match body.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => body.parse::<u32>().ok()?,
            };
            char::from_u32(value)
        }
    }
}
