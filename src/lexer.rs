//! Lexical helpers for C-family source text.
//!
//! Everything here is comment- and string-literal-aware but knows nothing
//! about statements; the control-flow scanner and the extractor build on it.

/// Regex fragment matching one double-quoted literal, capturing its raw body.
pub(crate) const LITERAL_PATTERN: &str = r#""((?:\\.|[^"\\])*)""#;

/// Resolves backslash escapes in a raw literal body.
///
/// Unknown escapes keep the escaped character, so `\q` becomes `q`.
pub(crate) fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('a') => out.push('\u{07}'),
            Some('b') => out.push('\u{08}'),
            Some('f') => out.push('\u{0C}'),
            Some('v') => out.push('\u{0B}'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

/// Returns the index just past a quoted literal whose opening quote is at `start`.
///
/// Works for both `"` strings and `'` character literals. An unterminated
/// literal runs to the end of input.
pub(crate) fn skip_quoted(src: &str, start: usize) -> usize {
    quoted_span(src, start).1
}

/// Returns `(body_end, end)` for the literal opening at `start`.
///
/// The body is `src[start + 1..body_end]`; `end` is just past the closing quote.
pub(crate) fn quoted_span(src: &str, start: usize) -> (usize, usize) {
    let bytes = src.as_bytes();
    let quote = bytes[start];
    let mut i = start + 1;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return (i, i + 1),
            _ => i += 1,
        }
    }

    (bytes.len(), bytes.len())
}

/// If a comment starts at `i`, returns the index just past it.
pub(crate) fn skip_comment(src: &str, i: usize) -> Option<usize> {
    let rest = &src.as_bytes()[i..];
    if rest.starts_with(b"//") {
        return Some(src[i..].find('\n').map_or(src.len(), |n| i + n + 1));
    }
    if rest.starts_with(b"/*") {
        return Some(src[i + 2..].find("*/").map_or(src.len(), |n| i + 2 + n + 2));
    }
    None
}

/// Advances one character from a char boundary.
pub(crate) fn next_boundary(src: &str, i: usize) -> usize {
    let mut j = i + 1;
    while j < src.len() && !src.is_char_boundary(j) {
        j += 1;
    }
    j
}

/// True if the byte before `i` cannot continue an identifier.
pub(crate) fn at_word_start(src: &str, i: usize) -> bool {
    i == 0 || !is_ident_byte(src.as_bytes()[i - 1])
}

/// True if the byte at `i` cannot continue an identifier.
pub(crate) fn at_word_end(src: &str, i: usize) -> bool {
    i >= src.len() || !is_ident_byte(src.as_bytes()[i])
}

pub(crate) const fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

pub(crate) fn skip_whitespace(src: &str, mut i: usize) -> usize {
    let bytes = src.as_bytes();
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Finds the delimiter closing the one opened at `open`.
///
/// `open` must index a `{` or `(`. Nested pairs, strings, character
/// literals and comments are skipped.
pub(crate) fn matching_close(src: &str, open: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let (opener, closer) = match bytes[open] {
        b'{' => (b'{', b'}'),
        b'(' => (b'(', b')'),
        _ => return None,
    };

    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        if let Some(next) = skip_comment(src, i) {
            i = next;
            continue;
        }
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_quoted(src, i);
                continue;
            }
            b if b == opener => depth += 1,
            b if b == closer => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }

    None
}

/// Every double-quoted literal in `src`, unescaped, in order.
pub(crate) fn string_literals(src: &str) -> Vec<String> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if let Some(next) = skip_comment(src, i) {
            i = next;
            continue;
        }
        match bytes[i] {
            b'"' => {
                let (body_end, end) = quoted_span(src, i);
                out.push(unescape(&src[i + 1..body_end]));
                i = end;
            }
            b'\'' => i = skip_quoted(src, i),
            _ => i += 1,
        }
    }

    out
}

/// Splits a brace-list body on commas that sit outside nested delimiters and literals.
pub(crate) fn split_top_level(src: &str) -> Vec<&str> {
    let bytes = src.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if let Some(next) = skip_comment(src, i) {
            i = next;
            continue;
        }
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_quoted(src, i);
                continue;
            }
            b'(' | b'{' | b'[' => depth += 1,
            b')' | b'}' | b']' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                parts.push(&src[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    parts.push(&src[start..]);
    parts
}

/// If `element` is exactly one string literal (ignoring whitespace and comments), returns it unescaped.
pub(crate) fn sole_literal(element: &str) -> Option<String> {
    let trimmed = element.trim();
    if !trimmed.starts_with('"') {
        return None;
    }
    let (body_end, end) = quoted_span(trimmed, 0);
    let rest = &trimmed[end..];
    let mut i = 0;
    while i < rest.len() {
        if let Some(next) = skip_comment(rest, i) {
            i = next;
        } else if rest.as_bytes()[i].is_ascii_whitespace() {
            i += 1;
        } else {
            return None;
        }
    }
    Some(unescape(&trimmed[1..body_end]))
}
