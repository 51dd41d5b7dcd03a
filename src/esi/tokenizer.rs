// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lexer for ESI tags embedded in arbitrary document text.
//!
//! Tokenisation is total: malformed ESI tags (for example a missing `>`)
//! degrade to plain text rather than producing an error, so a fetched
//! fragment can never fail to tokenise.

/// One lexical unit of a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Verbatim document text, including any non-ESI markup
    Text(String),
    /// An opening (or self-closing) `esi:` tag
    OpenTag {
        name: String,
        attributes: Vec<(String, String)>,
        self_closing: bool,
    },
    /// A closing `esi:` tag
    CloseTag { name: String },
}

/// Turn raw document text into a token stream.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < input.len() {
        let Some(tag_start) = next_tag_start(&input[pos..]).map(|i| i + pos) else {
            push_text(&mut tokens, &input[pos..]);
            break;
        };

        match lex_tag(&input[tag_start..]) {
            Some((token, consumed)) => {
                push_text(&mut tokens, &input[pos..tag_start]);
                tokens.push(token);
                pos = tag_start + consumed;
            }
            None => {
                // Unterminated tag: the rest of the document is plain text
                push_text(&mut tokens, &input[pos..]);
                break;
            }
        }
    }

    tokens
}

/// Byte offset of the next `<esi:` or `</esi:` occurrence, if any.
fn next_tag_start(input: &str) -> Option<usize> {
    let open = input.find("<esi:");
    let close = input.find("</esi:");
    match (open, close) {
        (Some(o), Some(c)) => Some(o.min(c)),
        (Some(o), None) => Some(o),
        (None, Some(c)) => Some(c),
        (None, None) => None,
    }
}

fn push_text(tokens: &mut Vec<Token>, text: &str) {
    if !text.is_empty() {
        tokens.push(Token::Text(text.to_string()));
    }
}

/// Lex a single tag starting at `input[0] == '<'`.
///
/// Returns the token and the number of bytes consumed, or `None` when the
/// tag is unterminated.
fn lex_tag(input: &str) -> Option<(Token, usize)> {
    let end = input.find('>')?;
    let inner = &input[1..end];

    if let Some(name) = inner.strip_prefix('/') {
        return Some((
            Token::CloseTag {
                name: name.trim().to_string(),
            },
            end + 1,
        ));
    }

    let self_closing = inner.trim_end().ends_with('/');
    let inner = inner.trim_end().trim_end_matches('/');

    let name_end = inner
        .find(char::is_whitespace)
        .unwrap_or(inner.len());
    let name = inner[..name_end].to_string();
    let attributes = parse_attributes(&inner[name_end..]);

    Some((
        Token::OpenTag {
            name,
            attributes,
            self_closing,
        },
        end + 1,
    ))
}

/// Parse `name="value"` pairs; single quotes and unquoted values are
/// accepted, a name without `=` yields an empty value.
fn parse_attributes(input: &str) -> Vec<(String, String)> {
    let mut attributes = Vec::new();
    let mut rest = input.trim();

    while !rest.is_empty() {
        let name_end = rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(rest.len());
        let name = &rest[..name_end];
        rest = rest[name_end..].trim_start();

        if name.is_empty() {
            break;
        }

        if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            let (value, remainder) = read_value(after_eq);
            attributes.push((name.to_string(), value.to_string()));
            rest = remainder.trim_start();
        } else {
            attributes.push((name.to_string(), String::new()));
        }
    }

    attributes
}

fn read_value(input: &str) -> (&str, &str) {
    for quote in ['"', '\''] {
        if let Some(quoted) = input.strip_prefix(quote) {
            return match quoted.find(quote) {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            };
        }
    }
    let end = input.find(char::is_whitespace).unwrap_or(input.len());
    (&input[..end], &input[end..])
}
