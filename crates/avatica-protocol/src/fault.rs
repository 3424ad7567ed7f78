//! Turns non-200 response bodies into categorized errors.
//!
//! The query server answers failures either with a Jetty HTML error page or
//! with an `ErrorResponse` envelope. Both parsers return `None` when the body
//! is not something they understand so the caller can fall back to a plain
//! status-code error.

use crate::messages::WireMessage;
use crate::responses::ErrorResponse;
use crate::wire::AvaticaResponse;
use avatica_core::{parse_sql_error, sql_error, AvaticaError};
use prost::Message;
use std::borrow::Cow;

pub const SERVER_ERROR_TITLE: &str = "HTTP ERROR: 500";

pub fn is_error_page(body: &[u8]) -> bool {
    body.windows(6).any(|window| window == b"<html>")
}

pub fn parse_error_page(html: &str) -> Option<AvaticaError> {
    let page = ErrorPage::parse(html);
    if page.title != [SERVER_ERROR_TITLE] {
        return None;
    }
    let message = page.message.join(" ").trim().to_string();
    Some(parse_sql_error(&message).unwrap_or_else(|| AvaticaError::internal(message)))
}

pub fn parse_error_envelope(body: &[u8]) -> Option<AvaticaError> {
    let envelope = WireMessage::decode(body).ok()?;
    if envelope.name != ErrorResponse::WIRE_NAME {
        return None;
    }
    let response = ErrorResponse::decode(envelope.wrapped_message.as_slice()).ok()?;
    Some(error_from_response(&response))
}

pub fn error_from_response(response: &ErrorResponse) -> AvaticaError {
    parse_sql_error(&response.error_message).unwrap_or_else(|| {
        sql_error(
            response.error_code as i64,
            &response.sql_state,
            response.error_message.clone(),
        )
    })
}

/// Text collected from `html > body > h2` (title) and `html > body > p > pre` (message).
#[derive(Debug, Default)]
struct ErrorPage {
    path: Vec<String>,
    title: Vec<String>,
    message: Vec<String>,
}

impl ErrorPage {
    fn parse(html: &str) -> Self {
        let mut page = ErrorPage::default();
        let mut rest = html;
        while !rest.is_empty() {
            match rest.find('<') {
                None => {
                    page.text(rest);
                    break;
                }
                Some(start) => {
                    if start > 0 {
                        page.text(&rest[..start]);
                    }
                    rest = page.markup(&rest[start..]);
                }
            }
        }
        page
    }

    /// Consumes one tag, comment or declaration and returns the remaining input.
    fn markup<'a>(&mut self, input: &'a str) -> &'a str {
        if let Some(comment) = input.strip_prefix("<!--") {
            return match comment.find("-->") {
                Some(end) => &comment[end + 3..],
                None => "",
            };
        }
        if input.starts_with("<!") || input.starts_with("<?") {
            return match input.find('>') {
                Some(end) => &input[end + 1..],
                None => "",
            };
        }
        if let Some(closing) = input.strip_prefix("</") {
            return match closing.find('>') {
                Some(end) => {
                    self.path.pop();
                    &closing[end + 1..]
                }
                None => "",
            };
        }
        let body = &input[1..];
        if !body.starts_with(|c: char| c.is_ascii_alphabetic()) {
            self.text("<");
            return body;
        }
        let Some(end) = tag_end(body) else {
            return "";
        };
        let tag = &body[..end];
        let name: String = tag
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        self.path.push(name);
        if tag.trim_end().ends_with('/') {
            self.path.pop();
        }
        &body[end + 1..]
    }

    fn text(&mut self, data: &str) {
        if self.path.len() <= 2 || self.path[0] != "html" || self.path[1] != "body" {
            return;
        }
        let data = unescape(data);
        let data = data.trim();
        if data.is_empty() {
            return;
        }
        match &self.path[2..] {
            [h2] if h2 == "h2" => self.title.push(data.to_string()),
            [p, pre] if p == "p" && pre == "pre" => self.message.push(data.to_string()),
            _ => {}
        }
    }
}

/// Index of the `>` closing a start tag, skipping quoted attribute values.
fn tag_end(tag: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in tag.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => return Some(i),
            (None, _) => {}
        }
    }
    None
}

fn unescape(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            decode_entity(entity).map(|c| (c, semi + 1))
        });
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let numeric = entity.strip_prefix('#')?;
            let code = match numeric.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => numeric.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}
