use chrono::{DateTime, Utc};
use event::StructuredData;
use indexmap::IndexMap;

use super::{Message, priority};
use crate::decoding::DeserializeError;

const NIL: &str = "-";
const BOM: char = '\u{feff}';

pub(super) fn parse(input: &str) -> Result<Message<'_>, DeserializeError> {
    let (priority, rest) =
        priority(input)?.ok_or(DeserializeError::Malformed("missing priority"))?;

    let (version, rest) = field(rest)?;
    let version = version
        .parse::<u8>()
        .ok()
        .filter(|v| *v > 0 && version.bytes().all(|b| b.is_ascii_digit()))
        .ok_or(DeserializeError::Malformed("invalid version"))?;

    let (timestamp, rest) = field(rest)?;
    let timestamp = match timestamp {
        NIL => None,
        text => Some(
            DateTime::parse_from_rfc3339(text)
                .map_err(|_| DeserializeError::Malformed("invalid timestamp"))?
                .with_timezone(&Utc),
        ),
    };

    let (hostname, rest) = field(rest)?;
    let (app_name, rest) = field(rest)?;
    let (proc_id, rest) = field(rest)?;
    let (msg_id, rest) = field(rest)?;
    let (structured_data, rest) = structured_data(rest)?;

    let msg = if rest.is_empty() {
        rest
    } else {
        let msg = rest
            .strip_prefix(' ')
            .ok_or(DeserializeError::Malformed("expected a space after structured data"))?;
        msg.strip_prefix(BOM).unwrap_or(msg)
    };

    Ok(Message {
        priority: Some(priority),
        version: Some(version),
        timestamp,
        hostname: nilable(hostname),
        app_name: nilable(app_name),
        proc_id: nilable(proc_id),
        msg_id: nilable(msg_id),
        structured_data,
        msg,
    })
}

/// Takes one space terminated header field.
fn field(input: &str) -> Result<(&str, &str), DeserializeError> {
    match input.split_once(' ') {
        Some((value, rest)) if !value.is_empty() => Ok((value, rest)),
        _ => Err(DeserializeError::Malformed("truncated header")),
    }
}

#[inline]
fn nilable(value: &str) -> Option<&str> {
    (value != NIL).then_some(value)
}

fn structured_data(input: &str) -> Result<(StructuredData, &str), DeserializeError> {
    let mut sd = StructuredData::new();

    if let Some(rest) = input.strip_prefix(NIL) {
        return Ok((sd, rest));
    }

    if !input.starts_with('[') {
        return Err(DeserializeError::Malformed("invalid structured data"));
    }

    let mut rest = input;
    while let Some(remaining) = rest.strip_prefix('[') {
        let (id, params, remaining) = element(remaining)?;

        // the same SD-ID twice is not allowed, but merging loses nothing
        sd.entry(id.to_string()).or_default().extend(params);
        rest = remaining;
    }

    Ok((sd, rest))
}

/// Parses `SD-ID *(SP PARAM-NAME="PARAM-VALUE")]`, the opening bracket is
/// consumed already.
fn element(input: &str) -> Result<(&str, IndexMap<String, String>, &str), DeserializeError> {
    let id_end = input
        .find([' ', ']'])
        .ok_or(DeserializeError::Malformed("unterminated structured data"))?;
    let id = &input[..id_end];
    if id.is_empty() || id.contains(['=', '"']) {
        return Err(DeserializeError::Malformed("invalid SD-ID"));
    }

    let mut params = IndexMap::new();
    let mut rest = &input[id_end..];
    loop {
        if let Some(remaining) = rest.strip_prefix(']') {
            return Ok((id, params, remaining));
        }

        let param = rest
            .strip_prefix(' ')
            .ok_or(DeserializeError::Malformed("unterminated structured data"))?;
        let (name, remaining) = param
            .split_once("=\"")
            .ok_or(DeserializeError::Malformed("invalid SD-PARAM"))?;
        if name.is_empty() || name.contains([' ', ']', '"']) {
            return Err(DeserializeError::Malformed("invalid SD-PARAM name"));
        }

        let (value, remaining) = param_value(remaining)?;
        params.insert(name.to_string(), value);
        rest = remaining;
    }
}

/// Reads a quoted value up to the closing `"`, unescaping `\"`, `\\` and `\]`.
/// A backslash in front of anything else is kept.
fn param_value(input: &str) -> Result<(String, &str), DeserializeError> {
    let mut value = String::new();
    let mut chars = input.char_indices();

    while let Some((index, c)) = chars.next() {
        match c {
            '"' => return Ok((value, &input[index + 1..])),
            '\\' => match chars.next() {
                Some((_, escaped @ ('"' | '\\' | ']'))) => value.push(escaped),
                Some((_, other)) => {
                    value.push('\\');
                    value.push(other);
                }
                None => break,
            },
            c => value.push(c),
        }
    }

    Err(DeserializeError::Malformed("unterminated SD-PARAM value"))
}
