//! Response envelope and body decoding.
//!
//! Success responses carry a `RETVAL:` marker followed by either a plain
//! scalar body or the tabular label grammar (`label[i]` / `label[i][j]`
//! lines); error responses open with `ERROR`. A single NUL sentinel may
//! trail the blob and is stripped here.

use crate::error::ProtocolError;
use crate::value::{classify, Value};

/// Marker opening every successful response.
pub const RETVAL: &str = "RETVAL:";

/// Marker opening remote-side failures.
pub const ERROR_MARKER: &str = "ERROR";

/// Raw engine sentinel for reading an empty list.
pub const EMPTY_MARKER: &str = "<EMPTY>";

/// Strip the response envelope, returning the undecoded body.
///
/// # Errors
/// `Remote` for `ERROR…` responses, `BadEnvelope` when the `RETVAL:`
/// marker is missing.
pub fn strip_envelope(blob: &str) -> Result<&str, ProtocolError> {
    let blob = blob.strip_suffix('\0').unwrap_or(blob);
    if blob.starts_with(ERROR_MARKER) {
        return Err(ProtocolError::Remote(blob.to_owned()));
    }
    blob.strip_prefix(RETVAL).ok_or(ProtocolError::BadEnvelope)
}

/// Decode a complete response blob into a typed value.
///
/// # Errors
/// Envelope violations and non-contiguous matrix indices are terminal;
/// they indicate a codec/protocol mismatch, not a non-numeric value.
pub fn decode_response(blob: &str) -> Result<Value, ProtocolError> {
    decode_body(strip_envelope(blob)?)
}

/// Decode a response body whose envelope has already been stripped.
///
/// # Errors
/// See [`decode_response`].
pub fn decode_body(body: &str) -> Result<Value, ProtocolError> {
    let body = body.trim();
    let mut lines = body.lines();
    let first = lines.next().unwrap_or_default();

    // A body whose first line fails the label grammar is one scalar.
    if parse_labeled(first).is_none() {
        return Ok(classify(body));
    }
    decode_table(body.lines())
}

/// One parsed tabular line: the label token, its bracket indices and the
/// optional trailing value token.
struct LabeledLine<'a> {
    label: &'a str,
    indices: Vec<usize>,
    value: Option<&'a str>,
}

fn parse_labeled(line: &str) -> Option<LabeledLine<'_>> {
    let line = line.trim();
    let (token, rest) = match line.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, Some(rest.trim())),
        None => (line, None),
    };

    let open = token.find('[')?;
    if open == 0 {
        return None;
    }

    let mut indices = Vec::new();
    let mut brackets = &token[open..];
    while !brackets.is_empty() {
        let inner = brackets.strip_prefix('[')?;
        let close = inner.find(']')?;
        indices.push(inner[..close].parse::<usize>().ok()?);
        brackets = &inner[close + 1..];
    }
    if indices.is_empty() || indices.len() > 2 {
        return None;
    }

    Some(LabeledLine {
        label: token,
        indices,
        value: rest.filter(|rest| !rest.is_empty()),
    })
}

fn decode_table<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Value, ProtocolError> {
    let mut rows_1d: Vec<Value> = Vec::new();
    let mut rows_2d: Vec<Vec<Value>> = Vec::new();
    let mut dims: Option<usize> = None;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let parsed =
            parse_labeled(line).ok_or_else(|| ProtocolError::MalformedRow(line.to_owned()))?;
        if *dims.get_or_insert(parsed.indices.len()) != parsed.indices.len() {
            return Err(ProtocolError::MalformedRow(line.to_owned()));
        }

        // A line with no value token stands for a heterogeneous/object
        // element; its label text is the element.
        let element = parsed
            .value
            .map_or_else(|| Value::Text(parsed.label.to_owned()), classify);

        match *parsed.indices.as_slice() {
            [i] => {
                let expected = rows_1d.len() + 1;
                if i != expected {
                    return Err(ProtocolError::NonContiguousIndex { expected, found: i });
                }
                rows_1d.push(element);
            }
            [i, j] => {
                if i == rows_2d.len() + 1 {
                    // a new row must open at column 1
                    if j != 1 {
                        return Err(ProtocolError::NonContiguousIndex { expected: 1, found: j });
                    }
                    rows_2d.push(vec![element]);
                } else if i == rows_2d.len() && i > 0 {
                    let row = &mut rows_2d[i - 1];
                    let expected = row.len() + 1;
                    if j != expected {
                        return Err(ProtocolError::NonContiguousIndex { expected, found: j });
                    }
                    row.push(element);
                } else {
                    return Err(ProtocolError::NonContiguousIndex {
                        expected: rows_2d.len() + 1,
                        found: i,
                    });
                }
            }
            _ => unreachable!("parse_labeled caps indices at two"),
        }
    }

    if dims == Some(2) {
        Ok(Value::Table(rows_2d))
    } else {
        Ok(Value::List(rows_1d))
    }
}
