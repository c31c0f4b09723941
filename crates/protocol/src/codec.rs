//! Frame codec: one JSON value per line.
//!
//! Encoding always produces compact JSON, which never contains a raw newline
//! (newlines inside strings are escaped), so a frame is exactly one line.

use serde::Serialize;
use serde_json::Value;

use crate::message::Message;

/// Codec failures.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The value has no JSON representation (e.g. a map with non-string keys).
    #[error("value is not representable as a JSON frame: {0}")]
    Encoding(#[source] serde_json::Error),
    /// The line is not valid JSON.
    #[error("malformed JSON frame: {0}")]
    Decoding(#[source] serde_json::Error),
}

/// Serialize `value` as a single line of JSON, without the trailing newline.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, CodecError> {
    serde_json::to_string(value).map_err(CodecError::Encoding)
}

/// Serialize `value` into `buf` followed by a newline.
///
/// `buf` is cleared first. On error `buf` is left empty.
pub fn encode_line_into<T: Serialize + ?Sized>(
    buf: &mut Vec<u8>,
    value: &T,
) -> Result<(), CodecError> {
    buf.clear();
    if let Err(e) = serde_json::to_writer(&mut *buf, value) {
        buf.clear();
        return Err(CodecError::Encoding(e));
    }
    buf.push(b'\n');
    Ok(())
}

/// Strip the line terminator (`\n` or `\r\n`) from a raw line.
pub fn trim_line_ending(line: &str) -> &str {
    line.trim_end_matches(|c: char| c == '\n' || c == '\r')
}

/// Parse one line into an untyped JSON value.
pub fn decode_value(line: &str) -> Result<Value, CodecError> {
    serde_json::from_str(trim_line_ending(line)).map_err(CodecError::Decoding)
}

/// Parse one line and classify it.
pub fn decode(line: &str) -> Result<Message, CodecError> {
    decode_value(line).map(Message::from_value)
}
