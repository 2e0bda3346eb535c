// Text-frame codec for the duel protocol.
//
// One WebSocket text frame carries one JSON event. `encode` serializes any
// outbound message; `decode_server` is a strict decoder for clients reading
// relay events; `decode_client` is the relay's lenient decoder for untrusted
// client input.
//
// Lenient decoding rules (the browser clients send loosely typed JSON):
// - numbers: a finite JSON number, or a string that parses to one. Anything
//   else (null, bool, NaN text, objects) is "not a number" and becomes `None`,
//   so the relay falls back to its stored value instead of propagating junk.
// - flags: JavaScript-style truthiness. Missing, null, false, 0, NaN and ""
//   are false; everything else is true.
// - slots: coerced like numbers, then accepted only if exactly 1 or 2.
//
// A `MAX_FRAME_BYTES` constant bounds a single frame. The WebSocket layer is
// configured with the same limit; the check here covers callers that feed
// text from elsewhere.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::message::{ClientMessage, ServerMessage};
use crate::types::Slot;

/// Maximum accepted frame size (64 KiB). The largest legitimate frame is a
/// `welcome` snapshot, which is a few hundred bytes.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Why a frame could not be turned into a message.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame too large: {len} bytes (max {max})")]
    TooLarge { len: usize, max: usize },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("frame has no string `type` field")]
    MissingType,
    #[error("unknown message type `{0}`")]
    UnknownType(String),
}

/// Serialize a message into the text of one frame.
pub fn encode<T: Serialize>(msg: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}

/// Strictly decode a relay event.
pub fn decode_server(text: &str) -> Result<ServerMessage, DecodeError> {
    check_len(text)?;
    Ok(serde_json::from_str(text)?)
}

/// Leniently decode a client event. See the module comment for the coercion
/// rules. Unknown `type` values are reported as `UnknownType` so the caller
/// can ignore them without treating them as malformed.
pub fn decode_client(text: &str) -> Result<ClientMessage, DecodeError> {
    check_len(text)?;
    let value: Value = serde_json::from_str(text)?;
    let Value::Object(fields) = value else {
        return Err(DecodeError::NotAnObject);
    };
    let kind = fields
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?;

    match kind {
        "state" => Ok(ClientMessage::State {
            x: number_field(&fields, "x"),
            y: number_field(&fields, "y"),
            flip_x: fields.get("flipX").is_some_and(truthy),
            moving: fields.get("moving").is_some_and(truthy),
        }),
        "shoot" => Ok(ClientMessage::Shoot {
            x: number_field(&fields, "x"),
            y: number_field(&fields, "y"),
            dx: number_field(&fields, "dx"),
            dy: number_field(&fields, "dy"),
        }),
        "hit" => Ok(ClientMessage::Hit {
            target_slot: fields.get("targetSlot").and_then(coerce_slot),
        }),
        other => Err(DecodeError::UnknownType(other.to_owned())),
    }
}

fn check_len(text: &str) -> Result<(), DecodeError> {
    if text.len() > MAX_FRAME_BYTES {
        return Err(DecodeError::TooLarge {
            len: text.len(),
            max: MAX_FRAME_BYTES,
        });
    }
    Ok(())
}

fn number_field(fields: &Map<String, Value>, name: &str) -> Option<f64> {
    fields.get(name).and_then(coerce_number)
}

/// A finite number from a JSON number or numeric string.
///
/// Booleans are not numbers here, unlike JavaScript's `Number(true) == 1`:
/// `"targetSlot": true` decodes to no target and the hit is dropped.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// JavaScript-style truthiness of a JSON value.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn coerce_slot(value: &Value) -> Option<Slot> {
    let n = coerce_number(value)?;
    if n == 1.0 {
        Some(Slot::One)
    } else if n == 2.0 {
        Some(Slot::Two)
    } else {
        None
    }
}
