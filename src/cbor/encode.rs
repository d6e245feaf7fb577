use super::error::EncodeError;
use super::value::Value;

const MAJOR_UNSIGNED: u8 = 0;
const MAJOR_NEGATIVE: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;

const SIMPLE_FALSE: u8 = 0xF4;
const SIMPLE_TRUE: u8 = 0xF5;
const SIMPLE_NULL: u8 = 0xF6;

/// Serialize a [`Value`] tree into its definite-length CBOR encoding.
///
/// Map entries are emitted in insertion order; no canonical key sort is
/// performed.
pub fn to_vec(value: &Value) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    write_value(&mut out, value)?;
    Ok(out)
}

fn write_value(out: &mut Vec<u8>, value: &Value) -> Result<(), EncodeError> {
    match value {
        Value::Null => out.push(SIMPLE_NULL),
        Value::Bool(true) => out.push(SIMPLE_TRUE),
        Value::Bool(false) => out.push(SIMPLE_FALSE),
        Value::Integer(n) => {
            if *n >= 0 {
                write_header(out, MAJOR_UNSIGNED, *n as u64);
            } else {
                // -1 - n, computed as bitwise NOT to survive i64::MIN.
                write_header(out, MAJOR_NEGATIVE, !*n as u64);
            }
        }
        Value::Bytes(bytes) => {
            write_header(out, MAJOR_BYTES, bytes.len() as u64);
            out.extend_from_slice(bytes);
        }
        Value::Text(text) => {
            write_header(out, MAJOR_TEXT, text.len() as u64);
            out.extend_from_slice(text.as_bytes());
        }
        Value::Array(items) => {
            write_header(out, MAJOR_ARRAY, items.len() as u64);
            for item in items {
                write_value(out, item)?;
            }
        }
        Value::Map(entries) => {
            write_header(out, MAJOR_MAP, entries.len() as u64);
            for (key, val) in entries {
                write_value(out, key)?;
                write_value(out, val)?;
            }
        }
        Value::Raw(bytes) => {
            if bytes.is_empty() {
                return Err(EncodeError::EmptyRawValue);
            }
            out.extend_from_slice(bytes);
        }
    }
    Ok(())
}

/// Minimal-length header: major type in the top 3 bits, then the shortest
/// additional-info form that can carry `value`.
fn write_header(out: &mut Vec<u8>, major: u8, value: u64) {
    if value < 24 {
        out.push((major << 5) | value as u8);
    } else if value < 0x100 {
        out.push((major << 5) | 24);
        out.push(value as u8);
    } else if value < 0x1_0000 {
        out.push((major << 5) | 25);
        out.extend_from_slice(&(value as u16).to_be_bytes());
    } else if value < 0x1_0000_0000 {
        out.push((major << 5) | 26);
        out.extend_from_slice(&(value as u32).to_be_bytes());
    } else {
        out.push((major << 5) | 27);
        out.extend_from_slice(&value.to_be_bytes());
    }
}
