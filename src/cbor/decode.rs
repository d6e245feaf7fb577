use std::io::Cursor as IOCursor;

use byteorder::{BigEndian, ReadBytesExt};

use super::error::DecodeError;
use super::value::Value;

// Deep enough for any CTAP2 message, shallow enough that malformed input
// cannot exhaust the recursion stack.
const MAX_NESTING_DEPTH: usize = 32;

/// Decode exactly one top-level CBOR value from the buffer.
///
/// Trailing bytes after the first value are ignored; use [`Decoder`] to pull
/// a stream of consecutive values.
pub fn from_slice(data: &[u8]) -> Result<Value, DecodeError> {
    Decoder::new(data).read_value()
}

/// Pull parser over a byte buffer: a stateful cursor consumed left to right,
/// single pass, no backtracking.
pub struct Decoder<'a> {
    cursor: IOCursor<&'a [u8]>,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: IOCursor::new(data),
        }
    }

    /// Cursor offset into the buffer.
    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    /// True once the cursor has consumed the whole buffer.
    pub fn is_empty(&self) -> bool {
        self.position() >= self.cursor.get_ref().len()
    }

    /// Consume exactly one value and advance the cursor past it. May be
    /// called repeatedly to decode consecutive top-level values.
    pub fn read_value(&mut self) -> Result<Value, DecodeError> {
        self.read_value_at(0)
    }

    fn read_value_at(&mut self, depth: usize) -> Result<Value, DecodeError> {
        let offset = self.position();
        if depth > MAX_NESTING_DEPTH {
            return Err(DecodeError::DepthLimitExceeded { offset });
        }
        let initial = self
            .cursor
            .read_u8()
            .map_err(|_| DecodeError::UnexpectedEof { offset })?;
        let major = initial >> 5;
        let info = initial & 0x1F;

        match major {
            0 => {
                let raw = self.read_length(info, offset)?;
                let n =
                    i64::try_from(raw).map_err(|_| DecodeError::IntegerOverflow { offset })?;
                Ok(Value::Integer(n))
            }
            1 => {
                let raw = self.read_length(info, offset)?;
                let n =
                    i64::try_from(raw).map_err(|_| DecodeError::IntegerOverflow { offset })?;
                Ok(Value::Integer(-1 - n))
            }
            2 => {
                let len = self.read_length(info, offset)?;
                let bytes = self.take_slice(len, offset)?;
                Ok(Value::Bytes(bytes.to_vec()))
            }
            3 => {
                let len = self.read_length(info, offset)?;
                let bytes = self.take_slice(len, offset)?;
                let text = std::str::from_utf8(bytes)
                    .map_err(|_| DecodeError::InvalidUtf8 { offset })?;
                Ok(Value::Text(text.to_string()))
            }
            4 => {
                let count = self.read_length(info, offset)?;
                let mut items = Vec::new();
                for _ in 0..count {
                    items.push(self.read_value_at(depth + 1)?);
                }
                Ok(Value::Array(items))
            }
            5 => {
                let count = self.read_length(info, offset)?;
                let mut entries: Vec<(Value, Value)> = Vec::new();
                for _ in 0..count {
                    let key = self.read_value_at(depth + 1)?;
                    let value = self.read_value_at(depth + 1)?;
                    // A later duplicate key overwrites the earlier entry.
                    match entries.iter_mut().find(|(k, _)| *k == key) {
                        Some(entry) => entry.1 = value,
                        None => entries.push((key, value)),
                    }
                }
                Ok(Value::Map(entries))
            }
            7 => match info {
                20 => Ok(Value::Bool(false)),
                21 => Ok(Value::Bool(true)),
                22 | 23 => Ok(Value::Null),
                _ => Err(DecodeError::UnsupportedSimpleValue { info, offset }),
            },
            _ => Err(DecodeError::UnsupportedMajorType { major, offset }),
        }
    }

    /// Decode the additional-info length field, mirroring the encoder's
    /// header scheme in reverse.
    fn read_length(&mut self, info: u8, offset: usize) -> Result<u64, DecodeError> {
        let eof = |_| DecodeError::UnexpectedEof { offset };
        match info {
            0..=23 => Ok(info as u64),
            24 => Ok(self.cursor.read_u8().map_err(eof)? as u64),
            25 => Ok(self.cursor.read_u16::<BigEndian>().map_err(eof)? as u64),
            26 => Ok(self.cursor.read_u32::<BigEndian>().map_err(eof)? as u64),
            27 => self.cursor.read_u64::<BigEndian>().map_err(eof),
            _ => Err(DecodeError::ReservedLength { info, offset }),
        }
    }

    /// Take `len` payload bytes, failing rather than reading past the end.
    fn take_slice(&mut self, len: u64, offset: usize) -> Result<&'a [u8], DecodeError> {
        let data = *self.cursor.get_ref();
        let start = self.position();
        let len = usize::try_from(len).map_err(|_| DecodeError::UnexpectedEof { offset })?;
        let end = start
            .checked_add(len)
            .ok_or(DecodeError::UnexpectedEof { offset })?;
        if end > data.len() {
            return Err(DecodeError::UnexpectedEof { offset });
        }
        self.cursor.set_position(end as u64);
        Ok(&data[start..end])
    }
}
