use std::fmt;

/// Error raised while serializing a [`Value`](super::Value) tree.
///
/// The value model is a closed union, so almost everything is rejected at
/// compile time; the only runtime failure left is a pre-encoded splice the
/// type system cannot verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// A `Raw` value carried no bytes. Splicing an empty item would leave a
    /// container header claiming an entry that has no encoding.
    EmptyRawValue,
}

impl std::error::Error for EncodeError {}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EncodeError::EmptyRawValue => {
                write!(f, "unsupported value in encoder: empty raw (pre-encoded) item")
            }
        }
    }
}

/// Error raised while decoding a CBOR byte buffer.
///
/// Offsets point at the first byte of the item that failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The cursor would read past the end of the buffer.
    UnexpectedEof { offset: usize },
    /// Major type 6 (tags) or another major type outside the CTAP2 subset.
    UnsupportedMajorType { major: u8, offset: usize },
    /// A simple value other than false/true/null, including all floats.
    UnsupportedSimpleValue { info: u8, offset: usize },
    /// Reserved additional-info (28..=30) or indefinite-length (31) header.
    ReservedLength { info: u8, offset: usize },
    /// An unsigned value outside the signed 64-bit range.
    IntegerOverflow { offset: usize },
    /// Containers nested deeper than the supported limit.
    DepthLimitExceeded { offset: usize },
    /// A text string that is not valid UTF-8.
    InvalidUtf8 { offset: usize },
    /// The top-level value was expected to be a map but was something else.
    NotAMap,
}

impl std::error::Error for DecodeError {}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecodeError::UnexpectedEof { offset } => {
                write!(f, "truncated CBOR input: unexpected end of buffer at offset {}", offset)
            }
            DecodeError::UnsupportedMajorType { major, offset } => {
                write!(f, "unsupported CBOR major type {} at offset {}", major, offset)
            }
            DecodeError::UnsupportedSimpleValue { info, offset } => {
                write!(f, "unsupported CBOR simple value {} at offset {}", info, offset)
            }
            DecodeError::ReservedLength { info, offset } => {
                write!(f, "reserved or indefinite length header {} at offset {}", info, offset)
            }
            DecodeError::IntegerOverflow { offset } => {
                write!(f, "integer outside the signed 64-bit range at offset {}", offset)
            }
            DecodeError::DepthLimitExceeded { offset } => {
                write!(f, "containers nested too deeply at offset {}", offset)
            }
            DecodeError::InvalidUtf8 { offset } => {
                write!(f, "text string is not valid UTF-8 at offset {}", offset)
            }
            DecodeError::NotAMap => {
                write!(f, "top-level CBOR value is not a map")
            }
        }
    }
}
