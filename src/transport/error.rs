use crate::cbor::{DecodeError, EncodeError};

/// Failure of a transport-level operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The physical link could not be connected at construction.
    ConnectionFailed,
    /// The physical link left the field mid-operation. The transport closes
    /// itself and must not be reused.
    ConnectionLost,
    /// A payload that cannot be framed as an APDU, or a garbled reply frame.
    InvalidFraming,
    /// The link-level response timeout elapsed.
    Timeout,
    /// Generic I/O failure. Also covers a permission failure observed on a
    /// stale link, which is indistinguishable from link loss by the time it
    /// surfaces.
    Io,
    /// A non-success, non-continuation status word. Carries the raw status
    /// bytes for diagnostics; never retried automatically.
    Protocol { sw1: u8, sw2: u8 },
}

impl std::error::Error for TransportError {}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TransportError::Protocol { sw1, sw2 } => {
                write!(f, "APDU protocol error: {:02X}{:02X}", sw1, sw2)
            }
            other => write!(f, "{:?}", other),
        }
    }
}

/// Crate-level error: transport failures plus the CBOR codec's.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    Transport(TransportError),
    Encode(EncodeError),
    Decode(DecodeError),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Transport(err) => write!(f, "{}", err),
            Error::Encode(err) => write!(f, "{}", err),
            Error::Decode(err) => write!(f, "{}", err),
        }
    }
}

impl From<TransportError> for Error {
    fn from(error: TransportError) -> Self {
        Error::Transport(error)
    }
}

impl From<EncodeError> for Error {
    fn from(error: EncodeError) -> Self {
        Error::Encode(error)
    }
}

impl From<DecodeError> for Error {
    fn from(error: DecodeError) -> Self {
        Error::Decode(error)
    }
}
