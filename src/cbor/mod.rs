//! Minimal CBOR codec for the subset CTAP2 messages use.
//!
//! Definite-length items only; no floats, tags, indefinite-length items or
//! bignums. Requests are assembled as a [`Value`] tree and serialized with
//! [`to_vec`]; responses are decoded with [`from_slice`] and read through the
//! typed [`CborMap`] accessor.

mod decode;
mod encode;
mod error;
mod map;
mod value;

pub use decode::{from_slice, Decoder};
pub use encode::to_vec;
pub use error::{DecodeError, EncodeError};
pub use map::{CborMap, CborMapBuf, MapKey};
pub use value::Value;
