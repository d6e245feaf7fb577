//! CTAP2 plumbing for a phone acting as a FIDO2 platform over a contactless
//! link: a minimal CBOR codec restricted to the subset CTAP2 messages use,
//! and an ISO 7816-4 APDU transport with response-chaining reassembly.
//!
//! The upper CTAP message layer builds a request map with [`cbor`], hands the
//! bytes to a [`transport::Transport`], and decodes the reassembled reply
//! through [`cbor::CborMap`].

pub mod cbor;
pub mod transport;
