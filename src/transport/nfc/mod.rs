//! CTAP over contactless (NFC) links: applet selection, NFCCTAP_MSG APDU
//! wrapping, and response-chaining reassembly per ISO 7816-4.

pub mod apdu;
pub mod link;
mod transport;

pub use link::{ContactlessLink, LinkError};
pub use transport::NfcTransport;
