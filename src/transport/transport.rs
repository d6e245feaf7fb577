use std::fmt::Display;

use async_trait::async_trait;

use crate::transport::error::Error;

/// Physical link variant. The string identifiers are the ones WebAuthn peers
/// rely on during transport negotiation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransportType {
    Usb,
    Nfc,
}

impl TransportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportType::Usb => "usb",
            TransportType::Nfc => "nfc",
        }
    }
}

impl Display for TransportType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A physical link to an authenticator, exchanging one opaque CTAP command
/// for one opaque response.
///
/// The protocol is strictly half-duplex: each transport owns its link
/// exclusively and never pipelines exchanges. `close` releases the link and
/// is safe to call repeatedly, including on a link that is already gone.
#[async_trait]
pub trait Transport: Send + Display {
    fn transport_type(&self) -> TransportType;

    /// Whether the link is currently usable. Never raises; a lost link
    /// reports `false`.
    fn is_connected(&self) -> bool;

    /// One command/response exchange, suspending the caller until the full
    /// (possibly chained) reply has been reassembled.
    async fn send_ctap_command(&mut self, command: &[u8]) -> Result<Vec<u8>, Error>;

    /// Release the underlying link. Best-effort and idempotent.
    async fn close(&mut self);
}

/// Transports this crate can drive. USB is declared as a sibling capability;
/// only NFC is implemented here.
pub fn available_transports() -> Vec<TransportType> {
    vec![TransportType::Nfc]
}
