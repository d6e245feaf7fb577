pub mod error;
pub mod nfc;

mod transport;

pub use error::{Error, TransportError};
pub use transport::{available_transports, Transport, TransportType};
