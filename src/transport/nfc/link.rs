use std::io::Error as IOError;
use std::time::Duration;

/// Failure reported by the physical contactless link.
#[derive(Debug)]
pub enum LinkError {
    /// The tag physically left the field.
    TagLost,
    /// The platform denied access to the link, typically because the handle
    /// aged out after the tag moved away.
    AccessDenied,
    /// Any other I/O failure.
    Io(IOError),
}

impl std::error::Error for LinkError {}

impl std::fmt::Display for LinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LinkError::TagLost => write!(f, "contactless tag left the field"),
            LinkError::AccessDenied => write!(f, "access to the contactless link was denied"),
            LinkError::Io(err) => write!(f, "contactless link I/O error: {}", err),
        }
    }
}

impl From<IOError> for LinkError {
    fn from(error: IOError) -> Self {
        LinkError::Io(error)
    }
}

/// An ISO-DEP (ISO 14443-4) contactless link, as handed over by the platform
/// NFC stack when a tag enters the field.
///
/// All operations are blocking at the hardware level; the transport invokes
/// them from within the caller-managed asynchronous context and never runs
/// two exchanges concurrently on one link.
pub trait ContactlessLink: Send {
    /// Re-evaluated on demand, not cached.
    fn is_connected(&self) -> Result<bool, LinkError>;

    fn connect(&mut self) -> Result<(), LinkError>;

    /// Response timeout for subsequent transceive calls.
    fn set_timeout(&mut self, timeout: Duration);

    /// Send one raw APDU and block for the single reply frame.
    fn transceive(&mut self, command: &[u8]) -> Result<Vec<u8>, LinkError>;

    fn close(&mut self) -> Result<(), LinkError>;
}
