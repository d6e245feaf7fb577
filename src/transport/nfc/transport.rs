use std::convert::TryFrom;
use std::fmt::Display;
use std::io::ErrorKind as IOErrorKind;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, trace, warn};

use crate::transport::error::{Error, TransportError};
use crate::transport::nfc::apdu::{ApduRequest, ApduResponse};
use crate::transport::nfc::link::{ContactlessLink, LinkError};
use crate::transport::transport::{Transport, TransportType};

const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// CTAP transport over an ISO-DEP contactless link.
///
/// Owns the link exclusively. The upper layer selects the FIDO applet once
/// after construction, then issues CTAP commands; each command is wrapped in
/// an NFCCTAP_MSG APDU and the chained reply is reassembled before returning.
pub struct NfcTransport<L: ContactlessLink> {
    link: L,
    closed: bool,
}

impl<L: ContactlessLink> NfcTransport<L> {
    /// Take ownership of a discovered link, connecting it if necessary and
    /// fixing the response timeout.
    pub fn new(mut link: L) -> Result<Self, Error> {
        let connected = link.is_connected().unwrap_or(false);
        if !connected {
            link.connect().map_err(|err| {
                warn!(%err, "Failed to connect contactless link");
                Error::Transport(TransportError::ConnectionFailed)
            })?;
        }
        link.set_timeout(RESPONSE_TIMEOUT);
        Ok(Self {
            link,
            closed: false,
        })
    }

    /// Select the FIDO applet. Success is determined purely by the trailing
    /// status word; a permission failure during the attempt reports `false`
    /// rather than raising.
    #[instrument(skip_all)]
    pub async fn select_applet(&mut self) -> Result<bool, Error> {
        if self.closed {
            return Err(Error::Transport(TransportError::ConnectionLost));
        }

        let raw = ApduRequest::select_fido().encode()?;
        let frame = match self.link.transceive(&raw) {
            Ok(frame) => frame,
            Err(LinkError::AccessDenied) => {
                debug!("Link access denied during applet selection");
                return Ok(false);
            }
            Err(err) => return Err(self.fail_link(err)),
        };
        let response = ApduResponse::try_from(frame.as_slice())?;
        debug!({ sw = response.status_word() }, "SELECT status");
        Ok(response.is_success())
    }

    /// Map a link failure to a transport error, closing the link when the
    /// tag is gone.
    fn fail_link(&mut self, err: LinkError) -> Error {
        match err {
            LinkError::TagLost => {
                warn!("Contactless tag left the field, closing link");
                self.shutdown();
                Error::Transport(TransportError::ConnectionLost)
            }
            // By the time a permission failure surfaces the link is already
            // stale; indistinguishable from loss, surfaced as plain I/O.
            LinkError::AccessDenied => Error::Transport(TransportError::Io),
            LinkError::Io(err) if err.kind() == IOErrorKind::TimedOut => {
                Error::Transport(TransportError::Timeout)
            }
            LinkError::Io(err) => {
                warn!(%err, "Contactless link I/O failure");
                Error::Transport(TransportError::Io)
            }
        }
    }

    fn exchange(&mut self, raw: &[u8]) -> Result<Vec<u8>, Error> {
        match self.link.transceive(raw) {
            Ok(frame) => Ok(frame),
            Err(err) => Err(self.fail_link(err)),
        }
    }

    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(err) = self.link.close() {
            debug!(%err, "Ignoring error while closing contactless link");
        }
    }
}

#[async_trait]
impl<L: ContactlessLink> Transport for NfcTransport<L> {
    fn transport_type(&self) -> TransportType {
        TransportType::Nfc
    }

    fn is_connected(&self) -> bool {
        !self.closed && self.link.is_connected().unwrap_or(false)
    }

    #[instrument(skip_all, fields(len = command.len()))]
    async fn send_ctap_command(&mut self, command: &[u8]) -> Result<Vec<u8>, Error> {
        if self.closed {
            return Err(Error::Transport(TransportError::ConnectionLost));
        }

        let apdu = ApduRequest::ctap_msg(command).encode()?;
        let mut frame = self.exchange(&apdu)?;
        let mut assembled: Vec<u8> = Vec::new();

        loop {
            let response = ApduResponse::try_from(frame.as_slice())?;
            assembled.extend_from_slice(response.data());

            if response.is_success() {
                trace!({ len = assembled.len() }, "CTAP response reassembled");
                return Ok(assembled);
            }

            if let Some(remaining) = response.more_data() {
                debug!({ remaining }, "Response chained, requesting next frame");
                let get = ApduRequest::get_response(remaining).encode()?;
                frame = self.exchange(&get)?;
                continue;
            }

            warn!(
                { sw = response.status_word(), status = ?response.known_status() },
                "APDU error status"
            );
            return Err(Error::Transport(TransportError::Protocol {
                sw1: response.sw1(),
                sw2: response.sw2(),
            }));
        }
    }

    async fn close(&mut self) {
        self.shutdown();
    }
}

impl<L: ContactlessLink> Display for NfcTransport<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "nfc transport ({})",
            if self.closed { "closed" } else { "open" }
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::NfcTransport;
    use crate::transport::error::{Error, TransportError};
    use crate::transport::nfc::link::{ContactlessLink, LinkError};
    use crate::transport::{Transport, TransportType};

    #[derive(Default)]
    struct LinkState {
        sent: Vec<Vec<u8>>,
        close_calls: u32,
        timeout: Option<Duration>,
    }

    /// Scripted ISO-DEP link: pops one pre-programmed reply per transceive.
    struct MockLink {
        replies: VecDeque<Result<Vec<u8>, LinkError>>,
        connected: bool,
        state: Arc<Mutex<LinkState>>,
    }

    impl MockLink {
        fn new(replies: Vec<Result<Vec<u8>, LinkError>>) -> (Self, Arc<Mutex<LinkState>>) {
            let state = Arc::new(Mutex::new(LinkState::default()));
            let link = Self {
                replies: replies.into(),
                connected: true,
                state: state.clone(),
            };
            (link, state)
        }
    }

    impl ContactlessLink for MockLink {
        fn is_connected(&self) -> Result<bool, LinkError> {
            Ok(self.connected)
        }

        fn connect(&mut self) -> Result<(), LinkError> {
            self.connected = true;
            Ok(())
        }

        fn set_timeout(&mut self, timeout: Duration) {
            self.state.lock().unwrap().timeout = Some(timeout);
        }

        fn transceive(&mut self, command: &[u8]) -> Result<Vec<u8>, LinkError> {
            self.state.lock().unwrap().sent.push(command.to_vec());
            self.replies.pop_front().expect("unscripted transceive")
        }

        fn close(&mut self) -> Result<(), LinkError> {
            self.connected = false;
            self.state.lock().unwrap().close_calls += 1;
            Ok(())
        }
    }

    fn reply(payload: &[u8], sw1: u8, sw2: u8) -> Result<Vec<u8>, LinkError> {
        let mut frame = payload.to_vec();
        frame.push(sw1);
        frame.push(sw2);
        Ok(frame)
    }

    #[test]
    fn construction_sets_response_timeout() {
        let (link, state) = MockLink::new(vec![]);
        let _transport = NfcTransport::new(link).unwrap();
        assert_eq!(
            state.lock().unwrap().timeout,
            Some(Duration::from_secs(5))
        );
    }

    #[tokio::test]
    async fn select_applet_success() {
        let (link, state) = MockLink::new(vec![reply(&[], 0x90, 0x00)]);
        let mut transport = NfcTransport::new(link).unwrap();

        assert!(transport.select_applet().await.unwrap());
        let sent = &state.lock().unwrap().sent;
        assert_eq!(
            sent[0],
            [0x00, 0xA4, 0x04, 0x00, 0x08, 0xA0, 0x00, 0x00, 0x06, 0x47, 0x2F, 0x00, 0x01, 0x00]
        );
    }

    #[tokio::test]
    async fn select_applet_not_found_reports_false() {
        let (link, _state) = MockLink::new(vec![reply(&[], 0x6A, 0x82)]);
        let mut transport = NfcTransport::new(link).unwrap();
        assert!(!transport.select_applet().await.unwrap());
    }

    #[tokio::test]
    async fn select_applet_access_denied_reports_false() {
        let (link, _state) = MockLink::new(vec![Err(LinkError::AccessDenied)]);
        let mut transport = NfcTransport::new(link).unwrap();
        assert!(!transport.select_applet().await.unwrap());
    }

    #[tokio::test]
    async fn chained_response_is_reassembled() {
        let (link, state) = MockLink::new(vec![
            reply(&[0x01, 0x02, 0x03], 0x61, 0x05),
            reply(&[0x04, 0x05], 0x90, 0x00),
        ]);
        let mut transport = NfcTransport::new(link).unwrap();

        let response = transport.send_ctap_command(&[0x04]).await.unwrap();
        assert_eq!(response, [0x01, 0x02, 0x03, 0x04, 0x05]);

        let sent = &state.lock().unwrap().sent;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], [0x80, 0x10, 0x00, 0x00, 0x01, 0x04, 0x00]);
        // Exactly one GET RESPONSE, with the length the device signalled.
        assert_eq!(sent[1], [0x00, 0xC0, 0x00, 0x00, 0x05]);
    }

    #[tokio::test]
    async fn error_status_word_is_not_retried() {
        let (link, state) = MockLink::new(vec![reply(&[], 0x6A, 0x80)]);
        let mut transport = NfcTransport::new(link).unwrap();

        let err = transport.send_ctap_command(&[0x04]).await.unwrap_err();
        assert_eq!(
            err,
            Error::Transport(TransportError::Protocol { sw1: 0x6A, sw2: 0x80 })
        );
        assert_eq!(state.lock().unwrap().sent.len(), 1);
    }

    #[tokio::test]
    async fn large_commands_use_extended_framing() {
        let (link, state) = MockLink::new(vec![reply(&[0xAA], 0x90, 0x00)]);
        let mut transport = NfcTransport::new(link).unwrap();

        let command = vec![0x01; 300];
        transport.send_ctap_command(&command).await.unwrap();

        let sent = &state.lock().unwrap().sent;
        assert_eq!(&sent[0][0..7], &[0x80, 0x10, 0x00, 0x00, 0x00, 0x01, 0x2C]);
        assert_eq!(&sent[0][307..], &[0x00, 0x00]);
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        let (link, state) = MockLink::new(vec![]);
        let mut transport = NfcTransport::new(link).unwrap();

        let err = transport.send_ctap_command(&[]).await.unwrap_err();
        assert_eq!(err, Error::Transport(TransportError::InvalidFraming));
        assert!(state.lock().unwrap().sent.is_empty());
    }

    #[tokio::test]
    async fn tag_loss_closes_the_transport() {
        let (link, state) = MockLink::new(vec![Err(LinkError::TagLost)]);
        let mut transport = NfcTransport::new(link).unwrap();

        let err = transport.send_ctap_command(&[0x04]).await.unwrap_err();
        assert_eq!(err, Error::Transport(TransportError::ConnectionLost));
        assert_eq!(state.lock().unwrap().close_calls, 1);
        assert!(!transport.is_connected());

        // The transport must not be reused after loss.
        let err = transport.send_ctap_command(&[0x04]).await.unwrap_err();
        assert_eq!(err, Error::Transport(TransportError::ConnectionLost));
        assert_eq!(state.lock().unwrap().sent.len(), 1);
    }

    #[tokio::test]
    async fn link_timeout_surfaces_as_timeout() {
        use std::io::{Error as IOError, ErrorKind as IOErrorKind};

        let (link, _state) = MockLink::new(vec![Err(LinkError::Io(IOError::from(
            IOErrorKind::TimedOut,
        )))]);
        let mut transport = NfcTransport::new(link).unwrap();

        let err = transport.send_ctap_command(&[0x04]).await.unwrap_err();
        assert_eq!(err, Error::Transport(TransportError::Timeout));
        // A timeout is not link loss; the link stays open.
        assert!(transport.is_connected());
    }

    #[tokio::test]
    async fn access_denied_mid_exchange_is_remapped_to_io() {
        let (link, _state) = MockLink::new(vec![Err(LinkError::AccessDenied)]);
        let mut transport = NfcTransport::new(link).unwrap();

        let err = transport.send_ctap_command(&[0x04]).await.unwrap_err();
        assert_eq!(err, Error::Transport(TransportError::Io));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (link, state) = MockLink::new(vec![]);
        let mut transport = NfcTransport::new(link).unwrap();

        transport.close().await;
        transport.close().await;
        assert_eq!(state.lock().unwrap().close_calls, 1);
        assert!(!transport.is_connected());

        let err = transport.send_ctap_command(&[0x04]).await.unwrap_err();
        assert_eq!(err, Error::Transport(TransportError::ConnectionLost));
    }

    #[tokio::test]
    async fn transport_metadata() {
        let (link, _state) = MockLink::new(vec![]);
        let transport = NfcTransport::new(link).unwrap();
        assert_eq!(transport.transport_type(), TransportType::Nfc);
        assert!(transport.is_connected());
        assert_eq!(transport.to_string(), "nfc transport (open)");
    }
}
