use std::convert::TryFrom;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::transport::error::TransportError;

const APDU_SHORT_MAX_DATA: usize = 0xFF;
const APDU_EXTENDED_MAX_DATA: usize = 0xFF_FF;
const APDU_SHORT_MAX_LE: usize = 0x100;

const CLA_ISO: u8 = 0x00;
const CLA_CTAP: u8 = 0x80;

const INS_SELECT: u8 = 0xA4;
const INS_NFCCTAP_MSG: u8 = 0x10;
const INS_GET_RESPONSE: u8 = 0xC0;

const P1_SELECT_BY_AID: u8 = 0x04;

/// FIDO Alliance applet AID.
pub const FIDO_AID: [u8; 8] = [0xA0, 0x00, 0x00, 0x06, 0x47, 0x2F, 0x00, 0x01];

/// An ISO 7816-4 command APDU, built fresh per CTAP command.
#[derive(Debug, Clone)]
pub struct ApduRequest {
    cla: u8,
    ins: u8,
    p1: u8,
    p2: u8,
    data: Option<Vec<u8>>,
    response_max_length: Option<usize>,
}

impl ApduRequest {
    pub fn new(
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: Option<&[u8]>,
        response_max_length: Option<usize>,
    ) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: data.map(Vec::from),
            response_max_length,
        }
    }

    /// SELECT for the FIDO applet: `00 A4 04 00 08 <AID> 00`.
    pub fn select_fido() -> Self {
        Self::new(
            CLA_ISO,
            INS_SELECT,
            P1_SELECT_BY_AID,
            0x00,
            Some(&FIDO_AID),
            Some(APDU_SHORT_MAX_LE),
        )
    }

    /// NFCCTAP_MSG wrapping an opaque CTAP payload: `80 10 00 00 ...`.
    pub fn ctap_msg(payload: &[u8]) -> Self {
        Self::new(
            CLA_CTAP,
            INS_NFCCTAP_MSG,
            0x00,
            0x00,
            Some(payload),
            Some(APDU_SHORT_MAX_LE),
        )
    }

    /// GET RESPONSE for a `61 xx` continuation: `00 C0 00 00 <xx>`.
    /// `remaining == 0` means 256 bytes.
    pub fn get_response(remaining: u8) -> Self {
        let le = match remaining {
            0 => APDU_SHORT_MAX_LE,
            n => n as usize,
        };
        Self::new(CLA_ISO, INS_GET_RESPONSE, 0x00, 0x00, None, Some(le))
    }

    /// Serialize, selecting short or extended length fields from the payload
    /// size: a single Lc byte for up to 255 bytes of data, the 3-byte
    /// extended form up to 65535.
    pub fn encode(&self) -> Result<Vec<u8>, TransportError> {
        match &self.data {
            None => self.raw_short(),
            Some(data) if data.is_empty() => Err(TransportError::InvalidFraming),
            Some(data) if data.len() <= APDU_SHORT_MAX_DATA => self.raw_short(),
            Some(data) if data.len() <= APDU_EXTENDED_MAX_DATA => self.raw_extended(),
            Some(_) => Err(TransportError::InvalidFraming),
        }
    }

    fn header(&self) -> [u8; 4] {
        [self.cla, self.ins, self.p1, self.p2]
    }

    fn raw_short(&self) -> Result<Vec<u8>, TransportError> {
        let mut raw = Vec::from(self.header());

        if let Some(data) = &self.data {
            if data.is_empty() || data.len() > APDU_SHORT_MAX_DATA {
                return Err(TransportError::InvalidFraming);
            }
            raw.push(data.len() as u8);
            raw.extend(data);
        }

        if let Some(le) = self.response_max_length {
            if le > APDU_SHORT_MAX_LE {
                return Err(TransportError::InvalidFraming);
            }
            // Le = 0 requests the short-form maximum of 256 bytes.
            raw.push(if le == APDU_SHORT_MAX_LE { 0 } else { le as u8 });
        }
        Ok(raw)
    }

    fn raw_extended(&self) -> Result<Vec<u8>, TransportError> {
        let mut raw = Vec::from(self.header());

        match &self.data {
            Some(data) if !data.is_empty() && data.len() <= APDU_EXTENDED_MAX_DATA => {
                raw.push(0x00);
                raw.extend_from_slice(&(data.len() as u16).to_be_bytes());
                raw.extend(data);
            }
            _ => return Err(TransportError::InvalidFraming),
        }

        if self.response_max_length.is_some() {
            // Extended Le 0x0000 requests the maximum of 65536 bytes.
            raw.extend_from_slice(&[0x00, 0x00]);
        }
        Ok(raw)
    }
}

/// Known status words, for diagnostics only; the raw bytes are always
/// preserved alongside.
#[derive(Debug, IntoPrimitive, TryFromPrimitive, Copy, Clone, PartialEq, Eq)]
#[repr(u16)]
pub enum ApduResponseStatus {
    NoError = 0x9000,
    ConditionsNotSatisfied = 0x6985,
    WrongData = 0x6A80,
    FileNotFound = 0x6A82,
    WrongLength = 0x6700,
    InstructionNotSupported = 0x6D00,
    ClassNotSupported = 0x6E00,
}

/// An ISO 7816-4 response APDU: payload followed by the two status bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduResponse {
    data: Vec<u8>,
    sw1: u8,
    sw2: u8,
}

impl ApduResponse {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn sw1(&self) -> u8 {
        self.sw1
    }

    pub fn sw2(&self) -> u8 {
        self.sw2
    }

    pub fn status_word(&self) -> u16 {
        u16::from_be_bytes([self.sw1, self.sw2])
    }

    /// `90 00`: the chained response is complete.
    pub fn is_success(&self) -> bool {
        self.sw1 == 0x90 && self.sw2 == 0x00
    }

    /// `61 xx`: more data available; returns the byte count the device
    /// signalled (0 meaning 256).
    pub fn more_data(&self) -> Option<u8> {
        if self.sw1 == 0x61 {
            Some(self.sw2)
        } else {
            None
        }
    }

    pub fn known_status(&self) -> Option<ApduResponseStatus> {
        ApduResponseStatus::try_from(self.status_word()).ok()
    }
}

impl TryFrom<&[u8]> for ApduResponse {
    type Error = TransportError;

    fn try_from(frame: &[u8]) -> Result<Self, Self::Error> {
        if frame.len() < 2 {
            return Err(TransportError::InvalidFraming);
        }
        Ok(Self {
            data: Vec::from(&frame[..frame.len() - 2]),
            sw1: frame[frame.len() - 2],
            sw2: frame[frame.len() - 1],
        })
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use super::{ApduRequest, ApduResponse, ApduResponseStatus};
    use crate::transport::error::TransportError;

    #[test]
    fn select_fido_is_byte_exact() {
        assert_eq!(
            ApduRequest::select_fido().encode().unwrap(),
            [0x00, 0xA4, 0x04, 0x00, 0x08, 0xA0, 0x00, 0x00, 0x06, 0x47, 0x2F, 0x00, 0x01, 0x00]
        );
    }

    #[test]
    fn get_response_is_byte_exact() {
        assert_eq!(
            ApduRequest::get_response(0x05).encode().unwrap(),
            [0x00, 0xC0, 0x00, 0x00, 0x05]
        );
        // 0 remaining means 256: encoded as Le = 0x00.
        assert_eq!(
            ApduRequest::get_response(0x00).encode().unwrap(),
            [0x00, 0xC0, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn ctap_msg_short_form() {
        let raw = ApduRequest::ctap_msg(&[0x04]).encode().unwrap();
        assert_eq!(raw, [0x80, 0x10, 0x00, 0x00, 0x01, 0x04, 0x00]);
    }

    #[test]
    fn ctap_msg_short_form_at_boundary() {
        let payload = vec![0xF1; 255];
        let raw = ApduRequest::ctap_msg(&payload).encode().unwrap();
        assert_eq!(&raw[0..5], &[0x80, 0x10, 0x00, 0x00, 0xFF]);
        assert_eq!(&raw[5..260], payload.as_slice());
        assert_eq!(&raw[260..], &[0x00]);
    }

    #[test]
    fn ctap_msg_extended_form() {
        let payload = vec![0xF1; 300];
        let raw = ApduRequest::ctap_msg(&payload).encode().unwrap();
        assert_eq!(&raw[0..7], &[0x80, 0x10, 0x00, 0x00, 0x00, 0x01, 0x2C]);
        assert_eq!(&raw[7..307], payload.as_slice());
        assert_eq!(&raw[307..], &[0x00, 0x00]);
    }

    #[test]
    fn ctap_msg_rejects_unencodable_payloads() {
        assert_eq!(
            ApduRequest::ctap_msg(&[]).encode(),
            Err(TransportError::InvalidFraming)
        );
        let oversized = vec![0x00; 0x1_0000];
        assert_eq!(
            ApduRequest::ctap_msg(&oversized).encode(),
            Err(TransportError::InvalidFraming)
        );
    }

    #[test]
    fn response_from_status_only_frame() {
        let response = ApduResponse::try_from(&[0x69, 0x85][..]).unwrap();
        assert_eq!(response.data(), &[]);
        assert_eq!(response.status_word(), 0x6985);
        assert_eq!(
            response.known_status(),
            Some(ApduResponseStatus::ConditionsNotSatisfied)
        );
        assert!(!response.is_success());
        assert_eq!(response.more_data(), None);
    }

    #[test]
    fn response_from_full_frame() {
        let response = ApduResponse::try_from(&[0x01, 0x02, 0x03, 0x90, 0x00][..]).unwrap();
        assert_eq!(response.data(), &[0x01, 0x02, 0x03]);
        assert!(response.is_success());
    }

    #[test]
    fn response_signals_continuation() {
        let response = ApduResponse::try_from(&[0xAA, 0x61, 0x10][..]).unwrap();
        assert_eq!(response.more_data(), Some(0x10));
        assert!(!response.is_success());
    }

    #[test]
    fn response_from_runt_frame_fails() {
        assert_eq!(
            ApduResponse::try_from(&[0x90][..]),
            Err(TransportError::InvalidFraming)
        );
    }

    #[test]
    fn unknown_status_is_preserved_raw() {
        let response = ApduResponse::try_from(&[0x12, 0x34][..]).unwrap();
        assert_eq!(response.known_status(), None);
        assert_eq!((response.sw1(), response.sw2()), (0x12, 0x34));
    }
}
