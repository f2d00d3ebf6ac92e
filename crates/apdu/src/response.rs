//! APDU response definitions
//!
//! A response is the payload returned by the card followed by the two
//! mandatory status bytes (SW1-SW2).

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::ResponseError;
use crate::status::StatusWord;

/// An APDU response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    payload: Bytes,
    status: StatusWord,
}

impl Response {
    /// Create a new response with payload and status
    pub fn new(payload: impl Into<Bytes>, status: impl Into<StatusWord>) -> Self {
        Self {
            payload: payload.into(),
            status: status.into(),
        }
    }

    /// Create a success (90 00) response
    pub fn success(payload: impl Into<Bytes>) -> Self {
        Self::new(payload, StatusWord::new(0x90, 0x00))
    }

    /// Parse a response from raw bytes (payload followed by SW1-SW2)
    pub fn from_bytes(data: &[u8]) -> Result<Self, ResponseError> {
        if data.len() < 2 {
            return Err(ResponseError::Truncated { actual: data.len() });
        }

        let (payload, sw) = data.split_at(data.len() - 2);
        let status = StatusWord::new(sw[0], sw[1]);

        trace!(
            sw = %status,
            payload_len = payload.len(),
            "parsed APDU response"
        );

        Ok(Self {
            payload: Bytes::copy_from_slice(payload),
            status,
        })
    }

    /// Response payload (possibly empty)
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Status word
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// Check if the response indicates success
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

impl From<Response> for Bytes {
    fn from(response: Response) -> Self {
        let mut buf = BytesMut::with_capacity(response.payload.len() + 2);
        buf.put_slice(&response.payload);
        buf.put_u8(response.status.sw1);
        buf.put_u8(response.status.sw2);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_from_bytes() {
        let resp = Response::from_bytes(&hex!("0102039000")).unwrap();
        assert_eq!(resp.payload().as_ref(), &hex!("010203"));
        assert!(resp.is_success());

        let resp = Response::from_bytes(&hex!("6A82")).unwrap();
        assert!(resp.payload().is_empty());
        assert_eq!(resp.status(), StatusWord::new(0x6A, 0x82));
    }

    #[test]
    fn test_truncated() {
        assert!(Response::from_bytes(&[0x90]).is_err());
        assert!(Response::from_bytes(&[]).is_err());
    }

    #[test]
    fn test_round_trip() {
        let resp = Response::success(hex!("AABB").to_vec());
        let bytes: Bytes = resp.clone().into();
        assert_eq!(bytes.as_ref(), hex!("AABB9000"));
        assert_eq!(Response::from_bytes(&bytes).unwrap(), resp);
    }
}
