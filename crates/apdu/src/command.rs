//! APDU command definitions
//!
//! Short-form APDU commands according to ISO/IEC 7816-4: a four-byte header
//! (CLA, INS, P1, P2) optionally followed by Lc + data and a one-byte Le.

use bytes::{BufMut, Bytes, BytesMut};

/// An APDU command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    cla: u8,
    ins: u8,
    p1: u8,
    p2: u8,
    data: Option<Bytes>,
    le: Option<u8>,
}

impl Command {
    /// Create a new command with an empty data field
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Create a new command with a data field
    pub fn new_with_data(cla: u8, ins: u8, p1: u8, p2: u8, data: impl Into<Bytes>) -> Self {
        Self::new(cla, ins, p1, p2).with_data(data)
    }

    /// Set the command data field
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set the expected response length (Le); `0` requests up to 256 bytes
    pub const fn with_le(mut self, le: u8) -> Self {
        self.le = Some(le);
        self
    }

    /// Command class (CLA)
    pub const fn class(&self) -> u8 {
        self.cla
    }

    /// Instruction code (INS)
    pub const fn instruction(&self) -> u8 {
        self.ins
    }

    /// First parameter (P1)
    pub const fn p1(&self) -> u8 {
        self.p1
    }

    /// Second parameter (P2)
    pub const fn p2(&self) -> u8 {
        self.p2
    }

    /// Command data field, if any
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Expected response length, if any
    pub const fn expected_length(&self) -> Option<u8> {
        self.le
    }

    /// Serialize to raw APDU bytes
    pub fn to_bytes(&self) -> Bytes {
        let data_len = self.data.as_ref().map_or(0, |d| d.len());
        let mut buf = BytesMut::with_capacity(4 + 1 + data_len + 1);

        buf.put_u8(self.cla);
        buf.put_u8(self.ins);
        buf.put_u8(self.p1);
        buf.put_u8(self.p2);

        if let Some(data) = &self.data {
            buf.put_u8(data.len() as u8);
            buf.put_slice(data);
        }

        if let Some(le) = self.le {
            buf.put_u8(le);
        }

        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_header_only() {
        let cmd = Command::new(0x00, 0xA4, 0x04, 0x00);
        assert_eq!(cmd.to_bytes().as_ref(), hex!("00A40400"));
    }

    #[test]
    fn test_with_data_and_le() {
        let cmd = Command::new_with_data(0x00, 0xA4, 0x04, 0x00, hex!("A000000151").to_vec())
            .with_le(0);
        assert_eq!(cmd.to_bytes().as_ref(), hex!("00A4040005A00000015100"));
        assert_eq!(cmd.data(), Some(hex!("A000000151").as_ref()));
        assert_eq!(cmd.expected_length(), Some(0));
    }

    #[test]
    fn test_le_only() {
        let cmd = Command::new(0x80, 0xCA, 0x00, 0x66).with_le(0);
        assert_eq!(cmd.to_bytes().as_ref(), hex!("80CA006600"));
    }
}
