//! GET DATA command
//!
//! Reads a data object identified by a two-byte tag carried in P1-P2.
//! Used for the card recognition data (tag 0066) before opening a secure
//! channel.

use opengp_apdu::Command;

use crate::constants::{cla, ins, tags};

/// GET DATA command builder
#[derive(Debug, Clone)]
pub struct GetDataCommand;

impl GetDataCommand {
    /// Read the data object with the given tag
    pub fn new(tag: u16) -> Command {
        Command::new(cla::GP, ins::GET_DATA, (tag >> 8) as u8, tag as u8).with_le(0)
    }

    /// Read the card recognition data (tag 0066)
    pub fn card_recognition_data() -> Command {
        Self::new(u16::from(tags::CARD_RECOGNITION_DATA))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_get_data() {
        let cmd = GetDataCommand::card_recognition_data();
        assert_eq!(cmd.to_bytes().as_ref(), hex!("80CA006600"));
    }

    #[test]
    fn test_get_data_cplc() {
        let cmd = GetDataCommand::new(0x9F7F);
        assert_eq!(cmd.to_bytes().as_ref(), hex!("80CA9F7F00"));
    }
}
