//! INITIALIZE UPDATE command
//!
//! First half of the SCP02 mutual authentication handshake. Carries the
//! host challenge; the response returns key diversification data, key
//! information, the sequence counter, the card challenge and the card
//! cryptogram.

use opengp_apdu::Command;

use crate::constants::{cla, ins};
use crate::crypto::HostChallenge;

/// INITIALIZE UPDATE command builder
#[derive(Debug, Clone)]
pub struct InitializeUpdateCommand;

impl InitializeUpdateCommand {
    /// Build the command for a key version and host challenge
    ///
    /// Key version 0 selects the card's default key set.
    pub fn new(key_version: u8, host_challenge: &HostChallenge) -> Command {
        Command::new_with_data(
            cla::GP,
            ins::INITIALIZE_UPDATE,
            key_version,
            0x00,
            host_challenge.to_vec(),
        )
        .with_le(0)
    }
}
