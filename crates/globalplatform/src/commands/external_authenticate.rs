//! EXTERNAL AUTHENTICATE command
//!
//! Second half of the SCP02 handshake. Carries the host cryptogram and the
//! requested security level in P1. This command is always sent C-MAC
//! wrapped, whatever level was requested, so the card can verify the host
//! holds the session MAC key.

use opengp_apdu::Command;

use crate::constants::{cla, ins};
use crate::crypto::Cryptogram;
use crate::secure_channel::SecurityLevel;

/// EXTERNAL AUTHENTICATE command builder
#[derive(Debug, Clone)]
pub struct ExternalAuthenticateCommand;

impl ExternalAuthenticateCommand {
    /// Build the command for a host cryptogram and security level
    ///
    /// The secure messaging CLA bit and the MAC are added by the channel
    /// wrapper.
    pub fn new(host_cryptogram: &Cryptogram, level: SecurityLevel) -> Command {
        Command::new_with_data(
            cla::GP,
            ins::EXTERNAL_AUTHENTICATE,
            level.p1(),
            0x00,
            host_cryptogram.to_vec(),
        )
    }
}
