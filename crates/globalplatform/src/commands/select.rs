//! SELECT command
//!
//! Selects an application by AID (P1 = select by DF name).

use opengp_apdu::Command;

use crate::constants::{cla, ins, select_p1};
use crate::registry::Aid;

/// SELECT command builder
#[derive(Debug, Clone)]
pub struct SelectCommand;

impl SelectCommand {
    /// Select an application by AID
    pub fn by_aid(aid: &Aid) -> Command {
        Command::new_with_data(
            cla::ISO7816,
            ins::SELECT,
            select_p1::BY_NAME,
            0x00,
            aid.as_bytes().to_vec(),
        )
        .with_le(0)
    }

    /// Select the Issuer Security Domain
    pub fn issuer_security_domain() -> Command {
        Self::by_aid(&Aid::issuer_security_domain())
    }
}
