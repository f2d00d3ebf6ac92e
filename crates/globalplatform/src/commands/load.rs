//! LOAD command
//!
//! Transfers one block of a load file. P1 flags whether more blocks
//! follow; P2 is the block sequence number, starting at zero. Block
//! splitting lives in [`crate::load::LoadCommandStream`].

use opengp_apdu::Command;

use crate::constants::{cla, ins, load_p1};

/// LOAD command builder
#[derive(Debug, Clone)]
pub struct LoadCommand;

impl LoadCommand {
    /// Build the command for one block
    pub fn block(block_number: u8, is_last: bool, block_data: &[u8]) -> Command {
        let p1 = if is_last {
            load_p1::LAST_BLOCK
        } else {
            load_p1::MORE_BLOCKS
        };

        Command::new_with_data(cla::GP, ins::LOAD, p1, block_number, block_data.to_vec())
    }
}
