//! DELETE command
//!
//! Deletes one or more card objects identified by AID, optionally together
//! with their related objects (instances of a load file). Each AID travels
//! in its own 4F TLV.

use iso7816_tlv::simple::Tlv;
use opengp_apdu::Command;

use crate::constants::{cla, delete_p2, ins, tags};
use crate::registry::Aid;

/// DELETE command builder
#[derive(Debug, Clone)]
pub struct DeleteCommand;

impl DeleteCommand {
    /// Delete a single object
    pub fn object(aid: &Aid) -> Command {
        Self::build(std::slice::from_ref(aid), delete_p2::OBJECT)
    }

    /// Delete several objects with one command
    pub fn objects(aids: &[Aid]) -> Command {
        Self::build(aids, delete_p2::OBJECT)
    }

    /// Delete an object and its related objects
    pub fn object_and_related(aid: &Aid) -> Command {
        Self::build(std::slice::from_ref(aid), delete_p2::OBJECT_AND_RELATED)
    }

    fn build(aids: &[Aid], p2: u8) -> Command {
        let mut data = Vec::new();
        for aid in aids {
            data.extend_from_slice(
                &Tlv::new(tags::AID.try_into().unwrap(), aid.as_bytes().to_vec())
                    .unwrap()
                    .to_vec(),
            );
        }

        Command::new_with_data(cla::GP, ins::DELETE, 0x00, p2, data).with_le(0)
    }
}
