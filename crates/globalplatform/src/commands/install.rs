//! INSTALL command
//!
//! Covers INSTALL [for load] and INSTALL [for install and make
//! selectable]. The data field is the length-prefixed field sequence of
//! GlobalPlatform 2.1.1 section 9.5; application-specific parameters are
//! wrapped in a C9 TLV, present with zero length even when empty.

use opengp_apdu::Command;

use crate::constants::{cla, ins, install_p1, tags};
use crate::error::{Error, Result};
use crate::registry::{Aid, Privileges};

/// Memory space limits for INSTALL [for load]
///
/// Encoded as an EF TLV in the load parameters field; an unset limit is
/// omitted, leaving the card's own policy in charge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpaceLimits {
    /// Non-volatile code space limit (tag C6)
    pub non_volatile_code: Option<u16>,
    /// Volatile data space limit (tag C7)
    pub volatile_data: Option<u16>,
    /// Non-volatile data space limit (tag C8)
    pub non_volatile_data: Option<u16>,
}

impl SpaceLimits {
    /// Encode the load parameters field; empty when no limit is set
    fn encode(&self) -> Vec<u8> {
        let mut inner = Vec::new();
        for (tag, limit) in [
            (tags::NON_VOLATILE_CODE_SPACE, self.non_volatile_code),
            (tags::VOLATILE_DATA_SPACE, self.volatile_data),
            (tags::NON_VOLATILE_DATA_SPACE, self.non_volatile_data),
        ] {
            if let Some(value) = limit {
                inner.push(tag);
                inner.push(0x02);
                inner.extend_from_slice(&value.to_be_bytes());
            }
        }

        if inner.is_empty() {
            return inner;
        }

        let mut params = Vec::with_capacity(2 + inner.len());
        params.push(tags::LOAD_PARAMETERS);
        params.push(inner.len() as u8);
        params.extend_from_slice(&inner);
        params
    }
}

/// INSTALL command builder
#[derive(Debug, Clone)]
pub struct InstallCommand;

impl InstallCommand {
    /// INSTALL [for load]: announce a load file before the LOAD sequence
    ///
    /// No space limits; the hash and token fields are empty.
    pub fn for_load(load_file_aid: &Aid, security_domain_aid: &Aid) -> Command {
        Self::for_load_with_limits(load_file_aid, security_domain_aid, SpaceLimits::default())
    }

    /// INSTALL [for load] with memory space limits
    pub fn for_load_with_limits(
        load_file_aid: &Aid,
        security_domain_aid: &Aid,
        limits: SpaceLimits,
    ) -> Command {
        let params = limits.encode();

        let mut data = Vec::with_capacity(
            5 + load_file_aid.len() + security_domain_aid.len() + params.len(),
        );
        data.push(load_file_aid.len() as u8);
        data.extend_from_slice(load_file_aid.as_bytes());
        data.push(security_domain_aid.len() as u8);
        data.extend_from_slice(security_domain_aid.as_bytes());

        // Load file data block hash, load parameters, load token
        data.push(0x00);
        data.push(params.len() as u8);
        data.extend_from_slice(&params);
        data.push(0x00);

        Command::new_with_data(cla::GP, ins::INSTALL, install_p1::FOR_LOAD, 0x00, data)
    }

    /// INSTALL [for install and make selectable]: instantiate a module
    pub fn for_install_and_make_selectable(
        load_file_aid: &Aid,
        module_aid: &Aid,
        instance_aid: &Aid,
        privileges: Privileges,
        install_parameters: &[u8],
        install_token: &[u8],
    ) -> Result<Command> {
        let data = build_install_data(
            load_file_aid,
            module_aid,
            instance_aid,
            privileges,
            install_parameters,
            install_token,
        )?;

        Ok(Command::new_with_data(
            cla::GP,
            ins::INSTALL,
            install_p1::FOR_INSTALL_AND_MAKE_SELECTABLE,
            0x00,
            data,
        ))
    }
}

/// Field sequence shared by the [for install] variants
fn build_install_data(
    load_file_aid: &Aid,
    module_aid: &Aid,
    instance_aid: &Aid,
    privileges: Privileges,
    install_parameters: &[u8],
    install_token: &[u8],
) -> Result<Vec<u8>> {
    // The C9 TLV carries a one-byte length, and the field prefix must
    // cover the tag and length bytes too
    if install_parameters.len() > 0xFF - 2 {
        return Err(Error::InvalidParameter("oversized install parameters"));
    }
    if install_token.len() > 0xFF {
        return Err(Error::InvalidParameter("oversized install token"));
    }

    let mut data = Vec::new();

    data.push(load_file_aid.len() as u8);
    data.extend_from_slice(load_file_aid.as_bytes());

    data.push(module_aid.len() as u8);
    data.extend_from_slice(module_aid.as_bytes());

    data.push(instance_aid.len() as u8);
    data.extend_from_slice(instance_aid.as_bytes());

    // Privileges as a single byte (the high byte of the privilege word)
    data.push(0x01);
    data.push((privileges.word() >> 16) as u8);

    // Application-specific parameters in a C9 TLV, zero-length when empty
    let mut params_tlv = Vec::with_capacity(2 + install_parameters.len());
    params_tlv.push(tags::INSTALL_PARAMETERS);
    params_tlv.push(install_parameters.len() as u8);
    params_tlv.extend_from_slice(install_parameters);
    data.push(params_tlv.len() as u8);
    data.extend_from_slice(&params_tlv);

    data.push(install_token.len() as u8);
    data.extend_from_slice(install_token);

    Ok(data)
}
