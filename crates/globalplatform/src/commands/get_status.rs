//! GET STATUS command
//!
//! Queries the card registry for the Issuer Security Domain, applications,
//! or executable load files. P1 selects the element type, P2 selects the
//! response format and whether this is the first query or a continuation.

use iso7816_tlv::simple::Tlv;
use opengp_apdu::Command;

use crate::constants::{cla, get_status_p1, get_status_p2, ins, tags};
use crate::registry::{Aid, StatusFormat};

/// GET STATUS command builder
///
/// Holds the query so continuations can be issued against the same
/// selector and filter.
#[derive(Debug, Clone)]
pub struct GetStatusCommand {
    p1: u8,
    filter: Vec<u8>,
    format: StatusFormat,
}

impl GetStatusCommand {
    /// Query with an element selector and an AID filter
    ///
    /// An empty filter matches every element of the selected type.
    pub fn with_filter(p1: u8, filter: &[u8], format: StatusFormat) -> Self {
        Self {
            p1,
            filter: filter.to_vec(),
            format,
        }
    }

    /// Query the Issuer Security Domain record
    pub fn issuer_security_domain(format: StatusFormat) -> Self {
        Self::with_filter(get_status_p1::ISSUER_SECURITY_DOMAIN, &[], format)
    }

    /// Query all applications and supplementary security domains
    pub fn applications(format: StatusFormat) -> Self {
        Self::with_filter(get_status_p1::APPLICATIONS, &[], format)
    }

    /// Query all executable load files
    pub fn executable_load_files(format: StatusFormat) -> Self {
        Self::with_filter(get_status_p1::EXEC_LOAD_FILES, &[], format)
    }

    /// Query all executable load files with their modules
    pub fn executable_load_files_and_modules(format: StatusFormat) -> Self {
        Self::with_filter(get_status_p1::EXEC_LOAD_FILES_AND_MODULES, &[], format)
    }

    /// Query one element by AID
    pub fn with_aid_filter(p1: u8, aid: &Aid, format: StatusFormat) -> Self {
        Self::with_filter(p1, aid.as_bytes(), format)
    }

    /// Response format requested by this query
    pub const fn format(&self) -> StatusFormat {
        self.format
    }

    /// Build the first command of the query
    pub fn to_command(&self) -> Command {
        self.build(false)
    }

    /// Build a continuation command (next occurrences)
    pub fn next_occurrence(&self) -> Command {
        self.build(true)
    }

    fn build(&self, next: bool) -> Command {
        let mut p2 = match self.format {
            StatusFormat::Legacy => get_status_p2::LEGACY,
            StatusFormat::Tlv => get_status_p2::TLV,
        };
        if next {
            p2 |= get_status_p2::NEXT_OCCURRENCE;
        }

        // Filter always present, 4F00 when matching everything
        let data = Tlv::new(tags::AID.try_into().unwrap(), self.filter.clone())
            .unwrap()
            .to_vec();

        Command::new_with_data(cla::GP, ins::GET_STATUS, self.p1, p2, data).with_le(0)
    }
}
