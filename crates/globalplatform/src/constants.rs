//! Constants used in GlobalPlatform operations
//!
//! Values defined by the GlobalPlatform Card Specification v2.1.1: CLA
//! bytes, instruction codes, parameter values, status words and TLV tags.

/// GlobalPlatform command classes
pub mod cla {
    /// ISO7816 command class
    pub const ISO7816: u8 = 0x00;
    /// GlobalPlatform command class
    pub const GP: u8 = 0x80;
    /// Secure messaging bit, OR-ed into CLA when a command is wrapped
    pub const SECURE_MESSAGING_BIT: u8 = 0x04;
}

/// GlobalPlatform instruction codes
pub mod ins {
    /// SELECT command
    pub const SELECT: u8 = 0xA4;
    /// INITIALIZE UPDATE command
    pub const INITIALIZE_UPDATE: u8 = 0x50;
    /// EXTERNAL AUTHENTICATE command
    pub const EXTERNAL_AUTHENTICATE: u8 = 0x82;
    /// GET DATA command
    pub const GET_DATA: u8 = 0xCA;
    /// DELETE command
    pub const DELETE: u8 = 0xE4;
    /// LOAD command
    pub const LOAD: u8 = 0xE8;
    /// INSTALL command
    pub const INSTALL: u8 = 0xE6;
    /// GET STATUS command
    pub const GET_STATUS: u8 = 0xF2;
}

/// Parameter values for SELECT command (P1)
pub mod select_p1 {
    /// Select by DF name (AID)
    pub const BY_NAME: u8 = 0x04;
}

/// Security level bits carried in EXTERNAL AUTHENTICATE P1
///
/// These match the native GlobalPlatform library's
/// `GP211_SCP02_SECURITY_LEVEL_*` values.
pub mod security_level {
    /// Command MAC (C-MAC)
    pub const C_MAC: u8 = 0x01;
    /// Command encryption (C-DECRYPTION)
    pub const C_DEC: u8 = 0x02;
    /// Response MAC (R-MAC)
    pub const R_MAC: u8 = 0x10;
}

/// Parameter values for INSTALL command (P1)
pub mod install_p1 {
    /// Install for load
    pub const FOR_LOAD: u8 = 0x02;
    /// Install for install
    pub const FOR_INSTALL: u8 = 0x04;
    /// Install for make selectable
    pub const FOR_MAKE_SELECTABLE: u8 = 0x08;
    /// Install for install and make selectable
    pub const FOR_INSTALL_AND_MAKE_SELECTABLE: u8 = FOR_INSTALL | FOR_MAKE_SELECTABLE;
}

/// Parameter values for LOAD command (P1)
pub mod load_p1 {
    /// More blocks to follow
    pub const MORE_BLOCKS: u8 = 0x00;
    /// Last block
    pub const LAST_BLOCK: u8 = 0x80;
}

/// Parameter values for GET STATUS command (P1): the card element selector
pub mod get_status_p1 {
    /// Issuer security domain
    pub const ISSUER_SECURITY_DOMAIN: u8 = 0x80;
    /// Applications and supplementary security domains
    pub const APPLICATIONS: u8 = 0x40;
    /// Executable load files
    pub const EXEC_LOAD_FILES: u8 = 0x20;
    /// Executable load files and their modules
    pub const EXEC_LOAD_FILES_AND_MODULES: u8 = 0x10;
}

/// Parameter values for GET STATUS command (P2)
pub mod get_status_p2 {
    /// Legacy fixed-layout response format
    pub const LEGACY: u8 = 0x00;
    /// TLV response format
    pub const TLV: u8 = 0x02;
    /// Get next occurrence(s); OR-ed in when continuing a query
    pub const NEXT_OCCURRENCE: u8 = 0x01;
}

/// Parameter values for DELETE command (P2)
pub mod delete_p2 {
    /// Delete object
    pub const OBJECT: u8 = 0x00;
    /// Delete object and related objects
    pub const OBJECT_AND_RELATED: u8 = 0x80;
}

/// Commonly used status words in GlobalPlatform
pub mod status {
    use opengp_apdu::StatusWord;

    /// Success
    pub const SUCCESS: StatusWord = StatusWord::new(0x90, 0x00);
    /// Referenced data not found; GET STATUS treats this as an empty result
    pub const REFERENCED_DATA_NOT_FOUND: StatusWord = StatusWord::new(0x6A, 0x88);
    /// More GET STATUS records available
    pub const MORE_STATUS_DATA: StatusWord = StatusWord::new(0x63, 0x10);
    /// Authentication method blocked
    pub const AUTHENTICATION_METHOD_BLOCKED: StatusWord = StatusWord::new(0x69, 0x83);
    /// File or application not found
    pub const FILE_NOT_FOUND: StatusWord = StatusWord::new(0x6A, 0x82);
}

/// Tags used in GlobalPlatform commands and responses
pub mod tags {
    /// AID, in DELETE and GET STATUS command data and status records
    pub const AID: u8 = 0x4F;
    /// Load file data block, wrapping the payload of a LOAD sequence
    pub const LOAD_FILE_DATA_BLOCK: u8 = 0xC4;
    /// Life-cycle state in a GET STATUS record
    pub const LIFE_CYCLE_STATE: u8 = 0xC5;
    /// Privileges in a GET STATUS record
    pub const PRIVILEGES: u8 = 0xC6;
    /// Executable module AID in a load-file record
    pub const MODULE_AID: u8 = 0x84;
    /// Associated security domain AID in a GET STATUS record
    pub const ASSOCIATED_SECURITY_DOMAIN: u8 = 0xCC;
    /// Executable load file version in a GET STATUS record
    pub const VERSION_NUMBER: u8 = 0xCE;
    /// Application record (GET STATUS TLV format)
    pub const APPLICATION_RECORD: u8 = 0xE3;
    /// Load-file record (GET STATUS TLV format)
    pub const LOAD_FILE_RECORD: u8 = 0xE2;
    /// Application-specific install parameters
    pub const INSTALL_PARAMETERS: u8 = 0xC9;
    /// Load parameters field in INSTALL [for load]
    pub const LOAD_PARAMETERS: u8 = 0xEF;
    /// Non-volatile code space limit, inside the load parameters field
    pub const NON_VOLATILE_CODE_SPACE: u8 = 0xC6;
    /// Volatile data space limit, inside the load parameters field
    pub const VOLATILE_DATA_SPACE: u8 = 0xC7;
    /// Non-volatile data space limit, inside the load parameters field
    pub const NON_VOLATILE_DATA_SPACE: u8 = 0xC8;
    /// Card recognition data (GET DATA)
    pub const CARD_RECOGNITION_DATA: u8 = 0x66;
}

/// Secure Channel Protocol (SCP) versions
pub mod scp {
    /// SCP02 protocol version; every other version is rejected
    pub const SCP02: u8 = 0x02;
}

/// Host challenge length in bytes
pub const CHALLENGE_LENGTH: usize = 8;

/// AID length bounds (ISO/IEC 7816-5)
pub const AID_MIN_LENGTH: usize = 5;
/// Maximum AID length
pub const AID_MAX_LENGTH: usize = 16;

/// Issuer Security Domain AID
pub const ISD_AID: &[u8] = &[0xA0, 0x00, 0x00, 0x01, 0x51, 0x00, 0x00, 0x00];

/// Well-known default test key; never a production secret
pub const DEFAULT_KEY: [u8; 16] = [
    0x40, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4A, 0x4B, 0x4C, 0x4D, 0x4E,
    0x4F,
];
