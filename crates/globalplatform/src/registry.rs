//! Card registry contents: AIDs, life-cycle states, privileges and the
//! records returned by GET STATUS
//!
//! GET STATUS responses come in two encodings selected by P2: the legacy
//! fixed layout and the TLV format. Both are parsed here into the same
//! typed records. Unknown life-cycle codes are preserved, never rejected;
//! the cards in the field are newer than this table.

use std::fmt;

use iso7816_tlv::simple::Tlv;

use crate::constants::{AID_MAX_LENGTH, AID_MIN_LENGTH, ISD_AID, tags};
use crate::error::{Error, Result};

/// An ISO 7816-5 application identifier, 5 to 16 bytes
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Aid(Vec<u8>);

impl Aid {
    /// Create an AID, enforcing the 5..=16 byte bounds
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() < AID_MIN_LENGTH || bytes.len() > AID_MAX_LENGTH {
            return Err(Error::InvalidParameter("AID must be 5 to 16 bytes"));
        }
        Ok(Self(bytes))
    }

    /// The default Issuer Security Domain AID
    pub fn issuer_security_domain() -> Self {
        Self(ISD_AID.to_vec())
    }

    /// Raw AID bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; the constructor rejects empty AIDs
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<&[u8]> for Aid {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Self::new(bytes.to_vec())
    }
}

impl AsRef<[u8]> for Aid {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Aid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(&self.0))
    }
}

impl fmt::Debug for Aid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Aid({self})")
    }
}

/// Life-cycle state of an executable load file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutableLifeCycle {
    /// Load file present and usable
    Loaded,
    /// Code not in the known table; kept verbatim
    Unknown(u8),
}

impl ExecutableLifeCycle {
    /// Decode a life-cycle byte
    pub const fn from_code(code: u8) -> Self {
        match code {
            0x01 => Self::Loaded,
            other => Self::Unknown(other),
        }
    }

    /// The raw life-cycle byte
    pub const fn code(self) -> u8 {
        match self {
            Self::Loaded => 0x01,
            Self::Unknown(code) => code,
        }
    }
}

/// Life-cycle state of an application or supplementary security domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationLifeCycle {
    /// Installed but not yet selectable
    Installed,
    /// Selectable
    Selectable,
    /// Locked by the card or an authorized application
    Locked,
    /// Code not in the known table; kept verbatim
    Unknown(u8),
}

impl ApplicationLifeCycle {
    /// Decode a life-cycle byte
    pub const fn from_code(code: u8) -> Self {
        match code {
            0x03 => Self::Installed,
            0x07 => Self::Selectable,
            0xFF => Self::Locked,
            other => Self::Unknown(other),
        }
    }

    /// The raw life-cycle byte
    pub const fn code(self) -> u8 {
        match self {
            Self::Installed => 0x03,
            Self::Selectable => 0x07,
            Self::Locked => 0xFF,
            Self::Unknown(code) => code,
        }
    }
}

/// Life-cycle state of the card, as reported by the Issuer Security Domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardLifeCycle {
    /// Ready for post-issuance personalization
    OpReady,
    /// Initialized
    Initialized,
    /// Secured
    Secured,
    /// Card locked
    Locked,
    /// Terminated; irreversible
    Terminated,
    /// Code not in the known table; kept verbatim
    Unknown(u8),
}

impl CardLifeCycle {
    /// Decode a life-cycle byte
    pub const fn from_code(code: u8) -> Self {
        match code {
            0x01 => Self::OpReady,
            0x07 => Self::Initialized,
            0x0F => Self::Secured,
            0x7F => Self::Locked,
            0xFF => Self::Terminated,
            other => Self::Unknown(other),
        }
    }

    /// The raw life-cycle byte
    pub const fn code(self) -> u8 {
        match self {
            Self::OpReady => 0x01,
            Self::Initialized => 0x07,
            Self::Secured => 0x0F,
            Self::Locked => 0x7F,
            Self::Terminated => 0xFF,
            Self::Unknown(code) => code,
        }
    }
}

/// A single GlobalPlatform privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    /// Security domain
    SecurityDomain,
    /// Security domain with DAP verification
    DapVerification,
    /// Security domain with delegated management
    DelegatedManagement,
    /// Card lock
    CardLock,
    /// Card terminate
    CardTerminate,
    /// Default selected with card reset
    CardReset,
    /// PIN change
    PinChange,
    /// Security domain with mandated DAP verification
    MandatedDapVerification,
    /// Trusted path
    TrustedPath,
    /// Authorized management
    AuthorizedManagement,
    /// Token verification
    TokenVerification,
    /// Global delete
    GlobalDelete,
    /// Global lock
    GlobalLock,
    /// Global registry
    GlobalRegistry,
    /// Final application
    FinalApplication,
    /// Global service
    GlobalService,
    /// Receipt generation
    ReceiptGeneration,
    /// Ciphered load file data block
    CipheredLoadFileDataBlock,
    /// Contactless activation
    ContactlessActivation,
    /// Contactless self-activation
    ContactlessSelfActivation,
}

impl Privilege {
    /// All defined privileges, most significant mask first
    pub const ALL: [Self; 20] = [
        Self::SecurityDomain,
        Self::DapVerification,
        Self::DelegatedManagement,
        Self::CardLock,
        Self::CardTerminate,
        Self::CardReset,
        Self::PinChange,
        Self::MandatedDapVerification,
        Self::TrustedPath,
        Self::AuthorizedManagement,
        Self::TokenVerification,
        Self::GlobalDelete,
        Self::GlobalLock,
        Self::GlobalRegistry,
        Self::FinalApplication,
        Self::GlobalService,
        Self::ReceiptGeneration,
        Self::CipheredLoadFileDataBlock,
        Self::ContactlessActivation,
        Self::ContactlessSelfActivation,
    ];

    /// Bit mask in the 24-bit privilege word (byte 1 most significant)
    ///
    /// Composite privileges (DAP verification, delegated management,
    /// mandated DAP) include the security domain bit in their mask.
    pub const fn mask(self) -> u32 {
        match self {
            Self::SecurityDomain => 0x80_0000,
            Self::DapVerification => 0xC0_0000,
            Self::DelegatedManagement => 0xA0_0000,
            Self::CardLock => 0x10_0000,
            Self::CardTerminate => 0x08_0000,
            Self::CardReset => 0x04_0000,
            Self::PinChange => 0x02_0000,
            Self::MandatedDapVerification => 0xD0_0000,
            Self::TrustedPath => 0x00_8000,
            Self::AuthorizedManagement => 0x00_4000,
            Self::TokenVerification => 0x00_2000,
            Self::GlobalDelete => 0x00_1000,
            Self::GlobalLock => 0x00_0800,
            Self::GlobalRegistry => 0x00_0400,
            Self::FinalApplication => 0x00_0200,
            Self::GlobalService => 0x00_0100,
            Self::ReceiptGeneration => 0x00_0080,
            Self::CipheredLoadFileDataBlock => 0x00_0040,
            Self::ContactlessActivation => 0x00_0020,
            Self::ContactlessSelfActivation => 0x00_0010,
        }
    }
}

/// A decoded privilege word
///
/// A privilege is reported present only when its full mask is set, so
/// `0x800000` is exactly `SecurityDomain` and never the composite
/// DAP-verification privileges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Privileges(u32);

impl Privileges {
    /// Wrap a raw 24-bit privilege word
    pub const fn from_word(word: u32) -> Self {
        Self(word & 0xFF_FFFF)
    }

    /// Decode privilege bytes from a status record (1 or 3 bytes)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let word = match bytes.len() {
            1 => (bytes[0] as u32) << 16,
            3 => ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | bytes[2] as u32,
            actual => {
                return Err(Error::InvalidLength {
                    expected: 3,
                    actual,
                });
            }
        };
        Ok(Self(word))
    }

    /// The raw 24-bit privilege word
    pub const fn word(self) -> u32 {
        self.0
    }

    /// Whether the full mask of `privilege` is set
    pub const fn contains(self, privilege: Privilege) -> bool {
        self.0 & privilege.mask() == privilege.mask()
    }

    /// All privileges whose full mask is set, most significant first
    pub fn decode(self) -> Vec<Privilege> {
        Privilege::ALL
            .into_iter()
            .filter(|p| self.contains(*p))
            .collect()
    }
}

/// Executable load file record from GET STATUS
#[derive(Debug, Clone)]
pub struct ExecutableRecord {
    /// Load file AID
    pub aid: Aid,
    /// Associated security domain, when reported
    pub security_domain: Option<Aid>,
    /// Load file version (major, minor)
    pub version: (u8, u8),
    /// Life-cycle state
    pub life_cycle: ExecutableLifeCycle,
    /// Executable module AIDs, in card order
    pub modules: Vec<Aid>,
}

/// Application or supplementary security domain record from GET STATUS
#[derive(Debug, Clone)]
pub struct ApplicationRecord {
    /// Instance AID
    pub aid: Aid,
    /// Associated security domain, when reported
    pub security_domain: Option<Aid>,
    /// Version (major, minor)
    pub version: (u8, u8),
    /// Life-cycle state
    pub life_cycle: ApplicationLifeCycle,
    /// Privileges
    pub privileges: Privileges,
}

/// Issuer Security Domain record from GET STATUS
#[derive(Debug, Clone)]
pub struct IsdRecord {
    /// ISD AID
    pub aid: Aid,
    /// Card life-cycle state
    pub life_cycle: CardLifeCycle,
    /// ISD privileges
    pub privileges: Privileges,
}

/// Response encoding of a GET STATUS query, selected by P2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFormat {
    /// Fixed layout: length-prefixed AID, life cycle byte, privilege byte
    Legacy,
    /// TLV records under tags E2/E3
    #[default]
    Tlv,
}

/// One raw status entry, common to all record kinds
struct RawEntry {
    aid: Aid,
    life_cycle: u8,
    privileges: Privileges,
    security_domain: Option<Aid>,
    version: (u8, u8),
    modules: Vec<Aid>,
}

/// Parse the legacy fixed layout: repeated (len ‖ AID ‖ life cycle ‖
/// privilege byte)
fn parse_legacy_entries(data: &[u8]) -> Result<Vec<RawEntry>> {
    let mut entries = Vec::new();
    let mut rest = data;

    while !rest.is_empty() {
        let aid_len = rest[0] as usize;
        if rest.len() < 1 + aid_len + 2 {
            return Err(Error::InvalidResponse("truncated status entry"));
        }

        let aid = Aid::try_from(&rest[1..1 + aid_len])?;
        let life_cycle = rest[1 + aid_len];
        let privileges = Privileges::from_bytes(&rest[2 + aid_len..3 + aid_len])?;

        entries.push(RawEntry {
            aid,
            life_cycle,
            privileges,
            security_domain: None,
            version: (0, 0),
            modules: Vec::new(),
        });

        rest = &rest[3 + aid_len..];
    }

    Ok(entries)
}

/// Parse the TLV format: records under `record_tag`, fields under the
/// tags of GlobalPlatform 2.1.1 table 9-22
fn parse_tlv_entries(data: &[u8], record_tag: u8) -> Result<Vec<RawEntry>> {
    let mut entries = Vec::new();

    for tlv in Tlv::parse_all(data) {
        if Into::<u8>::into(tlv.tag()) != record_tag {
            continue;
        }

        let mut aid = None;
        let mut life_cycle = 0u8;
        let mut privileges = Privileges::default();
        let mut security_domain = None;
        let mut version = (0, 0);
        let mut modules = Vec::new();

        for field in Tlv::parse_all(tlv.value()) {
            let value = field.value();
            match Into::<u8>::into(field.tag()) {
                tags::AID => aid = Some(Aid::try_from(value)?),
                tags::LIFE_CYCLE_STATE => {
                    if value.is_empty() {
                        return Err(Error::InvalidResponse("empty life-cycle field"));
                    }
                    life_cycle = value[0];
                }
                tags::PRIVILEGES => privileges = Privileges::from_bytes(value)?,
                tags::ASSOCIATED_SECURITY_DOMAIN => {
                    security_domain = Some(Aid::try_from(value)?);
                }
                tags::VERSION_NUMBER => {
                    if value.len() >= 2 {
                        version = (value[0], value[1]);
                    }
                }
                tags::MODULE_AID => modules.push(Aid::try_from(value)?),
                _ => {}
            }
        }

        let aid = aid.ok_or(Error::InvalidResponse("status record without AID"))?;
        entries.push(RawEntry {
            aid,
            life_cycle,
            privileges,
            security_domain,
            version,
            modules,
        });
    }

    Ok(entries)
}

/// Parse a GET STATUS response for executable load files
pub fn parse_executables(data: &[u8], format: StatusFormat) -> Result<Vec<ExecutableRecord>> {
    let entries = match format {
        StatusFormat::Legacy => parse_legacy_entries(data)?,
        StatusFormat::Tlv => parse_tlv_entries(data, tags::LOAD_FILE_RECORD)?,
    };

    Ok(entries
        .into_iter()
        .map(|e| ExecutableRecord {
            aid: e.aid,
            security_domain: e.security_domain,
            version: e.version,
            life_cycle: ExecutableLifeCycle::from_code(e.life_cycle),
            modules: e.modules,
        })
        .collect())
}

/// Parse a GET STATUS response for applications and supplementary
/// security domains
pub fn parse_applications(data: &[u8], format: StatusFormat) -> Result<Vec<ApplicationRecord>> {
    let entries = match format {
        StatusFormat::Legacy => parse_legacy_entries(data)?,
        StatusFormat::Tlv => parse_tlv_entries(data, tags::APPLICATION_RECORD)?,
    };

    Ok(entries
        .into_iter()
        .map(|e| ApplicationRecord {
            aid: e.aid,
            security_domain: e.security_domain,
            version: e.version,
            life_cycle: ApplicationLifeCycle::from_code(e.life_cycle),
            privileges: e.privileges,
        })
        .collect())
}

/// Parse a GET STATUS response for the Issuer Security Domain
///
/// Exactly one record is expected; its life-cycle byte is the card
/// life-cycle state.
pub fn parse_isd(data: &[u8], format: StatusFormat) -> Result<IsdRecord> {
    let entries = match format {
        StatusFormat::Legacy => parse_legacy_entries(data)?,
        StatusFormat::Tlv => parse_tlv_entries(data, tags::APPLICATION_RECORD)?,
    };

    let entry = entries
        .into_iter()
        .next()
        .ok_or(Error::InvalidResponse("missing ISD record"))?;

    Ok(IsdRecord {
        aid: entry.aid,
        life_cycle: CardLifeCycle::from_code(entry.life_cycle),
        privileges: entry.privileges,
    })
}
