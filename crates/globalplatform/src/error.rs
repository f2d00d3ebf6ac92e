//! Error types for GlobalPlatform operations

use opengp_apdu::{ResponseError, StatusWord, TransportError};

/// Result type for GlobalPlatform operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by GlobalPlatform operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An operation was invoked in the wrong session state
    #[error("precondition not met: {0}")]
    Precondition(&'static str),

    /// Transport-level failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Malformed APDU response
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// The card returned a non-success status word
    #[error("card returned status {0}")]
    CardStatus(StatusWord),

    /// Mutual authentication failed (cryptogram mismatch or card rejection)
    #[error("authentication failed: {0}")]
    AuthenticationFailed(&'static str),

    /// Invalid parameter passed to a command builder
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// A value had an unexpected length
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        actual: usize,
    },

    /// The requested key derivation method is not implemented
    #[error("unsupported key derivation method: {0}")]
    UnsupportedDerivationMethod(&'static str),

    /// The card reported a Secure Channel Protocol version we do not speak
    #[error("unsupported SCP version: {0:#04x}")]
    UnsupportedScpVersion(u8),

    /// The card's response could not be interpreted
    #[error("invalid response: {0}")]
    InvalidResponse(&'static str),
}

impl Error {
    /// Map a status word to a result, treating 0x9000 as success
    pub fn check_status(status: StatusWord) -> Result<()> {
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::CardStatus(status))
        }
    }
}
