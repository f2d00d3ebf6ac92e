//! Error types for transport and response handling

use thiserror::Error;

/// Errors raised by a card transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection to the card or reader was lost or never established
    #[error("failed to connect to card")]
    Connection,

    /// The command could not be transmitted or no response was received
    #[error("failed to transmit data")]
    Transmission,

    /// The transport timed out waiting for the card
    #[error("operation timed out")]
    Timeout,

    /// Device-level failure
    #[error("device error")]
    Device,

    /// Other transport failure with a message
    #[error("{0}")]
    Other(String),
}

/// Errors raised while parsing an APDU response
#[derive(Debug, Error)]
pub enum ResponseError {
    /// Response was shorter than the two mandatory status bytes
    #[error("response truncated: {actual} byte(s), need at least 2")]
    Truncated {
        /// Number of bytes actually received
        actual: usize,
    },
}
