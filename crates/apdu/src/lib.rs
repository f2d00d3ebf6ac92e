//! APDU primitives for smart card communication
//!
//! This crate provides the foundational types for exchanging APDUs
//! (Application Protocol Data Units, ISO/IEC 7816-4) with a smart card:
//!
//! - [`Command`] and [`Response`] for building and parsing APDUs
//! - [`StatusWord`] for status word interpretation
//! - [`CardTransport`] as the injected transport capability; the crate has
//!   no knowledge of readers or protocols beyond raw byte exchange

#![forbid(unsafe_code)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

pub mod command;
pub mod error;
pub mod response;
pub mod status;
pub mod transport;

pub use command::Command;
pub use error::{ResponseError, TransportError};
pub use response::Response;
pub use status::StatusWord;
pub use transport::CardTransport;
