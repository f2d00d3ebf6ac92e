//! GlobalPlatform implementation for smart card management
//!
//! This crate implements the GlobalPlatform Card Specification v2.1.1
//! life-cycle management protocol: establishing a mutually-authenticated
//! SCP02 secure channel, querying the life-cycle status of installed
//! applications and executable load files, and loading, installing and
//! deleting application packages.
//!
//! The physical transport is an injected capability behind
//! [`opengp_apdu::CardTransport`]; the main entry point is
//! [`CardManager`], which drives the session state machine
//! (connected → selected → secured) and validates the required state before
//! every card operation.

#![forbid(unsafe_code)]

pub mod commands;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod load;
pub mod manager;
pub mod registry;
pub mod secure_channel;
pub mod session;

// Re-exports
pub use error::{Error, Result};
pub use keys::{DerivationMethod, KeySet};
pub use load::LoadCommandStream;
pub use manager::{CardManager, CardStatus};
pub use registry::{
    Aid, ApplicationLifeCycle, ApplicationRecord, CardLifeCycle, ExecutableLifeCycle,
    ExecutableRecord, IsdRecord, Privilege, Privileges,
};
pub use secure_channel::{SecureChannel, SecurityLevel};
pub use session::Session;

// Re-export from opengp-apdu for convenience
pub use opengp_apdu::{CardTransport, Command, Response, StatusWord};
