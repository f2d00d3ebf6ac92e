//! GlobalPlatform command builders and response parsers
//!
//! One module per card command. Builders validate their inputs and produce
//! [`opengp_apdu::Command`] values; whatever secure messaging the session
//! negotiated is applied later by the secure channel wrapper.

pub mod delete;
pub mod external_authenticate;
pub mod get_data;
pub mod get_status;
pub mod initialize_update;
pub mod install;
pub mod load;
pub mod select;

pub use delete::DeleteCommand;
pub use external_authenticate::ExternalAuthenticateCommand;
pub use get_data::GetDataCommand;
pub use get_status::GetStatusCommand;
pub use initialize_update::InitializeUpdateCommand;
pub use install::{InstallCommand, SpaceLimits};
pub use load::LoadCommand;
pub use select::SelectCommand;
