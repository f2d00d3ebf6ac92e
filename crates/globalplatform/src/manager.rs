//! Card manager: session state machine and high-level operations
//!
//! [`CardManager`] owns the transport and drives the connected → selected
//! → secured progression. Every card operation declares its minimum state
//! and fails fast when invoked too early; nothing is retried and a failed
//! handshake always drops the channel.

use bytes::Bytes;
use opengp_apdu::{CardTransport, Command, Response};
use tracing::{debug, trace, warn};

use crate::commands::{
    DeleteCommand, GetDataCommand, GetStatusCommand, InstallCommand, LoadCommand, SelectCommand,
};
use crate::constants::status;
use crate::crypto::HostChallenge;
use crate::error::{Error, Result};
use crate::keys::KeySet;
use crate::load::{self, LoadCommandStream};
use crate::registry::{
    Aid, ApplicationRecord, ExecutableRecord, IsdRecord, Privileges, StatusFormat,
    parse_applications, parse_executables, parse_isd,
};
use crate::secure_channel::{SecureChannel, SecurityLevel};

/// Upper bound on GET STATUS continuation rounds
const MAX_STATUS_CONTINUATIONS: usize = 64;

/// Aggregated registry contents of a card
#[derive(Debug, Clone)]
pub struct CardStatus {
    /// The Issuer Security Domain record
    pub issuer_security_domain: IsdRecord,
    /// Executable load files with their modules
    pub executables: Vec<ExecutableRecord>,
    /// Applications and supplementary security domains
    pub applications: Vec<ApplicationRecord>,
}

/// GlobalPlatform card manager
#[derive(Debug)]
pub struct CardManager<T: CardTransport> {
    transport: T,
    selected_aid: Option<Aid>,
    channel: Option<SecureChannel>,
}

impl<T: CardTransport> CardManager<T> {
    /// Take ownership of a connected transport
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            selected_aid: None,
            channel: None,
        }
    }

    /// The currently selected AID, if any
    pub fn selected_aid(&self) -> Option<&Aid> {
        self.selected_aid.as_ref()
    }

    /// Whether a secure channel is established
    pub const fn is_secured(&self) -> bool {
        self.channel.is_some()
    }

    /// Select an application by AID, returning the FCI payload
    ///
    /// Selecting drops any established secure channel.
    pub fn select(&mut self, aid: &Aid) -> Result<Bytes> {
        self.channel = None;
        self.selected_aid = None;

        let response = self.transmit_plain(&SelectCommand::by_aid(aid))?;
        Error::check_status(response.status())?;

        debug!(%aid, "application selected");
        self.selected_aid = Some(aid.clone());
        Ok(response.payload().clone())
    }

    /// Select the Issuer Security Domain
    pub fn select_issuer_security_domain(&mut self) -> Result<Bytes> {
        self.select(&Aid::issuer_security_domain())
    }

    /// Open an SCP02 secure channel with the selected security domain
    pub fn open_secure_channel(&mut self, keys: &KeySet, level: SecurityLevel) -> Result<()> {
        self.require_selected()?;
        self.channel = None;

        self.probe_card_recognition_data();

        let channel = SecureChannel::open(&mut self.transport, keys, 0, level)?;
        self.channel = Some(channel);
        Ok(())
    }

    /// Open a secure channel with a caller-provided host challenge
    ///
    /// Deterministic variant for replaying captured exchanges.
    pub fn open_secure_channel_with_challenge(
        &mut self,
        keys: &KeySet,
        level: SecurityLevel,
        host_challenge: HostChallenge,
    ) -> Result<()> {
        self.require_selected()?;
        self.channel = None;

        self.probe_card_recognition_data();

        let channel = SecureChannel::open_with_challenge(
            &mut self.transport,
            keys,
            0,
            level,
            host_challenge,
        )?;
        self.channel = Some(channel);
        Ok(())
    }

    /// Query the card's declared parameters before the handshake
    ///
    /// Best effort: many cards do not expose the card recognition data
    /// and the INITIALIZE UPDATE key information is authoritative anyway.
    fn probe_card_recognition_data(&mut self) {
        match self.transmit_plain(&GetDataCommand::card_recognition_data()) {
            Ok(response) if response.is_success() => {
                trace!(
                    data = %hex::encode(response.payload()),
                    "card recognition data"
                );
            }
            Ok(response) => {
                trace!(status = %response.status(), "card recognition data not available");
            }
            Err(e) => {
                warn!(error = %e, "card recognition data probe failed");
            }
        }
    }

    /// Aggregate the full registry: ISD, executables and applications
    ///
    /// Missing executables or applications (status 6A88) yield empty
    /// lists; the ISD record is required.
    pub fn card_status(&mut self) -> Result<CardStatus> {
        let executables = self.executables()?;
        let applications = self.applications()?;
        let issuer_security_domain = self.issuer_security_domain()?;

        Ok(CardStatus {
            issuer_security_domain,
            executables,
            applications,
        })
    }

    /// Executable load files with their modules
    pub fn executables(&mut self) -> Result<Vec<ExecutableRecord>> {
        let query = GetStatusCommand::executable_load_files_and_modules(StatusFormat::Tlv);
        let data = self.get_status(&query)?;
        parse_executables(&data, query.format())
    }

    /// Applications and supplementary security domains
    pub fn applications(&mut self) -> Result<Vec<ApplicationRecord>> {
        let query = GetStatusCommand::applications(StatusFormat::Tlv);
        let data = self.get_status(&query)?;
        parse_applications(&data, query.format())
    }

    /// The Issuer Security Domain record, carrying the card life cycle
    pub fn issuer_security_domain(&mut self) -> Result<IsdRecord> {
        let query = GetStatusCommand::issuer_security_domain(StatusFormat::Tlv);
        let data = self.get_status(&query)?;
        if data.is_empty() {
            return Err(Error::InvalidResponse("missing ISD record"));
        }
        parse_isd(&data, query.format())
    }

    /// Run a GET STATUS query, following continuations
    ///
    /// Status 6310 requests the next occurrences with the P2 continuation
    /// bit; 6A88 means no matching elements and yields an empty result.
    /// The continuation loop is bounded.
    pub fn get_status(&mut self, query: &GetStatusCommand) -> Result<Vec<u8>> {
        self.require_secured()?;

        let mut data = Vec::new();
        let mut command = query.to_command();

        for _ in 0..MAX_STATUS_CONTINUATIONS {
            let response = self.transmit(&command)?;

            if response.status() == status::REFERENCED_DATA_NOT_FOUND && data.is_empty() {
                return Ok(data);
            }

            if response.status() != status::SUCCESS
                && response.status() != status::MORE_STATUS_DATA
            {
                return Err(Error::CardStatus(response.status()));
            }

            data.extend_from_slice(response.payload());

            if response.status() != status::MORE_STATUS_DATA {
                return Ok(data);
            }

            command = query.next_occurrence();
        }

        Err(Error::InvalidResponse("unbounded GET STATUS continuation"))
    }

    /// Load and instantiate an application package
    ///
    /// Runs INSTALL [for load], streams the load file in LOAD blocks, then
    /// INSTALL [for install and make selectable].
    #[allow(clippy::too_many_arguments)]
    pub fn install(
        &mut self,
        load_file_aid: &Aid,
        module_aid: &Aid,
        instance_aid: &Aid,
        privileges: Privileges,
        install_parameters: &[u8],
        load_file: &[u8],
    ) -> Result<()> {
        self.require_secured()?;

        let sd_aid = self
            .selected_aid
            .clone()
            .unwrap_or_else(Aid::issuer_security_domain);

        let response = self.transmit(&InstallCommand::for_load(load_file_aid, &sd_aid))?;
        Error::check_status(response.status())?;

        self.load(load_file)?;

        let response = self.transmit(&InstallCommand::for_install_and_make_selectable(
            load_file_aid,
            module_aid,
            instance_aid,
            privileges,
            install_parameters,
            &[],
        )?)?;
        Error::check_status(response.status())?;

        debug!(%instance_aid, "application installed");
        Ok(())
    }

    /// Stream a load file in LOAD blocks
    ///
    /// Blocks are sized for the channel's security level: a channel that
    /// encrypts command data pads every block, so its blocks are smaller.
    pub fn load(&mut self, load_file: &[u8]) -> Result<()> {
        self.require_secured()?;

        let block_size = match &self.channel {
            Some(channel) if channel.level().contains(SecurityLevel::ENC) => {
                load::ENC_BLOCK_SIZE
            }
            _ => load::BLOCK_SIZE,
        };

        let mut stream = LoadCommandStream::with_block_size(load_file, None, block_size)?;
        while let Some((is_last, block_number, block_data)) = stream.next_block() {
            trace!(
                block_number,
                is_last,
                len = block_data.len(),
                "sending LOAD block"
            );
            let command = LoadCommand::block(block_number, is_last, block_data);
            let response = self.transmit(&command)?;
            Error::check_status(response.status())?;
        }

        Ok(())
    }

    /// Delete an object by AID
    pub fn delete(&mut self, aid: &Aid) -> Result<()> {
        self.require_secured()?;
        let response = self.transmit(&DeleteCommand::object(aid))?;
        Error::check_status(response.status())
    }

    /// Delete several objects with a single command
    pub fn delete_objects(&mut self, aids: &[Aid]) -> Result<()> {
        self.require_secured()?;
        if aids.is_empty() {
            return Err(Error::InvalidParameter("empty AID list"));
        }
        let response = self.transmit(&DeleteCommand::objects(aids))?;
        Error::check_status(response.status())
    }

    /// Delete an object and its related objects
    pub fn delete_and_related(&mut self, aid: &Aid) -> Result<()> {
        self.require_secured()?;
        let response = self.transmit(&DeleteCommand::object_and_related(aid))?;
        Error::check_status(response.status())
    }

    /// Drop the secure channel and selection, keeping the transport
    pub fn disconnect(&mut self) -> Result<()> {
        self.channel = None;
        self.selected_aid = None;
        self.transport.reset()?;
        Ok(())
    }

    /// Give the transport back, dropping all session state
    pub fn into_transport(mut self) -> T {
        self.channel = None;
        self.selected_aid = None;
        self.transport
    }

    /// Send a command through the secure channel when one is open
    ///
    /// A failed exchange leaves the MAC chain out of step with the card,
    /// so any error on the secured path drops the channel back to the
    /// selected state. The caller must re-authenticate before the next
    /// secured operation.
    fn transmit(&mut self, command: &Command) -> Result<Response> {
        if self.channel.is_none() {
            return self.transmit_plain(command);
        }

        let result = self.transmit_secured(command);
        if result.is_err() {
            warn!("dropping secure channel after failed exchange");
            self.channel = None;
        }
        result
    }

    fn transmit_secured(&mut self, command: &Command) -> Result<Response> {
        let channel = self
            .channel
            .as_mut()
            .ok_or(Error::Precondition("secure channel not established"))?;

        let wrapped = channel.wrap_command(command)?;
        let raw = self.transport.transmit_raw(&wrapped.to_bytes())?;
        let response = Response::from_bytes(&raw)?;
        channel.unwrap_response(response)
    }

    fn transmit_plain(&mut self, command: &Command) -> Result<Response> {
        let raw = self.transport.transmit_raw(&command.to_bytes())?;
        Ok(Response::from_bytes(&raw)?)
    }

    fn require_selected(&self) -> Result<()> {
        if self.selected_aid.is_none() {
            return Err(Error::Precondition("no application selected"));
        }
        Ok(())
    }

    fn require_secured(&self) -> Result<()> {
        self.require_selected()?;
        if self.channel.is_none() {
            return Err(Error::Precondition("secure channel not established"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use opengp_apdu::TransportError;

    #[derive(Debug, Default)]
    struct MockTransport {
        commands: Vec<Vec<u8>>,
        responses: Vec<Bytes>,
    }

    impl MockTransport {
        fn with_responses(responses: &[&[u8]]) -> Self {
            Self {
                commands: Vec::new(),
                responses: responses.iter().map(|r| Bytes::copy_from_slice(r)).collect(),
            }
        }
    }

    impl CardTransport for MockTransport {
        fn do_transmit_raw(&mut self, command: &[u8]) -> std::result::Result<Bytes, TransportError> {
            self.commands.push(command.to_vec());
            if self.responses.is_empty() {
                return Err(TransportError::Transmission);
            }
            if self.responses.len() == 1 {
                Ok(self.responses[0].clone())
            } else {
                Ok(self.responses.remove(0))
            }
        }

        fn is_connected(&self) -> bool {
            true
        }

        fn reset(&mut self) -> std::result::Result<(), TransportError> {
            Ok(())
        }
    }

    const SELECT_RESPONSE: [u8; 20] =
        hex!("6F108408A000000151000000A5049F6501FF9000");
    const INIT_RESPONSE: [u8; 30] =
        hex!("000002650183039536622002000de9c62ba1c4c8e55fcb91b6654ce49000");
    const HOST_CHALLENGE: HostChallenge = hex!("f0467f908e5ca23f");

    /// Select the ISD and complete a default-key handshake
    fn secured_manager(responses: Vec<&[u8]>) -> CardManager<MockTransport> {
        secured_manager_at(SecurityLevel::NONE, responses)
    }

    fn secured_manager_at(
        level: SecurityLevel,
        mut responses: Vec<&[u8]>,
    ) -> CardManager<MockTransport> {
        let mut all: Vec<&[u8]> = vec![
            &SELECT_RESPONSE,
            &hex!("6A88"), // card recognition data probe
            &INIT_RESPONSE,
            &hex!("9000"), // EXTERNAL AUTHENTICATE
        ];
        all.append(&mut responses);

        let mut manager = CardManager::new(MockTransport::with_responses(&all));
        manager.select_issuer_security_domain().unwrap();
        manager
            .open_secure_channel_with_challenge(&KeySet::default_test(), level, HOST_CHALLENGE)
            .unwrap();
        manager
    }

    #[test]
    fn test_select_isd() {
        let mut manager =
            CardManager::new(MockTransport::with_responses(&[&SELECT_RESPONSE]));

        let fci = manager.select_issuer_security_domain().unwrap();
        assert!(fci.starts_with(&[0x6F]));
        assert_eq!(manager.selected_aid(), Some(&Aid::issuer_security_domain()));
        assert!(!manager.is_secured());
    }

    #[test]
    fn test_select_failure_clears_selection() {
        let mut manager = CardManager::new(MockTransport::with_responses(&[&hex!("6A82")]));

        let aid = Aid::new(hex!("A0000000030000").to_vec()).unwrap();
        match manager.select(&aid) {
            Err(Error::CardStatus(sw)) => assert_eq!(sw, status::FILE_NOT_FOUND),
            other => panic!("unexpected select result: {other:?}"),
        }
        assert!(manager.selected_aid().is_none());
    }

    #[test]
    fn test_open_channel_requires_selection() {
        let mut manager = CardManager::new(MockTransport::default());
        let result = manager.open_secure_channel(&KeySet::default_test(), SecurityLevel::MAC);
        assert!(matches!(result, Err(Error::Precondition(_))));
    }

    #[test]
    fn test_operations_require_secure_channel() {
        let mut manager =
            CardManager::new(MockTransport::with_responses(&[&SELECT_RESPONSE]));
        manager.select_issuer_security_domain().unwrap();

        let aid = Aid::new(hex!("A0000000030000").to_vec()).unwrap();
        assert!(matches!(
            manager.delete(&aid),
            Err(Error::Precondition(_))
        ));
        assert!(matches!(
            manager.card_status(),
            Err(Error::Precondition(_))
        ));
        assert!(matches!(
            manager.load(&hex!("01")),
            Err(Error::Precondition(_))
        ));
    }

    #[test]
    fn test_default_key_level_zero_handshake() {
        // Plain-mode handshake with the default test key still reaches the
        // secured state
        let manager = secured_manager(vec![]);
        assert!(manager.is_secured());
    }

    #[test]
    fn test_handshake_failure_drops_channel() {
        let mut manager = CardManager::new(MockTransport::with_responses(&[
            &SELECT_RESPONSE,
            &hex!("6A88"),
            &INIT_RESPONSE,
            &hex!("6982"), // EXTERNAL AUTHENTICATE refused
        ]));
        manager.select_issuer_security_domain().unwrap();

        let result = manager.open_secure_channel_with_challenge(
            &KeySet::default_test(),
            SecurityLevel::MAC,
            HOST_CHALLENGE,
        );
        assert!(matches!(result, Err(Error::AuthenticationFailed(_))));
        assert!(!manager.is_secured());
        // Selection survives the failed handshake
        assert!(manager.selected_aid().is_some());
    }

    #[test]
    fn test_transport_failure_drops_channel() {
        let mut manager = secured_manager(vec![]);
        manager.transport.responses.clear();

        let result = manager.applications();
        assert!(matches!(result, Err(Error::Transport(_))));

        // The MAC chain is unrecoverable, so the channel is gone while
        // the selection survives for a fresh handshake
        assert!(!manager.is_secured());
        assert!(manager.selected_aid().is_some());
        assert!(matches!(
            manager.applications(),
            Err(Error::Precondition(_))
        ));
    }

    #[test]
    fn test_load_blocks_fit_under_encryption() {
        let mut manager = secured_manager_at(
            SecurityLevel::MAC | SecurityLevel::ENC,
            vec![&hex!("9000")],
        );

        let load_file = vec![0xAB; 600];
        manager.load(&load_file).unwrap();

        let transport = manager.into_transport();
        let load_commands: Vec<_> = transport
            .commands
            .iter()
            .filter(|c| c.len() > 4 && c[1] == 0xE8)
            .collect();
        assert_eq!(load_commands.len(), 3);

        // Every wrapped block serializes with a consistent non-zero Lc
        for command in load_commands {
            let lc = command[4] as usize;
            assert_ne!(lc, 0);
            assert_eq!(command.len(), 5 + lc);
        }
    }

    #[test]
    fn test_get_status_continuation() {
        let first = hex!("E30F4F07A0000000030000C50107C601006310");
        let second = hex!("E3104F08A000000003000001C50103C601009000");
        let mut manager = secured_manager(vec![&first, &second]);

        let apps = manager.applications().unwrap();
        assert_eq!(apps.len(), 2);

        // Continuation command carries the next-occurrence bit
        let transport = manager.into_transport();
        let continuation = &transport.commands[transport.commands.len() - 1];
        assert_eq!(continuation[3], 0x03);
    }

    #[test]
    fn test_get_status_no_data_is_empty() {
        let mut manager = secured_manager(vec![&hex!("6A88")]);
        let apps = manager.applications().unwrap();
        assert!(apps.is_empty());
    }

    #[test]
    fn test_isd_only_card_status() {
        // Executables and applications absent, ISD present with OP_READY
        let isd = hex!("E3104F08A000000151000000C50101C601809000");
        let mut manager = secured_manager(vec![&hex!("6A88"), &hex!("6A88"), &isd]);

        let status = manager.card_status().unwrap();
        assert!(status.executables.is_empty());
        assert!(status.applications.is_empty());
        assert_eq!(
            status.issuer_security_domain.aid,
            Aid::issuer_security_domain()
        );
        assert_eq!(
            status.issuer_security_domain.life_cycle,
            crate::registry::CardLifeCycle::OpReady
        );
    }

    #[test]
    fn test_delete() {
        let mut manager = secured_manager(vec![&hex!("9000")]);
        let aid = Aid::new(hex!("A0000000030000").to_vec()).unwrap();
        manager.delete(&aid).unwrap();

        let transport = manager.into_transport();
        let command = transport.commands.last().unwrap();
        // Wrapped DELETE: secure CLA, INS E4, MAC appended
        assert_eq!(command[0], 0x84);
        assert_eq!(command[1], 0xE4);
    }

    #[test]
    fn test_delete_objects() {
        let mut manager = secured_manager(vec![&hex!("9000")]);
        let package = Aid::new(hex!("A0000000030000").to_vec()).unwrap();
        let applet = Aid::new(hex!("A000000003000001").to_vec()).unwrap();
        manager.delete_objects(&[package, applet]).unwrap();

        let transport = manager.into_transport();
        let command = transport.commands.last().unwrap();
        assert_eq!(command[1], 0xE4);
        // Both 4F TLVs precede the MAC
        assert_eq!(
            &command[5..24],
            hex!("4F07A00000000300004F08A000000003000001")
        );
    }

    #[test]
    fn test_delete_objects_rejects_empty_list() {
        let mut manager = secured_manager(vec![]);
        assert!(matches!(
            manager.delete_objects(&[]),
            Err(Error::InvalidParameter(_))
        ));
        // A local validation failure does not cost the channel
        assert!(manager.is_secured());
    }

    #[test]
    fn test_install_sequence() {
        // for load, one LOAD block, for install and make selectable
        let mut manager =
            secured_manager(vec![&hex!("9000"), &hex!("9000"), &hex!("9000")]);

        let package = Aid::new(hex!("A0000000030000").to_vec()).unwrap();
        let module = Aid::new(hex!("A000000003000001").to_vec()).unwrap();
        let instance = module.clone();

        manager
            .install(
                &package,
                &module,
                &instance,
                Privileges::default(),
                &[],
                &hex!("DEADBEEF"),
            )
            .unwrap();

        let transport = manager.into_transport();
        let n = transport.commands.len();
        // INSTALL [for load], LOAD last block, INSTALL [for install...]
        assert_eq!(transport.commands[n - 3][1], 0xE6);
        assert_eq!(transport.commands[n - 3][2], 0x02);
        assert_eq!(transport.commands[n - 2][1], 0xE8);
        assert_eq!(transport.commands[n - 2][2], 0x80);
        assert_eq!(transport.commands[n - 1][1], 0xE6);
        assert_eq!(transport.commands[n - 1][2], 0x0C);
    }

    #[test]
    fn test_disconnect_clears_state() {
        let mut manager = secured_manager(vec![]);
        manager.disconnect().unwrap();
        assert!(!manager.is_secured());
        assert!(manager.selected_aid().is_none());
    }
}
