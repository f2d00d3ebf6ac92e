//! SCP02 secure channel
//!
//! The channel owns the session and the command wrapper. Opening a channel
//! runs the full mutual-authentication handshake (INITIALIZE UPDATE,
//! cryptogram verification, EXTERNAL AUTHENTICATE); afterwards every
//! command is wrapped according to the negotiated security level.
//!
//! EXTERNAL AUTHENTICATE is always sent with a C-MAC, including at
//! security level 0: the MAC is how the card verifies the host holds the
//! session keys.

use std::fmt;
use std::ops::BitOr;

use bytes::{BufMut, BytesMut};
use cipher::Iv;
use opengp_apdu::{CardTransport, Command, Response};
use rand::RngCore;
use tracing::{debug, trace};

use crate::commands::{ExternalAuthenticateCommand, InitializeUpdateCommand};
use crate::constants::{cla, security_level, status};
use crate::crypto::{HostChallenge, Scp02, encrypt_data, encrypt_icv, mac_full_3des};
use crate::error::{Error, Result};
use crate::keys::KeySet;
use crate::session::Session;

/// Negotiated SCP02 security level, as carried in EXTERNAL AUTHENTICATE P1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecurityLevel(u8);

impl SecurityLevel {
    /// No protection beyond the handshake (commands still carry a C-MAC)
    pub const NONE: Self = Self(0);
    /// Command MAC
    pub const MAC: Self = Self(security_level::C_MAC);
    /// Command data encryption
    pub const ENC: Self = Self(security_level::C_DEC);
    /// Response MAC
    pub const RMAC: Self = Self(security_level::R_MAC);

    /// The P1 byte for EXTERNAL AUTHENTICATE
    pub const fn p1(self) -> u8 {
        self.0
    }

    /// Whether every bit of `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SecurityLevel {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// SCP02 command wrapper: C-MAC chaining and optional data encryption
#[derive(Clone)]
pub struct Scp02Wrapper {
    session: Session,
    level: SecurityLevel,
    icv: Iv<Scp02>,
    rmac_icv: Iv<Scp02>,
}

impl fmt::Debug for Scp02Wrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scp02Wrapper")
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

impl Scp02Wrapper {
    /// Create a wrapper for a session at the given level, ICVs zeroed
    pub fn new(session: Session, level: SecurityLevel) -> Self {
        Self {
            session,
            level,
            icv: Default::default(),
            rmac_icv: Default::default(),
        }
    }

    /// Wrap a command: C-MAC always, data encryption when the level asks
    ///
    /// The MAC covers the modified header and the plaintext data with the
    /// MAC-inclusive Lc. The ICV is the previous MAC, single-DES encrypted
    /// for every command after the first.
    pub fn wrap_command(&mut self, command: &Command) -> Result<Command> {
        let data_len = command.data().map_or(0, |d| d.len());
        let encrypting = self.level.contains(SecurityLevel::ENC) && data_len > 0;

        // Encryption pads the data to a block boundary before the MAC is
        // appended, so the plaintext bound is tighter at the ENC level:
        // padded length plus the MAC must still fit a one-byte Lc.
        let max_data_len = if encrypting { 239 } else { 247 };
        if data_len > max_data_len {
            return Err(Error::InvalidLength {
                expected: max_data_len,
                actual: data_len,
            });
        }

        let secured_cla = command.class() | cla::SECURE_MESSAGING_BIT;

        let mut mac_data = BytesMut::with_capacity(5 + data_len);
        mac_data.put_u8(secured_cla);
        mac_data.put_u8(command.instruction());
        mac_data.put_u8(command.p1());
        mac_data.put_u8(command.p2());
        mac_data.put_u8((data_len + 8) as u8);
        if let Some(data) = command.data() {
            mac_data.put_slice(data);
        }

        let icv_for_mac = if self.icv == Iv::<Scp02>::default() {
            self.icv
        } else {
            encrypt_icv(&self.session.keys().cmac(), &self.icv)
        };

        let mac = mac_full_3des(&self.session.keys().cmac(), &icv_for_mac, &mac_data);
        self.icv.copy_from_slice(&mac);

        // Data encryption happens after the MAC, which covers plaintext
        let payload = match command.data() {
            Some(data) if encrypting => encrypt_data(&self.session.keys().enc(), data)?,
            Some(data) => data.to_vec(),
            None => Vec::new(),
        };

        let mut new_data = BytesMut::with_capacity(payload.len() + 8);
        new_data.put_slice(&payload);
        new_data.put_slice(&mac);

        let mut wrapped = Command::new_with_data(
            secured_cla,
            command.instruction(),
            command.p1(),
            command.p2(),
            new_data.freeze(),
        );
        if let Some(le) = command.expected_length() {
            wrapped = wrapped.with_le(le);
        }

        Ok(wrapped)
    }

    /// Unwrap a response: verify and strip the R-MAC when negotiated
    pub fn unwrap_response(&mut self, response: Response) -> Result<Response> {
        if !self.level.contains(SecurityLevel::RMAC) {
            return Ok(response);
        }

        let payload = response.payload();
        if payload.len() < 8 {
            return Err(Error::InvalidResponse("response too short for R-MAC"));
        }

        let (data, rmac) = payload.split_at(payload.len() - 8);

        let mut mac_input = BytesMut::with_capacity(data.len() + 2);
        mac_input.put_slice(data);
        mac_input.put_u8(response.status().sw1);
        mac_input.put_u8(response.status().sw2);

        let expected = mac_full_3des(&self.session.keys().rmac(), &self.rmac_icv, &mac_input);
        if expected != rmac {
            return Err(Error::AuthenticationFailed("R-MAC mismatch"));
        }
        self.rmac_icv.copy_from_slice(&expected);

        Ok(Response::new(data.to_vec(), response.status()))
    }

    /// The session this wrapper protects
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Current command chaining vector
    pub const fn icv(&self) -> &Iv<Scp02> {
        &self.icv
    }
}

/// An established SCP02 secure channel
#[derive(Debug, Clone)]
pub struct SecureChannel {
    wrapper: Scp02Wrapper,
    level: SecurityLevel,
}

impl SecureChannel {
    /// Run the SCP02 handshake with a random host challenge
    pub fn open(
        transport: &mut dyn CardTransport,
        keys: &KeySet,
        key_version: u8,
        level: SecurityLevel,
    ) -> Result<Self> {
        let mut host_challenge = HostChallenge::default();
        rand::rng().fill_bytes(&mut host_challenge);
        Self::open_with_challenge(transport, keys, key_version, level, host_challenge)
    }

    /// Run the SCP02 handshake with a caller-provided host challenge
    pub fn open_with_challenge(
        transport: &mut dyn CardTransport,
        keys: &KeySet,
        key_version: u8,
        level: SecurityLevel,
        host_challenge: HostChallenge,
    ) -> Result<Self> {
        debug!(key_version, level = level.p1(), "opening SCP02 secure channel");

        let init_cmd = InitializeUpdateCommand::new(key_version, &host_challenge);
        let raw = transport.transmit_raw(&init_cmd.to_bytes())?;
        let init_response = Response::from_bytes(&raw)?;
        Error::check_status(init_response.status())
            .map_err(|_| Error::AuthenticationFailed("INITIALIZE UPDATE rejected"))?;

        // Session creation verifies the card cryptogram
        let session = Session::new(keys, init_response.payload(), &host_challenge)?;
        trace!(
            key_version = session.key_version(),
            "card cryptogram verified"
        );

        let mut wrapper = Scp02Wrapper::new(session, level);

        let host_cryptogram = wrapper.session().host_cryptogram();
        let auth_cmd = ExternalAuthenticateCommand::new(&host_cryptogram, level);
        let wrapped = wrapper.wrap_command(&auth_cmd)?;

        let raw = transport.transmit_raw(&wrapped.to_bytes())?;
        let auth_response = Response::from_bytes(&raw)?;
        if !auth_response.is_success() {
            if auth_response.status() == status::AUTHENTICATION_METHOD_BLOCKED {
                return Err(Error::AuthenticationFailed("authentication method blocked"));
            }
            return Err(Error::AuthenticationFailed("EXTERNAL AUTHENTICATE rejected"));
        }

        debug!("secure channel established");
        Ok(Self { wrapper, level })
    }

    /// Wrap a command for transmission
    pub fn wrap_command(&mut self, command: &Command) -> Result<Command> {
        self.wrapper.wrap_command(command)
    }

    /// Unwrap a received response
    pub fn unwrap_response(&mut self, response: Response) -> Result<Response> {
        self.wrapper.unwrap_response(response)
    }

    /// Negotiated security level
    pub const fn level(&self) -> SecurityLevel {
        self.level
    }

    /// The authenticated session
    pub const fn session(&self) -> &Session {
        &self.wrapper.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
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
            self.commands.clear();
            Ok(())
        }
    }

    // Captured exchange with the default test keys
    const INIT_RESPONSE: [u8; 30] =
        hex!("000002650183039536622002000de9c62ba1c4c8e55fcb91b6654ce49000");
    const HOST_CHALLENGE: HostChallenge = hex!("f0467f908e5ca23f");

    fn test_session() -> Session {
        Session::new(&KeySet::default_test(), &INIT_RESPONSE[..28], &HOST_CHALLENGE).unwrap()
    }

    #[test]
    fn test_wrap_command_shape() {
        let mut wrapper = Scp02Wrapper::new(test_session(), SecurityLevel::MAC);
        let cmd = Command::new_with_data(0x80, 0x82, 0x01, 0x00, hex!("1d4de92eaf7a2c9f").to_vec());
        let wrapped = wrapper.wrap_command(&cmd).unwrap();

        // CLA gains the secure messaging bit, Lc grows by the MAC length
        let bytes = wrapped.to_bytes();
        assert_eq!(bytes[0], 0x84);
        assert_eq!(bytes[4], 0x10);
        assert_eq!(bytes.len(), 5 + 16);

        // ICV now carries the MAC
        assert_ne!(wrapper.icv(), &Iv::<Scp02>::default());
    }

    #[test]
    fn test_wrap_rejects_oversize_data() {
        let mut wrapper = Scp02Wrapper::new(test_session(), SecurityLevel::MAC);
        let cmd = Command::new_with_data(0x80, 0xE8, 0x00, 0x00, vec![0u8; 250]);
        assert!(wrapper.wrap_command(&cmd).is_err());
    }

    #[test]
    fn test_wrap_encrypts_data_at_enc_level() {
        let session = test_session();
        let data = hex!("0102030405");

        let mut plain_wrapper = Scp02Wrapper::new(session.clone(), SecurityLevel::MAC);
        let mut enc_wrapper =
            Scp02Wrapper::new(session, SecurityLevel::MAC | SecurityLevel::ENC);

        let cmd = Command::new_with_data(0x80, 0xE2, 0x00, 0x00, data.to_vec());

        let plain = plain_wrapper.wrap_command(&cmd).unwrap();
        let encrypted = enc_wrapper.wrap_command(&cmd).unwrap();

        // Plaintext: data + MAC. Encrypted: padded ciphertext + MAC.
        assert_eq!(plain.data().unwrap().len(), 5 + 8);
        assert_eq!(encrypted.data().unwrap().len(), 8 + 8);
        assert_ne!(&encrypted.data().unwrap()[..5], data);
    }

    #[test]
    fn test_wrap_enc_level_respects_short_apdu() {
        let mut wrapper =
            Scp02Wrapper::new(test_session(), SecurityLevel::MAC | SecurityLevel::ENC);

        // 240 bytes pad to 248, overflowing Lc once the MAC is added
        let cmd = Command::new_with_data(0x80, 0xE8, 0x00, 0x00, vec![0u8; 240]);
        assert!(matches!(
            wrapper.wrap_command(&cmd),
            Err(Error::InvalidLength { expected: 239, .. })
        ));

        // 239 bytes pad to 240 and still fit together with the MAC
        let cmd = Command::new_with_data(0x80, 0xE8, 0x00, 0x00, vec![0u8; 239]);
        let wrapped = wrapper.wrap_command(&cmd).unwrap();
        assert_eq!(wrapped.data().unwrap().len(), 248);

        let bytes = wrapped.to_bytes();
        assert_eq!(bytes[4], 248);
        assert_eq!(bytes.len(), 5 + 248);
    }

    #[test]
    fn test_unwrap_verifies_rmac() {
        let session = test_session();
        let mut wrapper = Scp02Wrapper::new(
            session.clone(),
            SecurityLevel::MAC | SecurityLevel::RMAC,
        );

        // Card side: R-MAC over data ‖ SW with the session R-MAC key
        let data = hex!("AABBCC");
        let mut mac_input = data.to_vec();
        mac_input.extend_from_slice(&hex!("9000"));
        let rmac = mac_full_3des(&session.keys().rmac(), &Default::default(), &mac_input);

        let mut payload = data.to_vec();
        payload.extend_from_slice(&rmac);
        let response = Response::success(payload);

        let unwrapped = wrapper.unwrap_response(response).unwrap();
        assert_eq!(unwrapped.payload().as_ref(), data);

        // A tampered R-MAC is rejected
        let mut payload = data.to_vec();
        let mut bad_rmac = rmac;
        bad_rmac[0] ^= 0x01;
        payload.extend_from_slice(&bad_rmac);
        let result = wrapper.unwrap_response(Response::success(payload));
        assert!(matches!(result, Err(Error::AuthenticationFailed(_))));
    }

    #[test]
    fn test_unwrap_passthrough_without_rmac() {
        let mut wrapper = Scp02Wrapper::new(test_session(), SecurityLevel::MAC);
        let response = Response::success(hex!("AABB").to_vec());
        let unwrapped = wrapper.unwrap_response(response.clone()).unwrap();
        assert_eq!(unwrapped, response);
    }

    #[test]
    fn test_open_secure_channel() {
        let mut transport =
            MockTransport::with_responses(&[&INIT_RESPONSE, &hex!("9000")]);

        let channel = SecureChannel::open_with_challenge(
            &mut transport,
            &KeySet::default_test(),
            0,
            SecurityLevel::MAC,
            HOST_CHALLENGE,
        )
        .unwrap();

        assert_eq!(channel.level(), SecurityLevel::MAC);
        assert_eq!(transport.commands.len(), 2);

        // INITIALIZE UPDATE then a MAC-wrapped EXTERNAL AUTHENTICATE
        assert_eq!(transport.commands[0][1], 0x50);
        assert_eq!(transport.commands[1][0], 0x84);
        assert_eq!(transport.commands[1][1], 0x82);
        assert_eq!(transport.commands[1][4], 0x10);
    }

    #[test]
    fn test_open_level_zero_still_macs_handshake() {
        let mut transport =
            MockTransport::with_responses(&[&INIT_RESPONSE, &hex!("9000")]);

        let channel = SecureChannel::open_with_challenge(
            &mut transport,
            &KeySet::default_test(),
            0,
            SecurityLevel::NONE,
            HOST_CHALLENGE,
        )
        .unwrap();

        assert_eq!(channel.level(), SecurityLevel::NONE);
        // EXTERNAL AUTHENTICATE carries P1 0 but still the secure CLA
        assert_eq!(transport.commands[1][0], 0x84);
        assert_eq!(transport.commands[1][2], 0x00);
    }

    #[test]
    fn test_open_rejects_tampered_cryptogram() {
        let mut tampered = INIT_RESPONSE;
        tampered[27] ^= 0xFF;
        let mut transport = MockTransport::with_responses(&[&tampered]);

        let result = SecureChannel::open_with_challenge(
            &mut transport,
            &KeySet::default_test(),
            0,
            SecurityLevel::MAC,
            HOST_CHALLENGE,
        );
        assert!(matches!(result, Err(Error::AuthenticationFailed(_))));
        // Handshake stopped before EXTERNAL AUTHENTICATE
        assert_eq!(transport.commands.len(), 1);
    }

    #[test]
    fn test_open_rejects_card_refusal() {
        let mut transport =
            MockTransport::with_responses(&[&INIT_RESPONSE, &hex!("6982")]);

        let result = SecureChannel::open_with_challenge(
            &mut transport,
            &KeySet::default_test(),
            0,
            SecurityLevel::MAC,
            HOST_CHALLENGE,
        );
        assert!(matches!(result, Err(Error::AuthenticationFailed(_))));
    }

    #[test]
    fn test_open_reports_blocked_authentication() {
        let mut transport =
            MockTransport::with_responses(&[&INIT_RESPONSE, &hex!("6983")]);

        let result = SecureChannel::open_with_challenge(
            &mut transport,
            &KeySet::default_test(),
            0,
            SecurityLevel::MAC,
            HOST_CHALLENGE,
        );
        assert!(matches!(
            result,
            Err(Error::AuthenticationFailed("authentication method blocked"))
        ));
    }
}
