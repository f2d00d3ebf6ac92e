//! SCP02 session state
//!
//! A [`Session`] is created from the INITIALIZE UPDATE response. It derives
//! the session keys, verifies the card cryptogram, and holds the challenge
//! material needed to compute the host cryptogram. A session only exists if
//! the card authenticated successfully.

use cipher::Key;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::scp;
use crate::crypto::{
    CardChallenge, Cryptogram, DERIVATION_CMAC, DERIVATION_DEK, DERIVATION_ENC, DERIVATION_RMAC,
    HostChallenge, Scp02, SequenceCounter, calculate_cryptogram, derive_session_key,
};
use crate::error::{Error, Result};
use crate::keys::KeySet;

/// Session keys derived for one SCP02 session
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKeys {
    enc: [u8; 16],
    cmac: [u8; 16],
    rmac: [u8; 16],
    dek: [u8; 16],
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys").finish_non_exhaustive()
    }
}

impl SessionKeys {
    /// Session encryption key
    pub fn enc(&self) -> Key<Scp02> {
        Key::<Scp02>::clone_from_slice(&self.enc)
    }

    /// Session C-MAC key
    pub fn cmac(&self) -> Key<Scp02> {
        Key::<Scp02>::clone_from_slice(&self.cmac)
    }

    /// Session R-MAC key
    pub fn rmac(&self) -> Key<Scp02> {
        Key::<Scp02>::clone_from_slice(&self.rmac)
    }

    /// Session data encryption key
    pub fn dek(&self) -> Key<Scp02> {
        Key::<Scp02>::clone_from_slice(&self.dek)
    }
}

/// State of an authenticated SCP02 session
#[derive(Debug, Clone)]
pub struct Session {
    keys: SessionKeys,
    card_challenge: CardChallenge,
    host_challenge: HostChallenge,
    sequence_counter: SequenceCounter,
    key_version: u8,
}

impl Session {
    /// Create a session from an INITIALIZE UPDATE response
    ///
    /// Parses the 28-byte response payload (key diversification data, key
    /// information, sequence counter, card challenge, card cryptogram),
    /// derives the session keys and verifies the card cryptogram. Any
    /// mismatch fails with [`Error::AuthenticationFailed`] and no session
    /// state survives.
    pub fn new(
        card_keys: &KeySet,
        init_response: &[u8],
        host_challenge: &HostChallenge,
    ) -> Result<Self> {
        if init_response.len() < 28 {
            return Err(Error::InvalidLength {
                expected: 28,
                actual: init_response.len(),
            });
        }

        // Key information: version number, then the SCP version
        let key_version = init_response[10];
        let scp_version = init_response[11];
        if scp_version != scp::SCP02 {
            return Err(Error::UnsupportedScpVersion(scp_version));
        }

        let mut sequence_counter = SequenceCounter::default();
        sequence_counter.copy_from_slice(&init_response[12..14]);

        let mut card_challenge = CardChallenge::default();
        card_challenge.copy_from_slice(&init_response[14..20]);

        let card_cryptogram = &init_response[20..28];

        let enc = derive_session_key(&card_keys.enc(), &sequence_counter, &DERIVATION_ENC)?;
        let cmac = derive_session_key(&card_keys.mac(), &sequence_counter, &DERIVATION_CMAC)?;
        let rmac = derive_session_key(&card_keys.mac(), &sequence_counter, &DERIVATION_RMAC)?;
        let dek = derive_session_key(&card_keys.dek(), &sequence_counter, &DERIVATION_DEK)?;

        let expected = calculate_cryptogram(
            &enc,
            &sequence_counter,
            &card_challenge,
            host_challenge,
            false,
        );
        if expected != card_cryptogram {
            return Err(Error::AuthenticationFailed("card cryptogram mismatch"));
        }

        let mut keys = SessionKeys {
            enc: [0; 16],
            cmac: [0; 16],
            rmac: [0; 16],
            dek: [0; 16],
        };
        keys.enc.copy_from_slice(&enc);
        keys.cmac.copy_from_slice(&cmac);
        keys.rmac.copy_from_slice(&rmac);
        keys.dek.copy_from_slice(&dek);

        Ok(Self {
            keys,
            card_challenge,
            host_challenge: *host_challenge,
            sequence_counter,
            key_version,
        })
    }

    /// Compute the host cryptogram for EXTERNAL AUTHENTICATE
    pub fn host_cryptogram(&self) -> Cryptogram {
        calculate_cryptogram(
            &self.keys.enc(),
            &self.sequence_counter,
            &self.card_challenge,
            &self.host_challenge,
            true,
        )
    }

    /// Derived session keys
    pub const fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    /// Card challenge from INITIALIZE UPDATE
    pub const fn card_challenge(&self) -> &CardChallenge {
        &self.card_challenge
    }

    /// Host challenge sent with INITIALIZE UPDATE
    pub const fn host_challenge(&self) -> &HostChallenge {
        &self.host_challenge
    }

    /// Sequence counter reported by the card
    pub const fn sequence_counter(&self) -> &SequenceCounter {
        &self.sequence_counter
    }

    /// Key version number reported by the card
    pub const fn key_version(&self) -> u8 {
        self.key_version
    }
}
