//! Static card key sets and key diversification
//!
//! A [`KeySet`] holds the three static 16-byte card keys (ENC, MAC, DEK)
//! that session keys are derived from during the SCP02 handshake. Key
//! material is wiped on drop.

use cipher::Key;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::Result;
use crate::constants::DEFAULT_KEY;
use crate::crypto::Scp02;
use crate::error::Error;

/// Method used to diversify static keys from a master key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationMethod {
    /// No diversification: the master key is used directly
    None,
    /// VISA 1 diversification
    Visa1,
    /// VISA 2 diversification
    Visa2,
    /// EMV CPS 1.1 diversification
    EmvCps11,
}

/// Static card keys: encryption, MAC and data encryption
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeySet {
    enc: [u8; 16],
    mac: [u8; 16],
    dek: [u8; 16],
}

impl std::fmt::Debug for KeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material
        f.debug_struct("KeySet").finish_non_exhaustive()
    }
}

impl KeySet {
    /// Create a key set with three distinct keys
    pub const fn new(enc: [u8; 16], mac: [u8; 16], dek: [u8; 16]) -> Self {
        Self { enc, mac, dek }
    }

    /// Create a key set where all three keys equal one static key
    pub const fn plain(key: [u8; 16]) -> Self {
        Self {
            enc: key,
            mac: key,
            dek: key,
        }
    }

    /// The well-known default test key set (404142...4F for all keys)
    pub const fn default_test() -> Self {
        Self::plain(DEFAULT_KEY)
    }

    /// Derive a card key set from a master key and the card's key
    /// diversification data
    ///
    /// Only [`DerivationMethod::None`] is implemented; the VISA and EMV
    /// schemes fail explicitly rather than silently falling back to the
    /// master key.
    pub fn diversified(
        method: DerivationMethod,
        master: [u8; 16],
        _key_div_data: &[u8],
    ) -> Result<Self> {
        match method {
            DerivationMethod::None => Ok(Self::plain(master)),
            DerivationMethod::Visa1 => Err(Error::UnsupportedDerivationMethod("visa1")),
            DerivationMethod::Visa2 => Err(Error::UnsupportedDerivationMethod("visa2")),
            DerivationMethod::EmvCps11 => Err(Error::UnsupportedDerivationMethod("emvcps11")),
        }
    }

    /// Static encryption key
    pub fn enc(&self) -> Key<Scp02> {
        Key::<Scp02>::clone_from_slice(&self.enc)
    }

    /// Static MAC key
    pub fn mac(&self) -> Key<Scp02> {
        Key::<Scp02>::clone_from_slice(&self.mac)
    }

    /// Static data encryption key
    pub fn dek(&self) -> Key<Scp02> {
        Key::<Scp02>::clone_from_slice(&self.dek)
    }
}
