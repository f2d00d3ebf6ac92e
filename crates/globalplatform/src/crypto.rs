//! Cryptographic primitives for the SCP02 secure channel
//!
//! Session key derivation, card/host cryptogram calculation, the SCP02
//! retail MAC (single DES for all blocks but the last, 3DES for the last),
//! ICV encryption and command data encryption.

use cbc_mac::{CbcMac, Mac};
use cipher::{
    BlockEncrypt, BlockEncryptMut, Iv, IvSizeUser, Key, KeyInit, KeyIvInit, KeySizeUser,
    block_padding::{Iso7816, RawPadding},
    consts::{U8, U16},
    generic_array::GenericArray,
};
use des::{Des, TdesEde3};

use crate::Result;
use crate::constants::CHALLENGE_LENGTH;
use crate::error::Error;

/// Two-byte derivation constant selecting a session key purpose
pub type DerivationPurpose = [u8; 2];
/// Sequence counter from the INITIALIZE UPDATE response
pub type SequenceCounter = [u8; 2];
/// Card challenge from the INITIALIZE UPDATE response
pub type CardChallenge = [u8; 6];
/// Host challenge generated for INITIALIZE UPDATE
pub type HostChallenge = [u8; CHALLENGE_LENGTH];
/// Card or host cryptogram
pub type Cryptogram = [u8; 8];
/// SCP02 retail MAC
pub type Scp02Mac = [u8; 8];

/// Derivation constant for the session encryption key
pub const DERIVATION_ENC: DerivationPurpose = [0x01, 0x82];
/// Derivation constant for the session C-MAC key
pub const DERIVATION_CMAC: DerivationPurpose = [0x01, 0x01];
/// Derivation constant for the session R-MAC key
pub const DERIVATION_RMAC: DerivationPurpose = [0x01, 0x02];
/// Derivation constant for the session data encryption key
pub const DERIVATION_DEK: DerivationPurpose = [0x01, 0x81];

/// Marker type fixing SCP02 key and IV sizes
#[allow(missing_debug_implementations)]
pub struct Scp02;

impl KeySizeUser for Scp02 {
    type KeySize = U16;
}

impl IvSizeUser for Scp02 {
    type IvSize = U8;
}

/// Derive an SCP02 session key from a static card key
///
/// Encrypts the two-byte derivation constant followed by the two-byte
/// sequence counter (zero-padded to two blocks) with 3DES in CBC mode
/// under the static key.
pub fn derive_session_key(
    card_key: &Key<Scp02>,
    seq: &SequenceCounter,
    purpose: &DerivationPurpose,
) -> Result<Key<Scp02>> {
    let mut blocks = [GenericArray::default(), GenericArray::default()];
    blocks[0][0..2].copy_from_slice(purpose);
    blocks[0][2..4].copy_from_slice(seq);

    let key = resize_key(card_key);
    let iv = GenericArray::default();

    let mut encryptor = cbc::Encryptor::<TdesEde3>::new(&key, &iv);
    encryptor.encrypt_blocks_mut(&mut blocks);

    let mut result = Key::<Scp02>::default();
    result[0..8].copy_from_slice(blocks[0].as_slice());
    result[8..16].copy_from_slice(blocks[1].as_slice());

    Ok(result)
}

/// Calculate a card or host cryptogram
///
/// The cryptogram is the last block of a 3DES-CBC encryption over the
/// challenge material. The card cryptogram hashes host challenge first,
/// the host cryptogram hashes sequence counter and card challenge first.
pub fn calculate_cryptogram(
    enc_key: &Key<Scp02>,
    sequence_counter: &SequenceCounter,
    card_challenge: &CardChallenge,
    host_challenge: &HostChallenge,
    for_host: bool,
) -> Cryptogram {
    let mut blocks = [GenericArray::default(); 3];

    if for_host {
        blocks[0][0..2].copy_from_slice(sequence_counter);
        blocks[0][2..8].copy_from_slice(card_challenge);
        blocks[1][0..8].copy_from_slice(host_challenge);
    } else {
        blocks[0][0..8].copy_from_slice(host_challenge);
        blocks[1][0..2].copy_from_slice(sequence_counter);
        blocks[1][2..8].copy_from_slice(card_challenge);
    }

    Iso7816::raw_pad(&mut blocks[2], 0);
    let mut cipher = cbc::Encryptor::<TdesEde3>::new(&resize_key(enc_key), &Default::default());

    cipher.encrypt_blocks_mut(&mut blocks);
    blocks[blocks.len() - 1].into()
}

/// Calculate the SCP02 retail MAC
///
/// All blocks except the last are encrypted with single DES using the
/// first half of the key; the last block uses full 3DES. Input is ISO 7816
/// padded first, so the MAC always covers at least one padding byte.
pub fn mac_full_3des(key: &Key<Scp02>, iv: &Iv<Scp02>, data: &[u8]) -> Scp02Mac {
    let padded_len = data.len() + 8 - (data.len() % 8);
    let mut padded = vec![0u8; padded_len];
    padded[..data.len()].copy_from_slice(data);
    Iso7816::raw_pad(&mut padded, data.len());

    let des_cipher = Des::new(GenericArray::from_slice(&key[..8]));
    let des3_cipher = TdesEde3::new(&resize_key(key));

    let mut current_iv = Iv::<Scp02>::default();
    current_iv.copy_from_slice(iv.as_slice());

    // Single DES for everything up to the final block
    if padded_len > 8 {
        for chunk in padded[..padded_len - 8].chunks(8) {
            let mut block = GenericArray::default();
            block.copy_from_slice(chunk);

            for (a, b) in block.iter_mut().zip(current_iv.iter()) {
                *a ^= *b;
            }

            des_cipher.encrypt_block(&mut block);
            current_iv.copy_from_slice(&block);
        }
    }

    let mut last_block = GenericArray::default();
    last_block.copy_from_slice(&padded[padded_len - 8..]);

    for (a, b) in last_block.iter_mut().zip(current_iv.iter()) {
        *a ^= *b;
    }

    des3_cipher.encrypt_block(&mut last_block);
    last_block.into()
}

/// Encrypt the chaining vector with single DES under the MAC key
///
/// SCP02 encrypts the previous MAC before using it as ICV for every
/// command after the first.
pub fn encrypt_icv(mac_key: &Key<Scp02>, icv: &Iv<Scp02>) -> Iv<Scp02> {
    let mut mac = <CbcMac<Des> as Mac>::new(GenericArray::from_slice(&mac_key[..8]));
    mac.update(icv.as_slice());
    mac.finalize().into_bytes()
}

/// Encrypt command data for the C-DECRYPTION security level
///
/// ISO 7816 pads the data and encrypts it with 3DES in CBC mode under the
/// session encryption key, with a zero ICV.
pub fn encrypt_data(enc_key: &Key<Scp02>, data: &[u8]) -> Result<Vec<u8>> {
    let padded_len = data.len() + 8 - (data.len() % 8);
    if padded_len > 255 {
        return Err(Error::InvalidLength {
            expected: 255,
            actual: padded_len,
        });
    }

    let mut padded = vec![0u8; padded_len];
    padded[..data.len()].copy_from_slice(data);
    Iso7816::raw_pad(&mut padded, data.len());

    let mut encryptor =
        cbc::Encryptor::<TdesEde3>::new(&resize_key(enc_key), &GenericArray::default());
    let mut blocks: Vec<GenericArray<u8, U8>> = padded
        .chunks(8)
        .map(GenericArray::clone_from_slice)
        .collect();
    encryptor.encrypt_blocks_mut(&mut blocks);

    Ok(blocks.iter().flat_map(|b| b.iter().copied()).collect())
}

/// Expand a 16-byte SCP02 key to the 24-byte 3DES form (K1 ‖ K2 ‖ K1)
pub fn resize_key(key: &Key<Scp02>) -> Key<TdesEde3> {
    let mut result = Key::<TdesEde3>::default();
    result[..16].copy_from_slice(key);
    result[16..24].copy_from_slice(&key[..8]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_derive_session_key() {
        let card_key = hex!("404142434445464748494a4b4c4d4e4f");
        let seq = hex!("0065");

        let enc_key = derive_session_key(
            &Key::<Scp02>::clone_from_slice(&card_key),
            &seq,
            &DERIVATION_ENC,
        )
        .unwrap();

        assert_eq!(enc_key.as_slice(), hex!("85e72aaf47874218a202bf5ef891dd21"));
    }

    #[test]
    fn test_resize_key() {
        let key = hex!("404142434445464748494a4b4c4d4e4f");
        let resized = resize_key(&Key::<Scp02>::clone_from_slice(&key));

        assert_eq!(
            resized.as_slice(),
            hex!("404142434445464748494a4b4c4d4e4f4041424344454647")
        );
    }

    #[test]
    fn test_card_cryptogram() {
        let enc_key = hex!("16b5867ff50be7239c2bf1245b83a362");
        let enc_key = Key::<Scp02>::clone_from_slice(&enc_key);
        let host_challenge = hex!("32da078d7aac1cff");
        let sequence_counter = hex!("0072");
        let card_challenge = hex!("84f64a7d6465");
        let card_cryptogram = hex!("05c4bb8a86014e22");

        let result = calculate_cryptogram(
            &enc_key,
            &sequence_counter,
            &card_challenge,
            &host_challenge,
            false,
        );
        assert_eq!(result, card_cryptogram);
    }

    #[test]
    fn test_mac_full_3des() {
        let key = hex!("5b02e75ad63190aece0622936f11abab");
        let key = Key::<Scp02>::clone_from_slice(&key);
        let data = hex!("8482010010810b098a8fbb88da");
        let result = mac_full_3des(&key, &Default::default(), &data);

        assert_eq!(result, hex!("5271d7174a5a166a"));
    }

    #[test]
    fn test_encrypt_data_pads_to_block() {
        let key = Key::<Scp02>::clone_from_slice(&hex!("404142434445464748494a4b4c4d4e4f"));

        // 5 bytes of input pad to a single 8-byte block
        let out = encrypt_data(&key, &hex!("0102030405")).unwrap();
        assert_eq!(out.len(), 8);

        // 8 bytes of input gain a full padding block
        let out = encrypt_data(&key, &hex!("0102030405060708")).unwrap();
        assert_eq!(out.len(), 16);
    }

    #[test]
    fn test_encrypt_data_rejects_oversize() {
        let key = Key::<Scp02>::clone_from_slice(&hex!("404142434445464748494a4b4c4d4e4f"));
        assert!(encrypt_data(&key, &[0u8; 250]).is_err());
    }
}
