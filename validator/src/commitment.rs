//! Secret derivation and key indicators.
//!
//! ```text
//! secret     = HMAC-SHA256(commit_key[i], owner(20) || token_id(32) || request_nonce(32))
//! commitment = keccak256(secret)
//! indicator  = nonce(12) || AES-256-GCM(index_key, nonce, u32_be(i), aad = same 84 bytes)
//! ```
//!
//! The indicator only tells a replica *which* generation to use; without the
//! matching request triple it neither opens nor reveals anything.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce,
};
use hmac::Mac;
use nft_bridge_primitives::{
    keccak_256, token_id_bytes, Commitment, EvmAddress, RequestNonce, TokenId,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{
    error::{Result, ValidatorError},
    keys::{hex_array, hmac_sha256, CommitKey, IndexEncryptionKey},
};

const NONCE_LEN: usize = 12;
pub const KEY_INDICATOR_LEN: usize = NONCE_LEN + 4 + 16;

/// The value revealed to the requester; its keccak hash is the on-chain
/// commitment. Wiped when dropped.
pub type Secret = Zeroizing<[u8; 32]>;

/// Identifies one burn request; bound into both the secret and the indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestBinding<'a> {
    pub owner: &'a EvmAddress,
    pub token_id: &'a TokenId,
    pub request_nonce: &'a RequestNonce,
}

impl RequestBinding<'_> {
    fn encode(&self) -> [u8; 84] {
        let mut out = [0u8; 84];
        out[..20].copy_from_slice(self.owner.as_bytes());
        out[20..52].copy_from_slice(&token_id_bytes(self.token_id));
        out[52..].copy_from_slice(self.request_nonce);
        out
    }
}

/// Encrypted generation index handed back with a commitment.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyIndicator(#[serde(with = "hex_array")] [u8; KEY_INDICATOR_LEN]);

impl KeyIndicator {
    pub fn from_bytes(bytes: [u8; KEY_INDICATOR_LEN]) -> Self {
        Self(bytes)
    }

    /// Fails with [`ValidatorError::Decryption`] on the wrong length, the same
    /// way a corrupted indicator fails to open.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        bytes
            .try_into()
            .map(Self)
            .map_err(|_| ValidatorError::Decryption)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_INDICATOR_LEN] {
        &self.0
    }
}

impl core::fmt::Debug for KeyIndicator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "KeyIndicator(0x{})", hex::encode(self.0))
    }
}

pub(crate) fn derive_secret(key: &CommitKey, request: &RequestBinding<'_>) -> Secret {
    let mut mac = hmac_sha256(key.as_bytes());
    mac.update(&request.encode());
    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

pub fn commitment_of(secret: &Secret) -> Commitment {
    keccak_256(&secret[..])
}

fn cipher(key: &IndexEncryptionKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}

pub(crate) fn seal_index(
    key: &IndexEncryptionKey,
    index: u32,
    request: &RequestBinding<'_>,
) -> Result<KeyIndicator> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let aad = request.encode();
    let ct = cipher(key)
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: &index.to_be_bytes(),
                aad: &aad,
            },
        )
        .map_err(|_| ValidatorError::Encryption)?;

    let mut out = [0u8; KEY_INDICATOR_LEN];
    out[..NONCE_LEN].copy_from_slice(&nonce);
    if ct.len() != KEY_INDICATOR_LEN - NONCE_LEN {
        return Err(ValidatorError::Encryption);
    }
    out[NONCE_LEN..].copy_from_slice(&ct);
    Ok(KeyIndicator(out))
}

pub(crate) fn open_index(
    key: &IndexEncryptionKey,
    indicator: &KeyIndicator,
    request: &RequestBinding<'_>,
) -> Result<u32> {
    let (nonce, ct) = indicator.0.split_at(NONCE_LEN);
    let aad = request.encode();
    let plain = cipher(key)
        .decrypt(Nonce::from_slice(nonce), Payload { msg: ct, aad: &aad })
        .map_err(|_| ValidatorError::Decryption)?;
    let index: [u8; 4] = plain
        .as_slice()
        .try_into()
        .map_err(|_| ValidatorError::Decryption)?;
    Ok(u32::from_be_bytes(index))
}
