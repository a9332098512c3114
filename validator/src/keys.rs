//! Key material held by a validator replica.

use core::fmt;

use hmac::{
    digest::{Key, KeyInit},
    Hmac,
};
use k256::ecdsa::{RecoveryId, SigningKey};
use nft_bridge_primitives::{ecdsa, EcdsaSignature, EvmAddress};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Result, ValidatorError};

/// Hex (de)serialization for fixed-size byte arrays, `0x` prefix optional.
pub(crate) mod hex_array {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use zeroize::Zeroizing;

    pub fn serialize<S, const N: usize>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        decode(&s).map_err(de::Error::custom)
    }

    pub fn decode<const N: usize>(s: &str) -> Result<[u8; N], String> {
        let raw = Zeroizing::new(
            hex::decode(s.trim_start_matches("0x")).map_err(|e| e.to_string())?,
        );
        if raw.len() != N {
            return Err(format!("expected {} bytes, got {}", N, raw.len()));
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&raw);
        Ok(out)
    }
}

macro_rules! symmetric_key {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
        #[serde(transparent)]
        pub struct $name(#[serde(with = "hex_array")] [u8; 32]);

        impl $name {
            pub fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn from_hex(s: &str) -> Result<Self> {
                hex_array::decode(s)
                    .map(Self)
                    .map_err(|e| ValidatorError::Config(format!("{}: {e}", stringify!($name))))
            }

            pub fn random(rng: &mut (impl CryptoRng + RngCore)) -> Self {
                let mut bytes = [0u8; 32];
                rng.fill_bytes(&mut bytes);
                Self(bytes)
            }

            pub(crate) fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }
        }

        // never print key bytes
        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($name), "(..)"))
            }
        }
    };
}

symmetric_key!(
    /// One generation of the commit key ring; PRF key for secrets.
    CommitKey
);
symmetric_key!(
    /// AES-256-GCM key sealing the generation index into key indicators.
    IndexEncryptionKey
);
symmetric_key!(
    /// HMAC key challenges are derived from.
    ChallengeKey
);

/// HMAC-SHA256 keyed by a 32-byte key.
///
/// The key is zero-padded to the SHA-256 block size, which is how HMAC treats
/// any key shorter than a block, so the output equals the variable-length form.
pub(crate) fn hmac_sha256(key: &[u8; 32]) -> Hmac<Sha256> {
    let mut block = Key::<Hmac<Sha256>>::default();
    block[..key.len()].copy_from_slice(key);
    let mac = <Hmac<Sha256> as KeyInit>::new(&block);
    block.as_mut_slice().zeroize();
    mac
}

/// secp256k1 signing key producing bridge-compatible signatures.
#[derive(Clone)]
pub struct EcdsaKey(SigningKey);

impl EcdsaKey {
    pub fn random(rng: &mut (impl CryptoRng + RngCore)) -> Self {
        Self(SigningKey::random(rng))
    }

    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self> {
        SigningKey::from_slice(secret)
            .map(Self)
            .map_err(|_| ValidatorError::Config("invalid secp256k1 secret key".into()))
    }

    pub fn address(&self) -> EvmAddress {
        let point = self.0.verifying_key().to_encoded_point(false);
        let mut public = [0u8; 64];
        // skip the 0x04 tag
        public.copy_from_slice(&point.as_bytes()[1..]);
        ecdsa::address_from_public(&public)
    }

    /// Sign a message digest from [`nft_bridge_primitives::messages`].
    ///
    /// The output always has a low `s` and `v ∈ {0, 1}`.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<EcdsaSignature> {
        let hash = ecdsa::eth_message_hash(digest);
        let (sig, recid) = self
            .0
            .sign_prehash_recoverable(&hash)
            .map_err(|_| ValidatorError::Signing)?;
        let (sig, recid) = match sig.normalize_s() {
            Some(low) => (low, RecoveryId::new(!recid.is_y_odd(), recid.is_x_reduced())),
            None => (sig, recid),
        };
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&sig.to_bytes());
        out[64] = recid.to_byte();
        Ok(out)
    }
}

// `SigningKey` wipes its scalar on drop.
impl ZeroizeOnDrop for EcdsaKey {}

impl fmt::Debug for EcdsaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EcdsaKey").field(&self.address()).finish()
    }
}

#[cfg(test)]
mod tests {
    use hmac::Mac;

    use super::*;

    fn wiped_on_drop<T: ZeroizeOnDrop>() {}

    #[test]
    fn key_material_is_wiped() {
        wiped_on_drop::<CommitKey>();
        wiped_on_drop::<IndexEncryptionKey>();
        wiped_on_drop::<ChallengeKey>();
        wiped_on_drop::<EcdsaKey>();
        wiped_on_drop::<crate::Secret>();

        let mut key = CommitKey::from_bytes([7; 32]);
        key.zeroize();
        assert_eq!(key.as_bytes(), &[0; 32]);
    }

    #[test]
    fn padded_hmac_key_matches_the_variable_length_form() {
        let key = [0x42; 32];
        let mut padded = hmac_sha256(&key);
        let mut sliced = <Hmac<Sha256> as Mac>::new_from_slice(&key).unwrap();
        padded.update(b"message");
        sliced.update(b"message");
        assert_eq!(padded.finalize().into_bytes(), sliced.finalize().into_bytes());
    }

    #[test]
    fn hex_keys_accept_an_optional_prefix_and_check_length() {
        let hex = "07".repeat(32);
        assert_eq!(CommitKey::from_hex(&hex), Ok(CommitKey::from_bytes([7; 32])));
        assert_eq!(CommitKey::from_hex(&format!("0x{hex}")), Ok(CommitKey::from_bytes([7; 32])));
        assert!(matches!(CommitKey::from_hex("0707"), Err(ValidatorError::Config(_))));
    }
}
