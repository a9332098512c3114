//! JSON configuration of a validator replica.
//!
//! ```json
//! {
//!   "domain": {
//!     "from_token": "0x..", "from_bridge": "0x..",
//!     "to_token": "0x..", "to_bridge": "0x.."
//!   },
//!   "signing_key": "<32 bytes hex>",
//!   "key_ring": ["<32 bytes hex>", ".."],
//!   "index_key": "<32 bytes hex>",
//!   "challenge_key": "<32 bytes hex>",
//!   "challenge_lifetime_secs": 300,
//!   "key_ring_writer": true
//! }
//! ```

use core::time::Duration;

use nft_bridge_primitives::BridgeDomain;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::{
    clock::Clock,
    error::{Result, ValidatorError},
    keyring::{CommitKeyRing, KeyRingWriter},
    keys::{hex_array, ChallengeKey, EcdsaKey, IndexEncryptionKey},
    service::SecretService,
    validator::Validator,
};

#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorConfig {
    pub domain: BridgeDomain,
    #[serde(with = "hex_array")]
    pub signing_key: [u8; 32],
    /// Persisted commit keys, oldest first.
    pub key_ring: CommitKeyRing,
    pub index_key: IndexEncryptionKey,
    pub challenge_key: ChallengeKey,
    pub challenge_lifetime_secs: u64,
    /// Whether this replica is the single operator allowed to rotate.
    #[serde(default)]
    pub key_ring_writer: bool,
}

impl core::fmt::Debug for ValidatorConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ValidatorConfig")
            .field("domain", &self.domain)
            .field("generations", &self.key_ring.generations())
            .field("challenge_lifetime_secs", &self.challenge_lifetime_secs)
            .field("key_ring_writer", &self.key_ring_writer)
            .finish_non_exhaustive()
    }
}

impl ValidatorConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ValidatorError::Config(e.to_string()))?;
        if config.challenge_lifetime_secs == 0 {
            return Err(ValidatorError::Config(
                "challenge_lifetime_secs must be positive".into(),
            ));
        }
        Ok(config)
    }

    /// Set up a replica. The writer is returned only when `key_ring_writer`
    /// is set.
    pub fn build<C: Clock>(mut self, clock: C) -> Result<(Validator<C>, Option<KeyRingWriter>)> {
        let signer = EcdsaKey::from_bytes(&self.signing_key);
        self.signing_key.zeroize();
        let signer = signer?;
        let lifetime = Duration::from_secs(self.challenge_lifetime_secs);
        let service = SecretService::new(clock);
        let writer = if self.key_ring_writer {
            Some(service.resume(self.key_ring, self.index_key, self.challenge_key, lifetime)?)
        } else {
            service.join(self.key_ring, self.index_key, self.challenge_key, lifetime)?;
            None
        };
        Ok((Validator::new(service, signer, self.domain), writer))
    }
}
