//! The validator secret service.
//!
//! Pure over `(keys, inputs, now)`: any number of replicas set up with the
//! same keys and following the same key ring answer every request
//! identically, without talking to each other.

use core::time::Duration;
use std::sync::{Arc, OnceLock};

use nft_bridge_primitives::{
    ecdsa, messages, Challenge, Commitment, EcdsaSignature, EvmAddress, RequestNonce, TokenId,
};
use tracing::instrument;

use crate::{
    challenge,
    clock::{Clock, SystemClock},
    commitment::{self, KeyIndicator, RequestBinding, Secret},
    error::{Result, ValidatorError},
    keyring::{CommitKeyRing, KeyRingCell, KeyRingWriter},
    keys::{ChallengeKey, CommitKey, IndexEncryptionKey},
};

struct ServiceKeys {
    index_key: IndexEncryptionKey,
    challenge_key: ChallengeKey,
    lifetime: Duration,
    ring: Arc<KeyRingCell>,
    // rotations on this replica go through its `KeyRingWriter`
    writer: bool,
}

pub struct SecretService<C: Clock = SystemClock> {
    keys: Arc<OnceLock<ServiceKeys>>,
    clock: C,
}

impl Default for SecretService<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

// handles to the same replica
impl<C: Clock + Clone> Clone for SecretService<C> {
    fn clone(&self) -> Self {
        Self {
            keys: self.keys.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<C: Clock> core::fmt::Debug for SecretService<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SecretService")
            .field("initialized", &self.keys.get().is_some())
            .field("generation", &self.current_generation().ok())
            .finish()
    }
}

impl<C: Clock> SecretService<C> {
    pub fn new(clock: C) -> Self {
        Self {
            keys: Arc::new(OnceLock::new()),
            clock,
        }
    }

    /// One-time initialization with a fresh ring holding `commit_key` as
    /// generation 0. Returns the only handle allowed to rotate.
    pub fn setup(
        &self,
        commit_key: CommitKey,
        index_key: IndexEncryptionKey,
        challenge_key: ChallengeKey,
        lifetime: Duration,
    ) -> Result<KeyRingWriter> {
        self.resume(CommitKeyRing::new(commit_key), index_key, challenge_key, lifetime)
    }

    /// Like [`SecretService::setup`], starting from a persisted ring.
    pub fn resume(
        &self,
        ring: CommitKeyRing,
        index_key: IndexEncryptionKey,
        challenge_key: ChallengeKey,
        lifetime: Duration,
    ) -> Result<KeyRingWriter> {
        let cell = self.install(ring, index_key, challenge_key, lifetime, true)?;
        Ok(KeyRingWriter::new(cell))
    }

    /// Initialize a read-only replica. It follows rotations via
    /// [`SecretService::observe`] and never holds a writer.
    pub fn join(
        &self,
        ring: CommitKeyRing,
        index_key: IndexEncryptionKey,
        challenge_key: ChallengeKey,
        lifetime: Duration,
    ) -> Result<()> {
        self.install(ring, index_key, challenge_key, lifetime, false).map(drop)
    }

    fn install(
        &self,
        ring: CommitKeyRing,
        index_key: IndexEncryptionKey,
        challenge_key: ChallengeKey,
        lifetime: Duration,
        writer: bool,
    ) -> Result<Arc<KeyRingCell>> {
        // timestamps are whole seconds
        if lifetime.is_zero() || lifetime.subsec_nanos() != 0 {
            return Err(ValidatorError::Config(format!(
                "challenge lifetime must be a positive number of seconds, got {lifetime:?}"
            )));
        }
        let generation = ring.current_index();
        let cell = Arc::new(KeyRingCell::new(ring));
        self.keys
            .set(ServiceKeys {
                index_key,
                challenge_key,
                lifetime,
                ring: cell.clone(),
                writer,
            })
            .map_err(|_| ValidatorError::AlreadyInitialized)?;
        tracing::info!(
            generation,
            lifetime_secs = lifetime.as_secs(),
            writer,
            "secret service set up"
        );
        Ok(cell)
    }

    fn keys(&self) -> Result<&ServiceKeys> {
        self.keys.get().ok_or(ValidatorError::NotInitialized)
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Generation new commitments are made under on this replica.
    pub fn current_generation(&self) -> Result<u32> {
        Ok(self.keys()?.ring.snapshot().current_index())
    }

    /// Adopt a ring broadcast by the writer. Returns the adopted generation.
    ///
    /// Only replicas set up with [`SecretService::join`] follow this way; the
    /// writer's own replica refuses with [`ValidatorError::WriterReplica`].
    pub fn observe(&self, ring: CommitKeyRing) -> Result<u32> {
        let keys = self.keys()?;
        if keys.writer {
            tracing::warn!("writer replica asked to adopt a broadcast key ring");
            return Err(ValidatorError::WriterReplica);
        }
        let generation = keys.ring.adopt(ring).inspect_err(|_| {
            tracing::warn!("rejected key ring that does not extend the local one");
        })?;
        tracing::info!(generation, "key ring adopted");
        Ok(generation)
    }

    pub fn issue_challenge(&self) -> Result<(u64, Challenge)> {
        let keys = self.keys()?;
        let timestamp = self.clock.now();
        Ok((timestamp, challenge::derive(&keys.challenge_key, timestamp)))
    }

    /// Check that `owner` answered the challenge issued at `timestamp` for
    /// this request, and that the challenge is still fresh.
    pub fn verify(
        &self,
        owner: &EvmAddress,
        token_id: &TokenId,
        request_nonce: &RequestNonce,
        timestamp: u64,
        signature: &EcdsaSignature,
    ) -> Result<()> {
        let keys = self.keys()?;
        let now = self.clock.now();
        challenge::ensure_fresh(timestamp, now, keys.lifetime).inspect_err(|_| {
            tracing::debug!(timestamp, now, "stale challenge");
        })?;

        let challenge = challenge::derive(&keys.challenge_key, timestamp);
        let digest =
            messages::challenge_response_digest(token_id, request_nonce, timestamp, &challenge);
        if !ecdsa::verify(owner, &digest, signature) {
            tracing::debug!(?owner, %token_id, "challenge response signature rejected");
            return Err(ValidatorError::InvalidSignature);
        }
        Ok(())
    }

    /// Authenticate the owner, then commit to a secret under the current
    /// generation. The commitment is deterministic for a given request and
    /// generation; the indicator is not.
    #[instrument(skip_all, fields(%token_id, generation = tracing::field::Empty))]
    pub fn commit(
        &self,
        owner: &EvmAddress,
        token_id: &TokenId,
        request_nonce: &RequestNonce,
        timestamp: u64,
        signature: &EcdsaSignature,
    ) -> Result<(Commitment, KeyIndicator)> {
        self.verify(owner, token_id, request_nonce, timestamp, signature)?;
        let keys = self.keys()?;
        let ring = keys.ring.snapshot();
        let (generation, key) = ring.current();
        tracing::Span::current().record("generation", generation);

        let request = RequestBinding {
            owner,
            token_id,
            request_nonce,
        };
        let secret = commitment::derive_secret(key, &request);
        let indicator = commitment::seal_index(&keys.index_key, generation, &request)?;
        tracing::debug!("commitment issued");
        Ok((commitment::commitment_of(&secret), indicator))
    }

    /// Recover the secret behind a commitment. Performs no authentication;
    /// see [`SecretService::authenticated_reveal`].
    #[instrument(skip_all, fields(%token_id))]
    pub fn reveal(
        &self,
        owner: &EvmAddress,
        token_id: &TokenId,
        request_nonce: &RequestNonce,
        key_indicator: &KeyIndicator,
    ) -> Result<Secret> {
        let keys = self.keys()?;
        let request = RequestBinding {
            owner,
            token_id,
            request_nonce,
        };
        let index = commitment::open_index(&keys.index_key, key_indicator, &request)
            .inspect_err(|_| tracing::debug!("key indicator did not open"))?;
        let ring = keys.ring.snapshot();
        let key = ring.get(index)?;
        Ok(commitment::derive_secret(key, &request))
    }

    /// [`SecretService::verify`] for the same request, then
    /// [`SecretService::reveal`].
    pub fn authenticated_reveal(
        &self,
        owner: &EvmAddress,
        token_id: &TokenId,
        request_nonce: &RequestNonce,
        key_indicator: &KeyIndicator,
        timestamp: u64,
        signature: &EcdsaSignature,
    ) -> Result<Secret> {
        self.verify(owner, token_id, request_nonce, timestamp, signature)?;
        self.reveal(owner, token_id, request_nonce, key_indicator)
    }
}
