//! Stateless challenges: `challenge = HMAC(challenge_key, label || u64_be(ts))`.
//!
//! Nothing is cached. A replica re-derives the challenge from the timestamp the
//! requester echoes back, so any replica holding the challenge key can verify a
//! challenge issued by any other.

use core::time::Duration;

use hmac::Mac;
use nft_bridge_primitives::Challenge;

use crate::{
    error::{Result, ValidatorError},
    keys::{hmac_sha256, ChallengeKey},
};

const CHALLENGE_LABEL: &[u8] = b"nft-bridge/challenge/v1";

pub(crate) fn derive(key: &ChallengeKey, timestamp: u64) -> Challenge {
    let mut mac = hmac_sha256(key.as_bytes());
    mac.update(CHALLENGE_LABEL);
    mac.update(&timestamp.to_be_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// Accept iff `timestamp <= now < timestamp + lifetime`. `lifetime` is whole
/// seconds; the service refuses to set up with anything else.
pub(crate) fn ensure_fresh(timestamp: u64, now: u64, lifetime: Duration) -> Result<()> {
    let expires = timestamp.saturating_add(lifetime.as_secs());
    if timestamp <= now && now < expires {
        Ok(())
    } else {
        Err(ValidatorError::StaleChallenge { timestamp, now })
    }
}
