//! Digests signed by token owners and by the validator.
//!
//! Each message is `keccak256(tag || version || fields..)` where `tag` is the
//! keccak hash of the message name and every field has a fixed width:
//!
//! ```text
//! RequestTokenBurn:   tag(32) v(1) from_token(20) from_bridge(20) to_token(20) to_bridge(20)
//!                     owner(20) token_id(32)
//! Commit:             tag(32) v(1) from_token(20) from_bridge(20) to_token(20) to_bridge(20)
//!                     owner(20) token_id(32) keccak(token_uri)(32) commitment(32) timestamp(8)
//! ChallengeResponse:  tag(32) v(1) token_id(32) request_nonce(32) timestamp(8) challenge(32)
//! ```
//!
//! Integers are big-endian. Variable-length inputs (only the token URI) are
//! hashed before inclusion so no two field assignments share an encoding.

use sp_std::prelude::*;

use crate::{
    keccak_256, token_id_bytes, BridgeDomain, Challenge, Commitment, EvmAddress, RequestNonce,
    TokenId,
};

/// Layout version mixed into every digest.
pub const MESSAGE_VERSION: u8 = 1;

pub const BURN_REQUEST_TAG: &[u8] = b"RequestTokenBurn";
pub const COMMIT_TAG: &[u8] = b"Commit";
pub const CHALLENGE_RESPONSE_TAG: &[u8] = b"ChallengeResponse";

/// Accumulates fixed-width fields of one message.
pub struct MessageBuilder {
    buf: Vec<u8>,
}

impl MessageBuilder {
    pub fn new(tag: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(256);
        buf.extend_from_slice(&keccak_256(tag));
        buf.push(MESSAGE_VERSION);
        Self { buf }
    }

    pub fn with_address(mut self, address: &EvmAddress) -> Self {
        self.buf.extend_from_slice(address.as_bytes());
        self
    }

    pub fn with_domain(self, domain: &BridgeDomain) -> Self {
        self.with_address(&domain.from_token)
            .with_address(&domain.from_bridge)
            .with_address(&domain.to_token)
            .with_address(&domain.to_bridge)
    }

    pub fn with_token_id(mut self, id: &TokenId) -> Self {
        self.buf.extend_from_slice(&token_id_bytes(id));
        self
    }

    pub fn with_bytes32(mut self, bytes: &[u8; 32]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn with_u64(mut self, value: u64) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Variable-length data enters the message as its hash.
    pub fn with_hashed(self, data: &[u8]) -> Self {
        self.with_bytes32(&keccak_256(data))
    }

    pub fn finish(self) -> [u8; 32] {
        keccak_256(&self.buf)
    }
}

/// What the token owner signs to authorize burning `token_id` on this bridge pair.
pub fn burn_request_digest(
    domain: &BridgeDomain,
    token_owner: &EvmAddress,
    token_id: &TokenId,
) -> [u8; 32] {
    MessageBuilder::new(BURN_REQUEST_TAG)
        .with_domain(domain)
        .with_address(token_owner)
        .with_token_id(token_id)
        .finish()
}

/// What the validator signs to finalize a commitment for `token_id`.
pub fn commit_digest(
    domain: &BridgeDomain,
    token_owner: &EvmAddress,
    token_id: &TokenId,
    token_uri: &[u8],
    commitment: &Commitment,
    request_timestamp: u64,
) -> [u8; 32] {
    MessageBuilder::new(COMMIT_TAG)
        .with_domain(domain)
        .with_address(token_owner)
        .with_token_id(token_id)
        .with_hashed(token_uri)
        .with_bytes32(commitment)
        .with_u64(request_timestamp)
        .finish()
}

/// What the token owner signs to answer a validator challenge.
pub fn challenge_response_digest(
    token_id: &TokenId,
    request_nonce: &RequestNonce,
    timestamp: u64,
    challenge: &Challenge,
) -> [u8; 32] {
    MessageBuilder::new(CHALLENGE_RESPONSE_TAG)
        .with_token_id(token_id)
        .with_bytes32(request_nonce)
        .with_u64(timestamp)
        .with_bytes32(challenge)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain() -> BridgeDomain {
        BridgeDomain {
            from_token: EvmAddress::repeat_byte(1),
            from_bridge: EvmAddress::repeat_byte(2),
            to_token: EvmAddress::repeat_byte(3),
            to_bridge: EvmAddress::repeat_byte(4),
        }
    }

    #[test]
    fn burn_request_binds_every_domain_field() {
        let owner = EvmAddress::repeat_byte(9);
        let id = TokenId::from(7u64);
        let base = burn_request_digest(&domain(), &owner, &id);

        let mut swapped = domain();
        core::mem::swap(&mut swapped.from_token, &mut swapped.to_token);
        assert_ne!(base, burn_request_digest(&swapped, &owner, &id));

        let mut other_bridge = domain();
        other_bridge.to_bridge = EvmAddress::repeat_byte(5);
        assert_ne!(base, burn_request_digest(&other_bridge, &owner, &id));

        assert_ne!(base, burn_request_digest(&domain(), &owner, &TokenId::from(8u64)));
    }

    #[test]
    fn messages_are_domain_separated() {
        // same field bytes, different tags
        let a = MessageBuilder::new(BURN_REQUEST_TAG).with_u64(1).finish();
        let b = MessageBuilder::new(COMMIT_TAG).with_u64(1).finish();
        assert_ne!(a, b);
    }

    #[test]
    fn commit_digest_binds_every_field() {
        let owner = EvmAddress::repeat_byte(9);
        let id = TokenId::from(7u64);
        let c = [0xaa; 32];
        let base = commit_digest(&domain(), &owner, &id, b"ipfs://a", &c, 100);
        assert_eq!(base, commit_digest(&domain(), &owner, &id, b"ipfs://a", &c, 100));
        assert_ne!(base, commit_digest(&domain(), &owner, &id, b"ipfs://b", &c, 100));
        assert_ne!(base, commit_digest(&domain(), &owner, &id, b"ipfs://a", &c, 101));
        assert_ne!(base, commit_digest(&domain(), &owner, &id, b"ipfs://a", &[0xab; 32], 100));

        let other_owner = EvmAddress::repeat_byte(8);
        assert_ne!(base, commit_digest(&domain(), &other_owner, &id, b"ipfs://a", &c, 100));
        let other_id = TokenId::from(8u64);
        assert_ne!(base, commit_digest(&domain(), &owner, &other_id, b"ipfs://a", &c, 100));

        let mut shifted = [domain(); 4];
        shifted[0].from_token = EvmAddress::repeat_byte(0xee);
        shifted[1].from_bridge = EvmAddress::repeat_byte(0xee);
        shifted[2].to_token = EvmAddress::repeat_byte(0xee);
        shifted[3].to_bridge = EvmAddress::repeat_byte(0xee);
        for other in &shifted {
            assert_ne!(base, commit_digest(other, &owner, &id, b"ipfs://a", &c, 100));
        }
    }

    #[test]
    fn challenge_response_binds_request() {
        let id = TokenId::from(7u64);
        let base = challenge_response_digest(&id, &[1; 32], 10, &[2; 32]);
        assert_ne!(base, challenge_response_digest(&id, &[3; 32], 10, &[2; 32]));
        assert_ne!(base, challenge_response_digest(&id, &[1; 32], 11, &[2; 32]));
        assert_ne!(base, challenge_response_digest(&id, &[1; 32], 10, &[4; 32]));
    }
}
