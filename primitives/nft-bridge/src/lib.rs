//! Types and traits shared by the NFT burn-and-commit bridge crates.
//!
//! - [`ecdsa`]: secp256k1 recover-and-compare over Ethereum-style addresses.
//! - [`messages`]: the fixed-width, versioned digests every party signs.
//! - [`NftCollection`]: the token contract the bridge burns from.
#![cfg_attr(not(feature = "std"), no_std)]

use frame_support::pallet_prelude::*;
use sp_std::prelude::*;

pub mod ecdsa;
pub mod messages;

pub use sp_core::{H160, U256};

/// 20-byte account identity used for token owners, collections and the validator.
pub type EvmAddress = H160;
/// Token identifier inside a collection.
pub type TokenId = U256;
/// `keccak256(secret)`, published at burn time.
pub type Commitment = [u8; 32];
/// Opaque per-request value chosen by the token owner.
pub type RequestNonce = [u8; 32];
/// PRF output the owner signs during challenge-response authentication.
pub type Challenge = [u8; 32];
/// `r || s || v` secp256k1 signature.
pub type EcdsaSignature = [u8; 65];

/// Keccak-256, shared by the runtime and native tooling.
#[inline]
pub fn keccak_256(data: &[u8]) -> [u8; 32] {
    sp_io::hashing::keccak_256(data)
}

/// Big-endian 32-byte encoding of a token id.
pub fn token_id_bytes(id: &TokenId) -> [u8; 32] {
    let mut out = [0u8; 32];
    // U256 limbs are little-endian u64s
    for (i, limb) in id.0.iter().rev().enumerate() {
        out[i * 8..(i + 1) * 8].copy_from_slice(&limb.to_be_bytes());
    }
    out
}

/// The source/destination quadruple bound into every signed message.
///
/// `from_bridge` is always the address of the bridge on the source chain itself.
#[derive(Clone, Copy, PartialEq, Eq, Encode, Decode, TypeInfo, MaxEncodedLen, RuntimeDebug)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct BridgeDomain {
    pub from_token: EvmAddress,
    pub from_bridge: EvmAddress,
    pub to_token: EvmAddress,
    pub to_bridge: EvmAddress,
}

/// Token contract the bridge burns from. Implement in the runtime.
pub trait NftCollection {
    /// Current owner of `token_id`, `None` if it does not exist.
    fn owner_of(collection: &EvmAddress, token_id: TokenId) -> Option<EvmAddress>;

    /// Metadata URI of `token_id`, `None` if it does not exist.
    fn token_uri(collection: &EvmAddress, token_id: TokenId) -> Option<Vec<u8>>;

    /// Destroy `token_id`. The bridge account must be authorized to burn.
    fn burn(collection: &EvmAddress, token_id: TokenId) -> DispatchResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_id_bytes_are_big_endian() {
        let mut expected = [0u8; 32];
        expected[31] = 7;
        assert_eq!(token_id_bytes(&U256::from(7u64)), expected);

        let big = U256::from(1u64) << 200;
        let bytes = token_id_bytes(&big);
        // bit 200 lives in byte 31 - 25 = 6
        assert_eq!(bytes[6], 1);
        assert_eq!(bytes.iter().filter(|b| **b != 0).count(), 1);
    }

    #[test]
    fn keccak_matches_known_vector() {
        assert_eq!(
            keccak_256(b""),
            hex_literal::hex!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
        );
    }
}
