//! secp256k1 signature checks over Ethereum-style addresses.
//!
//! Every signed payload in the bridge is a 32-byte digest produced by
//! [`crate::messages`]. Signers wrap that digest in the EIP-191 personal
//! message prefix before signing, so wallets can sign it as-is.
//!
//! Signatures with a high `s` value are rejected (EIP-2), which removes the
//! `(r, s) -> (r, n - s)` malleability of raw ECDSA.

use crate::{keccak_256, EcdsaSignature, EvmAddress};

/// `"\x19Ethereum Signed Message:\n32"`
const EIP191_PREFIX: &[u8; 28] = b"\x19Ethereum Signed Message:\n32";

/// `n / 2` for the secp256k1 group order, big-endian.
const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

/// Hash that is actually signed for a message digest.
pub fn eth_message_hash(digest: &[u8; 32]) -> [u8; 32] {
    let mut buf = [0u8; 60];
    buf[..28].copy_from_slice(EIP191_PREFIX);
    buf[28..].copy_from_slice(digest);
    keccak_256(&buf)
}

/// Address of an uncompressed public key (`x || y`, no `0x04` tag).
pub fn address_from_public(public: &[u8; 64]) -> EvmAddress {
    EvmAddress::from_slice(&keccak_256(public)[12..])
}

/// Recover the signer of an already-prefixed hash.
///
/// Returns `None` for out-of-range recovery ids, high-`s` signatures, and
/// anything the curve arithmetic rejects.
pub fn recover_prehashed(hash: &[u8; 32], signature: &EcdsaSignature) -> Option<EvmAddress> {
    let v = match signature[64] {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return None,
    };
    if signature[32..64] > SECP256K1_HALF_ORDER[..] {
        return None;
    }
    let mut normalized = *signature;
    normalized[64] = v;
    sp_io::crypto::secp256k1_ecdsa_recover(&normalized, hash)
        .ok()
        .map(|public| address_from_public(&public))
}

/// Recover the signer of a message digest.
pub fn recover(digest: &[u8; 32], signature: &EcdsaSignature) -> Option<EvmAddress> {
    recover_prehashed(&eth_message_hash(digest), signature)
}

/// True iff `signature` over `digest` was produced by `expected`.
///
/// Never panics; malformed input is simply `false`.
pub fn verify(expected: &EvmAddress, digest: &[u8; 32], signature: &EcdsaSignature) -> bool {
    recover(digest, signature).is_some_and(|signer| signer == *expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use sp_core::{ecdsa, Pair};

    // Well-known test account (web3.js documentation key).
    const SECRET: [u8; 32] = hex!("4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318");
    const ADDRESS: [u8; 20] = hex!("2c7536e3605d9c16a7a3d7b1898e529396a65c23");

    const SECP256K1_ORDER: [u8; 32] =
        hex!("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141");

    fn sign(digest: &[u8; 32]) -> EcdsaSignature {
        let pair = ecdsa::Pair::from_seed(&SECRET);
        let sig = pair.sign_prehashed(&eth_message_hash(digest));
        let raw: &[u8] = sig.as_ref();
        raw.try_into().expect("65-byte signature")
    }

    // n - s, big-endian
    fn negate_s(s: &[u8]) -> [u8; 32] {
        let mut out = [0u8; 32];
        let mut borrow = 0i16;
        for i in (0..32).rev() {
            let mut d = SECP256K1_ORDER[i] as i16 - s[i] as i16 - borrow;
            borrow = if d < 0 {
                d += 256;
                1
            } else {
                0
            };
            out[i] = d as u8;
        }
        out
    }

    #[test]
    fn recovers_known_address() {
        let digest = keccak_256(b"nft-bridge");
        let sig = sign(&digest);
        assert_eq!(recover(&digest, &sig), Some(EvmAddress::from(ADDRESS)));
        assert!(verify(&EvmAddress::from(ADDRESS), &digest, &sig));
    }

    #[test]
    fn accepts_legacy_recovery_ids() {
        let digest = keccak_256(b"legacy v");
        let mut sig = sign(&digest);
        sig[64] += 27;
        assert!(verify(&EvmAddress::from(ADDRESS), &digest, &sig));
    }

    #[test]
    fn rejects_other_digest_and_other_signer() {
        let digest = keccak_256(b"one");
        let sig = sign(&digest);
        assert!(!verify(&EvmAddress::from(ADDRESS), &keccak_256(b"two"), &sig));
        assert!(!verify(&EvmAddress::repeat_byte(0x11), &digest, &sig));
    }

    #[test]
    fn rejects_malformed_signatures() {
        let digest = keccak_256(b"malformed");
        let mut sig = sign(&digest);
        sig[64] = 5;
        assert_eq!(recover(&digest, &sig), None);
        assert!(!verify(&EvmAddress::from(ADDRESS), &digest, &[0u8; 65]));
        assert!(!verify(&EvmAddress::from(ADDRESS), &digest, &[0xffu8; 65]));
    }

    #[test]
    fn rejects_high_s_twin() {
        let digest = keccak_256(b"malleable");
        let sig = sign(&digest);
        let mut twin = sig;
        twin[32..64].copy_from_slice(&negate_s(&sig[32..64]));
        twin[64] ^= 1;
        assert!(verify(&EvmAddress::from(ADDRESS), &digest, &sig));
        assert!(!verify(&EvmAddress::from(ADDRESS), &digest, &twin));
    }
}
