use nft_bridge_primitives::{
    ecdsa, messages, BridgeDomain, Challenge, Commitment, EcdsaSignature, EvmAddress, RequestNonce,
    TokenId,
};
use serde::{Deserialize, Serialize};

use crate::{
    clock::{Clock, SystemClock},
    commitment::{KeyIndicator, Secret},
    error::{Result, ValidatorError},
    keys::{hex_array, EcdsaKey},
    service::SecretService,
};

/// An owner's request to burn a token, answered against a prior challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnRequest {
    pub owner: EvmAddress,
    pub token_id: TokenId,
    #[serde(with = "hex_array")]
    pub request_nonce: RequestNonce,
    /// Challenge timestamp; becomes the on-chain `request_timestamp`.
    pub timestamp: u64,
    /// Over [`messages::challenge_response_digest`].
    #[serde(with = "hex_array")]
    pub challenge_signature: EcdsaSignature,
    /// Over [`messages::burn_request_digest`].
    #[serde(with = "hex_array")]
    pub burn_signature: EcdsaSignature,
}

/// Arguments of `commit_and_burn`, plus the indicator kept by the requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSubmission {
    pub token_owner: EvmAddress,
    pub token_id: TokenId,
    #[serde(with = "hex_array")]
    pub commitment: Commitment,
    pub request_timestamp: u64,
    #[serde(with = "hex_array")]
    pub owner_signature: EcdsaSignature,
    #[serde(with = "hex_array")]
    pub validator_signature: EcdsaSignature,
    pub key_indicator: KeyIndicator,
}

/// A requester asking for the secret behind an earlier commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealRequest {
    pub owner: EvmAddress,
    pub token_id: TokenId,
    #[serde(with = "hex_array")]
    pub request_nonce: RequestNonce,
    pub key_indicator: KeyIndicator,
    pub timestamp: u64,
    #[serde(with = "hex_array")]
    pub challenge_signature: EcdsaSignature,
}

/// One validator replica: the secret service, the co-signing key and the
/// bridge pair it serves.
#[derive(Debug)]
pub struct Validator<C: Clock = SystemClock> {
    service: SecretService<C>,
    signer: EcdsaKey,
    domain: BridgeDomain,
}

impl<C: Clock> Validator<C> {
    pub fn new(service: SecretService<C>, signer: EcdsaKey, domain: BridgeDomain) -> Self {
        tracing::info!(address = ?signer.address(), "validator ready");
        Self {
            service,
            signer,
            domain,
        }
    }

    pub fn address(&self) -> EvmAddress {
        self.signer.address()
    }

    pub fn domain(&self) -> &BridgeDomain {
        &self.domain
    }

    pub fn service(&self) -> &SecretService<C> {
        &self.service
    }

    pub fn issue_challenge(&self) -> Result<(u64, Challenge)> {
        self.service.issue_challenge()
    }

    /// Co-sign a commitment for the live token state.
    pub fn sign_commit(
        &self,
        token_owner: &EvmAddress,
        token_id: &TokenId,
        token_uri: &[u8],
        commitment: &Commitment,
        request_timestamp: u64,
    ) -> Result<EcdsaSignature> {
        let digest = messages::commit_digest(
            &self.domain,
            token_owner,
            token_id,
            token_uri,
            commitment,
            request_timestamp,
        );
        self.signer.sign_digest(&digest)
    }

    /// Authenticate `request`, commit, and co-sign. `token_uri` is the URI the
    /// chain currently reports for the token.
    pub fn process_burn_request(
        &self,
        request: &BurnRequest,
        token_uri: &[u8],
    ) -> Result<CommitSubmission> {
        let burn = messages::burn_request_digest(&self.domain, &request.owner, &request.token_id);
        if !ecdsa::verify(&request.owner, &burn, &request.burn_signature) {
            tracing::debug!(owner = ?request.owner, "burn request signature rejected");
            return Err(ValidatorError::InvalidSignature);
        }

        let (commitment, key_indicator) = self.service.commit(
            &request.owner,
            &request.token_id,
            &request.request_nonce,
            request.timestamp,
            &request.challenge_signature,
        )?;
        let validator_signature = self.sign_commit(
            &request.owner,
            &request.token_id,
            token_uri,
            &commitment,
            request.timestamp,
        )?;

        Ok(CommitSubmission {
            token_owner: request.owner,
            token_id: request.token_id,
            commitment,
            request_timestamp: request.timestamp,
            owner_signature: request.burn_signature,
            validator_signature,
            key_indicator,
        })
    }

    /// Reveal the secret to the authenticated owner of the request.
    pub fn reveal(&self, request: &RevealRequest) -> Result<Secret> {
        self.service.authenticated_reveal(
            &request.owner,
            &request.token_id,
            &request.request_nonce,
            &request.key_indicator,
            request.timestamp,
            &request.challenge_signature,
        )
    }
}
