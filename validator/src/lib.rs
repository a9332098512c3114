//! Off-chain validator for the NFT burn-and-commit bridge.
//!
//! A replica authenticates token owners with stateless challenges, commits to
//! a per-request secret under the current generation of an append-only
//! commit key ring, co-signs the commitment for `pallet-nft-bridge`, and later
//! reveals the secret from the key indicator it handed out.
//!
//! Replicas share no database. They agree because they hold the same
//! long-lived keys and follow the same key ring, which only the holder of the
//! [`KeyRingWriter`] can extend.

mod challenge;
pub mod clock;
pub mod commitment;
pub mod config;
pub mod error;
pub mod keyring;
pub mod keys;
pub mod service;
pub mod validator;


pub use clock::{Clock, ManualClock, SystemClock};
pub use commitment::{KeyIndicator, Secret};
pub use config::ValidatorConfig;
pub use error::{Result, ValidatorError};
pub use keyring::{CommitKeyRing, KeyRingWriter};
pub use keys::{ChallengeKey, CommitKey, EcdsaKey, IndexEncryptionKey};
pub use service::SecretService;
pub use validator::{BurnRequest, CommitSubmission, RevealRequest, Validator};
