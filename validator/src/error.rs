use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidatorError {
    #[error("secret service has not been set up")]
    NotInitialized,
    #[error("secret service is already set up")]
    AlreadyInitialized,
    #[error("signature does not match the claimed signer")]
    InvalidSignature,
    #[error("challenge issued at {timestamp} is not valid at {now}")]
    StaleChallenge { timestamp: u64, now: u64 },
    #[error("key indicator failed authentication")]
    Decryption,
    #[error("key indicator could not be sealed")]
    Encryption,
    #[error("key generation {index} is beyond the current generation {current}")]
    IndexOutOfRange { index: u32, current: u32 },
    #[error("observed key ring does not extend the local one")]
    KeyRingDiverged,
    #[error("this replica holds the key ring writer and only rotates through it")]
    WriterReplica,
    #[error("commit key ring has no generation left")]
    KeyRingFull,
    #[error("digest could not be signed")]
    Signing,
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = ValidatorError> = core::result::Result<T, E>;
