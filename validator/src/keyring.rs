//! Versioned, append-only commit key ring.
//!
//! Generation `n` (the last entry) derives new secrets. Older generations are
//! kept forever because key indicators issued under them must keep revealing.
//!
//! Readers take an `Arc` snapshot and never observe a partially rotated ring.
//! Exactly one [`KeyRingWriter`] exists per set-up service; other replicas
//! follow it through [`crate::SecretService::observe`].

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, ValidatorError},
    keys::CommitKey,
};

/// Ordered commit keys, never empty. Serializes as a list of hex keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CommitKey>", into = "Vec<CommitKey>")]
pub struct CommitKeyRing {
    keys: Vec<CommitKey>,
}

impl TryFrom<Vec<CommitKey>> for CommitKeyRing {
    type Error = String;

    fn try_from(keys: Vec<CommitKey>) -> Result<Self, Self::Error> {
        if keys.is_empty() {
            return Err("a commit key ring holds at least one generation".into());
        }
        if u32::try_from(keys.len()).is_err() {
            return Err("too many commit key generations".into());
        }
        Ok(Self { keys })
    }
}

impl From<CommitKeyRing> for Vec<CommitKey> {
    fn from(ring: CommitKeyRing) -> Self {
        ring.keys
    }
}

impl CommitKeyRing {
    pub fn new(initial: CommitKey) -> Self {
        Self {
            keys: vec![initial],
        }
    }

    /// `n`, the generation new commitments are made under.
    pub fn current_index(&self) -> u32 {
        // length is bounded by u32 on every constructor
        (self.keys.len() - 1) as u32
    }

    pub fn generations(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn current(&self) -> (u32, &CommitKey) {
        let index = self.current_index();
        (index, &self.keys[index as usize])
    }

    pub(crate) fn get(&self, index: u32) -> Result<&CommitKey> {
        self.keys
            .get(index as usize)
            .ok_or(ValidatorError::IndexOutOfRange {
                index,
                current: self.current_index(),
            })
    }

    /// True iff `self` keeps every generation of `older` unchanged.
    pub fn extends(&self, older: &CommitKeyRing) -> bool {
        self.keys.len() >= older.keys.len() && self.keys[..older.keys.len()] == older.keys[..]
    }

    fn appended(&self, key: CommitKey) -> Result<Self> {
        next_generation(self.keys.len())?;
        let mut keys = Vec::with_capacity(self.keys.len() + 1);
        keys.extend_from_slice(&self.keys);
        keys.push(key);
        Ok(Self { keys })
    }
}

/// Index the next key gets in a ring of `len` generations. The grown ring
/// must still be indexable by `u32`.
fn next_generation(len: usize) -> Result<u32> {
    u32::try_from(len)
        .ok()
        .filter(|&next| next < u32::MAX)
        .ok_or(ValidatorError::KeyRingFull)
}

/// Shared slot holding the ring a replica currently serves from.
#[derive(Debug)]
pub(crate) struct KeyRingCell(RwLock<Arc<CommitKeyRing>>);

impl KeyRingCell {
    pub(crate) fn new(ring: CommitKeyRing) -> Self {
        Self(RwLock::new(Arc::new(ring)))
    }

    pub(crate) fn snapshot(&self) -> Arc<CommitKeyRing> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn append(&self, key: CommitKey) -> Result<u32> {
        let mut slot = self.0.write().unwrap_or_else(PoisonError::into_inner);
        let next = slot.appended(key)?;
        let index = next.current_index();
        *slot = Arc::new(next);
        Ok(index)
    }

    /// Adopt `ring` if it extends the local ring; a no-op when equal.
    pub(crate) fn adopt(&self, ring: CommitKeyRing) -> Result<u32> {
        let mut slot = self.0.write().unwrap_or_else(PoisonError::into_inner);
        if !ring.extends(&slot) {
            return Err(ValidatorError::KeyRingDiverged);
        }
        if u32::try_from(ring.keys.len()).is_err() {
            return Err(ValidatorError::KeyRingDiverged);
        }
        let index = ring.current_index();
        *slot = Arc::new(ring);
        Ok(index)
    }
}

/// The single capability allowed to rotate the commit key.
///
/// Handed out once by [`crate::SecretService::setup`]; not `Clone`.
#[derive(Debug)]
pub struct KeyRingWriter {
    cell: Arc<KeyRingCell>,
}

impl KeyRingWriter {
    pub(crate) fn new(cell: Arc<KeyRingCell>) -> Self {
        Self { cell }
    }

    /// Append `new_key` as generation `n + 1` and return the new `n`.
    ///
    /// The returned ring must reach every other replica (see
    /// [`KeyRingWriter::snapshot`]) before they are expected to commit under it.
    pub fn rotate(&self, new_key: CommitKey) -> Result<u32> {
        let index = self.cell.append(new_key).inspect_err(|e| {
            tracing::error!(error = %e, "commit key rotation refused");
        })?;
        tracing::info!(generation = index, "commit key rotated");
        Ok(index)
    }

    /// Current ring, for durable storage and broadcast to replicas.
    pub fn snapshot(&self) -> CommitKeyRing {
        CommitKeyRing::clone(&self.cell.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generations_stay_indexable_by_u32() {
        assert_eq!(next_generation(1), Ok(1));
        assert_eq!(next_generation(u32::MAX as usize - 1), Ok(u32::MAX - 1));
        assert_eq!(next_generation(u32::MAX as usize), Err(ValidatorError::KeyRingFull));
        #[cfg(target_pointer_width = "64")]
        assert_eq!(next_generation(u32::MAX as usize + 1), Err(ValidatorError::KeyRingFull));
    }

    #[test]
    fn rotation_appends_without_touching_older_generations() {
        let cell = Arc::new(KeyRingCell::new(CommitKeyRing::new(CommitKey::from_bytes([1; 32]))));
        let writer = KeyRingWriter::new(cell.clone());
        let before = writer.snapshot();

        assert_eq!(writer.rotate(CommitKey::from_bytes([2; 32])), Ok(1));
        let after = cell.snapshot();
        assert_eq!(after.generations(), 2);
        assert!(after.extends(&before));
        assert_eq!(after.current().1, &CommitKey::from_bytes([2; 32]));
    }
}
