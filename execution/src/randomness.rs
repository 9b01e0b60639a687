//! Commit-reveal word derivation for auditable randomness.
//!
//! ## Hash Chain
//!
//! Each gateway request gets its own reveal, derived from a master secret:
//! ```text
//! reveal[id]  = hash(master_secret || id)
//! commit[id]  = hash(reveal[id])
//! word[id][i] = hash(reveal[id] || i)
//! ```
//!
//! Publishing `commit[id]` when the request is accepted binds the gateway to the words
//! it will later deliver. Anyone holding the reveal can reproduce every word and check
//! it against the published commitment.

use commonware_cryptography::{sha256::Sha256, Hasher};
use luckymint_types::mint::RequestId;
use primitive_types::U256;

/// Length of commit and reveal values in bytes.
pub const COMMIT_REVEAL_LEN: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitRevealPair {
    pub commit: [u8; COMMIT_REVEAL_LEN],
    pub reveal: [u8; COMMIT_REVEAL_LEN],
}

impl CommitRevealPair {
    pub fn verify(&self) -> bool {
        verify_commit_reveal(&self.commit, &self.reveal)
    }
}

/// `commit = hash(reveal)`
pub fn compute_commit(reveal: &[u8; COMMIT_REVEAL_LEN]) -> [u8; COMMIT_REVEAL_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(reveal);
    hasher.finalize().0
}

pub fn verify_commit_reveal(
    commit: &[u8; COMMIT_REVEAL_LEN],
    reveal: &[u8; COMMIT_REVEAL_LEN],
) -> bool {
    commit == &compute_commit(reveal)
}

/// Expand a reveal into `count` 256-bit words.
pub fn expand_words(reveal: &[u8; COMMIT_REVEAL_LEN], count: u32) -> Vec<U256> {
    (0..count)
        .map(|index| {
            let mut hasher = Sha256::new();
            hasher.update(reveal);
            hasher.update(&index.to_be_bytes());
            U256::from_big_endian(&hasher.finalize().0)
        })
        .collect()
}

#[derive(Clone)]
pub struct HashChain {
    master_secret: [u8; COMMIT_REVEAL_LEN],
}

impl HashChain {
    pub fn from_secret(master_secret: [u8; COMMIT_REVEAL_LEN]) -> Self {
        Self { master_secret }
    }

    pub fn secret(&self) -> &[u8; COMMIT_REVEAL_LEN] {
        &self.master_secret
    }

    pub fn derive_reveal(&self, id: RequestId) -> [u8; COMMIT_REVEAL_LEN] {
        let mut hasher = Sha256::new();
        hasher.update(&self.master_secret);
        hasher.update(&id.0.to_be_bytes());
        hasher.finalize().0
    }

    pub fn generate(&self, id: RequestId) -> CommitRevealPair {
        let reveal = self.derive_reveal(id);
        let commit = compute_commit(&reveal);
        CommitRevealPair { commit, reveal }
    }

    pub fn words(&self, id: RequestId, count: u32) -> Vec<U256> {
        expand_words(&self.derive_reveal(id), count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> HashChain {
        HashChain::from_secret([7u8; COMMIT_REVEAL_LEN])
    }

    #[test]
    fn generation_is_deterministic() {
        let chain = chain();
        assert_eq!(chain.generate(RequestId(1)), chain.generate(RequestId(1)));
        assert_eq!(
            chain.words(RequestId(1), 6),
            chain.words(RequestId(1), 6)
        );
    }

    #[test]
    fn requests_get_distinct_reveals() {
        let chain = chain();
        let a = chain.generate(RequestId(1));
        let b = chain.generate(RequestId(2));
        assert_ne!(a.reveal, b.reveal);
        assert_ne!(a.commit, b.commit);
    }

    #[test]
    fn commitment_verifies_against_reveal() {
        let pair = chain().generate(RequestId(42));
        assert!(pair.verify());

        let mut tampered = pair.reveal;
        tampered[0] ^= 0xff;
        assert!(!verify_commit_reveal(&pair.commit, &tampered));
    }

    #[test]
    fn words_reproduce_from_reveal_alone() {
        let chain = chain();
        let pair = chain.generate(RequestId(9));
        let words = chain.words(RequestId(9), 4);
        assert_eq!(words, expand_words(&pair.reveal, 4));
        assert_eq!(words.len(), 4);
        assert_ne!(words[0], words[1]);
    }

    #[test]
    fn word_prefix_is_stable() {
        let chain = chain();
        let short = chain.words(RequestId(3), 2);
        let long = chain.words(RequestId(3), 5);
        assert_eq!(short[..], long[..2]);
    }
}
