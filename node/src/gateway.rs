//! Simulated randomness gateway.
//!
//! Requests are charged against a subscription balance and answered later from a secret
//! hash chain. The commitment for every accepted request is published immediately so the
//! delivered words can be audited once the reveal is disclosed.

use luckymint_execution::{
    randomness::{CommitRevealPair, HashChain},
    ExternalError, RandomnessGateway,
};
use luckymint_types::mint::RequestId;
use primitive_types::U256;
use std::collections::BTreeMap;

/// Words owed to the engine for one request.
#[derive(Debug)]
pub struct Fulfillment {
    pub id: RequestId,
    pub words: Vec<U256>,
}

/// What the gateway remembers about an accepted request.
#[derive(Clone, Debug)]
pub struct Record {
    pub word_count: u32,
    pub commitment: [u8; 32],
    /// Disclosed once the words have been delivered.
    pub reveal: Option<[u8; 32]>,
}

pub struct SimulatedGateway {
    chain: HashChain,
    max_words: u32,
    balance: u128,
    fee_per_word: u128,
    next_id: u64,
    records: BTreeMap<RequestId, Record>,
    queued: Vec<Fulfillment>,
}

impl SimulatedGateway {
    pub fn new(secret: [u8; 32], max_words: u32, balance: u128, fee_per_word: u128) -> Self {
        Self {
            chain: HashChain::from_secret(secret),
            max_words,
            balance,
            fee_per_word,
            next_id: 1,
            records: BTreeMap::new(),
            queued: Vec::new(),
        }
    }

    pub fn balance(&self) -> u128 {
        self.balance
    }

    pub fn record(&self, id: &RequestId) -> Option<&Record> {
        self.records.get(id)
    }

    /// Drain the fulfilments accepted since the last call.
    pub fn take_queued(&mut self) -> Vec<Fulfillment> {
        std::mem::take(&mut self.queued)
    }

    /// Re-queue a request accepted before a restart. It is not charged again.
    pub fn resume(&mut self, id: RequestId, word_count: u32) {
        self.next_id = self.next_id.max(id.0 + 1);
        self.enqueue(id, word_count);
    }

    /// Mark `id` delivered and disclose its reveal.
    pub fn disclose(&mut self, id: &RequestId) {
        let reveal = self.chain.derive_reveal(*id);
        if let Some(record) = self.records.get_mut(id) {
            record.reveal = Some(reveal);
        }
    }

    fn enqueue(&mut self, id: RequestId, word_count: u32) {
        let CommitRevealPair { commit, .. } = self.chain.generate(id);
        self.records.insert(
            id,
            Record {
                word_count,
                commitment: commit,
                reveal: None,
            },
        );
        self.queued.push(Fulfillment {
            id,
            words: self.chain.words(id, word_count),
        });
    }
}

impl RandomnessGateway for SimulatedGateway {
    fn max_words(&self) -> u32 {
        self.max_words
    }

    fn request(&mut self, word_count: u32) -> Result<RequestId, ExternalError> {
        if word_count > self.max_words {
            return Err(ExternalError::TooManyWords {
                requested: word_count,
                max: self.max_words,
            });
        }
        let required = self.fee_per_word.saturating_mul(word_count as u128);
        if required > self.balance {
            return Err(ExternalError::Underfunded {
                required,
                balance: self.balance,
            });
        }
        self.balance -= required;

        let id = RequestId(self.next_id);
        self.next_id += 1;
        self.enqueue(id, word_count);
        Ok(id)
    }

    fn cancel(&mut self, id: RequestId) -> Result<(), ExternalError> {
        let record = self
            .records
            .remove(&id)
            .ok_or_else(|| ExternalError::Unavailable(format!("unknown request {id}")))?;
        self.queued.retain(|fulfillment| fulfillment.id != id);
        self.balance = self
            .balance
            .saturating_add(self.fee_per_word.saturating_mul(record.word_count as u128));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luckymint_execution::randomness::{expand_words, verify_commit_reveal};

    #[test]
    fn requests_are_charged_per_word() {
        let mut gateway = SimulatedGateway::new([1; 32], 10, 100, 10);
        assert_eq!(gateway.request(4), Ok(RequestId(1)));
        assert_eq!(gateway.balance(), 60);
        assert_eq!(
            gateway.request(7),
            Err(ExternalError::Underfunded {
                required: 70,
                balance: 60
            })
        );
        assert_eq!(
            gateway.request(11),
            Err(ExternalError::TooManyWords {
                requested: 11,
                max: 10
            })
        );
        assert_eq!(gateway.request(6), Ok(RequestId(2)));
        assert_eq!(gateway.balance(), 0);
    }

    #[test]
    fn delivered_words_match_the_commitment() {
        let mut gateway = SimulatedGateway::new([9; 32], 10, 0, 0);
        let id = gateway.request(3).unwrap();
        let queued = gateway.take_queued();
        assert_eq!(queued.len(), 1);
        assert!(gateway.take_queued().is_empty());
        assert!(gateway.record(&id).unwrap().reveal.is_none());

        gateway.disclose(&id);
        let record = gateway.record(&id).unwrap();
        let reveal = record.reveal.unwrap();
        assert!(verify_commit_reveal(&record.commitment, &reveal));
        assert_eq!(queued[0].words, expand_words(&reveal, 3));
    }

    #[test]
    fn cancelled_requests_are_refunded() {
        let mut gateway = SimulatedGateway::new([3; 32], 10, 100, 10);
        let kept = gateway.request(2).unwrap();
        let dropped = gateway.request(5).unwrap();
        assert_eq!(gateway.balance(), 30);

        assert_eq!(gateway.cancel(dropped), Ok(()));
        assert_eq!(gateway.balance(), 80);
        assert!(gateway.record(&dropped).is_none());
        let queued = gateway.take_queued();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].id, kept);

        assert!(gateway.cancel(dropped).is_err());
        assert_eq!(gateway.balance(), 80);
    }

    #[test]
    fn resumed_requests_do_not_reuse_ids() {
        let mut gateway = SimulatedGateway::new([2; 32], 10, 0, 0);
        gateway.resume(RequestId(41), 2);
        assert_eq!(gateway.take_queued()[0].words.len(), 2);
        assert_eq!(gateway.request(1), Ok(RequestId(42)));
    }
}
