use luckymint_types::{
    mint::{CollectionConfig, GlobalLedger, MintTarget, RequestId, TierKind, TierTable},
    Event, Instruction, Key, Value,
};
use primitive_types::U256;
use std::collections::BTreeMap;

use crate::{
    externals::Externals,
    state::{self, State, Status},
    Result,
};

mod handlers;

/// Stages every write of one operation so a failure leaves state untouched.
///
/// Reads fall through to the underlying [State] unless the key was already staged.
/// Calls into [Externals] are not staged; handlers make them only after the
/// operation's own bookkeeping can no longer fail.
pub struct Layer<'a, S: State, X: Externals> {
    state: &'a S,
    externals: &'a mut X,
    pending: BTreeMap<Key, Status>,
}

impl<'a, S: State, X: Externals> Layer<'a, S, X> {
    pub fn new(state: &'a S, externals: &'a mut X) -> Self {
        Self {
            state,
            externals,
            pending: BTreeMap::new(),
        }
    }

    fn stage(&mut self, key: Key, value: Value) {
        self.pending.insert(key, Status::Update(value));
    }

    fn unstage(&mut self, key: Key) {
        self.pending.insert(key, Status::Delete);
    }

    async fn get_or_init_ledger(&self) -> Result<GlobalLedger> {
        Ok(state::ledger(self).await?)
    }

    async fn get_or_init_collection(&self, target: MintTarget) -> Result<CollectionConfig> {
        Ok(state::collection(self, target).await?)
    }

    async fn get_tiers(&self, kind: TierKind) -> Result<TierTable> {
        Ok(state::tiers(self, kind).await?)
    }

    fn put_ledger(&mut self, ledger: GlobalLedger) {
        self.stage(Key::Ledger, Value::Ledger(ledger));
    }

    fn put_collection(&mut self, config: CollectionConfig) {
        self.stage(Key::Collection(config.target), Value::Collection(config));
    }

    /// Apply one client instruction.
    pub async fn execute(&mut self, instruction: &Instruction) -> Result<Vec<Event>> {
        match instruction {
            Instruction::SubmitBatch(batch) => self.handle_submit_batch(batch).await,
            Instruction::Configure(setting) => self.handle_configure(setting).await,
            Instruction::FundConsolationFees { amount } => {
                self.handle_fund_consolation_fees(*amount).await
            }
            Instruction::MintAirdrop { value } => self.handle_mint_airdrop(*value).await,
            Instruction::Redeem {
                account,
                token_amount,
            } => self.handle_redeem(account, *token_amount).await,
            Instruction::ClaimMintEarnings { recipient, amount } => {
                self.handle_claim_mint_earnings(recipient, *amount).await
            }
            Instruction::ClaimProtocolFees { recipient } => {
                self.handle_claim_protocol_fees(recipient).await
            }
        }
    }

    /// Resolve and settle a pending request with the words the gateway delivered.
    pub async fn fulfill(&mut self, id: RequestId, words: &[U256]) -> Result<Vec<Event>> {
        self.handle_fulfill(id, words).await
    }

    pub fn commit(self) -> Vec<(Key, Status)> {
        self.pending.into_iter().collect()
    }
}

impl<'a, S: State, X: Externals> State for Layer<'a, S, X> {
    async fn get(&self, key: &Key) -> anyhow::Result<Option<Value>> {
        Ok(match self.pending.get(key) {
            Some(Status::Update(value)) => Some(value.clone()),
            Some(Status::Delete) => None,
            None => self.state.get(key).await?,
        })
    }

    async fn insert(&mut self, key: Key, value: Value) -> anyhow::Result<()> {
        self.stage(key, value);
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> anyhow::Result<()> {
        self.unstage(key.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mocks::MockExternals, state::Memory};
    use luckymint_types::mint::{Address, GlobalLedger};

    #[tokio::test]
    async fn reads_see_staged_writes_and_deletes() {
        let mut state = Memory::default();
        let target = MintTarget::Collection(Address::from_low_u64(1));
        let config = CollectionConfig::unconfigured(target, 0);
        state
            .insert(Key::Collection(target), Value::Collection(config.clone()))
            .await
            .unwrap();

        let mut externals = MockExternals::default();
        let mut layer = Layer::new(&state, &mut externals);
        assert_eq!(
            layer.get(&Key::Collection(target)).await.unwrap(),
            Some(Value::Collection(config))
        );

        layer.delete(&Key::Collection(target)).await.unwrap();
        assert_eq!(layer.get(&Key::Collection(target)).await.unwrap(), None);

        let ledger = GlobalLedger {
            consolation_fees: 5,
            ..Default::default()
        };
        layer.put_ledger(ledger.clone());
        assert_eq!(layer.get_or_init_ledger().await.unwrap(), ledger);

        let changes = layer.commit();
        assert_eq!(changes.len(), 2);
        // The underlying state is untouched until the changes are applied.
        assert!(state.get(&Key::Ledger).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unconfigured_collection_uses_default_referral_rate() {
        let mut state = Memory::default();
        let mut ledger = GlobalLedger::default();
        ledger.rates.default_collection_referral_fee_bp = 123;
        state.insert(Key::Ledger, Value::Ledger(ledger)).await.unwrap();

        let mut externals = MockExternals::default();
        let layer = Layer::new(&state, &mut externals);
        let config = layer
            .get_or_init_collection(MintTarget::Collection(Address::from_low_u64(2)))
            .await
            .unwrap();
        assert_eq!(config.referral_fee_bp, 123);
        assert!(!config.has_pending_requests());
    }
}
