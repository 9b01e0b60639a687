use anyhow::Result;
use luckymint_types::{
    mint::{CollectionConfig, GlobalLedger, MintTarget, PendingRequest, RequestId, TierKind, TierTable},
    Key, Value,
};
use std::future::Future;

#[cfg(any(test, feature = "mocks"))]
use std::collections::HashMap;

pub trait State {
    fn get(&self, key: &Key) -> impl Future<Output = Result<Option<Value>>>;
    fn insert(&mut self, key: Key, value: Value) -> impl Future<Output = Result<()>>;
    fn delete(&mut self, key: &Key) -> impl Future<Output = Result<()>>;

    fn apply(&mut self, changes: Vec<(Key, Status)>) -> impl Future<Output = Result<()>> {
        async {
            for (key, status) in changes {
                match status {
                    Status::Update(value) => self.insert(key, value).await?,
                    Status::Delete => self.delete(&key).await?,
                }
            }
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "mocks"))]
#[derive(Default)]
pub struct Memory {
    state: HashMap<Key, Value>,
}

#[cfg(any(test, feature = "mocks"))]
impl State for Memory {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        Ok(self.state.get(key).cloned())
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.state.insert(key, value);
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.state.remove(key);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::large_enum_variant)]
pub enum Status {
    Update(Value),
    Delete,
}

/// Read the global ledger, falling back to defaults before genesis has been written.
pub async fn ledger<S: State>(state: &S) -> Result<GlobalLedger> {
    Ok(match state.get(&Key::Ledger).await? {
        Some(Value::Ledger(ledger)) => ledger,
        _ => GlobalLedger::default(),
    })
}

/// Read a target's configuration, synthesizing the unconfigured defaults.
pub async fn collection<S: State>(state: &S, target: MintTarget) -> Result<CollectionConfig> {
    Ok(match state.get(&Key::Collection(target)).await? {
        Some(Value::Collection(config)) => config,
        _ => {
            let ledger = ledger(state).await?;
            CollectionConfig::unconfigured(target, ledger.rates.default_collection_referral_fee_bp)
        }
    })
}

pub async fn tiers<S: State>(state: &S, kind: TierKind) -> Result<TierTable> {
    Ok(match state.get(&Key::Tiers(kind)).await? {
        Some(Value::Tiers(tiers)) => tiers,
        _ => TierTable::default(),
    })
}

pub async fn pending_request<S: State>(state: &S, id: RequestId) -> Result<Option<PendingRequest>> {
    Ok(match state.get(&Key::PendingRequest(id)).await? {
        Some(Value::PendingRequest(request)) => Some(request),
        _ => None,
    })
}
