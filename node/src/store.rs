//! Durable key/value state with whole-file snapshots.

use crate::Genesis;
use anyhow::{bail, Context, Result};
use bytes::Buf;
use commonware_codec::{EncodeSize, FixedSize, ReadExt, Write};
use luckymint_execution::State;
use luckymint_types::{
    mint::{PendingRequest, RequestId},
    Key, Value,
};
use std::{collections::BTreeMap, fs, path::Path};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Store {
    entries: BTreeMap<Key, Value>,
}

impl Store {
    /// Fresh state holding the genesis ledger, collections and tier tables.
    pub fn genesis(genesis: &Genesis) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(Key::Ledger, Value::Ledger(genesis.ledger.clone()));
        for config in &genesis.collections {
            entries.insert(
                Key::Collection(config.target),
                Value::Collection(config.clone()),
            );
        }
        for (kind, table) in &genesis.tiers {
            entries.insert(Key::Tiers(*kind), Value::Tiers(table.clone()));
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Requests still waiting for words, in id order.
    pub fn pending_requests(&self) -> Vec<(RequestId, PendingRequest)> {
        self.entries
            .iter()
            .filter_map(|(key, value)| match (key, value) {
                (Key::PendingRequest(id), Value::PendingRequest(request)) => {
                    Some((*id, request.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Count-prefixed `(Key, Value)` pairs in key order.
    pub fn encode_snapshot(&self) -> Vec<u8> {
        let size = u32::SIZE
            + self
                .entries
                .iter()
                .map(|(key, value)| key.encode_size() + value.encode_size())
                .sum::<usize>();
        let mut buf = Vec::with_capacity(size);
        (self.entries.len() as u32).write(&mut buf);
        for (key, value) in &self.entries {
            key.write(&mut buf);
            value.write(&mut buf);
        }
        buf
    }

    pub fn decode_snapshot(mut reader: &[u8]) -> Result<Self> {
        let count = u32::read(&mut reader).context("snapshot header")?;
        let mut entries = BTreeMap::new();
        for index in 0..count {
            let key = Key::read(&mut reader).with_context(|| format!("snapshot key {index}"))?;
            let value =
                Value::read(&mut reader).with_context(|| format!("snapshot value {index}"))?;
            if entries.insert(key, value).is_some() {
                bail!("snapshot entry {index} repeats a key");
            }
        }
        if reader.has_remaining() {
            bail!("{} trailing bytes after snapshot", reader.remaining());
        }
        Ok(Self { entries })
    }

    /// Write the snapshot beside `path` and rename it into place.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let staging = path.with_extension("tmp");
        fs::write(&staging, self.encode_snapshot())
            .with_context(|| format!("could not write {}", staging.display()))?;
        fs::rename(&staging, path)
            .with_context(|| format!("could not move snapshot to {}", path.display()))?;
        Ok(())
    }

    /// `None` when no snapshot has been written yet.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes =
            fs::read(path).with_context(|| format!("could not read {}", path.display()))?;
        Self::decode_snapshot(&bytes).map(Some)
    }
}

impl State for Store {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        Ok(self.entries.get(key).cloned())
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.entries.insert(key, value);
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luckymint_types::mint::{
        Address, CollectionConfig, GlobalLedger, MintTarget, Tier, TierKind, TierTable,
    };

    async fn populated() -> Store {
        let mut store = Store::default();
        let target = MintTarget::Collection(Address::from_low_u64(5));
        let mut config = CollectionConfig::unconfigured(target, 10);
        config.add_pending(RequestId(3)).unwrap();
        config.add_pending(RequestId(1)).unwrap();
        store
            .insert(
                Key::Ledger,
                Value::Ledger(GlobalLedger {
                    consolation_fees: 77,
                    ..Default::default()
                }),
            )
            .await
            .unwrap();
        store
            .insert(Key::Collection(target), Value::Collection(config))
            .await
            .unwrap();
        store
            .insert(
                Key::Tiers(TierKind::MintToken),
                Value::Tiers(
                    TierTable::new(vec![Tier {
                        risk: 5,
                        multiplier: 6,
                    }])
                    .unwrap(),
                ),
            )
            .await
            .unwrap();
        store
            .insert(
                Key::PendingRequest(RequestId(3)),
                Value::PendingRequest(PendingRequest {
                    target,
                    minter: Address::from_low_u64(8),
                    attempts: 2,
                    mint_earnings_fee_per_attempt: 11,
                    price_adjustment_factor: 12,
                    prize_value: 0,
                    yield_roll: false,
                }),
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn snapshot_restores_every_entry() {
        let store = populated().await;
        let restored = Store::decode_snapshot(&store.encode_snapshot()).unwrap();
        assert_eq!(restored, store);
        assert_eq!(restored.pending_requests().len(), 1);
    }

    #[tokio::test]
    async fn snapshot_encoding_is_stable() {
        let store = populated().await;
        assert_eq!(store.encode_snapshot(), store.clone().encode_snapshot());
    }

    #[tokio::test]
    async fn truncated_or_padded_snapshots_are_rejected() {
        let encoded = populated().await.encode_snapshot();
        assert!(Store::decode_snapshot(&encoded[..encoded.len() - 1]).is_err());

        let mut padded = encoded.clone();
        padded.push(0);
        assert!(Store::decode_snapshot(&padded).is_err());
    }

    #[tokio::test]
    async fn persist_then_load() {
        let dir = std::env::temp_dir().join(format!("luckymint-store-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("state.snapshot");
        assert!(Store::load(&path).unwrap().is_none());

        let store = populated().await;
        store.persist(&path).unwrap();
        assert_eq!(Store::load(&path).unwrap(), Some(store));
        assert!(!path.with_extension("tmp").exists());
        fs::remove_dir_all(&dir).unwrap();
    }
}
