//! Single-owner engine: serializes instructions and fulfilments against the store.

use luckymint_execution::ExecutionError;
use luckymint_types::{
    mint::{Address, PendingRequest, RequestId},
    Event,
};
use serde::Serialize;
use std::{path::PathBuf, time::Duration};
use thiserror::Error;

use crate::books::ReceiptBalance;

mod actor;
pub use actor::Actor;
mod ingress;
pub use ingress::Mailbox;

/// Configuration for the engine.
pub struct Config {
    /// Number of messages to hold in the backlog before blocking.
    pub mailbox_size: usize,

    /// Number of events retained for `/events`.
    pub event_log_capacity: usize,

    /// How long the gateway waits before delivering words.
    pub fulfillment_delay: Duration,

    /// Where the state snapshot is written after every commit.
    pub snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine mailbox closed")]
    Closed,
    #[error("engine dropped the response")]
    Dropped,
    #[error(transparent)]
    Rejected(#[from] ExecutionError),
}

/// An event with its position in the log.
#[derive(Clone, Debug, Serialize)]
pub struct EventRecord {
    pub index: u64,
    #[serde(flatten)]
    pub event: Event,
}

/// A request as seen by the gateway, plus its pending state if still unresolved.
#[derive(Clone, Debug, Serialize)]
pub struct RequestView {
    pub id: RequestId,
    pub word_count: u32,
    pub commitment: String,
    pub reveal: Option<String>,
    pub pending: Option<PendingRequest>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AccountView {
    pub address: Address,
    pub tokens: u128,
    pub native_received: u128,
    pub receipts: Vec<ReceiptBalance>,
}
