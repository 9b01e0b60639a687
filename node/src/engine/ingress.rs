use super::{AccountView, EngineError, EventRecord, RequestView};
use futures::{
    channel::{mpsc, oneshot},
    SinkExt,
};
use luckymint_execution::ExecutionError;
use luckymint_types::{
    mint::{Address, CollectionConfig, GlobalLedger, MintTarget, RequestId},
    Event, Instruction,
};
use primitive_types::U256;
use tracing::warn;

/// Messages sent to the engine.
pub enum Message {
    Execute {
        instruction: Instruction,
        response: oneshot::Sender<Result<Vec<Event>, ExecutionError>>,
    },
    Fulfilled {
        id: RequestId,
        words: Vec<U256>,
    },
    Ledger {
        response: oneshot::Sender<Result<GlobalLedger, ExecutionError>>,
    },
    Collection {
        target: MintTarget,
        response: oneshot::Sender<Result<CollectionConfig, ExecutionError>>,
    },
    Request {
        id: RequestId,
        response: oneshot::Sender<Option<RequestView>>,
    },
    Events {
        since: u64,
        limit: usize,
        response: oneshot::Sender<Vec<EventRecord>>,
    },
    Account {
        address: Address,
        response: oneshot::Sender<AccountView>,
    },
}

/// Mailbox for the engine.
#[derive(Clone)]
pub struct Mailbox {
    sender: mpsc::Sender<Message>,
}

impl Mailbox {
    pub(super) fn new(sender: mpsc::Sender<Message>) -> Self {
        Self { sender }
    }

    async fn ask<T>(
        &mut self,
        message: impl FnOnce(oneshot::Sender<T>) -> Message,
    ) -> Result<T, EngineError> {
        let (response, receiver) = oneshot::channel();
        self.sender
            .send(message(response))
            .await
            .map_err(|_| EngineError::Closed)?;
        receiver.await.map_err(|_| EngineError::Dropped)
    }

    pub async fn execute(&mut self, instruction: Instruction) -> Result<Vec<Event>, EngineError> {
        Ok(self
            .ask(|response| Message::Execute {
                instruction,
                response,
            })
            .await??)
    }

    /// Deliver words for `id`. Outcomes are reported through the event log.
    pub async fn fulfilled(&mut self, id: RequestId, words: Vec<U256>) {
        if self
            .sender
            .send(Message::Fulfilled { id, words })
            .await
            .is_err()
        {
            warn!(request_id = %id, "engine mailbox closed; fulfilment dropped");
        }
    }

    pub async fn ledger(&mut self) -> Result<GlobalLedger, EngineError> {
        Ok(self.ask(|response| Message::Ledger { response }).await??)
    }

    pub async fn collection(&mut self, target: MintTarget) -> Result<CollectionConfig, EngineError> {
        Ok(self
            .ask(|response| Message::Collection { target, response })
            .await??)
    }

    pub async fn request(&mut self, id: RequestId) -> Result<Option<RequestView>, EngineError> {
        self.ask(|response| Message::Request { id, response }).await
    }

    pub async fn events(
        &mut self,
        since: u64,
        limit: usize,
    ) -> Result<Vec<EventRecord>, EngineError> {
        self.ask(|response| Message::Events {
            since,
            limit,
            response,
        })
        .await
    }

    pub async fn account(&mut self, address: Address) -> Result<AccountView, EngineError> {
        self.ask(|response| Message::Account { address, response })
            .await
    }
}
