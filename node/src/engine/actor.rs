use super::{ingress::Message, AccountView, Config, EventRecord, Mailbox, RequestView};
use crate::{books::Books, gateway::Fulfillment, store::Store};
use commonware_utils::hex;
use futures::{channel::mpsc, StreamExt};
use luckymint_execution::{self as execution, ConsolationToken, ExecutionError, Layer, State};
use luckymint_types::{
    mint::{Address, RequestId},
    Event, Instruction,
};
use primitive_types::U256;
use std::{collections::VecDeque, path::PathBuf, time::Duration};
use tracing::{debug, error, info, warn};

/// Owns the store and every collaborator. Messages are handled one at a time.
pub struct Actor {
    mailbox: mpsc::Receiver<Message>,
    inbound: Mailbox,

    store: Store,
    books: Books,

    events: VecDeque<EventRecord>,
    next_event: u64,
    event_log_capacity: usize,

    fulfillment_delay: Duration,
    snapshot_path: Option<PathBuf>,
}

impl Actor {
    pub fn new(config: Config, store: Store, books: Books) -> (Self, Mailbox) {
        let (sender, mailbox) = mpsc::channel(config.mailbox_size);
        let inbound = Mailbox::new(sender);
        (
            Self {
                mailbox,
                inbound: inbound.clone(),
                store,
                books,
                events: VecDeque::new(),
                next_event: 0,
                event_log_capacity: config.event_log_capacity,
                fulfillment_delay: config.fulfillment_delay,
                snapshot_path: config.snapshot_path,
            },
            inbound,
        )
    }

    /// Process messages until every mailbox is dropped.
    ///
    /// Requests left pending by a previous run are re-queued with the gateway first.
    pub async fn run(mut self) {
        let pending = self.store.pending_requests();
        if !pending.is_empty() {
            info!(count = pending.len(), "resuming pending requests");
        }
        for (id, request) in pending {
            self.books.gateway.resume(id, request.word_count() as u32);
        }
        self.dispatch_queued();

        while let Some(message) = self.mailbox.next().await {
            match message {
                Message::Execute {
                    instruction,
                    response,
                } => {
                    let result = self.execute(&instruction).await;
                    let _ = response.send(result);
                }
                Message::Fulfilled { id, words } => {
                    self.books.gateway.disclose(&id);
                    if let Err(err) = self.fulfill(id, &words).await {
                        warn!(request_id = %id, ?err, "fulfilment rejected");
                    }
                }
                Message::Ledger { response } => {
                    let ledger = execution::ledger(&self.store)
                        .await
                        .map_err(ExecutionError::from);
                    let _ = response.send(ledger);
                }
                Message::Collection { target, response } => {
                    let config = execution::collection(&self.store, target)
                        .await
                        .map_err(ExecutionError::from);
                    let _ = response.send(config);
                }
                Message::Request { id, response } => {
                    let view = self.request_view(id).await;
                    let _ = response.send(view);
                }
                Message::Events {
                    since,
                    limit,
                    response,
                } => {
                    let events = self
                        .events
                        .iter()
                        .filter(|record| record.index >= since)
                        .take(limit)
                        .cloned()
                        .collect();
                    let _ = response.send(events);
                }
                Message::Account { address, response } => {
                    let _ = response.send(self.account_view(address));
                }
            }
        }
        info!("engine mailbox closed");
    }

    async fn execute(&mut self, instruction: &Instruction) -> Result<Vec<Event>, ExecutionError> {
        let outcome = {
            let mut layer = Layer::new(&self.store, &mut self.books);
            match layer.execute(instruction).await {
                Ok(events) => Ok((events, layer.commit())),
                Err(err) => Err(err),
            }
        };
        let (events, changes) = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                // Aborted batches cancel their own gateway request; nothing queued may survive.
                for Fulfillment { id, .. } in self.books.gateway.take_queued() {
                    debug!(request_id = %id, "discarding orphaned request");
                }
                return Err(err);
            }
        };
        self.store.apply(changes).await?;
        self.persist();
        self.record(&events);
        self.dispatch_queued();
        Ok(events)
    }

    async fn fulfill(&mut self, id: RequestId, words: &[U256]) -> Result<(), ExecutionError> {
        let mut layer = Layer::new(&self.store, &mut self.books);
        let events = layer.fulfill(id, words).await?;
        let changes = layer.commit();
        self.store.apply(changes).await?;
        self.persist();
        self.record(&events);
        Ok(())
    }

    fn dispatch_queued(&mut self) {
        for Fulfillment { id, words } in self.books.gateway.take_queued() {
            let mut mailbox = self.inbound.clone();
            let delay = self.fulfillment_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                mailbox.fulfilled(id, words).await;
            });
        }
    }

    fn record(&mut self, events: &[Event]) {
        for event in events {
            self.events.push_back(EventRecord {
                index: self.next_event,
                event: event.clone(),
            });
            self.next_event += 1;
        }
        while self.events.len() > self.event_log_capacity {
            self.events.pop_front();
        }
    }

    fn persist(&self) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        if let Err(err) = self.store.persist(path) {
            error!(?err, path = %path.display(), "failed to persist snapshot");
        }
    }

    async fn request_view(&self, id: RequestId) -> Option<RequestView> {
        let record = self.books.gateway.record(&id)?.clone();
        let pending = match execution::pending_request(&self.store, id).await {
            Ok(pending) => pending,
            Err(err) => {
                warn!(request_id = %id, ?err, "failed to read pending request");
                None
            }
        };
        Some(RequestView {
            id,
            word_count: record.word_count,
            commitment: hex(&record.commitment),
            reveal: record.reveal.map(|reveal| hex(&reveal)),
            pending,
        })
    }

    fn account_view(&self, address: Address) -> AccountView {
        AccountView {
            address,
            tokens: self.books.token.balance_of(&address),
            native_received: self.books.bank.received(&address),
            receipts: self.books.receipts.holdings(&address),
        }
    }
}
