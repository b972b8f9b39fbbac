//! In-process notifications for ledger changes.
//!
//! Spent totals are always recomputed from stored transactions, so a subscriber that misses
//! an event (or lags behind) only loses a hint to refresh, never data.

use tokio::sync::broadcast;
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    TransactionCreated {
        user_id: Uuid,
        transaction_id: Uuid,
        budget_id: Option<Uuid>,
    },
    TransactionDeleted {
        user_id: Uuid,
        transaction_id: Uuid,
        budget_id: Option<Uuid>,
    },
}

impl LedgerEvent {
    pub fn user_id(&self) -> Uuid {
        match self {
            LedgerEvent::TransactionCreated { user_id, .. }
            | LedgerEvent::TransactionDeleted { user_id, .. } => *user_id,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LedgerEvents {
    sender: broadcast::Sender<LedgerEvent>,
}

impl Default for LedgerEvents {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl LedgerEvents {
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns the number of subscribers the event was delivered to. Having none is not an
    /// error.
    pub fn publish(&self, event: LedgerEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.sender.subscribe()
    }
}
