//! Per-conversation exclusive locks.
//!
//! Exchanges on one conversation run strictly one at a time, in the order
//! they asked for the lock (tokio's mutex queues waiters FIFO). Different
//! conversations never contend. The guard releases on every exit path,
//! including cancellation, because release happens in `Drop`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::foundation::ConversationId;

type Slot = Arc<AsyncMutex<()>>;

/// Registry of conversation locks. Entries are created on demand and
/// removed when the last holder or waiter lets go.
#[derive(Default)]
pub struct ConversationLocks {
    slots: Arc<Mutex<HashMap<ConversationId, Slot>>>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `conversation_id`.
    pub async fn acquire(&self, conversation_id: ConversationId) -> ConversationGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(slots.entry(conversation_id).or_default())
        };

        let guard = slot.lock_owned().await;
        ConversationGuard {
            conversation_id,
            slots: Arc::clone(&self.slots),
            guard: Some(guard),
        }
    }

    /// Number of conversations with a live lock entry.
    pub fn active_count(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Exclusive access to one conversation; released on drop.
pub struct ConversationGuard {
    conversation_id: ConversationId,
    slots: Arc<Mutex<HashMap<ConversationId, Slot>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ConversationGuard {
    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }
}

impl Drop for ConversationGuard {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(guard) = self.guard.take() {
            let slot = OwnedMutexGuard::mutex(&guard).clone();
            drop(guard);
            // Map entry plus our clone: nobody else is waiting.
            if Arc::strong_count(&slot) == 2 {
                slots.remove(&self.conversation_id);
            }
        }
    }
}
