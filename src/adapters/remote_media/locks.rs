use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-source serialization shared by every adapter of one mixer session.
///
/// Operations against the same input name queue up behind each other;
/// distinct inputs proceed in parallel.
#[derive(Debug, Clone, Default)]
pub struct SourceLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl SourceLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, item_name: &str) -> Arc<AsyncMutex<()>> {
        match self.locks.lock() {
            Ok(mut locks) => Arc::clone(
                locks
                    .entry(item_name.to_owned())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            ),
            // A poisoned registry still hands out a working lock, it just
            // no longer serializes against other holders.
            Err(_) => Arc::new(AsyncMutex::new(())),
        }
    }

    /// Waits for exclusive access to `item_name`.
    pub async fn acquire(&self, item_name: &str) -> OwnedMutexGuard<()> {
        self.lock_for(item_name).lock_owned().await
    }
}
