use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

use uow_repository::{TransactionAware, TransactionResult};

/// Records which transaction callbacks fired
pub struct Recorder {
    committed: RwLock<bool>,
    rolled_back: RwLock<bool>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            committed: RwLock::new(false),
            rolled_back: RwLock::new(false),
        })
    }

    pub fn is_committed(&self) -> bool {
        *self.committed.read()
    }

    pub fn is_rolled_back(&self) -> bool {
        *self.rolled_back.read()
    }
}

#[async_trait]
impl TransactionAware for Recorder {
    async fn on_commit(&self) -> TransactionResult<()> {
        *self.committed.write() = true;
        Ok(())
    }

    async fn on_rollback(&self) -> TransactionResult<()> {
        *self.rolled_back.write() = true;
        Ok(())
    }
}
