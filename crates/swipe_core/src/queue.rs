use shared::{domain::ClassificationItem, protocol::SwipeResult};
use tracing::{error, info};

use crate::error::QueueError;

/// Ordered work items, the cursor into them, and the log of results produced
/// so far. `cursor == items.len()` means the queue is exhausted.
#[derive(Debug, Default, Clone)]
pub struct ClassificationQueue {
    items: Vec<ClassificationItem>,
    cursor: usize,
    results: Vec<SwipeResult>,
    loading: bool,
}

impl ClassificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the pending items and rewinds the cursor. Earlier results are kept.
    pub fn load(&mut self, items: Vec<ClassificationItem>) {
        info!(
            items = items.len(),
            results = self.results.len(),
            "queue: loaded batch"
        );
        self.items = items;
        self.cursor = 0;
        self.loading = false;
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// The only item eligible for interaction, or `None` once exhausted.
    pub fn current(&self) -> Option<&ClassificationItem> {
        self.items.get(self.cursor)
    }

    /// Appends the result and moves past the current item in one step.
    pub fn advance(&mut self, result: SwipeResult) -> Result<(), QueueError> {
        let Some(current) = self.items.get(self.cursor) else {
            error!(
                item_id = %result.item_id,
                cursor = self.cursor,
                len = self.items.len(),
                "queue: advance called on exhausted queue"
            );
            return Err(QueueError::Exhausted);
        };
        if current.id != result.item_id {
            error!(
                expected = %current.id,
                actual = %result.item_id,
                "queue: advance called with result for a different item"
            );
            return Err(QueueError::ItemMismatch {
                expected: current.id.clone(),
                actual: result.item_id,
            });
        }

        self.results.push(result);
        self.cursor += 1;
        info!(
            cursor = self.cursor,
            len = self.items.len(),
            "queue: advanced"
        );
        Ok(())
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.items.len()
    }

    pub fn results(&self) -> &[SwipeResult] {
        &self.results
    }

    pub fn items(&self) -> &[ClassificationItem] {
        &self.items
    }

    /// Drops items, cursor and results.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
#[path = "tests/queue_tests.rs"]
mod tests;
