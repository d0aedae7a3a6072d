use std::{sync::Arc, time::Duration};

use shared::{
    domain::{ClassificationItem, Direction},
    protocol::SwipeResult,
};
use tokio::{sync::Mutex, time::timeout};
use tracing::{error, info, warn};

use crate::{
    backend::BackendCollaborator,
    config::EngineConfig,
    error::{BackendError, CoreError},
    queue::ClassificationQueue,
};

/// Sends committed results to the backend one at a time and advances the
/// queue only after the backend acknowledges.
pub struct SubmissionPipeline {
    backend: Arc<dyn BackendCollaborator>,
    queue: Arc<Mutex<ClassificationQueue>>,
    attempts: u32,
    attempt_timeout: Duration,
    retry_delay: Duration,
    // Held for the whole lifetime of a submission; later submits queue behind it.
    in_flight: Mutex<()>,
}

impl SubmissionPipeline {
    pub fn new(
        backend: Arc<dyn BackendCollaborator>,
        queue: Arc<Mutex<ClassificationQueue>>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            backend,
            queue,
            attempts: config.submit_attempts.max(1),
            attempt_timeout: config.attempt_timeout,
            retry_delay: config.retry_delay,
            in_flight: Mutex::new(()),
        }
    }

    /// True while a submission (including its retry) is running.
    pub fn is_busy(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    pub async fn submit(
        &self,
        item: &ClassificationItem,
        direction: Direction,
    ) -> Result<SwipeResult, CoreError> {
        let _turn = self.in_flight.lock().await;

        {
            let queue = self.queue.lock().await;
            match queue.current() {
                Some(current) if current.id == item.id => {}
                Some(current) => {
                    warn!(
                        item_id = %item.id,
                        current_id = %current.id,
                        "submit: dropping commit for an item that is no longer current"
                    );
                    return Err(CoreError::StaleItem {
                        item_id: item.id.clone(),
                    });
                }
                None => {
                    error!(item_id = %item.id, "submit: commit issued against exhausted queue");
                    return Err(CoreError::QueueExhausted);
                }
            }
        }

        let result = SwipeResult::new(item.id.clone(), direction);
        let mut last_failure = String::new();

        for attempt in 1..=self.attempts {
            match timeout(self.attempt_timeout, self.backend.submit_result(&result)).await {
                Ok(Ok(())) => {
                    self.queue.lock().await.advance(result.clone())?;
                    info!(
                        item_id = %result.item_id,
                        direction = result.direction.as_str(),
                        attempt,
                        "submit: result acknowledged"
                    );
                    return Ok(result);
                }
                Ok(Err(BackendError::Unauthorized)) => {
                    warn!(item_id = %result.item_id, "submit: credential rejected");
                    return Err(CoreError::Unauthorized);
                }
                Ok(Err(err)) => last_failure = err.to_string(),
                Err(_) => {
                    last_failure = format!(
                        "no acknowledgment within {}ms",
                        self.attempt_timeout.as_millis()
                    )
                }
            }

            if attempt < self.attempts {
                warn!(
                    item_id = %result.item_id,
                    attempt,
                    "submit: attempt failed, retrying: {last_failure}"
                );
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        error!(
            item_id = %result.item_id,
            attempts = self.attempts,
            "submit: giving up: {last_failure}"
        );
        Err(CoreError::SubmissionFailed {
            item_id: result.item_id,
            attempts: self.attempts,
            reason: last_failure,
        })
    }
}

#[cfg(test)]
#[path = "tests/submission_tests.rs"]
mod tests;
