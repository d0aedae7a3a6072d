//! Host-facing surface: one `SwipeSession` per signed-in classification run.
//!
//! The session owns the queue and wires input, animation and submission
//! together. Hosts render `current_item`, `transform` and `status`, forward
//! input through `handle_input`, and may follow `subscribe` for frames.

use std::sync::Arc;

use shared::{
    domain::{ClassificationItem, Direction, ItemId},
    protocol::SwipeResult,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use crate::{
    animator::{AnimationEvent, CommitAnimator, Transform},
    backend::BackendCollaborator,
    config::EngineConfig,
    error::{BackendError, CoreError},
    input::{InputAdapter, InputEvent, InputOutcome},
    queue::ClassificationQueue,
    submission::SubmissionPipeline,
};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostError {
    FetchFailed,
    SubmissionFailed,
    Unauthorized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Loading,
    Ready,
    Empty,
    Animating,
    Submitting,
    Failed(HostError),
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    StatusChanged(SessionStatus),
    Frame(Transform),
    Committed { item_id: ItemId, direction: Direction },
    Advanced { cursor: usize, total: usize },
    Error(CoreError),
}

pub struct SwipeSession {
    config: EngineConfig,
    backend: Arc<dyn BackendCollaborator>,
    queue: Arc<Mutex<ClassificationQueue>>,
    pipeline: SubmissionPipeline,
    input: Mutex<InputAdapter>,
    animator: Mutex<CommitAnimator>,
    status: Mutex<SessionStatus>,
    events: broadcast::Sender<SessionEvent>,
}

impl SwipeSession {
    pub fn new(backend: Arc<dyn BackendCollaborator>, config: EngineConfig) -> Self {
        let queue = Arc::new(Mutex::new(ClassificationQueue::new()));
        let pipeline = SubmissionPipeline::new(backend.clone(), queue.clone(), &config);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            input: Mutex::new(InputAdapter::new(config.swipe_threshold)),
            animator: Mutex::new(CommitAnimator::from_config(&config)),
            status: Mutex::new(SessionStatus::Idle),
            config,
            backend,
            queue,
            pipeline,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn status(&self) -> SessionStatus {
        *self.status.lock().await
    }

    pub async fn current_item(&self) -> Option<ClassificationItem> {
        self.queue.lock().await.current().cloned()
    }

    /// `(cursor, total)` of the loaded batch.
    pub async fn progress(&self) -> (usize, usize) {
        let queue = self.queue.lock().await;
        (queue.cursor(), queue.len())
    }

    pub async fn results(&self) -> Vec<SwipeResult> {
        self.queue.lock().await.results().to_vec()
    }

    pub async fn transform(&self) -> Transform {
        self.animator.lock().await.transform()
    }

    /// Fetches the next batch. On failure the queue keeps what it had.
    /// Refused with `CoreError::Busy` while a commit is in progress.
    pub async fn load(&self) -> Result<usize, CoreError> {
        self.ensure_no_commit().await?;
        self.queue.lock().await.set_loading(true);
        self.set_status(SessionStatus::Loading).await;

        match self.backend.fetch_next_batch().await {
            Ok(items) => {
                let count = items.len();
                {
                    // Held so no commit can start while the queue is replaced.
                    let input = self.input.lock().await;
                    if input.is_locked() || self.pipeline.is_busy() {
                        self.queue.lock().await.set_loading(false);
                        warn!("session: dropping fetched batch, a commit started meanwhile");
                        return Err(CoreError::Busy);
                    }
                    self.queue.lock().await.load(items);
                    self.animator.lock().await.reset();
                }
                self.settle_status().await;
                Ok(count)
            }
            Err(err) => {
                self.queue.lock().await.set_loading(false);
                error!("session: batch fetch failed: {err}");
                let (status, core) = match err {
                    BackendError::Unauthorized => {
                        (HostError::Unauthorized, CoreError::Unauthorized)
                    }
                    other => (
                        HostError::FetchFailed,
                        CoreError::FetchFailed(other.to_string()),
                    ),
                };
                self.set_status(SessionStatus::Failed(status)).await;
                self.emit(SessionEvent::Error(core.clone()));
                Err(core)
            }
        }
    }

    /// Button press for `direction`; same path as an arrow key.
    pub async fn choose(&self, direction: Direction) -> Result<InputOutcome, CoreError> {
        self.handle_input(InputEvent::Button(direction)).await
    }

    /// Routes one input event. Commits run the animation and the submission
    /// to completion before returning; input stays locked for that window.
    pub async fn handle_input(&self, event: InputEvent) -> Result<InputOutcome, CoreError> {
        let Some(item) = self.current_item().await else {
            debug!(?event, "session: input with no current item");
            return Ok(InputOutcome::Ignored);
        };

        let outcome = self.input.lock().await.handle(event);
        match outcome {
            InputOutcome::Dragging(sample) => {
                let transform = {
                    let mut animator = self.animator.lock().await;
                    animator.drag_to(sample);
                    animator.transform()
                };
                self.emit(SessionEvent::Frame(transform));
            }
            InputOutcome::Cancel => {
                let started = self.animator.lock().await.start_cancel();
                if started {
                    self.drive_animation().await;
                }
            }
            InputOutcome::Commit(direction) => {
                let committed = self.commit(item, direction).await;
                self.input.lock().await.unlock();
                committed?;
            }
            InputOutcome::Rejected | InputOutcome::Ignored => {}
        }
        Ok(outcome)
    }

    /// Clears items, cursor, results and any in-progress drag. Refused with
    /// `CoreError::Busy` while a commit is in progress.
    pub async fn restart(&self) -> Result<(), CoreError> {
        {
            let mut input = self.input.lock().await;
            if input.is_locked() || self.pipeline.is_busy() {
                warn!("session: restart refused during a commit");
                return Err(CoreError::Busy);
            }
            self.queue.lock().await.reset();
            self.animator.lock().await.reset();
            *input = InputAdapter::new(self.config.swipe_threshold);
        }
        info!("session: restarted");
        self.set_status(SessionStatus::Idle).await;
        Ok(())
    }

    async fn ensure_no_commit(&self) -> Result<(), CoreError> {
        if self.input.lock().await.is_locked() || self.pipeline.is_busy() {
            warn!("session: reload refused during a commit");
            return Err(CoreError::Busy);
        }
        Ok(())
    }

    async fn commit(
        &self,
        item: ClassificationItem,
        direction: Direction,
    ) -> Result<(), CoreError> {
        self.set_status(SessionStatus::Animating).await;
        self.emit(SessionEvent::Committed {
            item_id: item.id.clone(),
            direction,
        });
        self.animator.lock().await.start_commit(direction);
        self.drive_animation().await;

        self.set_status(SessionStatus::Submitting).await;
        match self.pipeline.submit(&item, direction).await {
            Ok(_) => {
                let (cursor, total) = self.progress().await;
                self.emit(SessionEvent::Advanced { cursor, total });
                self.settle_status().await;
                Ok(())
            }
            Err(err) => {
                warn!(item_id = %item.id, "session: commit not recorded: {err}");
                self.animator.lock().await.reset();
                match &err {
                    CoreError::Unauthorized => {
                        self.set_status(SessionStatus::Failed(HostError::Unauthorized))
                            .await
                    }
                    CoreError::SubmissionFailed { .. } => {
                        self.set_status(SessionStatus::Failed(HostError::SubmissionFailed))
                            .await
                    }
                    _ => self.settle_status().await,
                }
                self.emit(SessionEvent::Error(err.clone()));
                Err(err)
            }
        }
    }

    /// Ticks the animator on the frame interval until the running transition ends.
    async fn drive_animation(&self) {
        let mut frames = tokio::time::interval(self.config.frame_interval);
        frames.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick of an interval completes immediately.
        frames.tick().await;
        loop {
            frames.tick().await;
            let (event, transform, running) = {
                let mut animator = self.animator.lock().await;
                let event = animator.tick(self.config.frame_interval);
                let running = animator.is_committing() || animator.is_settling();
                (event, animator.transform(), running)
            };
            self.emit(SessionEvent::Frame(transform));
            match event {
                Some(AnimationEvent::CommitFinished(direction)) => {
                    debug!(direction = direction.as_str(), "session: commit animation finished");
                    break;
                }
                Some(AnimationEvent::Settled) => break,
                // A new drag took over a settling spring.
                None if !running => break,
                None => {}
            }
        }
    }

    async fn settle_status(&self) {
        let exhausted = self.queue.lock().await.is_exhausted();
        let status = if exhausted {
            SessionStatus::Empty
        } else {
            SessionStatus::Ready
        };
        self.set_status(status).await;
    }

    async fn set_status(&self, status: SessionStatus) {
        let changed = {
            let mut current = self.status.lock().await;
            let changed = *current != status;
            *current = status;
            changed
        };
        if changed {
            debug!(?status, "session: status changed");
            self.emit(SessionEvent::StatusChanged(status));
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine; hosts may poll instead.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
