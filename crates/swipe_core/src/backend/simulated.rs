use std::{collections::HashSet, time::Duration};

use async_trait::async_trait;
use shared::{
    domain::{ClassificationItem, ImageRef, ItemId, ReferenceImage, TaskId},
    protocol::SwipeResult,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::BackendCollaborator;
use crate::error::BackendError;

/// Items served by the simulated backend when no batch is supplied.
pub fn fixture_items() -> Vec<ClassificationItem> {
    let hornet_refs = vec![
        ReferenceImage {
            image: ImageRef::uri("https://swipelab.example/ref/vespa-dorsal.jpg"),
            caption: Some("Dorsal view".into()),
        },
        ReferenceImage {
            image: ImageRef::uri("https://swipelab.example/ref/vespa-lateral.jpg"),
            caption: Some("Lateral view".into()),
        },
    ];

    let mut items: Vec<ClassificationItem> = (1234..1238)
        .map(|image_id| ClassificationItem {
            id: ItemId::new(image_id.to_string()),
            task_id: Some(TaskId(7)),
            prompt: "Is this a Vespa mandarinia?".into(),
            image: ImageRef::inline("image/jpeg", format!("trap-image-{image_id}").as_bytes()),
            reference_images: hornet_refs.clone(),
        })
        .collect();

    items.push(ClassificationItem {
        id: ItemId::new("dog-1"),
        task_id: None,
        prompt: "Is this a dog?".into(),
        image: ImageRef::uri("https://example.com/image1.jpg"),
        reference_images: (1..=4)
            .map(|n| ReferenceImage {
                image: ImageRef::uri(format!("https://example.com/ref{n}.jpg")),
                caption: None,
            })
            .collect(),
    });
    items
}

#[derive(Debug, Default)]
struct SimulatedState {
    batch: Vec<ClassificationItem>,
    fail_fetches: u32,
    fail_submissions: u32,
    reject_credential: bool,
    ack_delay: Duration,
    submit_calls: u32,
    accepted: Vec<SwipeResult>,
    accepted_ids: HashSet<Uuid>,
}

/// In-process backend. Serves a fixed batch, records accepted results in
/// order, and can be scripted to fail.
#[derive(Debug, Default)]
pub struct SimulatedBackend {
    state: Mutex<SimulatedState>,
}

impl SimulatedBackend {
    pub fn new(batch: Vec<ClassificationItem>) -> Self {
        Self {
            state: Mutex::new(SimulatedState {
                batch,
                ..SimulatedState::default()
            }),
        }
    }

    pub fn with_fixture() -> Self {
        Self::new(fixture_items())
    }

    pub async fn set_batch(&self, batch: Vec<ClassificationItem>) {
        self.state.lock().await.batch = batch;
    }

    pub async fn fail_next_fetches(&self, count: u32) {
        self.state.lock().await.fail_fetches = count;
    }

    pub async fn fail_next_submissions(&self, count: u32) {
        self.state.lock().await.fail_submissions = count;
    }

    pub async fn reject_credential(&self, reject: bool) {
        self.state.lock().await.reject_credential = reject;
    }

    pub async fn set_ack_delay(&self, delay: Duration) {
        self.state.lock().await.ack_delay = delay;
    }

    pub async fn accepted(&self) -> Vec<SwipeResult> {
        self.state.lock().await.accepted.clone()
    }

    /// Submission attempts received, including failed and duplicate ones.
    pub async fn submit_calls(&self) -> u32 {
        self.state.lock().await.submit_calls
    }
}

#[async_trait]
impl BackendCollaborator for SimulatedBackend {
    async fn fetch_next_batch(&self) -> Result<Vec<ClassificationItem>, BackendError> {
        let mut state = self.state.lock().await;
        if state.reject_credential {
            return Err(BackendError::Unauthorized);
        }
        if state.fail_fetches > 0 {
            state.fail_fetches -= 1;
            warn!("backend: simulated fetch outage");
            return Err(BackendError::Network("simulated outage".into()));
        }
        Ok(state.batch.clone())
    }

    async fn submit_result(&self, result: &SwipeResult) -> Result<(), BackendError> {
        let delay = {
            let mut state = self.state.lock().await;
            state.submit_calls += 1;
            state.ack_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().await;
        if state.reject_credential {
            return Err(BackendError::Unauthorized);
        }
        if state.fail_submissions > 0 {
            state.fail_submissions -= 1;
            warn!(item_id = %result.item_id, "backend: simulated submission failure");
            return Err(BackendError::Status(503));
        }
        if state.accepted_ids.insert(result.submission_id) {
            state.accepted.push(result.clone());
        } else {
            debug!(
                submission_id = %result.submission_id,
                "backend: duplicate submission acknowledged"
            );
        }
        Ok(())
    }
}
