//! The backend capability the core depends on, and its two variants.

use std::sync::Arc;

use async_trait::async_trait;
use shared::{domain::ClassificationItem, protocol::SwipeResult};

use crate::{
    auth::CredentialStore,
    config::{BackendKind, EngineConfig},
    error::{BackendError, ConfigError},
};

mod live;
mod simulated;

pub use live::LiveBackend;
pub use simulated::{fixture_items, SimulatedBackend};

#[async_trait]
pub trait BackendCollaborator: Send + Sync {
    async fn fetch_next_batch(&self) -> Result<Vec<ClassificationItem>, BackendError>;
    async fn submit_result(&self, result: &SwipeResult) -> Result<(), BackendError>;
}

/// Picks the variant named by `config.backend`.
pub fn backend_from_config(
    config: &EngineConfig,
    credentials: Arc<CredentialStore>,
) -> Result<Arc<dyn BackendCollaborator>, ConfigError> {
    match config.backend {
        BackendKind::Simulated => Ok(Arc::new(SimulatedBackend::with_fixture())),
        BackendKind::Live => {
            let server_url = config.server_url.as_deref().ok_or(ConfigError::Invalid {
                key: "server_url",
                reason: "live backend requires a server url".into(),
            })?;
            Ok(Arc::new(LiveBackend::new(
                server_url,
                credentials,
                config.attempt_timeout,
            )?))
        }
    }
}
