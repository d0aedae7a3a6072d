use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::ClassificationItem,
    protocol::{NextBatchResponse, SubmitAck, SwipeResult},
};
use tracing::{info, warn};
use url::Url;

use super::BackendCollaborator;
use crate::{
    auth::CredentialStore,
    error::{BackendError, ConfigError},
};

const CLASSIFICATIONS_PATH: [&str; 3] = ["api", "v1", "classifications"];

/// HTTP backend speaking the classification API.
pub struct LiveBackend {
    http: Client,
    base: Url,
    credentials: Arc<CredentialStore>,
}

impl LiveBackend {
    pub fn new(
        server_url: &str,
        credentials: Arc<CredentialStore>,
        request_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let base = Url::parse(server_url).map_err(|err| ConfigError::Invalid {
            key: "server_url",
            reason: format!("'{server_url}': {err}"),
        })?;
        if base.cannot_be_a_base() {
            return Err(ConfigError::Invalid {
                key: "server_url",
                reason: format!("'{server_url}' cannot be used as a base url"),
            });
        }
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| ConfigError::Invalid {
                key: "http_client",
                reason: err.to_string(),
            })?;
        Ok(Self {
            http,
            base,
            credentials,
        })
    }

    fn endpoint(&self, tail: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::Malformed(format!("invalid base url {}", self.base)))?
            .pop_if_empty()
            .extend(CLASSIFICATIONS_PATH)
            .extend(tail);
        Ok(url)
    }

    async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.credentials.bearer().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let response = self.authorized(request).await.send().await?;
        let response = check_status(response)?;
        response
            .json::<T>()
            .await
            .map_err(|err| BackendError::Malformed(err.to_string()))
    }
}

fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(BackendError::Unauthorized);
    }
    if !status.is_success() {
        return Err(BackendError::Status(status.as_u16()));
    }
    Ok(response)
}

#[async_trait]
impl BackendCollaborator for LiveBackend {
    async fn fetch_next_batch(&self) -> Result<Vec<ClassificationItem>, BackendError> {
        let url = self.endpoint(&["next-batch"])?;
        let batch: NextBatchResponse = self.send(self.http.get(url)).await.map_err(|err| {
            warn!("backend: next-batch request failed: {err}");
            err
        })?;
        info!(items = batch.items.len(), "backend: next batch received");
        Ok(batch.items)
    }

    async fn submit_result(&self, result: &SwipeResult) -> Result<(), BackendError> {
        let url = self.endpoint(&[result.item_id.as_str(), "submit"])?;
        let ack: SubmitAck = self.send(self.http.post(url).json(result)).await?;
        if ack.item_id != result.item_id {
            return Err(BackendError::Malformed(format!(
                "acknowledgment for item {} while submitting {}",
                ack.item_id, result.item_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/live_backend_tests.rs"]
mod tests;
