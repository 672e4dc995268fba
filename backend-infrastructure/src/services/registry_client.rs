use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

use backend_domain::ports::RegistryBackend;
use backend_domain::{BackendConfig, BackendError, RegistryDownload, SyncAck, SyncBatch};

const MAX_ERROR_BODY_CHARS: usize = 512;

/// HTTP client for the remote ticket registry.
pub struct HttpRegistryBackend {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpRegistryBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim())
            .map_err(|err| anyhow!("invalid backend url '{}': {}", config.base_url, err))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("backend url '{}' cannot be a base", config.base_url));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()?;
        Ok(Self {
            client,
            base_url,
            token: config.token.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::Unreachable("backend url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl RegistryBackend for HttpRegistryBackend {
    async fn fetch_registry(&self, event_id: &str) -> Result<RegistryDownload, BackendError> {
        let url = self.endpoint(&["registry", event_id])?;
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }

    async fn upload_scans(
        &self,
        batch: &SyncBatch,
        idempotency_key: &str,
    ) -> Result<SyncAck, BackendError> {
        let url = self.endpoint(&["registry", "sync"])?;
        let response = self
            .authorize(self.client.post(url))
            .header("Idempotency-Key", idempotency_key)
            .json(batch)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(BackendError::Rejected {
            status: status.as_u16(),
            message: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|err| BackendError::InvalidResponse(err.to_string()))
}

fn transport_error(err: reqwest::Error) -> BackendError {
    BackendError::Unreachable(err.to_string())
}
