// src/network/client.rs
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

use super::{
    error::{NetworkError, Result},
    types::{
        BvnMatchRequest, FinalCommitRequest, FinalCommitResponse, IdMatchResponse,
        LivenessRequest, LivenessResponse, NinMatchRequest,
    },
};
use crate::utils::config::Config;

/// The three remote verification steps. Every call is a single JSON POST.
///
/// `Ok(None)` means the transport succeeded but the body was empty or `null`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VerificationApi: Send + Sync {
    async fn verify_liveness(&self, request: LivenessRequest) -> Result<Option<LivenessResponse>>;
    async fn verify_nin(&self, request: NinMatchRequest) -> Result<Option<IdMatchResponse>>;
    async fn verify_bvn(&self, request: BvnMatchRequest) -> Result<Option<IdMatchResponse>>;
    async fn final_commit(
        &self,
        request: FinalCommitRequest,
    ) -> Result<Option<FinalCommitResponse>>;
}

#[derive(Debug, Clone)]
struct EndpointPaths {
    liveness: String,
    nin: String,
    bvn: String,
    final_commit: String,
}

/// `reqwest` implementation of [`VerificationApi`].
#[derive(Debug, Clone)]
pub struct HttpVerificationClient {
    http_client: reqwest::Client,
    base_url: String,
    paths: EndpointPaths,
}

impl HttpVerificationClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.get_request_timeout())
            .connect_timeout(config.get_connect_timeout())
            .build()
            .map_err(|e| NetworkError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            paths: EndpointPaths {
                liveness: config.api.liveness_path.clone(),
                nin: config.api.nin_path.clone(),
                bvn: config.api.bvn_path.clone(),
                final_commit: config.api.final_path.clone(),
            },
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Option<Resp>>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(%url, "Sending verification request");

        let response = self.http_client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "Verification endpoint returned error status");
            return Err(NetworkError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        parse_body(&bytes)
    }
}

/// Empty and `null` bodies both decode to `None`.
fn parse_body<Resp: DeserializeOwned>(bytes: &[u8]) -> Result<Option<Resp>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice::<Option<Resp>>(bytes)
        .map_err(|e| NetworkError::Decode(e.to_string()))
}

#[async_trait]
impl VerificationApi for HttpVerificationClient {
    async fn verify_liveness(&self, request: LivenessRequest) -> Result<Option<LivenessResponse>> {
        self.post(&self.paths.liveness, &request).await
    }

    async fn verify_nin(&self, request: NinMatchRequest) -> Result<Option<IdMatchResponse>> {
        self.post(&self.paths.nin, &request).await
    }

    async fn verify_bvn(&self, request: BvnMatchRequest) -> Result<Option<IdMatchResponse>> {
        self.post(&self.paths.bvn, &request).await
    }

    async fn final_commit(
        &self,
        request: FinalCommitRequest,
    ) -> Result<Option<FinalCommitResponse>> {
        self.post(&self.paths.final_commit, &request).await
    }
}
