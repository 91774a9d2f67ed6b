//! 🎛️ HTTP controller client — asks the repository for work and tells it how things went.
//!
//! 🧠 Knowledge graph:
//! - `POST {url}/robot-enhancement-batches/?robot_id=..&limit=..` → 200 + batch, or 204 nothing.
//! - `POST {url}/robot-enhancement-batches/{request_id}/results/` → JSON `BatchResult`.
//! - Credentials are opaque to us: an optional bearer token plus the robot id as `X-Client-Id`.
//!   Which environments may skip the token is decided in `app_config`, not here.
//! - `ControllerConfig` lives here, next to the client that uses it. Ethos pattern, baby. 🎯

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, trace};
use uuid::Uuid;

use super::Controller;
use crate::common::{BatchResult, EnhancementBatch};
use crate::error::RobotError;

const POLL_OPERATION: &str = "batch poll";
const REPORT_OPERATION: &str = "result report";
const CLIENT_ID_HEADER: &str = "X-Client-Id";

/// 🔧 Where the controller lives and how to prove we're allowed to talk to it.
#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    /// 📡 Base URL of the repository API. Scheme included, trailing slash optional.
    pub url: String,
    /// 🪪 Who we are. Sent on every call.
    pub robot_id: Uuid,
    /// 🔒 Bearer token. Optional in `local`/`test`, required everywhere else.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

// -- 🔌 if the handshake takes longer than this, the controller is not having a good time
fn default_connect_timeout_seconds() -> u64 {
    10
}

fn default_request_timeout_seconds() -> u64 {
    30
}

impl ControllerConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// 📐 The base URL, normalized to end with `/` so `join` appends instead of replacing.
    pub(crate) fn base_url(&self) -> Result<Url, RobotError> {
        let mut url = Url::parse(&self.url).map_err(|err| {
            RobotError::Configuration(format!("controller.url '{}' is not a valid URL: {err}", self.url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RobotError::Configuration(format!(
                "controller.url '{}' must be http or https",
                self.url
            )));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}

/// 📡 The real controller, over HTTP.
#[derive(Debug, Clone)]
pub(crate) struct HttpController {
    client: reqwest::Client,
    base_url: Url,
    robot_id: Uuid,
    access_token: Option<String>,
}

impl HttpController {
    pub(crate) fn new(client: reqwest::Client, config: &ControllerConfig) -> Result<Self, RobotError> {
        Ok(Self {
            client,
            base_url: config.base_url()?,
            robot_id: config.robot_id,
            access_token: config.access_token.clone(),
        })
    }

    fn endpoint(&self, relative: &str) -> Result<Url, RobotError> {
        self.base_url.join(relative).map_err(|err| {
            RobotError::Unclassified(anyhow::anyhow!(
                "could not build controller endpoint '{relative}' from '{}': {err}",
                self.base_url
            ))
        })
    }

    /// 🔒 Every controller call carries the same credentials.
    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header(CLIENT_ID_HEADER, self.robot_id.to_string());
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl Controller for HttpController {
    async fn poll_batch(&self, limit: u32) -> Result<Option<EnhancementBatch>, RobotError> {
        let mut url = self.endpoint("robot-enhancement-batches/")?;
        url.query_pairs_mut()
            .append_pair("robot_id", &self.robot_id.to_string())
            .append_pair("limit", &limit.to_string());

        let response = self
            .authorized(self.client.post(url.clone()))
            .send()
            .await
            .map_err(|err| RobotError::network(POLL_OPERATION, url.as_str(), err))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            trace!("💤 controller has nothing for us");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RobotError::status(POLL_OPERATION, url.as_str(), status, body));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| RobotError::network(POLL_OPERATION, url.as_str(), err))?;
        if body.trim_ascii().is_empty() {
            return Ok(None);
        }
        let batch: EnhancementBatch = serde_json::from_slice(&body).map_err(|err| RobotError::Transport {
            operation: POLL_OPERATION,
            url: url.to_string(),
            status: Some(status.as_u16()),
            detail: format!("unreadable batch descriptor: {err}"),
        })?;
        debug!("📥 controller handed us batch {}", batch.id);
        Ok(Some(batch))
    }

    async fn send_result(&self, result: &BatchResult) -> Result<(), RobotError> {
        let url = self.endpoint(&format!("robot-enhancement-batches/{}/results/", result.request_id))?;
        let body = serde_json::to_vec(result).map_err(|err| RobotError::Unclassified(err.into()))?;

        let response = self
            .authorized(self.client.post(url.clone()))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|err| RobotError::network(REPORT_OPERATION, url.as_str(), err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RobotError::status(REPORT_OPERATION, url.as_str(), status, body));
        }
        debug!(
            "📤 reported batch {} ({})",
            result.request_id,
            if result.is_success() { "success" } else { "error" }
        );
        Ok(())
    }
}
