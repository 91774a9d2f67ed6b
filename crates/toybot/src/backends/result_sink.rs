//! 📤 Blob uploader — one PUT, the exact bytes, and the headers blob storage insists on.
//!
//! No retries, no chunking, no multipart heroics. If the storage says anything other than
//! 2xx, that's a `Transport` error and the supervisor takes it from there.

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tracing::{debug, trace};

use crate::error::RobotError;

const OPERATION: &str = "result upload";

/// ⚠️ application/jsonl, not application/json, not application/x-ndjson. The repository reads jsonl.
pub(crate) const JSONL_CONTENT_TYPE: &str = "application/jsonl";
const BLOB_TYPE_HEADER: &str = "x-ms-blob-type";
const BLOB_TYPE: &str = "BlockBlob";

/// 🚰 Uploads a fully composed payload to a pre-signed storage URL.
#[derive(Debug, Clone)]
pub(crate) struct BlobUploader {
    client: reqwest::Client,
}

impl BlobUploader {
    pub(crate) fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// 📡 PUT the payload. Empty payloads still go out, the destination expects a file either way.
    pub(crate) async fn upload(&self, destination: &str, payload: Vec<u8>) -> Result<(), RobotError> {
        let payload_bytes = payload.len();
        trace!("📦 uploading {} bytes to {}", payload_bytes, destination);

        let response = self
            .client
            .put(destination)
            .header(CONTENT_TYPE, JSONL_CONTENT_TYPE)
            .header(CONTENT_LENGTH, payload_bytes)
            .header(BLOB_TYPE_HEADER, BLOB_TYPE)
            .body(payload)
            .send()
            .await
            .map_err(|err| RobotError::network(OPERATION, destination, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RobotError::status(OPERATION, destination, status, body));
        }

        debug!("✅ uploaded {} bytes to {} ({})", payload_bytes, destination, status);
        Ok(())
    }
}
