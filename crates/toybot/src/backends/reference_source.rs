//! 📥 HTTP reference source — streams a newline-delimited reference file off the wire.
//!
//! 🧠 Knowledge graph:
//! - One GET per batch. Status checked before a single byte of body is read.
//! - The body is pulled chunk by chunk with `Response::chunk()`; lines are cut with `memchr`.
//!   We never hold more than one partial line plus one chunk in memory.
//! - The connection lives inside `response`. Drop the source (done, or errored) and it's released.
//! - Blank lines are skipped. A final line without a trailing `\n` still counts.
//!
//! "He who reads the entire file into one String, OOMs in production." — Ancient proverb 📜

use async_trait::async_trait;
use memchr::memchr;
use tracing::{debug, trace};

use super::ReferenceSource;
use crate::common::Reference;
use crate::error::RobotError;

const OPERATION: &str = "reference download";

/// 📂 Streams references from a URL, one line at a time.
pub(crate) struct HttpReferenceSource {
    url: String,
    response: reqwest::Response,
    buf: Vec<u8>,
    // -- 🔖 bytes before this offset are already decoded
    cursor: usize,
    line_number: usize,
    exhausted: bool,
}

// 🎭 manual Debug: nobody debugging a stream wants a dump of the half-read buffer
impl std::fmt::Debug for HttpReferenceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpReferenceSource")
            .field("url", &self.url)
            .field("line_number", &self.line_number)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

impl HttpReferenceSource {
    /// 🚀 Opens the stream. Non-2xx means `Transport`, and we never look at the body as data.
    pub(crate) async fn open(client: &reqwest::Client, url: &str) -> Result<Self, RobotError> {
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|err| RobotError::network(OPERATION, url, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RobotError::status(OPERATION, url, status, body));
        }

        debug!("📡 opened reference stream {} ({})", url, status);
        Ok(Self {
            url: url.to_string(),
            response,
            buf: Vec::new(),
            cursor: 0,
            line_number: 0,
            exhausted: false,
        })
    }

    /// 📦 Pull one more chunk into the buffer, compacting the already-decoded prefix first.
    async fn fill(&mut self) -> Result<(), RobotError> {
        let chunk = self
            .response
            .chunk()
            .await
            .map_err(|err| RobotError::network(OPERATION, self.url.as_str(), err))?;
        match chunk {
            Some(bytes) => {
                trace!("📖 pulled {} bytes from {}", bytes.len(), self.url);
                self.buf.drain(..self.cursor);
                self.cursor = 0;
                self.buf.extend_from_slice(&bytes);
            }
            None => self.exhausted = true,
        }
        Ok(())
    }
}

#[async_trait]
impl ReferenceSource for HttpReferenceSource {
    async fn next_reference(&mut self) -> Result<Option<Reference>, RobotError> {
        loop {
            let pending = &self.buf[self.cursor..];
            if let Some(newline) = memchr(b'\n', pending) {
                let start = self.cursor;
                self.cursor += newline + 1;
                self.line_number += 1;
                if let Some(reference) = decode_line(self.line_number, &self.buf[start..start + newline])? {
                    return Ok(Some(reference));
                }
                continue;
            }

            if self.exhausted {
                if pending.is_empty() {
                    debug!("🏁 reference stream {} finished after {} lines", self.url, self.line_number);
                    return Ok(None);
                }
                // -- 🧹 last line, no trailing newline. still a line.
                let start = self.cursor;
                self.cursor = self.buf.len();
                self.line_number += 1;
                let decoded = decode_line(self.line_number, &self.buf[start..])?;
                if decoded.is_some() {
                    return Ok(decoded);
                }
                continue;
            }

            self.fill().await?;
        }
    }
}

/// 🔍 One line in, at most one reference out. Blank lines are not references, and not errors.
fn decode_line(line_number: usize, raw: &[u8]) -> Result<Option<Reference>, RobotError> {
    let trimmed = raw.trim_ascii();
    if trimmed.is_empty() {
        trace!("🫥 skipping blank line {}", line_number);
        return Ok(None);
    }
    serde_json::from_slice(trimmed)
        .map(Some)
        .map_err(|source| RobotError::Decode {
            line: line_number,
            source,
        })
}
