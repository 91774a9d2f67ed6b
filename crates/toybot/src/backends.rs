//! 🔌 Backends — where the real I/O happens.
//!
//! 🚰 The reference source pours references in, the blob uploader slurps enhancements out,
//! and the controller hands out work and collects report cards. Everything that touches a
//! socket lives under here. Everything that doesn't, doesn't.
//!
//! 🧠 Knowledge graph:
//! - `ReferenceSource`: pull-based, one reference per call, `None` when the well runs dry.
//!   `HttpReferenceSource` streams it off the wire; tests use an in-memory one.
//! - `reference_stream`: wraps any source into a `futures::Stream` so the composer can
//!   `try_next()` its way through it.
//! - `Controller`: the external system that hands out batches and receives results.
//!   `HttpController` talks to the real thing; tests script a fake one.
//! - `BlobUploader`: one PUT, exact bytes, done.
//!
//! 🦆 The duck is here because every file must have one. This is law.

use async_trait::async_trait;
use futures::Stream;

use crate::common::{BatchResult, EnhancementBatch, Reference};
use crate::error::RobotError;

pub(crate) mod controller;
#[cfg(test)]
pub(crate) mod in_mem;
pub(crate) mod reference_source;
pub(crate) mod result_sink;

pub(crate) use controller::HttpController;
pub(crate) use reference_source::HttpReferenceSource;
pub(crate) use result_sink::BlobUploader;

/// 🚰 A source that produces references, one at a time.
///
/// # Contract
/// - `next_reference` returns `Ok(Some(_))` while references flow, `Ok(None)` once finished.
/// - Single pass. Once it returns `None` or an error, it is done. Make a new one to start over.
/// - A malformed record is an error, not a skip. Half a batch is worse than no batch.
#[async_trait]
pub(crate) trait ReferenceSource: Send {
    async fn next_reference(&mut self) -> Result<Option<Reference>, RobotError>;
}

/// 🔄 Turns a pull-based source into a lazy `Stream`. Ends at the first error.
pub(crate) fn reference_stream<S>(source: S) -> impl Stream<Item = Result<Reference, RobotError>> + Send
where
    S: ReferenceSource,
{
    futures::stream::try_unfold(source, |mut source| async move {
        let next = source.next_reference().await?;
        Ok::<_, RobotError>(next.map(|reference| (reference, source)))
    })
}

/// 🎛️ The controller: hands out batches, receives results. We consume its contract, we don't own it.
#[async_trait]
pub(crate) trait Controller: Send + Sync + std::fmt::Debug {
    /// 📥 Ask for work. `Ok(None)` means the queue is empty, go take a nap.
    async fn poll_batch(&self, limit: u32) -> Result<Option<EnhancementBatch>, RobotError>;

    /// 📤 Report how a batch went. Exactly once per processing attempt.
    async fn send_result(&self, result: &BatchResult) -> Result<(), RobotError>;
}
