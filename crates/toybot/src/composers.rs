//! 🎬 *[a stream of references flows in. a buffer of toys flows out. every line, alone.]*
//!
//! 📡 **EnhancementComposer** — turns a reference stream into one newline-delimited payload.
//!
//! 🧠 Knowledge graph:
//! - Input: any `ReferenceSource` (HTTP in prod, in-memory in tests), consumed once, in order.
//! - Per reference: `EnhancementGenerator::generate`, serialized as one JSON line + `\n`.
//! - Output: `ComposedBatch`, the whole payload plus how many enhancements went into it.
//! - Failure: whatever the source raised, untouched. No partial payload ever escapes.
//!
//! ⚠️ The payload is accumulated in memory before upload. The bytes are the same either way,
//! and one batch of toy annotations is not going to OOM anybody. 🦆

use anyhow::Context;
use futures::TryStreamExt;
use rand::Rng;
use tracing::debug;

use crate::backends::{HttpReferenceSource, ReferenceSource, reference_stream};
use crate::error::RobotError;
use crate::transforms::EnhancementGenerator;

/// 📦 One batch worth of enhancement lines, ready for upload.
#[derive(Debug, Default)]
pub(crate) struct ComposedBatch {
    pub payload: Vec<u8>,
    pub enhancement_count: usize,
}

/// 🏭 Streams references in, writes enhancement lines out.
#[derive(Debug)]
pub(crate) struct EnhancementComposer<R> {
    client: reqwest::Client,
    generator: EnhancementGenerator<R>,
}

impl<R: Rng + Send> EnhancementComposer<R> {
    pub(crate) fn new(client: reqwest::Client, generator: EnhancementGenerator<R>) -> Self {
        Self { client, generator }
    }

    /// 📡 Open the reference file at `input_url` and compose its enhancements.
    pub(crate) async fn transform(&mut self, input_url: &str) -> Result<ComposedBatch, RobotError> {
        let source = HttpReferenceSource::open(&self.client, input_url).await?;
        self.compose(source).await
    }

    /// 🔄 Compose from any source. One line out per reference in, no exceptions.
    pub(crate) async fn compose<S: ReferenceSource>(&mut self, source: S) -> Result<ComposedBatch, RobotError> {
        let references = reference_stream(source);
        futures::pin_mut!(references);

        let mut composed = ComposedBatch::default();
        while let Some(reference) = references.try_next().await? {
            let enhancement = self.generator.generate(reference.id);
            serde_json::to_writer(&mut composed.payload, &enhancement)
                .with_context(|| format!("💀 could not serialize the enhancement for reference {}", reference.id))?;
            composed.payload.push(b'\n');
            composed.enhancement_count += 1;
        }

        debug!(
            "🧸 composed {} enhancements into {} bytes",
            composed.enhancement_count,
            composed.payload.len()
        );
        Ok(composed)
    }
}
