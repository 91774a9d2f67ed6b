//! 🎬 *[camera pans across a dimly lit server room]*
//! 🎬 "In a world where batches fail... one supervisor dared to file the paperwork anyway."
//!
//! 📦 The Supervisor drives one batch end to end: compose, upload, report.
//!
//! 🧠 Knowledge graph:
//! - Success → report `{request_id, error: null}`.
//! - `Transport`/`Decode` → report `{request_id, error: {message}}` FIRST, then hand the
//!   error back inside `BatchOutcome::failure` so the poll loop can log it loudly.
//! - Anything else (`Unclassified`) → no report, straight back as `Err`. Only failures we can
//!   name get turned into paperwork.
//! - Exactly one report attempt per `process` call. If the report itself fails, that is the
//!   `Err` you get; the controller owns retries, not us.

use std::sync::Arc;

use rand::Rng;
use tracing::{error, info, warn};

use crate::backends::{BlobUploader, Controller};
use crate::common::{BatchResult, EnhancementBatch};
use crate::composers::{ComposedBatch, EnhancementComposer};
use crate::error::RobotError;

/// 📋 What happened to a batch: the report we sent, plus the failure worth surfacing, if any.
#[derive(Debug)]
pub(crate) struct BatchOutcome {
    pub result: BatchResult,
    /// 💀 the recognized failure behind an error report. Already reported; surfaced for logging.
    pub failure: Option<RobotError>,
}

/// 🏗️ One batch at a time, start to finish, with a report at the end no matter what.
#[derive(Debug)]
pub(crate) struct Supervisor<C, R> {
    controller: Arc<C>,
    composer: EnhancementComposer<R>,
    uploader: BlobUploader,
}

impl<C: Controller, R: Rng + Send> Supervisor<C, R> {
    pub(crate) fn new(controller: Arc<C>, composer: EnhancementComposer<R>, uploader: BlobUploader) -> Self {
        Self {
            controller,
            composer,
            uploader,
        }
    }

    /// 🚀 Process one batch and report how it went.
    pub(crate) async fn process(&mut self, batch: &EnhancementBatch) -> Result<BatchOutcome, RobotError> {
        info!("🚚 processing robot enhancement batch {}", batch.id);
        let composed = self.composer.transform(&batch.reference_storage_url).await;
        self.finish(batch, composed).await
    }

    /// 🧪 Same as `process`, but the references come from `source` instead of the batch URL.
    #[cfg(test)]
    pub(crate) async fn process_from<S: crate::backends::ReferenceSource>(
        &mut self,
        batch: &EnhancementBatch,
        source: S,
    ) -> Result<BatchOutcome, RobotError> {
        let composed = self.composer.compose(source).await;
        self.finish(batch, composed).await
    }

    /// 📤 Upload what was composed, then send exactly one report.
    async fn finish(
        &mut self,
        batch: &EnhancementBatch,
        composed: Result<ComposedBatch, RobotError>,
    ) -> Result<BatchOutcome, RobotError> {
        let outcome = match self.upload(batch, composed).await {
            Ok(enhancement_count) => {
                info!(
                    "✅ batch {} enhanced {} references",
                    batch.id, enhancement_count
                );
                BatchOutcome {
                    result: BatchResult::success(batch.id),
                    failure: None,
                }
            }
            Err(err) if err.is_reportable() => {
                warn!("⚠️ batch {} failed, reporting it: {}", batch.id, err);
                BatchOutcome {
                    result: BatchResult::failure(batch.id, format!("Failed to process request: {err}")),
                    failure: Some(err),
                }
            }
            Err(err) => return Err(err),
        };

        if let Err(report_err) = self.controller.send_result(&outcome.result).await {
            if let Some(failure) = &outcome.failure {
                // -- 🧅 the report is about to swallow this one, so say it out loud first
                error!("💀 batch {} failed before its report did: {}", batch.id, failure);
            }
            return Err(report_err);
        }
        Ok(outcome)
    }

    /// 🔄 Nothing gets uploaded unless every reference decoded.
    async fn upload(
        &mut self,
        batch: &EnhancementBatch,
        composed: Result<ComposedBatch, RobotError>,
    ) -> Result<usize, RobotError> {
        let composed = composed?;
        let enhancement_count = composed.enhancement_count;
        self.uploader
            .upload(&batch.result_storage_url, composed.payload)
            .await?;
        Ok(enhancement_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::in_mem::{InMemorySource, ScriptedController};
    use crate::transforms::EnhancementGenerator;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn supervisor(controller: Arc<ScriptedController>) -> Supervisor<ScriptedController, StdRng> {
        let client = reqwest::Client::new();
        let generator = EnhancementGenerator::new("Toy Robot", "0.1.0", StdRng::seed_from_u64(11));
        Supervisor::new(
            controller,
            EnhancementComposer::new(client.clone(), generator),
            BlobUploader::new(client),
        )
    }

    fn batch_on(server: &MockServer) -> EnhancementBatch {
        EnhancementBatch {
            id: Uuid::new_v4(),
            reference_storage_url: format!("{}/get-references-here", server.uri()),
            result_storage_url: format!("{}/put-results-here", server.uri()),
        }
    }

    async fn serve_references(server: &MockServer, ids: &[Uuid]) {
        let body: String = ids.iter().map(|id| format!("{{\"id\":\"{id}\"}}\n")).collect();
        Mock::given(method("GET"))
            .and(path("/get-references-here"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn the_one_where_everything_goes_right() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        serve_references(&server, &ids).await;
        Mock::given(method("PUT"))
            .and(path("/put-results-here"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let controller = Arc::new(ScriptedController::new(vec![]));
        let batch = batch_on(&server);
        let outcome = supervisor(controller.clone()).process(&batch).await?;

        assert!(outcome.failure.is_none());
        assert_eq!(outcome.result, BatchResult::success(batch.id));
        assert_eq!(controller.reported(), vec![BatchResult::success(batch.id)]);

        let uploads: Vec<_> = server
            .received_requests()
            .await
            .expect("recording is on by default")
            .into_iter()
            .filter(|r| r.method.as_str() == "PUT")
            .collect();
        assert_eq!(String::from_utf8(uploads[0].body.clone())?.lines().count(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_download_404s_and_nothing_is_uploaded() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let controller = Arc::new(ScriptedController::new(vec![]));
        let batch = batch_on(&server);
        let outcome = supervisor(controller.clone()).process(&batch).await?;

        let failure = outcome.failure.expect("the 404 should be surfaced too");
        assert!(matches!(failure, RobotError::Transport { status: Some(404), .. }));

        let reported = controller.reported();
        assert_eq!(reported.len(), 1, "exactly one report, even on failure");
        assert_eq!(reported[0].request_id, batch.id);
        let message = &reported[0].error.as_ref().expect("error report").message;
        assert!(message.starts_with("Failed to process request: "), "{message}");
        assert!(message.contains("404"), "{message}");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_upload_fails_after_a_clean_download() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        serve_references(&server, &[Uuid::new_v4()]).await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let controller = Arc::new(ScriptedController::new(vec![]));
        let batch = batch_on(&server);
        let outcome = supervisor(controller.clone()).process(&batch).await?;

        assert!(outcome.failure.is_some());
        let reported = controller.reported();
        assert_eq!(reported.len(), 1);
        assert!(!reported[0].is_success());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_malformed_line_is_reported_not_uploaded() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"id\":\"not-a-uuid\"}\n"))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let controller = Arc::new(ScriptedController::new(vec![]));
        let outcome = supervisor(controller.clone()).process(&batch_on(&server)).await?;

        assert!(matches!(outcome.failure, Some(RobotError::Decode { line: 1, .. })));
        assert_eq!(controller.reported().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_report_itself_bounces() {
        let server = MockServer::start().await;
        serve_references(&server, &[Uuid::new_v4()]).await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let controller = Arc::new(ScriptedController::new(vec![]).failing_reports());
        let result = supervisor(controller.clone()).process(&batch_on(&server)).await;

        assert!(matches!(result, Err(RobotError::Transport { status: Some(502), .. })));
        assert_eq!(controller.reported().len(), 1, "one attempt, no retries");
    }

    #[tokio::test]
    async fn the_one_where_an_unclassified_failure_skips_the_report() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let controller = Arc::new(ScriptedController::new(vec![]));
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let result = supervisor(controller.clone())
            .process_from(&batch_on(&server), InMemorySource::with_ids(&ids).breaking_after(1))
            .await;

        assert!(matches!(result, Err(RobotError::Unclassified(_))), "{result:?}");
        assert!(controller.reported().is_empty(), "nobody files paperwork for the unknown");
    }

    #[tokio::test]
    async fn the_one_where_an_empty_reference_file_still_uploads() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        serve_references(&server, &[]).await;
        Mock::given(method("PUT"))
            .and(path("/put-results-here"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let controller = Arc::new(ScriptedController::new(vec![]));
        let batch = batch_on(&server);
        let outcome = supervisor(controller.clone()).process(&batch).await?;

        assert!(outcome.failure.is_none());
        assert_eq!(controller.reported(), vec![BatchResult::success(batch.id)]);

        let uploads: Vec<_> = server
            .received_requests()
            .await
            .expect("recording is on by default")
            .into_iter()
            .filter(|r| r.method.as_str() == "PUT")
            .collect();
        assert_eq!(uploads.len(), 1);
        assert!(uploads[0].body.is_empty(), "zero references, zero bytes");
        let content_length = uploads[0]
            .headers
            .get("content-length")
            .and_then(|v| v.to_str().ok());
        assert_eq!(content_length, Some("0"));
        Ok(())
    }
}
