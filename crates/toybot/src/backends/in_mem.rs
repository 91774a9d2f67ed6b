//! # Previously, on Toybot...
//!
//! 🎬 The network was down. The controller was a rumor. The tests still had to run.
//!
//! In-memory stand-ins for the things that normally live across a socket:
//! - [`InMemorySource`] hands out references from a `Vec`, optionally choking on purpose
//!   (a decode error, or something nobody saw coming).
//! - [`ScriptedController`] replays a script of poll responses (optionally very slowly) and hoards every result it
//!   receives behind a `Mutex`, so tests can peek inside afterwards.
//!
//! ⚠️ Tests only. If this ends up in prod, please also deploy a therapist. 🦆

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Map;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{Controller, ReferenceSource};
use crate::common::{BatchResult, EnhancementBatch, Reference};
use crate::error::RobotError;

/// 📦 A reference source that lives entirely in RAM.
#[derive(Debug, Default)]
pub(crate) struct InMemorySource {
    references: VecDeque<Reference>,
    /// 💀 after this many references, the next pull fails
    fail_after: Option<usize>,
    /// 🤷 fail with `Unclassified` instead of `Decode`
    unclassified: bool,
    served: usize,
}

impl InMemorySource {
    pub(crate) fn with_ids(ids: &[Uuid]) -> Self {
        let references = ids
            .iter()
            .map(|id| Reference {
                id: *id,
                extra: Map::new(),
            })
            .collect();
        Self {
            references,
            ..Self::default()
        }
    }

    pub(crate) fn failing_after(mut self, served: usize) -> Self {
        self.fail_after = Some(served);
        self
    }

    pub(crate) fn breaking_after(mut self, served: usize) -> Self {
        self.fail_after = Some(served);
        self.unclassified = true;
        self
    }
}

#[async_trait]
impl ReferenceSource for InMemorySource {
    async fn next_reference(&mut self) -> Result<Option<Reference>, RobotError> {
        if self.fail_after == Some(self.served) {
            if self.unclassified {
                return Err(RobotError::Unclassified(anyhow::anyhow!(
                    "the toy box lid slammed shut after {} references",
                    self.served
                )));
            }
            let source = serde_json::from_str::<Reference>("{\"id\":42}")
                .expect_err("a numeric id is never a uuid");
            return Err(RobotError::Decode {
                line: self.served + 1,
                source,
            });
        }
        let next = self.references.pop_front();
        if next.is_some() {
            self.served += 1;
        }
        Ok(next)
    }
}

/// 🎭 What the scripted controller says when asked for work.
#[derive(Debug)]
pub(crate) enum PollScript {
    Nothing,
    Batch(EnhancementBatch),
    Fail,
}

/// 🎛️ A controller that reads its lines from a script.
///
/// Once the script runs out it answers "nothing available" forever, and if a shutdown
/// token was handed over, it cancels it on the first unscripted poll so loops end on cue.
#[derive(Debug, Default)]
pub(crate) struct ScriptedController {
    script: Mutex<VecDeque<PollScript>>,
    reported: Mutex<Vec<BatchResult>>,
    polls: AtomicUsize,
    fail_reports: bool,
    /// 🐌 every poll hangs for an hour before answering
    stall_polls: bool,
    cancel_when_exhausted: Option<CancellationToken>,
}

impl ScriptedController {
    pub(crate) fn new(script: Vec<PollScript>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    pub(crate) fn cancelling_when_exhausted(mut self, token: CancellationToken) -> Self {
        self.cancel_when_exhausted = Some(token);
        self
    }

    pub(crate) fn failing_reports(mut self) -> Self {
        self.fail_reports = true;
        self
    }

    pub(crate) fn stalling_polls(mut self) -> Self {
        self.stall_polls = true;
        self
    }

    pub(crate) fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub(crate) fn reported(&self) -> Vec<BatchResult> {
        self.reported.lock().expect("report log poisoned").clone()
    }
}

#[async_trait]
impl Controller for ScriptedController {
    async fn poll_batch(&self, _limit: u32) -> Result<Option<EnhancementBatch>, RobotError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if self.stall_polls {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        }
        let next = self.script.lock().expect("script poisoned").pop_front();
        match next {
            Some(PollScript::Batch(batch)) => Ok(Some(batch)),
            Some(PollScript::Nothing) => Ok(None),
            Some(PollScript::Fail) => Err(RobotError::Transport {
                operation: "batch poll",
                url: "memory://controller".to_string(),
                status: Some(503),
                detail: "scripted outage".to_string(),
            }),
            None => {
                if let Some(token) = &self.cancel_when_exhausted {
                    token.cancel();
                }
                Ok(None)
            }
        }
    }

    async fn send_result(&self, result: &BatchResult) -> Result<(), RobotError> {
        self.reported
            .lock()
            .expect("report log poisoned")
            .push(result.clone());
        if self.fail_reports {
            return Err(RobotError::Transport {
                operation: "result report",
                url: "memory://controller".to_string(),
                status: Some(502),
                detail: "scripted report failure".to_string(),
            });
        }
        Ok(())
    }
}
