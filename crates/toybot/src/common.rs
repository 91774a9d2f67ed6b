//! 📦 Common data structures — the nouns of toybot.
//!
//! 🎬 A `Reference` walks into a robot. It leaves with a toy. That is the whole plot.
//!
//! 🧠 Knowledge graph:
//! - `Reference`: one line of the reference file. We only care about `id`; the rest rides along.
//! - `Enhancement`: the toy annotation we bolt onto a reference. One per reference. No more, no less.
//! - `EnhancementBatch`: a unit of work the controller hands us (input url + output url).
//! - `BatchResult`: what we tell the controller when we're done. `error: null` means we nailed it.
//!
//! The wire shapes here are owned by the controller. We consume them, we don't get opinions. 🦆

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// 📄 A reference record, straight out of the reference file.
///
/// Immutable once decoded. The `id` is the only field we read; everything else is kept
/// verbatim in `extra` so nothing gets silently dropped if someone logs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub id: Uuid,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 👀 Who gets to see an enhancement. Toys are for everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Restricted,
    Hidden,
}

/// 🧸 A generated annotation attached to exactly one reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enhancement {
    pub reference_id: Uuid,
    /// 🏷️ source label, e.g. "Toy Robot"
    pub source: String,
    pub visibility: Visibility,
    pub robot_version: String,
    /// 🔄 fresh per generation; reprocessing the same reference never reuses one
    pub content_version: Uuid,
    pub content: EnhancementContent,
}

/// 📦 The payload of an enhancement, tagged the way the repository expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "enhancement_type", rename_all = "snake_case")]
pub enum EnhancementContent {
    Annotation { annotations: Vec<Annotation> },
}

/// 🎯 One annotation. We only ever hand out scores, but the tag is on the wire anyway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "annotation_type", rename_all = "snake_case")]
pub enum Annotation {
    Score {
        scheme: String,
        label: String,
        score: f64,
        #[serde(default)]
        data: BTreeMap<String, Value>,
    },
}

/// 🚚 A unit of work from the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementBatch {
    pub id: Uuid,
    /// 📥 where to stream the references from
    pub reference_storage_url: String,
    /// 📤 where to PUT the enhancements
    pub result_storage_url: String,
}

/// 💬 The error half of a batch result. Just a message. The controller doesn't want a stack trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    pub message: String,
}

/// ✅ or 💀: exactly one of these per batch per processing attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub request_id: Uuid,
    pub error: Option<BatchError>,
}

impl BatchResult {
    pub fn success(request_id: Uuid) -> Self {
        Self {
            request_id,
            error: None,
        }
    }

    pub fn failure(request_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            request_id,
            error: Some(BatchError {
                message: message.into(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
