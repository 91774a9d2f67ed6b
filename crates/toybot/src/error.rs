//! 💀 Errors — the taxonomy of everything that can go sideways while a robot hands out toys.
//!
//! 🧠 Knowledge graph:
//! - `Transport`: the network said no (bad status, dead socket, timeout). Download, upload, controller.
//! - `Decode`: a line in the reference file was not a reference. One bad line sinks the whole batch.
//! - `Configuration`: startup-only. If you see this at 3am, the robot never even woke up.
//! - `Unclassified`: everything else. Allowed to end the current batch, never the process.
//!
//! Only `Transport` and `Decode` are "reportable": the supervisor turns those into a
//! structured result for the controller. The rest are surfaced raw. 🦆

use thiserror::Error;

/// 🚨 Every failure the robot knows how to name.
#[derive(Debug, Error)]
pub enum RobotError {
    /// 📡 The request left. The response came back wrong, or didn't come back at all.
    #[error("{operation} failed for '{url}'{}: {detail}", status_suffix(.status))]
    Transport {
        /// 🏷️ what we were trying to do, e.g. "reference download"
        operation: &'static str,
        url: String,
        /// 🔢 the HTTP status, when we got far enough to see one
        status: Option<u16>,
        detail: String,
    },

    /// 📜 A line of the reference file was not valid JSON, or was missing an `id`.
    #[error("malformed reference on line {line}: {source}")]
    Decode {
        /// 📏 1-based, because humans read line numbers and humans start at 1
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// 🔧 The config is wrong. Fatal. Fix it and restart.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// 🤷 Something we did not plan for.
    #[error("unclassified failure: {0:#}")]
    Unclassified(#[from] anyhow::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" with status {code}"),
        None => String::new(),
    }
}

impl RobotError {
    /// 📡 The server answered, but not with a 2xx. Keep the body around for the postmortem.
    pub(crate) fn status(
        operation: &'static str,
        url: impl Into<String>,
        status: reqwest::StatusCode,
        body: String,
    ) -> Self {
        let detail = if body.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        } else {
            body
        };
        RobotError::Transport {
            operation,
            url: url.into(),
            status: Some(status.as_u16()),
            detail,
        }
    }

    /// 🔌 The request never completed (connect error, timeout, reset).
    pub(crate) fn network(
        operation: &'static str,
        url: impl Into<String>,
        err: reqwest::Error,
    ) -> Self {
        let status = err.status().map(|s| s.as_u16());
        RobotError::Transport {
            operation,
            url: url.into(),
            status,
            // -- 🧅 reqwest hides the juicy bits in `source()`, `{:#}` flattens the chain
            detail: format!("{:#}", anyhow::Error::new(err)),
        }
    }

    /// ✅ Transport and decode failures get reported to the controller. Nothing else does.
    pub fn is_reportable(&self) -> bool {
        matches!(
            self,
            RobotError::Transport { .. } | RobotError::Decode { .. }
        )
    }
}
