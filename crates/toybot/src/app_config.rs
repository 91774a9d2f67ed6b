//! 🔧 App Configuration — the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the toy box. Nothing." — every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! 🧠 Knowledge graph:
//! - Env vars `TOYBOT_*` are the base layer; nested keys use `__` (`TOYBOT_RUNTIME__BATCH_SIZE`).
//! - An optional TOML file is merged on top. TOML wins on conflicts.
//! - `validate()` runs right after extraction. Anything wrong here is a `Configuration`
//!   error and the process never starts polling.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::info;

pub use crate::backends::controller::ControllerConfig;
use crate::error::RobotError;

/// 🌍 Where the robot is running. There is no `production`. This is a toy robot.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Local,
    Development,
    #[default]
    Staging,
    Test,
}

impl Environment {
    /// 🔒 Local and test runs may talk to the controller without a token.
    pub fn requires_credentials(&self) -> bool {
        matches!(self, Environment::Development | Environment::Staging)
    }
}

/// 🧸 Who the robot says it is on every enhancement.
#[derive(Debug, Deserialize, Clone)]
pub struct RobotConfig {
    #[serde(default = "default_source_name")]
    pub source_name: String,
    #[serde(default = "default_robot_version")]
    pub robot_version: String,
}

fn default_source_name() -> String {
    "Toy Robot".to_string()
}

fn default_robot_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            source_name: default_source_name(),
            robot_version: default_robot_version(),
        }
    }
}

/// ⏱️ How often we poll and how much we ask for.
#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeConfig {
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

fn default_poll_interval_seconds() -> u64 {
    30
}

fn default_batch_size() -> u32 {
    10
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval_seconds(),
            batch_size: default_batch_size(),
        }
    }
}

impl RuntimeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

/// 📦 The AppConfig: one struct to rule them all, built once in `main` and passed down by hand.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub environment: Environment,
    pub controller: ControllerConfig,
    #[serde(default)]
    pub robot: RobotConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl AppConfig {
    /// ✅ Bounds and credentials. Fails fast, fails once, fails at startup.
    pub fn validate(&self) -> Result<(), RobotError> {
        if !(1..=3600).contains(&self.runtime.poll_interval_seconds) {
            return Err(RobotError::Configuration(format!(
                "runtime.poll_interval_seconds must be within 1..=3600, got {}",
                self.runtime.poll_interval_seconds
            )));
        }
        if !(1..=50).contains(&self.runtime.batch_size) {
            return Err(RobotError::Configuration(format!(
                "runtime.batch_size must be within 1..=50, got {}",
                self.runtime.batch_size
            )));
        }
        self.controller.base_url()?;
        if self.controller.connect_timeout_seconds == 0 {
            return Err(RobotError::Configuration(
                "controller.connect_timeout_seconds must be at least 1".to_string(),
            ));
        }
        if self.controller.request_timeout_seconds == 0 {
            return Err(RobotError::Configuration(
                "controller.request_timeout_seconds must be at least 1".to_string(),
            ));
        }

        let has_token = self
            .controller
            .access_token
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty());
        if self.environment.requires_credentials() && !has_token {
            return Err(RobotError::Configuration(format!(
                "controller.access_token is required in the {:?} environment",
                self.environment
            )));
        }
        if self.robot.source_name.trim().is_empty() {
            return Err(RobotError::Configuration("robot.source_name must not be empty".to_string()));
        }
        Ok(())
    }
}

/// 🚀 Load the config: env vars first, then the TOML file if there is one, then validate.
///
/// 📐 If `config_file_name` is None → env vars only. No file. No assumptions. No pizza defaults.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("TOYBOT_").split("__"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (TOYBOT_*).",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (TOYBOT_*). \
                 No file was provided, this one's all on the environment. Classic."
            .to_string(),
    };

    let app_config: AppConfig = config.extract().context(context_msg)?;
    app_config
        .validate()
        .context("💀 The configuration parsed, but it doesn't make sense. The robot refuses to wake up.")?;
    Ok(app_config)
}
