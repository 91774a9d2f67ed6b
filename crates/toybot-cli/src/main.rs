//! 🚀 toybot-cli — the front door, the bouncer, the maitre d' of toybot.
//!
//! 📦 This binary loads config, sets up logging, and then lets the library poll until
//! somebody sends a signal. Like a manager. 🦆

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// 🤖 A demo robot that attaches toy annotations to repository references.
#[derive(Debug, Parser)]
#[command(name = "toybot", version, about)]
struct Args {
    /// 🔧 TOML config file. If it doesn't exist, TOYBOT_* env vars are the whole story.
    #[arg(default_value = "toybot.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 📡 RUST_LOG wins; otherwise info, because the poll loop is chatty at debug
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // 🔒 Missing file isn't fatal, env vars may carry everything. An unreadable path is.
    let config_file = args.config.as_path();
    let config_file = match config_file.try_exists().context(format!(
        "💀 Couldn't tell whether the configuration file exists. Was checking here: '{}'",
        config_file.display()
    ))? {
        true => Some(config_file),
        false => None,
    };

    let app_config = match toybot::app_config::load_config(config_file) {
        Ok(app_config) => app_config,
        Err(err) => {
            report(&err);
            std::process::exit(1);
        }
    };

    match toybot::run(app_config).await {
        Ok(stats) => {
            info!(
                "📊 fetches={} empty={} poll_failures={} succeeded={} failed={}",
                stats.fetches,
                stats.empty_polls,
                stats.poll_failures,
                stats.batches_succeeded,
                stats.batches_failed
            );
            Ok(())
        }
        Err(err) => {
            report(&err);
            std::process::exit(1);
        }
    }
}

/// 💀 Peel the onion of sadness, one layer at a time.
fn report(err: &anyhow::Error) {
    error!("💀 error: {}", err);
    for cause in err.chain().skip(1) {
        error!("⚠️  cause: {}", cause);
    }
}
