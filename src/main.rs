//! Ridealert - A background agent for amusement park ride alerts.
//!
//! This is the main entry point of the agent, which evaluates pushed ride status
//! reports against the alerts a user configured and displays notifications.
//!
//! # Overview
//!
//! A user picks a park and, for some of its rides, a condition worth being
//! notified about: the ride opens, closes, or its posted wait drops to a
//! threshold. A server pushes the current status of the park's rides as an
//! encoded payload. For each push the agent displays one notification per
//! matching ride, or a single fallback notification when nothing matched.
//!
//! # Configuration
//!
//! An optional `config.yaml` tunes the presentation and the agent:
//!
//! ```yaml
//! notification:
//!   title: "Ride Alert"
//!   icon: "/icons/queueLogo@0,33x.png"
//!   badge: "/icons/apple-icon-72x72.png"
//!
//! agent:
//!   queue_size: 64
//!   broadcast_capacity: 16
//! ```
//!
//! # Environment Variable Overrides
//!
//! Override any configuration value using environment variables with the `RIDEALERT_` prefix:
//!
//! ```bash
//! export RIDEALERT_NOTIFICATION__TITLE="Queue Alert"
//! export RIDEALERT_AGENT__QUEUE_SIZE=128
//! ```
//!
//! # Usage
//!
//! ```bash
//! ridealert --config config.yaml --data ./ridealert-data
//! ```
//!
//! Events are read from stdin, one JSON object per line:
//!
//! ```json
//! {"push": "H4sIAAAAAAAA..."}
//! {"type": "setConfig", "message": ["epcot", [{"rideName": "Frozen", "alertOn": {"wait": 20}}]]}
//! {"type": "getConfig", "message": null}
//! ```
//!
//! Displayed notifications and configuration broadcasts are written to stdout,
//! one JSON object per line. The agent stops once stdin is closed and every
//! pending event was handled.
//!
//! # Architecture
//!
//! - [`agent`] - The agent processing pushes and foreground messages
//! - [`alerts`] - Alert configuration, its persistence, gate and evaluation
//! - [`config`] - YAML configuration with environment variable overrides
//! - [`host`] - Standard streams transport
//! - [`notify`] - Notification dispatch and the platform notifier seam
//! - [`rides`] - Ride status records and push payload decoding
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (default: `info`)
//!   - Set to `debug` for verbose output
//!   - Set to `warn` or `error` for minimal logging

use clap::Parser;
use env_logger::Env;
use log::{error, info};
use tokio::{io::BufReader, sync::mpsc};

use crate::{
    agent::Agent,
    alerts::FileConfigStore,
    config::Config,
    host::{ConsoleNotifier, OutputSink, forward_broadcasts, forward_events},
};

mod agent;
mod alerts;
mod config;
mod host;
mod notify;
mod rides;

/// Command-line arguments for the agent.
///
/// # Examples
///
/// ```bash
/// ridealert --data ./ridealert-data
/// ridealert --config config.yaml --data ./ridealert-data
/// ```
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file.
    ///
    /// Every setting has a default, so the file is optional. See the
    /// [`config`] module for the expected format.
    #[arg(short, long)]
    config: Option<String>,

    /// Path to the directory storing the alert configuration.
    ///
    /// The directory is created on the first `setConfig`. The configuration
    /// survives restarts of the agent.
    #[arg(short, long)]
    data: String,
}

/// Main entry point of the agent.
///
/// 1. **Logging Setup**: `info` level by default, overridable with `RUST_LOG`.
///    Logs go to stderr so they never mix with the JSON output.
/// 2. **Argument Parsing**: Parses command-line arguments using `clap`
/// 3. **Configuration Loading**: Layers defaults, the YAML file and the
///    environment
/// 4. **Agent Execution**: Forwards stdin events to the agent until stdin is
///    closed, then drains the remaining events and exits
#[tokio::main]
async fn main() {
    // Put logger at info level by default
    let env = Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    info!("Starting ridealert {}...", env!("CARGO_PKG_VERSION"));

    // Parse command line arguments
    let args = Args::parse();

    let config = match Config::load(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load config file: {}", e);
            return;
        }
    };

    let store = FileConfigStore::new(&args.data);
    info!("Storing alert configuration in {}", store.path().display());

    let sink = OutputSink::new(tokio::io::stdout());
    let agent = Agent::new(store, ConsoleNotifier::new(sink.clone()), &config);

    let broadcasts = tokio::spawn(forward_broadcasts(agent.connect_client(), sink));

    let (sender, receiver) = mpsc::channel(config.agent.queue_size);
    let input = tokio::spawn(forward_events(BufReader::new(tokio::io::stdin()), sender));

    agent.run(receiver).await;

    match input.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Failed to read events: {}", e),
        Err(e) => error!("Input task failed: {}", e),
    }

    // Closes the broadcast channel so pending broadcasts are flushed
    drop(agent);
    if let Err(e) = broadcasts.await {
        error!("Broadcast task failed: {}", e);
    }
}
