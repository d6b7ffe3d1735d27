//! Standard streams host for the agent.
//!
//! The host stands in for the platform: it reads one JSON event per line and
//! writes displayed notifications and configuration broadcasts as JSON lines.
//!
//! ```text
//! stdin  ──► parse_event ──► mpsc ──► Agent::run
//! stdout ◄── OutputSink ◄─┬── ConsoleNotifier      (notifications)
//!                         └── forward_broadcasts   (getConfig replies)
//! ```

mod output;

use log::{debug, error, info, warn};
use serde::Deserialize;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite},
    sync::{
        broadcast::{self, error::RecvError},
        mpsc,
    },
};

pub use crate::host::output::{ConsoleNotifier, OutboundLine, OutputSink};
use crate::{
    agent::{AgentEvent, ClientMessage},
    alerts::AlertConfiguration,
};

/// One inbound line.
///
/// ```json
/// {"push": "H4sIAAAAAAAA..."}
/// {"type": "getConfig", "message": null}
/// ```
#[derive(Deserialize)]
#[serde(untagged)]
enum InboundLine {
    Push { push: String },
    Message(ClientMessage),
}

impl From<InboundLine> for AgentEvent {
    fn from(line: InboundLine) -> Self {
        match line {
            InboundLine::Push { push } => AgentEvent::Push(push),
            InboundLine::Message(message) => AgentEvent::Message(message),
        }
    }
}

/// Parses one inbound line into an [`AgentEvent`].
pub fn parse_event(line: &str) -> Result<AgentEvent, serde_json::Error> {
    serde_json::from_str::<InboundLine>(line).map(AgentEvent::from)
}

/// Reads events from `reader` and forwards them to the agent.
///
/// Blank lines are skipped and unreadable lines are logged and skipped.
/// Returns at end of input or once the agent stopped listening; dropping
/// `events` then lets the agent drain and stop.
///
/// # Errors
///
/// Returns an error if reading from `reader` fails.
pub async fn forward_events<R: AsyncBufRead + Unpin>(
    reader: R,
    events: mpsc::Sender<AgentEvent>,
) -> anyhow::Result<()> {
    let mut lines = reader.lines();
    let mut forwarded = 0usize;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let event = match parse_event(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!("ignoring unreadable event: {}", e);
                continue;
            }
        };

        if events.send(event).await.is_err() {
            warn!("agent stopped, dropping remaining input");
            break;
        }
        forwarded += 1;
    }

    info!("input closed after {} events", forwarded);
    Ok(())
}

/// Writes every configuration broadcast received by `client` to `sink`.
///
/// Returns once the agent is dropped.
pub async fn forward_broadcasts<W: AsyncWrite + Unpin>(
    mut client: broadcast::Receiver<Option<AlertConfiguration>>,
    sink: OutputSink<W>,
) {
    loop {
        match client.recv().await {
            Ok(config) => {
                if let Err(e) = sink.write(&OutboundLine::Broadcast(&config)).await {
                    error!("failed to write broadcast: {}", e);
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("output too slow, skipped {} broadcasts", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }

    debug!("broadcast forwarding stopped");
}
