//! Messages sent by foreground contexts.
//!
//! Foreground contexts set the configuration the user built, and ask for the
//! stored one after a reload. Both go through the configuration gate.

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    agent::Agent,
    alerts::{AlertConfiguration, ConfigStore},
    notify::Notifier,
};

/// A request from a foreground context.
///
/// ```json
/// {"type": "setConfig", "message": ["epcot", [{"rideName": "Frozen", "alertOn": "Open"}]]}
/// {"type": "getConfig", "message": null}
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ClientMessage {
    /// Replace the stored configuration. Nothing is sent back.
    #[serde(rename = "setConfig")]
    SetConfig(AlertConfiguration),
    /// Broadcast the stored configuration to every foreground context.
    #[serde(rename = "getConfig")]
    GetConfig,
}

impl<S: ConfigStore, N: Notifier> Agent<S, N> {
    /// Routes a message to its handler.
    pub async fn handle_message(&self, message: ClientMessage) {
        match message {
            ClientMessage::SetConfig(config) => self.set_configuration(config).await,
            ClientMessage::GetConfig => {
                self.get_configuration().await;
            }
        }
    }

    /// Replaces the stored configuration with `config`.
    ///
    /// The configuration is normalized first so that each ride has one rule.
    /// A configuration configuring rides without a park is dropped.
    ///
    /// The write completes before the gate is released. When it fails the
    /// update is lost: the failure is logged and not retried.
    pub async fn set_configuration(&self, config: AlertConfiguration) {
        if let Err(e) = config.validate() {
            warn!("ignoring invalid configuration: {}", e);
            return;
        }
        let config = config.normalized();
        debug!("received configuration {}", config);

        let saved = self
            .gate
            .run_exclusive(async |store| store.save(&config).await)
            .await;

        match saved {
            Ok(()) => info!(
                "configured {} rides for park {}",
                config.rides.len(),
                config.park_identifier
            ),
            Err(e) => error!("failed to save configuration, update lost: {}", e),
        }
    }

    /// Reads the stored configuration and broadcasts it to every connected
    /// foreground context, not only the requester.
    ///
    /// # Returns
    ///
    /// The broadcast snapshot, `None` when no configuration is stored or the
    /// store is unavailable.
    pub async fn get_configuration(&self) -> Option<AlertConfiguration> {
        self.gate
            .run_exclusive(async |store| {
                let config = match store.load().await {
                    Ok(config) => config,
                    Err(e) => {
                        error!("failed to load configuration, broadcasting unset: {}", e);
                        None
                    }
                };

                match self.clients.send(config.clone()) {
                    Ok(count) => debug!("broadcast configuration to {} clients", count),
                    Err(_) => warn!("no connected client to broadcast configuration to"),
                }

                config
            })
            .await
    }
}
