//! Settings of the ride alert agent.
//!
//! This module defines the settings file format and how it is loaded. Settings
//! tune how the agent presents notifications and buffers events; they are not
//! the user's alert configuration, which the agent receives from foreground
//! contexts and persists itself.
//!
//! # Settings File Format
//!
//! ```yaml
//! notification:
//!   # Title of ride notifications
//!   title: "Ride Alert"
//!   icon: "/icons/queueLogo@0,33x.png"
//!   badge: "/icons/apple-icon-72x72.png"
//!   # Notification shown when a push matched nothing
//!   fallback_title: "Oops"
//!   fallback_body: "..."
//!
//! agent:
//!   # Inbound events buffered before producers wait
//!   queue_size: 64
//!   # Configuration snapshots buffered per foreground context
//!   broadcast_capacity: 16
//! ```
//!
//! Every key is optional and falls back to the defaults above.
//!
//! # Environment Variable Overrides
//!
//! Any value can be overridden with a `RIDEALERT_` prefixed variable, using `__`
//! to separate sections:
//!
//! ```bash
//! export RIDEALERT_NOTIFICATION__TITLE="Queue Alert"
//! export RIDEALERT_AGENT__QUEUE_SIZE=128
//! ```

use std::path::Path;

use anyhow::bail;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};

/// Prefix of environment variables overriding settings.
const ENV_PREFIX: &str = "RIDEALERT_";

/// Root settings structure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Notification presentation settings
    #[serde(default)]
    pub notification: NotificationSettings,
    /// Event processing settings
    #[serde(default)]
    pub agent: AgentSettings,
}

/// Presentation of the notifications shown to the user.
///
/// None of these values changes which notifications are shown, only what they
/// look like.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Title of every ride notification.
    pub title: String,
    /// Icon attached to every notification.
    pub icon: String,
    /// Badge attached to every notification.
    pub badge: String,
    /// Title of the notification shown when nothing matched.
    pub fallback_title: String,
    /// Body of the notification shown when nothing matched.
    ///
    /// The platform requires one notification per push; this text only needs
    /// to tell the user nothing is wrong.
    pub fallback_body: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        NotificationSettings {
            title: "Ride Alert".to_string(),
            icon: "/icons/queueLogo@0,33x.png".to_string(),
            badge: "/icons/apple-icon-72x72.png".to_string(),
            fallback_title: "Oops".to_string(),
            fallback_body: "Your alert configuration got out of sync with the server. \
                Here is a notification so your device keeps delivering alerts. \
                There is nothing for you to do, this will resolve itself."
                .to_string(),
        }
    }
}

/// Buffering of inbound events and outbound broadcasts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Number of inbound events buffered before producers wait.
    pub queue_size: usize,
    /// Number of configuration snapshots buffered per foreground context.
    pub broadcast_capacity: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        AgentSettings {
            queue_size: 64,
            broadcast_capacity: 16,
        }
    }
}

impl Config {
    /// Loads the settings.
    ///
    /// Values are layered, later layers winning: defaults, then the YAML file
    /// when one is given, then `RIDEALERT_` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the given file does not exist, cannot be parsed,
    /// or if a value has the wrong type.
    pub fn load(path: Option<&str>) -> Result<Config, anyhow::Error> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        if let Some(path) = path {
            if !Path::new(path).is_file() {
                bail!("settings file {} not found", path);
            }
            figment = figment.merge(Yaml::file(path));
        }

        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        if config.agent.queue_size == 0 || config.agent.broadcast_capacity == 0 {
            bail!("agent queue_size and broadcast_capacity must be positive");
        }

        Ok(config)
    }
}
