//! The background agent reacting to pushes and foreground messages.
//!
//! This module provides the [`Agent`], which owns the configuration gate, the
//! notification dispatcher and the set of connected foreground contexts.
//!
//! # Event Processing
//!
//! ```text
//! AgentEvent::Push(payload)    → decode → [gate: load → evaluate → dispatch]
//! AgentEvent::Message(setConfig) →        [gate: save]
//! AgentEvent::Message(getConfig) →        [gate: load → broadcast]
//! ```
//!
//! Events are processed concurrently on a single task: handlers interleave
//! only while waiting on I/O, and the gate serializes every access to the
//! stored configuration. Between two events the agent is idle.

mod router;

use futures::{StreamExt, stream};
use log::{debug, error, info, warn};
use tokio::sync::{broadcast, mpsc};

pub use crate::agent::router::ClientMessage;
use crate::{
    alerts::{AlertConfiguration, ConfigGate, ConfigStore, evaluate},
    config::Config,
    notify::{DispatchReport, NotificationDispatcher, Notifier, NotifyError},
    rides::decode_payload,
};

/// An inbound event for the agent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AgentEvent {
    /// A push delivery and its opaque payload.
    Push(String),
    /// A message from a foreground context.
    Message(ClientMessage),
}

/// Background agent evaluating pushes against the stored configuration.
///
/// # Examples
///
/// ```no_run
/// use ridealert::{agent::Agent, alerts::FileConfigStore, config::Config};
///
/// # async fn example(notifier: impl ridealert::notify::Notifier) {
/// let config = Config::default();
/// let agent = Agent::new(FileConfigStore::new("./data"), notifier, &config);
///
/// let mut client = agent.connect_client();
/// agent.get_configuration().await;
/// let snapshot = client.recv().await;
/// # }
/// ```
pub struct Agent<S: ConfigStore, N: Notifier> {
    /// Exclusive access to the stored configuration
    gate: ConfigGate<S>,
    /// Displays the notifications of each push
    dispatcher: NotificationDispatcher<N>,
    /// Connected foreground contexts
    clients: broadcast::Sender<Option<AlertConfiguration>>,
}

impl<S: ConfigStore, N: Notifier> Agent<S, N> {
    /// Creates a new [`Agent`].
    ///
    /// # Arguments
    ///
    /// * `store` - The process' configuration store. The agent is its only user.
    /// * `notifier` - Displays notifications on the platform.
    /// * `config` - Agent settings.
    pub fn new(store: S, notifier: N, config: &Config) -> Self {
        let (clients, _) = broadcast::channel(config.agent.broadcast_capacity);

        Agent {
            gate: ConfigGate::new(store),
            dispatcher: NotificationDispatcher::new(notifier, config.notification.clone()),
            clients,
        }
    }

    /// Connects a foreground context.
    ///
    /// The returned receiver gets every configuration broadcast until dropped.
    pub fn connect_client(&self) -> broadcast::Receiver<Option<AlertConfiguration>> {
        debug!("client connected");
        self.clients.subscribe()
    }

    /// Handles one push delivery.
    ///
    /// A payload that fails to decode counts as a push without ride records,
    /// and an unavailable store counts as an unset configuration. Both end with
    /// the fallback notification, so a push always displays something.
    ///
    /// # Errors
    ///
    /// Returns a [`NotifyError`] if the platform refused a notification. The
    /// push delivery is then lost.
    pub async fn handle_push(&self, payload: &str) -> Result<DispatchReport, NotifyError> {
        let records = match decode_payload(payload) {
            Ok(records) => records,
            Err(e) => {
                warn!("{}, handling push without records", e);
                Vec::new()
            }
        };
        debug!(
            "received push with rides [{}]",
            records
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let report = self
            .gate
            .run_exclusive(async |store| {
                let config = match store.load().await {
                    Ok(config) => config,
                    Err(e) => {
                        error!("failed to load configuration, evaluating as unset: {}", e);
                        None
                    }
                };

                let evaluation = evaluate(config.as_ref(), &records);
                self.dispatcher.dispatch(&evaluation).await
            })
            .await?;

        info!(
            "handled push, displayed {} notifications",
            report.displayed()
        );

        Ok(report)
    }

    /// Handles one inbound event.
    pub async fn handle_event(&self, event: AgentEvent) {
        match event {
            AgentEvent::Push(payload) => {
                if let Err(e) = self.handle_push(&payload).await {
                    error!("push delivery failed: {}", e);
                }
            }
            AgentEvent::Message(message) => self.handle_message(message).await,
        }
    }

    /// Processes events until every sender of `events` is dropped.
    ///
    /// Events are handled concurrently; in-flight events are finished before
    /// returning.
    pub async fn run(&self, mut events: mpsc::Receiver<AgentEvent>) {
        info!("agent ready, waiting for events");

        stream::poll_fn(|cx| events.poll_recv(cx))
            .for_each_concurrent(None, |event| self.handle_event(event))
            .await;

        info!("event source closed, agent stopped");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        alerts::{
            AlertCondition, FileConfigStore, MockConfigStore, RideAlertRule, StoreError,
        },
        notify::{MockNotifier, Notification},
        rides::encode_gzip,
    };
    use std::{
        collections::HashSet,
        io,
        path::Path,
        sync::{Arc, Mutex as StdMutex},
    };
    use tempfile::TempDir;
    use tokio::time::{Duration, sleep};

    /// Notifier keeping every displayed notification.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingNotifier {
        pub shown: Arc<StdMutex<Vec<Notification>>>,
    }

    impl RecordingNotifier {
        pub fn tags(&self) -> Vec<Option<String>> {
            self.shown
                .lock()
                .unwrap()
                .iter()
                .map(|n| n.tag.clone())
                .collect()
        }
    }

    impl Notifier for RecordingNotifier {
        async fn show(&self, notification: Notification) -> Result<(), NotifyError> {
            self.shown.lock().unwrap().push(notification);
            Ok(())
        }
    }

    pub(crate) fn create_test_config() -> AlertConfiguration {
        AlertConfiguration {
            park_identifier: "magic-kingdom".to_string(),
            rides: vec![
                RideAlertRule {
                    ride_name: "Space Mountain".to_string(),
                    alert_condition: AlertCondition::Open,
                },
                RideAlertRule {
                    ride_name: "Haunted Mansion".to_string(),
                    alert_condition: AlertCondition::WaitAtMost(30),
                },
            ],
        }
    }

    pub(crate) fn create_agent(
        data_dir: &Path,
    ) -> (Agent<FileConfigStore, RecordingNotifier>, RecordingNotifier) {
        let notifier = RecordingNotifier::default();
        let agent = Agent::new(
            FileConfigStore::new(data_dir),
            notifier.clone(),
            &Config::default(),
        );
        (agent, notifier)
    }

    fn push_payload(json: &str) -> String {
        encode_gzip(json)
    }

    #[tokio::test]
    async fn test_push_notifies_matching_rides() {
        let temp_dir = TempDir::new().unwrap();
        let (agent, notifier) = create_agent(temp_dir.path());
        agent.set_configuration(create_test_config()).await;

        let payload = push_payload(
            r#"[{"name":"Space Mountain","status":{"Wait":12}},{"name":"Haunted Mansion","status":{"Wait":45}}]"#,
        );
        let report = agent.handle_push(&payload).await.unwrap();

        assert_eq!(report.tags, vec!["Space Mountain"]);
        assert!(!report.fallback);

        let shown = notifier.shown.lock().unwrap();
        assert_eq!(shown.len(), 1);
        assert_eq!(
            shown[0].body,
            "Space Mountain is Open with a wait of 12 minutes!"
        );
    }

    #[tokio::test]
    async fn test_push_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let (agent, notifier) = create_agent(temp_dir.path());
        agent.set_configuration(create_test_config()).await;

        let payload = push_payload(
            r#"[{"name":"Space Mountain","status":"Open"},{"name":"Haunted Mansion","status":{"Wait":10}}]"#,
        );
        let first = agent.handle_push(&payload).await.unwrap();
        let second = agent.handle_push(&payload).await.unwrap();

        assert_eq!(first, second);

        // Same tags twice: the platform replaces instead of stacking
        let distinct: HashSet<Option<String>> = notifier.tags().into_iter().collect();
        assert_eq!(distinct.len(), 2);
    }

    #[tokio::test]
    async fn test_push_with_unset_configuration_shows_fallback() {
        let temp_dir = TempDir::new().unwrap();
        let (agent, notifier) = create_agent(temp_dir.path());

        let payload = push_payload(r#"[{"name":"Space Mountain","status":"Open"}]"#);
        let report = agent.handle_push(&payload).await.unwrap();

        assert!(report.fallback);
        assert_eq!(notifier.tags(), vec![None]);
    }

    #[tokio::test]
    async fn test_push_with_empty_configuration_shows_fallback() {
        let temp_dir = TempDir::new().unwrap();
        let (agent, notifier) = create_agent(temp_dir.path());
        agent.set_configuration(AlertConfiguration::empty()).await;

        let payload = push_payload(r#"[{"name":"Space Mountain","status":"Open"}]"#);
        agent.handle_push(&payload).await.unwrap();

        assert_eq!(notifier.tags(), vec![None]);
    }

    #[tokio::test]
    async fn test_push_without_match_shows_fallback() {
        let temp_dir = TempDir::new().unwrap();
        let (agent, notifier) = create_agent(temp_dir.path());
        agent.set_configuration(create_test_config()).await;

        let payload = push_payload(
            r#"[{"name":"Space Mountain","status":"Closed"},{"name":"Other","status":"Open"}]"#,
        );
        let report = agent.handle_push(&payload).await.unwrap();

        assert!(report.tags.is_empty());
        assert!(report.fallback);
        assert_eq!(notifier.tags(), vec![None]);
    }

    #[tokio::test]
    async fn test_malformed_payloads_show_fallback() {
        let temp_dir = TempDir::new().unwrap();
        let (agent, notifier) = create_agent(temp_dir.path());
        agent.set_configuration(create_test_config()).await;

        for payload in [
            "%%% not base64 %%%",
            "aGVsbG8gd29ybGQ=",
            "",
            &push_payload("not json"),
        ] {
            let report = agent.handle_push(payload).await.unwrap();
            assert!(report.fallback);
            assert!(report.tags.is_empty());
        }

        assert_eq!(notifier.tags(), vec![None, None, None, None]);
    }

    #[tokio::test]
    async fn test_push_with_unavailable_store_shows_fallback() {
        let mut store = MockConfigStore::new();
        store
            .expect_load()
            .times(1)
            .returning(|| Err(StoreError::Io(io::Error::other("disk gone"))));
        let notifier = RecordingNotifier::default();
        let agent = Agent::new(store, notifier.clone(), &Config::default());

        let payload = push_payload(r#"[{"name":"Space Mountain","status":"Open"}]"#);
        let report = agent.handle_push(&payload).await.unwrap();

        assert!(report.fallback);
        assert_eq!(notifier.tags(), vec![None]);
    }

    #[tokio::test]
    async fn test_push_with_refused_notification_fails() {
        let temp_dir = TempDir::new().unwrap();
        let mut notifier = MockNotifier::new();
        notifier
            .expect_show()
            .times(1)
            .returning(|_| Err(NotifyError::Refused("permission revoked".to_string())));
        let agent = Agent::new(
            FileConfigStore::new(temp_dir.path()),
            notifier,
            &Config::default(),
        );

        let result = agent.handle_push(&push_payload("[]")).await;

        assert!(matches!(result, Err(NotifyError::Refused(_))));
    }

    /// Store whose writes are visible rule by rule while in progress.
    #[derive(Default)]
    struct SlowStore {
        park: StdMutex<Option<String>>,
        rides: StdMutex<Vec<RideAlertRule>>,
    }

    impl ConfigStore for SlowStore {
        async fn load(&self) -> Result<Option<AlertConfiguration>, StoreError> {
            sleep(Duration::from_millis(1)).await;
            let park = self.park.lock().unwrap().clone();
            Ok(park.map(|park_identifier| AlertConfiguration {
                park_identifier,
                rides: self.rides.lock().unwrap().clone(),
            }))
        }

        async fn save(&self, config: &AlertConfiguration) -> Result<(), StoreError> {
            *self.park.lock().unwrap() = Some(config.park_identifier.clone());
            self.rides.lock().unwrap().clear();
            for rule in &config.rides {
                sleep(Duration::from_millis(2)).await;
                self.rides.lock().unwrap().push(rule.clone());
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_push_never_observes_partial_configuration() {
        let before = AlertConfiguration {
            park_identifier: "epcot".to_string(),
            rides: vec![RideAlertRule {
                ride_name: "Z".to_string(),
                alert_condition: AlertCondition::Open,
            }],
        };
        let after = AlertConfiguration {
            park_identifier: "magic-kingdom".to_string(),
            rides: ["X", "Y"]
                .iter()
                .map(|name| RideAlertRule {
                    ride_name: name.to_string(),
                    alert_condition: AlertCondition::Open,
                })
                .collect(),
        };
        let payload = push_payload(
            r#"[{"name":"X","status":"Open"},{"name":"Y","status":"Open"},{"name":"Z","status":"Open"}]"#,
        );

        for delay in 0..8 {
            for push_first in [true, false] {
                let agent = Agent::new(
                    SlowStore::default(),
                    RecordingNotifier::default(),
                    &Config::default(),
                );
                agent.set_configuration(before.clone()).await;

                let set = async {
                    if push_first {
                        sleep(Duration::from_millis(delay)).await;
                    }
                    agent.set_configuration(after.clone()).await;
                };
                let push = async {
                    if !push_first {
                        sleep(Duration::from_millis(delay)).await;
                    }
                    agent.handle_push(&payload).await.unwrap()
                };
                let (_, report) = tokio::join!(set, push);

                assert!(!report.fallback);
                assert!(
                    report.tags == vec!["Z"] || report.tags == vec!["X", "Y"],
                    "observed partial configuration: {:?}",
                    report.tags
                );
            }
        }
    }

    #[tokio::test]
    async fn test_run_processes_events_until_closed() {
        let temp_dir = TempDir::new().unwrap();
        let (agent, notifier) = create_agent(temp_dir.path());
        let mut client = agent.connect_client();
        let (sender, receiver) = mpsc::channel(8);

        sender
            .send(AgentEvent::Message(ClientMessage::SetConfig(
                create_test_config(),
            )))
            .await
            .unwrap();
        drop(sender);
        agent.run(receiver).await;

        let (sender, receiver) = mpsc::channel(8);
        sender
            .send(AgentEvent::Push(push_payload(
                r#"[{"name":"Haunted Mansion","status":{"Wait":30}}]"#,
            )))
            .await
            .unwrap();
        sender
            .send(AgentEvent::Message(ClientMessage::GetConfig))
            .await
            .unwrap();
        drop(sender);
        agent.run(receiver).await;

        assert_eq!(
            notifier.tags(),
            vec![Some("Haunted Mansion".to_string())]
        );
        assert_eq!(client.recv().await.unwrap(), Some(create_test_config()));
    }

    #[tokio::test]
    async fn test_run_survives_refused_notification() {
        let temp_dir = TempDir::new().unwrap();
        let mut notifier = MockNotifier::new();
        notifier
            .expect_show()
            .times(2)
            .returning(|_| Err(NotifyError::Refused("permission revoked".to_string())));
        let agent = Agent::new(
            FileConfigStore::new(temp_dir.path()),
            notifier,
            &Config::default(),
        );
        let (sender, receiver) = mpsc::channel(8);

        sender.send(AgentEvent::Push(push_payload("[]"))).await.unwrap();
        sender.send(AgentEvent::Push(push_payload("[]"))).await.unwrap();
        drop(sender);

        agent.run(receiver).await;
    }
}
