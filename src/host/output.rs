//! Line oriented output shared by notifications and broadcasts.

use std::{io, sync::Arc};

use log::debug;
use serde::Serialize;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    alerts::AlertConfiguration,
    notify::{Notification, Notifier, NotifyError},
};

/// One line written by the host.
///
/// ```json
/// {"notification": {"title": "Ride Alert", "body": "Frozen is Open!", "icon": "...", "badge": "...", "tag": "Frozen"}}
/// {"broadcast": ["epcot", [{"rideName": "Frozen", "alertOn": "Open"}]]}
/// ```
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboundLine<'a> {
    Notification(&'a Notification),
    Broadcast(&'a Option<AlertConfiguration>),
}

/// Writes JSON lines to a shared writer.
///
/// Each line is written and flushed while holding the writer, so lines from
/// concurrent producers never mix.
pub struct OutputSink<W> {
    writer: Arc<Mutex<W>>,
}

impl<W: AsyncWrite + Unpin> OutputSink<W> {
    /// Creates a new [`OutputSink`] writing to `writer`.
    pub fn new(writer: W) -> Self {
        OutputSink {
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    /// Serializes `line` and writes it followed by a newline.
    pub async fn write(&self, line: &OutboundLine<'_>) -> io::Result<()> {
        let mut serialized = serde_json::to_vec(line)?;
        serialized.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(&serialized).await?;
        writer.flush().await
    }
}

impl<W> Clone for OutputSink<W> {
    fn clone(&self) -> Self {
        OutputSink {
            writer: Arc::clone(&self.writer),
        }
    }
}

#[cfg(test)]
impl OutputSink<Vec<u8>> {
    /// Returns the lines written so far.
    pub async fn lines(&self) -> Vec<String> {
        String::from_utf8(self.writer.lock().await.clone())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

/// Displays notifications by writing them to the host output.
///
/// A closed output refuses the notification: nobody is left to display it.
pub struct ConsoleNotifier<W> {
    sink: OutputSink<W>,
}

impl<W: AsyncWrite + Unpin> ConsoleNotifier<W> {
    /// Creates a new [`ConsoleNotifier`] writing to `sink`.
    pub fn new(sink: OutputSink<W>) -> Self {
        ConsoleNotifier { sink }
    }
}

impl<W: AsyncWrite + Unpin> Notifier for ConsoleNotifier<W> {
    async fn show(&self, notification: Notification) -> Result<(), NotifyError> {
        match self
            .sink
            .write(&OutboundLine::Notification(&notification))
            .await
        {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                return Err(NotifyError::Refused(format!("output closed: {}", e)));
            }
            Err(e) => return Err(e.into()),
        }
        debug!("displayed notification {:?}", notification.tag);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{AlertCondition, RideAlertRule};

    fn create_notification(tag: Option<&str>) -> Notification {
        Notification {
            title: "Ride Alert".to_string(),
            body: "Frozen is Open!".to_string(),
            icon: "icon.png".to_string(),
            badge: "badge.png".to_string(),
            tag: tag.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_notifier_writes_notification_line() {
        let sink = OutputSink::new(Vec::new());
        let notifier = ConsoleNotifier::new(sink.clone());

        notifier
            .show(create_notification(Some("Frozen")))
            .await
            .unwrap();

        assert_eq!(
            sink.lines().await,
            vec![
                r#"{"notification":{"title":"Ride Alert","body":"Frozen is Open!","icon":"icon.png","badge":"badge.png","tag":"Frozen"}}"#
            ]
        );
    }

    #[tokio::test]
    async fn test_untagged_notification_omits_tag() {
        let sink = OutputSink::new(Vec::new());
        let notifier = ConsoleNotifier::new(sink.clone());

        notifier.show(create_notification(None)).await.unwrap();

        let lines = sink.lines().await;
        assert_eq!(lines.len(), 1);
        assert!(!lines[0].contains("tag"));
    }

    #[tokio::test]
    async fn test_closed_output_refuses_notification() {
        let (writer, reader) = tokio::io::duplex(64);
        drop(reader);
        let notifier = ConsoleNotifier::new(OutputSink::new(writer));

        assert!(matches!(
            notifier.show(create_notification(Some("Frozen"))).await,
            Err(NotifyError::Refused(_))
        ));
    }

    #[tokio::test]
    async fn test_write_broadcast_lines() {
        let sink = OutputSink::new(Vec::new());
        let config = Some(AlertConfiguration {
            park_identifier: "epcot".to_string(),
            rides: vec![RideAlertRule {
                ride_name: "Frozen".to_string(),
                alert_condition: AlertCondition::Open,
            }],
        });

        sink.write(&OutboundLine::Broadcast(&config)).await.unwrap();
        sink.write(&OutboundLine::Broadcast(&None)).await.unwrap();

        assert_eq!(
            sink.lines().await,
            vec![
                r#"{"broadcast":["epcot",[{"rideName":"Frozen","alertOn":"Open"}]]}"#,
                r#"{"broadcast":null}"#
            ]
        );
    }
}
