//! Reconnecting telemetry client
//!
//! [`TelemetryClient`] keeps one connection to the metrics feed open for as
//! long as it runs:
//!
//! - every text frame is decoded and forwarded to a [`TelemetryView`]
//! - a ping is sent on a fixed interval while the connection is open
//! - when the connection closes or fails, it waits a fixed delay and
//!   connects again, indefinitely
//!
//! The transport sits behind [`TelemetryConnector`] so tests can drive the
//! loop with in-process connections.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::telemetry::frame::{parse_frames, MetricSample, TelemetryFrame};
use crate::telemetry::series::MetricSeries;

/// Connection state shown next to the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// First connection attempt in progress
    Connecting,
    /// Socket open
    Connected,
    /// Connection attempt or open socket failed
    Error,
    /// Waiting out the delay before the next attempt
    Reconnecting,
    /// Client shut down
    Stopped,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting..."),
            Self::Connected => write!(f, "Connected"),
            Self::Error => write!(f, "Connection error"),
            Self::Reconnecting => write!(f, "Reconnecting..."),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Opens connections to the telemetry feed
#[async_trait]
pub trait TelemetryConnector: Send + Sync {
    /// Connect to `url`
    async fn connect(&self, url: &str) -> Result<Box<dyn TelemetryConnection>>;
}

/// One open telemetry connection
#[async_trait]
pub trait TelemetryConnection: Send {
    /// Send a text frame
    async fn send(&mut self, text: String) -> Result<()>;

    /// Next text frame; `None` once the peer closed the connection
    async fn recv(&mut self) -> Option<Result<String>>;
}

/// Receives everything the client has to show
pub trait TelemetryView: Send {
    /// Connection state changed
    fn set_status(&mut self, status: ConnectionStatus);

    /// Latest point values
    fn show_sample(&mut self, sample: &MetricSample);

    /// Connected user count
    fn show_user_count(&mut self, count: u64);

    /// Series changed; redraw the chart
    fn redraw(&mut self, series: &MetricSeries);
}

enum SessionEnd {
    Closed,
    Failed(anyhow::Error),
    Cancelled,
}

/// Telemetry feed client, configured but not yet running
pub struct TelemetryClient {
    url: String,
    reconnect_delay: Duration,
    ping_interval: Duration,
    series: MetricSeries,
    connector: Arc<dyn TelemetryConnector>,
    view: Box<dyn TelemetryView>,
    status_tx: watch::Sender<ConnectionStatus>,
}

impl TelemetryClient {
    /// Create a client for `url`
    pub fn new(
        url: &str,
        config: &TelemetryConfig,
        connector: Arc<dyn TelemetryConnector>,
        view: Box<dyn TelemetryView>,
    ) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Connecting);
        Self {
            url: url.to_string(),
            reconnect_delay: config.reconnect_delay(),
            ping_interval: config.ping_interval(),
            series: MetricSeries::new(config.capacity),
            connector,
            view,
            status_tx,
        }
    }

    /// Spawn the connection loop on the current runtime
    pub fn start(self) -> TelemetryHandle {
        let cancel = CancellationToken::new();
        let status = self.status_tx.subscribe();
        let token = cancel.clone();
        let task = tokio::spawn(async move { self.run(token).await });

        TelemetryHandle {
            cancel,
            status,
            task,
        }
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        tracing::debug!(status = ?status, "Telemetry status");
        self.view.set_status(status);
        self.status_tx.send_replace(status);
    }

    async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(url = %self.url, "Starting telemetry client");
        self.set_status(ConnectionStatus::Connecting);

        loop {
            let connected = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.connector.connect(&self.url) => result,
            };

            let end = match connected {
                Ok(connection) => {
                    tracing::info!(url = %self.url, "Telemetry connected");
                    self.set_status(ConnectionStatus::Connected);
                    self.session(connection, &cancel).await
                }
                Err(e) => SessionEnd::Failed(e),
            };

            match end {
                SessionEnd::Cancelled => break,
                SessionEnd::Closed => {
                    tracing::info!(
                        delay_ms = self.reconnect_delay.as_millis() as u64,
                        "Telemetry connection closed, reconnecting"
                    );
                }
                SessionEnd::Failed(e) => {
                    tracing::warn!(error = %e, "Telemetry connection failed");
                    self.set_status(ConnectionStatus::Error);
                }
            }

            self.set_status(ConnectionStatus::Reconnecting);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        self.set_status(ConnectionStatus::Stopped);
        tracing::info!("Telemetry client stopped");
    }

    async fn session(
        &mut self,
        mut connection: Box<dyn TelemetryConnection>,
        cancel: &CancellationToken,
    ) -> SessionEnd {
        let mut ping = interval_at(Instant::now() + self.ping_interval, self.ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return SessionEnd::Cancelled,
                frame = connection.recv() => match frame {
                    Some(Ok(text)) => self.handle_text(&text),
                    Some(Err(e)) => return SessionEnd::Failed(e),
                    None => return SessionEnd::Closed,
                },
                _ = ping.tick() => {
                    if let Err(e) = connection.send(ping_message()).await {
                        return SessionEnd::Failed(e);
                    }
                }
            }
        }
    }

    fn handle_text(&mut self, text: &str) {
        let frames = match parse_frames(text) {
            Ok(frames) => frames,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping telemetry frame");
                return;
            }
        };

        for frame in frames {
            match frame {
                TelemetryFrame::Sample(sample) => {
                    self.view.show_sample(&sample);
                    self.series.push(&sample);
                    self.view.redraw(&self.series);
                }
                TelemetryFrame::UserCount(count) => self.view.show_user_count(count),
                TelemetryFrame::Connection {
                    user_id,
                    user_count,
                } => {
                    tracing::info!(user_id = ?user_id, "Telemetry session registered");
                    if let Some(count) = user_count {
                        self.view.show_user_count(count);
                    }
                }
            }
        }
    }
}

/// Keep-alive frame
pub fn ping_message() -> String {
    serde_json::json!({
        "type": "ping",
        "timestamp": chrono::Utc::now().timestamp_millis(),
    })
    .to_string()
}

/// Running telemetry client
pub struct TelemetryHandle {
    cancel: CancellationToken,
    status: watch::Receiver<ConnectionStatus>,
    task: JoinHandle<()>,
}

impl TelemetryHandle {
    /// Current connection status
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Stop the loop and wait for it to exit
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Telemetry task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct Recorded {
        statuses: Vec<ConnectionStatus>,
        samples: usize,
        users: Vec<u64>,
        series_len: usize,
    }

    struct RecordingView(Arc<Mutex<Recorded>>);

    impl TelemetryView for RecordingView {
        fn set_status(&mut self, status: ConnectionStatus) {
            self.0.lock().unwrap().statuses.push(status);
        }
        fn show_sample(&mut self, _sample: &MetricSample) {
            self.0.lock().unwrap().samples += 1;
        }
        fn show_user_count(&mut self, count: u64) {
            self.0.lock().unwrap().users.push(count);
        }
        fn redraw(&mut self, series: &MetricSeries) {
            self.0.lock().unwrap().series_len = series.len();
        }
    }

    /// Serves one scripted connection per frame list, then refuses
    struct ScriptedConnector {
        scripts: Mutex<Vec<Vec<String>>>,
        sent: mpsc::UnboundedSender<String>,
    }

    struct ScriptedConnection {
        frames: std::vec::IntoIter<String>,
        sent: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl TelemetryConnector for ScriptedConnector {
        async fn connect(&self, _url: &str) -> Result<Box<dyn TelemetryConnection>> {
            let mut scripts = self.scripts.lock().unwrap();
            if scripts.is_empty() {
                anyhow::bail!("refused");
            }
            let frames = scripts.remove(0);
            Ok(Box::new(ScriptedConnection {
                frames: frames.into_iter(),
                sent: self.sent.clone(),
            }))
        }
    }

    #[async_trait]
    impl TelemetryConnection for ScriptedConnection {
        async fn send(&mut self, text: String) -> Result<()> {
            let _ = self.sent.send(text);
            Ok(())
        }
        async fn recv(&mut self) -> Option<Result<String>> {
            self.frames.next().map(Ok)
        }
    }

    fn config() -> TelemetryConfig {
        TelemetryConfig {
            capacity: 30,
            reconnect_delay_ms: 5000,
            ping_interval_ms: 20000,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_dispatched_and_reconnect_after_close() {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let (sent_tx, _sent_rx) = mpsc::unbounded_channel();
        let connector = Arc::new(ScriptedConnector {
            scripts: Mutex::new(vec![
                vec![
                    r#"{"cpu":10,"ram":20,"temperature":30}"#.to_string(),
                    "garbage".to_string(),
                    r#"{"type":"user_count","count":2}"#.to_string(),
                ],
                vec![r#"{"type":"connection","userId":"u","userCount":5}"#.to_string()],
            ]),
            sent: sent_tx,
        });

        let handle = TelemetryClient::new(
            "ws://test",
            &config(),
            connector,
            Box::new(RecordingView(Arc::clone(&recorded))),
        )
        .start();

        tokio::time::sleep(Duration::from_millis(5100)).await;
        handle.stop().await;

        let recorded = recorded.lock().unwrap();
        use ConnectionStatus::*;
        assert_eq!(
            &recorded.statuses[..5],
            &[Connecting, Connected, Reconnecting, Connected, Reconnecting]
        );
        assert_eq!(recorded.statuses.last(), Some(&Stopped));
        assert_eq!(recorded.samples, 1);
        assert_eq!(recorded.series_len, 1);
        assert_eq!(recorded.users, vec![2, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_connection_reports_error_then_reconnecting() {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let (sent_tx, _sent_rx) = mpsc::unbounded_channel();
        let connector = Arc::new(ScriptedConnector {
            scripts: Mutex::new(Vec::new()),
            sent: sent_tx,
        });
        let handle = TelemetryClient::new(
            "ws://test",
            &config(),
            connector,
            Box::new(RecordingView(Arc::clone(&recorded))),
        )
        .start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(handle.status(), ConnectionStatus::Reconnecting);
        handle.stop().await;

        let statuses = recorded.lock().unwrap().statuses.clone();
        use ConnectionStatus::*;
        assert_eq!(&statuses[..3], &[Connecting, Error, Reconnecting]);
    }

    #[test]
    fn test_ping_message_shape() {
        let value: serde_json::Value = serde_json::from_str(&ping_message()).unwrap();
        assert_eq!(value["type"], "ping");
        assert!(value["timestamp"].as_i64().unwrap() > 0);
    }
}
