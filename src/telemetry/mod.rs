//! Live system telemetry over WebSocket
//!
//! - [`frame`]: inbound frame decoding
//! - [`series`]: bounded metric history
//! - [`client`]: the reconnecting client loop and its seams
//! - [`ws`]: the `tokio-tungstenite` transport
//! - [`dashboard`]: terminal view

pub mod client;
pub mod dashboard;
pub mod frame;
pub mod series;
pub mod ws;

pub use client::{
    ping_message, ConnectionStatus, TelemetryClient, TelemetryConnection, TelemetryConnector,
    TelemetryHandle, TelemetryView,
};
pub use dashboard::TerminalDashboard;
pub use frame::{parse_frames, MetricSample, TelemetryFrame};
pub use series::{MetricSeries, RingBuffer};
pub use ws::WsConnector;
