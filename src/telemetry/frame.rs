//! Inbound telemetry frames
//!
//! Frames are JSON objects without a single discriminator: a frame with a
//! `cpu` key is a metrics sample, and `type` selects the user-counter
//! messages. One object may carry both.

use chrono::{DateTime, Local};
use serde_json::Value;

use crate::error::{RagstreamError, Result};
use crate::stream::envelope::value_text;

/// One system metrics reading
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    /// CPU utilisation in percent
    pub cpu: f64,
    /// Memory utilisation in percent
    pub ram: f64,
    /// Temperature in °C
    pub temperature: f64,
    /// Process count as sent, when present
    pub processes: Option<String>,
    /// Local time the frame was received
    pub received_at: DateTime<Local>,
}

/// Decoded telemetry message
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryFrame {
    /// Metrics reading
    Sample(MetricSample),
    /// Number of connected users
    UserCount(u64),
    /// Greeting sent after the socket opens
    Connection {
        /// Identifier the server assigned to this client
        user_id: Option<String>,
        /// Number of connected users
        user_count: Option<u64>,
    },
}

/// Lenient numeric parse: numbers pass through, strings yield their
/// leading decimal number, anything else or a non-finite result is 0.
///
/// # Examples
///
/// ```
/// use ragstream::telemetry::frame::parse_metric;
/// use serde_json::json;
///
/// assert_eq!(parse_metric(&json!(42.5)), 42.5);
/// assert_eq!(parse_metric(&json!("61.3°C")), 61.3);
/// assert_eq!(parse_metric(&json!("n/a")), 0.0);
/// assert_eq!(parse_metric(&json!(null)), 0.0);
/// ```
pub fn parse_metric(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => leading_number(s.trim_start()),
        _ => 0.0,
    };
    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

fn leading_number(s: &str) -> f64 {
    let bytes = s.as_bytes();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }

    if !seen_digit {
        return 0.0;
    }

    // Optional exponent, only if followed by digits
    let mut exp_end = end;
    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut i = end + 1;
        if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
            i += 1;
        }
        let digits_start = i;
        while matches!(bytes.get(i), Some(b'0'..=b'9')) {
            i += 1;
        }
        if i > digits_start {
            exp_end = i;
        }
    }

    s[..exp_end].parse().unwrap_or(0.0)
}

fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Decode a text frame into zero or more [`TelemetryFrame`]s.
///
/// # Errors
///
/// Returns [`RagstreamError::Telemetry`] if the text is not a JSON object.
pub fn parse_frames(text: &str) -> Result<Vec<TelemetryFrame>> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| RagstreamError::Telemetry(format!("Invalid frame: {}", e)))?;
    let Value::Object(fields) = value else {
        return Err(RagstreamError::Telemetry("Frame is not a JSON object".to_string()).into());
    };

    let mut frames = Vec::new();

    if let Some(cpu) = fields.get("cpu") {
        let metric = |key: &str| fields.get(key).map(parse_metric).unwrap_or(0.0);
        frames.push(TelemetryFrame::Sample(MetricSample {
            cpu: parse_metric(cpu),
            ram: metric("ram"),
            temperature: metric("temperature"),
            processes: fields
                .get("processes")
                .filter(|v| !v.is_null())
                .map(value_text),
            received_at: Local::now(),
        }));
    }

    match fields.get("type").and_then(Value::as_str) {
        Some("user_count") => match fields.get("count").and_then(as_count) {
            Some(count) => frames.push(TelemetryFrame::UserCount(count)),
            None => tracing::warn!("user_count frame without a usable count"),
        },
        Some("connection") => {
            frames.push(TelemetryFrame::Connection {
                user_id: fields.get("userId").filter(|v| !v.is_null()).map(value_text),
                user_count: fields.get("userCount").and_then(as_count),
            });
        }
        Some(other) => tracing::debug!(frame_type = %other, "Ignoring telemetry frame type"),
        None => {}
    }

    Ok(frames)
}
