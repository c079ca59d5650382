//! Terminal rendering of the telemetry feed

use std::io::Write;

use colored::Colorize;

use crate::telemetry::client::{ConnectionStatus, TelemetryView};
use crate::telemetry::frame::MetricSample;
use crate::telemetry::series::MetricSeries;

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Render values on a fixed 0..=100 scale as a one-line bar chart
///
/// # Examples
///
/// ```
/// use ragstream::telemetry::dashboard::sparkline;
///
/// assert_eq!(sparkline(&[0.0, 50.0, 100.0, 250.0]), "▁▅██");
/// ```
pub fn sparkline(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| {
            let clamped = v.clamp(0.0, 100.0);
            let index = ((clamped / 100.0) * (BARS.len() - 1) as f64).round() as usize;
            BARS[index.min(BARS.len() - 1)]
        })
        .collect()
}

fn format_value(value: f64) -> String {
    // Whole numbers print without a fraction, like the feed sends them
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Prints telemetry to a terminal
pub struct TerminalDashboard<W: Write + Send> {
    out: W,
    chart: bool,
}

impl TerminalDashboard<std::io::Stdout> {
    /// Dashboard on standard output
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TerminalDashboard<W> {
    /// Dashboard writing to `out`
    pub fn new(out: W) -> Self {
        Self { out, chart: true }
    }

    /// Disable the sparkline chart
    pub fn without_chart(mut self) -> Self {
        self.chart = false;
        self
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text).and_then(|_| self.out.flush()) {
            tracing::debug!(error = %e, "Failed to write dashboard output");
        }
    }
}

impl<W: Write + Send> TelemetryView for TerminalDashboard<W> {
    fn set_status(&mut self, status: ConnectionStatus) {
        let dot = match status {
            ConnectionStatus::Connected => "●".green(),
            ConnectionStatus::Error => "●".red(),
            ConnectionStatus::Reconnecting | ConnectionStatus::Connecting => "●".yellow(),
            ConnectionStatus::Stopped => "●".dimmed(),
        };
        let text = format!("{} {}", dot, status);
        self.line(&text);
    }

    fn show_sample(&mut self, sample: &MetricSample) {
        let text = format!(
            "[{}] CPU {}%  RAM {}%  Temp {}°C  Processes {}",
            sample.received_at.format("%H:%M:%S"),
            format_value(sample.cpu),
            format_value(sample.ram),
            format_value(sample.temperature),
            sample.processes.as_deref().unwrap_or("--")
        );
        self.line(&text);
    }

    fn show_user_count(&mut self, count: u64) {
        let text = format!("{} {}", "Users online:".bold(), count);
        self.line(&text);
    }

    fn redraw(&mut self, series: &MetricSeries) {
        if !self.chart {
            return;
        }
        let rows = [
            ("CPU %  ", series.cpu()),
            ("RAM %  ", series.ram()),
            ("Temp °C", series.temperature()),
        ];
        for (label, values) in rows {
            let text = format!("  {} {}", label.dimmed(), sparkline(&values));
            self.line(&text);
        }
    }
}
