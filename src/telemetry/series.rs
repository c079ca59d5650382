//! Fixed-capacity metric history

use std::collections::VecDeque;

use crate::telemetry::frame::MetricSample;

/// FIFO buffer that evicts its oldest entry once full
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Create a buffer holding at most `capacity` items (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an item, returning the evicted one when the buffer was full
    ///
    /// # Examples
    ///
    /// ```
    /// use ragstream::telemetry::series::RingBuffer;
    ///
    /// let mut buffer = RingBuffer::new(2);
    /// assert_eq!(buffer.push(1), None);
    /// assert_eq!(buffer.push(2), None);
    /// assert_eq!(buffer.push(3), Some(1));
    /// assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![2, 3]);
    /// ```
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Items from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Most recent item
    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Number of items held
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when nothing has been pushed
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of items held
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Time-aligned series backing the performance chart
#[derive(Debug, Clone)]
pub struct MetricSeries {
    labels: RingBuffer<String>,
    cpu: RingBuffer<f64>,
    ram: RingBuffer<f64>,
    temperature: RingBuffer<f64>,
}

impl MetricSeries {
    /// Create empty series of `capacity` points each
    pub fn new(capacity: usize) -> Self {
        Self {
            labels: RingBuffer::new(capacity),
            cpu: RingBuffer::new(capacity),
            ram: RingBuffer::new(capacity),
            temperature: RingBuffer::new(capacity),
        }
    }

    /// Append one sample to every series
    pub fn push(&mut self, sample: &MetricSample) {
        self.labels
            .push(sample.received_at.format("%H:%M:%S").to_string());
        self.cpu.push(sample.cpu);
        self.ram.push(sample.ram);
        self.temperature.push(sample.temperature);
    }

    /// Number of points held
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True before the first sample
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Time labels, oldest first
    pub fn labels(&self) -> Vec<&str> {
        self.labels.iter().map(String::as_str).collect()
    }

    /// CPU values, oldest first
    pub fn cpu(&self) -> Vec<f64> {
        self.cpu.iter().copied().collect()
    }

    /// RAM values, oldest first
    pub fn ram(&self) -> Vec<f64> {
        self.ram.iter().copied().collect()
    }

    /// Temperature values, oldest first
    pub fn temperature(&self) -> Vec<f64> {
        self.temperature.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn sample(cpu: f64) -> MetricSample {
        MetricSample {
            cpu,
            ram: cpu / 2.0,
            temperature: 40.0,
            processes: None,
            received_at: Local::now(),
        }
    }

    #[test]
    fn test_series_capacity_evicts_oldest() {
        let mut series = MetricSeries::new(30);
        for i in 0..31 {
            series.push(&sample(i as f64));
        }
        assert_eq!(series.len(), 30);
        let cpu = series.cpu();
        assert_eq!(cpu.first(), Some(&1.0));
        assert_eq!(cpu.last(), Some(&30.0));
        assert!(cpu.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(series.ram().len(), 30);
        assert_eq!(series.labels().len(), 30);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut buffer = RingBuffer::new(0);
        buffer.push("a");
        assert_eq!(buffer.push("b"), Some("a"));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.latest(), Some(&"b"));
    }
}
