use std::time::Instant;
use tracing::info;

/// Receives per-record progress from long sequential runs.
pub trait ProgressSink: Send {
    fn start(&mut self, total: usize);

    /// Called once per finished record.
    fn advance(&mut self, title: &str);

    fn finish(&mut self);
}

/// Discards progress.
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn start(&mut self, _total: usize) {}
    fn advance(&mut self, _title: &str) {}
    fn finish(&mut self) {}
}

/// Progress as periodic log lines, for runs without a terminal.
pub struct LogProgress {
    operation: String,
    total: usize,
    current: usize,
    interval: usize,
    last_log: usize,
    start_time: Instant,
}

impl LogProgress {
    /// Log every `interval` records, and once more at the end.
    pub fn new(operation: impl Into<String>, interval: usize) -> Self {
        Self {
            operation: operation.into(),
            total: 0,
            current: 0,
            interval: interval.max(1),
            last_log: 0,
            start_time: Instant::now(),
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    fn rate(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.current as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl ProgressSink for LogProgress {
    fn start(&mut self, total: usize) {
        self.total = total;
        self.current = 0;
        self.last_log = 0;
        self.start_time = Instant::now();
        if total > 0 {
            info!("{}: {} items to process", self.operation, total);
        }
    }

    fn advance(&mut self, _title: &str) {
        self.current += 1;
        if self.current - self.last_log >= self.interval || self.current == self.total {
            info!(
                "Progress: {}/{} ({:.1} items/sec)",
                self.current,
                self.total,
                self.rate()
            );
            self.last_log = self.current;
        }
    }

    fn finish(&mut self) {
        info!(
            "{} completed: {} items in {:.1}s",
            self.operation,
            self.current,
            self.start_time.elapsed().as_secs_f64()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_progress_counts() {
        let mut progress = LogProgress::new("Resolve", 0);
        progress.start(3);
        progress.advance("a");
        progress.advance("b");
        assert_eq!(progress.current(), 2);
        progress.advance("c");
        progress.finish();
        assert_eq!(progress.current(), 3);
        assert_eq!(progress.last_log, 3);
    }
}
