use std::collections::HashMap;
use std::time::Instant;

/// Observer for loop events.
///
/// Keeps the loop free of output decisions: the CLI logs through the `log`
/// crate, tests discard everything.
pub trait SessionLogger {
    /// Heartbeat for every frame inspected while watching.
    fn frame(&mut self, index: usize);

    /// Record how long a named stage took (`detect`, `transform`, ...).
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. faces per frame).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Logger that discards all events.
pub struct NullSessionLogger;

impl SessionLogger for NullSessionLogger {
    fn frame(&mut self, _index: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running count, sum and maximum of one recorded series.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningStats {
    pub count: usize,
    pub sum: f64,
    pub max: f64,
}

impl RunningStats {
    fn record(&mut self, value: f64) {
        self.max = if self.count == 0 {
            value
        } else {
            self.max.max(value)
        };
        self.count += 1;
        self.sum += value;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Forwards events to the `log` crate and keeps per-stage aggregates for a
/// summary at shutdown.
///
/// State is one [`RunningStats`] per stage or metric name, so a session that
/// runs for days costs no more memory than one that runs for a minute.
/// Frame heartbeats are logged every `throttle_frames` frames.
pub struct LogSessionLogger {
    throttle_frames: usize,
    timings: HashMap<String, RunningStats>,
    metrics: HashMap<String, RunningStats>,
    start_time: Instant,
    frames: usize,
}

impl LogSessionLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            frames: 0,
        }
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.frames;
        let mut lines = vec![format!(
            "Session summary ({frames} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.iter().collect();
        stages.sort_by(|a, b| a.0.cmp(b.0));
        for (stage, stats) in stages {
            lines.push(format!(
                "  {stage:12}: avg {:7.1}ms  max {:7.1}ms  count {}",
                stats.mean(),
                stats.max,
                stats.count
            ));
        }

        let mut metrics: Vec<_> = self.metrics.iter().collect();
        metrics.sort_by(|a, b| a.0.cmp(b.0));
        for (name, stats) in metrics {
            lines.push(format!("  {name}: avg {:.1}", stats.mean()));
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Watch rate: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timing_stats(&self, stage: &str) -> Option<&RunningStats> {
        self.timings.get(stage)
    }

    pub fn metric_stats(&self, name: &str) -> Option<&RunningStats> {
        self.metrics.get(name)
    }
}

impl Default for LogSessionLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl SessionLogger for LogSessionLogger {
    fn frame(&mut self, index: usize) {
        self.frames += 1;
        if self.frames % self.throttle_frames == 0 {
            log::debug!("Watching: frame {index} ({} inspected)", self.frames);
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        record(&mut self.timings, stage, duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        record(&mut self.metrics, name, value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

fn record(series: &mut HashMap<String, RunningStats>, name: &str, value: f64) {
    match series.get_mut(name) {
        Some(stats) => stats.record(value),
        None => {
            let mut stats = RunningStats::default();
            stats.record(value);
            series.insert(name.to_string(), stats);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullSessionLogger;
        logger.frame(1);
        logger.timing("detect", 5.0);
        logger.metric("faces", 1.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_aggregates_values() {
        let mut logger = LogSessionLogger::new(10);
        logger.timing("transform", 2000.0);
        logger.timing("transform", 3000.0);
        logger.timing("detect", 5.0);

        let transform = logger.timing_stats("transform").unwrap();
        assert_eq!(transform.count, 2);
        assert_relative_eq!(transform.mean(), 2500.0);
        assert_relative_eq!(transform.max, 3000.0);
        assert_eq!(logger.timing_stats("detect").unwrap().count, 1);
        assert!(logger.timing_stats("settle").is_none());
    }

    #[test]
    fn test_max_of_negative_values() {
        let mut stats = RunningStats::default();
        stats.record(-3.0);
        stats.record(-5.0);
        assert_relative_eq!(stats.max, -3.0);
    }

    #[test]
    fn test_metric_aggregates_values() {
        let mut logger = LogSessionLogger::new(10);
        logger.metric("faces", 1.0);
        logger.metric("faces", 2.0);
        assert_relative_eq!(logger.metric_stats("faces").unwrap().mean(), 1.5);
    }

    #[test]
    fn test_long_session_keeps_fixed_state() {
        let mut logger = LogSessionLogger::new(1000);
        for i in 0..100_000 {
            logger.frame(i);
            logger.timing("detect", (i % 40) as f64);
            logger.metric("faces", (i % 3) as f64);
            logger.info("still watching");
        }

        assert_eq!(logger.frames, 100_000);
        assert_eq!(logger.timings.len(), 1);
        assert_eq!(logger.metrics.len(), 1);
        let detect = logger.timing_stats("detect").unwrap();
        assert_eq!(detect.count, 100_000);
        assert_relative_eq!(detect.max, 39.0);
        assert_relative_eq!(logger.metric_stats("faces").unwrap().mean(), 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_summary_lists_stages_and_metrics() {
        let mut logger = LogSessionLogger::new(10);
        logger.frame(0);
        logger.timing("detect", 20.0);
        logger.timing("transform", 1500.0);
        logger.metric("faces", 3.0);
        logger.metric("faces", 4.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Session summary (1 frames"));
        assert!(summary.contains("detect"));
        assert!(summary.contains("transform"));
        assert!(summary.contains("faces: avg 3.5"));
        assert!(summary.contains("fps"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(LogSessionLogger::new(10).summary_string().is_none());
    }

    #[test]
    fn test_zero_throttle_is_clamped() {
        assert_eq!(LogSessionLogger::new(0).throttle_frames, 1);
    }
}
