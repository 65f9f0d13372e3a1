use std::collections::HashMap;
use std::time::Instant;

/// Cross-cutting logger for pipeline orchestration events.
///
/// Decouples the controller from specific output mechanisms (console, GUI
/// signals, log crate) so each caller can observe remote jobs without
/// changing the orchestration code.
pub trait PipelineLogger: Send {
    /// Report one status poll of a remote job.
    fn progress(&mut self, stage: &str, percent: f64, message: &str);

    /// Record how long a named stage took end to end.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. faces detected, frames edited).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-pipeline summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _stage: &str, _percent: f64, _message: &str) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI-oriented logger that counts polls, tracks per-stage timing and
/// metrics, and provides a summary report at the end of a run.
///
/// Progress output is throttled to steps of `throttle_percent` so a slow
/// job does not print the same line every second.
pub struct ConsolePipelineLogger {
    throttle_percent: f64,
    last_reported: HashMap<String, f64>,
    polls: HashMap<String, usize>,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    messages: Vec<String>,
}

impl ConsolePipelineLogger {
    pub fn new(throttle_percent: f64) -> Self {
        Self {
            throttle_percent: throttle_percent.max(0.0),
            last_reported: HashMap::new(),
            polls: HashMap::new(),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            messages: Vec::new(),
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let total_polls: usize = self.polls.values().sum();
        let mut lines = Vec::new();

        lines.push(format!(
            "Pipeline summary ({total_polls} status polls, {:.1}s total):",
            elapsed_ms / 1000.0
        ));

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let total_ms: f64 = self.timings[stage].iter().sum();
            let polls = self.polls.get(stage).copied().unwrap_or(0);
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:10}: {total_ms:8.0}ms  {polls:4} polls  ({pct:4.1}%)"
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            let values = &self.metrics[name];
            let last = values.last().copied().unwrap_or(0.0);
            lines.push(format!("  {name}: {last}"));
        }

        Some(lines.join("\n"))
    }

    pub fn polls_for(&self, stage: &str) -> usize {
        self.polls.get(stage).copied().unwrap_or(0)
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }

    fn should_report(&self, stage: &str, percent: f64) -> bool {
        match self.last_reported.get(stage) {
            None => true,
            Some(_) if percent >= 100.0 => true,
            Some(last) => percent - last >= self.throttle_percent,
        }
    }
}

impl Default for ConsolePipelineLogger {
    fn default() -> Self {
        Self::new(10.0)
    }
}

impl PipelineLogger for ConsolePipelineLogger {
    fn progress(&mut self, stage: &str, percent: f64, message: &str) {
        *self.polls.entry(stage.to_string()).or_default() += 1;
        if self.should_report(stage, percent) {
            self.last_reported.insert(stage.to_string(), percent);
            log::info!("{stage}: {}% - {message}", percent.round() as u32);
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn info(&mut self, message: &str) {
        self.messages.push(message.to_string());
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
