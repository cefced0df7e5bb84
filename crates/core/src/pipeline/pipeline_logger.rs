use std::collections::BTreeMap;
use std::time::Instant;

/// Cross-cutting logger for pipeline orchestration events.
///
/// Use cases report progress, stage timings and degraded units through this
/// trait so each caller decides how to surface them.
pub trait PipelineLogger: Send {
    /// Report unit-level progress within a named stage.
    fn progress(&mut self, stage: &str, current: usize, total: usize);

    /// Record how long one unit of a named stage took.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a unit that was skipped or replaced by a placeholder.
    fn skipped(&mut self, stage: &str, unit: &str, reason: &str);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events. Used by tests.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _stage: &str, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn skipped(&mut self, _stage: &str, _unit: &str, _reason: &str) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI-oriented logger that tracks per-stage timings and skipped units and
/// prints a summary at the end of the run.
///
/// Progress output is throttled to every `throttle_units` units.
pub struct StdoutPipelineLogger {
    throttle_units: usize,
    timings: BTreeMap<String, Vec<f64>>,
    skipped: BTreeMap<String, Vec<String>>,
    start_time: Instant,
    messages: Vec<String>,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_units: usize) -> Self {
        Self {
            throttle_units: throttle_units.max(1),
            timings: BTreeMap::new(),
            skipped: BTreeMap::new(),
            start_time: Instant::now(),
            messages: Vec::new(),
        }
    }

    /// Returns the formatted summary string, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.skipped.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Pipeline summary ({:.1}s total):",
            elapsed_ms / 1000.0
        )];

        for (stage, durations) in &self.timings {
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = if durations.is_empty() {
                0.0
            } else {
                total_ms / durations.len() as f64
            };
            lines.push(format!(
                "  {stage:14}: {:4} units  avg {avg_ms:8.1}ms  total {total_ms:9.0}ms",
                durations.len()
            ));
        }

        let total_skipped: usize = self.skipped.values().map(Vec::len).sum();
        if total_skipped == 0 {
            lines.push("  No units skipped".to_string());
        } else {
            lines.push(format!("  Skipped or degraded units: {total_skipped}"));
            for (stage, units) in &self.skipped {
                lines.push(format!("    {stage}: {} ({})", units.len(), units.join(", ")));
            }
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn skipped_for(&self, stage: &str) -> Option<&[String]> {
        self.skipped.get(stage).map(|v| v.as_slice())
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().map(Vec::len).sum()
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, stage: &str, current: usize, total: usize) {
        if total > 0 && (current % self.throttle_units == 0 || current == total) {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("{stage}: {current}/{total} ({pct:.1}%)");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn skipped(&mut self, stage: &str, unit: &str, reason: &str) {
        log::warn!("{stage}: skipped {unit}: {reason}");
        self.skipped
            .entry(stage.to_string())
            .or_default()
            .push(unit.to_string());
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
