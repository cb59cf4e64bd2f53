//! Per-stage wall-clock timing of one pipeline run.

use std::fmt;
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::info;

/// A pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Stage {
    /// Checking the configuration before anything runs.
    Configuration,
    /// Reading source and target from the store.
    Loading,
    /// Resolving the source-to-target scale ratio.
    ScaleEstimation,
    /// Voxel-grid downsampling of both clouds.
    Downsampling,
    /// Fine alignment.
    Alignment,
    /// Rejecting non-finite transforms.
    Validation,
    /// Writing the transformed source.
    Export,
}

impl Stage {
    /// Human-readable stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Loading => "loading",
            Self::ScaleEstimation => "scale estimation",
            Self::Downsampling => "downsampling",
            Self::Alignment => "alignment",
            Self::Validation => "validation",
            Self::Export => "export",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Duration of one executed stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StageTiming {
    /// Which stage ran.
    pub stage: Stage,
    /// How long it took.
    pub duration: Duration,
}

/// Ordered stage durations, append-only during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Timeline {
    entries: Vec<StageTiming>,
}

impl Timeline {
    /// An empty timeline.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Drops every entry.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Appends a measured stage.
    pub fn record(&mut self, stage: Stage, duration: Duration) {
        self.entries.push(StageTiming { stage, duration });
    }

    /// Runs `f`, records its duration under `stage`, and returns its result.
    ///
    /// The duration is recorded whether or not `f` reports an error.
    pub fn time<T>(&mut self, stage: Stage, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let result = f();
        self.record(stage, started.elapsed());
        result
    }

    /// Entries in execution order.
    #[must_use]
    pub fn entries(&self) -> &[StageTiming] {
        &self.entries
    }

    /// Number of recorded stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True before any stage has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of the first entry for `stage`.
    #[must_use]
    pub fn position(&self, stage: Stage) -> Option<usize> {
        self.entries.iter().position(|e| e.stage == stage)
    }

    /// Sum of all recorded durations.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.entries.iter().map(|e| e.duration).sum()
    }

    /// Emits one log line per stage, in execution order.
    pub fn log(&self) {
        for entry in &self.entries {
            info!(
                stage = entry.stage.name(),
                ms = entry.duration.as_secs_f64() * 1000.0,
                "timeline"
            );
        }
    }
}

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(
                f,
                "{:<18} {:>10.3} ms",
                entry.stage.name(),
                entry.duration.as_secs_f64() * 1000.0
            )?;
        }
        write!(f, "{:<18} {:>10.3} ms", "total", self.total().as_secs_f64() * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_capture::capture;

    #[test]
    fn test_records_in_order() {
        let mut timeline = Timeline::new();
        timeline.record(Stage::ScaleEstimation, Duration::from_millis(1));
        let value = timeline.time(Stage::Downsampling, || 41 + 1);
        timeline.record(Stage::Alignment, Duration::from_millis(3));

        assert_eq!(value, 42);
        let stages: Vec<_> = timeline.entries().iter().map(|e| e.stage).collect();
        assert_eq!(
            stages,
            vec![Stage::ScaleEstimation, Stage::Downsampling, Stage::Alignment]
        );
        assert!(timeline.total() >= Duration::from_millis(4));
    }

    #[test]
    fn test_reset_clears() {
        let mut timeline = Timeline::new();
        timeline.record(Stage::Loading, Duration::ZERO);
        assert_eq!(timeline.len(), 1);

        timeline.reset();
        assert!(timeline.is_empty());
        assert_eq!(timeline.position(Stage::Loading), None);
    }

    #[test]
    fn test_display_lists_stages() {
        let mut timeline = Timeline::new();
        timeline.record(Stage::ScaleEstimation, Duration::from_micros(1500));
        let text = timeline.to_string();

        assert!(text.starts_with("scale estimation"));
        assert!(text.contains("1.500 ms"));
        assert!(text.lines().last().is_some_and(|l| l.starts_with("total")));
    }

    #[test]
    fn test_log_emits_one_line_per_stage_only() {
        let mut timeline = Timeline::new();
        timeline.record(Stage::Alignment, Duration::from_millis(2));
        timeline.record(Stage::Loading, Duration::from_millis(5));

        let ((), text) = capture(tracing::Level::INFO, || timeline.log());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("alignment"));
        assert!(lines[1].contains("loading"));
        assert!(!text.contains("total"));
    }
}
