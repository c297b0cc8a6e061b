//! Orchestration state, generation events, and their projection into a
//! percentage and status message.

use serde::{Deserialize, Serialize};

/// State of the batch orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OrchestrationState {
    #[default]
    Idle,
    Running {
        completed: usize,
        total: usize,
        current_label: String,
    },
    Completed,
}

impl OrchestrationState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

/// Something observable that happened during generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationEvent {
    /// A full-deck run started; the note store was reset.
    BatchStarted { total: usize },

    /// About to request the slide at `position` (0-based) of `total`.
    SlideStarted {
        position: usize,
        total: usize,
        index: u32,
        title: String,
    },

    /// A note was written, either generated or failure-marked.
    NoteWritten { index: u32, failed: bool },

    /// Every slide of the run was processed.
    BatchCompleted { total: usize, failed: usize },

    /// The run stopped early after `completed` slides.
    BatchCancelled { completed: usize, total: usize },

    /// A single-slide request started.
    SingleStarted { index: u32 },

    /// A single-slide request finished; `error` holds the failure message.
    SingleFinished { index: u32, error: Option<String> },

    /// The orchestrator returned to idle after completion.
    Idle,
}

/// What the progress indicator should show.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// Whether the indicator is shown at all.
    pub visible: bool,

    /// Completion in [0, 100], or `None` when indeterminate.
    pub percent: Option<f64>,

    /// Status line.
    pub message: String,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            visible: false,
            percent: None,
            message: String::new(),
        }
    }
}

/// Projects generation events into a [`Progress`].
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    current: Progress,
    history: Vec<f64>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current projection.
    pub fn progress(&self) -> &Progress {
        &self.current
    }

    /// Every determinate percentage reported since the last batch started.
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Update the projection from one event.
    pub fn apply(&mut self, event: &GenerationEvent) {
        match event {
            GenerationEvent::BatchStarted { .. } => {
                self.history.clear();
                self.show(Some(0.0), "Starting full-deck generation…".to_string());
            }
            GenerationEvent::SlideStarted {
                position,
                total,
                index,
                ..
            } => {
                self.show(
                    Some(percent_of(*position, *total)),
                    format!("Generating slide {} / {}…", index, total),
                );
            }
            GenerationEvent::NoteWritten { .. } => {}
            GenerationEvent::BatchCompleted { .. } => {
                self.show(Some(100.0), "Done".to_string());
            }
            GenerationEvent::BatchCancelled { .. } => {
                self.current.visible = false;
                self.current.message = "Cancelled".to_string();
            }
            GenerationEvent::SingleStarted { index } => {
                self.show(None, format!("Generating slide {}…", index));
            }
            GenerationEvent::SingleFinished { .. } | GenerationEvent::Idle => {
                self.current = Progress::default();
            }
        }
    }

    fn show(&mut self, percent: Option<f64>, message: String) {
        let percent = percent.map(|p| p.clamp(0.0, 100.0));
        if let Some(p) = percent {
            self.history.push(p);
        }
        self.current = Progress {
            visible: true,
            percent,
            message,
        };
    }
}

/// Percentage of `total` represented by `done`; an empty run counts as done.
pub fn percent_of(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (done as f64 / total as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide_started(position: usize, total: usize) -> GenerationEvent {
        GenerationEvent::SlideStarted {
            position,
            total,
            index: position as u32 + 1,
            title: String::new(),
        }
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(0, 4), 0.0);
        assert_eq!(percent_of(1, 4), 25.0);
        assert_eq!(percent_of(4, 4), 100.0);
        assert_eq!(percent_of(0, 0), 100.0);
    }

    #[test]
    fn test_batch_sequence_is_non_decreasing_and_ends_at_100() {
        let mut reporter = ProgressReporter::new();
        reporter.apply(&GenerationEvent::BatchStarted { total: 3 });
        for i in 0..3 {
            reporter.apply(&slide_started(i, 3));
            reporter.apply(&GenerationEvent::NoteWritten {
                index: i as u32 + 1,
                failed: false,
            });
        }
        reporter.apply(&GenerationEvent::BatchCompleted { total: 3, failed: 0 });

        let history = reporter.history();
        assert!(history.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(history.last(), Some(&100.0));
        assert_eq!(reporter.progress().message, "Done");
    }

    #[test]
    fn test_history_restarts_with_each_batch() {
        let mut reporter = ProgressReporter::new();
        for _ in 0..2 {
            reporter.apply(&GenerationEvent::BatchStarted { total: 2 });
            reporter.apply(&slide_started(0, 2));
            reporter.apply(&slide_started(1, 2));
            reporter.apply(&GenerationEvent::BatchCompleted { total: 2, failed: 0 });
        }

        let history = reporter.history();
        assert_eq!(history, &[0.0, 0.0, 50.0, 100.0]);
        assert!(history.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_slide_message() {
        let mut reporter = ProgressReporter::new();
        reporter.apply(&GenerationEvent::SlideStarted {
            position: 1,
            total: 5,
            index: 2,
            title: "Cells".into(),
        });
        let progress = reporter.progress();
        assert!(progress.visible);
        assert_eq!(progress.percent, Some(20.0));
        assert_eq!(progress.message, "Generating slide 2 / 5…");
    }

    #[test]
    fn test_single_is_indeterminate() {
        let mut reporter = ProgressReporter::new();
        reporter.apply(&GenerationEvent::SingleStarted { index: 3 });
        assert_eq!(reporter.progress().percent, None);
        assert!(reporter.progress().visible);
        assert!(reporter.history().is_empty());

        reporter.apply(&GenerationEvent::SingleFinished {
            index: 3,
            error: None,
        });
        assert!(!reporter.progress().visible);
    }

    #[test]
    fn test_idle_hides_indicator() {
        let mut reporter = ProgressReporter::new();
        reporter.apply(&GenerationEvent::BatchCompleted { total: 1, failed: 0 });
        reporter.apply(&GenerationEvent::Idle);
        assert_eq!(reporter.progress(), &Progress::default());
    }

    #[test]
    fn test_cancel_hides_indicator() {
        let mut reporter = ProgressReporter::new();
        reporter.apply(&slide_started(1, 4));
        reporter.apply(&GenerationEvent::BatchCancelled {
            completed: 1,
            total: 4,
        });
        assert!(!reporter.progress().visible);
        assert_eq!(reporter.progress().message, "Cancelled");
    }

    #[test]
    fn test_state_is_running() {
        assert!(!OrchestrationState::Idle.is_running());
        assert!(OrchestrationState::Running {
            completed: 0,
            total: 1,
            current_label: String::new()
        }
        .is_running());
    }
}
