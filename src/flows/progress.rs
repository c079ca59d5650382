//! Pipeline step tracking for the RAG flows
//!
//! A [`StepTracker`] owns an ordered list of [`Step`]s. Progress only moves
//! forward: activating a later step completes every earlier one, and a
//! completed step never becomes active again.

/// Display state of a pipeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    /// Not reached yet
    Pending,
    /// In progress
    Active,
    /// Finished
    Complete,
}

/// One stage of a retrieval pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Stable identifier ("searching", "generating")
    pub id: &'static str,
    /// Current label
    pub label: String,
    /// Current state
    pub state: StepState,
}

/// Ordered, forward-only step progress.
///
/// # Examples
///
/// ```
/// use ragstream::flows::progress::{StepState, StepTracker};
///
/// let mut steps = StepTracker::new(&[("search", "Searching"), ("answer", "Answering")]);
/// assert_eq!(steps.state("search"), Some(StepState::Active));
///
/// steps.advance("answer", None);
/// assert_eq!(steps.state("search"), Some(StepState::Complete));
/// assert_eq!(steps.state("answer"), Some(StepState::Active));
///
/// // Going back is ignored
/// steps.advance("search", None);
/// assert_eq!(steps.state("search"), Some(StepState::Complete));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTracker {
    steps: Vec<Step>,
}

impl StepTracker {
    /// Create a tracker from `(id, label)` pairs; the first step starts active
    pub fn new(steps: &[(&'static str, &str)]) -> Self {
        let steps = steps
            .iter()
            .enumerate()
            .map(|(i, &(id, label))| Step {
                id,
                label: label.to_string(),
                state: if i == 0 {
                    StepState::Active
                } else {
                    StepState::Pending
                },
            })
            .collect();
        Self { steps }
    }

    /// Current steps, in order
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Index of a step
    pub fn position(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }

    /// State of a step
    pub fn state(&self, id: &str) -> Option<StepState> {
        self.position(id).map(|i| self.steps[i].state)
    }

    /// Mark a step complete. Repeating the call changes nothing.
    pub fn mark_complete(&mut self, id: &str) {
        if let Some(i) = self.position(id) {
            self.steps[i].state = StepState::Complete;
        }
    }

    /// Make `id` the active step, completing every step before it and
    /// optionally replacing its label.
    ///
    /// Ignored when `id` is unknown or already complete. Returns whether
    /// anything changed.
    pub fn advance(&mut self, id: &str, label: Option<&str>) -> bool {
        let Some(index) = self.position(id) else {
            tracing::debug!(step = %id, "Ignoring unknown pipeline step");
            return false;
        };
        if self.steps[index].state == StepState::Complete {
            return false;
        }

        let mut changed = false;
        for step in &mut self.steps[..index] {
            if step.state != StepState::Complete {
                step.state = StepState::Complete;
                changed = true;
            }
        }

        let step = &mut self.steps[index];
        if step.state != StepState::Active {
            step.state = StepState::Active;
            changed = true;
        }
        if let Some(label) = label {
            if step.label != label {
                step.label = label.to_string();
                changed = true;
            }
        }
        changed
    }

    /// Replace a step's label without changing its state
    pub fn relabel(&mut self, id: &str, label: &str) {
        if let Some(i) = self.position(id) {
            self.steps[i].label = label.to_string();
        }
    }

    /// Every step is complete
    pub fn all_complete(&self) -> bool {
        self.steps.iter().all(|s| s.state == StepState::Complete)
    }
}
