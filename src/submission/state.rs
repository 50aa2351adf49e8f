use chrono::{DateTime, Utc};

use crate::error::Error;

/// Where the current post is in its lifecycle.
///
/// Legal moves: `Idle -> Submitting`, `Submitting -> Complete`,
/// `Submitting -> Failed` and `Failed -> Submitting` (retry). `Complete` is
/// terminal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    Submitting {
        started_at: DateTime<Utc>,
    },
    Complete {
        /// Completed-post id whose appearance signalled completion
        post_id: u64,
        completed_at: DateTime<Utc>,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionEvent {
    Submit,
    Completed { post_id: u64 },
    Failed { reason: String },
}

impl SubmissionEvent {
    fn name(&self) -> &'static str {
        match self {
            SubmissionEvent::Submit => "submit",
            SubmissionEvent::Completed { .. } => "completed",
            SubmissionEvent::Failed { .. } => "failed",
        }
    }
}

impl SubmissionState {
    /// Text shown on the post control
    pub fn label(&self) -> &'static str {
        match self {
            SubmissionState::Idle => "Post",
            SubmissionState::Submitting { .. } => "Posting...",
            SubmissionState::Complete { .. } => "Post Successful!",
            SubmissionState::Failed { .. } => "Post Failed",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SubmissionState::Idle => "idle",
            SubmissionState::Submitting { .. } => "submitting",
            SubmissionState::Complete { .. } => "complete",
            SubmissionState::Failed { .. } => "failed",
        }
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, SubmissionState::Submitting { .. })
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, SubmissionState::Complete { .. })
    }

    /// Apply an event, rejecting anything outside the legal moves
    pub fn transition(&self, event: SubmissionEvent) -> Result<SubmissionState, Error> {
        match (self, event) {
            (SubmissionState::Idle | SubmissionState::Failed { .. }, SubmissionEvent::Submit) => {
                Ok(SubmissionState::Submitting {
                    started_at: Utc::now(),
                })
            }
            (SubmissionState::Submitting { .. }, SubmissionEvent::Completed { post_id }) => {
                Ok(SubmissionState::Complete {
                    post_id,
                    completed_at: Utc::now(),
                })
            }
            (SubmissionState::Submitting { .. }, SubmissionEvent::Failed { reason }) => {
                Ok(SubmissionState::Failed { reason })
            }
            (state, event) => Err(Error::illegal_transition(state, event.name())),
        }
    }
}
