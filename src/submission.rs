//! Post submission workflow
//!
//! [`PostComposer`] owns everything a post is made of (staged photos,
//! metadata) plus the submission state and the completion watermark. It is
//! synchronous: the session drives it from timers and network results.

mod metadata;
mod state;

pub use metadata::PostMetadata;
pub use state::{SubmissionEvent, SubmissionState};

use crate::{
    error::Error,
    service::{UploadFile, UploadPayload},
    staging::{PhotoStage, RawFile},
};

#[derive(Debug, Default)]
pub struct PostComposer {
    stage: PhotoStage,
    metadata: PostMetadata,
    state: SubmissionState,
    /// Highest completed-post id seen from the service
    watermark: Option<u64>,
    /// Post control, refreshed by `evaluate_readiness`
    control_enabled: bool,
}

impl PostComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> &PhotoStage {
        &self.stage
    }

    pub fn stage_files(&mut self, batch: Vec<RawFile>) -> Result<(), Error> {
        self.stage.stage_files(batch)
    }

    pub fn reorder(&mut self, old_index: usize, new_index: usize) -> Result<(), Error> {
        self.stage.reorder(old_index, new_index)
    }

    pub fn metadata(&self) -> &PostMetadata {
        &self.metadata
    }

    pub fn set_metadata(&mut self, metadata: PostMetadata) {
        self.metadata = metadata;
    }

    pub fn set_caption(&mut self, caption: impl Into<String>) {
        self.metadata.caption = caption.into();
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        self.metadata.location = location.into();
    }

    pub fn set_hashtags(&mut self, hashtags: impl Into<String>) {
        self.metadata.hashtags = hashtags.into();
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn watermark(&self) -> Option<u64> {
        self.watermark
    }

    pub fn control_enabled(&self) -> bool {
        self.control_enabled
    }

    /// Readiness computed from the current inputs, without touching the
    /// control
    pub fn is_ready(&self) -> bool {
        !self.stage.is_empty() && self.metadata.is_complete() && !self.state.is_complete()
    }

    /// Recompute the post control from the current inputs
    pub fn evaluate_readiness(&mut self) -> bool {
        let enabled = self.is_ready();
        if enabled != self.control_enabled {
            tracing::debug!("post control {}", if enabled { "enabled" } else { "disabled" });
        }
        self.control_enabled = enabled;
        enabled
    }

    /// Whether `submit` would start a submission right now.
    ///
    /// A submission already in flight rejects another one with
    /// `IllegalTransition`, even when readiness has re-enabled the control.
    /// Otherwise the control must be enabled and the inputs still ready, or
    /// `ControlDisabled` is returned.
    pub fn check_submit(&self) -> Result<(), Error> {
        if self.state.is_submitting() {
            return Err(Error::illegal_transition(&self.state, "submit"));
        }
        if !self.control_enabled || !self.is_ready() {
            return Err(Error::ControlDisabled);
        }
        Ok(())
    }

    /// Start a submission and return what must be uploaded. Nothing changes
    /// when [`check_submit`](Self::check_submit) fails.
    pub fn submit(&mut self) -> Result<UploadPayload, Error> {
        self.check_submit()?;

        self.state = self.state.transition(SubmissionEvent::Submit)?;
        self.control_enabled = false;

        let photos = self.stage.snapshot();
        let payload = UploadPayload {
            files: photos
                .iter()
                .map(|photo| UploadFile {
                    name: photo.name.clone(),
                    bytes: photo.bytes().to_vec(),
                })
                .collect(),
            caption: self.metadata.caption.clone(),
            location: self.metadata.location.clone(),
            hashtags: self.metadata.hashtags.clone(),
            image_order: self.stage.image_order(),
        };

        tracing::info!(
            "submitting {} photos (watermark {:?})",
            payload.files.len(),
            self.watermark
        );
        Ok(payload)
    }

    /// Mark the in-flight submission as failed
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), Error> {
        let reason = reason.into();
        self.state = self.state.transition(SubmissionEvent::Failed {
            reason: reason.clone(),
        })?;
        self.control_enabled = false;
        tracing::warn!("submission failed: {}", reason);
        Ok(())
    }

    /// Apply a polled completed-post id.
    ///
    /// Completes the in-flight submission iff the id is above the previous
    /// watermark. The watermark takes the polled value either way. Without a
    /// previous watermark there is nothing to compare against, so no
    /// transition happens. Returns whether the submission completed.
    pub fn observe_watermark(&mut self, latest: u64) -> bool {
        let advanced = matches!(self.watermark, Some(previous) if latest > previous);
        let mut completed = false;

        if advanced && self.state.is_submitting() {
            if let Ok(next) = self
                .state
                .transition(SubmissionEvent::Completed { post_id: latest })
            {
                self.state = next;
                self.control_enabled = false;
                completed = true;
                tracing::info!("post completed with id {}", latest);
            }
        }

        self.watermark = Some(latest);
        completed
    }
}
