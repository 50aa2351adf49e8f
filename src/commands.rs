pub mod interactive;
pub mod post;
pub mod status;

use std::io::Write;

use anyhow::Result;

use crate::{staging::StagedPhoto, submission::SubmissionState};

/// One line per staged photo, in display order
fn write_photos<W: Write>(output: &mut W, photos: &[StagedPhoto]) -> Result<()> {
    if photos.is_empty() {
        writeln!(output, "no photos staged")?;
    }
    for photo in photos {
        writeln!(
            output,
            "{:>2}. {} [{}x{}] preview: {}",
            photo.ordinal,
            photo.name,
            photo.display_width,
            photo.display_height,
            photo.preview.path().display()
        )?;
    }
    Ok(())
}

/// Human-readable outcome of a submission
fn describe(state: &SubmissionState) -> String {
    match state {
        SubmissionState::Complete {
            post_id,
            completed_at,
        } => format!(
            "{} (post {} at {})",
            state.label(),
            post_id,
            completed_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        SubmissionState::Failed { reason } => format!("{}: {}", state.label(), reason),
        _ => state.label().to_string(),
    }
}
