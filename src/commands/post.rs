//! Handle post command: stage, reorder, submit and wait for completion

use std::{io::Write, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use super::{describe, write_photos};
use crate::{
    service::PostingService,
    session::{Session, SessionSettings},
    staging::RawFile,
    submission::{PostComposer, PostMetadata, SubmissionState},
};

#[derive(Debug, clap::Args)]
pub struct PostArgs {
    /// Photos to post, in initial display order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    #[arg(long)]
    pub caption: String,

    #[arg(long)]
    pub location: String,

    /// Whitespace-separated hashtags
    #[arg(long)]
    pub hashtags: String,

    /// Move the photo at zero-based position OLD to NEW; repeatable, applied in order
    #[arg(long = "move", value_name = "OLD:NEW", value_parser = parse_move)]
    pub moves: Vec<(usize, usize)>,
}

pub fn parse_move(value: &str) -> Result<(usize, usize), String> {
    let (old, new) = value
        .split_once(':')
        .ok_or_else(|| format!("expected OLD:NEW, got '{}'", value))?;
    let parse = |index: &str| {
        index
            .trim()
            .parse::<usize>()
            .map_err(|e| format!("invalid position '{}': {}", index, e))
    };
    Ok((parse(old)?, parse(new)?))
}

/// Build the post from `args`, submit it and wait for the outcome
pub async fn handle<S: PostingService, W: Write>(
    args: PostArgs,
    service: S,
    settings: SessionSettings,
    output: &mut W,
) -> Result<SubmissionState> {
    let batch = args
        .files
        .iter()
        .map(|path| RawFile::from_path(path))
        .collect::<Result<Vec<_>>>()?;

    let mut composer = PostComposer::new();
    composer.stage_files(batch)?;
    for (old_index, new_index) in args.moves {
        composer
            .reorder(old_index, new_index)
            .with_context(|| format!("Failed to move photo {}:{}", old_index, new_index))?;
    }
    composer.set_metadata(PostMetadata::new(args.caption, args.location, args.hashtags));

    // One-shot: everything is known up front, no need to wait for a tick
    if !composer.evaluate_readiness() {
        anyhow::bail!("post is not ready: caption, location and hashtags must be non-empty");
    }

    write_photos(output, &composer.stage().snapshot())?;
    tracing::info!(
        "posting {} photos with hashtags {:?}",
        composer.stage().len(),
        composer.metadata().hashtag_list()
    );

    let mut session = Session::start(composer, service, settings);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(SubmissionState::Idle.label());

    let outcome = match session.submit().await {
        Ok(state) if state.is_submitting() => {
            spinner.set_message(state.label());
            session.wait_for_outcome().await
        }
        Ok(state) => state,
        Err(e) => {
            spinner.finish_and_clear();
            session.shutdown().await;
            return Err(e);
        }
    };

    spinner.finish_and_clear();
    session.shutdown().await;

    writeln!(output, "{}", describe(&outcome))?;
    Ok(outcome)
}
