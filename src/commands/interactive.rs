//! Line-oriented post composer
//!
//! Reads one command per line and answers on `output`. The readiness ticker
//! and the status poller keep running between commands, so the post control
//! follows edits with up to one readiness interval of delay.

use std::{io::Write, path::Path};

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::{describe, write_photos};
use crate::{
    error::Error,
    service::PostingService,
    session::{Session, SessionSettings},
    staging::RawFile,
    submission::PostComposer,
};

const HELP: &str = "\
commands:
  stage <file>...       replace the staged photos
  move <old> <new>      move a photo (zero-based positions)
  caption <text>        set the caption
  location <text>       set the location
  hashtags <text>       set the hashtags
  list                  show staged photos
  state                 show the post control and submission state
  post                  submit the post
  wait                  wait for the submission to complete or fail
  quit                  leave";

/// Main loop - reads commands from `input` and dispatches them
pub async fn handle<S, R, W>(
    service: S,
    settings: SessionSettings,
    input: R,
    output: &mut W,
) -> Result<()>
where
    S: PostingService,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut session = Session::start(PostComposer::new(), service, settings);
    let mut lines = input.lines();

    writeln!(output, "{}", HELP)?;
    output.flush()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        tracing::debug!("interactive command: {}", line);

        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "stage" => stage(&session, rest, output)?,
            "move" => match parse_positions(rest) {
                Some((old_index, new_index)) => {
                    match session.with_composer(|c| c.reorder(old_index, new_index)) {
                        Ok(()) => {
                            let photos = session.with_composer(|c| c.stage().snapshot());
                            write_photos(output, &photos)?;
                        }
                        Err(e) => writeln!(output, "error: {}", e)?,
                    }
                }
                None => writeln!(output, "usage: move <old> <new>")?,
            },
            "caption" => session.with_composer(|c| c.set_caption(rest)),
            "location" => session.with_composer(|c| c.set_location(rest)),
            "hashtags" => session.with_composer(|c| c.set_hashtags(rest)),
            "list" => {
                let photos = session.with_composer(|c| c.stage().snapshot());
                write_photos(output, &photos)?;
            }
            "state" => {
                let (label, enabled, watermark) = session.with_composer(|c| {
                    (c.state().label(), c.control_enabled(), c.watermark())
                });
                writeln!(
                    output,
                    "[{}] {} (latest completed id: {})",
                    label,
                    if enabled { "enabled" } else { "disabled" },
                    watermark.map_or_else(|| "unknown".to_string(), |id| id.to_string())
                )?;
            }
            "post" => match session.submit().await {
                Ok(state) => writeln!(output, "{}", describe(&state))?,
                Err(e) => match e.downcast_ref::<Error>() {
                    Some(Error::ControlDisabled) => writeln!(output, "not ready to post yet")?,
                    Some(Error::IllegalTransition { .. }) => writeln!(output, "already posting")?,
                    _ => writeln!(output, "error: {:#}", e)?,
                },
            },
            "wait" => {
                let outcome = session.wait_for_outcome().await;
                writeln!(output, "{}", describe(&outcome))?;
            }
            "help" => writeln!(output, "{}", HELP)?,
            "quit" | "exit" => break,
            other => writeln!(output, "unknown command: {} (try 'help')", other)?,
        }

        output.flush()?;
    }

    session.shutdown().await;
    Ok(())
}

fn stage<S: PostingService, W: Write>(
    session: &Session<S>,
    paths: &str,
    output: &mut W,
) -> Result<()> {
    let batch = paths
        .split_whitespace()
        .map(|path| RawFile::from_path(Path::new(path)))
        .collect::<Result<Vec<_>>>();

    let batch = match batch {
        Ok(batch) => batch,
        Err(e) => {
            writeln!(output, "error: {:#}", e)?;
            return Ok(());
        }
    };

    match session.with_composer(|c| c.stage_files(batch)) {
        Ok(()) => {
            let photos = session.with_composer(|c| c.stage().snapshot());
            write_photos(output, &photos)?;
        }
        Err(e) => writeln!(output, "error: {}", e)?,
    }
    Ok(())
}

fn parse_positions(rest: &str) -> Option<(usize, usize)> {
    let mut parts = rest.split_whitespace();
    let old_index = parts.next()?.parse().ok()?;
    let new_index = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((old_index, new_index))
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use tokio::{
        io::{AsyncWriteExt, BufReader},
        time,
    };

    use super::*;
    use crate::service::fake::FakeService;

    fn settings() -> SessionSettings {
        SessionSettings {
            readiness_interval: Duration::from_secs(2),
            poll_interval: Duration::from_secs(2),
            max_poll_backoff: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
            submission_timeout: Duration::from_secs(60),
        }
    }

    fn photo_dir(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            std::fs::write(dir.path().join(name), name.as_bytes()).unwrap();
        }
        dir
    }

    #[test]
    fn test_parse_positions() {
        assert_eq!(parse_positions("1 0"), Some((1, 0)));
        assert_eq!(parse_positions("  2   5 "), Some((2, 5)));
        assert_eq!(parse_positions("1"), None);
        assert_eq!(parse_positions("1 2 3"), None);
        assert_eq!(parse_positions("x 2"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_script_without_pause_is_not_ready() {
        let dir = photo_dir(&["a.jpg"]);
        let script = format!(
            "stage {}\ncaption Sunset\nlocation Beach\nhashtags #vacation\npost\nbogus\nquit\n",
            dir.path().join("a.jpg").display()
        );
        let service = FakeService::new(0);

        let mut output = Vec::new();
        handle(
            Arc::clone(&service),
            settings(),
            script.as_bytes(),
            &mut output,
        )
        .await
        .unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains(" 0. a.jpg [3x4]"));
        assert!(text.contains("not ready to post yet"));
        assert!(text.contains("unknown command: bogus"));
        assert!(service.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_staging_errors_are_reported() {
        let dir = photo_dir(&["a.jpg", "notes.txt"]);
        let script = format!(
            "stage {}\nstage {}\nstage {}\nmove 0 3\nmove 1\nlist\nquit\n",
            dir.path().join("a.jpg").display(),
            dir.path().join("notes.txt").display(),
            dir.path().join("missing.jpg").display(),
        );
        let service = FakeService::new(0);

        let mut output = Vec::new();
        handle(service, settings(), script.as_bytes(), &mut output)
            .await
            .unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("error: Unsupported file: notes.txt"));
        assert!(text.contains("error: Failed to read image file"));
        assert!(text.contains("error: Index 3 out of range for 1 staged photos"));
        assert!(text.contains("usage: move <old> <new>"));
        // The first batch survives the rejected ones
        assert_eq!(text.matches(" 0. a.jpg").count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_session() {
        let dir = photo_dir(&["a.jpg", "b.jpg"]);
        let service = FakeService::new(41);
        let (mut writer, reader) = tokio::io::duplex(4096);

        let stage_line = format!(
            "stage {} {}\n",
            dir.path().join("a.jpg").display(),
            dir.path().join("b.jpg").display()
        );
        let driver = tokio::spawn(async move {
            writer.write_all(stage_line.as_bytes()).await.unwrap();
            writer
                .write_all(b"move 1 0\ncaption Sunset\nlocation Beach\nhashtags #vacation\n")
                .await
                .unwrap();
            // Give the readiness ticker a chance to enable the control
            time::sleep(Duration::from_secs(3)).await;
            writer
                .write_all(b"state\npost\npost\nwait\nstate\nquit\n")
                .await
                .unwrap();
        });

        let mut output = Vec::new();
        handle(
            Arc::clone(&service),
            settings(),
            BufReader::new(reader),
            &mut output,
        )
        .await
        .unwrap();
        driver.await.unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("[Post] enabled (latest completed id: 41)"));
        assert!(text.contains("Posting..."));
        assert!(text.contains("already posting"));
        assert!(text.contains("Post Successful! (post 42 at "));
        assert!(text.contains("[Post Successful!] disabled (latest completed id: 42)"));

        let uploads = service.uploads.lock().unwrap().clone();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].image_order, vec!["b.jpg", "a.jpg"]);
    }
}
