//! Timer-driven session around a [`PostComposer`]
//!
//! A session runs two background tasks for as long as it lives:
//! - the readiness ticker, re-evaluating the post control on a fixed period
//! - the status poller, feeding the completed-post id into the watermark
//!
//! Every status poll, the poller's and the submit baseline alike, goes
//! through one gate held from request to apply, so polls never overlap and
//! results land in issue order. Failed polls back off exponentially. Both tasks stop on [`Session::shutdown`] or drop, and any
//! network result that resolves after that is discarded.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use anyhow::{Context, Result};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use crate::{
    config::PosterConfig,
    service::PostingService,
    submission::{PostComposer, SubmissionState},
};

/// Timing knobs for a session
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub readiness_interval: Duration,
    pub poll_interval: Duration,
    pub max_poll_backoff: Duration,
    pub request_timeout: Duration,
    pub submission_timeout: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &PosterConfig) -> Self {
        Self {
            readiness_interval: config.readiness_interval(),
            poll_interval: config.poll_interval(),
            max_poll_backoff: config.max_poll_backoff(),
            request_timeout: config.request_timeout(),
            submission_timeout: config.submission_timeout(),
        }
    }

    /// Delay before the next poll after `failures` consecutive failed polls
    fn poll_delay(&self, failures: u32) -> Duration {
        let factor = 2u32.saturating_pow(failures);
        self.poll_interval
            .saturating_mul(factor)
            .min(self.max_poll_backoff.max(self.poll_interval))
    }
}

struct Shared<S> {
    composer: Mutex<PostComposer>,
    service: S,
    settings: SessionSettings,
    /// Held for the whole of one status poll, request through apply
    poll_gate: tokio::sync::Mutex<()>,
    /// When the in-flight submission started, for the completion timeout
    submitted_at: Mutex<Option<Instant>>,
    states: watch::Sender<SubmissionState>,
    shutdown: watch::Sender<bool>,
}

impl<S: PostingService> Shared<S> {
    fn lock(&self) -> MutexGuard<'_, PostComposer> {
        self.composer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_live(&self) -> bool {
        !*self.shutdown.borrow()
    }

    fn publish(&self, composer: &PostComposer) {
        self.states.send_if_modified(|state| {
            if state != composer.state() {
                *state = composer.state().clone();
                true
            } else {
                false
            }
        });
    }

    fn apply_watermark(&self, latest: u64) {
        let mut composer = self.lock();
        composer.observe_watermark(latest);
        self.publish(&composer);
    }

    /// Query the completed-post id and apply it to the watermark. Results
    /// arriving after shutdown are dropped.
    async fn poll(&self) -> Result<u64> {
        let _gate = self.poll_gate.lock().await;
        let latest = self.service.latest_completed_id().await?;
        if self.is_live() {
            self.apply_watermark(latest);
        }
        Ok(latest)
    }

    fn fail_if_submitting(&self, reason: String) {
        let mut composer = self.lock();
        if composer.state().is_submitting() {
            // Cannot be illegal: we just checked the state under the lock
            let _ = composer.fail(reason);
            self.publish(&composer);
        }
    }

    fn check_deadline(&self) {
        let started = *self
            .submitted_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(started) = started {
            let timeout = self.settings.submission_timeout;
            if started.elapsed() >= timeout {
                self.fail_if_submitting(format!(
                    "no completion reported within {}s",
                    timeout.as_secs()
                ));
            }
        }
    }
}

pub struct Session<S: PostingService> {
    shared: Arc<Shared<S>>,
    tasks: Vec<JoinHandle<()>>,
}

impl<S: PostingService> Session<S> {
    /// Start the readiness ticker and the status poller. Must be called from
    /// within a tokio runtime.
    pub fn start(composer: PostComposer, service: S, settings: SessionSettings) -> Self {
        let (states, _) = watch::channel(composer.state().clone());
        let (shutdown, _) = watch::channel(false);

        let shared = Arc::new(Shared {
            composer: Mutex::new(composer),
            service,
            settings,
            poll_gate: tokio::sync::Mutex::new(()),
            submitted_at: Mutex::new(None),
            states,
            shutdown,
        });

        let tasks = vec![
            tokio::spawn(run_readiness(Arc::clone(&shared))),
            tokio::spawn(run_poller(Arc::clone(&shared))),
        ];

        Self { shared, tasks }
    }

    /// Run `f` against the composer; state changes are published afterwards
    pub fn with_composer<T>(&self, f: impl FnOnce(&mut PostComposer) -> T) -> T {
        let mut composer = self.shared.lock();
        let result = f(&mut composer);
        self.shared.publish(&composer);
        result
    }

    pub fn state(&self) -> SubmissionState {
        self.shared.lock().state().clone()
    }

    /// Submit the post and send the upload.
    ///
    /// Fails (and changes nothing) with `Error::ControlDisabled` when the
    /// post control is disabled, or with `Error::IllegalTransition` while a
    /// submission is already in flight. Otherwise takes a fresh baseline
    /// status poll, queued behind any poll already in flight, so the
    /// watermark reflects the service as of this submit. Returns the state
    /// once the upload call has resolved; completion itself is detected by
    /// the poller.
    pub async fn submit(&self) -> Result<SubmissionState> {
        self.shared.lock().check_submit()?;

        self.shared
            .poll()
            .await
            .context("Failed to read baseline upload status")?;

        let payload = {
            let mut composer = self.shared.lock();
            let payload = composer.submit()?;
            self.shared.publish(&composer);
            payload
        };
        *self
            .shared
            .submitted_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());

        let result = time::timeout(
            self.shared.settings.request_timeout,
            self.shared.service.upload(&payload),
        )
        .await;

        if !self.shared.is_live() {
            tracing::debug!("session shut down, discarding upload result");
            return Ok(self.state());
        }

        match result {
            Ok(Ok(())) => tracing::info!("upload accepted, waiting for completion"),
            Ok(Err(e)) => self.shared.fail_if_submitting(format!("{:#}", e)),
            Err(_) => self.shared.fail_if_submitting(format!(
                "upload timed out after {}s",
                self.shared.settings.request_timeout.as_secs()
            )),
        }

        Ok(self.state())
    }

    /// Wait until the in-flight submission completes or fails. Returns the
    /// current state right away when nothing is in flight.
    pub async fn wait_for_outcome(&self) -> SubmissionState {
        let mut states = self.shared.states.subscribe();
        loop {
            let current = states.borrow_and_update().clone();
            if !current.is_submitting() {
                return current;
            }
            if states.changed().await.is_err() {
                return current;
            }
        }
    }

    /// Stop both background tasks and wait for them to exit
    pub async fn shutdown(&mut self) {
        self.shared.shutdown.send_replace(true);
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::warn!("session task ended abnormally: {}", e);
            }
        }
    }
}

impl<S: PostingService> Drop for Session<S> {
    fn drop(&mut self) {
        self.shared.shutdown.send_replace(true);
    }
}

async fn run_readiness<S: PostingService>(shared: Arc<Shared<S>>) {
    let mut shutdown = shared.shutdown.subscribe();
    let mut ticker = time::interval(shared.settings.readiness_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    while shared.is_live() {
        tokio::select! {
            _ = ticker.tick() => {
                shared.lock().evaluate_readiness();
            }
            _ = shutdown.changed() => break,
        }
    }
}

async fn run_poller<S: PostingService>(shared: Arc<Shared<S>>) {
    let mut shutdown = shared.shutdown.subscribe();
    let mut failures = 0u32;
    // First poll right away so a baseline exists early
    let mut delay = Duration::ZERO;

    while shared.is_live() {
        tokio::select! {
            _ = time::sleep(delay) => {}
            _ = shutdown.changed() => break,
        }

        let result = tokio::select! {
            result = shared.poll() => result,
            _ = shutdown.changed() => break,
        };
        if !shared.is_live() {
            break;
        }

        match result {
            Ok(_) => failures = 0,
            Err(e) => {
                failures = failures.saturating_add(1);
                tracing::warn!(
                    "upload status poll failed ({} in a row): {:#}",
                    failures,
                    e
                );
            }
        }

        shared.check_deadline();
        delay = shared.settings.poll_delay(failures);
    }

    tracing::debug!("status poller stopped");
}
