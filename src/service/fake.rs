//! In-memory posting service for tests

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::Result;
use tokio::time::{self, Instant};

use super::{PostingService, UploadPayload};

#[derive(Default)]
pub struct FakeService {
    pub latest: AtomicU64,
    /// Each upload bumps the completed-post counter, like a fast backend
    pub complete_on_upload: AtomicBool,
    pub fail_uploads: AtomicBool,
    /// Number of upcoming polls to fail
    pub failing_polls: AtomicUsize,
    pub poll_delay: Duration,
    pub uploads: Mutex<Vec<UploadPayload>>,
    pub poll_times: Mutex<Vec<Instant>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeService {
    pub fn new(latest: u64) -> Arc<Self> {
        Arc::new(Self {
            latest: AtomicU64::new(latest),
            complete_on_upload: AtomicBool::new(true),
            ..Self::default()
        })
    }

    pub fn with_poll_delay(latest: u64, poll_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            latest: AtomicU64::new(latest),
            poll_delay,
            ..Self::default()
        })
    }

    pub fn polls(&self) -> usize {
        self.poll_times.lock().unwrap().len()
    }
}

impl PostingService for Arc<FakeService> {
    async fn upload(&self, payload: &UploadPayload) -> Result<()> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            anyhow::bail!("connection refused");
        }
        self.uploads.lock().unwrap().push(payload.clone());
        if self.complete_on_upload.load(Ordering::SeqCst) {
            self.latest.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn latest_completed_id(&self) -> Result<u64> {
        self.poll_times.lock().unwrap().push(Instant::now());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        time::sleep(self.poll_delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let failing = self.failing_polls.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_polls.store(failing - 1, Ordering::SeqCst);
            anyhow::bail!("status endpoint unavailable");
        }
        Ok(self.latest.load(Ordering::SeqCst))
    }
}
