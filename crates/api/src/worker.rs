use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use anyhow::Context as _;
use catalog_core::{ApiRequest, CallResult, Transport};
use tracing::debug;

struct Job<T> {
    tag: T,
    request: ApiRequest,
}

/// Runs backend calls on a background thread so the terminal loop never blocks.
///
/// Each request carries a caller-chosen tag that comes back with its result. Results
/// arrive in submission order; dropping the worker lets in-flight calls finish and then
/// stops the thread.
pub struct ApiWorker<T> {
    jobs: Sender<Job<T>>,
    results: Receiver<(T, CallResult)>,
    pending: usize,
}

impl<T: Send + 'static> ApiWorker<T> {
    pub fn spawn<C>(transport: C) -> anyhow::Result<Self>
    where
        C: Transport + Send + 'static,
    {
        let (jobs, job_rx) = mpsc::channel::<Job<T>>();
        let (result_tx, results) = mpsc::channel();

        thread::Builder::new()
            .name("api-worker".to_string())
            .spawn(move || {
                while let Ok(Job { tag, request }) = job_rx.recv() {
                    let result = transport.execute(&request);
                    if result_tx.send((tag, result)).is_err() {
                        break;
                    }
                }
                debug!("api worker stopped");
            })
            .context("spawn api worker thread")?;

        Ok(Self {
            jobs,
            results,
            pending: 0,
        })
    }

    pub fn submit(&mut self, tag: T, request: ApiRequest) -> anyhow::Result<()> {
        debug!(%request, "queue request");
        self.jobs
            .send(Job { tag, request })
            .map_err(|_| anyhow::anyhow!("api worker is no longer running"))?;
        self.pending += 1;
        Ok(())
    }

    /// Every result that has arrived since the last poll.
    pub fn poll(&mut self) -> Vec<(T, CallResult)> {
        let mut out = Vec::new();
        loop {
            match self.results.try_recv() {
                Ok(item) => {
                    self.pending = self.pending.saturating_sub(1);
                    out.push(item);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        out
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn is_busy(&self) -> bool {
        self.pending > 0
    }
}
