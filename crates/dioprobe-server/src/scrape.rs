//! Metrics rendering off the event loop.
//!
//! Gathering the registry runs a disk probe, which can block for as long as
//! the disk does. One worker thread renders `/metrics` responses in arrival
//! order and hands them back through a channel, waking the event loop so it
//! can keep serving `/healthz` meanwhile.

use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryIter};
use std::thread;

use mio::{Token, Waker};
use prometheus::Registry;
use tracing::{debug, warn};

use crate::http;

/// A rendered `/metrics` response for the connection behind `Token`.
pub type Completed = (Token, String);

/// Handle to the scrape worker thread.
///
/// Dropping it closes the job queue; the worker exits once its current
/// render finishes. It is never joined, so a hung disk cannot hold up
/// shutdown.
pub struct ScrapeWorker {
    jobs: Sender<Token>,
    results: Receiver<Completed>,
}

impl ScrapeWorker {
    /// Starts the worker. `waker` is woken after every finished render.
    pub fn spawn(registry: Registry, waker: Arc<Waker>) -> io::Result<Self> {
        let (jobs, inbox) = mpsc::channel::<Token>();
        let (outbox, results) = mpsc::channel::<Completed>();

        thread::Builder::new()
            .name("dioprobe-scrape".to_string())
            .spawn(move || {
                for token in inbox {
                    let response = http::metrics_response(&registry);
                    if outbox.send((token, response)).is_err() {
                        break;
                    }
                    if let Err(e) = waker.wake() {
                        warn!("failed to wake event loop after scrape: {e}");
                    }
                }
                debug!("scrape worker stopped");
            })?;

        Ok(Self { jobs, results })
    }

    /// Queues a render for `token`. Returns false if the worker is gone.
    pub fn submit(&self, token: Token) -> bool {
        self.jobs.send(token).is_ok()
    }

    /// Drains the renders finished so far without blocking.
    pub fn completed(&self) -> TryIter<'_, Completed> {
        self.results.try_iter()
    }
}
