//! Queue-driven candidate feeder.
//!
//! Producers push candidate FENs into a bounded queue; worker threads
//! drain it through an extractor and hand every accepted mate puzzle to
//! a sink. A dedup cache keeps re-fed positions from being analyzed
//! twice. A full queue is a backoff signal for the producer, never an
//! error that stops the run.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TrySendError};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::mate::{Extract, Extraction};
use crate::puzzle::Puzzle;

/// Error type for feeding attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeederError {
    /// The candidate queue is at capacity; try again later
    QueueFull,
    /// The feeder has been closed
    Closed,
}

impl fmt::Display for FeederError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeederError::QueueFull => write!(f, "candidate queue full"),
            FeederError::Closed => write!(f, "feeder closed"),
        }
    }
}

impl std::error::Error for FeederError {}

/// Receives every puzzle the workers accept.
pub type PuzzleSink = Arc<dyn Fn(Puzzle) + Send + Sync>;

/// Bounded candidate queue with extraction workers.
pub struct CandidateFeeder {
    tx: Option<SyncSender<String>>,
    seen: Arc<Mutex<HashSet<String>>>,
    workers: Vec<JoinHandle<()>>,
}

impl CandidateFeeder {
    /// Start `workers` extraction threads behind a queue of `capacity`
    /// candidates.
    #[must_use]
    pub fn new<E>(extractor: Arc<E>, capacity: usize, workers: usize, sink: PuzzleSink) -> Self
    where
        E: Extract + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::sync_channel::<String>(capacity);
        let rx = Arc::new(Mutex::new(rx));

        let handles = (0..workers.max(1))
            .map(|n| {
                let rx = Arc::clone(&rx);
                let extractor = Arc::clone(&extractor);
                let sink = Arc::clone(&sink);
                thread::spawn(move || worker_loop(n, &rx, extractor.as_ref(), sink.as_ref()))
            })
            .collect();

        CandidateFeeder {
            tx: Some(tx),
            seen: Arc::new(Mutex::new(HashSet::new())),
            workers: handles,
        }
    }

    /// Offer one candidate FEN.
    ///
    /// Duplicates of already-fed positions are silently dropped. When
    /// the queue is full the candidate is not cached, so it can be
    /// re-offered after backing off.
    pub fn try_feed(&self, fen: &str) -> Result<(), FeederError> {
        if self.seen.lock().contains(fen) {
            return Ok(());
        }
        let tx = self.tx.as_ref().ok_or(FeederError::Closed)?;
        match tx.try_send(fen.to_string()) {
            Ok(()) => {
                self.seen.lock().insert(fen.to_string());
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(FeederError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(FeederError::Closed),
        }
    }

    /// Run a producer loop on its own thread until `stop` is set,
    /// sleeping `backoff` whenever the queue refuses a candidate.
    pub fn feed_from<F>(
        &self,
        mut source: F,
        backoff: Duration,
        stop: Arc<AtomicBool>,
    ) -> Option<JoinHandle<()>>
    where
        F: FnMut() -> String + Send + 'static,
    {
        let tx = self.tx.clone()?;
        let seen = Arc::clone(&self.seen);
        Some(thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                let fen = source();
                if seen.lock().contains(&fen) {
                    continue;
                }
                match tx.try_send(fen.clone()) {
                    Ok(()) => {
                        seen.lock().insert(fen);
                    }
                    Err(TrySendError::Full(_)) => thread::sleep(backoff),
                    Err(TrySendError::Disconnected(_)) => break,
                }
            }
        }))
    }

    /// Stop accepting candidates, drain the queue and join the
    /// workers.
    pub fn close(mut self) {
        self.tx.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("feeder worker panicked");
            }
        }
        info!("feeder closed");
    }
}

fn worker_loop<E: Extract + ?Sized>(
    n: usize,
    rx: &Mutex<Receiver<String>>,
    extractor: &E,
    sink: &(dyn Fn(Puzzle) + Send + Sync),
) {
    loop {
        let fen = {
            let guard = rx.lock();
            guard.recv()
        };
        let Ok(fen) = fen else {
            debug!("worker {n} draining out");
            return;
        };
        debug!("worker {n} analyzing {fen}");
        match extractor.extract(&fen) {
            Extraction::Mate { solution, mate_in } => {
                info!("worker {n} found mate in {mate_in}: {fen}");
                sink(Puzzle {
                    position: fen,
                    solution,
                    mate_in,
                    cp: 0,
                });
            }
            Extraction::Eval { cp } => debug!("worker {n}: no mate ({cp:+} cp)"),
            Extraction::Reject => debug!("worker {n}: rejected"),
        }
    }
}
