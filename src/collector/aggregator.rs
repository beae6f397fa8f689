//! Concurrent fan-out and merge of probe results.
//!
//! One call to [`Aggregator::run`] is a *round*: every probe is started on
//! its own blocking-pool thread, each result is merged under a single lock
//! as it arrives, and the completion callback is dispatched exactly once,
//! after the last probe has reported.
//!
//! A probe that never reports stalls its round forever. The aggregator has
//! no timeout of its own; bound slow probes with
//! [`TimeoutProbe`](super::probe::TimeoutProbe).

use super::probe::{Probe, Reporter};
use super::queue::{CompletionQueue, Immediate};
use crate::models::{MergedDocument, PartialDocument};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

type Completion = Box<dyn FnOnce(MergedDocument) + Send + 'static>;

static NEXT_ROUND: AtomicU64 = AtomicU64::new(1);

/// Dispatches probes and merges their results.
#[derive(Clone)]
pub struct Aggregator {
    runtime: tokio::runtime::Handle,
    queue: Arc<dyn CompletionQueue>,
}

impl Aggregator {
    /// Creates an aggregator that runs probes on `runtime`'s blocking pool
    /// and completes inline on the last reporting thread.
    pub fn new(runtime: tokio::runtime::Handle) -> Self {
        Self {
            runtime,
            queue: Arc::new(Immediate),
        }
    }

    /// Like [`new`](Aggregator::new) with the current runtime.
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }

    /// Delivers completions through `queue` instead of inline.
    pub fn with_queue(mut self, queue: impl CompletionQueue) -> Self {
        self.queue = Arc::new(queue);
        self
    }

    /// Starts a round and returns without waiting for it.
    ///
    /// `completion` receives the merged document once every probe has
    /// reported. Probes reporting an empty document contribute no key;
    /// probes sharing a name overwrite each other in arrival order.
    pub fn run<F>(&self, probes: Vec<Arc<dyn Probe>>, completion: F)
    where
        F: FnOnce(MergedDocument) + Send + 'static,
    {
        let round = Round::new(probes.len(), Box::new(completion), Arc::clone(&self.queue));
        debug!("Round {} dispatching {} probes", round.id, probes.len());

        if probes.is_empty() {
            round.finish_empty();
            return;
        }

        for probe in probes {
            let round = Arc::clone(&round);
            self.runtime.spawn_blocking(move || {
                let name = probe.name().to_string();
                let reporter = Reporter::new(name.clone(), move |partial| {
                    round.merge(&name, partial);
                });
                probe.collect(reporter);
            });
        }
    }

    /// Runs a round and waits for its merged document.
    ///
    /// With a [`MainQueue`](super::queue::MainQueue) the future resolves only
    /// after the main loop has run the completion. If the queue drops the
    /// completion instead (its [`MainLoop`](super::queue::MainLoop) is gone),
    /// the round's results are lost and an empty document is returned with
    /// a warning.
    pub async fn collect(&self, probes: Vec<Arc<dyn Probe>>) -> MergedDocument {
        let (tx, rx) = futures::channel::oneshot::channel();
        self.run(probes, move |merged| {
            let _ = tx.send(merged);
        });
        match rx.await {
            Ok(merged) => merged,
            Err(_) => {
                warn!("Completion was dropped before delivery; returning an empty profile");
                MergedDocument::new()
            }
        }
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator").finish_non_exhaustive()
    }
}

/// Merge state for a single round.
struct Round {
    id: u64,
    state: Mutex<RoundState>,
    queue: Arc<dyn CompletionQueue>,
}

struct RoundState {
    document: MergedDocument,
    pending: usize,
    completion: Option<Completion>,
}

impl Round {
    fn new(pending: usize, completion: Completion, queue: Arc<dyn CompletionQueue>) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_ROUND.fetch_add(1, Ordering::Relaxed),
            state: Mutex::new(RoundState {
                document: MergedDocument::new(),
                pending,
                completion: Some(completion),
            }),
            queue,
        })
    }

    /// Records one probe's result. The last call hands the document to the
    /// completion queue.
    fn merge(&self, name: &str, partial: PartialDocument) {
        let finished = {
            let mut state = self.state.lock();
            if partial.is_empty() {
                debug!("Round {}: probe '{}' reported nothing", self.id, name);
            } else {
                debug!(
                    "Round {}: probe '{}' reported {} keys",
                    self.id,
                    name,
                    partial.len()
                );
                state.document.insert(name, partial);
            }

            state.pending = state.pending.saturating_sub(1);
            if state.pending == 0 {
                state
                    .completion
                    .take()
                    .map(|completion| (completion, std::mem::take(&mut state.document)))
            } else {
                None
            }
        };

        if let Some((completion, document)) = finished {
            self.complete(completion, document);
        }
    }

    fn finish_empty(&self) {
        let completion = self.state.lock().completion.take();
        if let Some(completion) = completion {
            self.complete(completion, MergedDocument::new());
        }
    }

    fn complete(&self, completion: Completion, document: MergedDocument) {
        info!(
            "Round {} complete: {} probes contributed",
            self.id,
            document.len()
        );
        self.queue.dispatch(Box::new(move || completion(document)));
    }
}
