//! Execution contexts for completion callbacks.

use tokio::sync::mpsc;
use tracing::debug;

/// A unit of work handed to a [`CompletionQueue`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Where a round's completion callback runs.
pub trait CompletionQueue: Send + Sync + 'static {
    fn dispatch(&self, job: Job);
}

/// Runs the completion inline, on the thread of the last probe to report.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl CompletionQueue for Immediate {
    fn dispatch(&self, job: Job) {
        job();
    }
}

/// Spawns the completion as a task on the given runtime.
impl CompletionQueue for tokio::runtime::Handle {
    fn dispatch(&self, job: Job) {
        self.spawn(async move { job() });
    }
}

/// Sending half of a serial queue drained by [`MainLoop`].
///
/// Use this to deliver completions on a thread the caller owns, such as
/// a UI thread.
#[derive(Debug, Clone)]
pub struct MainQueue {
    tx: mpsc::UnboundedSender<Job>,
}

/// Receiving half of a [`MainQueue`]. Jobs run on whichever thread
/// calls [`next`](MainLoop::next) or [`drain`](MainLoop::drain).
#[derive(Debug)]
pub struct MainLoop {
    rx: mpsc::UnboundedReceiver<Job>,
}

impl MainQueue {
    /// Creates a connected queue and loop.
    pub fn new() -> (MainQueue, MainLoop) {
        let (tx, rx) = mpsc::unbounded_channel();
        (MainQueue { tx }, MainLoop { rx })
    }
}

impl CompletionQueue for MainQueue {
    fn dispatch(&self, job: Job) {
        if self.tx.send(job).is_err() {
            debug!("Main loop closed, dropping completion");
        }
    }
}

impl MainLoop {
    /// Waits for the next job and runs it. Returns `false` once every
    /// `MainQueue` handle has been dropped and the queue is empty.
    pub async fn next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Blocking variant of [`next`](MainLoop::next) for threads outside
    /// the runtime.
    pub fn blocking_next(&mut self) -> bool {
        match self.rx.blocking_recv() {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Runs every job queued right now without waiting. Returns how many ran.
    pub fn drain(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_immediate_runs_inline() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        Immediate.dispatch(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_main_queue_defers_until_drained() {
        let (queue, mut main_loop) = MainQueue::new();
        let ran = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counter = Arc::clone(&ran);
            queue.dispatch(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }

        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(main_loop.drain(), 3);
        assert_eq!(ran.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_main_loop_ends_when_queue_dropped() {
        let (queue, mut main_loop) = MainQueue::new();
        drop(queue);
        assert!(!main_loop.blocking_next());
    }

    #[tokio::test]
    async fn test_runtime_handle_spawns_job() {
        let (tx, rx) = futures::channel::oneshot::channel();
        tokio::runtime::Handle::current().dispatch(Box::new(move || {
            let _ = tx.send(std::thread::current().id());
        }));
        assert!(rx.await.is_ok());
    }
}
