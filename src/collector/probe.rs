//! Probe interface and helper probes.
//!
//! A probe is an independent source of device data. The aggregator hands
//! every probe a single-use [`Reporter`]; the probe must eventually call
//! [`Reporter::report`] with whatever it found (possibly nothing).

use crate::models::PartialDocument;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

type Sink = Box<dyn FnOnce(PartialDocument) + Send + 'static>;

/// A named, independently running data source.
pub trait Probe: Send + Sync + 'static {
    /// Stable key under which this probe's result is merged.
    fn name(&self) -> &str;

    /// Starts collection. Runs on a blocking-pool thread, so it may block;
    /// it may also hand the reporter to another task and return early.
    fn collect(&self, reporter: Reporter);
}

/// Single-use handle through which a probe delivers its result.
///
/// Dropping a reporter without calling [`report`](Reporter::report) records
/// an empty result, so a probe that bails out early or panics still counts
/// toward the round. A reporter that is kept alive and never used stalls the
/// round; wrap such probes in a [`TimeoutProbe`].
pub struct Reporter {
    probe: String,
    sink: Option<Sink>,
}

impl Reporter {
    /// Creates a reporter that forwards the result to `sink`.
    pub fn new<F>(probe: impl Into<String>, sink: F) -> Self
    where
        F: FnOnce(PartialDocument) + Send + 'static,
    {
        Self {
            probe: probe.into(),
            sink: Some(Box::new(sink)),
        }
    }

    /// Name of the probe this reporter belongs to.
    pub fn probe(&self) -> &str {
        &self.probe
    }

    /// Delivers the probe's result.
    pub fn report(mut self, partial: PartialDocument) {
        if let Some(sink) = self.sink.take() {
            sink(partial);
        }
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        if let Some(sink) = self.sink.take() {
            warn!("Probe '{}' finished without reporting, recording empty result", self.probe);
            sink(PartialDocument::new());
        }
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("probe", &self.probe)
            .field("pending", &self.sink.is_some())
            .finish()
    }
}

/// Probe backed by a closure.
pub struct FnProbe<F> {
    name: String,
    collect: F,
}

impl<F> FnProbe<F>
where
    F: Fn(Reporter) + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, collect: F) -> Self {
        Self {
            name: name.into(),
            collect,
        }
    }
}

impl<F> Probe for FnProbe<F>
where
    F: Fn(Reporter) + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn collect(&self, reporter: Reporter) {
        (self.collect)(reporter);
    }
}

/// Probe that always reports the same document.
#[derive(Debug, Clone)]
pub struct StaticProbe {
    name: String,
    document: PartialDocument,
}

impl StaticProbe {
    pub fn new(name: impl Into<String>, document: PartialDocument) -> Self {
        Self {
            name: name.into(),
            document,
        }
    }
}

impl Probe for StaticProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn collect(&self, reporter: Reporter) {
        reporter.report(self.document.clone());
    }
}

/// Wraps a probe with a deadline.
///
/// The inner probe and a timer race for the reporter; whichever comes
/// first wins and the other is ignored. On expiry the probe contributes an
/// empty result. The timer needs a tokio runtime; without one the inner
/// probe runs unbounded.
pub struct TimeoutProbe {
    inner: Arc<dyn Probe>,
    timeout: Duration,
}

impl TimeoutProbe {
    pub fn new(inner: Arc<dyn Probe>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// The configured deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Probe for TimeoutProbe {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn collect(&self, reporter: Reporter) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(
                    "No tokio runtime for probe '{}', running without timeout",
                    self.name()
                );
                self.inner.collect(reporter);
                return;
            }
        };

        let slot = Arc::new(Mutex::new(Some(reporter)));
        let name = self.name().to_string();
        let timeout = self.timeout;

        let timer_slot = Arc::clone(&slot);
        let timer_name = name.clone();
        let timer = runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            let expired = timer_slot.lock().take();
            if let Some(reporter) = expired {
                warn!(
                    "Probe '{}' timed out after {}ms",
                    timer_name,
                    timeout.as_millis()
                );
                reporter.report(PartialDocument::new());
            }
        });
        let timer = timer.abort_handle();

        self.inner.collect(Reporter::new(name.clone(), move |partial| {
            let pending = slot.lock().take();
            if let Some(reporter) = pending {
                timer.abort();
                reporter.report(partial);
            } else {
                debug!("Discarding late result from probe '{}'", name);
            }
        }));
    }
}

/// Convenience adapters for probes.
pub trait ProbeExt: Probe + Sized {
    /// Bounds this probe with [`TimeoutProbe`].
    fn with_timeout(self, timeout: Duration) -> TimeoutProbe {
        TimeoutProbe::new(Arc::new(self), timeout)
    }
}

impl<P: Probe> ProbeExt for P {}
