//! Device profile collection over the builtin probe set.

use super::aggregator::Aggregator;
use super::probe::{Probe, Reporter, TimeoutProbe};
use super::probes::{BrowserProbe, HardwareProbe, NetworkProbe, PlatformProbe, TelephonyProbe};
use crate::config::CollectorConfig;
use crate::models::MergedDocument;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Collects a device profile from a list of probes.
///
/// A `ProfileCollector` is itself a [`Probe`], reporting the merged profile
/// as one nested document, so profiles can be embedded in larger rounds.
#[derive(Clone)]
pub struct ProfileCollector {
    name: String,
    probes: Vec<Arc<dyn Probe>>,
    aggregator: Aggregator,
}

impl ProfileCollector {
    /// Name used when the collector reports as a probe.
    pub const DEFAULT_NAME: &'static str = "metadata";

    /// Creates a collector with no probes.
    pub fn new(aggregator: Aggregator) -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_string(),
            probes: Vec::new(),
            aggregator,
        }
    }

    /// Creates a collector over the builtin probes: platform, hardware,
    /// browser, telephony and network, in that order.
    pub fn with_defaults(aggregator: Aggregator) -> Self {
        Self::from_config(aggregator, &CollectorConfig::default())
    }

    /// Creates a collector over the builtin probes enabled in `config`,
    /// bounded by its probe timeout when one is set.
    pub fn from_config(aggregator: Aggregator, config: &CollectorConfig) -> Self {
        let builtin: Vec<Arc<dyn Probe>> = vec![
            Arc::new(PlatformProbe),
            Arc::new(HardwareProbe),
            Arc::new(BrowserProbe::new(config.user_agent.clone())),
            Arc::new(TelephonyProbe::new(
                config.carrier_name.clone(),
                config.country_code.clone(),
            )),
            Arc::new(NetworkProbe::new(config.network_host.clone())),
        ];

        let timeout = config.probe_timeout_ms.map(Duration::from_millis);
        let mut collector = Self::new(aggregator);
        for probe in builtin {
            if !config.probes.iter().any(|name| name == probe.name()) {
                debug!("Probe '{}' disabled by configuration", probe.name());
                continue;
            }
            collector = match timeout {
                Some(timeout) => collector.with_probe(TimeoutProbe::new(probe, timeout)),
                None => collector.with_probe_arc(probe),
            };
        }
        collector
    }

    /// Renames the collector.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a probe.
    pub fn with_probe(self, probe: impl Probe) -> Self {
        self.with_probe_arc(Arc::new(probe))
    }

    /// Adds a shared probe.
    pub fn with_probe_arc(mut self, probe: Arc<dyn Probe>) -> Self {
        self.probes.push(probe);
        self
    }

    /// Names of the configured probes, in dispatch order.
    pub fn probe_names(&self) -> Vec<&str> {
        self.probes.iter().map(|p| p.name()).collect()
    }

    /// Runs every probe and returns the merged profile.
    pub async fn collect(&self) -> MergedDocument {
        info!("Collecting device profile from {} probes", self.probes.len());
        self.aggregator.collect(self.probes.clone()).await
    }

    /// Runs every probe and hands the merged profile to `completion`.
    pub fn collect_with<F>(&self, completion: F)
    where
        F: FnOnce(MergedDocument) + Send + 'static,
    {
        self.aggregator.run(self.probes.clone(), completion);
    }
}

impl Probe for ProfileCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn collect(&self, reporter: Reporter) {
        self.collect_with(move |merged| reporter.report(merged.into_partial()));
    }
}

impl std::fmt::Debug for ProfileCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileCollector")
            .field("name", &self.name)
            .field("probes", &self.probe_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::probe::{FnProbe, StaticProbe};
    use crate::document;
    use crate::models::Value;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_default_probe_order() {
        let collector = ProfileCollector::with_defaults(Aggregator::current());
        assert_eq!(
            collector.probe_names(),
            vec!["platform", "hardware", "browser", "telephony", "network"]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_default_profile_skips_unconfigured_probes() {
        let collector = ProfileCollector::with_defaults(Aggregator::current());
        let profile = collector.collect().await;

        assert!(profile.contains("platform"));
        assert!(profile.contains("hardware"));
        assert!(!profile.contains("browser"));
        assert!(!profile.contains("telephony"));
        assert!(!profile.contains("network"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_config_selects_probes() {
        let config = CollectorConfig {
            probes: vec!["hardware".to_string(), "browser".to_string()],
            user_agent: Some("devprofile-test".to_string()),
            probe_timeout_ms: Some(1000),
            ..CollectorConfig::default()
        };

        let collector = ProfileCollector::from_config(Aggregator::current(), &config);
        assert_eq!(collector.probe_names(), vec!["hardware", "browser"]);

        let profile = collector.collect().await;
        assert_eq!(
            profile.get("browser").and_then(|b| b.get("userAgent")),
            Some(&Value::from("devprofile-test"))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_collector_nests_as_probe() {
        let inner = ProfileCollector::new(Aggregator::current())
            .with_probe(StaticProbe::new("hardware", document! { "cpu" => 4 }))
            .with_probe(FnProbe::new("empty", |reporter| reporter.report(document! {})));

        let outer = ProfileCollector::new(Aggregator::current())
            .named("outer")
            .with_probe(inner)
            .with_probe(StaticProbe::new("session", document! { "id" => "abc" }));

        let profile = outer.collect().await;

        let metadata = profile.get("metadata").expect("nested profile");
        assert_eq!(
            metadata.get("hardware"),
            Some(&Value::Map(document! { "cpu" => 4 }))
        );
        assert!(!metadata.contains_key("empty"));
        assert!(profile.contains("session"));
    }
}
