//! Builtin device probes.
//!
//! Each probe reads one facet of the host. Anything a probe cannot read is
//! left out of its document; a probe with nothing to say reports an empty
//! document and is dropped from the merged profile.

use super::probe::{Probe, Reporter};
use crate::models::{PartialDocument, Value};
use chrono::{Local, Utc};
use std::net::ToSocketAddrs;
use tracing::debug;

/// Operating system, locale and clock details.
#[derive(Debug, Clone, Default)]
pub struct PlatformProbe;

impl PlatformProbe {
    pub const NAME: &'static str = "platform";

    fn read(&self) -> PartialDocument {
        let mut doc = PartialDocument::new();
        doc.insert("platform".into(), std::env::consts::OS.into());
        doc.insert("family".into(), std::env::consts::FAMILY.into());

        if let Some(locale) = first_env(&["LC_ALL", "LC_MESSAGES", "LANG"]) {
            // "en_US.UTF-8" -> "en_US"
            let locale = locale.split('.').next().unwrap_or(&locale).to_string();
            doc.insert("locale".into(), locale.into());
        }

        let offset = Local::now().offset().local_minus_utc();
        doc.insert("timeZoneOffset".into(), Value::from(offset / 60));

        if let Some(host) = first_env(&["HOSTNAME", "COMPUTERNAME"]) {
            doc.insert("deviceName".into(), host.into());
        }

        doc.insert("timestamp".into(), Value::from(Utc::now().timestamp_millis()));
        doc
    }
}

impl Probe for PlatformProbe {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn collect(&self, reporter: Reporter) {
        reporter.report(self.read());
    }
}

/// CPU and architecture details.
#[derive(Debug, Clone, Default)]
pub struct HardwareProbe;

impl HardwareProbe {
    pub const NAME: &'static str = "hardware";

    fn read(&self) -> PartialDocument {
        let mut doc = PartialDocument::new();
        match std::thread::available_parallelism() {
            Ok(cpus) => {
                doc.insert("cpu".into(), Value::from(cpus.get()));
            }
            Err(e) => debug!("Cannot read CPU count: {}", e),
        }
        doc.insert("architecture".into(), std::env::consts::ARCH.into());
        doc.insert("pointerWidth".into(), Value::from(usize::BITS));
        let endian = if cfg!(target_endian = "little") { "little" } else { "big" };
        doc.insert("endianness".into(), endian.into());
        doc
    }
}

impl Probe for HardwareProbe {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn collect(&self, reporter: Reporter) {
        reporter.report(self.read());
    }
}

/// Reports the embedding application's user agent, when it has one.
#[derive(Debug, Clone, Default)]
pub struct BrowserProbe {
    user_agent: Option<String>,
}

impl BrowserProbe {
    pub const NAME: &'static str = "browser";

    pub fn new(user_agent: Option<String>) -> Self {
        Self { user_agent }
    }
}

impl Probe for BrowserProbe {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn collect(&self, reporter: Reporter) {
        let mut doc = PartialDocument::new();
        if let Some(ref agent) = self.user_agent {
            doc.insert("userAgent".into(), agent.clone().into());
        }
        reporter.report(doc);
    }
}

/// Carrier details. Hosts without a radio only report what was configured.
#[derive(Debug, Clone, Default)]
pub struct TelephonyProbe {
    carrier_name: Option<String>,
    country_code: Option<String>,
}

impl TelephonyProbe {
    pub const NAME: &'static str = "telephony";

    pub fn new(carrier_name: Option<String>, country_code: Option<String>) -> Self {
        Self {
            carrier_name,
            country_code,
        }
    }
}

impl Probe for TelephonyProbe {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn collect(&self, reporter: Reporter) {
        let mut doc = PartialDocument::new();
        if let Some(ref carrier) = self.carrier_name {
            doc.insert("carrierName".into(), carrier.clone().into());
        }
        if let Some(ref country) = self.country_code {
            doc.insert("isoCountryCode".into(), country.clone().into());
        }
        reporter.report(doc);
    }
}

/// Connectivity check by resolving a reference host.
///
/// The lookup blocks, which is fine on the aggregator's blocking pool.
/// Without a configured host the probe reports nothing.
#[derive(Debug, Clone, Default)]
pub struct NetworkProbe {
    reference_host: Option<String>,
}

impl NetworkProbe {
    pub const NAME: &'static str = "network";

    /// `reference_host` is a `host:port` pair, e.g. `"example.com:443"`.
    pub fn new(reference_host: Option<String>) -> Self {
        Self { reference_host }
    }
}

impl Probe for NetworkProbe {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn collect(&self, reporter: Reporter) {
        let Some(ref host) = self.reference_host else {
            reporter.report(PartialDocument::new());
            return;
        };

        let connected = match host.as_str().to_socket_addrs() {
            Ok(mut addrs) => addrs.next().is_some(),
            Err(e) => {
                debug!("Lookup of {} failed: {}", host, e);
                false
            }
        };

        let mut doc = PartialDocument::new();
        doc.insert("connected".into(), connected.into());
        reporter.report(doc);
    }
}

fn first_env(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn run(probe: &dyn Probe) -> PartialDocument {
        let seen = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&seen);
        probe.collect(Reporter::new(probe.name(), move |doc| *slot.lock() = Some(doc)));
        let doc = seen.lock().take();
        doc.expect("builtin probes report synchronously")
    }

    #[test]
    fn test_platform_probe() {
        let doc = run(&PlatformProbe);
        assert_eq!(
            doc.get("platform").and_then(Value::as_str),
            Some(std::env::consts::OS)
        );
        assert!(doc.contains_key("timestamp"));
        assert!(doc.contains_key("timeZoneOffset"));
    }

    #[test]
    fn test_hardware_probe() {
        let doc = run(&HardwareProbe);
        assert!(doc.get("cpu").and_then(Value::as_i64).unwrap_or(0) >= 1);
        assert_eq!(
            doc.get("architecture").and_then(Value::as_str),
            Some(std::env::consts::ARCH)
        );
    }

    #[test]
    fn test_unconfigured_probes_report_nothing() {
        assert!(run(&BrowserProbe::default()).is_empty());
        assert!(run(&TelephonyProbe::default()).is_empty());
        assert!(run(&NetworkProbe::default()).is_empty());
    }

    #[test]
    fn test_configured_probes() {
        let browser = run(&BrowserProbe::new(Some("Mozilla/5.0".to_string())));
        assert_eq!(
            browser.get("userAgent").and_then(Value::as_str),
            Some("Mozilla/5.0")
        );

        let telephony = run(&TelephonyProbe::new(
            Some("Carrier".to_string()),
            Some("us".to_string()),
        ));
        assert_eq!(telephony.len(), 2);
    }

    #[test]
    fn test_network_probe_loopback() {
        let doc = run(&NetworkProbe::new(Some("127.0.0.1:443".to_string())));
        assert_eq!(doc.get("connected").and_then(Value::as_bool), Some(true));
    }
}
