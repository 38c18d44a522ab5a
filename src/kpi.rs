use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use onu_helpers::Periodic;
use rand::Rng;

use crate::TelemetrySink;

pub type Metrics = BTreeMap<String, f64>;

/// One sample of device metrics, grouped by metric prefix.
#[derive(Clone, Debug, PartialEq)]
pub struct KpiEvent {
    pub timestamp: DateTime<Utc>,
    pub prefixes: BTreeMap<String, Metrics>,
}

/// Periodically submits per-device metrics.
///
/// The device exposes no counters over EOAM yet, so the values are simulated.
#[derive(Clone)]
pub struct KpiCollector {
    sink: Arc<dyn TelemetrySink>,
    interval: Duration,
    prefix: String,
}

impl KpiCollector {
    pub fn new(sink: Arc<dyn TelemetrySink>, interval: Duration, prefix: String) -> Self {
        Self {
            sink,
            interval,
            prefix,
        }
    }

    /// Starts collection for one device. Collection stops when the handle is dropped.
    pub fn start(&self, device_id: &str) -> Periodic {
        let sink = self.sink.clone();
        let prefix = format!("{}.{}", self.prefix, device_id);
        info!("starting kpi collection under {}", prefix);

        Periodic::start(self.interval, move || sink.submit(sample(&prefix)))
    }
}

fn sample(prefix: &str) -> KpiEvent {
    let mut rng = rand::thread_rng();

    let uni = metrics(&[
        ("tx_pkts", f64::from(rng.gen_range(0..=100u32))),
        ("rx_pkts", f64::from(rng.gen_range(0..=100u32))),
        ("tx_bytes", f64::from(rng.gen_range(0..=100_000u32))),
        ("rx_bytes", f64::from(rng.gen_range(0..=100_000u32))),
    ]);
    // The PON side sees the UNI traffic in reverse.
    let pon = metrics(&[
        ("tx_pkts", uni["rx_pkts"]),
        ("rx_pkts", uni["tx_pkts"]),
        ("tx_bytes", uni["rx_bytes"]),
        ("rx_bytes", uni["tx_bytes"]),
    ]);
    let device = metrics(&[
        ("cpu_util", 20.0 + 5.0 * rng.gen::<f64>()),
        ("buffer_util", 10.0 + 10.0 * rng.gen::<f64>()),
    ]);

    let mut prefixes = BTreeMap::new();
    prefixes.insert(prefix.to_string(), device);
    prefixes.insert(format!("{}.nni", prefix), uni);
    prefixes.insert(format!("{}.pon", prefix), pon);

    KpiEvent {
        timestamp: Utc::now(),
        prefixes,
    }
}

fn metrics(pairs: &[(&str, f64)]) -> Metrics {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), *value))
        .collect()
}
