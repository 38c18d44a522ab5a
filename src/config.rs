use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::{ErrorKind, Result};

const RESPONSE_TIMEOUT_VAR: &str = "TIBIT_ONU_RESPONSE_TIMEOUT_MS";
const KPI_INTERVAL_VAR: &str = "TIBIT_ONU_KPI_INTERVAL_MS";
const QUEUE_DEPTH_VAR: &str = "TIBIT_ONU_QUEUE_DEPTH";

#[derive(Clone, Debug, PartialEq)]
pub struct AdapterConfig {
    /// How long an exchange waits for its response. `None` waits forever.
    pub response_timeout: Option<Duration>,
    pub kpi_interval: Duration,
    /// Capacity of each device's inbound frame queue.
    pub inbound_queue_depth: usize,
    pub kpi_prefix: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            response_timeout: Some(Duration::from_secs(3)),
            kpi_interval: Duration::from_secs(15),
            inbound_queue_depth: 16,
            kpi_prefix: "voltha.tibit_onu".to_string(),
        }
    }
}

impl AdapterConfig {
    /// Defaults, overridden by any `TIBIT_ONU_*` variables that are set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(millis) = parse::<u64>(RESPONSE_TIMEOUT_VAR, lookup(RESPONSE_TIMEOUT_VAR))? {
            config.response_timeout = match millis {
                0 => None,
                millis => Some(Duration::from_millis(millis)),
            };
        }

        if let Some(millis) = parse::<u64>(KPI_INTERVAL_VAR, lookup(KPI_INTERVAL_VAR))? {
            if millis == 0 {
                return Err(invalid(KPI_INTERVAL_VAR, millis));
            }
            config.kpi_interval = Duration::from_millis(millis);
        }

        if let Some(depth) = parse::<usize>(QUEUE_DEPTH_VAR, lookup(QUEUE_DEPTH_VAR))? {
            if depth == 0 {
                return Err(invalid(QUEUE_DEPTH_VAR, depth));
            }
            config.inbound_queue_depth = depth;
        }

        Ok(config)
    }
}

fn parse<T>(name: &'static str, value: Option<String>) -> Result<Option<T>>
where
    T: FromStr,
{
    match value {
        None => Ok(None),
        Some(value) => match value.trim().parse() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(invalid(name, value)),
        },
    }
}

fn invalid<V>(name: &'static str, value: V) -> crate::Error
where
    V: ToString,
{
    ErrorKind::InvalidConfig {
        name,
        value: value.to_string(),
    }
    .into()
}
