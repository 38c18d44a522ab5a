use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use eoam::{check_set_response, MessageType};
use onu_helpers::Periodic;
use tokio::sync::Mutex as AsyncMutex;

use crate::{
    AdapterConfig, Device, DeviceId, DeviceLog, DeviceRegistry, Direction, Error, ErrorKind,
    FlowGroup, FlowRule, FlowTranslator, KpiCollector, MessageExchange, Onboarded, Onboarding,
    PortNo, ProxyTransport, Result, TelemetrySink, TranslatedFlow,
};

/// What became of one rule in a bulk flow update.
#[derive(Debug)]
pub enum FlowOutcome {
    Applied {
        direction: Direction,
        precedence: u8,
        commands: usize,
    },
    /// Failed validation. Nothing was sent for this rule.
    Rejected(Error),
    /// A command for this rule failed or was refused by the device.
    Failed(Error),
}

impl FlowOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, FlowOutcome::Applied { .. })
    }
}

/// Operations the orchestration core invokes on a device adapter.
#[async_trait]
pub trait DeviceAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Onboards a newly discovered device, returning it as last recorded.
    async fn adopt_device(&self, device: Device) -> Result<Device>;

    async fn update_flows_bulk(
        &self,
        device: &Device,
        flows: &[FlowRule],
        groups: &[FlowGroup],
    ) -> Result<Vec<FlowOutcome>>;

    fn receive_packet_out(&self, logical_device_id: &str, egress_port_no: PortNo, packet: &[u8]);
}

struct ActiveDevice {
    exchange: Arc<AsyncMutex<MessageExchange>>,
    // Held so collection runs for as long as the device is active.
    _kpi: Periodic,
}

/// Marks a device as mid-onboarding until dropped.
struct Adopting<'a> {
    adopting: &'a Mutex<HashSet<DeviceId>>,
    device_id: DeviceId,
}

impl Drop for Adopting<'_> {
    fn drop(&mut self) {
        self.adopting
            .lock()
            .expect("poisoned")
            .remove(&self.device_id);
    }
}

/// Adapter for Tibit ONUs reached through their OLT's proxy channel.
pub struct TibitOnuAdapter {
    config: AdapterConfig,
    registry: Arc<dyn DeviceRegistry>,
    transport: Arc<dyn ProxyTransport>,
    kpi: KpiCollector,
    devices: Mutex<HashMap<DeviceId, ActiveDevice>>,
    adopting: Mutex<HashSet<DeviceId>>,
}

impl TibitOnuAdapter {
    pub fn new(
        config: AdapterConfig,
        registry: Arc<dyn DeviceRegistry>,
        transport: Arc<dyn ProxyTransport>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        let kpi = KpiCollector::new(telemetry, config.kpi_interval, config.kpi_prefix.clone());
        Self {
            config,
            registry,
            transport,
            kpi,
            devices: Mutex::new(HashMap::new()),
            adopting: Mutex::new(HashSet::new()),
        }
    }

    pub fn is_active(&self, device_id: &str) -> bool {
        self.devices.lock().expect("poisoned").contains_key(device_id)
    }

    /// Claims `device_id` for onboarding. Refused while the device is active or already being
    /// onboarded.
    fn begin_adoption(&self, device_id: &str) -> Result<Adopting<'_>> {
        let mut adopting = self.adopting.lock().expect("poisoned");
        if self.is_active(device_id) {
            return Err(ErrorKind::Precondition("device already adopted").into());
        }
        if !adopting.insert(device_id.to_string()) {
            return Err(ErrorKind::Precondition("device is being adopted").into());
        }

        Ok(Adopting {
            adopting: &self.adopting,
            device_id: device_id.to_string(),
        })
    }

    fn exchange(&self, device_id: &str) -> Result<Arc<AsyncMutex<MessageExchange>>> {
        match self.devices.lock().expect("poisoned").get(device_id) {
            Some(active) => Ok(active.exchange.clone()),
            None => Err(ErrorKind::UnknownDevice(device_id.to_string()).into()),
        }
    }

    async fn install(
        &self,
        exchange: &mut MessageExchange,
        flow: TranslatedFlow,
        log: &DeviceLog,
    ) -> FlowOutcome {
        let commands = flow.commands.len();

        for command in flow.commands {
            let frame = match exchange.exchange(command, MessageType::SetResponse).await {
                Ok(frame) => frame,
                Err(error) => return FlowOutcome::Failed(error),
            };

            let outcome = check_set_response(frame.attributes());
            if let Err(error) = outcome.into_result() {
                warn!("{}: device refused flow command: {}", log, error);
                return FlowOutcome::Failed(error.into());
            }
        }

        FlowOutcome::Applied {
            direction: flow.direction,
            precedence: flow.precedence,
            commands,
        }
    }
}

#[async_trait]
impl DeviceAdapter for TibitOnuAdapter {
    fn name(&self) -> &str {
        "tibit_onu"
    }

    async fn adopt_device(&self, device: Device) -> Result<Device> {
        let log = DeviceLog::new(device.id.clone());
        info!("{}: adopting", log);

        let _adopting = self.begin_adoption(&device.id)?;

        let mut onboarding = Onboarding::new(
            self.config.clone(),
            self.registry.clone(),
            self.transport.clone(),
            self.kpi.clone(),
            log,
        );
        let Onboarded {
            device,
            exchange,
            kpi,
        } = onboarding.run(device).await?;

        self.devices.lock().expect("poisoned").insert(
            device.id.clone(),
            ActiveDevice {
                exchange: Arc::new(AsyncMutex::new(exchange)),
                _kpi: kpi,
            },
        );

        Ok(device)
    }

    async fn update_flows_bulk(
        &self,
        device: &Device,
        flows: &[FlowRule],
        groups: &[FlowGroup],
    ) -> Result<Vec<FlowOutcome>> {
        let log = DeviceLog::new(device.id.clone());
        info!(
            "{}: bulk flow update, {} flows, {} groups",
            log,
            flows.len(),
            groups.len()
        );

        if !groups.is_empty() {
            return Err(ErrorKind::UnsupportedGroups(groups.len()).into());
        }

        let exchange = self.exchange(&device.id)?;
        let mut exchange = exchange.lock().await;
        let translator = FlowTranslator::new(log.clone());

        let mut outcomes = Vec::with_capacity(flows.len());
        for flow in flows {
            let outcome = match translator.translate(flow) {
                Ok(translated) => self.install(&mut exchange, translated, &log).await,
                Err(error) => {
                    warn!("{}: rejecting flow: {}", log, error);
                    FlowOutcome::Rejected(error)
                }
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    fn receive_packet_out(&self, logical_device_id: &str, egress_port_no: PortNo, packet: &[u8]) {
        info!(
            "packet out: logical device {} port {} length {}",
            logical_device_id,
            egress_port_no,
            packet.len()
        );
    }
}
