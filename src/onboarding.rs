use std::sync::Arc;

use eoam::{
    check_set_response, get_value, Attribute, DpoeCommand, MacAddress, MessageType, DEVICE_ID,
};
use onu_helpers::Periodic;
use uuid::Uuid;

use crate::{
    AdapterConfig, AdminState, ConnectStatus, Device, DeviceLog, DeviceRegistry, ErrorKind,
    EventHandler, KpiCollector, LogicalDeviceId, LogicalPort, MessageExchange, OfpPort,
    OperStatus, PeerPort, Port, PortType, ProxyAddress, ProxyTransport, Result, OFPPF_10GB_FD,
    OFPPF_FIBER, OFPPS_LIVE, PON_PORT_NO, UNI_PORT_NO,
};

/// IGMP general query group, installed during the handshake to prove the device accepts sets.
const ALL_HOSTS_MAC: MacAddress = MacAddress([0x01, 0x00, 0x5e, 0x00, 0x00, 0x01]);

const VENDOR: &str = "Tibit Communications, Inc.";
const MODEL: &str = "10G GPON ONU";
const HARDWARE_VERSION: &str = "fa161020";
const FIRMWARE_VERSION: &str = "16.12.02";
const SOFTWARE_VERSION: &str = "1.0";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OnboardingState {
    Discovered,
    Provisioning,
    Handshaking,
    Active,
    Failed,
}

/// Everything a device needs after a successful onboarding.
pub struct Onboarded {
    pub device: Device,
    pub exchange: MessageExchange,
    pub kpi: Periodic,
}

/// Where a device sits: its parent, its proxy channel and its parent's logical device.
struct Linkage {
    parent_id: String,
    proxy_address: ProxyAddress,
    logical_device_id: LogicalDeviceId,
}

/// Takes one discovered device through to active service.
///
/// States only move forward. Any failure marks the device failed in the registry, with the
/// error as its reason.
pub struct Onboarding {
    config: AdapterConfig,
    registry: Arc<dyn DeviceRegistry>,
    transport: Arc<dyn ProxyTransport>,
    kpi: KpiCollector,
    state: OnboardingState,
    log: DeviceLog,
}

impl Onboarding {
    pub fn new(
        config: AdapterConfig,
        registry: Arc<dyn DeviceRegistry>,
        transport: Arc<dyn ProxyTransport>,
        kpi: KpiCollector,
        log: DeviceLog,
    ) -> Self {
        Self {
            config,
            registry,
            transport,
            kpi,
            state: OnboardingState::Discovered,
            log,
        }
    }

    pub fn state(&self) -> OnboardingState {
        self.state
    }

    pub async fn run(&mut self, device: Device) -> Result<Onboarded> {
        match self.activate(&device).await {
            Ok(onboarded) => Ok(onboarded),
            Err(error) => {
                self.fail(&device, &error);
                Err(error)
            }
        }
    }

    async fn activate(&mut self, device: &Device) -> Result<Onboarded> {
        let linkage = self.check_linkage(device)?;

        self.transition(OnboardingState::Provisioning);
        let device = self.populate_identity(device.clone())?;
        self.create_ports(&device, &linkage.parent_id)?;
        self.create_logical_port(&device, &linkage)?;

        self.transition(OnboardingState::Handshaking);
        let mut exchange = self.open_exchange(linkage.proxy_address)?;
        self.handshake(&mut exchange).await?;

        let mut device = self.registry.get_device(&device.id)?;
        device.oper_status = OperStatus::Active;
        device.reason = None;
        self.registry.update_device(&device)?;
        self.transition(OnboardingState::Active);

        let kpi = self.kpi.start(&device.id);

        Ok(Onboarded {
            device,
            exchange,
            kpi,
        })
    }

    fn transition(&mut self, to: OnboardingState) {
        debug!("{}: {:?} -> {:?}", self.log, self.state, to);
        self.state = to;
    }

    fn check_linkage(&self, device: &Device) -> Result<Linkage> {
        let parent_id = match &device.parent_id {
            Some(parent_id) if !parent_id.is_empty() => parent_id.clone(),
            _ => return Err(ErrorKind::Precondition("device has no parent").into()),
        };

        let proxy_address = match &device.proxy_address {
            Some(proxy_address) if proxy_address.is_complete() => proxy_address.clone(),
            Some(_) => {
                return Err(ErrorKind::Precondition("proxy address is incomplete").into());
            }
            None => return Err(ErrorKind::Precondition("device has no proxy address").into()),
        };

        let parent = self.registry.get_device(&parent_id)?;
        let logical_device_id = match parent.parent_id {
            Some(logical_device_id) if !logical_device_id.is_empty() => logical_device_id,
            _ => {
                return Err(ErrorKind::Precondition("parent has no logical device").into());
            }
        };

        Ok(Linkage {
            parent_id,
            proxy_address,
            logical_device_id,
        })
    }

    fn populate_identity(&self, mut device: Device) -> Result<Device> {
        device.vendor = VENDOR.to_string();
        device.model = MODEL.to_string();
        device.hardware_version = HARDWARE_VERSION.to_string();
        device.firmware_version = FIRMWARE_VERSION.to_string();
        device.software_version = SOFTWARE_VERSION.to_string();
        device.serial_number = Uuid::new_v4().simple().to_string();
        device.connect_status = ConnectStatus::Reachable;

        info!("{}: serial number {}", self.log, device.serial_number);
        self.registry.update_device(&device)?;
        Ok(device)
    }

    fn create_ports(&self, device: &Device, parent_id: &str) -> Result<()> {
        self.registry.add_port(
            &device.id,
            Port {
                port_no: UNI_PORT_NO,
                label: "UNI facing Ethernet port".to_string(),
                port_type: PortType::EthernetUni,
                admin_state: AdminState::Enabled,
                oper_status: OperStatus::Active,
                peers: vec![],
            },
        )?;

        self.registry.add_port(
            &device.id,
            Port {
                port_no: PON_PORT_NO,
                label: "PON port".to_string(),
                port_type: PortType::PonOnu,
                admin_state: AdminState::Enabled,
                oper_status: OperStatus::Active,
                peers: vec![PeerPort {
                    device_id: parent_id.to_string(),
                    port_no: device.parent_port_no,
                }],
            },
        )
    }

    /// The channel id is unique on the parent's PON port, and so within the logical device too.
    fn create_logical_port(&self, device: &Device, linkage: &Linkage) -> Result<()> {
        let port_no = linkage.proxy_address.channel_id;
        let cap = OFPPF_10GB_FD | OFPPF_FIBER;

        self.registry.add_logical_port(
            &linkage.logical_device_id,
            LogicalPort {
                id: port_no.to_string(),
                ofp_port: OfpPort {
                    port_no,
                    hw_addr: device.mac_address,
                    name: format!("uni-{}", port_no),
                    config: 0,
                    state: OFPPS_LIVE,
                    curr: cap,
                    advertised: cap,
                    peer: cap,
                    curr_speed: OFPPF_10GB_FD,
                    max_speed: OFPPF_10GB_FD,
                },
                device_id: device.id.clone(),
                device_port_no: UNI_PORT_NO,
            },
        )
    }

    fn open_exchange(&self, proxy_address: ProxyAddress) -> Result<MessageExchange> {
        let inbound = self.transport.register(&proxy_address)?;
        Ok(MessageExchange::new(
            proxy_address,
            self.transport.clone(),
            inbound,
            Box::new(EventHandler::new(self.log.clone())),
            self.config.response_timeout,
            self.log.clone(),
        ))
    }

    /// Reads the device id, then installs a static MAC and checks the device accepted it.
    async fn handshake(&self, exchange: &mut MessageExchange) -> Result<()> {
        let stale = exchange.flush_stale();
        if stale > 0 {
            debug!("{}: flushed {} stale frames", self.log, stale);
        }

        let frame = exchange
            .exchange(
                DpoeCommand::get_request(vec![Attribute::device_id()]),
                MessageType::GetResponse,
            )
            .await?;

        // Only liveness matters here; the device id itself is informational.
        let (branch, leaf) = DEVICE_ID;
        match get_value(frame.attributes(), branch, leaf) {
            Ok(Some(device_id)) => info!("{}: device id {:?}", self.log, device_id.value),
            Ok(None) => info!("{}: device id not reported", self.log),
            Err(error) => info!("{}: device id: {}", self.log, error),
        }

        let frame = exchange
            .exchange(
                DpoeCommand::set_request(vec![Attribute::add_static_mac_address(ALL_HOSTS_MAC)]),
                MessageType::SetResponse,
            )
            .await?;

        check_set_response(frame.attributes())
            .into_result()
            .map_err(ErrorKind::HandshakeFailure)?;

        info!("{}: handshake complete", self.log);
        Ok(())
    }

    fn fail(&mut self, device: &Device, error: &crate::Error) {
        error!("{}: onboarding failed in {:?}: {}", self.log, self.state, error);
        self.transition(OnboardingState::Failed);

        let mut device = match self.registry.get_device(&device.id) {
            Ok(current) => current,
            Err(_) => device.clone(),
        };
        device.oper_status = OperStatus::Failed;
        device.reason = Some(error.to_string());

        if let Err(error) = self.registry.update_device(&device) {
            error!("{}: recording failure: {}", self.log, error);
        }
    }
}
