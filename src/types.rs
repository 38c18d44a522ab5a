use std::fmt::{self, Display};

use eoam::MacAddress;

pub type DeviceId = String;
pub type LogicalDeviceId = String;
pub type PortNo = u32;

pub const UNI_PORT_NO: PortNo = 2;
pub const PON_PORT_NO: PortNo = 1;

// OpenFlow 1.3 port feature and state bits.
pub const OFPPF_10GB_FD: u32 = 1 << 6;
pub const OFPPF_FIBER: u32 = 1 << 12;
pub const OFPPS_LIVE: u32 = 1 << 2;

/// Routing key for frames relayed through the parent OLT.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct ProxyAddress {
    pub device_id: DeviceId,
    pub channel_id: u32,
}

impl ProxyAddress {
    pub fn is_complete(&self) -> bool {
        !self.device_id.is_empty() && self.channel_id != 0
    }
}

impl Display for ProxyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.device_id, self.channel_id)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AdminState {
    Unknown,
    Enabled,
    Disabled,
}

impl Default for AdminState {
    fn default() -> Self {
        AdminState::Unknown
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OperStatus {
    Unknown,
    Discovered,
    Activating,
    Active,
    Failed,
}

impl Default for OperStatus {
    fn default() -> Self {
        OperStatus::Unknown
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConnectStatus {
    Unknown,
    Unreachable,
    Reachable,
}

impl Default for ConnectStatus {
    fn default() -> Self {
        ConnectStatus::Unknown
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Device {
    pub id: DeviceId,
    pub device_type: String,
    /// Set for devices reached through a parent, e.g. an ONU behind an OLT. The parent's own
    /// `parent_id` is its logical device.
    pub parent_id: Option<DeviceId>,
    pub parent_port_no: PortNo,
    pub proxy_address: Option<ProxyAddress>,
    pub mac_address: MacAddress,
    pub vendor: String,
    pub model: String,
    pub hardware_version: String,
    pub firmware_version: String,
    pub software_version: String,
    pub serial_number: String,
    pub admin_state: AdminState,
    pub oper_status: OperStatus,
    pub connect_status: ConnectStatus,
    pub reason: Option<String>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PortType {
    EthernetNni,
    EthernetUni,
    PonOlt,
    PonOnu,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PeerPort {
    pub device_id: DeviceId,
    pub port_no: PortNo,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Port {
    pub port_no: PortNo,
    pub label: String,
    pub port_type: PortType,
    pub admin_state: AdminState,
    pub oper_status: OperStatus,
    pub peers: Vec<PeerPort>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OfpPort {
    pub port_no: PortNo,
    pub hw_addr: MacAddress,
    pub name: String,
    pub config: u32,
    pub state: u32,
    pub curr: u32,
    pub advertised: u32,
    pub peer: u32,
    pub curr_speed: u32,
    pub max_speed: u32,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogicalPort {
    pub id: String,
    pub ofp_port: OfpPort,
    pub device_id: DeviceId,
    pub device_port_no: PortNo,
}

/// Per-device logging context, prefixed onto every message a device's components emit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeviceLog {
    device_id: DeviceId,
}

impl DeviceLog {
    pub fn new<S>(device_id: S) -> Self
    where
        S: Into<DeviceId>,
    {
        Self {
            device_id: device_id.into(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

impl Display for DeviceLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device={}", self.device_id)
    }
}
