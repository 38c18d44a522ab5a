use std::collections::HashMap;
use std::sync::Mutex;

use crate::{
    Device, DeviceId, DeviceRegistry, ErrorKind, LogicalDeviceId, LogicalPort, Port, Result,
};

/// A write made through `DeviceRegistry`, in the order it was made.
#[derive(Clone, Debug, PartialEq)]
pub enum RegistryOp {
    UpdateDevice(Device),
    AddPort {
        device_id: DeviceId,
        port: Port,
    },
    AddLogicalPort {
        logical_device_id: LogicalDeviceId,
        port: LogicalPort,
    },
}

#[derive(Default)]
struct Records {
    devices: HashMap<DeviceId, Device>,
    ports: HashMap<DeviceId, Vec<Port>>,
    logical_ports: HashMap<LogicalDeviceId, Vec<LogicalPort>>,
    ops: Vec<RegistryOp>,
}

/// In-memory device registry that keeps a log of every write.
#[derive(Default)]
pub struct MemoryRegistry {
    records: Mutex<Records>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Seeds a device, as the core would on discovery. Not logged.
    pub fn insert_device(&self, device: Device) {
        let mut records = self.records.lock().expect("poisoned");
        records.devices.insert(device.id.clone(), device);
    }

    pub fn ops(&self) -> Vec<RegistryOp> {
        self.records.lock().expect("poisoned").ops.clone()
    }

    pub fn ports(&self, device_id: &str) -> Vec<Port> {
        let records = self.records.lock().expect("poisoned");
        records.ports.get(device_id).cloned().unwrap_or_default()
    }

    pub fn logical_ports(&self, logical_device_id: &str) -> Vec<LogicalPort> {
        let records = self.records.lock().expect("poisoned");
        records
            .logical_ports
            .get(logical_device_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl DeviceRegistry for MemoryRegistry {
    fn get_device(&self, device_id: &str) -> Result<Device> {
        let records = self.records.lock().expect("poisoned");
        match records.devices.get(device_id) {
            Some(device) => Ok(device.clone()),
            None => Err(ErrorKind::UnknownDevice(device_id.to_string()).into()),
        }
    }

    fn update_device(&self, device: &Device) -> Result<()> {
        let mut records = self.records.lock().expect("poisoned");
        match records.devices.get_mut(&device.id) {
            Some(current) => *current = device.clone(),
            None => return Err(ErrorKind::UnknownDevice(device.id.clone()).into()),
        }
        records.ops.push(RegistryOp::UpdateDevice(device.clone()));
        Ok(())
    }

    fn add_port(&self, device_id: &str, port: Port) -> Result<()> {
        let mut records = self.records.lock().expect("poisoned");
        if !records.devices.contains_key(device_id) {
            return Err(ErrorKind::UnknownDevice(device_id.to_string()).into());
        }
        records
            .ports
            .entry(device_id.to_string())
            .or_default()
            .push(port.clone());
        records.ops.push(RegistryOp::AddPort {
            device_id: device_id.to_string(),
            port,
        });
        Ok(())
    }

    fn add_logical_port(&self, logical_device_id: &str, port: LogicalPort) -> Result<()> {
        let mut records = self.records.lock().expect("poisoned");
        records
            .logical_ports
            .entry(logical_device_id.to_string())
            .or_default()
            .push(port.clone());
        records.ops.push(RegistryOp::AddLogicalPort {
            logical_device_id: logical_device_id.to_string(),
            port,
        });
        Ok(())
    }
}
