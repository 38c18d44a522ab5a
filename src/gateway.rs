//! Seams to the orchestration core that owns device records and the proxy channel.

use std::pin::Pin;
use std::task::{Context, Poll};

use eoam::Frame;
use futures::Stream;
use tokio::sync::mpsc;

use crate::{Device, KpiEvent, LogicalPort, Port, ProxyAddress, Result};

/// Device, port and logical port records, as held by the orchestration core.
pub trait DeviceRegistry: Send + Sync {
    fn get_device(&self, device_id: &str) -> Result<Device>;

    fn update_device(&self, device: &Device) -> Result<()>;

    fn add_port(&self, device_id: &str, port: Port) -> Result<()>;

    fn add_logical_port(&self, logical_device_id: &str, port: LogicalPort) -> Result<()>;
}

/// Carries frames to and from a device through its parent OLT.
pub trait ProxyTransport: Send + Sync {
    /// Starts receiving frames addressed from `proxy_address`. There may only be one reader per
    /// address at a time.
    fn register(&self, proxy_address: &ProxyAddress) -> Result<InboundFrames>;

    fn send(&self, proxy_address: &ProxyAddress, frame: Frame) -> Result<()>;
}

pub trait TelemetrySink: Send + Sync {
    fn submit(&self, event: KpiEvent);
}

/// Frames received from one device, in arrival order.
pub struct InboundFrames {
    rx: mpsc::Receiver<Frame>,
}

impl InboundFrames {
    pub fn new(rx: mpsc::Receiver<Frame>) -> Self {
        Self { rx }
    }

    /// Takes a frame that is already queued, without waiting.
    pub fn try_next(&mut self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }
}

impl Stream for InboundFrames {
    type Item = Frame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
