//! Device adapter for Tibit 10G ONUs, managed over EOAM through their parent OLT.

mod adapter;
mod config;
mod errors;
mod events;
mod exchange;
mod flow;
mod gateway;
mod kpi;
mod onboarding;
mod proxy;
pub mod registry;
pub mod sim;
mod types;

#[macro_use]
extern crate log;

pub use crate::adapter::{DeviceAdapter, FlowOutcome, TibitOnuAdapter};
pub use crate::config::AdapterConfig;
pub use crate::errors::{Error, ErrorKind, Result};
pub use crate::events::EventHandler;
pub use crate::exchange::{ExchangeState, MessageExchange, UnsolicitedHandler};
pub use crate::flow::{
    Action, Direction, FlowGroup, FlowRule, FlowTranslator, MatchField, TranslatedFlow,
};
pub use crate::gateway::{DeviceRegistry, InboundFrames, ProxyTransport, TelemetrySink};
pub use crate::kpi::{KpiCollector, KpiEvent, Metrics};
pub use crate::onboarding::{Onboarded, Onboarding, OnboardingState};
pub use crate::proxy::{Outbound, ProxyRouter};
pub use crate::types::{
    AdminState, ConnectStatus, Device, DeviceId, DeviceLog, LogicalDeviceId, LogicalPort,
    OfpPort, OperStatus, PeerPort, Port, PortNo, PortType, ProxyAddress, OFPPF_10GB_FD,
    OFPPF_FIBER, OFPPS_LIVE, PON_PORT_NO, UNI_PORT_NO,
};
