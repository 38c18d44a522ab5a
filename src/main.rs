use std::net::Ipv4Addr;
use std::sync::Arc;

use anyhow::Context;
use eoam::{MacAddress, Oui};
use tibit_onu::registry::MemoryRegistry;
use tibit_onu::sim::{self, SimulatedOnu};
use tibit_onu::{
    Action, AdapterConfig, Device, DeviceAdapter, FlowRule, KpiEvent, MatchField, ProxyAddress,
    ProxyRouter, TelemetrySink, TibitOnuAdapter, PON_PORT_NO, UNI_PORT_NO,
};

#[macro_use]
extern crate log;

struct LogSink;

impl TelemetrySink for LogSink {
    fn submit(&self, event: KpiEvent) {
        for (prefix, metrics) in &event.prefixes {
            info!("kpi {} {}: {:?}", event.timestamp, prefix, metrics);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let config = AdapterConfig::from_env().context("reading configuration")?;
    let (router, outbound) = ProxyRouter::new(config.inbound_queue_depth);
    SimulatedOnu::new(router.clone(), outbound)
        .with_unsolicited(vec![sim::event_notification(1, Oui::TIBIT)])
        .spawn();

    let registry = Arc::new(MemoryRegistry::new());
    registry.insert_device(Device {
        id: "olt-1".to_string(),
        parent_id: Some("logical-1".to_string()),
        ..Default::default()
    });
    let onu = Device {
        id: "onu-1".to_string(),
        device_type: "tibit_onu".to_string(),
        parent_id: Some("olt-1".to_string()),
        parent_port_no: 1,
        proxy_address: Some(ProxyAddress {
            device_id: "olt-1".to_string(),
            channel_id: 17,
        }),
        mac_address: MacAddress([0x00, 0x0c, 0xe2, 0x31, 0x40, 0x00]),
        ..Default::default()
    };
    registry.insert_device(onu.clone());

    let adapter = TibitOnuAdapter::new(config, registry, Arc::new(router), Arc::new(LogSink));
    let onu = adapter
        .adopt_device(onu)
        .await
        .context("onboarding onu-1")?;
    info!("{} is {:?}", onu.id, onu.oper_status);

    let flows = vec![FlowRule {
        priority: 1000,
        fields: vec![
            MatchField::InPort(PON_PORT_NO),
            MatchField::EthType(0x0800),
            MatchField::Ipv4Dst(Ipv4Addr::new(239, 1, 2, 3)),
        ],
        actions: vec![Action::PopVlan, Action::Output { port: UNI_PORT_NO }],
    }];
    for outcome in adapter.update_flows_bulk(&onu, &flows, &[]).await? {
        info!("flow: {:?}", outcome);
    }

    tokio::signal::ctrl_c().await?;
    Ok(())
}
