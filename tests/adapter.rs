use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use eoam::{DpoeCommand, DpoeOpcode, MacAddress, MessageType, Oui, ResponseCode};
use tibit_onu::registry::{MemoryRegistry, RegistryOp};
use tibit_onu::sim::{self, SimulatedOnu};
use tibit_onu::*;
use tokio::sync::mpsc;

const LOGICAL_DEVICE: &str = "logical-1";
const OLT: &str = "olt-1";
const ONU: &str = "onu-1";
const CHANNEL: u32 = 17;

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<KpiEvent>>,
}

impl TelemetrySink for RecordingSink {
    fn submit(&self, event: KpiEvent) {
        self.events.lock().unwrap().push(event);
    }
}

struct Harness {
    registry: Arc<MemoryRegistry>,
    router: ProxyRouter,
    sink: Arc<RecordingSink>,
    adapter: TibitOnuAdapter,
}

fn proxy_address() -> ProxyAddress {
    ProxyAddress {
        device_id: OLT.to_string(),
        channel_id: CHANNEL,
    }
}

fn onu() -> Device {
    Device {
        id: ONU.to_string(),
        device_type: "tibit_onu".to_string(),
        parent_id: Some(OLT.to_string()),
        parent_port_no: 1,
        proxy_address: Some(proxy_address()),
        mac_address: MacAddress([0x00, 0x0c, 0xe2, 0x31, 0x40, 0x00]),
        ..Default::default()
    }
}

fn config() -> AdapterConfig {
    AdapterConfig {
        response_timeout: Some(Duration::from_millis(200)),
        kpi_interval: Duration::from_secs(60),
        ..Default::default()
    }
}

/// Builds an adapter, handing back the frames it sends so the caller decides who answers them.
fn harness(config: AdapterConfig) -> (Harness, mpsc::UnboundedReceiver<Outbound>) {
    let registry = Arc::new(MemoryRegistry::new());
    registry.insert_device(Device {
        id: OLT.to_string(),
        parent_id: Some(LOGICAL_DEVICE.to_string()),
        ..Default::default()
    });
    registry.insert_device(onu());

    let (router, outbound) = ProxyRouter::new(config.inbound_queue_depth);
    let sink = Arc::new(RecordingSink::default());
    let adapter = TibitOnuAdapter::new(
        config,
        registry.clone(),
        Arc::new(router.clone()),
        sink.clone(),
    );

    let harness = Harness {
        registry,
        router,
        sink,
        adapter,
    };
    (harness, outbound)
}

fn simulated(config: AdapterConfig, onu: impl FnOnce(SimulatedOnu) -> SimulatedOnu) -> Harness {
    let (harness, outbound) = harness(config);
    onu(SimulatedOnu::new(harness.router.clone(), outbound)).spawn();
    harness
}

fn device_updates(ops: &[RegistryOp]) -> Vec<&Device> {
    ops.iter()
        .filter_map(|op| match op {
            RegistryOp::UpdateDevice(device) => Some(device),
            _ => None,
        })
        .collect()
}

fn multicast_flow(group: Ipv4Addr) -> FlowRule {
    FlowRule {
        priority: 1000,
        fields: vec![
            MatchField::InPort(PON_PORT_NO),
            MatchField::EthType(0x0800),
            MatchField::Ipv4Dst(group),
        ],
        actions: vec![Action::PopVlan, Action::Output { port: UNI_PORT_NO }],
    }
}

#[tokio::test]
async fn onboarding_activates_device() {
    let harness = simulated(config(), |onu| onu);

    let device = harness.adapter.adopt_device(onu()).await.unwrap();
    assert_eq!(device.oper_status, OperStatus::Active);
    assert!(harness.adapter.is_active(ONU));

    let ops = harness.registry.ops();
    let updates = device_updates(&ops);
    assert_eq!(updates.len(), 2);

    let identity = updates[0];
    assert_eq!(identity.vendor, "Tibit Communications, Inc.");
    assert_eq!(identity.model, "10G GPON ONU");
    assert_eq!(identity.hardware_version, "fa161020");
    assert_eq!(identity.firmware_version, "16.12.02");
    assert_eq!(identity.software_version, "1.0");
    assert_eq!(identity.serial_number.len(), 32);
    assert_eq!(identity.connect_status, ConnectStatus::Reachable);
    assert_eq!(updates[1].oper_status, OperStatus::Active);

    let ports = harness.registry.ports(ONU);
    assert_eq!(ports.len(), 2);
    assert_eq!(ports[0].port_no, UNI_PORT_NO);
    assert_eq!(ports[0].port_type, PortType::EthernetUni);
    assert_eq!(ports[1].port_no, PON_PORT_NO);
    assert_eq!(ports[1].port_type, PortType::PonOnu);
    assert_eq!(
        ports[1].peers,
        vec![PeerPort {
            device_id: OLT.to_string(),
            port_no: 1,
        }]
    );

    let logical_ports = harness.registry.logical_ports(LOGICAL_DEVICE);
    assert_eq!(logical_ports.len(), 1);
    let logical_port = &logical_ports[0];
    assert_eq!(logical_port.id, "17");
    assert_eq!(logical_port.device_id, ONU);
    assert_eq!(logical_port.device_port_no, UNI_PORT_NO);
    assert_eq!(logical_port.ofp_port.name, "uni-17");
    assert_eq!(logical_port.ofp_port.state, OFPPS_LIVE);
    assert_eq!(logical_port.ofp_port.curr, OFPPF_10GB_FD | OFPPF_FIBER);
    assert_eq!(logical_port.ofp_port.hw_addr, onu().mac_address);
}

#[tokio::test]
async fn onboarding_starts_telemetry_once() {
    let config = AdapterConfig {
        kpi_interval: Duration::from_millis(20),
        ..config()
    };
    let harness = simulated(config, |onu| onu);

    harness.adapter.adopt_device(onu()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(70)).await;

    let events = harness.sink.events.lock().unwrap().clone();
    assert!(events.len() >= 2);
    assert!(events
        .iter()
        .all(|event| event.prefixes.contains_key("voltha.tibit_onu.onu-1.pon")));

    let error = harness.adapter.adopt_device(onu()).await.unwrap_err();
    assert!(matches!(error.kind, ErrorKind::Precondition(_)));
}

#[tokio::test]
async fn concurrent_adoption_is_refused() {
    let harness = simulated(config(), |onu| onu);

    let (first, second) = tokio::join!(
        harness.adapter.adopt_device(onu()),
        harness.adapter.adopt_device(onu())
    );
    let (adopted, refused) = match (first, second) {
        (Ok(device), Err(error)) | (Err(error), Ok(device)) => (device, error),
        (first, second) => panic!("unexpected results {:?} {:?}", first, second),
    };
    assert_eq!(adopted.oper_status, OperStatus::Active);
    assert!(matches!(refused.kind, ErrorKind::Precondition(_)));

    assert_eq!(harness.registry.ports(ONU).len(), 2);
    assert_eq!(harness.registry.logical_ports(LOGICAL_DEVICE).len(), 1);
    assert_eq!(device_updates(&harness.registry.ops()).len(), 2);

    let device = harness.registry.get_device(ONU).unwrap();
    assert_eq!(device.oper_status, OperStatus::Active);
    assert_eq!(device.reason, None);
}

#[tokio::test]
async fn activation_clears_previous_failure() {
    let harness = simulated(config(), |onu| onu);
    let failed = Device {
        oper_status: OperStatus::Failed,
        reason: Some("timed out".to_string()),
        ..onu()
    };
    harness.registry.insert_device(failed.clone());

    let device = harness.adapter.adopt_device(failed).await.unwrap();
    assert_eq!(device.oper_status, OperStatus::Active);
    assert_eq!(device.reason, None);
}

#[tokio::test]
async fn dropping_adapter_stops_telemetry() {
    let config = AdapterConfig {
        kpi_interval: Duration::from_millis(10),
        ..config()
    };
    let harness = simulated(config, |onu| onu);
    harness.adapter.adopt_device(onu()).await.unwrap();

    let Harness { adapter, sink, .. } = harness;
    drop(adapter);
    tokio::task::yield_now().await;
    let submitted = sink.events.lock().unwrap().len();

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(sink.events.lock().unwrap().len(), submitted);
}

#[tokio::test]
async fn missing_channel_fails_before_ports() {
    let harness = simulated(config(), |onu| onu);
    let mut device = onu();
    device.proxy_address = Some(ProxyAddress {
        device_id: OLT.to_string(),
        channel_id: 0,
    });

    let error = harness.adapter.adopt_device(device).await.unwrap_err();
    assert!(matches!(error.kind, ErrorKind::Precondition(_)));

    let ops = harness.registry.ops();
    assert!(harness.registry.ports(ONU).is_empty());
    assert!(harness.registry.logical_ports(LOGICAL_DEVICE).is_empty());
    let updates = device_updates(&ops);
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].oper_status, OperStatus::Failed);
    assert!(updates[0].reason.is_some());
    assert!(!harness.adapter.is_active(ONU));
}

#[tokio::test]
async fn parent_without_logical_device_fails() {
    let harness = simulated(config(), |onu| onu);
    harness.registry.insert_device(Device {
        id: OLT.to_string(),
        ..Default::default()
    });

    let error = harness.adapter.adopt_device(onu()).await.unwrap_err();
    assert!(matches!(error.kind, ErrorKind::Precondition(_)));
    assert!(harness.registry.ports(ONU).is_empty());
}

#[tokio::test]
async fn refused_handshake_fails_device() {
    let harness = simulated(config(), |onu| {
        onu.with_set_response_code(ResponseCode::HARDWARE_FAILURE)
    });

    let error = harness.adapter.adopt_device(onu()).await.unwrap_err();
    assert!(matches!(error.kind, ErrorKind::HandshakeFailure(_)));

    let ops = harness.registry.ops();
    let updates = device_updates(&ops);
    let last = updates.last().unwrap();
    assert_eq!(last.oper_status, OperStatus::Failed);
    assert!(updates.iter().all(|d| d.oper_status != OperStatus::Active));
    assert!(harness.sink.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn silent_device_times_out() {
    let (harness, _outbound) = harness(AdapterConfig {
        response_timeout: Some(Duration::from_millis(30)),
        ..config()
    });

    let error = harness.adapter.adopt_device(onu()).await.unwrap_err();
    assert!(matches!(error.kind, ErrorKind::Timeout(_)));

    let device = harness.registry.get_device(ONU).unwrap();
    assert_eq!(device.oper_status, OperStatus::Failed);
}

#[tokio::test]
async fn handshake_skips_unsolicited_frames() {
    let harness = simulated(config(), |onu| {
        onu.with_unsolicited(vec![
            sim::event_notification(1, Oui::TIBIT),
            sim::omci_message(&[0x00, 0x01]),
        ])
    });

    let device = harness.adapter.adopt_device(onu()).await.unwrap();
    assert_eq!(device.oper_status, OperStatus::Active);
}

/// Answers every request, taking Set-Response codes from `set_codes` in turn. Hands back a copy
/// of each request.
fn scripted(
    router: ProxyRouter,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    set_codes: Vec<ResponseCode>,
) -> mpsc::UnboundedReceiver<DpoeCommand> {
    let (tx, sent) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut set_codes = set_codes.into_iter();
        while let Some((address, frame)) = outbound.recv().await {
            let request = DpoeCommand::from_frame(&frame).unwrap();
            let response = match request.opcode {
                DpoeOpcode::GetRequest => {
                    DpoeCommand::new(Oui::TIBIT, DpoeOpcode::GetResponse, vec![])
                }
                _ => {
                    let code = set_codes.next().unwrap_or(ResponseCode::NO_ERROR);
                    let attributes = request
                        .attributes
                        .iter()
                        .map(|attribute| eoam::Attribute::Response {
                            branch: attribute.branch(),
                            leaf: attribute.leaf(),
                            code,
                        })
                        .collect();
                    DpoeCommand::new(Oui::TIBIT, DpoeOpcode::SetResponse, attributes)
                }
            };
            tx.send(request).unwrap();
            router
                .deliver(&address, response.into_frame().unwrap())
                .await
                .unwrap();
        }
    });
    sent
}

#[tokio::test]
async fn downstream_multicast_flow_installs_mac() {
    let (harness, outbound) = harness(config());
    let mut sent = scripted(harness.router.clone(), outbound, vec![]);

    let device = harness.adapter.adopt_device(onu()).await.unwrap();
    // Get-Request and Set-Request of the handshake.
    sent.recv().await.unwrap();
    sent.recv().await.unwrap();

    let outcomes = harness
        .adapter
        .update_flows_bulk(&device, &[multicast_flow(Ipv4Addr::new(239, 1, 2, 3))], &[])
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(
        outcomes[0],
        FlowOutcome::Applied {
            direction: Direction::Downstream,
            precedence: 252,
            commands: 1,
        }
    ));

    let request = sent.recv().await.unwrap();
    assert_eq!(request.oui, Oui::TIBIT);
    assert_eq!(request.opcode, DpoeOpcode::SetRequest);
    assert_eq!(request.attributes.len(), 1);
    assert_eq!(
        request.attributes[0].mac_address(),
        Some(MacAddress([0x01, 0x00, 0x5e, 0x01, 0x02, 0x03]))
    );
    assert!(sent.try_recv().is_err());
}

#[tokio::test]
async fn refused_flow_command_fails_rule() {
    let (harness, outbound) = harness(config());
    let _sent = scripted(
        harness.router.clone(),
        outbound,
        vec![ResponseCode::NO_ERROR, ResponseCode::NO_RESOURCES],
    );
    let device = harness.adapter.adopt_device(onu()).await.unwrap();

    let flows = vec![
        multicast_flow(Ipv4Addr::new(239, 1, 2, 3)),
        multicast_flow(Ipv4Addr::new(239, 1, 2, 4)),
    ];
    let outcomes = harness
        .adapter
        .update_flows_bulk(&device, &flows, &[])
        .await
        .unwrap();

    match &outcomes[0] {
        FlowOutcome::Failed(error) => assert!(matches!(
            error.kind,
            ErrorKind::Eoam(eoam::Error {
                kind: eoam::ErrorKind::Response {
                    code: ResponseCode::NO_RESOURCES,
                    ..
                }
            })
        )),
        outcome => panic!("unexpected outcome {:?}", outcome),
    }
    assert!(outcomes[1].is_applied());
}

#[tokio::test]
async fn bulk_update_reports_each_rule() {
    let harness = simulated(config(), |onu| onu);
    let device = harness.adapter.adopt_device(onu()).await.unwrap();

    let flows = vec![
        multicast_flow(Ipv4Addr::new(239, 1, 2, 3)),
        FlowRule {
            fields: vec![MatchField::InPort(9)],
            ..Default::default()
        },
        FlowRule {
            fields: vec![MatchField::InPort(UNI_PORT_NO), MatchField::Other(6)],
            ..Default::default()
        },
        FlowRule {
            fields: vec![MatchField::InPort(UNI_PORT_NO)],
            actions: vec![Action::Other(11)],
            ..Default::default()
        },
        FlowRule {
            fields: vec![MatchField::EthType(0x0800)],
            ..Default::default()
        },
    ];
    let outcomes = harness
        .adapter
        .update_flows_bulk(&device, &flows, &[])
        .await
        .unwrap();

    assert!(outcomes[0].is_applied());
    let kinds: Vec<_> = outcomes[1..]
        .iter()
        .map(|outcome| match outcome {
            FlowOutcome::Rejected(error) => match error.kind {
                ErrorKind::InvalidInPort(_) => "in_port",
                ErrorKind::UnsupportedField(_) => "field",
                ErrorKind::UnsupportedAction(_) => "action",
                ErrorKind::MissingInPort => "missing",
                _ => "other",
            },
            _ => "not rejected",
        })
        .collect();
    assert_eq!(kinds, vec!["in_port", "field", "action", "missing"]);
}

#[tokio::test]
async fn groups_and_unknown_devices_are_rejected() {
    let harness = simulated(config(), |onu| onu);

    let error = harness
        .adapter
        .update_flows_bulk(&onu(), &[], &[FlowGroup { group_id: 1 }])
        .await
        .unwrap_err();
    assert!(matches!(error.kind, ErrorKind::UnsupportedGroups(1)));

    let error = harness
        .adapter
        .update_flows_bulk(&onu(), &[], &[])
        .await
        .unwrap_err();
    assert!(matches!(error.kind, ErrorKind::UnknownDevice(_)));
}

#[tokio::test]
async fn exchange_passes_events_to_handler_in_order() {
    #[derive(Clone, Default)]
    struct Seen(Arc<Mutex<Vec<MessageType>>>);

    impl UnsolicitedHandler for Seen {
        fn handle(&mut self, message_type: MessageType, _frame: &eoam::Frame) {
            self.0.lock().unwrap().push(message_type);
        }
    }

    let (router, outbound) = ProxyRouter::new(8);
    SimulatedOnu::new(router.clone(), outbound)
        .with_unsolicited(vec![
            sim::event_notification(1, Oui::CABLELABS),
            sim::omci_message(&[0x01]),
        ])
        .spawn();

    let seen = Seen::default();
    let inbound = router.register(&proxy_address()).unwrap();
    let mut exchange = MessageExchange::new(
        proxy_address(),
        Arc::new(router),
        inbound,
        Box::new(seen.clone()),
        None,
        DeviceLog::new(ONU),
    );

    let response = exchange
        .exchange(
            DpoeCommand::set_request(vec![eoam::Attribute::add_static_mac_address(
                MacAddress([0x01, 0x00, 0x5e, 0x00, 0x00, 0x01]),
            )]),
            MessageType::SetResponse,
        )
        .await
        .unwrap();
    assert_eq!(response.message_type(), MessageType::SetResponse);
    assert_eq!(
        *seen.0.lock().unwrap(),
        vec![MessageType::EventNotification, MessageType::OmciMessage]
    );
}

#[test]
fn packet_out_is_accepted() {
    let (harness, _outbound) = harness(config());
    harness
        .adapter
        .receive_packet_out(LOGICAL_DEVICE, UNI_PORT_NO, &[0u8; 64]);
    assert_eq!(harness.adapter.name(), "tibit_onu");
}
