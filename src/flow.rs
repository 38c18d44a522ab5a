use std::fmt::{self, Display};
use std::net::Ipv4Addr;

use eoam::{multicast_mac, Attribute, DpoeCommand};

use crate::{DeviceLog, ErrorKind, PortNo, Result, PON_PORT_NO, UNI_PORT_NO};

const VLAN_VID_MASK: u16 = 0x0FFF;
const TPID_8021Q: u16 = 0x8100;

/// An OpenFlow match field.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MatchField {
    InPort(PortNo),
    EthType(u16),
    IpProto(u8),
    VlanVid(u16),
    VlanPcp(u8),
    UdpDst(u16),
    Ipv4Dst(Ipv4Addr),
    /// Any other OXM basic field, by field number.
    Other(u8),
}

impl Display for MatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchField::InPort(port) => write!(f, "in_port={}", port),
            MatchField::EthType(eth_type) => write!(f, "eth_type={:#06x}", eth_type),
            MatchField::IpProto(proto) => write!(f, "ip_proto={}", proto),
            MatchField::VlanVid(vid) => write!(f, "vlan_vid={}", vid & VLAN_VID_MASK),
            MatchField::VlanPcp(pcp) => write!(f, "vlan_pcp={}", pcp),
            MatchField::UdpDst(port) => write!(f, "udp_dst={}", port),
            MatchField::Ipv4Dst(addr) => write!(f, "ipv4_dst={}", addr),
            MatchField::Other(field) => write!(f, "oxm field {}", field),
        }
    }
}

/// An OpenFlow action.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Action {
    Output { port: PortNo },
    PopVlan,
    PushVlan { ethertype: u16 },
    SetField(MatchField),
    /// Any other action, by action type.
    Other(u16),
}

impl Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Output { port } => write!(f, "output:{}", port),
            Action::PopVlan => write!(f, "pop_vlan"),
            Action::PushVlan { ethertype } => write!(f, "push_vlan:{:#06x}", ethertype),
            Action::SetField(field) => write!(f, "set_field:{}", field),
            Action::Other(action_type) => write!(f, "action type {}", action_type),
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FlowRule {
    pub priority: u32,
    pub fields: Vec<MatchField>,
    pub actions: Vec<Action>,
}

impl FlowRule {
    pub fn in_port(&self) -> Option<PortNo> {
        self.fields.iter().find_map(|field| match field {
            MatchField::InPort(port) => Some(*port),
            _ => None,
        })
    }

    /// Device precedence, from 255 (highest) down. Each OpenFlow priority band of 256 drops one.
    pub fn precedence(&self) -> u8 {
        let band = std::cmp::min(self.priority / 256, 255);
        255 - band as u8
    }
}

/// Groups are not supported; only their presence matters.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FlowGroup {
    pub group_id: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    Upstream,
    Downstream,
}

impl Direction {
    /// Traffic entering the UNI goes upstream, traffic entering the PON goes downstream.
    pub fn from_in_port(port: PortNo) -> Result<Self> {
        match port {
            UNI_PORT_NO => Ok(Direction::Upstream),
            PON_PORT_NO => Ok(Direction::Downstream),
            port => Err(ErrorKind::InvalidInPort(port).into()),
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Upstream => write!(f, "upstream"),
            Direction::Downstream => write!(f, "downstream"),
        }
    }
}

/// A rule that passed validation, with the device commands that realise it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TranslatedFlow {
    pub direction: Direction,
    pub precedence: u8,
    pub commands: Vec<DpoeCommand>,
}

/// Turns OpenFlow rules into DPoE commands.
///
/// Only downstream IPv4 multicast destinations produce commands today. Every other supported
/// field and action is accepted and logged. Anything unsupported rejects the whole rule before a
/// command is produced.
pub struct FlowTranslator {
    log: DeviceLog,
}

impl FlowTranslator {
    pub fn new(log: DeviceLog) -> Self {
        Self { log }
    }

    pub fn translate(&self, flow: &FlowRule) -> Result<TranslatedFlow> {
        let in_port = flow.in_port().ok_or(ErrorKind::MissingInPort)?;
        let direction = Direction::from_in_port(in_port)?;
        let precedence = flow.precedence();
        info!(
            "{}: {} rule, priority {} -> precedence {}",
            self.log, direction, flow.priority, precedence
        );

        let mut commands = Vec::new();
        for field in &flow.fields {
            if let Some(command) = self.translate_field(direction, field)? {
                commands.push(command);
            }
        }

        for action in &flow.actions {
            self.check_action(direction, action)?;
        }

        Ok(TranslatedFlow {
            direction,
            precedence,
            commands,
        })
    }

    fn translate_field(
        &self,
        direction: Direction,
        field: &MatchField,
    ) -> Result<Option<DpoeCommand>> {
        match *field {
            MatchField::Ipv4Dst(addr) if direction == Direction::Downstream => {
                if !addr.is_multicast() {
                    info!("{}: {} is not multicast, nothing to install", self.log, field);
                    return Ok(None);
                }

                let mac = multicast_mac(addr);
                info!("{}: {} -> static MAC {}", self.log, field, mac);
                Ok(Some(DpoeCommand::set_request(vec![
                    Attribute::add_static_mac_address(mac),
                ])))
            }
            MatchField::Other(_) => Err(ErrorKind::UnsupportedField(field.to_string()).into()),
            _ => {
                info!("{}: {} {}", self.log, direction, field);
                Ok(None)
            }
        }
    }

    fn check_action(&self, direction: Direction, action: &Action) -> Result<()> {
        match action {
            Action::PushVlan { ethertype } if *ethertype != TPID_8021Q => {
                // Accepted, but the device only tags with 802.1Q.
                error!("{}: unhandled TPID {:#06x}", self.log, ethertype);
            }
            Action::SetField(MatchField::VlanVid(_)) => {
                info!("{}: {} {}", self.log, direction, action);
            }
            Action::SetField(_) | Action::Other(_) => {
                return Err(ErrorKind::UnsupportedAction(action.to_string()).into());
            }
            _ => info!("{}: {} {}", self.log, direction, action),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eoam::{DpoeOpcode, MacAddress, Oui};

    fn translator() -> FlowTranslator {
        FlowTranslator::new(DeviceLog::new("onu-test"))
    }

    fn rule(fields: Vec<MatchField>, actions: Vec<Action>) -> FlowRule {
        FlowRule {
            priority: 1000,
            fields,
            actions,
        }
    }

    #[test]
    fn downstream_multicast_installs_static_mac() {
        let flow = rule(
            vec![
                MatchField::InPort(PON_PORT_NO),
                MatchField::EthType(0x0800),
                MatchField::Ipv4Dst(Ipv4Addr::new(239, 1, 2, 3)),
            ],
            vec![Action::PopVlan, Action::Output { port: UNI_PORT_NO }],
        );

        let translated = translator().translate(&flow).unwrap();
        assert_eq!(translated.direction, Direction::Downstream);
        assert_eq!(translated.commands.len(), 1);

        let command = &translated.commands[0];
        assert_eq!(command.oui, Oui::TIBIT);
        assert_eq!(command.opcode, DpoeOpcode::SetRequest);
        assert_eq!(
            command.attributes[0].mac_address(),
            Some(MacAddress([0x01, 0x00, 0x5e, 0x01, 0x02, 0x03]))
        );
    }

    #[test]
    fn upstream_destination_is_informational() {
        let flow = rule(
            vec![
                MatchField::InPort(UNI_PORT_NO),
                MatchField::Ipv4Dst(Ipv4Addr::new(239, 1, 2, 3)),
                MatchField::VlanVid(0x1000 | 100),
            ],
            vec![
                Action::PushVlan { ethertype: 0x8100 },
                Action::SetField(MatchField::VlanVid(0x1000 | 200)),
                Action::Output { port: PON_PORT_NO },
            ],
        );

        let translated = translator().translate(&flow).unwrap();
        assert_eq!(translated.direction, Direction::Upstream);
        assert!(translated.commands.is_empty());
    }

    #[test]
    fn downstream_unicast_destination_installs_nothing() {
        let flow = rule(
            vec![
                MatchField::InPort(PON_PORT_NO),
                MatchField::Ipv4Dst(Ipv4Addr::new(10, 0, 0, 1)),
            ],
            vec![],
        );
        assert!(translator().translate(&flow).unwrap().commands.is_empty());
    }

    #[test]
    fn in_port_decides_direction() {
        let error = translator()
            .translate(&rule(vec![MatchField::InPort(7)], vec![]))
            .unwrap_err();
        assert!(matches!(error.kind, ErrorKind::InvalidInPort(7)));

        let error = translator()
            .translate(&rule(vec![MatchField::EthType(0x0800)], vec![]))
            .unwrap_err();
        assert!(matches!(error.kind, ErrorKind::MissingInPort));
    }

    #[test]
    fn unsupported_field_rejects_rule() {
        let flow = rule(
            vec![
                MatchField::InPort(PON_PORT_NO),
                MatchField::Ipv4Dst(Ipv4Addr::new(239, 1, 2, 3)),
                MatchField::Other(6),
            ],
            vec![],
        );
        let error = translator().translate(&flow).unwrap_err();
        assert!(matches!(error.kind, ErrorKind::UnsupportedField(_)));
    }

    #[test]
    fn unsupported_actions_reject_rule() {
        for action in vec![Action::Other(11), Action::SetField(MatchField::VlanPcp(3))] {
            let flow = rule(
                vec![
                    MatchField::InPort(PON_PORT_NO),
                    MatchField::Ipv4Dst(Ipv4Addr::new(239, 1, 2, 3)),
                ],
                vec![action],
            );
            let error = translator().translate(&flow).unwrap_err();
            assert!(matches!(error.kind, ErrorKind::UnsupportedAction(_)));
        }
    }

    #[test]
    fn foreign_tpid_is_accepted() {
        let flow = rule(
            vec![MatchField::InPort(UNI_PORT_NO)],
            vec![Action::PushVlan { ethertype: 0x88a8 }],
        );
        assert!(translator().translate(&flow).is_ok());
    }

    #[test]
    fn precedence_bands() {
        let precedence = |priority| {
            FlowRule {
                priority,
                ..Default::default()
            }
            .precedence()
        };
        assert_eq!(precedence(0), 255);
        assert_eq!(precedence(255), 255);
        assert_eq!(precedence(256), 254);
        assert_eq!(precedence(1000), 252);
        assert_eq!(precedence(65535), 0);
        assert_eq!(precedence(u32::MAX), 0);
    }
}
