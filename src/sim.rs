//! A stand-in ONU that answers DPoE requests arriving through a `ProxyRouter`.

use eoam::{
    Attribute, DpoeCommand, DpoeOpcode, Frame, Oui, ResponseCode, DEVICE_ID,
    OPCODE_EVENT_NOTIFICATION, OPCODE_ORGANIZATION_SPECIFIC, ORGANIZATION_SPECIFIC_EVENT,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{Outbound, ProxyAddress, ProxyRouter, Result};

pub struct SimulatedOnu {
    router: ProxyRouter,
    outbound: mpsc::UnboundedReceiver<Outbound>,
    device_id: Vec<u8>,
    set_response_code: ResponseCode,
    unsolicited: Vec<Frame>,
}

impl SimulatedOnu {
    pub fn new(router: ProxyRouter, outbound: mpsc::UnboundedReceiver<Outbound>) -> Self {
        Self {
            router,
            outbound,
            device_id: vec![0x2A, 0xEA, 0x15, 0x00, 0x00, 0x01],
            set_response_code: ResponseCode::NO_ERROR,
            unsolicited: vec![],
        }
    }

    /// Code returned for every attribute of every Set-Request.
    pub fn with_set_response_code(mut self, code: ResponseCode) -> Self {
        self.set_response_code = code;
        self
    }

    /// Frames delivered ahead of each response.
    pub fn with_unsolicited(mut self, frames: Vec<Frame>) -> Self {
        self.unsolicited = frames;
        self
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.task())
    }

    async fn task(mut self) {
        while let Some((proxy_address, frame)) = self.outbound.recv().await {
            if let Err(error) = self.respond(&proxy_address, &frame).await {
                error!("simulated onu {}: {}", proxy_address, error);
            }
        }
    }

    async fn respond(&self, proxy_address: &ProxyAddress, frame: &Frame) -> Result<()> {
        let request = DpoeCommand::from_frame(frame)?;
        debug!("simulated onu {}: {}", proxy_address, request.opcode);

        let response = match request.opcode {
            DpoeOpcode::GetRequest => DpoeCommand::new(
                request.oui,
                DpoeOpcode::GetResponse,
                request
                    .attributes
                    .iter()
                    .map(|attribute| self.get(attribute))
                    .collect(),
            ),
            DpoeOpcode::SetRequest => DpoeCommand::new(
                request.oui,
                DpoeOpcode::SetResponse,
                request
                    .attributes
                    .iter()
                    .map(|attribute| Attribute::Response {
                        branch: attribute.branch(),
                        leaf: attribute.leaf(),
                        code: self.set_response_code,
                    })
                    .collect(),
            ),
            opcode => {
                warn!("simulated onu {}: ignoring {}", proxy_address, opcode);
                return Ok(());
            }
        };

        for frame in &self.unsolicited {
            self.router.deliver(proxy_address, frame.clone()).await?;
        }
        self.router
            .deliver(proxy_address, response.into_frame()?)
            .await
    }

    fn get(&self, attribute: &Attribute) -> Attribute {
        let (branch, leaf) = (attribute.branch(), attribute.leaf());
        if (branch, leaf) == DEVICE_ID {
            Attribute::Value {
                branch,
                leaf,
                value: self.device_id.clone(),
            }
        } else {
            Attribute::Response {
                branch,
                leaf,
                code: ResponseCode::UNSUPPORTED,
            }
        }
    }
}

/// An organization-specific event notification from `oui`.
pub fn event_notification(sequence_number: u16, oui: Oui) -> Frame {
    let mut bytes = vec![0x2A, 0xEA, 0x15, OPCODE_EVENT_NOTIFICATION];
    bytes.extend_from_slice(&sequence_number.to_be_bytes());
    bytes.extend_from_slice(&[ORGANIZATION_SPECIFIC_EVENT, 0x03]);
    bytes.extend_from_slice(&oui.0.to_be_bytes()[1..]);
    Frame::new(bytes)
}

/// An OMCI message carrying `body`.
pub fn omci_message(body: &[u8]) -> Frame {
    let mut bytes = vec![0x00, 0x19, 0xA7, OPCODE_ORGANIZATION_SPECIFIC];
    bytes.extend_from_slice(body);
    Frame::new(bytes)
}
