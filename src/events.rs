use eoam::{EventKind, EventNotification, FileTransferAck, Frame, MessageType};

use crate::{DeviceLog, UnsolicitedHandler};

/// Default handling of frames nobody was waiting for. Logs and drops them.
pub struct EventHandler {
    log: DeviceLog,
    events: u64,
}

impl EventHandler {
    pub fn new(log: DeviceLog) -> Self {
        Self { log, events: 0 }
    }

    /// Number of event notifications seen so far.
    pub fn events(&self) -> u64 {
        self.events
    }

    fn handle_omci(&mut self, frame: &Frame) {
        // No OMCI stack behind this adapter.
        debug!("{}: OMCI message, {} bytes", self.log, frame.len());
    }

    fn handle_event(&mut self, frame: &Frame) {
        self.events += 1;

        let event = match EventNotification::from_frame(frame) {
            Ok(event) => event,
            Err(error) => {
                info!("{}: malformed event notification: {}", self.log, error);
                return;
            }
        };
        debug!(
            "{}: event seq {:#06x} type {:#04x} length {} oui {}",
            self.log, event.sequence_number, event.tlv_type, event.length, event.oui
        );

        match event.kind() {
            EventKind::Dpoe => debug!("{}: DPoE event", self.log),
            EventKind::Tibit => self.handle_tibit_event(&event),
            EventKind::UnknownOui(oui) => info!("{}: event with unknown OUI {}", self.log, oui),
            EventKind::UnexpectedTlv(tlv_type) => {
                debug!("{}: unexpected event TLV type {:#04x}", self.log, tlv_type)
            }
        }
    }

    fn handle_tibit_event(&mut self, event: &EventNotification) {
        // Vendor events carry link state. Nothing here tracks it yet.
        debug!(
            "{}: Tibit event seq {:#06x} ignored",
            self.log, event.sequence_number
        );
    }

    fn handle_file_transfer(&mut self, frame: &Frame) {
        match FileTransferAck::from_frame(frame) {
            Ok(ack) => debug!(
                "{}: file transfer ack for block {} (code {:#04x})",
                self.log, ack.acked_block, ack.response_code
            ),
            Err(error) => info!("{}: malformed file transfer ack: {}", self.log, error),
        }
    }
}

impl UnsolicitedHandler for EventHandler {
    fn handle(&mut self, message_type: MessageType, frame: &Frame) {
        match message_type {
            MessageType::OmciMessage => self.handle_omci(frame),
            MessageType::EventNotification => self.handle_event(frame),
            MessageType::FileTransferAck => self.handle_file_transfer(frame),
            other => info!("{}: dropping unsolicited {}", self.log, other),
        }
    }
}
