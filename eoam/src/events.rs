use std::io::Cursor;

use crate::{Frame, Oui, ReadWireExt, Result};

/// TLV type of an organization-specific event.
pub const ORGANIZATION_SPECIFIC_EVENT: u8 = 0xFE;

/// File-transfer opcode of an acknowledgement.
pub const FILE_TRANSFER_ACK: u8 = 0x03;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EventKind {
    Dpoe,
    Tibit,
    UnknownOui(Oui),
    UnexpectedTlv(u8),
}

/// Header of an OAM Event Notification.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct EventNotification {
    pub sequence_number: u16,
    pub tlv_type: u8,
    pub length: u8,
    pub oui: Oui,
}

impl EventNotification {
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let mut r = Cursor::new(frame.payload());

        let sequence_number = r.read_wire()?;
        let tlv_type = r.read_wire()?;
        let length = r.read_wire()?;
        let oui = r.read_wire()?;

        Ok(EventNotification {
            sequence_number,
            tlv_type,
            length,
            oui,
        })
    }

    pub fn kind(&self) -> EventKind {
        if self.tlv_type != ORGANIZATION_SPECIFIC_EVENT {
            return EventKind::UnexpectedTlv(self.tlv_type);
        }

        match self.oui {
            Oui::CABLELABS => EventKind::Dpoe,
            Oui::TIBIT => EventKind::Tibit,
            oui => EventKind::UnknownOui(oui),
        }
    }
}

/// Acknowledgement of one block of a DPoE file transfer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FileTransferAck {
    pub opcode: u8,
    pub acked_block: u16,
    pub response_code: u8,
}

impl FileTransferAck {
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let mut r = Cursor::new(frame.attributes());

        let opcode = r.read_wire()?;
        let acked_block = r.read_wire()?;
        let response_code = r.read_wire()?;

        Ok(FileTransferAck {
            opcode,
            acked_block,
            response_code,
        })
    }

    pub fn acknowledges(&self, block_number: u16) -> bool {
        if self.opcode != FILE_TRANSFER_ACK {
            debug!(
                "unexpected fx_opcode {:#x} (expected {:#x})",
                self.opcode, FILE_TRANSFER_ACK
            );
            false
        } else if self.acked_block != block_number {
            debug!(
                "unexpected acked_block {:#x} (expected {:#x})",
                self.acked_block, block_number
            );
            false
        } else if self.response_code != 0 {
            debug!(
                "unexpected response_code {:#x} (expected 0x0)",
                self.response_code
            );
            false
        } else {
            true
        }
    }
}
