use std::convert::{TryFrom, TryInto};
use std::fmt::{self, Display};
use std::io::{Cursor, Read, Write};

use crate::tlv::END_BRANCH;
use crate::{Attribute, Error, ErrorKind, Oui, ReadWire, ReadWireExt, Result, WriteWire, WriteWireExt};

pub const OPCODE_EVENT_NOTIFICATION: u8 = 0x01;
pub const OPCODE_ORGANIZATION_SPECIFIC: u8 = 0xFE;

/// OUI plus opcode.
const HEADER_LEN: usize = 4;
/// OUI, opcode and DPoE sub-opcode.
const DPOE_HEADER_LEN: usize = HEADER_LEN + 1;
/// Branch zero, leaf zero.
const END_MARKER_LEN: u16 = 3;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DpoeOpcode {
    GetRequest,
    GetResponse,
    SetRequest,
    SetResponse,
    FileTransfer,
}

impl From<DpoeOpcode> for u8 {
    fn from(opcode: DpoeOpcode) -> u8 {
        match opcode {
            DpoeOpcode::GetRequest => 0x01,
            DpoeOpcode::GetResponse => 0x02,
            DpoeOpcode::SetRequest => 0x03,
            DpoeOpcode::SetResponse => 0x04,
            DpoeOpcode::FileTransfer => 0x09,
        }
    }
}

impl TryFrom<u8> for DpoeOpcode {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(DpoeOpcode::GetRequest),
            0x02 => Ok(DpoeOpcode::GetResponse),
            0x03 => Ok(DpoeOpcode::SetRequest),
            0x04 => Ok(DpoeOpcode::SetResponse),
            0x09 => Ok(DpoeOpcode::FileTransfer),
            _ => Err(ErrorKind::UnsupportedDpoeOpcode(byte).into()),
        }
    }
}

impl ReadWire for DpoeOpcode {
    fn read_wire<R>(r: &mut R) -> Result<Self>
    where
        R: Read,
    {
        let byte: u8 = r.read_wire()?;
        byte.try_into()
    }
}

impl WriteWire for DpoeOpcode {
    fn wire_len(&self) -> u16 {
        1
    }

    fn write_wire<W>(self, w: &mut W) -> Result<()>
    where
        W: Write,
    {
        w.write_wire(u8::from(self))?;
        Ok(())
    }
}

impl Display for DpoeOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DpoeOpcode::GetRequest => write!(f, "GetRequest ({:#04x})", u8::from(*self)),
            DpoeOpcode::GetResponse => write!(f, "GetResponse ({:#04x})", u8::from(*self)),
            DpoeOpcode::SetRequest => write!(f, "SetRequest ({:#04x})", u8::from(*self)),
            DpoeOpcode::SetResponse => write!(f, "SetResponse ({:#04x})", u8::from(*self)),
            DpoeOpcode::FileTransfer => write!(f, "FileTransfer ({:#04x})", u8::from(*self)),
        }
    }
}

/// Classification of an inbound frame.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum MessageType {
    Unknown,
    /// Information PDU. Not currently produced by classification.
    Info,
    EventNotification,
    GetResponse,
    SetResponse,
    FileTransferAck,
    OmciMessage,
}

impl MessageType {
    /// Whether a message of this kind is sent in reply to a request.
    pub fn solicited(&self) -> bool {
        match self {
            MessageType::GetResponse | MessageType::SetResponse | MessageType::FileTransferAck => {
                true
            }
            _ => false,
        }
    }
}

impl Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageType::Unknown => "Unknown",
            MessageType::Info => "Info",
            MessageType::EventNotification => "Event Notification",
            MessageType::GetResponse => "DPoE Get Response",
            MessageType::SetResponse => "DPoE Set Response",
            MessageType::FileTransferAck => "DPoE File Transfer",
            MessageType::OmciMessage => "OMCI Message",
        };
        write!(f, "{}", name)
    }
}

/// One EOAM PDU as carried over the proxy transport.
#[derive(Clone, Eq, PartialEq)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn oui(&self) -> Option<Oui> {
        let mut r = Cursor::new(self.bytes.get(..3)?);
        r.read_wire().ok()
    }

    pub fn opcode(&self) -> Option<u8> {
        self.bytes.get(HEADER_LEN - 1).copied()
    }

    /// Everything after the opcode.
    pub fn payload(&self) -> &[u8] {
        self.bytes.get(HEADER_LEN..).unwrap_or(&[])
    }

    /// Raw DPoE sub-opcode, for frames that carry one.
    pub fn dpoe_opcode(&self) -> Option<u8> {
        match (self.oui(), self.opcode()) {
            (Some(oui), Some(OPCODE_ORGANIZATION_SPECIFIC)) if oui.is_dpoe() => {
                self.payload().first().copied()
            }
            _ => None,
        }
    }

    /// The attribute records of a DPoE frame, starting after the sub-opcode.
    pub fn attributes(&self) -> &[u8] {
        match self.dpoe_opcode() {
            Some(_) => &self.bytes[DPOE_HEADER_LEN..],
            None => &[],
        }
    }

    pub fn message_type(&self) -> MessageType {
        decode_message_type(self)
    }
}

impl From<Vec<u8>> for Frame {
    fn from(bytes: Vec<u8>) -> Self {
        Frame::new(bytes)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame(")?;
        for byte in &self.bytes {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}

/// Classifies an inbound frame from its OUI, opcode and DPoE sub-opcode.
///
/// Never fails: anything unrecognised is `MessageType::Unknown`.
pub fn decode_message_type(frame: &Frame) -> MessageType {
    let (oui, opcode) = match (frame.oui(), frame.opcode()) {
        (Some(oui), Some(opcode)) => (oui, opcode),
        _ => {
            debug!("received frame has no payload");
            return MessageType::Unknown;
        }
    };
    debug!("oui: {}", oui);

    match opcode {
        OPCODE_ORGANIZATION_SPECIFIC if oui == Oui::ITU => MessageType::OmciMessage,
        OPCODE_ORGANIZATION_SPECIFIC if oui.is_dpoe() => {
            let byte = match frame.dpoe_opcode() {
                Some(byte) => byte,
                None => {
                    debug!("DPoE frame without sub-opcode");
                    return MessageType::Unknown;
                }
            };
            match DpoeOpcode::try_from(byte) {
                Ok(DpoeOpcode::GetResponse) => MessageType::GetResponse,
                Ok(DpoeOpcode::SetResponse) => MessageType::SetResponse,
                Ok(DpoeOpcode::FileTransfer) => MessageType::FileTransferAck,
                Ok(opcode) => {
                    info!("unexpected DPoE opcode {} from device", opcode);
                    MessageType::Unknown
                }
                Err(error) => {
                    info!("{}", error);
                    MessageType::Unknown
                }
            }
        }
        OPCODE_ORGANIZATION_SPECIFIC => {
            info!("{}", Error::from(ErrorKind::UnsupportedOui(oui)));
            MessageType::Unknown
        }
        OPCODE_EVENT_NOTIFICATION => MessageType::EventNotification,
        opcode => {
            info!("{}", Error::from(ErrorKind::UnsupportedOpcode(opcode)));
            MessageType::Unknown
        }
    }
}

/// A DPoE PDU: OUI, sub-opcode and attribute records.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DpoeCommand {
    pub oui: Oui,
    pub opcode: DpoeOpcode,
    pub attributes: Vec<Attribute>,
}

impl DpoeCommand {
    pub fn new(oui: Oui, opcode: DpoeOpcode, attributes: Vec<Attribute>) -> Self {
        Self {
            oui,
            opcode,
            attributes,
        }
    }

    pub fn get_request(attributes: Vec<Attribute>) -> Self {
        Self::new(Oui::TIBIT, DpoeOpcode::GetRequest, attributes)
    }

    pub fn set_request(attributes: Vec<Attribute>) -> Self {
        Self::new(Oui::TIBIT, DpoeOpcode::SetRequest, attributes)
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn into_frame(self) -> Result<Frame> {
        let attributes_len: u16 = self.attributes.iter().map(WriteWire::wire_len).sum();
        let frame_len = DPOE_HEADER_LEN + usize::from(attributes_len + END_MARKER_LEN);

        let mut buffer = Vec::with_capacity(frame_len);
        buffer.write_wire(self.oui)?;
        buffer.write_wire(OPCODE_ORGANIZATION_SPECIFIC)?;
        buffer.write_wire(self.opcode)?;
        for attribute in self.attributes {
            buffer.write_wire(attribute)?;
        }
        buffer.write_wire(END_BRANCH)?;
        buffer.write_wire(0 as u16)?;

        Ok(Frame::new(buffer))
    }

    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let mut r = Cursor::new(frame.as_bytes());

        let oui: Oui = r.read_wire()?;
        let opcode: u8 = r.read_wire()?;
        if opcode != OPCODE_ORGANIZATION_SPECIFIC {
            return Err(ErrorKind::UnsupportedOpcode(opcode).into());
        }
        if !oui.is_dpoe() {
            return Err(ErrorKind::UnsupportedOui(oui).into());
        }
        let opcode: DpoeOpcode = r.read_wire()?;

        let mut attributes = Vec::new();
        loop {
            let branch: u8 = match r.read_wire() {
                Ok(branch) => branch,
                Err(_) => break,
            };
            if branch == END_BRANCH {
                break;
            }

            let attribute = match opcode {
                DpoeOpcode::GetRequest => Attribute::read_descriptor(&mut r, branch)?,
                _ => Attribute::read_record(&mut r, branch)?,
            };
            attributes.push(attribute);
        }

        Ok(DpoeCommand {
            oui,
            opcode,
            attributes,
        })
    }
}
