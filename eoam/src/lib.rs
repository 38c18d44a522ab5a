//! EOAM/DPoE wire codec: PDU encoding, frame classification and attribute walks.

mod errors;
mod events;
mod protocol;
mod tlv;
mod types;

#[macro_use]
extern crate log;

pub use crate::errors::{Error, ErrorKind, Result};
pub use crate::events::{
    EventKind, EventNotification, FileTransferAck, FILE_TRANSFER_ACK, ORGANIZATION_SPECIFIC_EVENT,
};
pub use crate::protocol::{
    decode_message_type, DpoeCommand, DpoeOpcode, Frame, MessageType, OPCODE_EVENT_NOTIFICATION,
    OPCODE_ORGANIZATION_SPECIFIC,
};
pub use crate::tlv::{
    check_set_response, get_value, Attribute, AttributeValue, ResponseCode, SetResponseOutcome,
    Value, ADD_STATIC_MAC_ADDRESS, CONTINUATION_BRANCH, DELETE_STATIC_MAC_ADDRESS, DEVICE_ID,
    END_BRANCH,
};
pub use crate::types::{multicast_mac, Branch, Leaf, MacAddress, Oui};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

pub trait ReadWire: Sized {
    fn read_wire<R>(r: &mut R) -> Result<Self>
    where
        R: Read;
}

pub trait WriteWire {
    fn wire_len(&self) -> u16;

    fn write_wire<W>(self, w: &mut W) -> Result<()>
    where
        W: Write;
}

impl ReadWire for u8 {
    fn read_wire<R>(r: &mut R) -> Result<Self>
    where
        R: Read,
    {
        Ok(r.read_u8()?)
    }
}

impl WriteWire for u8 {
    fn wire_len(&self) -> u16 {
        1
    }

    fn write_wire<W>(self, w: &mut W) -> Result<()>
    where
        W: Write,
    {
        w.write_u8(self)?;
        Ok(())
    }
}

impl ReadWire for u16 {
    fn read_wire<R>(r: &mut R) -> Result<Self>
    where
        R: Read,
    {
        Ok(r.read_u16::<BigEndian>()?)
    }
}

impl WriteWire for u16 {
    fn wire_len(&self) -> u16 {
        2
    }

    fn write_wire<W>(self, w: &mut W) -> Result<()>
    where
        W: Write,
    {
        w.write_u16::<BigEndian>(self)?;
        Ok(())
    }
}

impl ReadWire for u32 {
    fn read_wire<R>(r: &mut R) -> Result<Self>
    where
        R: Read,
    {
        Ok(r.read_u32::<BigEndian>()?)
    }
}

impl WriteWire for u32 {
    fn wire_len(&self) -> u16 {
        4
    }

    fn write_wire<W>(self, w: &mut W) -> Result<()>
    where
        W: Write,
    {
        w.write_u32::<BigEndian>(self)?;
        Ok(())
    }
}

impl ReadWire for u64 {
    fn read_wire<R>(r: &mut R) -> Result<Self>
    where
        R: Read,
    {
        Ok(r.read_u64::<BigEndian>()?)
    }
}

impl WriteWire for u64 {
    fn wire_len(&self) -> u16 {
        8
    }

    fn write_wire<W>(self, w: &mut W) -> Result<()>
    where
        W: Write,
    {
        w.write_u64::<BigEndian>(self)?;
        Ok(())
    }
}

pub trait ReadWireExt {
    fn read_wire<T>(&mut self) -> Result<T>
    where
        T: ReadWire;
}

impl<R> ReadWireExt for R
where
    R: Read,
{
    fn read_wire<T>(&mut self) -> Result<T>
    where
        T: ReadWire,
    {
        T::read_wire(self)
    }
}

pub trait WriteWireExt {
    fn write_wire<T>(&mut self, value: T) -> Result<()>
    where
        T: WriteWire;
}

impl<W> WriteWireExt for W
where
    W: Write,
{
    fn write_wire<T>(&mut self, value: T) -> Result<()>
    where
        T: WriteWire,
    {
        value.write_wire(self)
    }
}
