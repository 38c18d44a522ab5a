use std::fmt::{self, Display};
use std::io::{Read, Write};
use std::net::Ipv4Addr;

use crate::{ReadWire, ReadWireExt, Result, WriteWire, WriteWireExt};

pub type Branch = u8;
pub type Leaf = u16;

/// Organizationally Unique Identifier, transmitted as a 1-byte high octet followed by a 2-byte
/// big-endian low word.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct Oui(pub u32);

impl Oui {
    pub const CABLELABS: Oui = Oui(0x00_1000);
    pub const TIBIT: Oui = Oui(0x2A_EA15);
    /// Marks an embedded OMCI message rather than a DPoE PDU.
    pub const ITU: Oui = Oui(0x00_19A7);

    /// Cablelabs and Tibit PDUs share the DPoE sub-opcode dialect.
    pub fn is_dpoe(&self) -> bool {
        *self == Oui::CABLELABS || *self == Oui::TIBIT
    }
}

impl Display for Oui {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:06X}", self.0)
    }
}

impl ReadWire for Oui {
    fn read_wire<R>(r: &mut R) -> Result<Self>
    where
        R: Read,
    {
        let hi: u8 = r.read_wire()?;
        let lo: u16 = r.read_wire()?;
        Ok(Oui((u32::from(hi) << 16) | u32::from(lo)))
    }
}

impl WriteWire for Oui {
    fn wire_len(&self) -> u16 {
        3
    }

    fn write_wire<W>(self, w: &mut W) -> Result<()>
    where
        W: Write,
    {
        w.write_wire((self.0 >> 16) as u8)?;
        w.write_wire((self.0 & 0xFFFF) as u16)?;
        Ok(())
    }
}

#[derive(Copy, Clone, Default, Eq, Hash, PartialEq)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            a, b, c, d, e, g
        )
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddress({})", self)
    }
}

impl ReadWire for MacAddress {
    fn read_wire<R>(r: &mut R) -> Result<Self>
    where
        R: Read,
    {
        let mut octets = [0; 6];
        r.read_exact(&mut octets)?;
        Ok(MacAddress(octets))
    }
}

impl WriteWire for MacAddress {
    fn wire_len(&self) -> u16 {
        6
    }

    fn write_wire<W>(self, w: &mut W) -> Result<()>
    where
        W: Write,
    {
        w.write_all(&self.0)?;
        Ok(())
    }
}

/// Maps an IPv4 multicast group onto its Ethernet multicast MAC: the low 23 bits of the address
/// are placed into the low 23 bits of `01:00:5e:00:00:00`.
pub fn multicast_mac(address: Ipv4Addr) -> MacAddress {
    let [_, b, c, d] = address.octets();
    MacAddress([0x01, 0x00, 0x5e, b & 0x7f, c, d])
}
