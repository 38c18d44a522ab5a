use std::fmt::{self, Display};
use std::io::{Cursor, Read, Write};

use crate::{
    Branch, ErrorKind, Leaf, MacAddress, ReadWireExt, Result, WriteWire, WriteWireExt,
};

/// A branch of zero terminates the attribute list.
pub const END_BRANCH: Branch = 0x00;

/// Continuation of the previous attribute. Never returned from a lookup.
pub const CONTINUATION_BRANCH: Branch = 0xD6;

pub const DEVICE_ID: (Branch, Leaf) = (0xD7, 0x0002);
pub const ADD_STATIC_MAC_ADDRESS: (Branch, Leaf) = (0xD9, 0x0108);
pub const DELETE_STATIC_MAC_ADDRESS: (Branch, Leaf) = (0xD9, 0x0109);

/// Length octets at or above this value carry a response code rather than a byte count.
const RESPONSE_CODE_MIN: u8 = 0x80;

/// A length octet of zero stands for a full 128-byte value.
const EXTENDED_VALUE_LEN: usize = 128;

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct ResponseCode(pub u8);

impl ResponseCode {
    pub const NO_ERROR: ResponseCode = ResponseCode(0x80);
    pub const TOO_LONG: ResponseCode = ResponseCode(0x81);
    pub const BAD_PARAMETERS: ResponseCode = ResponseCode(0x86);
    pub const NO_RESOURCES: ResponseCode = ResponseCode(0x87);
    pub const SYSTEM_BUSY: ResponseCode = ResponseCode(0x88);
    pub const UNDETERMINED_ERROR: ResponseCode = ResponseCode(0xA0);
    pub const UNSUPPORTED: ResponseCode = ResponseCode(0xA1);
    pub const MAY_BE_CORRUPTED: ResponseCode = ResponseCode(0xA2);
    pub const HARDWARE_FAILURE: ResponseCode = ResponseCode(0xA3);
    pub const OVERFLOW: ResponseCode = ResponseCode(0xA4);

    /// Codes above 0x80 abort the attribute walk that found them.
    pub fn is_fatal(&self) -> bool {
        self.0 > RESPONSE_CODE_MIN
    }

    pub fn description(&self) -> Option<&'static str> {
        let description = match *self {
            ResponseCode::NO_ERROR => "No Error",
            ResponseCode::TOO_LONG => "Too Long",
            ResponseCode::BAD_PARAMETERS => "Bad Parameters",
            ResponseCode::NO_RESOURCES => "No Resources",
            ResponseCode::SYSTEM_BUSY => "System Busy",
            ResponseCode::UNDETERMINED_ERROR => "Undetermined Error",
            ResponseCode::UNSUPPORTED => "Unsupported",
            ResponseCode::MAY_BE_CORRUPTED => "May Be Corrupted",
            ResponseCode::HARDWARE_FAILURE => "Hardware Failure",
            ResponseCode::OVERFLOW => "Overflow",
            _ => return None,
        };
        Some(description)
    }
}

impl Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description() {
            Some(description) => write!(f, "{} ({:#04x})", description, self.0),
            None => write!(f, "Unknown ({:#04x})", self.0),
        }
    }
}

/// One branch/leaf record of a DPoE PDU.
///
/// Get-Requests carry bare descriptors. Set-Requests and responses carry either a value or a
/// response code in place of the length octet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Attribute {
    Descriptor {
        branch: Branch,
        leaf: Leaf,
    },
    Value {
        branch: Branch,
        leaf: Leaf,
        value: Vec<u8>,
    },
    Response {
        branch: Branch,
        leaf: Leaf,
        code: ResponseCode,
    },
}

impl Attribute {
    pub fn device_id() -> Self {
        let (branch, leaf) = DEVICE_ID;
        Attribute::Descriptor { branch, leaf }
    }

    pub fn add_static_mac_address(mac: MacAddress) -> Self {
        let (branch, leaf) = ADD_STATIC_MAC_ADDRESS;
        Attribute::Value {
            branch,
            leaf,
            value: mac.octets().to_vec(),
        }
    }

    pub fn delete_static_mac_address(mac: MacAddress) -> Self {
        let (branch, leaf) = DELETE_STATIC_MAC_ADDRESS;
        Attribute::Value {
            branch,
            leaf,
            value: mac.octets().to_vec(),
        }
    }

    pub fn branch(&self) -> Branch {
        match self {
            Attribute::Descriptor { branch, .. }
            | Attribute::Value { branch, .. }
            | Attribute::Response { branch, .. } => *branch,
        }
    }

    pub fn leaf(&self) -> Leaf {
        match self {
            Attribute::Descriptor { leaf, .. }
            | Attribute::Value { leaf, .. }
            | Attribute::Response { leaf, .. } => *leaf,
        }
    }

    /// The MAC carried by an Add/Delete Static MAC Address attribute.
    pub fn mac_address(&self) -> Option<MacAddress> {
        match self {
            Attribute::Value { branch, leaf, value }
                if (*branch, *leaf) == ADD_STATIC_MAC_ADDRESS
                    || (*branch, *leaf) == DELETE_STATIC_MAC_ADDRESS =>
            {
                let mut octets = [0; 6];
                if value.len() != octets.len() {
                    return None;
                }
                octets.copy_from_slice(value);
                Some(MacAddress(octets))
            }
            _ => None,
        }
    }

    pub(crate) fn read_descriptor<R>(r: &mut R, branch: Branch) -> Result<Self>
    where
        R: Read,
    {
        let leaf = r.read_wire()?;
        Ok(Attribute::Descriptor { branch, leaf })
    }

    pub(crate) fn read_record<R>(r: &mut R, branch: Branch) -> Result<Self>
    where
        R: Read,
    {
        let leaf = r.read_wire()?;
        let length: u8 = r.read_wire()?;

        if length >= RESPONSE_CODE_MIN {
            return Ok(Attribute::Response {
                branch,
                leaf,
                code: ResponseCode(length),
            });
        }

        let mut value = vec![0; value_len(length)];
        r.read_exact(&mut value)?;
        Ok(Attribute::Value {
            branch,
            leaf,
            value,
        })
    }
}

impl WriteWire for Attribute {
    fn wire_len(&self) -> u16 {
        match self {
            Attribute::Descriptor { .. } => 3,
            Attribute::Value { value, .. } => 4 + value.len() as u16,
            Attribute::Response { .. } => 4,
        }
    }

    fn write_wire<W>(self, w: &mut W) -> Result<()>
    where
        W: Write,
    {
        w.write_wire(self.branch())?;
        w.write_wire(self.leaf())?;

        match self {
            Attribute::Descriptor { .. } => {}
            Attribute::Value { value, .. } => {
                let length = match value.len() {
                    EXTENDED_VALUE_LEN => 0,
                    len if len < EXTENDED_VALUE_LEN => len as u8,
                    len => return Err(ErrorKind::ValueTooLong(len).into()),
                };
                w.write_wire(length)?;
                w.write_all(&value)?;
            }
            Attribute::Response { code, .. } => {
                w.write_wire(code.0)?;
            }
        }

        Ok(())
    }
}

fn read_header<R>(r: &mut R) -> Result<(Leaf, u8)>
where
    R: Read,
{
    let leaf = r.read_wire()?;
    let length = r.read_wire()?;
    Ok((leaf, length))
}

fn value_len(length: u8) -> usize {
    match length {
        0 => EXTENDED_VALUE_LEN,
        length => usize::from(length),
    }
}

/// Result of walking the attributes of a Set-Response.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SetResponseOutcome {
    pub success: bool,
    pub branch: Branch,
    pub leaf: Leaf,
    /// Raw length octet of the last record seen. A response code when >= 0x80.
    pub length: u8,
}

impl SetResponseOutcome {
    pub fn code(&self) -> Option<ResponseCode> {
        if self.length >= RESPONSE_CODE_MIN {
            Some(ResponseCode(self.length))
        } else {
            None
        }
    }

    pub fn into_result(self) -> Result<Self> {
        if self.success {
            return Ok(self);
        }

        Err(ErrorKind::Response {
            branch: self.branch,
            leaf: self.leaf,
            code: ResponseCode(self.length),
        }
        .into())
    }
}

/// Walks the attribute records of a Set-Response, starting after the DPoE sub-opcode.
///
/// Stops at the end marker, when the buffer runs out, or at the first fatal response code.
/// Response codes of 0x80 are logged and skipped.
pub fn check_set_response(attributes: &[u8]) -> SetResponseOutcome {
    let mut r = Cursor::new(attributes);
    let mut outcome = SetResponseOutcome {
        success: true,
        branch: 0,
        leaf: 0,
        length: 0,
    };

    loop {
        let branch: Branch = match r.read_wire() {
            Ok(branch) => branch,
            Err(_) => break,
        };
        if branch == END_BRANCH {
            break;
        }

        let (leaf, length) = match read_header(&mut r) {
            Ok(header) => header,
            Err(error) => {
                debug!("set response: branch {:#04X}: {}", branch, error);
                break;
            }
        };

        outcome.branch = branch;
        outcome.leaf = leaf;
        outcome.length = length;

        if length >= RESPONSE_CODE_MIN {
            let code = ResponseCode(length);
            debug!("branch {:#04X} leaf {:#06X} {}", branch, leaf, code);
            if code.is_fatal() {
                outcome.success = false;
                break;
            }
            continue;
        }

        let next = r.position() + value_len(length) as u64;
        if next > attributes.len() as u64 {
            debug!(
                "set response: branch {:#04X} leaf {:#06X} runs past end of PDU",
                branch, leaf
            );
            break;
        }
        r.set_position(next);
    }

    outcome
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Bytes(Vec<u8>),
}

impl Value {
    fn read<R>(r: &mut R, length: u8) -> Result<Self>
    where
        R: Read,
    {
        let value = match length {
            1 => Value::U8(r.read_wire()?),
            2 => Value::U16(r.read_wire()?),
            4 => Value::U32(r.read_wire()?),
            8 => Value::U64(r.read_wire()?),
            length => {
                let mut bytes = vec![0; value_len(length)];
                r.read_exact(&mut bytes)?;
                Value::Bytes(bytes)
            }
        };
        Ok(value)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttributeValue {
    pub branch: Branch,
    pub leaf: Leaf,
    pub value: Value,
}

/// Finds the value of `(query_branch, query_leaf)` in the attribute records of a Get-Response.
///
/// A query of `(0, 0)` matches the first attribute. A matching attribute that carries a
/// non-fatal response code has no value, and yields `None`.
pub fn get_value(
    attributes: &[u8],
    query_branch: Branch,
    query_leaf: Leaf,
) -> Result<Option<AttributeValue>> {
    let wildcard = query_branch == 0 && query_leaf == 0;
    let mut r = Cursor::new(attributes);

    loop {
        let branch: Branch = match r.read_wire() {
            Ok(branch) => branch,
            Err(_) => return Ok(None),
        };
        if branch == END_BRANCH {
            return Ok(None);
        }

        let leaf: Leaf = r.read_wire()?;
        let length: u8 = r.read_wire()?;

        let matches = branch != CONTINUATION_BRANCH
            && (wildcard || (branch == query_branch && leaf == query_leaf));

        if length >= RESPONSE_CODE_MIN {
            let code = ResponseCode(length);
            info!("branch {:#04X} leaf {:#06X} {}", branch, leaf, code);
            if code.is_fatal() {
                return Err(ErrorKind::Response { branch, leaf, code }.into());
            }
            if matches {
                return Ok(None);
            }
            continue;
        }

        let value = Value::read(&mut r, length)?;
        if matches {
            return Ok(Some(AttributeValue {
                branch,
                leaf,
                value,
            }));
        }
    }
}
