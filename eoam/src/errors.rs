use std::fmt::{self, Display};
use std::io;

use crate::{Branch, Leaf, Oui, ResponseCode};

#[derive(Debug)]
pub enum ErrorKind {
    UnsupportedOpcode(u8),
    UnsupportedDpoeOpcode(u8),
    UnsupportedOui(Oui),
    Truncated,
    ValueTooLong(usize),
    Response {
        branch: Branch,
        leaf: Leaf,
        code: ResponseCode,
    },
    Io(io::Error),
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::UnsupportedOpcode(opcode) => {
                write!(f, "unsupported OAM opcode: {:#04x}", opcode)
            }
            ErrorKind::UnsupportedDpoeOpcode(opcode) => {
                write!(f, "unsupported DPoE opcode: {:#04x}", opcode)
            }
            ErrorKind::UnsupportedOui(oui) => write!(f, "unsupported OAM OUI: {}", oui),
            ErrorKind::Truncated => write!(f, "truncated PDU"),
            ErrorKind::ValueTooLong(len) => write!(f, "attribute value too long: {} bytes", len),
            ErrorKind::Response { branch, leaf, code } => write!(
                f,
                "branch {:#04X} leaf {:#06X}: {}",
                branch, leaf, code
            ),
            ErrorKind::Io(error) => write!(f, "IO error: {}", error),
        }
    }
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "eoam error: {}", self.kind)
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(other: io::Error) -> Self {
        // Reads are from in-memory buffers. Running off the end is the only expected failure.
        let kind = match other.kind() {
            io::ErrorKind::UnexpectedEof => ErrorKind::Truncated,
            _ => ErrorKind::Io(other),
        };
        Error { kind }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self { kind }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
