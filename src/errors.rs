use std::fmt::{self, Display};
use std::time::Duration;

use eoam::MessageType;

use crate::{DeviceId, PortNo, ProxyAddress};

#[derive(Debug)]
pub enum ErrorKind {
    Eoam(eoam::Error),
    UnsupportedField(String),
    UnsupportedAction(String),
    InvalidInPort(PortNo),
    MissingInPort,
    UnsupportedGroups(usize),
    Precondition(&'static str),
    HandshakeFailure(eoam::Error),
    ExchangePending(MessageType),
    NoExchangePending,
    Timeout(Duration),
    StreamClosed,
    UnknownDevice(DeviceId),
    NotRegistered(ProxyAddress),
    AlreadyRegistered(ProxyAddress),
    InvalidConfig { name: &'static str, value: String },
    ChannelError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Eoam(error) => write!(f, "{}", error),
            ErrorKind::UnsupportedField(field) => write!(f, "unsupported match field: {}", field),
            ErrorKind::UnsupportedAction(action) => write!(f, "unsupported action: {}", action),
            ErrorKind::InvalidInPort(port) => {
                write!(f, "in_port should be 1 or 2 by our convention, got {}", port)
            }
            ErrorKind::MissingInPort => write!(f, "flow has no in_port match"),
            ErrorKind::UnsupportedGroups(count) => {
                write!(f, "cannot yet deal with groups ({} given)", count)
            }
            ErrorKind::Precondition(what) => write!(f, "onboarding precondition failed: {}", what),
            ErrorKind::HandshakeFailure(error) => write!(f, "handshake failed: {}", error),
            ErrorKind::ExchangePending(expected) => {
                write!(f, "exchange already waiting for {}", expected)
            }
            ErrorKind::NoExchangePending => write!(f, "no exchange in progress"),
            ErrorKind::Timeout(after) => write!(f, "no response after {:?}", after),
            ErrorKind::StreamClosed => write!(f, "inbound frame stream closed"),
            ErrorKind::UnknownDevice(device_id) => write!(f, "unknown device: {}", device_id),
            ErrorKind::NotRegistered(proxy_address) => {
                write!(f, "no mailbox for proxy address {}", proxy_address)
            }
            ErrorKind::AlreadyRegistered(proxy_address) => {
                write!(f, "proxy address {} already has a reader", proxy_address)
            }
            ErrorKind::InvalidConfig { name, value } => {
                write!(f, "invalid value for {}: {:?}", name, value)
            }
            ErrorKind::ChannelError => write!(f, "channel error"),
        }
    }
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for Error {}

impl From<eoam::Error> for Error {
    fn from(other: eoam::Error) -> Self {
        Error {
            kind: ErrorKind::Eoam(other),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self { kind }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
