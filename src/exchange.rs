use std::sync::Arc;
use std::time::Duration;

use eoam::{decode_message_type, DpoeCommand, Frame, MessageType};
use futures::StreamExt;
use tokio::time::{self, Instant};

use crate::{DeviceLog, ErrorKind, InboundFrames, ProxyAddress, ProxyTransport, Result};

/// Receives every frame that arrives while an exchange waits, other than its response.
pub trait UnsolicitedHandler: Send {
    fn handle(&mut self, message_type: MessageType, frame: &Frame);
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExchangeState {
    Idle,
    /// A request is out; waiting for a response of this type.
    Sent(MessageType),
    Matched,
    Abandoned,
}

/// Sends requests to one device and waits for their responses.
///
/// At most one request is outstanding. Frames are consumed in arrival order: the first frame
/// of the expected type completes the exchange, and anything before it goes to the unsolicited
/// handler.
///
/// A request that timed out leaves a claim on the first frame of its response type to arrive
/// within one more timeout period. That frame goes to the handler, never to a later request.
pub struct MessageExchange {
    proxy_address: ProxyAddress,
    transport: Arc<dyn ProxyTransport>,
    inbound: InboundFrames,
    handler: Box<dyn UnsolicitedHandler>,
    response_timeout: Option<Duration>,
    state: ExchangeState,
    // Response types of abandoned requests, with the deadline for their late response.
    abandoned: Vec<(MessageType, Instant)>,
    log: DeviceLog,
}

impl MessageExchange {
    pub fn new(
        proxy_address: ProxyAddress,
        transport: Arc<dyn ProxyTransport>,
        inbound: InboundFrames,
        handler: Box<dyn UnsolicitedHandler>,
        response_timeout: Option<Duration>,
        log: DeviceLog,
    ) -> Self {
        Self {
            proxy_address,
            transport,
            inbound,
            handler,
            response_timeout,
            state: ExchangeState::Idle,
            abandoned: Vec::new(),
            log,
        }
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn send(&mut self, command: DpoeCommand, expected: MessageType) -> Result<()> {
        if let ExchangeState::Sent(pending) = self.state {
            return Err(ErrorKind::ExchangePending(pending).into());
        }

        let frame = command.into_frame()?;
        debug!("{}: sending {:?}, expecting {}", self.log, frame, expected);
        self.transport.send(&self.proxy_address, frame)?;
        self.state = ExchangeState::Sent(expected);
        Ok(())
    }

    /// Waits for the response to the request in flight.
    ///
    /// On timeout or a closed stream the exchange is abandoned. A response that arrives later
    /// is treated as unsolicited.
    pub async fn wait(&mut self) -> Result<Frame> {
        let expected = match self.state {
            ExchangeState::Sent(expected) => expected,
            _ => return Err(ErrorKind::NoExchangePending.into()),
        };

        let result = match self.response_timeout {
            Some(timeout) => match time::timeout(timeout, self.receive(expected)).await {
                Ok(result) => result,
                Err(_) => Err(ErrorKind::Timeout(timeout).into()),
            },
            None => self.receive(expected).await,
        };

        self.state = match result {
            Ok(_) => ExchangeState::Matched,
            Err(ref error) => {
                warn!("{}: abandoning wait for {}: {}", self.log, expected, error);
                if let ErrorKind::Timeout(timeout) = error.kind {
                    self.abandoned.push((expected, Instant::now() + timeout));
                }
                ExchangeState::Abandoned
            }
        };
        result
    }

    pub async fn exchange(&mut self, command: DpoeCommand, expected: MessageType) -> Result<Frame> {
        self.send(command, expected)?;
        self.wait().await
    }

    /// Hands every frame already queued to the unsolicited handler. Used before the first
    /// request, so nothing that predates it can be taken as its response.
    pub fn flush_stale(&mut self) -> usize {
        let mut flushed = 0;
        while let Some(frame) = self.inbound.try_next() {
            let message_type = decode_message_type(&frame);
            debug!("{}: flushing stale {}", self.log, message_type);
            self.claim_abandoned(message_type);
            self.handler.handle(message_type, &frame);
            flushed += 1;
        }
        flushed
    }

    async fn receive(&mut self, expected: MessageType) -> Result<Frame> {
        while let Some(frame) = self.inbound.next().await {
            let message_type = decode_message_type(&frame);
            info!("{}: received OAM message {}", self.log, message_type);

            if self.claim_abandoned(message_type) {
                debug!("{}: late {} for an abandoned request", self.log, message_type);
            } else if message_type == expected {
                return Ok(frame);
            }
            self.handler.handle(message_type, &frame);
        }

        Err(ErrorKind::StreamClosed.into())
    }

    /// Consumes the oldest live claim for `message_type`. Expired claims are dropped.
    fn claim_abandoned(&mut self, message_type: MessageType) -> bool {
        let now = Instant::now();
        self.abandoned.retain(|&(_, deadline)| deadline > now);

        match self
            .abandoned
            .iter()
            .position(|&(abandoned, _)| abandoned == message_type)
        {
            Some(index) => {
                self.abandoned.remove(index);
                true
            }
            None => false,
        }
    }
}
