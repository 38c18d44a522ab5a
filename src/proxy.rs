use eoam::Frame;
use onu_helpers::Mailboxes;
use tokio::sync::mpsc;

use crate::{ErrorKind, InboundFrames, ProxyAddress, ProxyTransport, Result};

pub type Outbound = (ProxyAddress, Frame);

/// In-process proxy channel.
///
/// Frames sent by adapters appear on the receiver returned from `ProxyRouter::new`. Frames from
/// devices are handed in with `deliver`, and routed to whichever reader registered their address.
#[derive(Clone)]
pub struct ProxyRouter {
    inbound: Mailboxes<ProxyAddress, Frame>,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl ProxyRouter {
    pub fn new(queue_depth: usize) -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let router = Self {
            inbound: Mailboxes::new(queue_depth),
            outbound,
        };
        (router, rx)
    }

    /// Queues a frame for the reader of `proxy_address`, waiting if its queue is full.
    pub async fn deliver(&self, proxy_address: &ProxyAddress, frame: Frame) -> Result<()> {
        debug!("proxy {}: <- {:?}", proxy_address, frame);
        self.inbound
            .deliver(proxy_address, frame)
            .await
            .map_err(|_| ErrorKind::NotRegistered(proxy_address.clone()).into())
    }
}

impl ProxyTransport for ProxyRouter {
    fn register(&self, proxy_address: &ProxyAddress) -> Result<InboundFrames> {
        match self.inbound.register(proxy_address.clone()) {
            Some(rx) => Ok(InboundFrames::new(rx)),
            None => Err(ErrorKind::AlreadyRegistered(proxy_address.clone()).into()),
        }
    }

    fn send(&self, proxy_address: &ProxyAddress, frame: Frame) -> Result<()> {
        debug!("proxy {}: -> {:?}", proxy_address, frame);
        self.outbound
            .send((proxy_address.clone(), frame))
            .map_err(|_| ErrorKind::ChannelError)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn address(channel_id: u32) -> ProxyAddress {
        ProxyAddress {
            device_id: "olt-1".to_string(),
            channel_id,
        }
    }

    #[tokio::test]
    async fn routes_by_address() {
        let (router, _outbound) = ProxyRouter::new(4);
        let mut first = router.register(&address(1)).unwrap();
        let mut second = router.register(&address(2)).unwrap();

        router
            .deliver(&address(2), Frame::new(vec![2]))
            .await
            .unwrap();
        router
            .deliver(&address(1), Frame::new(vec![1]))
            .await
            .unwrap();

        assert_eq!(first.next().await, Some(Frame::new(vec![1])));
        assert_eq!(second.next().await, Some(Frame::new(vec![2])));
    }

    #[tokio::test]
    async fn single_reader_per_address() {
        let (router, _outbound) = ProxyRouter::new(4);
        let reader = router.register(&address(1)).unwrap();

        let error = router.register(&address(1)).err().unwrap();
        assert!(matches!(error.kind, ErrorKind::AlreadyRegistered(_)));

        drop(reader);
        assert!(router.register(&address(1)).is_ok());
    }

    #[tokio::test]
    async fn unregistered_delivery_fails() {
        let (router, _outbound) = ProxyRouter::new(4);
        let error = router
            .deliver(&address(9), Frame::new(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(error.kind, ErrorKind::NotRegistered(_)));
    }

    #[tokio::test]
    async fn sent_frames_reach_outbound() {
        let (router, mut outbound) = ProxyRouter::new(4);
        router.send(&address(3), Frame::new(vec![0xFE])).unwrap();
        assert_eq!(
            outbound.recv().await,
            Some((address(3), Frame::new(vec![0xFE])))
        );
    }
}
