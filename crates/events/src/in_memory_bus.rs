//! In-process broadcast bus.

use core::convert::Infallible;

use tokio::sync::broadcast;

use crate::bus::{NotificationBus, Subscription};
use crate::notification::Notification;

const DEFAULT_CAPACITY: usize = 64;

/// In-memory pub/sub bus backed by a tokio broadcast channel.
///
/// Publishing with no live subscribers is not an error; the message is simply dropped.
#[derive(Debug)]
pub struct InMemoryBus<M> {
    sender: broadcast::Sender<M>,
}

impl<M: Clone> InMemoryBus<M> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<M: Clone> Default for InMemoryBus<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> NotificationBus<M> for InMemoryBus<M>
where
    M: Notification,
{
    type Error = Infallible;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let delivered = self.sender.send(message.clone()).unwrap_or(0);
        tracing::trace!(kind = message.kind(), generation = message.generation(), delivered, "published");
        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        Subscription::new(self.sender.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Tick(u64);

    impl Notification for Tick {
        fn kind(&self) -> &'static str {
            "test.tick"
        }

        fn generation(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn publish_without_subscribers_is_ok() {
        let bus: InMemoryBus<Tick> = InMemoryBus::new();
        assert!(bus.publish(Tick(1)).is_ok());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn every_subscriber_gets_a_copy_in_order() {
        let bus = InMemoryBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(Tick(1)).unwrap();
        bus.publish(Tick(2)).unwrap();

        assert_eq!(a.try_recv(), Some(Tick(1)));
        assert_eq!(a.try_recv(), Some(Tick(2)));
        assert_eq!(a.try_recv(), None);
        assert_eq!(b.try_recv().map(|t| t.generation()), Some(1));
    }

    #[test]
    fn lagging_subscriber_keeps_newest() {
        let bus = InMemoryBus::with_capacity(2);
        let mut sub = bus.subscribe();
        for n in 0..5 {
            bus.publish(Tick(n)).unwrap();
        }
        assert_eq!(sub.try_recv(), Some(Tick(3)));
        assert_eq!(sub.try_recv(), Some(Tick(4)));
    }

    #[tokio::test]
    async fn recv_ends_when_bus_dropped() {
        let bus = InMemoryBus::new();
        let mut sub = bus.subscribe();
        bus.publish(Tick(7)).unwrap();
        drop(bus);
        assert_eq!(sub.recv().await, Some(Tick(7)));
        assert_eq!(sub.recv().await, None);
    }
}
