//! Notification publishing/subscription abstraction (mechanics only).
//!
//! The bus is how the session store tells the role resolver (and the role resolver tells
//! the UI) that something changed. It makes minimal assumptions:
//!
//! - **Broadcast**: every subscription gets a copy of every message published after it
//!   subscribed.
//! - **At-least-once**: consumers must tolerate duplicates; auth consumers dedupe by
//!   generation.
//! - **Ordered per publisher**: messages from one publisher arrive in publish order.
//! - **No persistence**: a subscriber that falls too far behind skips the oldest messages.
//!   Only the latest state matters to auth consumers, so this is logged and tolerated.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use crate::notification::Notification;

/// A subscription to a notification stream.
///
/// ```ignore
/// let mut subscription = bus.subscribe();
/// while let Some(message) = subscription.recv().await {
///     handle(message).await;
/// }
/// ```
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: broadcast::Receiver<M>,
}

impl<M: Clone> Subscription<M> {
    pub fn new(receiver: broadcast::Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Wait for the next message. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<M> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscriber lagged; oldest notifications dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next message if one is already queued.
    pub fn try_recv(&mut self) -> Option<M> {
        loop {
            match self.receiver.try_recv() {
                Ok(message) => return Some(message),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscriber lagged; oldest notifications dropped");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}

/// Domain-agnostic notification bus (pub/sub abstraction).
pub trait NotificationBus<M: Notification>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> NotificationBus<M> for Arc<B>
where
    M: Notification,
    B: NotificationBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
