//! In-process notifications (session changed, role changed).

pub mod bus;
pub mod in_memory_bus;
pub mod notification;

pub use bus::{NotificationBus, Subscription};
pub use in_memory_bus::InMemoryBus;
pub use notification::Notification;
