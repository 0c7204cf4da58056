/// A notification published by one auth component and consumed by others.
///
/// Notifications are facts about a point in time. `generation` orders them: a consumer
/// that has seen generation `n` can drop anything older.
pub trait Notification: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable name (e.g. "auth.session.changed").
    fn kind(&self) -> &'static str;

    /// Session generation the notification belongs to.
    fn generation(&self) -> u64;
}
