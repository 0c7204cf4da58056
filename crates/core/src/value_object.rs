//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. To "modify" one,
/// construct a new one (which re-runs its validation).
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
