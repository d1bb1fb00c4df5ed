//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable, compared structurally, and have no lifecycle
/// of their own. To "modify" one, build a new value; owners replace them
/// wholesale rather than mutating in place.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
