//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable domain objects compared entirely by their
/// attribute values - two with the same values are the same thing. Contrast
/// with entities, which carry an identifier and stay "the same" as their
/// attributes change.
///
/// Example: `Email("a@b.com")` is a value object; a `CurrentUser` with an
/// `AccountId` is not.
///
/// To "modify" a value object, construct a new one. This keeps them safe to
/// share and predictable to compare.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
