//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**: two value
/// objects with the same attribute values are equal. `Money` is the canonical
/// example here: `Money::from_cents(100)` equals any other hundred cents, no
/// matter where it came from. Entities, by contrast, are identified by their
/// ID (`FinancialDocument`, `BankMovement`).
///
/// To "modify" a value object, create a new one with the new values. This
/// keeps value semantics: safe to copy, safe to share across threads.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
