//! The FHIRPath value model.

use super::quantity::Quantity;
use super::temporal::{PartialDate, PartialDateTime, PartialTime};
use rust_decimal::Decimal;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A single FHIRPath value. Every expression result is a [`Collection`] of
/// these — there is no bare-scalar evaluation result.
#[derive(Debug, Clone)]
pub enum FhirPathValue {
    /// `true` / `false`.
    Boolean(bool),
    /// A 64-bit signed integer.
    Integer(i64),
    /// A `Long` value, distinguished from `Integer` for arithmetic promotion
    /// purposes.
    Long(i64),
    /// An arbitrary-precision decimal.
    Decimal(Decimal),
    /// A string.
    String(String),
    /// A partial-precision date.
    Date(PartialDate),
    /// A partial-precision date-time, with optional timezone.
    DateTime(PartialDateTime),
    /// A partial-precision time.
    Time(PartialTime),
    /// A decimal value with a unit.
    Quantity(Quantity),
    /// An opaque handle into the host's resource tree, tagged with its
    /// declared type name.
    Element(ElementHandle),
}

/// An opaque handle into an externally-owned resource tree.
///
/// The engine never inspects the payload directly — all navigation goes
/// through [`crate::evaluator::ResourceAdapter`]. Equality is reference
/// identity on the underlying handle, since the engine has no general way to
/// compare two opaque trees structurally; adapters that want value equality
/// on Elements should resolve to a primitive `FhirPathValue` first.
#[derive(Clone)]
pub struct ElementHandle {
    /// The declared FHIR type name, e.g. `Patient` or `HumanName`.
    pub type_name: String,
    /// The type-erased payload, downcast by the adapter that produced it.
    pub payload: Arc<dyn Any + Send + Sync>,
}

impl fmt::Debug for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementHandle")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for ElementHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload)
    }
}

impl PartialEq for FhirPathValue {
    fn eq(&self, other: &Self) -> bool {
        use FhirPathValue::*;
        match (self, other) {
            (Boolean(a), Boolean(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (Long(a), Long(b)) => a == b,
            (Integer(a), Long(b)) | (Long(b), Integer(a)) => *a == *b,
            (Decimal(a), Decimal(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (DateTime(a), DateTime(b)) => a == b,
            (Time(a), Time(b)) => a == b,
            (Quantity(a), Quantity(b)) => a == b,
            (Element(a), Element(b)) => a == b,
            _ => false,
        }
    }
}

impl ElementHandle {
    /// Wrap a typed payload as an opaque element handle.
    pub fn new(type_name: impl Into<String>, payload: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            type_name: type_name.into(),
            payload,
        }
    }

    /// Attempt to downcast the payload back to a concrete type.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Display for FhirPathValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FhirPathValue::Boolean(b) => write!(f, "{b}"),
            FhirPathValue::Integer(i) => write!(f, "{i}"),
            FhirPathValue::Long(i) => write!(f, "{i}"),
            FhirPathValue::Decimal(d) => write!(f, "{d}"),
            FhirPathValue::String(s) => write!(f, "{s}"),
            FhirPathValue::Date(d) => write!(f, "{d}"),
            FhirPathValue::DateTime(d) => write!(f, "{d}"),
            FhirPathValue::Time(t) => write!(f, "{t}"),
            FhirPathValue::Quantity(q) => write!(f, "{q}"),
            FhirPathValue::Element(e) => write!(f, "[{}]", e.type_name),
        }
    }
}

/// An ordered, possibly-empty, possibly-duplicated sequence of values
/// Backed by an `Arc<[_]>` so cloning a collection (routine
/// during tree-walking) is O(1).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection(Arc<[FhirPathValue]>);

impl Collection {
    /// The empty collection.
    pub fn empty() -> Self {
        Collection(Arc::from([]))
    }

    /// A length-1 collection.
    pub fn singleton(value: FhirPathValue) -> Self {
        Collection(Arc::from(vec![value]))
    }

    /// Build from a `Vec`.
    pub fn from_vec(values: Vec<FhirPathValue>) -> Self {
        Collection(values.into())
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over elements by reference.
    pub fn iter(&self) -> std::slice::Iter<'_, FhirPathValue> {
        self.0.iter()
    }

    /// Element at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<&FhirPathValue> {
        self.0.get(index)
    }

    /// First element.
    pub fn first(&self) -> Option<&FhirPathValue> {
        self.0.first()
    }

    /// Last element.
    pub fn last(&self) -> Option<&FhirPathValue> {
        self.0.last()
    }

    /// Consume into a `Vec`.
    pub fn into_vec(self) -> Vec<FhirPathValue> {
        match Arc::try_unwrap(self.0) {
            Ok(slice) => slice.into_vec(),
            Err(arc) => arc.to_vec(),
        }
    }

    /// Borrow as a slice.
    pub fn as_slice(&self) -> &[FhirPathValue] {
        &self.0
    }

    /// If exactly one element, return it; `None` for empty or multi-element
    /// collections (callers needing a hard error for length >= 2 should use
    /// `FhirPathError::singleton` instead — see evaluator/operators.rs).
    pub fn as_singleton(&self) -> Option<&FhirPathValue> {
        if self.0.len() == 1 { self.0.first() } else { None }
    }

    /// Concatenate two collections in order.
    pub fn concat(&self, other: &Collection) -> Collection {
        let mut v = self.0.to_vec();
        v.extend(other.0.iter().cloned());
        Collection(v.into())
    }
}

impl FromIterator<FhirPathValue> for Collection {
    fn from_iter<I: IntoIterator<Item = FhirPathValue>>(iter: I) -> Self {
        Collection(iter.into_iter().collect::<Vec<_>>().into())
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a FhirPathValue;
    type IntoIter = std::slice::Iter<'a, FhirPathValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_roundtrips() {
        let c = Collection::singleton(FhirPathValue::Integer(5));
        assert_eq!(c.as_singleton(), Some(&FhirPathValue::Integer(5)));
    }

    #[test]
    fn empty_first_is_none() {
        assert_eq!(Collection::empty().first(), None);
    }

    #[test]
    fn integer_and_long_compare_by_value() {
        assert_eq!(FhirPathValue::Integer(5), FhirPathValue::Long(5));
    }
}
