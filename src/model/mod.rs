//! The value model: scalar types, temporal precision, quantities, and the
//! collection container that every evaluation step passes around.

pub mod quantity;
pub mod temporal;
pub mod types;
pub mod ucum;
pub mod value;

pub use quantity::{CanonicalQuantity, Quantity};
pub use temporal::{DatePrecision, PartialDate, PartialDateTime, PartialOrdering, PartialTime, TimePrecision};
pub use types::TypeInfo;
pub use ucum::{UcumError, UnitMap};
pub use value::{Collection, ElementHandle, FhirPathValue};
