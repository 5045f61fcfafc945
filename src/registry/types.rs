//! Type reflection: `type()`. `is`/`as`/`ofType` live beside the operator
//! dispatch (`TypeExpr`) and the filtering family respectively, but all
//! three share [`type_info_of`] to map a value to its [`TypeInfo`].

use crate::error::Result;
use crate::evaluator::{Evaluator, ResourceAdapter};
use crate::model::{Collection, FhirPathValue, TypeInfo};

/// The [`TypeInfo`] a value reports for `is`/`as`/`ofType`/`type()`. An
/// `Element` defers to the host adapter's declared type; every other
/// variant maps to its fixed System type.
pub(crate) fn type_info_of(value: &FhirPathValue, adapter: &dyn ResourceAdapter) -> TypeInfo {
    match value {
        FhirPathValue::Boolean(_) => TypeInfo::Boolean,
        FhirPathValue::Integer(_) => TypeInfo::Integer,
        FhirPathValue::Long(_) => TypeInfo::Long,
        FhirPathValue::Decimal(_) => TypeInfo::Decimal,
        FhirPathValue::String(_) => TypeInfo::String,
        FhirPathValue::Date(_) => TypeInfo::Date,
        FhirPathValue::DateTime(_) => TypeInfo::DateTime,
        FhirPathValue::Time(_) => TypeInfo::Time,
        FhirPathValue::Quantity(_) => TypeInfo::Quantity,
        FhirPathValue::Element(handle) => TypeInfo::Named(adapter.declared_type(handle)),
    }
}

/// `type()`: one `System.Xxx`/`FHIR.Xxx`-formatted string per invocant
/// element. The value model has no dedicated reflective-type variant, so
/// this returns the formatted name rather than a structured `TypeInfo`
/// value — see DESIGN.md.
pub(crate) fn type_fn(ev: &Evaluator, invocant: &Collection) -> Result<Collection> {
    let out: Vec<FhirPathValue> = invocant
        .iter()
        .map(|v| FhirPathValue::String(type_info_of(v, ev.adapter).to_string()))
        .collect();
    Ok(Collection::from_vec(out))
}
