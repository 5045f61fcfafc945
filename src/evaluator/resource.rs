//! The capability interface the engine consumes to navigate the host's
//! resource tree, plus a `serde_json`-backed demo implementation.
//!
//! spec note: the resource model itself (a generic typed tree with named
//! children, polymorphic `choice` elements, and reflective type tags) is an
//! external collaborator — this module only defines the boundary and a
//! minimal adapter good enough to exercise the engine without a host.

use crate::error::Result;
use crate::model::{Collection, ElementHandle, FhirPathValue};
use serde_json::Value as Json;
use std::sync::Arc;

/// Capability interface for navigating an externally-owned resource tree.
///
/// The engine never inspects [`ElementHandle`] payloads itself — every
/// navigation, type query, and primitive conversion goes through this trait.
pub trait ResourceAdapter: Send + Sync {
    /// Ordered children of `element` named `name` (FHIR repeating elements
    /// return more than one). Non-existent names yield an empty collection,
    /// not an error.
    fn children(&self, element: &ElementHandle, name: &str) -> Result<Collection>;

    /// The type name this element reports for `type()`/`is`/`as`/`ofType`.
    fn declared_type(&self, element: &ElementHandle) -> String;

    /// For a polymorphic `choice[x]` field addressed by its base name (e.g.
    /// `value` for `valueQuantity`/`valueString`/...), the concrete type
    /// suffix actually present (`"Quantity"`, `"String"`, ...), if any.
    fn resolve_choice_type(&self, element: &ElementHandle, base_name: &str) -> Option<String>;

    /// Convert a primitive-valued element (one with no further navigable
    /// children) to its scalar [`FhirPathValue`], if it is one.
    fn to_primitive(&self, element: &ElementHandle) -> Option<FhirPathValue>;
}

/// A naive [`ResourceAdapter`] over `serde_json::Value` trees.
///
/// This exists so the crate is independently testable without a host: it
/// does plain object-key lookup for path steps and resolves `choice[x]` by
/// suffix-matching a caller-supplied list of candidate type names. It has no
/// knowledge of FHIR StructureDefinitions, cardinality, or primitive
/// extensions — a real host adapter is expected to know far more than this.
pub struct JsonResourceAdapter {
    /// Candidate type names considered when resolving a `choice[x]` field,
    /// e.g. `["Quantity", "String", "CodeableConcept", ...]`. Order matters
    /// only as a tie-breaker if more than one key coincidentally matches.
    pub choice_types: Vec<String>,
}

impl JsonResourceAdapter {
    /// Build an adapter with the given polymorphic type candidates.
    pub fn new(choice_types: Vec<String>) -> Self {
        Self { choice_types }
    }

    /// Wrap a raw `serde_json::Value` as the root [`FhirPathValue::Element`]
    /// of an evaluation, tagged with `type_name`.
    pub fn wrap(type_name: impl Into<String>, json: Json) -> FhirPathValue {
        FhirPathValue::Element(ElementHandle::new(type_name.into(), Arc::new(json)))
    }

    fn json_of<'a>(&self, element: &'a ElementHandle) -> Option<&'a Json> {
        element.downcast_ref::<Json>()
    }

    /// Convert one JSON leaf value (not an object/array) into a
    /// [`FhirPathValue`], tagging the element with `type_name` if it turns
    /// out to still be structured.
    fn json_to_value(&self, type_name: &str, json: &Json) -> FhirPathValue {
        match json {
            Json::Bool(b) => FhirPathValue::Boolean(*b),
            Json::String(s) => string_like_to_value(type_name, s),
            Json::Number(n) => number_to_value(type_name, n),
            other => FhirPathValue::Element(ElementHandle::new(type_name.to_string(), Arc::new(other.clone()))),
        }
    }
}

fn string_like_to_value(type_name: &str, s: &str) -> FhirPathValue {
    use crate::model::{PartialDate, PartialDateTime, PartialTime};
    match type_name {
        "date" | "Date" => PartialDate::parse(s).map(FhirPathValue::Date).unwrap_or_else(|_| FhirPathValue::String(s.to_string())),
        "dateTime" | "DateTime" | "instant" => PartialDateTime::parse(s)
            .map(FhirPathValue::DateTime)
            .unwrap_or_else(|_| FhirPathValue::String(s.to_string())),
        "time" | "Time" => PartialTime::parse(s).map(FhirPathValue::Time).unwrap_or_else(|_| FhirPathValue::String(s.to_string())),
        _ => FhirPathValue::String(s.to_string()),
    }
}

fn number_to_value(type_name: &str, n: &serde_json::Number) -> FhirPathValue {
    use rust_decimal::Decimal;
    use std::str::FromStr;
    if type_name.eq_ignore_ascii_case("integer") || type_name.eq_ignore_ascii_case("unsignedInt") || type_name.eq_ignore_ascii_case("positiveInt") {
        if let Some(i) = n.as_i64() {
            return FhirPathValue::Integer(i);
        }
    }
    Decimal::from_str(&n.to_string())
        .map(FhirPathValue::Decimal)
        .unwrap_or(FhirPathValue::Integer(n.as_i64().unwrap_or_default()))
}

impl ResourceAdapter for JsonResourceAdapter {
    fn children(&self, element: &ElementHandle, name: &str) -> Result<Collection> {
        let Some(json) = self.json_of(element) else {
            return Ok(Collection::empty());
        };
        let Json::Object(map) = json else {
            return Ok(Collection::empty());
        };

        if let Some(child) = map.get(name) {
            return Ok(self.json_value_to_collection(name, child));
        }

        // choice[x] lookup: `value` resolves to `valueQuantity`, `valueString`, ...
        if let Some(suffix) = self.resolve_choice_type(element, name) {
            let key = format!("{name}{suffix}");
            if let Some(child) = map.get(&key) {
                return Ok(self.json_value_to_collection(&suffix, child));
            }
        }

        Ok(Collection::empty())
    }

    fn declared_type(&self, element: &ElementHandle) -> String {
        element.type_name.clone()
    }

    fn resolve_choice_type(&self, element: &ElementHandle, base_name: &str) -> Option<String> {
        let json = self.json_of(element)?;
        let Json::Object(map) = json else { return None };
        self.choice_types.iter().find(|t| map.contains_key(&format!("{base_name}{t}"))).cloned()
    }

    fn to_primitive(&self, element: &ElementHandle) -> Option<FhirPathValue> {
        let json = self.json_of(element)?;
        match json {
            Json::Object(_) | Json::Array(_) | Json::Null => None,
            leaf => Some(self.json_to_value(&element.type_name, leaf)),
        }
    }
}

impl JsonResourceAdapter {
    fn json_value_to_collection(&self, type_name: &str, json: &Json) -> Collection {
        match json {
            Json::Array(items) => items.iter().map(|item| self.json_item_to_value(type_name, item)).collect(),
            Json::Null => Collection::empty(),
            other => Collection::singleton(self.json_item_to_value(type_name, other)),
        }
    }

    fn json_item_to_value(&self, type_name: &str, json: &Json) -> FhirPathValue {
        match json {
            Json::Object(_) => FhirPathValue::Element(ElementHandle::new(type_name.to_string(), Arc::new(json.clone()))),
            leaf => self.json_to_value(type_name, leaf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patient_adapter() -> JsonResourceAdapter {
        JsonResourceAdapter::new(vec!["Quantity".to_string(), "String".to_string()])
    }

    #[test]
    fn navigates_simple_child() {
        let adapter = patient_adapter();
        let root = JsonResourceAdapter::wrap("Patient", json!({"active": true}));
        let FhirPathValue::Element(handle) = &root else { panic!() };
        let children = adapter.children(handle, "active").unwrap();
        assert_eq!(children.as_singleton(), Some(&FhirPathValue::Boolean(true)));
    }

    #[test]
    fn navigates_repeating_child_as_collection() {
        let adapter = patient_adapter();
        let root = JsonResourceAdapter::wrap("Patient", json!({"name": [{"family": "Smith"}, {"family": "Jones"}]}));
        let FhirPathValue::Element(handle) = &root else { panic!() };
        let names = adapter.children(handle, "name").unwrap();
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn resolves_choice_type_by_suffix() {
        let adapter = patient_adapter();
        let root = JsonResourceAdapter::wrap(
            "Observation",
            json!({"valueQuantity": {"value": 1, "unit": "mg"}}),
        );
        let FhirPathValue::Element(handle) = &root else { panic!() };
        let value = adapter.children(handle, "value").unwrap();
        assert_eq!(value.len(), 1);
    }

    #[test]
    fn missing_child_is_empty_not_error() {
        let adapter = patient_adapter();
        let root = JsonResourceAdapter::wrap("Patient", json!({}));
        let FhirPathValue::Element(handle) = &root else { panic!() };
        assert!(adapter.children(handle, "missing").unwrap().is_empty());
    }
}
