//! An embeddable evaluator for FHIRPath expressions.
//!
//! ```text
//! text -> Lexer -> Parser -> AST -> Evaluator(AST, Context, ResourceAdapter) -> Collection<Value>
//! ```
//!
//! The crate is a pure, synchronous function from `(expression, context)` to
//! a [`model::Collection`] of [`model::FhirPathValue`]s: no I/O, no
//! persistent state, no concurrency of its own. Host integration — the
//! resource tree an expression navigates — is a capability interface
//! ([`evaluator::ResourceAdapter`]) the caller supplies; this crate ships a
//! `serde_json`-backed demo implementation for independent testing.

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod parser;
pub mod registry;

use std::collections::HashMap;
use std::sync::Arc;

pub use error::{FhirPathError, Result};
pub use evaluator::{Context, EvaluationConfig, FhirPathEngine, JsonResourceAdapter, ResourceAdapter, Variables};
pub use model::{Collection, ElementHandle, FhirPathValue, Quantity, TypeInfo, UnitMap};

/// Evaluate a FHIRPath expression against an optional JSON root resource and
/// a set of named variables, using the bundled [`JsonResourceAdapter`].
///
/// This is the convenience entry point for hosts that don't need a custom
/// [`ResourceAdapter`] or expression caching across calls — it parses fresh
/// every time. For repeated evaluation of the same expression (or a custom
/// resource model), build a [`FhirPathEngine`] directly and call
/// [`FhirPathEngine::evaluate`].
///
/// `root` is `(declared type name, JSON body)`, e.g. `("Patient", json!({...}))`.
/// `choice_types` lists the candidate type suffixes the adapter should try
/// when resolving a polymorphic `value[x]`-style field (see
/// [`JsonResourceAdapter`]).
pub fn evaluate(
    expression: &str,
    root: Option<(&str, serde_json::Value)>,
    choice_types: Vec<String>,
    variables: HashMap<String, Option<FhirPathValue>>,
) -> Result<Collection> {
    let engine = FhirPathEngine::new();
    let adapter = JsonResourceAdapter::new(choice_types);
    let root_collection = match root {
        Some((type_name, json)) => Collection::singleton(JsonResourceAdapter::wrap(type_name, json)),
        None => Collection::empty(),
    };
    engine.evaluate(expression, root_collection, Arc::new(variables.into_iter().collect()), &adapter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn evaluates_a_simple_path_expression() {
        let result = evaluate(
            "Patient.active",
            Some(("Patient", json!({"active": true}))),
            vec![],
            HashMap::new(),
        )
        .unwrap();
        assert_eq!(result.as_singleton(), Some(&FhirPathValue::Boolean(true)));
    }

    #[test]
    fn evaluates_with_no_root_resource() {
        let result = evaluate("1 + 2", None, vec![], HashMap::new()).unwrap();
        assert_eq!(result.as_singleton(), Some(&FhirPathValue::Integer(3)));
    }
}
