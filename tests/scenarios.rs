//! Black-box integration tests against the public `evaluate()` entry point,
//! covering the ten concrete end-to-end scenarios from the specification's
//! testable-properties section.

use fhirpath_engine::{evaluate, FhirPathError, FhirPathValue};
use std::collections::HashMap;

fn vars(pairs: &[(&str, Option<FhirPathValue>)]) -> HashMap<String, Option<FhirPathValue>> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[test]
fn scenario_1_nested_aggregate_has_independent_total() {
    let result = evaluate(
        "(1 | 2).aggregate((10 | 20 | 30).aggregate($total + $this, 0) + $total + $this, 0)",
        None,
        vec![],
        HashMap::new(),
    )
    .unwrap();
    assert_eq!(result.as_singleton(), Some(&FhirPathValue::Integer(123)));
}

#[test]
fn scenario_2_external_variable_lookup() {
    let result = evaluate(
        "%myString",
        None,
        vec![],
        vars(&[("myString", Some(FhirPathValue::String("hello".to_string())))]),
    )
    .unwrap();
    assert_eq!(result.as_singleton(), Some(&FhirPathValue::String("hello".to_string())));
}

#[test]
fn scenario_3_explicit_null_variable_is_empty() {
    let result = evaluate("%nullVar", None, vec![], vars(&[("nullVar", None)])).unwrap();
    assert!(result.is_empty());
}

#[test]
fn scenario_4_unknown_variable_is_a_resolution_error() {
    let err = evaluate("%unknownVar", None, vec![], HashMap::new()).unwrap_err();
    assert!(matches!(err, FhirPathError::Resolution { .. }));
}

#[test]
fn scenario_5_quantity_multiplication_canonicalises() {
    let result = evaluate("1 'kg' * 2 'm'", None, vec![], HashMap::new()).unwrap();
    match result.as_singleton() {
        Some(FhirPathValue::Quantity(q)) => {
            assert_eq!(q.value, "2000".parse().unwrap());
            assert_eq!(q.unit.as_deref(), Some("g.m"));
        }
        other => panic!("expected a quantity, got {other:?}"),
    }
}

#[test]
fn scenario_6_hour_equals_3600_seconds() {
    let result = evaluate("1 'h' = 3600 's'", None, vec![], HashMap::new()).unwrap();
    assert_eq!(result.as_singleton(), Some(&FhirPathValue::Boolean(true)));
}

#[test]
fn scenario_7_where_filters_by_this() {
    let result = evaluate("(10 | 20 | 30).where($this > 15)", None, vec![], HashMap::new()).unwrap();
    assert_eq!(
        result.into_vec(),
        vec![FhirPathValue::Integer(20), FhirPathValue::Integer(30)]
    );
}

#[test]
fn scenario_8_distinct_keeps_first_occurrence() {
    let result = evaluate("('a' | 'b' | 'a').distinct()", None, vec![], HashMap::new()).unwrap();
    assert_eq!(
        result.into_vec(),
        vec![
            FhirPathValue::String("a".to_string()),
            FhirPathValue::String("b".to_string()),
        ]
    );
}

#[test]
fn scenario_9_quoted_hyphenated_variable_resolves() {
    let result = evaluate(
        "%'my-var'",
        None,
        vec![],
        vars(&[("my-var", Some(FhirPathValue::String("hello".to_string())))]),
    )
    .unwrap();
    assert_eq!(result.as_singleton(), Some(&FhirPathValue::String("hello".to_string())));
}

#[test]
fn scenario_9_unquoted_hyphenated_variable_does_not_resolve() {
    // `%my-var` lexes as `%my` followed by `- var`, i.e. `%my` minus the
    // identifier `var` — not a single variable reference. With no `my`
    // variable bound, evaluating it is a resolution error rather than the
    // string lookup a naive reader might expect.
    let err = evaluate("%my-var", None, vec![], HashMap::new()).unwrap_err();
    assert!(matches!(err, FhirPathError::Resolution { .. }));
}

#[test]
fn scenario_10_division_by_zero_is_empty_not_an_error() {
    assert!(evaluate("4 div 0", None, vec![], HashMap::new()).unwrap().is_empty());
    assert!(evaluate("4 mod 0", None, vec![], HashMap::new()).unwrap().is_empty());
    assert!(evaluate("4 / 0", None, vec![], HashMap::new()).unwrap().is_empty());
}
