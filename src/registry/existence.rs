//! Existence and set-membership functions: `empty`, `exists`, `all`,
//! `allTrue`/`anyTrue`/`allFalse`/`anyFalse`, `subsetOf`/`supersetOf`,
//! `count`, `distinct`/`isDistinct`, and the function form of `not`.

use super::check_arity;
use crate::ast::ExpressionNode;
use crate::error::Result;
use crate::evaluator::{ops, option_bool_to_collection, to_kleene_bool, Context, Evaluator};
use crate::model::{Collection, FhirPathValue};

pub(crate) fn empty(invocant: &Collection) -> Result<Collection> {
    Ok(Collection::singleton(FhirPathValue::Boolean(invocant.is_empty())))
}

pub(crate) fn not(invocant: &Collection) -> Result<Collection> {
    let b = to_kleene_bool(invocant)?;
    Ok(option_bool_to_collection(ops::kleene::not(b)))
}

pub(crate) fn count(invocant: &Collection) -> Result<Collection> {
    Ok(Collection::singleton(FhirPathValue::Integer(invocant.len() as i64)))
}

pub(crate) fn all_true(invocant: &Collection) -> Result<Collection> {
    Ok(Collection::singleton(FhirPathValue::Boolean(invocant.iter().all(is_true))))
}

pub(crate) fn any_true(invocant: &Collection) -> Result<Collection> {
    Ok(Collection::singleton(FhirPathValue::Boolean(invocant.iter().any(is_true))))
}

pub(crate) fn all_false(invocant: &Collection) -> Result<Collection> {
    Ok(Collection::singleton(FhirPathValue::Boolean(invocant.iter().all(|v| !is_true(v)))))
}

pub(crate) fn any_false(invocant: &Collection) -> Result<Collection> {
    Ok(Collection::singleton(FhirPathValue::Boolean(invocant.iter().any(|v| !is_true(v)))))
}

fn is_true(v: &FhirPathValue) -> bool {
    matches!(v, FhirPathValue::Boolean(true))
}

pub(crate) fn distinct(invocant: &Collection) -> Result<Collection> {
    let mut out: Vec<FhirPathValue> = Vec::with_capacity(invocant.len());
    for v in invocant.iter() {
        if !out.iter().any(|existing| ops::equal(existing, v) == Some(true)) {
            out.push(v.clone());
        }
    }
    Ok(Collection::from_vec(out))
}

pub(crate) fn is_distinct(invocant: &Collection) -> Result<Collection> {
    let deduped = distinct(invocant)?;
    Ok(Collection::singleton(FhirPathValue::Boolean(deduped.len() == invocant.len())))
}

pub(crate) fn exists(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("exists", args, 0, Some(1))?;
    if args.is_empty() {
        return Ok(Collection::singleton(FhirPathValue::Boolean(!invocant.is_empty())));
    }
    for (i, item) in invocant.iter().enumerate() {
        let child = ctx.with_iteration(item.clone(), i as i64);
        let result = ev.eval(&args[0], &child, depth)?;
        if to_kleene_bool(&result)? == Some(true) {
            return Ok(Collection::singleton(FhirPathValue::Boolean(true)));
        }
    }
    Ok(Collection::singleton(FhirPathValue::Boolean(false)))
}

/// `all(criteria)`: Kleene-AND over the per-element criteria. An empty
/// invocant is vacuously true.
pub(crate) fn all(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("all", args, 1, Some(1))?;
    let mut acc = Some(true);
    for (i, item) in invocant.iter().enumerate() {
        let child = ctx.with_iteration(item.clone(), i as i64);
        let result = ev.eval(&args[0], &child, depth)?;
        acc = ops::kleene::and(acc, to_kleene_bool(&result)?);
    }
    Ok(option_bool_to_collection(acc))
}

pub(crate) fn subset_of(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("subsetOf", args, 1, Some(1))?;
    let other = ev.eval(&args[0], ctx, depth)?;
    let result = invocant
        .iter()
        .all(|v| other.iter().any(|o| ops::equal(v, o) == Some(true)));
    Ok(Collection::singleton(FhirPathValue::Boolean(result)))
}

pub(crate) fn superset_of(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("supersetOf", args, 1, Some(1))?;
    let other = ev.eval(&args[0], ctx, depth)?;
    let result = other
        .iter()
        .all(|o| invocant.iter().any(|v| ops::equal(v, o) == Some(true)));
    Ok(Collection::singleton(FhirPathValue::Boolean(result)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_keeps_first_occurrence() {
        let c = Collection::from_vec(vec![
            FhirPathValue::String("a".into()),
            FhirPathValue::String("b".into()),
            FhirPathValue::String("a".into()),
        ]);
        let d = distinct(&c).unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(d.get(0), Some(&FhirPathValue::String("a".into())));
        assert_eq!(d.get(1), Some(&FhirPathValue::String("b".into())));
    }

    #[test]
    fn all_true_on_empty_is_true() {
        assert_eq!(all_true(&Collection::empty()).unwrap().as_singleton(), Some(&FhirPathValue::Boolean(true)));
    }

    #[test]
    fn any_true_on_empty_is_false() {
        assert_eq!(any_true(&Collection::empty()).unwrap().as_singleton(), Some(&FhirPathValue::Boolean(false)));
    }
}
