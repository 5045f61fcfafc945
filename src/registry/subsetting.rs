//! Subsetting: `single`, `first`, `last`, `tail`, `skip`, `take`,
//! `intersect`, `exclude`.

use super::{check_arity, eval_args};
use crate::ast::ExpressionNode;
use crate::error::{FhirPathError, Result};
use crate::evaluator::{ops, singleton_operand, Context, Evaluator};
use crate::model::{Collection, FhirPathValue};

pub(crate) fn single(invocant: &Collection) -> Result<Collection> {
    match invocant.len() {
        0 => Ok(Collection::empty()),
        1 => Ok(invocant.clone()),
        n => Err(FhirPathError::singleton("single()", n)),
    }
}

pub(crate) fn first(invocant: &Collection) -> Result<Collection> {
    Ok(invocant.first().cloned().map(Collection::singleton).unwrap_or_else(Collection::empty))
}

pub(crate) fn last(invocant: &Collection) -> Result<Collection> {
    Ok(invocant.last().cloned().map(Collection::singleton).unwrap_or_else(Collection::empty))
}

pub(crate) fn tail(invocant: &Collection) -> Result<Collection> {
    if invocant.is_empty() {
        return Ok(Collection::empty());
    }
    Ok(Collection::from_vec(invocant.as_slice()[1..].to_vec()))
}

fn singleton_count(ev: &Evaluator, args: &[ExpressionNode], ctx: &Context, depth: usize, label: &str) -> Result<Option<i64>> {
    let evaluated = eval_args(ev, args, ctx, depth)?;
    let Some(count_value) = singleton_operand(&evaluated[0], label)? else {
        return Ok(None);
    };
    match count_value {
        FhirPathValue::Integer(i) => Ok(Some(*i)),
        FhirPathValue::Long(i) => Ok(Some(*i)),
        other => Err(FhirPathError::type_error(format!("{label} requires an Integer, got {other:?}"))),
    }
}

pub(crate) fn skip(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("skip", args, 1, Some(1))?;
    let Some(n) = singleton_count(ev, args, ctx, depth, "skip()")? else {
        return Ok(Collection::empty());
    };
    let skip_n = n.max(0) as usize;
    if skip_n >= invocant.len() {
        return Ok(Collection::empty());
    }
    Ok(Collection::from_vec(invocant.as_slice()[skip_n..].to_vec()))
}

pub(crate) fn take(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("take", args, 1, Some(1))?;
    let Some(n) = singleton_count(ev, args, ctx, depth, "take()")? else {
        return Ok(Collection::empty());
    };
    let take_n = n.max(0) as usize;
    let end = take_n.min(invocant.len());
    Ok(Collection::from_vec(invocant.as_slice()[..end].to_vec()))
}

pub(crate) fn intersect(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("intersect", args, 1, Some(1))?;
    let other = ev.eval(&args[0], ctx, depth)?;
    let mut out: Vec<FhirPathValue> = Vec::new();
    for v in invocant.iter() {
        let in_other = other.iter().any(|o| ops::equal(v, o) == Some(true));
        let already = out.iter().any(|existing| ops::equal(existing, v) == Some(true));
        if in_other && !already {
            out.push(v.clone());
        }
    }
    Ok(Collection::from_vec(out))
}

pub(crate) fn exclude(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("exclude", args, 1, Some(1))?;
    let other = ev.eval(&args[0], ctx, depth)?;
    let out: Vec<FhirPathValue> = invocant
        .iter()
        .filter(|v| !other.iter().any(|o| ops::equal(v, o) == Some(true)))
        .cloned()
        .collect();
    Ok(Collection::from_vec(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_on_multi_element_is_an_error() {
        let c = Collection::from_vec(vec![FhirPathValue::Integer(1), FhirPathValue::Integer(2)]);
        assert!(single(&c).is_err());
    }

    #[test]
    fn tail_drops_the_first_element() {
        let c = Collection::from_vec(vec![FhirPathValue::Integer(1), FhirPathValue::Integer(2), FhirPathValue::Integer(3)]);
        let t = tail(&c).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(0), Some(&FhirPathValue::Integer(2)));
    }
}
