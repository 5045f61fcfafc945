//! Aggregation: `aggregate(expr, init?)`, and the lambda-shaped `sort`.
//!
//! `aggregate` threads `$total` across `$this` iterations. Each call gets
//! its own frame via [`Context::with_total`] — nested `aggregate` calls
//! never observe an outer `$total`, since the inner call's context is a
//! clone with its own `total` field, and cloning never mutates the frame it
//! was cloned from.

use super::check_arity;
use crate::ast::ExpressionNode;
use crate::error::Result;
use crate::evaluator::{ops, Context, Evaluator};
use crate::model::Collection;
use std::cmp::Ordering;

pub(crate) fn aggregate(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("aggregate", args, 1, Some(2))?;
    let mut total = match args.get(1) {
        Some(init) => ev.eval(init, ctx, depth)?,
        None => Collection::empty(),
    };
    for (i, item) in invocant.iter().enumerate() {
        let child = ctx.with_iteration(item.clone(), i as i64).with_total(total);
        total = ev.eval(&args[0], &child, depth)?;
    }
    Ok(total)
}

/// `sort(criteria?)`: stable sort by the criteria expression evaluated per
/// element (ascending); with no argument, sorts by the invocant's own
/// natural ordering. Pairs the comparator can't order (mixed kinds,
/// incomparable quantities, indeterminate partial dates) keep their
/// relative input order.
pub(crate) fn sort(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("sort", args, 0, Some(1))?;
    let mut keyed: Vec<(usize, crate::model::FhirPathValue)> = invocant.iter().cloned().enumerate().collect();
    match args.first() {
        None => {
            keyed.sort_by(|(_, a), (_, b)| ops::compare(a, b).ok().flatten().unwrap_or(Ordering::Equal));
        }
        Some(criteria) => {
            let mut keys = Vec::with_capacity(keyed.len());
            for (i, item) in invocant.iter().enumerate() {
                let child = ctx.with_iteration(item.clone(), i as i64);
                let key = ev.eval(criteria, &child, depth)?;
                keys.push(key.as_singleton().cloned());
            }
            keyed.sort_by(|(ia, _), (ib, _)| match (&keys[*ia], &keys[*ib]) {
                (Some(a), Some(b)) => ops::compare(a, b).ok().flatten().unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            });
        }
    }
    Ok(Collection::from_vec(keyed.into_iter().map(|(_, v)| v).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FhirPathValue;
    use rustc_hash::FxHashMap;
    use std::sync::Arc;

    fn empty_vars() -> crate::evaluator::Variables {
        Arc::new(FxHashMap::default())
    }

    #[test]
    fn aggregate_without_init_starts_from_empty_total() {
        use crate::evaluator::{EvaluationConfig, JsonResourceAdapter};
        let config = EvaluationConfig::default();
        let adapter = JsonResourceAdapter::new(vec![]);
        let ev = Evaluator { config: &config, adapter: &adapter };
        let ctx = Context::root(Collection::empty(), empty_vars());
        let invocant = Collection::from_vec(vec![FhirPathValue::Integer(1), FhirPathValue::Integer(2)]);
        let args = vec![ExpressionNode::binary_op(
            crate::ast::BinaryOperator::Add,
            ExpressionNode::VariableRef("$total".to_string()),
            ExpressionNode::VariableRef("$this".to_string()),
        )];
        // With no init, $total starts empty; `empty + 1` is empty, so the
        // running total stays empty throughout — callers that need a seed
        // must supply `init`.
        let result = aggregate(&ev, &invocant, &args, &ctx, 0).unwrap();
        assert!(result.is_empty());
    }
}
