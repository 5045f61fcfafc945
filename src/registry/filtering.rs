//! Filtering and projection: `where`, `select`, `repeat`, `ofType`.
//!
//! `where`/`select`/`repeat` are lambda-shaped: their single argument is an
//! unevaluated AST subtree re-run once per element with `$this`/`$index`
//! bound, never evaluated up front.

use super::check_arity;
use crate::ast::ExpressionNode;
use crate::error::{FhirPathError, Result};
use crate::evaluator::{to_kleene_bool, Context, Evaluator};
use crate::model::{Collection, FhirPathValue};

pub(crate) fn where_(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("where", args, 1, Some(1))?;
    let mut out = Vec::new();
    for (i, item) in invocant.iter().enumerate() {
        let child = ctx.with_iteration(item.clone(), i as i64);
        let kept = ev.eval(&args[0], &child, depth)?;
        if to_kleene_bool(&kept)? == Some(true) {
            out.push(item.clone());
        }
    }
    Ok(Collection::from_vec(out))
}

pub(crate) fn select(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("select", args, 1, Some(1))?;
    let mut out = Vec::new();
    for (i, item) in invocant.iter().enumerate() {
        let child = ctx.with_iteration(item.clone(), i as i64);
        let projected = ev.eval(&args[0], &child, depth)?;
        out.extend(projected.into_vec());
    }
    Ok(Collection::from_vec(out))
}

/// Fixed-point projection: repeatedly `select`s newly-discovered elements
/// until no new element appears, deduplicating against everything seen so
/// far (including the original invocant, so a cycle back to a seed doesn't
/// loop forever). The seed elements themselves are not part of the result
/// unless re-derived by the projection.
pub(crate) fn repeat(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("repeat", args, 1, Some(1))?;
    let mut seen: Vec<FhirPathValue> = invocant.iter().cloned().collect();
    let mut frontier: Vec<FhirPathValue> = seen.clone();
    let mut result: Vec<FhirPathValue> = Vec::new();
    let mut rounds = 0usize;

    while !frontier.is_empty() {
        rounds += 1;
        if rounds > ev.config.max_recursion_depth {
            return Err(FhirPathError::internal("repeat() exceeded maximum recursion depth"));
        }
        let mut next_frontier = Vec::new();
        for (i, item) in frontier.iter().enumerate() {
            let child = ctx.with_iteration(item.clone(), i as i64);
            let projected = ev.eval(&args[0], &child, depth + 1)?;
            for v in projected.into_vec() {
                if !seen.contains(&v) {
                    seen.push(v.clone());
                    next_frontier.push(v.clone());
                    result.push(v);
                }
            }
        }
        frontier = next_frontier;
    }
    Ok(Collection::from_vec(result))
}

/// Extract a dotted type name (`Patient`, `FHIR.Patient`, `System.String`)
/// from an unevaluated argument expression — `ofType`'s argument is a type
/// reference, not a navigable sub-expression, so it is never run through
/// `Evaluator::eval`.
fn expression_as_type_name(node: &ExpressionNode) -> Option<String> {
    match node {
        ExpressionNode::Identifier(name) | ExpressionNode::DelimitedIdentifier(name) => Some(name.clone()),
        ExpressionNode::PathStep { receiver, name } => {
            let prefix = expression_as_type_name(receiver)?;
            Some(format!("{prefix}.{name}"))
        }
        _ => None,
    }
}

pub(crate) fn of_type(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode]) -> Result<Collection> {
    check_arity("ofType", args, 1, Some(1))?;
    let type_name = expression_as_type_name(&args[0])
        .ok_or_else(|| FhirPathError::resolution("ofType() requires a type name argument"))?;
    let target = crate::model::TypeInfo::from_name(&type_name);
    let out: Vec<FhirPathValue> = invocant
        .iter()
        .filter(|v| super::types::type_info_of(v, ev.adapter).name() == target.name())
        .cloned()
        .collect();
    Ok(Collection::from_vec(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_name_extraction_handles_dotted_names() {
        let node = ExpressionNode::path_step(ExpressionNode::Identifier("FHIR".into()), "Patient");
        assert_eq!(expression_as_type_name(&node), Some("FHIR.Patient".to_string()));
    }
}
