//! Supplemented built-ins that round out the function library beyond the
//! spec-normative families: `iif`, `trace`.

use super::check_arity;
use crate::ast::ExpressionNode;
use crate::error::{FhirPathError, Result};
use crate::evaluator::{to_kleene_bool, Context, Evaluator};
use crate::model::Collection;

/// `iif(criteria, true-result, otherwise-result?)`: a single-evaluation
/// conditional, not an iteration construct — `criteria` is evaluated once
/// against the current context, not once per invocant element.
pub(crate) fn iif(ev: &Evaluator, _invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("iif", args, 2, Some(3))?;
    let criteria = ev.eval(&args[0], ctx, depth)?;
    match to_kleene_bool(&criteria)? {
        Some(true) => ev.eval(&args[1], ctx, depth),
        Some(false) | None => match args.get(2) {
            Some(otherwise) => ev.eval(otherwise, ctx, depth),
            None => Ok(Collection::empty()),
        },
    }
}

/// `trace(name, projection?)`: logs the projected collection (or the
/// invocant, if no projection is given) tagged with `name`, then passes the
/// invocant through unchanged. Never touches `$total`/`$this` — there is no
/// per-element iteration.
pub(crate) fn trace(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("trace", args, 1, Some(2))?;
    let name = match ev.eval(&args[0], ctx, depth)?.as_singleton() {
        Some(crate::model::FhirPathValue::String(s)) => s.clone(),
        _ => return Err(FhirPathError::type_error("trace() name must be a singleton String")),
    };
    let logged = match args.get(1) {
        Some(projection) => ev.eval(projection, ctx, depth)?,
        None => invocant.clone(),
    };
    log::debug!("trace({name}): {} item(s): {logged:?}", logged.len());
    Ok(invocant.clone())
}
