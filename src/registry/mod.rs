//! The built-in function library: everything invoked as a bare call
//! (`today()`) or as a method on an invocant (`name.given.first()`).
//!
//! Functions are grouped by family, matching the specification's own
//! grouping, and dispatched from a single [`dispatch`] entry point rather
//! than registered as trait objects — unlike pre-evaluated-argument
//! designs, several families here (`filtering`, `aggregation`, `sort`) need
//! their arguments as unevaluated [`ExpressionNode`]s so they can re-run a
//! lambda body once per element with `$this`/`$index`/`$total` bound.

pub mod aggregation;
pub mod conversion;
pub mod existence;
pub mod filtering;
pub mod math;
pub mod misc;
pub mod strings;
pub mod subsetting;
pub mod types;

use crate::ast::ExpressionNode;
use crate::error::{FhirPathError, Result};
use crate::evaluator::{Context, Evaluator};
use crate::model::Collection;

/// Evaluate every argument in `args` eagerly against `ctx`, for functions
/// whose arguments are plain values rather than lambda bodies.
pub(crate) fn eval_args(ev: &Evaluator, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Vec<Collection>> {
    args.iter().map(|arg| ev.eval(arg, ctx, depth)).collect()
}

/// Require exactly `args.len()` to fall in `[min, max]` (`max = None` for
/// unbounded), else raise an arity error tagged with `function`.
pub(crate) fn check_arity(function: &str, args: &[ExpressionNode], min: usize, max: Option<usize>) -> Result<()> {
    let n = args.len();
    let ok = n >= min && max.map(|m| n <= m).unwrap_or(true);
    if ok {
        return Ok(());
    }
    let expected = match max {
        Some(m) if m == min => min.to_string(),
        Some(m) => format!("{min}..={m}"),
        None => format!(">={min}"),
    };
    Err(FhirPathError::arity(function, expected, n))
}

/// Dispatch a function call: `name` is the function/method name, `invocant`
/// is the already-evaluated receiver collection (the full focus for a bare
/// `FunctionCall`, or the left operand's result for an `InvocationStep`).
pub(crate) fn dispatch(
    ev: &Evaluator,
    name: &str,
    invocant: Collection,
    args: &[ExpressionNode],
    ctx: &Context,
    depth: usize,
) -> Result<Collection> {
    match name {
        // --- existence ---
        "empty" => existence::empty(&invocant),
        "exists" => existence::exists(ev, &invocant, args, ctx, depth),
        "all" => existence::all(ev, &invocant, args, ctx, depth),
        "allTrue" => existence::all_true(&invocant),
        "anyTrue" => existence::any_true(&invocant),
        "allFalse" => existence::all_false(&invocant),
        "anyFalse" => existence::any_false(&invocant),
        "subsetOf" => existence::subset_of(ev, &invocant, args, ctx, depth),
        "supersetOf" => existence::superset_of(ev, &invocant, args, ctx, depth),
        "count" => existence::count(&invocant),
        "distinct" => existence::distinct(&invocant),
        "isDistinct" => existence::is_distinct(&invocant),
        "not" => existence::not(&invocant),

        // --- filtering / projection ---
        "where" => filtering::where_(ev, &invocant, args, ctx, depth),
        "select" => filtering::select(ev, &invocant, args, ctx, depth),
        "repeat" => filtering::repeat(ev, &invocant, args, ctx, depth),
        "ofType" => filtering::of_type(ev, &invocant, args),

        // --- subsetting ---
        "single" => subsetting::single(&invocant),
        "first" => subsetting::first(&invocant),
        "last" => subsetting::last(&invocant),
        "tail" => subsetting::tail(&invocant),
        "skip" => subsetting::skip(ev, &invocant, args, ctx, depth),
        "take" => subsetting::take(ev, &invocant, args, ctx, depth),
        "intersect" => subsetting::intersect(ev, &invocant, args, ctx, depth),
        "exclude" => subsetting::exclude(ev, &invocant, args, ctx, depth),

        // --- aggregation ---
        "aggregate" => aggregation::aggregate(ev, &invocant, args, ctx, depth),
        "sort" => aggregation::sort(ev, &invocant, args, ctx, depth),

        // --- strings ---
        "indexOf" => strings::index_of(ev, &invocant, args, ctx, depth),
        "substring" => strings::substring(ev, &invocant, args, ctx, depth),
        "startsWith" => strings::starts_with(ev, &invocant, args, ctx, depth),
        "endsWith" => strings::ends_with(ev, &invocant, args, ctx, depth),
        "contains" => strings::contains(ev, &invocant, args, ctx, depth),
        "upper" => strings::upper(&invocant),
        "lower" => strings::lower(&invocant),
        "replace" => strings::replace(ev, &invocant, args, ctx, depth),
        "matches" => strings::matches(ev, &invocant, args, ctx, depth),
        "replaceMatches" => strings::replace_matches(ev, &invocant, args, ctx, depth),
        "length" => strings::length(&invocant),
        "toChars" => strings::to_chars(&invocant),

        // --- math ---
        "abs" => math::abs(&invocant),
        "ceiling" => math::ceiling(&invocant),
        "floor" => math::floor(&invocant),
        "round" => math::round(ev, &invocant, args, ctx, depth),
        "sqrt" => math::sqrt(&invocant),
        "truncate" => math::truncate(&invocant),
        "exp" => math::exp(&invocant),
        "ln" => math::ln(&invocant),
        "log" => math::log(ev, &invocant, args, ctx, depth),
        "power" => math::power(ev, &invocant, args, ctx, depth),

        // --- conversion ---
        "toInteger" => conversion::to_integer(&invocant),
        "toDecimal" => conversion::to_decimal(&invocant),
        "toString" => conversion::to_string_fn(&invocant),
        "toDate" => conversion::to_date(&invocant),
        "toDateTime" => conversion::to_date_time(&invocant),
        "toTime" => conversion::to_time(&invocant),
        "toQuantity" => conversion::to_quantity(&invocant),
        "toBoolean" => conversion::to_boolean(&invocant),
        "convertsToInteger" => conversion::converts_to_integer(&invocant),
        "convertsToDecimal" => conversion::converts_to_decimal(&invocant),
        "convertsToString" => conversion::converts_to_string(&invocant),
        "convertsToDate" => conversion::converts_to_date(&invocant),
        "convertsToDateTime" => conversion::converts_to_date_time(&invocant),
        "convertsToTime" => conversion::converts_to_time(&invocant),
        "convertsToQuantity" => conversion::converts_to_quantity(&invocant),
        "convertsToBoolean" => conversion::converts_to_boolean(&invocant),

        // --- types ---
        "type" => types::type_fn(ev, &invocant),

        // --- supplemented misc ---
        "iif" => misc::iif(ev, &invocant, args, ctx, depth),
        "trace" => misc::trace(ev, &invocant, args, ctx, depth),

        _ => Err(FhirPathError::resolution(format!("unknown function '{name}'"))),
    }
}
