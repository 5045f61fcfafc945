//! String functions: `indexOf`, `substring`, `startsWith`, `endsWith`,
//! `contains`, `upper`, `lower`, `replace`, `matches`, `replaceMatches`,
//! `length`, `toChars`.

use super::{check_arity, eval_args};
use crate::ast::ExpressionNode;
use crate::error::{FhirPathError, Result};
use crate::evaluator::{singleton_operand, Context, Evaluator};
use crate::model::{Collection, FhirPathValue};

fn as_string(collection: &Collection, label: &str) -> Result<Option<String>> {
    match singleton_operand(collection, label)? {
        None => Ok(None),
        Some(FhirPathValue::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(FhirPathError::type_error(format!("{label} requires a String, got {other:?}"))),
    }
}

fn as_integer(collection: &Collection, label: &str) -> Result<Option<i64>> {
    match singleton_operand(collection, label)? {
        None => Ok(None),
        Some(FhirPathValue::Integer(i)) => Ok(Some(*i)),
        Some(FhirPathValue::Long(i)) => Ok(Some(*i)),
        Some(other) => Err(FhirPathError::type_error(format!("{label} requires an Integer, got {other:?}"))),
    }
}

pub(crate) fn length(invocant: &Collection) -> Result<Collection> {
    let Some(s) = as_string(invocant, "length()")? else {
        return Ok(Collection::empty());
    };
    Ok(Collection::singleton(FhirPathValue::Integer(s.chars().count() as i64)))
}

pub(crate) fn upper(invocant: &Collection) -> Result<Collection> {
    let Some(s) = as_string(invocant, "upper()")? else {
        return Ok(Collection::empty());
    };
    Ok(Collection::singleton(FhirPathValue::String(s.to_uppercase())))
}

pub(crate) fn lower(invocant: &Collection) -> Result<Collection> {
    let Some(s) = as_string(invocant, "lower()")? else {
        return Ok(Collection::empty());
    };
    Ok(Collection::singleton(FhirPathValue::String(s.to_lowercase())))
}

pub(crate) fn to_chars(invocant: &Collection) -> Result<Collection> {
    let Some(s) = as_string(invocant, "toChars()")? else {
        return Ok(Collection::empty());
    };
    Ok(s.chars().map(|c| FhirPathValue::String(c.to_string())).collect())
}

pub(crate) fn index_of(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("indexOf", args, 1, Some(1))?;
    let Some(haystack) = as_string(invocant, "indexOf()")? else {
        return Ok(Collection::empty());
    };
    let evaluated = eval_args(ev, args, ctx, depth)?;
    let Some(needle) = as_string(&evaluated[0], "indexOf() argument")? else {
        return Ok(Collection::empty());
    };
    let index = haystack.find(&needle).map(|byte_idx| haystack[..byte_idx].chars().count() as i64).unwrap_or(-1);
    Ok(Collection::singleton(FhirPathValue::Integer(index)))
}

pub(crate) fn substring(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("substring", args, 1, Some(2))?;
    let Some(s) = as_string(invocant, "substring()")? else {
        return Ok(Collection::empty());
    };
    let evaluated = eval_args(ev, args, ctx, depth)?;
    let Some(start) = as_integer(&evaluated[0], "substring() start")? else {
        return Ok(Collection::empty());
    };
    let chars: Vec<char> = s.chars().collect();
    if start < 0 || start as usize >= chars.len() {
        return Ok(Collection::empty());
    }
    let start = start as usize;
    let end = match evaluated.get(1) {
        Some(length_collection) => match as_integer(length_collection, "substring() length")? {
            Some(len) => (start + len.max(0) as usize).min(chars.len()),
            None => return Ok(Collection::empty()),
        },
        None => chars.len(),
    };
    let result: String = chars[start..end.max(start)].iter().collect();
    Ok(Collection::singleton(FhirPathValue::String(result)))
}

pub(crate) fn starts_with(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("startsWith", args, 1, Some(1))?;
    let Some(s) = as_string(invocant, "startsWith()")? else {
        return Ok(Collection::empty());
    };
    let evaluated = eval_args(ev, args, ctx, depth)?;
    let Some(prefix) = as_string(&evaluated[0], "startsWith() argument")? else {
        return Ok(Collection::empty());
    };
    Ok(Collection::singleton(FhirPathValue::Boolean(s.starts_with(&prefix))))
}

pub(crate) fn ends_with(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("endsWith", args, 1, Some(1))?;
    let Some(s) = as_string(invocant, "endsWith()")? else {
        return Ok(Collection::empty());
    };
    let evaluated = eval_args(ev, args, ctx, depth)?;
    let Some(suffix) = as_string(&evaluated[0], "endsWith() argument")? else {
        return Ok(Collection::empty());
    };
    Ok(Collection::singleton(FhirPathValue::Boolean(s.ends_with(&suffix))))
}

/// `String.contains(substring)` — distinct from the `contains` *operator*
/// (reverse membership over a collection), which is dispatched directly
/// from `BinaryOp` and never reaches this function.
pub(crate) fn contains(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("contains", args, 1, Some(1))?;
    let Some(s) = as_string(invocant, "contains()")? else {
        return Ok(Collection::empty());
    };
    let evaluated = eval_args(ev, args, ctx, depth)?;
    let Some(needle) = as_string(&evaluated[0], "contains() argument")? else {
        return Ok(Collection::empty());
    };
    Ok(Collection::singleton(FhirPathValue::Boolean(s.contains(&needle))))
}

pub(crate) fn replace(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("replace", args, 2, Some(2))?;
    let Some(s) = as_string(invocant, "replace()")? else {
        return Ok(Collection::empty());
    };
    let evaluated = eval_args(ev, args, ctx, depth)?;
    let (Some(pattern), Some(substitution)) = (
        as_string(&evaluated[0], "replace() pattern")?,
        as_string(&evaluated[1], "replace() substitution")?,
    ) else {
        return Ok(Collection::empty());
    };
    Ok(Collection::singleton(FhirPathValue::String(s.replace(&pattern, &substitution))))
}

pub(crate) fn matches(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("matches", args, 1, Some(1))?;
    let Some(s) = as_string(invocant, "matches()")? else {
        return Ok(Collection::empty());
    };
    let evaluated = eval_args(ev, args, ctx, depth)?;
    let Some(pattern) = as_string(&evaluated[0], "matches() argument")? else {
        return Ok(Collection::empty());
    };
    let re = regex::Regex::new(&pattern).map_err(|e| FhirPathError::type_error(format!("invalid regex '{pattern}': {e}")))?;
    Ok(Collection::singleton(FhirPathValue::Boolean(re.is_match(&s))))
}

pub(crate) fn replace_matches(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("replaceMatches", args, 2, Some(2))?;
    let Some(s) = as_string(invocant, "replaceMatches()")? else {
        return Ok(Collection::empty());
    };
    let evaluated = eval_args(ev, args, ctx, depth)?;
    let (Some(pattern), Some(substitution)) = (
        as_string(&evaluated[0], "replaceMatches() pattern")?,
        as_string(&evaluated[1], "replaceMatches() substitution")?,
    ) else {
        return Ok(Collection::empty());
    };
    let re = regex::Regex::new(&pattern).map_err(|e| FhirPathError::type_error(format!("invalid regex '{pattern}': {e}")))?;
    Ok(Collection::singleton(FhirPathValue::String(re.replace_all(&s, substitution.as_str()).into_owned())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_counts_unicode_scalars_not_bytes() {
        let c = Collection::singleton(FhirPathValue::String("café".to_string()));
        assert_eq!(length(&c).unwrap().as_singleton(), Some(&FhirPathValue::Integer(4)));
    }

    #[test]
    fn to_chars_splits_into_one_string_per_character() {
        let c = Collection::singleton(FhirPathValue::String("ab".to_string()));
        let chars = to_chars(&c).unwrap();
        assert_eq!(chars.len(), 2);
        assert_eq!(chars.get(0), Some(&FhirPathValue::String("a".to_string())));
    }
}
