//! Evaluation context: the current focus, `$resource`, per-iteration
//! `$this`/`$index`, the `aggregate` accumulator `$total`, and user
//! variables.
//!
//! Context is an immutable value type — every iteration construct (`where`,
//! `select`, `aggregate`, ...) clones it and overrides the fields that
//! change for that frame rather than mutating shared state. That's what
//! gives nested `aggregate` calls independent `$total` frames for free: the
//! inner call's frame is a clone, and the outer frame it was cloned from is
//! untouched when the inner call returns.

use crate::model::{Collection, FhirPathValue};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// User-supplied variables, keyed by name. A value of `None` records a
/// variable explicitly bound to null — looked up, it yields an empty
/// collection, not a resolution error (only a name absent from the map
/// entirely is unresolved).
pub type Variables = Arc<FxHashMap<String, Option<FhirPathValue>>>;

/// The context an expression (sub)tree is evaluated against.
#[derive(Clone)]
pub struct Context {
    /// The current focus collection — what a bare path step navigates from.
    pub focus: Collection,
    /// `%resource` / `$resource`: the root resource the evaluation started
    /// from, fixed for the whole `evaluate()` call.
    pub resource: Collection,
    /// `$this`: the current iteration element, when inside a lambda body.
    pub this: Option<FhirPathValue>,
    /// `$index`: the current iteration position, when inside a lambda body.
    pub index: Option<i64>,
    /// `$total`: the running accumulator, when inside an `aggregate` body.
    pub total: Option<Collection>,
    /// User-provided variables, shared (never mutated) across the whole call.
    pub variables: Variables,
}

impl Context {
    /// The root context for a fresh `evaluate()` call: focus and `$resource`
    /// both start as the supplied root collection.
    pub fn root(root: Collection, variables: Variables) -> Self {
        Self {
            focus: root.clone(),
            resource: root,
            this: None,
            index: None,
            total: None,
            variables,
        }
    }

    /// A child frame with a new focus collection — used for evaluating a
    /// sub-expression against a different receiver (e.g. after a path step),
    /// without touching `$this`/`$index`/`$total`.
    pub fn with_focus(&self, focus: Collection) -> Self {
        Self {
            focus,
            ..self.clone()
        }
    }

    /// A per-iteration frame: `$this` and `$index` bound to one element of a
    /// collection being walked by `where`/`select`/`all`/... The new focus
    /// is the singleton `$this`, matching FHIRPath's rule that inside a
    /// lambda body, a bare path step navigates from `$this`.
    pub fn with_iteration(&self, this: FhirPathValue, index: i64) -> Self {
        Self {
            focus: Collection::singleton(this.clone()),
            this: Some(this),
            index: Some(index),
            ..self.clone()
        }
    }

    /// A nested `aggregate` frame: `$total` reset to `init`, independent of
    /// whatever `$total` this context already carried.
    pub fn with_total(&self, total: Collection) -> Self {
        Self {
            total: Some(total),
            ..self.clone()
        }
    }

    /// Look up a user variable. `Ok(None)` distinguishes "not found" (an
    /// unresolved name — the caller should raise a resolution error) from an
    /// explicit null binding, which the caller should treat as empty.
    pub fn lookup_variable(&self, name: &str) -> Option<Option<&FhirPathValue>> {
        self.variables.get(name).map(|v| v.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_vars() -> Variables {
        Arc::new(FxHashMap::default())
    }

    #[test]
    fn iteration_frame_binds_this_and_index() {
        let ctx = Context::root(Collection::empty(), empty_vars());
        let child = ctx.with_iteration(FhirPathValue::Integer(5), 2);
        assert_eq!(child.this, Some(FhirPathValue::Integer(5)));
        assert_eq!(child.index, Some(2));
        assert_eq!(child.focus.as_singleton(), Some(&FhirPathValue::Integer(5)));
    }

    #[test]
    fn nested_total_does_not_leak_to_outer_frame() {
        let ctx = Context::root(Collection::empty(), empty_vars());
        let outer = ctx.with_total(Collection::singleton(FhirPathValue::Integer(1)));
        let inner = outer.with_total(Collection::singleton(FhirPathValue::Integer(99)));
        assert_eq!(inner.total, Some(Collection::singleton(FhirPathValue::Integer(99))));
        // Outer frame, captured before the inner call, is untouched.
        assert_eq!(outer.total, Some(Collection::singleton(FhirPathValue::Integer(1))));
    }

    #[test]
    fn unknown_variable_is_none_explicit_null_is_some_none() {
        let mut vars = FxHashMap::default();
        vars.insert("nullVar".to_string(), None);
        let ctx = Context::root(Collection::empty(), Arc::new(vars));
        assert_eq!(ctx.lookup_variable("nullVar"), Some(None));
        assert_eq!(ctx.lookup_variable("missing"), None);
    }
}
