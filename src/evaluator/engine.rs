//! The tree-walking evaluator proper: [`FhirPathEngine`] (the public,
//! cache-carrying entry point) and [`Evaluator`] (the per-call dispatch
//! table threaded through recursive evaluation).

use super::context::Context;
use super::operators::{self, kleene};
use super::resource::ResourceAdapter;
use crate::ast::{BinaryOperator, ExpressionNode, LiteralValue, UnaryOperator};
use crate::error::{FhirPathError, Result};
use crate::model::{
    Collection, ElementHandle, FhirPathValue, PartialDate, PartialDateTime, PartialTime, Quantity, TypeInfo,
};
use crate::parser;
use crate::registry;
use lru::LruCache;
use rust_decimal::Decimal;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// Tunable knobs left open by the specification's design notes.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationConfig {
    /// Significant-digit precision for decimal arithmetic rounding.
    /// Default 15 — spec §9 marks this "to clarify" and asks implementers
    /// to make it configurable.
    pub decimal_precision: u32,
    /// Recursion depth guard for `repeat()` and recursive path expressions.
    /// A pure tree-walker still needs a stack-safety bound.
    pub max_recursion_depth: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            decimal_precision: 15,
            max_recursion_depth: 256,
        }
    }
}

/// The public entry point: parses (with an LRU cache of compiled ASTs) and
/// tree-walks FHIRPath expressions.
pub struct FhirPathEngine {
    config: EvaluationConfig,
    cache: Mutex<LruCache<String, Arc<ExpressionNode>>>,
}

impl Default for FhirPathEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FhirPathEngine {
    /// Build an engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(EvaluationConfig::default())
    }

    /// Build an engine with explicit configuration.
    pub fn with_config(config: EvaluationConfig) -> Self {
        Self {
            config,
            cache: Mutex::new(LruCache::new(NonZeroUsize::new(256).unwrap())),
        }
    }

    /// This engine's configuration.
    pub fn config(&self) -> EvaluationConfig {
        self.config
    }

    /// Parse `expression`, reusing a cached AST when this exact text has
    /// been parsed before.
    pub fn parse(&self, expression: &str) -> Result<Arc<ExpressionNode>> {
        let mut cache = self.cache.lock().expect("fhirpath expression cache poisoned");
        if let Some(ast) = cache.get(expression) {
            log::trace!("expression cache hit for {expression:?}");
            return Ok(ast.clone());
        }
        log::debug!("expression cache miss for {expression:?}");
        let ast = Arc::new(parser::parse(expression)?);
        cache.put(expression.to_string(), ast.clone());
        Ok(ast)
    }

    /// Parse and evaluate `expression` against a root resource collection
    /// and a set of named variables.
    pub fn evaluate(
        &self,
        expression: &str,
        resource: Collection,
        variables: super::context::Variables,
        adapter: &dyn ResourceAdapter,
    ) -> Result<Collection> {
        let ast = self.parse(expression)?;
        self.evaluate_ast(&ast, resource, variables, adapter)
    }

    /// Evaluate a pre-parsed AST, e.g. one reused across many resources.
    pub fn evaluate_ast(
        &self,
        ast: &ExpressionNode,
        resource: Collection,
        variables: super::context::Variables,
        adapter: &dyn ResourceAdapter,
    ) -> Result<Collection> {
        let ctx = Context::root(resource, variables);
        let ev = Evaluator {
            config: &self.config,
            adapter,
        };
        ev.eval(ast, &ctx, 0)
    }
}

/// Per-call dispatch bundle threaded through recursive evaluation: the
/// config (for decimal precision/recursion limit) and the host's
/// [`ResourceAdapter`]. Not `Clone`/stored — built fresh per `evaluate` call.
pub(crate) struct Evaluator<'a> {
    pub config: &'a EvaluationConfig,
    pub adapter: &'a dyn ResourceAdapter,
}

impl<'a> Evaluator<'a> {
    fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > self.config.max_recursion_depth {
            return Err(FhirPathError::internal("maximum recursion depth exceeded"));
        }
        Ok(())
    }

    /// Tree-walk `node` against `ctx`, returning its result collection.
    pub fn eval(&self, node: &ExpressionNode, ctx: &Context, depth: usize) -> Result<Collection> {
        self.check_depth(depth)?;
        log::trace!("eval depth={depth} node={node:?}");
        match node {
            ExpressionNode::Literal(lit) => self.eval_literal(lit),
            ExpressionNode::Identifier(name) => self.navigate(&ctx.focus, name),
            ExpressionNode::DelimitedIdentifier(name) => self.navigate(&ctx.focus, name),
            ExpressionNode::PathStep { receiver, name } => {
                let recv = self.eval(receiver, ctx, depth + 1)?;
                self.navigate(&recv, name)
            }
            ExpressionNode::InvocationStep { receiver, name, args } => {
                let recv = self.eval(receiver, ctx, depth + 1)?;
                registry::dispatch(self, name, recv, args, ctx, depth + 1)
            }
            ExpressionNode::FunctionCall { name, args } => {
                registry::dispatch(self, name, ctx.focus.clone(), args, ctx, depth + 1)
            }
            ExpressionNode::Indexer { receiver, index } => self.eval_indexer(receiver, index, ctx, depth),
            ExpressionNode::BinaryOp { op, left, right } => self.eval_binary(*op, left, right, ctx, depth),
            ExpressionNode::UnaryOp { op, operand } => self.eval_unary(*op, operand, ctx, depth),
            ExpressionNode::VariableRef(name) => self.eval_variable(name, ctx),
            ExpressionNode::TypeExpr { op, expression, type_name } => {
                self.eval_type_expr(*op, expression, type_name, ctx, depth)
            }
        }
    }

    fn eval_literal(&self, lit: &LiteralValue) -> Result<Collection> {
        Ok(match lit {
            LiteralValue::Null => Collection::empty(),
            LiteralValue::Boolean(b) => Collection::singleton(FhirPathValue::Boolean(*b)),
            LiteralValue::Integer(i) => Collection::singleton(FhirPathValue::Integer(*i)),
            LiteralValue::Long(i) => Collection::singleton(FhirPathValue::Long(*i)),
            LiteralValue::Decimal(text) => {
                let d = Decimal::from_str(text)
                    .map_err(|_| FhirPathError::type_error(format!("invalid decimal literal '{text}'")))?;
                Collection::singleton(FhirPathValue::Decimal(d))
            }
            LiteralValue::String(s) => Collection::singleton(FhirPathValue::String(s.clone())),
            LiteralValue::Date(text) => Collection::singleton(FhirPathValue::Date(PartialDate::parse(text)?)),
            LiteralValue::DateTime(text) => {
                Collection::singleton(FhirPathValue::DateTime(PartialDateTime::parse(text)?))
            }
            LiteralValue::Time(text) => Collection::singleton(FhirPathValue::Time(PartialTime::parse(text)?)),
            LiteralValue::Quantity { value, unit } => {
                let d = Decimal::from_str(value)
                    .map_err(|_| FhirPathError::type_error(format!("invalid quantity value '{value}'")))?;
                Collection::singleton(FhirPathValue::Quantity(Quantity::new(d, Some(unit.clone()))))
            }
        })
    }

    /// Navigate one path step: for each `Element` in `collection`, either
    /// keep it as-is (its declared type already matches `name` — the root
    /// resource-type shortcut, e.g. the leading `Patient` in
    /// `Patient.name`) or ask the adapter for its `name`-children. Non-
    /// Element values yield empty for that step (spec §4.3).
    pub(crate) fn navigate(&self, collection: &Collection, name: &str) -> Result<Collection> {
        let mut out = Vec::new();
        for value in collection.iter() {
            if let FhirPathValue::Element(handle) = value {
                if self.adapter.declared_type(handle) == name {
                    out.push(value.clone());
                    continue;
                }
                out.extend(self.adapter.children(handle, name)?.into_vec());
            }
        }
        Ok(Collection::from_vec(out))
    }

    fn eval_indexer(&self, receiver: &ExpressionNode, index: &ExpressionNode, ctx: &Context, depth: usize) -> Result<Collection> {
        let recv = self.eval(receiver, ctx, depth + 1)?;
        let index_collection = self.eval(index, ctx, depth + 1)?;
        let Some(index_value) = singleton_operand(&index_collection, "indexer")? else {
            return Ok(Collection::empty());
        };
        let i = match index_value {
            FhirPathValue::Integer(i) => *i,
            FhirPathValue::Long(i) => *i,
            other => return Err(FhirPathError::type_error(format!("indexer requires an Integer, got {other:?}"))),
        };
        if i < 0 {
            return Ok(Collection::empty());
        }
        match recv.get(i as usize) {
            Some(v) => Ok(Collection::singleton(v.clone())),
            None => Ok(Collection::empty()),
        }
    }

    fn eval_variable(&self, name: &str, ctx: &Context) -> Result<Collection> {
        match name {
            "$this" => Ok(ctx.this.clone().map(Collection::singleton).unwrap_or_else(Collection::empty)),
            "$index" => Ok(ctx
                .index
                .map(|i| Collection::singleton(FhirPathValue::Integer(i)))
                .unwrap_or_else(Collection::empty)),
            "$total" => Ok(ctx.total.clone().unwrap_or_else(Collection::empty)),
            "context" => Ok(ctx.focus.clone()),
            "resource" => Ok(ctx.resource.clone()),
            "ucum" => Ok(Collection::singleton(FhirPathValue::String("http://unitsofmeasure.org".to_string()))),
            "sct" => Ok(Collection::singleton(FhirPathValue::String("http://snomed.info/sct".to_string()))),
            "loinc" => Ok(Collection::singleton(FhirPathValue::String("http://loinc.org".to_string()))),
            _ => match ctx.lookup_variable(name) {
                Some(Some(value)) => Ok(Collection::singleton(value.clone())),
                Some(None) => Ok(Collection::empty()),
                None => Err(FhirPathError::resolution(format!("unknown variable '%{name}'"))),
            },
        }
    }

    fn eval_type_expr(
        &self,
        op: BinaryOperator,
        expression: &ExpressionNode,
        type_name: &str,
        ctx: &Context,
        depth: usize,
    ) -> Result<Collection> {
        let value = self.eval(expression, ctx, depth + 1)?;
        let Some(v) = singleton_operand(&value, if op == BinaryOperator::Is { "is" } else { "as" })? else {
            return Ok(Collection::empty());
        };
        let target = TypeInfo::from_name(type_name);
        let actual = registry::types::type_info_of(v, self.adapter);
        match op {
            BinaryOperator::Is => Ok(Collection::singleton(FhirPathValue::Boolean(actual.name() == target.name()))),
            BinaryOperator::As => {
                if actual.name() == target.name() {
                    Ok(Collection::singleton(v.clone()))
                } else {
                    Ok(Collection::empty())
                }
            }
            _ => unreachable!("TypeExpr only ever carries Is/As"),
        }
    }

    fn eval_unary(&self, op: UnaryOperator, operand: &ExpressionNode, ctx: &Context, depth: usize) -> Result<Collection> {
        let value = self.eval(operand, ctx, depth + 1)?;
        match op {
            UnaryOperator::Not => {
                let b = to_kleene_bool(&value)?;
                Ok(option_bool_to_collection(kleene::not(b)))
            }
            UnaryOperator::Positive => Ok(value),
            UnaryOperator::Negate => {
                let Some(v) = singleton_operand(&value, "unary '-'")? else {
                    return Ok(Collection::empty());
                };
                let negated = match v {
                    FhirPathValue::Integer(i) => FhirPathValue::Integer(-i),
                    FhirPathValue::Long(i) => FhirPathValue::Long(-i),
                    FhirPathValue::Decimal(d) => FhirPathValue::Decimal(-d),
                    FhirPathValue::Quantity(q) => FhirPathValue::Quantity(Quantity::new(-q.value, q.unit.clone())),
                    other => return Err(FhirPathError::type_error(format!("unary '-' is not defined for {other:?}"))),
                };
                Ok(Collection::singleton(negated))
            }
        }
    }

    fn eval_binary(&self, op: BinaryOperator, left: &ExpressionNode, right: &ExpressionNode, ctx: &Context, depth: usize) -> Result<Collection> {
        use BinaryOperator::*;

        // `and`/`or`/`xor`/`implies` work over Kleene-coerced singleton
        // booleans, not extracted value pairs.
        if op.is_logical() {
            let l = to_kleene_bool(&self.eval(left, ctx, depth + 1)?)?;
            let r = to_kleene_bool(&self.eval(right, ctx, depth + 1)?)?;
            let result = match op {
                And => kleene::and(l, r),
                Or => kleene::or(l, r),
                Xor => kleene::xor(l, r),
                Implies => kleene::implies(l, r),
                _ => unreachable!(),
            };
            return Ok(option_bool_to_collection(result));
        }

        let left_c = self.eval(left, ctx, depth + 1)?;
        let right_c = self.eval(right, ctx, depth + 1)?;

        if op == Union {
            return Ok(union_dedup(&left_c, &right_c));
        }
        if matches!(op, In | Contains) {
            let (needle, haystack) = if op == In { (&left_c, &right_c) } else { (&right_c, &left_c) };
            let Some(n) = singleton_operand(needle, "in/contains")? else {
                return Ok(Collection::empty());
            };
            let found = haystack.iter().any(|v| operators::equal(n, v) == Some(true));
            return Ok(Collection::singleton(FhirPathValue::Boolean(found)));
        }

        // `&` treats a genuinely empty operand as the empty string rather
        // than propagating empty (spec clarification carried from the
        // FHIRPath normative grammar).
        if op == Concatenate {
            let l = left_c.as_singleton().cloned().unwrap_or(FhirPathValue::String(String::new()));
            let r = right_c.as_singleton().cloned().unwrap_or(FhirPathValue::String(String::new()));
            if left_c.len() > 1 || right_c.len() > 1 {
                return Err(FhirPathError::singleton("'&' operand", left_c.len().max(right_c.len())));
            }
            return Ok(Collection::singleton(operators::concatenate(&l, &r)));
        }

        let Some(l) = singleton_operand(&left_c, &op.to_string())? else {
            return Ok(Collection::empty());
        };
        let Some(r) = singleton_operand(&right_c, &op.to_string())? else {
            return Ok(Collection::empty());
        };

        let precision = self.config.decimal_precision;
        if op.is_arithmetic() {
            return Ok(match op {
                Add => Collection::singleton(operators::add(l, r, precision)?),
                Subtract => Collection::singleton(operators::subtract(l, r, precision)?),
                Multiply => Collection::singleton(operators::multiply(l, r, precision)?),
                Divide => match operators::divide(l, r, precision)? {
                    Some(v) => Collection::singleton(v),
                    None => Collection::empty(),
                },
                IntegerDivide => match operators::integer_divide(l, r)? {
                    Some(v) => Collection::singleton(v),
                    None => Collection::empty(),
                },
                Modulo => match operators::modulo(l, r, precision)? {
                    Some(v) => Collection::singleton(v),
                    None => Collection::empty(),
                },
                _ => unreachable!(),
            });
        }

        if op.is_equality() {
            let result = match op {
                Equal => operators::equal(l, r),
                NotEqual => operators::equal(l, r).map(|b| !b),
                Equivalent => Some(operators::equivalent(l, r)),
                NotEquivalent => Some(!operators::equivalent(l, r)),
                _ => unreachable!(),
            };
            return Ok(option_bool_to_collection(result));
        }

        if op.is_inequality() {
            let ord = operators::compare(l, r)?;
            let result = ord.map(|o| match op {
                LessThan => o.is_lt(),
                LessThanOrEqual => o.is_le(),
                GreaterThan => o.is_gt(),
                GreaterThanOrEqual => o.is_ge(),
                _ => unreachable!(),
            });
            return Ok(option_bool_to_collection(result));
        }

        unreachable!("every BinaryOperator variant is handled above")
    }
}

/// Extract a singleton operand: `Ok(None)` for genuine empty-propagation,
/// `Err(Singleton)` for a collection of length >= 2.
pub(crate) fn singleton_operand<'c>(collection: &'c Collection, label: &str) -> Result<Option<&'c FhirPathValue>> {
    match collection.len() {
        0 => Ok(None),
        1 => Ok(collection.first()),
        n => Err(FhirPathError::singleton(label.to_string(), n)),
    }
}

/// Coerce a collection to a Kleene truth value: empty is unknown (`None`),
/// a singleton `Boolean` is itself, anything else is a type error.
pub(crate) fn to_kleene_bool(collection: &Collection) -> Result<Option<bool>> {
    match singleton_operand(collection, "boolean operand")? {
        None => Ok(None),
        Some(FhirPathValue::Boolean(b)) => Ok(Some(*b)),
        Some(other) => Err(FhirPathError::type_error(format!("expected a Boolean, got {other:?}"))),
    }
}

pub(crate) fn option_bool_to_collection(value: Option<bool>) -> Collection {
    match value {
        Some(b) => Collection::singleton(FhirPathValue::Boolean(b)),
        None => Collection::empty(),
    }
}

/// `a | b`: concatenate then drop later duplicates by equivalence,
/// preserving first-occurrence order.
pub(crate) fn union_dedup(a: &Collection, b: &Collection) -> Collection {
    let mut out: Vec<FhirPathValue> = Vec::with_capacity(a.len() + b.len());
    for v in a.iter().chain(b.iter()) {
        if !out.iter().any(|existing| operators::equivalent(existing, v)) {
            out.push(v.clone());
        }
    }
    Collection::from_vec(out)
}

/// Handle on an [`ElementHandle`]'s payload-free parts the registry needs
/// without pulling in the full adapter trait object signature everywhere.
pub(crate) fn element_type_name(handle: &ElementHandle) -> &str {
    &handle.type_name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::resource::JsonResourceAdapter;
    use rustc_hash::FxHashMap;
    use std::sync::Arc;

    fn engine_eval(expr: &str) -> Collection {
        let engine = FhirPathEngine::new();
        let adapter = JsonResourceAdapter::new(vec![]);
        engine
            .evaluate(expr, Collection::empty(), Arc::new(FxHashMap::default()), &adapter)
            .unwrap()
    }

    #[test]
    fn arithmetic_and_precedence() {
        assert_eq!(engine_eval("1 + 2 * 3").as_singleton(), Some(&FhirPathValue::Integer(7)));
    }

    #[test]
    fn division_by_zero_is_empty() {
        assert!(engine_eval("4 / 0").is_empty());
        assert!(engine_eval("4 div 0").is_empty());
        assert!(engine_eval("4 mod 0").is_empty());
    }

    #[test]
    fn union_dedups_by_equivalence() {
        let result = engine_eval("('a' | 'b' | 'a')");
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn nested_aggregate_has_independent_total() {
        let result = engine_eval(
            "(1 | 2).aggregate((10 | 20 | 30).aggregate($total + $this, 0) + $total + $this, 0)",
        );
        assert_eq!(result.as_singleton(), Some(&FhirPathValue::Integer(123)));
    }

    #[test]
    fn quantity_multiplication_canonicalises() {
        let result = engine_eval("1 'kg' * 2 'm'");
        match result.as_singleton() {
            Some(FhirPathValue::Quantity(q)) => {
                assert_eq!(q.unit.as_deref(), Some("g.m"));
                assert_eq!(q.value, Decimal::from(2000));
            }
            other => panic!("expected a quantity, got {other:?}"),
        }
    }

    #[test]
    fn hour_equals_3600_seconds() {
        assert_eq!(engine_eval("1 'h' = 3600 's'").as_singleton(), Some(&FhirPathValue::Boolean(true)));
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let engine = FhirPathEngine::new();
        let adapter = JsonResourceAdapter::new(vec![]);
        let result = engine.evaluate("%unknownVar", Collection::empty(), Arc::new(FxHashMap::default()), &adapter);
        assert!(result.is_err());
    }

    #[test]
    fn null_variable_is_empty_not_error() {
        let engine = FhirPathEngine::new();
        let adapter = JsonResourceAdapter::new(vec![]);
        let mut vars = FxHashMap::default();
        vars.insert("nullVar".to_string(), None);
        let result = engine.evaluate("%nullVar", Collection::empty(), Arc::new(vars), &adapter).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn where_filters_by_this() {
        assert_eq!(engine_eval("(10 | 20 | 30).where($this > 15)").len(), 2);
    }
}
