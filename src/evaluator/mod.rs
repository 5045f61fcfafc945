//! The tree-walking evaluator: context, engine, operator semantics, and the
//! resource adapter boundary.

mod context;
mod engine;
mod operators;
mod resource;

pub use context::{Context, Variables};
pub use engine::{EvaluationConfig, FhirPathEngine};
pub use resource::{JsonResourceAdapter, ResourceAdapter};

pub(crate) use engine::{
    element_type_name, option_bool_to_collection, singleton_operand, to_kleene_bool, union_dedup, Evaluator,
};
pub(crate) use operators as ops;
