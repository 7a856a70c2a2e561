//! # Evaluator: Remapper Interpretation
//!
//! The evaluator folds a [`Remapper`] tree against input data. Operators are not
//! built in; they come from an [`OperatorTable`] assembled once at startup
//! (see `tessera-std` for the standard library) and shared read-only afterwards.

use crate::context::RemapperContext;
use crate::remap::{RemapError, Remapper};
use ahash::AHashMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A named remapper operator: `(args, data, scope) -> value`.
///
/// `args` is the raw JSON under the operator key. Operators that accept nested
/// remappers evaluate them through [`Scope::evaluate_value`].
pub trait Operator: Send + Sync {
    fn apply(&self, args: &Value, data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError>;
}

impl<F> Operator for F
where
    F: Fn(&Value, &Value, &Scope<'_>) -> Result<Value, RemapError> + Send + Sync,
{
    fn apply(&self, args: &Value, data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
        self(args, data, scope)
    }
}

/// Name-keyed operator registry.
#[derive(Clone, Default)]
pub struct OperatorTable {
    operators: AHashMap<String, Arc<dyn Operator>>,
}

impl OperatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operator, replacing any previous one with the same name.
    pub fn register<O: Operator + 'static>(&mut self, name: impl Into<String>, operator: O) -> &mut Self {
        self.operators.insert(name.into(), Arc::new(operator));
        self
    }

    pub fn with<O: Operator + 'static>(mut self, name: impl Into<String>, operator: O) -> Self {
        self.register(name, operator);
        self
    }

    /// Add every operator of `other`; `other` wins on name clashes.
    pub fn extend(&mut self, other: OperatorTable) {
        self.operators.extend(other.operators);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Operator>> {
        self.operators.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operators.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for OperatorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorTable")
            .field("operators", &self.names())
            .finish()
    }
}

/// Pure remapper evaluator. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    operators: Arc<OperatorTable>,
}

impl Evaluator {
    pub fn new(operators: OperatorTable) -> Self {
        Self {
            operators: Arc::new(operators),
        }
    }

    pub fn operators(&self) -> &OperatorTable {
        &self.operators
    }

    /// Evaluate `remapper` against `data`. `data` also becomes the `root` of the scope.
    pub fn evaluate(
        &self,
        remapper: &Remapper,
        data: &Value,
        context: &RemapperContext,
    ) -> Result<Value, RemapError> {
        Scope::new(self, context, data).evaluate(remapper, data)
    }

    /// Parse and evaluate a raw JSON remapper.
    pub fn evaluate_value(
        &self,
        remapper: &Value,
        data: &Value,
        context: &RemapperContext,
    ) -> Result<Value, RemapError> {
        let remapper = Remapper::parse(remapper)?;
        self.evaluate(&remapper, data, context)
    }
}

/// Position of the current item while an array operator iterates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayFrame {
    pub index: usize,
    pub length: usize,
}

/// Everything an operator may observe besides its arguments and input.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    evaluator: &'a Evaluator,
    context: &'a RemapperContext,
    root: &'a Value,
    array: Option<ArrayFrame>,
}

impl<'a> Scope<'a> {
    pub fn new(evaluator: &'a Evaluator, context: &'a RemapperContext, root: &'a Value) -> Self {
        Self {
            evaluator,
            context,
            root,
            array: None,
        }
    }

    pub fn context(&self) -> &'a RemapperContext {
        self.context
    }

    /// The data the outermost `evaluate` call started from.
    pub fn root(&self) -> &'a Value {
        self.root
    }

    pub fn array(&self) -> Option<ArrayFrame> {
        self.array
    }

    /// A child scope positioned on one item of an array.
    pub fn with_array(&self, index: usize, length: usize) -> Scope<'a> {
        Scope {
            array: Some(ArrayFrame { index, length }),
            ..*self
        }
    }

    pub fn evaluate(&self, remapper: &Remapper, data: &Value) -> Result<Value, RemapError> {
        match remapper {
            Remapper::Literal(value) => Ok(value.clone()),
            Remapper::Pipeline(steps) => {
                let mut current = data.clone();
                for step in steps {
                    current = self.evaluate(step, &current)?;
                }
                Ok(current)
            }
            Remapper::Operator { name, args } => {
                let operator = self
                    .evaluator
                    .operators
                    .get(name)
                    .ok_or_else(|| RemapError::UnknownOperator(name.clone()))?;
                operator.apply(args, data, self)
            }
        }
    }

    pub fn evaluate_value(&self, remapper: &Value, data: &Value) -> Result<Value, RemapError> {
        let remapper = Remapper::parse(remapper)?;
        self.evaluate(&remapper, data)
    }
}

/// JSON-script truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
