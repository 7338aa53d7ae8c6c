//! Query operators and their dispatch table.
//!
//! An operator is a query key starting with [`SIGIL`]. The [`OperatorTable`]
//! maps operator keys to handler functions; evaluating a key yields an
//! [`OpResult`], which tells the matcher whether the operator matched,
//! failed, or whether the key was not an operator at all and should be
//! matched structurally instead.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use tracing::{debug, trace};

use crate::error::{MatchError, Result};
use crate::matcher::{MatchContext, MatchMode};
use crate::value::Value;

/// Prefix reserved for operator keys.
pub const SIGIL: char = '$';

/// Outcome of evaluating a single query key as an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpResult {
    /// The key is an operator and the data satisfies it.
    Matched,
    /// The key is an operator and the data does not satisfy it.
    Unmatched,
    /// The key is not a registered operator.
    NotAnOperator,
}

impl From<bool> for OpResult {
    fn from(matched: bool) -> Self {
        if matched {
            OpResult::Matched
        } else {
            OpResult::Unmatched
        }
    }
}

/// Built-in operators.
///
/// Operators are grouped by what they inspect:
/// - **Ordering**: `Gt`, `Gte`, `Lt`, `Lte`
/// - **Presence**: `Exists`
/// - **Equality**: `Ne`
/// - **Logical**: `Or`, `And` - recurse into the matcher with each branch
/// - **Set**: `In`, `Nin` - require an array argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Field is present (`true`) or absent (`false`).
    Exists,
    /// Not equal, with type coercion.
    Ne,
    /// At least one sub-query matches.
    Or,
    /// Every sub-query matches.
    And,
    /// Value is one of the given set.
    In,
    /// Value is none of the given set.
    Nin,
}

impl Op {
    /// Every built-in operator.
    pub const ALL: [Op; 10] = [
        Op::Gt,
        Op::Gte,
        Op::Lt,
        Op::Lte,
        Op::Exists,
        Op::Ne,
        Op::Or,
        Op::And,
        Op::In,
        Op::Nin,
    ];

    /// Returns the query key of this operator, including the sigil.
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Gt => "$gt",
            Op::Gte => "$gte",
            Op::Lt => "$lt",
            Op::Lte => "$lte",
            Op::Exists => "$exists",
            Op::Ne => "$ne",
            Op::Or => "$or",
            Op::And => "$and",
            Op::In => "$in",
            Op::Nin => "$nin",
        }
    }

    /// Parses a query key into a built-in operator.
    pub fn from_key(key: &str) -> Option<Op> {
        Op::ALL.into_iter().find(|op| op.as_str() == key)
    }

    /// Evaluates an ordering operator given the ordering of data to argument.
    pub fn eval_ordering(self, ordering: Ordering) -> bool {
        match self {
            Op::Gt => ordering == Ordering::Greater,
            Op::Gte => ordering != Ordering::Less,
            Op::Lt => ordering == Ordering::Less,
            Op::Lte => ordering != Ordering::Greater,
            _ => false, // Not an ordering-based operator
        }
    }

    /// Returns the handler implementing this operator.
    pub fn handler(self) -> OpHandler {
        match self {
            Op::Gt => greater_than,
            Op::Gte => greater_or_equal,
            Op::Lt => less_than,
            Op::Lte => less_or_equal,
            Op::Exists => exists,
            Op::Ne => not_equal,
            Op::Or => any_branch,
            Op::And => every_branch,
            Op::In => in_set,
            Op::Nin => not_in_set,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signature of an operator implementation.
///
/// Receives the evaluation context (for recursing into sub-queries), the
/// data node the operator applies to (`None` when absent) and the
/// operator's argument from the query.
pub type OpHandler = fn(&MatchContext<'_>, Option<&Value>, &Value) -> Result<bool>;

/// Lookup table from operator key to handler.
///
/// The default table holds every built-in [`Op`]. Additional operators can
/// be registered under any `$`-prefixed key.
#[derive(Clone)]
pub struct OperatorTable {
    handlers: HashMap<String, OpHandler>,
}

impl OperatorTable {
    /// Creates a table with no operators; every key matches structurally.
    pub fn empty() -> Self {
        OperatorTable {
            handlers: HashMap::new(),
        }
    }

    /// Creates a table with every built-in operator.
    pub fn builtin() -> Self {
        let handlers = Op::ALL
            .into_iter()
            .map(|op| (op.as_str().to_string(), op.handler()))
            .collect();
        OperatorTable { handlers }
    }

    /// Registers a handler, returning the one it replaced.
    ///
    /// Keys without the sigil are never consulted by the matcher.
    pub fn register(&mut self, key: impl Into<String>, handler: OpHandler) -> Option<OpHandler> {
        self.handlers.insert(key.into(), handler)
    }

    /// Removes an operator so its key matches structurally.
    pub fn remove(&mut self, key: &str) -> Option<OpHandler> {
        self.handlers.remove(key)
    }

    /// Returns `true` if `key` is a registered operator.
    pub fn contains(&self, key: &str) -> bool {
        self.handlers.contains_key(key)
    }

    /// Returns the registered keys in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Evaluates `key` as an operator against `data`.
    pub fn evaluate(
        &self,
        ctx: &MatchContext<'_>,
        key: &str,
        data: Option<&Value>,
        arg: &Value,
    ) -> Result<OpResult> {
        if !key.starts_with(SIGIL) {
            return Ok(OpResult::NotAnOperator);
        }

        let Some(handler) = self.handlers.get(key) else {
            trace!(key, "unregistered operator key, matching structurally");
            return Ok(OpResult::NotAnOperator);
        };

        let result = OpResult::from(handler(ctx, data, arg)?);
        trace!(key, ?result, depth = ctx.depth(), "evaluated operator");
        Ok(result)
    }
}

impl Default for OperatorTable {
    fn default() -> Self {
        OperatorTable::builtin()
    }
}

impl fmt::Debug for OperatorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorTable")
            .field("operators", &self.keys())
            .finish()
    }
}

// ============================================================================
// Built-in handlers
// ============================================================================

fn ordered(op: Op, data: Option<&Value>, arg: &Value) -> bool {
    data.and_then(|value| value.compare(arg))
        .is_some_and(|ordering| op.eval_ordering(ordering))
}

fn greater_than(_: &MatchContext<'_>, data: Option<&Value>, arg: &Value) -> Result<bool> {
    Ok(ordered(Op::Gt, data, arg))
}

fn greater_or_equal(_: &MatchContext<'_>, data: Option<&Value>, arg: &Value) -> Result<bool> {
    Ok(ordered(Op::Gte, data, arg))
}

fn less_than(_: &MatchContext<'_>, data: Option<&Value>, arg: &Value) -> Result<bool> {
    Ok(ordered(Op::Lt, data, arg))
}

fn less_or_equal(_: &MatchContext<'_>, data: Option<&Value>, arg: &Value) -> Result<bool> {
    Ok(ordered(Op::Lte, data, arg))
}

fn exists(_: &MatchContext<'_>, data: Option<&Value>, arg: &Value) -> Result<bool> {
    Ok(data.is_none() != arg.is_truthy())
}

fn not_equal(_: &MatchContext<'_>, data: Option<&Value>, arg: &Value) -> Result<bool> {
    // Absent data is loosely equal to null only.
    let equal = match data {
        Some(value) => value.loosely_equals(arg),
        None => arg.is_null(),
    };
    Ok(!equal)
}

fn any_branch(ctx: &MatchContext<'_>, data: Option<&Value>, arg: &Value) -> Result<bool> {
    let Some(branches) = arg.as_array() else {
        return Ok(false);
    };
    for branch in branches {
        if ctx.matches(data, branch, MatchMode::And)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn every_branch(ctx: &MatchContext<'_>, data: Option<&Value>, arg: &Value) -> Result<bool> {
    let Some(branches) = arg.as_array() else {
        return Ok(false);
    };
    for branch in branches {
        if !ctx.matches(data, branch, MatchMode::And)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn set_argument(op: Op, arg: &Value) -> Result<&[Value]> {
    arg.as_array().ok_or_else(|| {
        debug!(op = op.as_str(), found = arg.type_name(), "set operator given a non-array");
        MatchError::InvalidOperatorArgument {
            op: op.as_str(),
            found: arg.type_name(),
        }
    })
}

fn in_set(_: &MatchContext<'_>, data: Option<&Value>, arg: &Value) -> Result<bool> {
    let set = set_argument(Op::In, arg)?;
    Ok(data.is_some_and(|value| set.iter().any(|item| value.strictly_equals(item))))
}

fn not_in_set(_: &MatchContext<'_>, data: Option<&Value>, arg: &Value) -> Result<bool> {
    let set = set_argument(Op::Nin, arg)?;
    Ok(!data.is_some_and(|value| set.iter().any(|item| value.strictly_equals(item))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::Matcher;

    fn eval(key: &str, data: Option<&Value>, arg: &Value) -> Result<OpResult> {
        let matcher = Matcher::new();
        let ctx = MatchContext::new(&matcher);
        matcher.operators().evaluate(&ctx, key, data, arg)
    }

    fn list(items: &[i64]) -> Value {
        Value::from(items.to_vec())
    }

    #[test]
    fn op_keys_round_trip() {
        for op in Op::ALL {
            assert_eq!(Op::from_key(op.as_str()), Some(op));
        }
        assert_eq!(Op::from_key("$regex"), None);
        assert_eq!(Op::from_key("gt"), None);
    }

    #[test]
    fn op_display() {
        assert_eq!(Op::Gte.to_string(), "$gte");
        assert_eq!(Op::Nin.to_string(), "$nin");
    }

    #[test]
    fn op_eval_ordering() {
        assert!(Op::Gt.eval_ordering(Ordering::Greater));
        assert!(!Op::Gt.eval_ordering(Ordering::Equal));
        assert!(Op::Gte.eval_ordering(Ordering::Equal));
        assert!(!Op::Gte.eval_ordering(Ordering::Less));
        assert!(Op::Lt.eval_ordering(Ordering::Less));
        assert!(!Op::Lt.eval_ordering(Ordering::Equal));
        assert!(Op::Lte.eval_ordering(Ordering::Equal));
        assert!(!Op::Lte.eval_ordering(Ordering::Greater));
        assert!(!Op::In.eval_ordering(Ordering::Equal));
    }

    #[test]
    fn ordering_operators() {
        let five = Value::from(5);
        assert_eq!(eval("$gt", Some(&five), &Value::from(3)).unwrap(), OpResult::Matched);
        assert_eq!(eval("$gte", Some(&five), &Value::from(5)).unwrap(), OpResult::Matched);
        assert_eq!(eval("$lt", Some(&five), &Value::from(5)).unwrap(), OpResult::Unmatched);
        assert_eq!(eval("$lte", Some(&five), &Value::from(3)).unwrap(), OpResult::Unmatched);

        // Absent data and mismatched types never order
        assert_eq!(eval("$gt", None, &Value::from(3)).unwrap(), OpResult::Unmatched);
        assert_eq!(
            eval("$gt", Some(&five), &Value::from("3")).unwrap(),
            OpResult::Unmatched
        );
    }

    #[test]
    fn exists_operator() {
        let one = Value::from(1);
        assert_eq!(eval("$exists", None, &Value::from(false)).unwrap(), OpResult::Matched);
        assert_eq!(eval("$exists", None, &Value::from(true)).unwrap(), OpResult::Unmatched);
        assert_eq!(eval("$exists", Some(&one), &Value::from(true)).unwrap(), OpResult::Matched);
        assert_eq!(
            eval("$exists", Some(&Value::Null), &Value::from(false)).unwrap(),
            OpResult::Unmatched
        );
    }

    #[test]
    fn not_equal_coerces() {
        let five = Value::from(5);
        assert_eq!(eval("$ne", Some(&five), &Value::from("5")).unwrap(), OpResult::Unmatched);
        assert_eq!(eval("$ne", Some(&five), &Value::from(6)).unwrap(), OpResult::Matched);
        assert_eq!(eval("$ne", None, &Value::Null).unwrap(), OpResult::Unmatched);
        assert_eq!(eval("$ne", None, &Value::from(1)).unwrap(), OpResult::Matched);
    }

    #[test]
    fn set_operators() {
        let two = Value::from(2);
        assert_eq!(eval("$in", Some(&two), &list(&[1, 2, 3])).unwrap(), OpResult::Matched);
        assert_eq!(eval("$nin", Some(&two), &list(&[1, 2, 3])).unwrap(), OpResult::Unmatched);
        assert_eq!(eval("$in", None, &list(&[1])).unwrap(), OpResult::Unmatched);
        assert_eq!(eval("$nin", None, &list(&[1])).unwrap(), OpResult::Matched);

        // Strict membership: no string/number coercion
        assert_eq!(
            eval("$in", Some(&Value::from("2")), &list(&[1, 2])).unwrap(),
            OpResult::Unmatched
        );
    }

    #[test]
    fn set_operators_reject_non_arrays() {
        let err = eval("$in", Some(&Value::from(1)), &Value::from(1)).unwrap_err();
        assert!(matches!(
            err,
            MatchError::InvalidOperatorArgument { op: "$in", found: "number" }
        ));

        let err = eval("$nin", None, &Value::from("abc")).unwrap_err();
        assert!(matches!(
            err,
            MatchError::InvalidOperatorArgument { op: "$nin", found: "string" }
        ));
    }

    #[test]
    fn unknown_keys_are_not_operators() {
        let one = Value::from(1);
        assert_eq!(eval("$regex", Some(&one), &one).unwrap(), OpResult::NotAnOperator);
        assert_eq!(eval("gt", Some(&one), &one).unwrap(), OpResult::NotAnOperator);
    }

    #[test]
    fn malformed_logical_arguments_do_not_match() {
        let one = Value::from(1);
        assert_eq!(eval("$or", Some(&one), &one).unwrap(), OpResult::Unmatched);
        assert_eq!(eval("$and", Some(&one), &one).unwrap(), OpResult::Unmatched);
    }

    #[test]
    fn table_registration() {
        fn always(_: &MatchContext<'_>, _: Option<&Value>, _: &Value) -> Result<bool> {
            Ok(true)
        }

        let mut table = OperatorTable::empty();
        assert!(table.keys().is_empty());
        assert!(table.register("$always", always).is_none());
        assert!(table.contains("$always"));
        assert!(table.register("$always", always).is_some());
        assert!(table.remove("$always").is_some());
        assert!(!table.contains("$always"));

        let builtin = OperatorTable::builtin();
        assert_eq!(builtin.keys().len(), Op::ALL.len());
        assert_eq!(builtin.keys()[0], "$and");
    }
}
