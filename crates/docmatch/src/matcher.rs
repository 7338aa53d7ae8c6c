//! Recursive predicate matching.
//!
//! [`Matcher`] walks a query against a data value. Each query field is first
//! offered to the [`OperatorTable`]; keys that are not operators are matched
//! structurally:
//!
//! | Query field | Data field | Rule |
//! |-------------|------------|------|
//! | pattern | string form | pattern must match; data must be a document or array |
//! | document or array | array (query not an array) | any element matches |
//! | array | not an array | data matches any alternative |
//! | document or array | other | recurse |
//! | document with a registered `$exists` | absent | recurse on absent data |
//! | scalar | scalar | strict equality |
//! | scalar | array | any element matches (containment) |
//!
//! Fields combine with AND. A [`MatchMode`] only decides when evaluation may
//! stop early.

use std::borrow::Cow;

use tracing::debug;

use crate::error::{MatchError, Result};
use crate::op::{Op, OpHandler, OpResult, OperatorTable};
use crate::options::MatchOptions;
use crate::value::{Document, Value};

/// Short-circuit discipline for a match call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatchMode {
    /// Evaluate every field and AND the results.
    #[default]
    None,
    /// Stop with no match at the first failing field.
    And,
    /// Stop with a match at the first succeeding field.
    Or,
}

impl MatchMode {
    /// Returns the display name of this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            MatchMode::None => "none",
            MatchMode::And => "and",
            MatchMode::Or => "or",
        }
    }
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A configured predicate matcher.
///
/// # Example
///
/// ```
/// use docmatch::{Matcher, Value};
/// use serde_json::json;
///
/// let matcher = Matcher::new().max_depth(32);
///
/// let data = Value::from(json!({ "name": "Ada", "tags": ["math", "code"] }));
/// let query = Value::from(json!({ "tags": "code", "name": { "$exists": true } }));
///
/// assert!(matcher.matches(&data, &query).unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    options: MatchOptions,
    operators: OperatorTable,
}

impl Matcher {
    /// Creates a matcher with the built-in operators and default options.
    pub fn new() -> Self {
        Matcher::default()
    }

    /// Creates a matcher with the built-in operators and the given options.
    pub fn with_options(options: MatchOptions) -> Self {
        Matcher {
            options,
            operators: OperatorTable::builtin(),
        }
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Sets the maximum recursion depth.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.options.max_depth = max_depth;
        self
    }

    /// Registers an operator handler under `key`, replacing any existing one.
    pub fn operator(mut self, key: impl Into<String>, handler: OpHandler) -> Self {
        self.operators.register(key, handler);
        self
    }

    /// Unregisters an operator so its key is matched as a plain field name.
    pub fn without_operator(mut self, key: &str) -> Self {
        self.operators.remove(key);
        self
    }

    /// Returns the matcher's options.
    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// Returns the operator table.
    pub fn operators(&self) -> &OperatorTable {
        &self.operators
    }

    // ========================================================================
    // Matching
    // ========================================================================

    /// Tests whether `data` satisfies `query`.
    ///
    /// Every field of the query is evaluated; the result is their
    /// conjunction.
    pub fn matches(&self, data: &Value, query: &Value) -> Result<bool> {
        self.matches_with_mode(Some(data), query, MatchMode::None)
    }

    /// Tests whether `data` satisfies `query` under an explicit mode.
    ///
    /// `data` is `None` when matching against an absent field.
    pub fn matches_with_mode(
        &self,
        data: Option<&Value>,
        query: &Value,
        mode: MatchMode,
    ) -> Result<bool> {
        MatchContext::new(self).evaluate(data, query, mode)
    }
}

/// State of one in-progress match, handed to operator handlers.
///
/// Handlers that evaluate sub-queries call [`MatchContext::matches`], which
/// recurses one level deeper under the same matcher.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'m> {
    matcher: &'m Matcher,
    depth: usize,
}

impl<'m> MatchContext<'m> {
    pub(crate) fn new(matcher: &'m Matcher) -> Self {
        MatchContext { matcher, depth: 0 }
    }

    /// The matcher driving this evaluation.
    pub fn matcher(&self) -> &'m Matcher {
        self.matcher
    }

    /// Current recursion depth; the top-level call is depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Matches `data` against a sub-query one level deeper.
    pub fn matches(&self, data: Option<&Value>, query: &Value, mode: MatchMode) -> Result<bool> {
        let limit = self.matcher.options.max_depth;
        if self.depth >= limit {
            debug!(limit, "query nesting exceeds the maximum depth");
            return Err(MatchError::DepthExceeded { limit });
        }

        let nested = MatchContext {
            matcher: self.matcher,
            depth: self.depth + 1,
        };
        nested.evaluate(data, query, mode)
    }

    fn evaluate(&self, data: Option<&Value>, query: &Value, mode: MatchMode) -> Result<bool> {
        // Strings and numbers on both sides compare directly
        if let Some(value) = data {
            if value.is_flat() && query.is_flat() {
                return Ok(value.strictly_equals(query));
            }
        }

        match query {
            Value::Document(fields) => self.match_fields(data, document_fields(fields), mode),
            Value::Array(items) => self.match_fields(data, indexed_fields(items), mode),
            Value::Pattern(pattern) => Ok(data
                .and_then(Value::string_form)
                .is_some_and(|text| pattern.is_match(&text))),
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                Ok(data.is_some_and(|value| value.strictly_equals(query)))
            }
        }
    }

    fn match_fields<'q>(
        &self,
        data: Option<&Value>,
        fields: impl Iterator<Item = (Cow<'q, str>, &'q Value)>,
        mode: MatchMode,
    ) -> Result<bool> {
        let mut matched_all = true;

        for (key, expected) in fields {
            if self.match_field(data, &key, expected, mode)? {
                if mode == MatchMode::Or {
                    return Ok(true);
                }
            } else {
                matched_all = false;
            }

            if mode == MatchMode::And && !matched_all {
                return Ok(false);
            }
        }

        Ok(matched_all)
    }

    fn match_field(
        &self,
        data: Option<&Value>,
        key: &str,
        expected: &Value,
        mode: MatchMode,
    ) -> Result<bool> {
        match self.matcher.operators.evaluate(self, key, data, expected)? {
            OpResult::Matched => return Ok(true),
            OpResult::Unmatched => return Ok(false),
            OpResult::NotAnOperator => {}
        }

        let actual = data.and_then(|value| value.field(key));

        match expected {
            Value::Pattern(pattern) => {
                let indexable = data.is_some_and(|value| value.is_document() || value.is_array());
                Ok(indexable
                    && actual
                        .and_then(Value::string_form)
                        .is_some_and(|text| pattern.is_match(&text)))
            }
            Value::Document(_) | Value::Array(_) => self.match_nested(actual, expected, mode),
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                self.match_scalar(actual, expected, mode)
            }
        }
    }

    fn match_nested(
        &self,
        actual: Option<&Value>,
        expected: &Value,
        mode: MatchMode,
    ) -> Result<bool> {
        let Some(actual) = actual else {
            // Only an existence check can succeed against a missing field
            let exists = Op::Exists.as_str();
            return match expected {
                Value::Document(fields)
                    if fields.contains_key(exists) && self.matcher.operators.contains(exists) =>
                {
                    self.matches(None, expected, mode)
                }
                _ => Ok(false),
            };
        };

        match (actual, expected) {
            (Value::Array(items), query) if !query.is_array() => {
                self.any_matches(items, query, mode)
            }
            (value, Value::Array(alternatives)) if !value.is_array() => {
                for alternative in alternatives {
                    if self.matches(Some(value), alternative, mode)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            _ => self.matches(Some(actual), expected, mode),
        }
    }

    fn match_scalar(
        &self,
        actual: Option<&Value>,
        expected: &Value,
        mode: MatchMode,
    ) -> Result<bool> {
        match actual {
            Some(value) if value.strictly_equals(expected) => Ok(true),
            Some(Value::Array(items)) => self.any_matches(items, expected, mode),
            _ => Ok(false),
        }
    }

    fn any_matches(&self, items: &[Value], query: &Value, mode: MatchMode) -> Result<bool> {
        for item in items {
            if self.matches(Some(item), query, mode)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn document_fields(fields: &Document) -> impl Iterator<Item = (Cow<'_, str>, &Value)> {
    fields
        .iter()
        .map(|(key, value)| (Cow::Borrowed(key.as_str()), value))
}

fn indexed_fields(items: &[Value]) -> impl Iterator<Item = (Cow<'_, str>, &Value)> {
    items
        .iter()
        .enumerate()
        .map(|(index, value)| (Cow::Owned(index.to_string()), value))
}
