//! Docmatch - predicate matching for document queries.
//!
//! Docmatch decides whether a data document satisfies a query document
//! written in the same tree shape. It is the filtering primitive beneath a
//! document store's find, update and remove operations. It supports:
//!
//! - Structural matching: scalar equality, nested documents, array search
//! - Comparison operators: `$gt`, `$gte`, `$lt`, `$lte`, `$ne`
//! - Presence and sets: `$exists`, `$in`, `$nin`
//! - Logical composition: `$and`, `$or`
//! - Regular expression patterns as query values
//! - Custom operators registered on a [`Matcher`]
//!
//! # Quick Start
//!
//! ```rust
//! use docmatch::Value;
//! use serde_json::json;
//!
//! let data = Value::from(json!({
//!     "name": "Ada",
//!     "age": 36,
//!     "tags": ["math", "code"],
//! }));
//!
//! let query = Value::from(json!({
//!     "age": { "$gte": 30 },
//!     "tags": "code",
//!     "$or": [{ "name": "Ada" }, { "name": "Grace" }],
//! }));
//!
//! assert!(docmatch::matches(&data, &query).unwrap());
//! ```
//!
//! # Matching Semantics
//!
//! Every field of a query must match (implicit AND). A field whose key is a
//! registered operator is evaluated by that operator against the current
//! data node; any other key names a child field of the data:
//!
//! - **Scalar** query values require strict equality, or, when the data
//!   field is an array, an element that matches (containment)
//! - **Documents** recurse; against an array field they search the elements
//! - **Arrays** against a non-array field mean "one of"
//! - **Patterns** match the string form of the data field
//!
//! Absent fields and `null` fields are different: only `$exists` can
//! succeed against an absent field.
//!
//! # Operators
//!
//! | Operator | Matches when |
//! |----------|--------------|
//! | `$gt`, `$gte`, `$lt`, `$lte` | data orders against the argument (same type only) |
//! | `$exists` | presence equals the argument's truthiness |
//! | `$ne` | data is not loosely equal to the argument |
//! | `$in`, `$nin` | data is (not) strictly equal to an element of the array argument |
//! | `$or`, `$and` | any / every sub-query matches |
//!
//! `$in` and `$nin` fail with [`MatchError::InvalidOperatorArgument`] when
//! their argument is not an array. Other malformed operator arguments simply
//! do not match.

mod error;
mod filter;
mod json;
mod matcher;
mod op;
mod options;
mod value;

use once_cell::sync::Lazy;

// Re-export public API
pub use error::{MatchError, Result};
pub use matcher::{MatchContext, MatchMode, Matcher};
pub use op::{Op, OpHandler, OpResult, OperatorTable, SIGIL};
pub use options::MatchOptions;
pub use value::{Document, Number, Pattern, Value};

static DEFAULT_MATCHER: Lazy<Matcher> = Lazy::new(Matcher::new);

/// Tests whether `data` satisfies `query` using the built-in operators.
pub fn matches(data: &Value, query: &Value) -> Result<bool> {
    DEFAULT_MATCHER.matches(data, query)
}

/// Tests whether `data` satisfies `query` under an explicit [`MatchMode`].
///
/// Pass `None` as `data` to match against an absent value.
pub fn matches_with_mode(data: Option<&Value>, query: &Value, mode: MatchMode) -> Result<bool> {
    DEFAULT_MATCHER.matches_with_mode(data, query, mode)
}
