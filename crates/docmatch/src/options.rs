//! Matcher configuration.

use serde::{Deserialize, Serialize};

/// Tunable limits for a [`Matcher`](crate::Matcher).
///
/// Options deserialize from any serde format; missing fields take their
/// defaults, so an empty table yields `MatchOptions::default()`.
///
/// ```
/// use docmatch::{MatchOptions, Matcher};
///
/// let options: MatchOptions = serde_json::from_str(r#"{ "max_depth": 16 }"#).unwrap();
/// let matcher = Matcher::with_options(options);
/// assert_eq!(matcher.options().max_depth, 16);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    /// Deepest sub-query the matcher will descend into.
    pub max_depth: usize,
}

impl MatchOptions {
    /// Default recursion limit.
    pub const DEFAULT_MAX_DEPTH: usize = 128;

    /// Creates options with default values.
    pub fn new() -> Self {
        MatchOptions::default()
    }

    /// Sets the recursion limit.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for MatchOptions {
    fn default() -> Self {
        MatchOptions {
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}
