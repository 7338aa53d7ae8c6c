//! Collection helpers.
//!
//! These run one query over a slice of documents, the way a find, count or
//! remove operation in a store would. Items only need to borrow as a
//! [`Value`], so both `Vec<Value>` and wrapper types work. The first error
//! stops iteration and is returned.

use std::borrow::Borrow;

use crate::error::Result;
use crate::matcher::Matcher;
use crate::value::Value;

impl Matcher {
    /// Returns references to the matching items, in their original order.
    pub fn filter<'a, T>(&self, items: &'a [T], query: &Value) -> Result<Vec<&'a T>>
    where
        T: Borrow<Value>,
    {
        let mut results = Vec::new();
        for item in items {
            if self.matches(item.borrow(), query)? {
                results.push(item);
            }
        }
        Ok(results)
    }

    /// Filters and clones matching items.
    pub fn filter_cloned<T>(&self, items: &[T], query: &Value) -> Result<Vec<T>>
    where
        T: Borrow<Value> + Clone,
    {
        Ok(self.filter(items, query)?.into_iter().cloned().collect())
    }

    /// Keeps only the matching items, returning how many were removed.
    ///
    /// On error the vector is left untouched.
    pub fn filter_mut<T>(&self, items: &mut Vec<T>, query: &Value) -> Result<usize>
    where
        T: Borrow<Value>,
    {
        let keep = items
            .iter()
            .map(|item| self.matches(item.borrow(), query))
            .collect::<Result<Vec<bool>>>()?;

        let before = items.len();
        let mut flags = keep.into_iter();
        items.retain(|_| flags.next().unwrap_or(false));
        Ok(before - items.len())
    }

    /// Counts the matching items.
    pub fn count<T>(&self, items: &[T], query: &Value) -> Result<usize>
    where
        T: Borrow<Value>,
    {
        let mut count = 0;
        for item in items {
            if self.matches(item.borrow(), query)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Returns `true` if any item matches.
    pub fn any<T>(&self, items: &[T], query: &Value) -> Result<bool>
    where
        T: Borrow<Value>,
    {
        Ok(self.position(items, query)?.is_some())
    }

    /// Returns `true` if every item matches.
    pub fn all<T>(&self, items: &[T], query: &Value) -> Result<bool>
    where
        T: Borrow<Value>,
    {
        for item in items {
            if !self.matches(item.borrow(), query)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Finds the first matching item.
    pub fn find<'a, T>(&self, items: &'a [T], query: &Value) -> Result<Option<&'a T>>
    where
        T: Borrow<Value>,
    {
        Ok(self.position(items, query)?.map(|index| &items[index]))
    }

    /// Finds the index of the first matching item.
    pub fn position<T>(&self, items: &[T], query: &Value) -> Result<Option<usize>>
    where
        T: Borrow<Value>,
    {
        for (index, item) in items.iter().enumerate() {
            if self.matches(item.borrow(), query)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn people() -> Vec<Value> {
        [
            json!({"name": "Ada", "age": 36, "tags": ["math", "code"]}),
            json!({"name": "Grace", "age": 85, "tags": ["navy", "code"]}),
            json!({"name": "Alan", "age": 41}),
            json!({"name": "Edsger", "age": 72, "tags": []}),
        ]
        .into_iter()
        .map(Value::from)
        .collect()
    }

    fn query(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn empty_query_matches_all() {
        let items = people();
        let results = Matcher::new().filter(&items, &query(json!({}))).unwrap();
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn filter_keeps_order() {
        let items = people();
        let results = Matcher::new()
            .filter(&items, &query(json!({"tags": "code"})))
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].field("name"), Some(&Value::from("Ada")));
        assert_eq!(results[1].field("name"), Some(&Value::from("Grace")));
    }

    #[test]
    fn filter_cloned() {
        let items = people();
        let results = Matcher::new()
            .filter_cloned(&items, &query(json!({"age": {"$gt": 70}})))
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn filter_mut() {
        let mut items = people();
        let removed = Matcher::new()
            .filter_mut(&mut items, &query(json!({"tags": {"$exists": true}})))
            .unwrap();
        // An empty array has no element to satisfy the `$exists` check
        assert_eq!(removed, 2);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn filter_mut_leaves_items_on_error() {
        let mut items = people();
        let result = Matcher::new().filter_mut(&mut items, &query(json!({"age": {"$in": 1}})));
        assert!(result.is_err());
        assert_eq!(items.len(), 4);
    }

    #[test]
    fn count() {
        let items = people();
        let count = Matcher::new()
            .count(&items, &query(json!({"age": {"$lt": 50}})))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn any_and_all() {
        let items = people();
        let matcher = Matcher::new();

        let old = query(json!({"age": {"$gte": 80}}));
        assert!(matcher.any(&items, &old).unwrap());
        assert!(!matcher.all(&items, &old).unwrap());

        let named = query(json!({"name": {"$exists": true}}));
        assert!(matcher.all(&items, &named).unwrap());
    }

    #[test]
    fn find_and_position() {
        let items = people();
        let matcher = Matcher::new();

        let alan = query(json!({"name": "Alan"}));
        assert_eq!(matcher.position(&items, &alan).unwrap(), Some(2));
        assert_eq!(
            matcher.find(&items, &alan).unwrap().and_then(|p| p.field("age")),
            Some(&Value::from(41))
        );

        let nobody = query(json!({"name": "Linus"}));
        assert!(matcher.find(&items, &nobody).unwrap().is_none());
    }

    #[test]
    fn errors_propagate() {
        let items = people();
        let bad = query(json!({"name": {"$nin": "Ada"}}));
        assert!(Matcher::new().count(&items, &bad).is_err());
    }
}
