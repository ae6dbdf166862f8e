//! Structural diff of declarations
//!
//! Declarations are compared through their serialized JSON form, so nested
//! values are deep-compared and a missing field equals an explicit `null`.

use crate::types::{Decision, Fields, KindRules};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Decide what a change from `olds` to `news` requires under `rules`
///
/// Replacement triggers are checked first; any difference there wins over
/// simultaneous update-eligible changes.
pub fn decide<T: Serialize>(rules: &KindRules, news: &T, olds: &T) -> Option<Decision> {
    let news = to_map(news);
    let olds = to_map(olds);

    if differs(&rules.replace_on, &news, &olds) {
        return Some(Decision::Replace);
    }
    if differs(&rules.update_on, &news, &olds) {
        return Some(Decision::Update);
    }
    None
}

/// Names of all declared fields that differ, sorted
pub fn changed_fields<T: Serialize>(news: &T, olds: &T) -> Vec<String> {
    let news = to_map(news);
    let olds = to_map(olds);
    all_keys(&news, &olds)
        .into_iter()
        .filter(|key| field(&news, key) != field(&olds, key))
        .collect()
}

/// The stable-field subset of an output, used as its structural identity
pub fn stable_identity<T: Serialize>(output: &T, fields: &[&str]) -> Map<String, Value> {
    let output = to_map(output);
    fields
        .iter()
        .map(|name| ((*name).to_string(), field(&output, name).clone()))
        .collect()
}

fn differs(fields: &Fields, news: &Map<String, Value>, olds: &Map<String, Value>) -> bool {
    match fields {
        Fields::None => false,
        Fields::All => all_keys(news, olds)
            .iter()
            .any(|key| field(news, key) != field(olds, key)),
        Fields::Only(names) => names.iter().any(|key| field(news, key) != field(olds, key)),
    }
}

fn all_keys(a: &Map<String, Value>, b: &Map<String, Value>) -> BTreeSet<String> {
    a.keys().chain(b.keys()).cloned().collect()
}

fn field<'a>(map: &'a Map<String, Value>, key: &str) -> &'a Value {
    map.get(key).unwrap_or(&Value::Null)
}

fn to_map<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeleteStrategy;
    use serde_json::json;

    const RULES: KindRules = KindRules {
        replace_on: Fields::Only(&["type", "api_slug"]),
        update_on: Fields::Only(&["title", "config"]),
        delete: DeleteStrategy::Hard,
    };

    #[test]
    fn test_identical_is_no_decision() {
        let x = json!({ "type": "select", "title": "Stage" });
        assert_eq!(decide(&RULES, &x, &x), None);
    }

    #[test]
    fn test_replace_wins_over_update() {
        let olds = json!({ "type": "select", "title": "Old" });
        let news = json!({ "type": "status", "title": "New" });
        assert_eq!(decide(&RULES, &news, &olds), Some(Decision::Replace));
    }

    #[test]
    fn test_update_only() {
        let olds = json!({ "type": "select", "title": "Old" });
        let news = json!({ "type": "select", "title": "New" });
        assert_eq!(decide(&RULES, &news, &olds), Some(Decision::Update));
    }

    #[test]
    fn test_unlisted_fields_ignored() {
        let olds = json!({ "type": "select", "note": "a" });
        let news = json!({ "type": "select", "note": "b" });
        assert_eq!(decide(&RULES, &news, &olds), None);
    }

    #[test]
    fn test_missing_equals_null() {
        let olds = json!({ "type": "select" });
        let news = json!({ "type": "select", "api_slug": null });
        assert_eq!(decide(&RULES, &news, &olds), None);
    }

    #[test]
    fn test_nested_values_deep_compared() {
        let olds = json!({ "config": { "currency": { "code": "EUR" } } });
        let same = json!({ "config": { "currency": { "code": "EUR" } } });
        let news = json!({ "config": { "currency": { "code": "USD" } } });
        assert_eq!(decide(&RULES, &same, &olds), None);
        assert_eq!(decide(&RULES, &news, &olds), Some(Decision::Update));
    }

    #[test]
    fn test_all_fields_rule() {
        let rules = KindRules {
            replace_on: Fields::All,
            update_on: Fields::None,
            delete: DeleteStrategy::Hard,
        };
        let olds = json!({ "title": "a", "content": "x" });
        let news = json!({ "title": "a", "content": "y" });
        assert_eq!(decide(&rules, &news, &olds), Some(Decision::Replace));

        let extra = json!({ "title": "a", "content": "x", "format": "markdown" });
        assert_eq!(decide(&rules, &extra, &olds), Some(Decision::Replace));
    }

    #[test]
    fn test_changed_fields_sorted() {
        let olds = json!({ "b": 1, "a": 1, "c": 1 });
        let news = json!({ "b": 2, "a": 2, "c": 1 });
        assert_eq!(changed_fields(&news, &olds), vec!["a", "b"]);
    }

    #[test]
    fn test_stable_identity_selects_fields() {
        let output = json!({ "id": "x", "slug": "deals", "title": "Deals" });
        let identity = stable_identity(&output, &["id", "slug", "missing"]);
        assert_eq!(
            Value::Object(identity),
            json!({ "id": "x", "slug": "deals", "missing": null })
        );
    }
}
