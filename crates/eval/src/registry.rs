//! Named custom predicates supplied by the embedding application.
//!
//! `Rule::Custom { function_name, args }` is resolved here at evaluation
//! time. Predicates receive the rule's literal arguments and the full form
//! data and must be pure.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// A custom predicate: `(args, data) -> bool`.
pub type CustomPredicate = Arc<dyn Fn(&[Value], &Value) -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub struct CustomRuleRegistry {
    predicates: BTreeMap<String, CustomPredicate>,
}

impl CustomRuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `predicate` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&[Value], &Value) -> bool + Send + Sync + 'static,
    {
        self.predicates.insert(name.into(), Arc::new(predicate));
    }

    /// Builder-style `register`.
    pub fn with<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&[Value], &Value) -> bool + Send + Sync + 'static,
    {
        self.register(name, predicate);
        self
    }

    pub fn get(&self, name: &str) -> Option<&CustomPredicate> {
        self.predicates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.predicates.keys().map(String::as_str)
    }
}

impl fmt::Debug for CustomRuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomRuleRegistry")
            .field("predicates", &self.predicates.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registers_and_resolves_by_name() {
        let registry = CustomRuleRegistry::new()
            .with("always", |_, _| true)
            .with("isResident", |args, data| {
                args.first().and_then(Value::as_str) == data.get("country").and_then(Value::as_str)
            });

        assert!(registry.contains("always"));
        assert!(!registry.contains("never"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["always", "isResident"]);

        let is_resident = registry.get("isResident").unwrap();
        assert!(is_resident(&[json!("NO")], &json!({"country": "NO"})));
        assert!(!is_resident(&[json!("NO")], &json!({"country": "SE"})));
    }

    #[test]
    fn debug_lists_names_only() {
        let registry = CustomRuleRegistry::new().with("a", |_, _| true);
        assert_eq!(
            format!("{:?}", registry),
            "CustomRuleRegistry { predicates: [\"a\"] }"
        );
    }
}
