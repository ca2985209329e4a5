//! Construction helpers for guard rules.
//!
//! ```
//! use formflow_eval::RuleBuilder as R;
//! use serde_json::json;
//!
//! let adult_resident = R::and([
//!     R::greater_than_or_equal("age", 18),
//!     R::custom("isResident", [json!("US")]),
//! ]);
//! assert_eq!(adult_resident.to_string(), r#"(age gte 18 and isResident("US"))"#);
//! ```

use formflow_core::{ComparisonOp, LogicalOp, Rule};
use serde_json::Value;

/// Static constructors for every `Rule` variant plus the `required` /
/// `optional` sugar.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBuilder;

impl RuleBuilder {
    pub fn compare(field: impl Into<String>, operator: ComparisonOp, value: impl Into<Value>) -> Rule {
        Rule::Comparison {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Rule {
        Self::compare(field, ComparisonOp::Eq, value)
    }

    pub fn not_equals(field: impl Into<String>, value: impl Into<Value>) -> Rule {
        Self::compare(field, ComparisonOp::Neq, value)
    }

    pub fn greater_than(field: impl Into<String>, value: impl Into<Value>) -> Rule {
        Self::compare(field, ComparisonOp::Gt, value)
    }

    pub fn greater_than_or_equal(field: impl Into<String>, value: impl Into<Value>) -> Rule {
        Self::compare(field, ComparisonOp::Gte, value)
    }

    pub fn less_than(field: impl Into<String>, value: impl Into<Value>) -> Rule {
        Self::compare(field, ComparisonOp::Lt, value)
    }

    pub fn less_than_or_equal(field: impl Into<String>, value: impl Into<Value>) -> Rule {
        Self::compare(field, ComparisonOp::Lte, value)
    }

    /// Set membership against a literal list.
    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Rule
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list = values.into_iter().map(Into::into).collect::<Vec<Value>>();
        Self::compare(field, ComparisonOp::In, Value::Array(list))
    }

    /// Regular-expression test against the string form of the field.
    pub fn matches(field: impl Into<String>, pattern: impl Into<String>) -> Rule {
        Self::compare(field, ComparisonOp::Matches, Value::String(pattern.into()))
    }

    pub fn and(children: impl IntoIterator<Item = Rule>) -> Rule {
        Rule::Logical {
            operator: LogicalOp::And,
            children: children.into_iter().collect(),
        }
    }

    pub fn or(children: impl IntoIterator<Item = Rule>) -> Rule {
        Rule::Logical {
            operator: LogicalOp::Or,
            children: children.into_iter().collect(),
        }
    }

    pub fn not(child: Rule) -> Rule {
        Rule::Logical {
            operator: LogicalOp::Not,
            children: vec![child],
        }
    }

    pub fn custom<I>(function_name: impl Into<String>, args: I) -> Rule
    where
        I: IntoIterator<Item = Value>,
    {
        Rule::Custom {
            function_name: function_name.into(),
            args: args.into_iter().collect(),
        }
    }

    /// `field` is present, not null and not the empty string.
    pub fn required(field: impl Into<String>) -> Rule {
        let field = field.into();
        Self::and([
            Self::not_equals(field.clone(), Value::Null),
            Self::not_equals(field, ""),
        ])
    }

    /// `field` is absent or null, or else satisfies `rule`.
    pub fn optional(field: impl Into<String>, rule: Rule) -> Rule {
        Self::or([Self::equals(field, Value::Null), rule])
    }
}
