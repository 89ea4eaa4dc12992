//! Free-text to category canonicalization.
//!
//! Rules are evaluated in the configured order and the first matching
//! pattern wins. Values no rule matches pass through unchanged.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{ColumnError, ConfigError, ConfigResult, TableResult};
use crate::table::{ColumnType, Table, Value};

/// One `(pattern, label)` pair as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Regex searched case-insensitively anywhere in the value
    pub pattern: String,
    pub label: String,
}

impl CategoryRule {
    pub fn new(pattern: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            label: label.into(),
        }
    }
}

/// Compiled, ordered rule list.
#[derive(Debug, Clone)]
pub struct CategoryRules {
    rules: Vec<(Regex, String)>,
}

impl CategoryRules {
    /// Compile `rules`, keeping their order.
    pub fn new(rules: &[CategoryRule]) -> ConfigResult<Self> {
        let compiled = rules
            .iter()
            .map(|rule| {
                RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|re| (re, rule.label.clone()))
                    .map_err(|source| ConfigError::InvalidPattern {
                        pattern: rule.pattern.clone(),
                        source,
                    })
            })
            .collect::<ConfigResult<Vec<_>>>()?;
        Ok(Self { rules: compiled })
    }

    /// Label of the first matching rule, if any.
    pub fn matching(&self, value: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|(re, _)| re.is_match(value))
            .map(|(_, label)| label.as_str())
    }

    /// Label of the first matching rule, or `value` itself.
    pub fn canonicalize(&self, value: &str) -> String {
        self.matching(value).unwrap_or(value).to_string()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The rule list in configuration form.
    pub fn to_rules(&self) -> Vec<CategoryRule> {
        self.rules
            .iter()
            .map(|(re, label)| CategoryRule::new(re.as_str(), label.clone()))
            .collect()
    }
}

/// Canonicalize one value against an ordered rule list.
pub fn canonicalize_category(value: &str, rules: &CategoryRules) -> String {
    rules.canonicalize(value)
}

/// Tour de France stage types, in matching order.
///
/// "Mountain time trial" is a time trial, "Half stage" and "Intermediate
/// stage" are transitions.
pub fn stage_type_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new("flat", "Flat"),
        CategoryRule::new("plain", "Flat"),
        CategoryRule::new("time trial", "Time Trial"),
        CategoryRule::new("mountain", "Mountain"),
        CategoryRule::new("transition", "Transition"),
        CategoryRule::new("intermediate", "Transition"),
        CategoryRule::new("half", "Transition"),
        CategoryRule::new("hilly", "Hilly"),
    ]
}

impl Table {
    /// Write the canonical label of text column `source` into `output`.
    ///
    /// Null cells stay null.
    pub fn canonicalize_column(
        &self,
        source: &str,
        output: &str,
        rules: &CategoryRules,
    ) -> TableResult<Table> {
        let ty = self.schema().type_of(source)?;
        if ty != ColumnType::Text {
            return Err(ColumnError::TypeMismatch {
                column: source.to_string(),
                expected: ColumnType::Text,
                found: ty.to_string(),
            });
        }
        self.derive_column(output, ColumnType::Text, &[source], |v| match v[0] {
            Value::Str(s) => Value::Str(rules.canonicalize(s)),
            _ => Value::Null,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Schema;

    fn rules(pairs: &[(&str, &str)]) -> CategoryRules {
        let rules: Vec<_> = pairs.iter().map(|(p, l)| CategoryRule::new(*p, *l)).collect();
        CategoryRules::new(&rules).unwrap()
    }

    #[test]
    fn test_stage_example() {
        let rules = rules(&[("flat", "Flat"), ("mountain", "Mountain"), ("half", "Transition")]);
        let labels: Vec<_> = ["flat and fast", "high mountain", "half stage"]
            .iter()
            .map(|v| canonicalize_category(v, &rules))
            .collect();
        assert_eq!(labels, vec!["Flat", "Mountain", "Transition"]);
    }

    #[test]
    fn test_first_match_wins() {
        let value = "mountain time trial";
        let tt_first = rules(&[("time trial", "Time Trial"), ("mountain", "Mountain")]);
        let mountain_first = rules(&[("mountain", "Mountain"), ("time trial", "Time Trial")]);

        assert_eq!(tt_first.canonicalize(value), "Time Trial");
        assert_eq!(mountain_first.canonicalize(value), "Mountain");
        // same input, same rules, same answer
        assert_eq!(tt_first.canonicalize(value), tt_first.canonicalize(value));
    }

    #[test]
    fn test_case_insensitive_and_passthrough() {
        let rules = CategoryRules::new(&stage_type_rules()).unwrap();
        assert_eq!(rules.canonicalize("Flat cobblestone stage"), "Flat");
        assert_eq!(rules.canonicalize("Individual time trial"), "Time Trial");
        assert_eq!(rules.canonicalize("Mountain time trial"), "Time Trial");
        assert_eq!(rules.canonicalize("High mountain stage"), "Mountain");
        assert_eq!(rules.canonicalize("Half Stage"), "Transition");
        assert_eq!(rules.canonicalize("Team Time Trial"), "Time Trial");
        assert_eq!(rules.canonicalize("Medium mountain stage"), "Mountain");
        assert_eq!(rules.canonicalize("Stage with mountain(s)"), "Mountain");
        assert_eq!(rules.canonicalize("Hilly stage"), "Hilly");
        assert_eq!(rules.canonicalize("Escape"), "Escape");
    }

    #[test]
    fn test_invalid_pattern() {
        let err = CategoryRules::new(&[CategoryRule::new("(unclosed", "X")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_rules_round_trip_order() {
        let compiled = CategoryRules::new(&stage_type_rules()).unwrap();
        assert_eq!(compiled.len(), 8);
        assert_eq!(compiled.to_rules(), stage_type_rules());
    }

    #[test]
    fn test_canonicalize_column() {
        let schema = Schema::of(&[("type", ColumnType::Text)]).unwrap();
        let table = Table::new(
            schema,
            vec![
                vec![Value::text("Plain stage")],
                vec![Value::Null],
                vec![Value::text("Intermediate stage")],
            ],
        )
        .unwrap();
        let rules = CategoryRules::new(&stage_type_rules()).unwrap();

        let out = table.canonicalize_column("type", "stage_type", &rules).unwrap();
        assert_eq!(
            out.column("stage_type").unwrap(),
            vec![&Value::text("Flat"), &Value::Null, &Value::text("Transition")]
        );
        assert!(table.canonicalize_column("kind", "stage_type", &rules).is_err());
    }
}
