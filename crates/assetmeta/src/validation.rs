//! Validation rules attached to metadata fields
//!
//! Rules form a small tree: `less_than`, `greater_than` and `string_length`
//! are leaves, `and` is the only node that holds children. Every node is
//! serialized as `{"type": <tag>, ...}` carrying only its own parameters.

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::value::{parse_date, FieldType, FieldValue, DATE_FORMAT};
use crate::{Error, Result};

/// Comparison bound of a `less_than` / `greater_than` rule.
///
/// The bound kind follows the owning field: integer fields compare
/// numerically, date fields compare calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Integer(i64),
    Date(NaiveDate),
}

impl Bound {
    fn field_type(&self) -> FieldType {
        match self {
            Bound::Integer(_) => FieldType::Integer,
            Bound::Date(_) => FieldType::Date,
        }
    }

    /// Orders `value` against this bound, `None` when the kinds differ
    fn compare(&self, value: &FieldValue) -> Option<Ordering> {
        match (value, self) {
            (FieldValue::Integer(v), Bound::Integer(b)) => Some(v.cmp(b)),
            (FieldValue::Date(v), Bound::Date(b)) => Some(v.cmp(b)),
            _ => None,
        }
    }
}

impl From<i64> for Bound {
    fn from(n: i64) -> Self {
        Bound::Integer(n)
    }
}

impl From<i32> for Bound {
    fn from(n: i32) -> Self {
        Bound::Integer(n.into())
    }
}

impl From<NaiveDate> for Bound {
    fn from(d: NaiveDate) -> Self {
        Bound::Date(d)
    }
}

impl From<NaiveDateTime> for Bound {
    fn from(dt: NaiveDateTime) -> Self {
        Bound::Date(dt.date())
    }
}

impl Serialize for Bound {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Bound::Integer(n) => serializer.serialize_i64(*n),
            Bound::Date(d) => serializer.collect_str(&d.format(DATE_FORMAT)),
        }
    }
}

impl<'de> Deserialize<'de> for Bound {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => n
                .as_i64()
                .map(Bound::Integer)
                .ok_or_else(|| de::Error::custom(format!("bound {} is not an integer", n))),
            Value::String(s) => parse_date(&s).map(Bound::Date).map_err(de::Error::custom),
            other => Err(de::Error::custom(format!(
                "expected integer or date bound, got {}",
                crate::value::json_kind(&other)
            ))),
        }
    }
}

/// Tag of a validation rule node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValidationKind {
    And,
    LessThan,
    GreaterThan,
    StringLength,
}

impl ValidationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationKind::And => "and",
            ValidationKind::LessThan => "less_than",
            ValidationKind::GreaterThan => "greater_than",
            ValidationKind::StringLength => "string_length",
        }
    }
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation rule tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationRule {
    And {
        rules: Vec<ValidationRule>,
    },
    LessThan {
        value: Bound,
        #[serde(default)]
        equals: bool,
    },
    GreaterThan {
        value: Bound,
        #[serde(default)]
        equals: bool,
    },
    StringLength {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<u32>,
    },
}

impl ValidationRule {
    pub fn less_than(bound: impl Into<Bound>) -> Self {
        ValidationRule::LessThan {
            value: bound.into(),
            equals: false,
        }
    }

    pub fn less_than_or_equal(bound: impl Into<Bound>) -> Self {
        ValidationRule::LessThan {
            value: bound.into(),
            equals: true,
        }
    }

    pub fn greater_than(bound: impl Into<Bound>) -> Self {
        ValidationRule::GreaterThan {
            value: bound.into(),
            equals: false,
        }
    }

    pub fn greater_than_or_equal(bound: impl Into<Bound>) -> Self {
        ValidationRule::GreaterThan {
            value: bound.into(),
            equals: true,
        }
    }

    pub fn string_length(min: Option<u32>, max: Option<u32>) -> Self {
        ValidationRule::StringLength { min, max }
    }

    /// Conjunction of `rules`; fails when `rules` is empty
    pub fn all(rules: impl IntoIterator<Item = ValidationRule>) -> Result<Self> {
        let rules: Vec<_> = rules.into_iter().collect();
        if rules.is_empty() {
            return Err(empty_and());
        }
        Ok(ValidationRule::And { rules })
    }

    pub fn kind(&self) -> ValidationKind {
        match self {
            ValidationRule::And { .. } => ValidationKind::And,
            ValidationRule::LessThan { .. } => ValidationKind::LessThan,
            ValidationRule::GreaterThan { .. } => ValidationKind::GreaterThan,
            ValidationRule::StringLength { .. } => ValidationKind::StringLength,
        }
    }

    /// Direct children; leaves have none
    pub fn children(&self) -> &[ValidationRule] {
        match self {
            ValidationRule::And { rules } => rules,
            _ => &[],
        }
    }

    /// Tags of the direct children, sorted so that comparisons ignore rule order
    pub fn child_kinds(&self) -> Vec<ValidationKind> {
        let mut kinds: Vec<_> = self.children().iter().map(ValidationRule::kind).collect();
        kinds.sort();
        kinds
    }

    /// Structural equality that ignores the order of rules inside `and` nodes.
    ///
    /// The server may return `and` children in a different order than they
    /// were submitted.
    pub fn equivalent(&self, other: &ValidationRule) -> bool {
        match (self, other) {
            (ValidationRule::And { rules: a }, ValidationRule::And { rules: b }) => {
                if a.len() != b.len() {
                    return false;
                }
                let mut used = vec![false; b.len()];
                a.iter().all(|rule| {
                    let found = b
                        .iter()
                        .enumerate()
                        .find(|(i, candidate)| !used[*i] && rule.equivalent(candidate));
                    match found {
                        Some((i, _)) => {
                            used[i] = true;
                            true
                        }
                        None => false,
                    }
                })
            }
            _ => self == other,
        }
    }

    /// Checks that this rule can be attached to a field of `field_type`
    pub fn check_for(&self, field_type: FieldType) -> Result<()> {
        match self {
            ValidationRule::And { rules } => {
                if rules.is_empty() {
                    return Err(empty_and());
                }
                rules.iter().try_for_each(|rule| rule.check_for(field_type))
            }
            ValidationRule::LessThan { value, .. } | ValidationRule::GreaterThan { value, .. } => {
                if value.field_type() == field_type {
                    Ok(())
                } else {
                    Err(Error::TypeMismatch {
                        expected: field_type,
                        found: format!("{} rule with {} bound", self.kind(), value.field_type()),
                    })
                }
            }
            ValidationRule::StringLength { min, max } => {
                if field_type != FieldType::String {
                    return Err(Error::TypeMismatch {
                        expected: field_type,
                        found: format!("{} rule", self.kind()),
                    });
                }
                match (min, max) {
                    (Some(min), Some(max)) if min > max => Err(Error::InvalidArgument {
                        name: "validation",
                        reason: format!("string_length min {} exceeds max {}", min, max),
                    }),
                    _ => Ok(()),
                }
            }
        }
    }

    /// Evaluates the rule against `value` using the value's own semantics:
    /// integers numerically, dates by calendar order, strings by character count.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        match self {
            ValidationRule::And { rules } => rules.iter().all(|rule| rule.accepts(value)),
            ValidationRule::LessThan { value: bound, equals } => match bound.compare(value) {
                Some(Ordering::Less) => true,
                Some(Ordering::Equal) => *equals,
                _ => false,
            },
            ValidationRule::GreaterThan { value: bound, equals } => match bound.compare(value) {
                Some(Ordering::Greater) => true,
                Some(Ordering::Equal) => *equals,
                _ => false,
            },
            ValidationRule::StringLength { min, max } => match value {
                FieldValue::String(s) => {
                    let len = s.chars().count() as u64;
                    min.map_or(true, |min| len >= u64::from(min))
                        && max.map_or(true, |max| len <= u64::from(max))
                }
                _ => false,
            },
        }
    }
}

fn empty_and() -> Error {
    Error::InvalidArgument {
        name: "validation",
        reason: "`and` rule requires at least one child rule".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_serialize_tree() {
        let rule = ValidationRule::all([
            ValidationRule::less_than(300),
            ValidationRule::greater_than_or_equal(50),
        ])
        .unwrap();

        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            json!({
                "type": "and",
                "rules": [
                    {"type": "less_than", "value": 300, "equals": false},
                    {"type": "greater_than", "value": 50, "equals": true}
                ]
            })
        );
    }

    #[test]
    fn test_string_length_emits_only_set_bounds() {
        let rule = ValidationRule::string_length(Some(5), None);
        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            json!({"type": "string_length", "min": 5})
        );
    }

    #[test]
    fn test_round_trip_is_identical() {
        let sent = ValidationRule::all([
            ValidationRule::less_than(date(2020, 1, 1)),
            ValidationRule::greater_than(date(2001, 1, 1)),
        ])
        .unwrap();
        let text = serde_json::to_string(&sent).unwrap();
        let parsed: ValidationRule = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, sent);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), text);
    }

    #[test]
    fn test_equivalent_ignores_and_order() {
        let a = ValidationRule::all([ValidationRule::less_than(300), ValidationRule::greater_than(50)])
            .unwrap();
        let b = ValidationRule::all([ValidationRule::greater_than(50), ValidationRule::less_than(300)])
            .unwrap();
        assert_ne!(a, b);
        assert!(a.equivalent(&b));
        assert_eq!(a.child_kinds(), b.child_kinds());

        let c = ValidationRule::all([ValidationRule::greater_than(51), ValidationRule::less_than(300)])
            .unwrap();
        assert!(!a.equivalent(&c));
    }

    #[test]
    fn test_empty_and_is_rejected() {
        assert!(ValidationRule::all(Vec::new()).unwrap_err().is_invalid_argument());
        let raw: ValidationRule = serde_json::from_value(json!({"type": "and", "rules": []})).unwrap();
        assert!(raw.check_for(FieldType::Integer).is_err());
    }

    #[test]
    fn test_check_for_field_type() {
        assert!(ValidationRule::less_than(10).check_for(FieldType::Integer).is_ok());
        assert!(ValidationRule::less_than(10).check_for(FieldType::Date).is_err());
        assert!(ValidationRule::less_than(date(2020, 1, 1)).check_for(FieldType::Date).is_ok());
        assert!(ValidationRule::string_length(Some(1), Some(3)).check_for(FieldType::String).is_ok());
        assert!(ValidationRule::string_length(None, Some(3)).check_for(FieldType::Enum).is_err());
        assert!(ValidationRule::string_length(Some(4), Some(3))
            .check_for(FieldType::String)
            .unwrap_err()
            .is_invalid_argument());
    }

    #[test]
    fn test_date_bounds_compare_as_dates() {
        let rule = ValidationRule::less_than(date(2020, 1, 1));
        assert!(rule.accepts(&FieldValue::Date(date(2019, 12, 31))));
        assert!(!rule.accepts(&FieldValue::Date(date(2020, 1, 1))));
        assert!(ValidationRule::less_than_or_equal(date(2020, 1, 1))
            .accepts(&FieldValue::Date(date(2020, 1, 1))));
        assert!(!rule.accepts(&FieldValue::Integer(1)));
    }

    #[test]
    fn test_accepts() {
        let range = ValidationRule::all([ValidationRule::less_than(300), ValidationRule::greater_than(50)])
            .unwrap();
        assert!(range.accepts(&FieldValue::Integer(100)));
        assert!(!range.accepts(&FieldValue::Integer(50)));
        assert!(!range.accepts(&FieldValue::Integer(300)));

        let len = ValidationRule::string_length(Some(5), Some(300));
        assert!(len.accepts(&FieldValue::String("some value".into())));
        assert!(!len.accepts(&FieldValue::String("abc".into())));
        assert!(len.accepts(&FieldValue::String("ééééé".into())));
    }

    #[test]
    fn test_deserialize_timestamp_bound() {
        let rule: ValidationRule = serde_json::from_value(
            json!({"type": "greater_than", "value": "2001-01-01T00:00:00Z"}),
        )
        .unwrap();
        assert_eq!(rule, ValidationRule::greater_than(date(2001, 1, 1)));
    }
}
