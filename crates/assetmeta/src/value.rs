//! Field value types
//!
//! A metadata field holds one of five kinds of value. The kind is fixed when
//! the field is created and decides both the wire shape of the default value
//! and whether the field carries a datasource.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::{Error, Result};

/// Wire format of date values
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Kind of value a metadata field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Integer,
    String,
    Date,
    Enum,
    Set,
}

impl FieldType {
    pub const ALL: [FieldType; 5] = [
        FieldType::Integer,
        FieldType::String,
        FieldType::Date,
        FieldType::Enum,
        FieldType::Set,
    ];

    /// Wire tag
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::String => "string",
            FieldType::Date => "date",
            FieldType::Enum => "enum",
            FieldType::Set => "set",
        }
    }

    /// Enum and set fields draw their values from a datasource
    pub fn has_datasource(&self) -> bool {
        matches!(self, FieldType::Enum | FieldType::Set)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FieldType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidArgument {
                name: "type",
                reason: format!("unknown field type `{}`", s),
            })
    }
}

/// A value held by (or defaulted on) a metadata field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Integer(i64),
    String(String),
    Date(NaiveDate),
    /// Datasource entry id
    Enum(String),
    /// Ordered datasource entry ids
    Set(Vec<String>),
}

impl FieldValue {
    /// Date value from a timestamp. The time of day is dropped.
    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        FieldValue::Date(dt.date_naive())
    }

    pub fn string(s: impl Into<String>) -> Self {
        FieldValue::String(s.into())
    }

    /// Enum value referencing one datasource entry
    pub fn entry(external_id: impl Into<String>) -> Self {
        FieldValue::Enum(external_id.into())
    }

    /// Set value from entry ids
    pub fn set<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::Set(ids.into_iter().map(Into::into).collect())
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Integer(_) => FieldType::Integer,
            FieldValue::String(_) => FieldType::String,
            FieldValue::Date(_) => FieldType::Date,
            FieldValue::Enum(_) => FieldType::Enum,
            FieldValue::Set(_) => FieldType::Set,
        }
    }

    /// Fails with [`Error::TypeMismatch`] unless this value fits a field of `expected` type
    pub fn check_type(&self, expected: FieldType) -> Result<()> {
        if self.field_type() == expected {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                expected,
                found: self.field_type().to_string(),
            })
        }
    }

    /// Wire representation
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Integer(n) => Value::from(*n),
            FieldValue::String(s) | FieldValue::Enum(s) => Value::from(s.as_str()),
            FieldValue::Date(d) => Value::from(d.format(DATE_FORMAT).to_string()),
            FieldValue::Set(ids) => Value::from(ids.clone()),
        }
    }

    /// Decode a raw JSON value for a field of type `field_type`.
    ///
    /// `null` decodes to `None`. Timestamps given for date fields are
    /// truncated to their calendar date.
    pub fn from_json(field_type: FieldType, raw: &Value) -> Result<Option<Self>> {
        if raw.is_null() {
            return Ok(None);
        }
        let mismatch = || Error::TypeMismatch {
            expected: field_type,
            found: json_kind(raw).to_string(),
        };

        let value = match field_type {
            FieldType::Integer => FieldValue::Integer(raw.as_i64().ok_or_else(mismatch)?),
            FieldType::String => FieldValue::String(raw.as_str().ok_or_else(mismatch)?.to_string()),
            FieldType::Date => FieldValue::Date(parse_date(raw.as_str().ok_or_else(mismatch)?)?),
            FieldType::Enum => FieldValue::Enum(raw.as_str().ok_or_else(mismatch)?.to_string()),
            FieldType::Set => {
                let items = raw.as_array().ok_or_else(mismatch)?;
                let ids = items
                    .iter()
                    .map(|item| item.as_str().map(String::from).ok_or_else(mismatch))
                    .collect::<Result<Vec<_>>>()?;
                FieldValue::Set(ids)
            }
        };
        Ok(Some(value))
    }

    /// Parse a textual value, as typed on a command line.
    ///
    /// Set values are comma separated entry ids.
    pub fn parse(field_type: FieldType, input: &str) -> Result<Self> {
        // string values are taken verbatim; everything else is an id, number or date
        let trimmed = input.trim();
        Ok(match field_type {
            FieldType::Integer => {
                FieldValue::Integer(trimmed.parse().map_err(|_| Error::TypeMismatch {
                    expected: field_type,
                    found: format!("`{}`", trimmed),
                })?)
            }
            FieldType::String => FieldValue::String(input.to_string()),
            FieldType::Date => FieldValue::Date(parse_date(trimmed)?),
            FieldType::Enum => FieldValue::Enum(trimmed.to_string()),
            FieldType::Set => FieldValue::Set(
                trimmed
                    .split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(String::from)
                    .collect(),
            ),
        })
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Integer(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Integer(n.into())
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        FieldValue::Date(d)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(dt: NaiveDateTime) -> Self {
        FieldValue::Date(dt.date())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(n) => write!(f, "{}", n),
            FieldValue::String(s) | FieldValue::Enum(s) => f.write_str(s),
            FieldValue::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            FieldValue::Set(ids) => f.write_str(&ids.join(",")),
        }
    }
}

/// Parse a calendar date, accepting and discarding a time-of-day component
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(input, DATE_FORMAT) {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(dt.date());
        }
    }
    Err(Error::TypeMismatch {
        expected: FieldType::Date,
        found: format!("`{}`", input),
    })
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
