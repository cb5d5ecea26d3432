//! Metadata field definitions
//!
//! `FieldDefinition` is what the server returns. `CreateFieldParams` and
//! `UpdateFieldParams` are what the client sends; both are checked locally
//! before anything goes over the wire.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::datasource::{DataSource, DataSourceParams};
use crate::validation::ValidationRule;
use crate::value::{FieldType, FieldValue};
use crate::{Error, Result};

/// Metadata field definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFieldDefinition")]
pub struct FieldDefinition {
    pub external_id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    pub mandatory: bool,
    pub default_value: Option<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasource: Option<DataSource>,
}

impl FieldDefinition {
    /// Entry ids the default value points at
    pub fn default_entry_ids(&self) -> Vec<&str> {
        match &self.default_value {
            Some(FieldValue::Enum(id)) => vec![id.as_str()],
            Some(FieldValue::Set(ids)) => ids.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

/// Wire form; `default_value` can only be decoded once `type` is known
#[derive(Deserialize)]
struct RawFieldDefinition {
    external_id: String,
    #[serde(rename = "type")]
    field_type: FieldType,
    #[serde(default)]
    label: String,
    #[serde(default)]
    mandatory: bool,
    #[serde(default)]
    default_value: Value,
    #[serde(default)]
    validation: Option<ValidationRule>,
    #[serde(default)]
    datasource: Option<DataSource>,
}

impl TryFrom<RawFieldDefinition> for FieldDefinition {
    type Error = Error;

    fn try_from(raw: RawFieldDefinition) -> Result<Self> {
        Ok(Self {
            default_value: FieldValue::from_json(raw.field_type, &raw.default_value)?,
            external_id: raw.external_id,
            field_type: raw.field_type,
            label: raw.label,
            mandatory: raw.mandatory,
            validation: raw.validation,
            datasource: raw.datasource,
        })
    }
}

/// List of field definitions, in server order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldList {
    #[serde(default)]
    pub metadata_fields: Vec<FieldDefinition>,
}

impl FieldList {
    pub fn len(&self) -> usize {
        self.metadata_fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata_fields.is_empty()
    }

    pub fn get(&self, external_id: &str) -> Option<&FieldDefinition> {
        self.metadata_fields
            .iter()
            .find(|f| f.external_id == external_id)
    }

    pub fn external_ids(&self) -> Vec<&str> {
        self.metadata_fields
            .iter()
            .map(|f| f.external_id.as_str())
            .collect()
    }

    /// The server gives no ordering guarantee; sort when determinism matters
    pub fn sorted_by_id(mut self) -> Self {
        self.metadata_fields
            .sort_by(|a, b| a.external_id.cmp(&b.external_id));
        self
    }
}

impl IntoIterator for FieldList {
    type Item = FieldDefinition;
    type IntoIter = std::vec::IntoIter<FieldDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.metadata_fields.into_iter()
    }
}

/// Acknowledgement of a field deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub message: String,
}

impl DeleteResult {
    pub fn is_ok(&self) -> bool {
        self.message == "ok"
    }
}

// =============================================================================
// Create
// =============================================================================

/// Parameters for creating a metadata field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateFieldParams {
    pub external_id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    pub mandatory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasource: Option<DataSourceParams>,
}

impl CreateFieldParams {
    pub fn builder(field_type: FieldType) -> CreateFieldParamsBuilder {
        CreateFieldParamsBuilder {
            params: CreateFieldParams {
                external_id: String::new(),
                field_type,
                label: String::new(),
                mandatory: false,
                default_value: None,
                validation: None,
                datasource: None,
            },
        }
    }

    pub fn integer() -> CreateFieldParamsBuilder {
        Self::builder(FieldType::Integer)
    }

    pub fn string() -> CreateFieldParamsBuilder {
        Self::builder(FieldType::String)
    }

    pub fn date() -> CreateFieldParamsBuilder {
        Self::builder(FieldType::Date)
    }

    pub fn enumeration() -> CreateFieldParamsBuilder {
        Self::builder(FieldType::Enum)
    }

    pub fn set() -> CreateFieldParamsBuilder {
        Self::builder(FieldType::Set)
    }

    /// Local checks run before the request is sent
    pub fn check(&self) -> Result<()> {
        if self.external_id.is_empty() {
            return Err(Error::missing("external_id"));
        }
        check_common(
            self.field_type,
            self.default_value.as_ref(),
            self.validation.as_ref(),
            self.datasource.as_ref(),
        )
    }
}

/// Builder for CreateFieldParams
#[derive(Debug, Clone)]
pub struct CreateFieldParamsBuilder {
    params: CreateFieldParams,
}

impl CreateFieldParamsBuilder {
    pub fn external_id(mut self, external_id: impl Into<String>) -> Self {
        self.params.external_id = external_id.into();
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.params.label = label.into();
        self
    }

    pub fn mandatory(mut self, mandatory: bool) -> Self {
        self.params.mandatory = mandatory;
        self
    }

    pub fn default_value(mut self, value: impl Into<FieldValue>) -> Self {
        self.params.default_value = Some(value.into());
        self
    }

    pub fn validation(mut self, rule: ValidationRule) -> Self {
        self.params.validation = Some(rule);
        self
    }

    pub fn datasource(mut self, datasource: DataSourceParams) -> Self {
        self.params.datasource = Some(datasource);
        self
    }

    pub fn build(self) -> CreateFieldParams {
        self.params
    }
}

// =============================================================================
// Update
// =============================================================================

/// Presence marker for partial updates.
///
/// `Unset` leaves the server value alone and is never transmitted, `Clear`
/// is sent as `null`, `Set` sends the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting<T> {
    Unset,
    Clear,
    Set(T),
}

impl<T> Default for Setting<T> {
    fn default() -> Self {
        Setting::Unset
    }
}

impl<T> Setting<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Setting::Unset)
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Setting::Set(value) => Some(value),
            _ => None,
        }
    }

    /// Result of applying this setting on top of `current`
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Setting::Unset => current,
            Setting::Clear => None,
            Setting::Set(value) => Some(value),
        }
    }
}

impl<T> From<Option<T>> for Setting<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Setting::Set(value),
            None => Setting::Clear,
        }
    }
}

impl<T: Serialize> Serialize for Setting<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Setting::Set(value) => serializer.serialize_some(value),
            Setting::Unset | Setting::Clear => serializer.serialize_none(),
        }
    }
}

/// Parameters for a partial field update.
///
/// Only the properties that were set are transmitted. The field type is kept
/// locally to check the shape of a new default value; neither the type nor
/// the external id is ever part of the payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateFieldParams {
    #[serde(skip)]
    field_type: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mandatory: Option<bool>,
    #[serde(skip_serializing_if = "Setting::is_unset")]
    pub default_value: Setting<FieldValue>,
    #[serde(skip_serializing_if = "Setting::is_unset")]
    pub validation: Setting<ValidationRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasource: Option<DataSourceParams>,
}

impl UpdateFieldParams {
    /// Update of a field of `field_type`, with nothing set yet
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            label: None,
            mandatory: None,
            default_value: Setting::Unset,
            validation: Setting::Unset,
            datasource: None,
        }
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn mandatory(mut self, mandatory: bool) -> Self {
        self.mandatory = Some(mandatory);
        self
    }

    pub fn default_value(mut self, value: impl Into<FieldValue>) -> Self {
        self.default_value = Setting::Set(value.into());
        self
    }

    pub fn clear_default_value(mut self) -> Self {
        self.default_value = Setting::Clear;
        self
    }

    pub fn validation(mut self, rule: ValidationRule) -> Self {
        self.validation = Setting::Set(rule);
        self
    }

    pub fn clear_validation(mut self) -> Self {
        self.validation = Setting::Clear;
        self
    }

    pub fn datasource(mut self, datasource: DataSourceParams) -> Self {
        self.datasource = Some(datasource);
        self
    }

    /// True when nothing would be transmitted
    pub fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.mandatory.is_none()
            && self.default_value.is_unset()
            && self.validation.is_unset()
            && self.datasource.is_none()
    }

    /// Local checks run before the request is sent
    pub fn check(&self) -> Result<()> {
        check_common(
            self.field_type,
            self.default_value.as_set(),
            self.validation.as_set(),
            self.datasource.as_ref(),
        )
    }
}

fn check_common(
    field_type: FieldType,
    default_value: Option<&FieldValue>,
    validation: Option<&ValidationRule>,
    datasource: Option<&DataSourceParams>,
) -> Result<()> {
    if let Some(value) = default_value {
        value.check_type(field_type)?;
    }
    if let Some(rule) = validation {
        rule.check_for(field_type)?;
    }
    if let Some(datasource) = datasource {
        if !field_type.has_datasource() {
            return Err(Error::InvalidArgument {
                name: "datasource",
                reason: format!("{} fields cannot have a datasource", field_type),
            });
        }
        datasource.check()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::EntryParams;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_create_params_wire_shape() {
        let params = CreateFieldParams::set()
            .external_id("colors")
            .label("Colors")
            .mandatory(true)
            .default_value(FieldValue::set(["external_id_1", "external_id_2"]))
            .datasource(DataSourceParams::new([
                EntryParams::with_id("blue", "external_id_1"),
                EntryParams::with_id("yellow", "external_id_2"),
            ]))
            .build();

        assert!(params.check().is_ok());
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({
                "external_id": "colors",
                "type": "set",
                "label": "Colors",
                "mandatory": true,
                "default_value": ["external_id_1", "external_id_2"],
                "datasource": {"values": [
                    {"external_id": "external_id_1", "value": "blue"},
                    {"external_id": "external_id_2", "value": "yellow"}
                ]}
            })
        );
    }

    #[test]
    fn test_create_params_date_default() {
        let noon = NaiveDate::from_ymd_opt(2019, 11, 5)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let params = CreateFieldParams::date()
            .external_id("shoot_date")
            .label("Shoot date")
            .default_value(noon)
            .build();
        assert_eq!(
            serde_json::to_value(&params).unwrap()["default_value"],
            json!("2019-11-05")
        );
    }

    #[test]
    fn test_create_params_checks() {
        let missing_id = CreateFieldParams::integer().label("Count").build();
        assert!(missing_id.check().unwrap_err().is_invalid_argument());

        let wrong_default = CreateFieldParams::integer()
            .external_id("count")
            .default_value(FieldValue::set(["a"]))
            .build();
        assert!(matches!(
            wrong_default.check(),
            Err(Error::TypeMismatch { expected: FieldType::Integer, .. })
        ));

        let datasource_on_string = CreateFieldParams::string()
            .external_id("title")
            .datasource(DataSourceParams::new([EntryParams::new("x")]))
            .build();
        assert!(datasource_on_string.check().is_err());

        let date_rule_on_int = CreateFieldParams::integer()
            .external_id("count")
            .validation(ValidationRule::less_than(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()))
            .build();
        assert!(date_rule_on_int.check().is_err());
    }

    #[test]
    fn test_update_params_only_sends_present_fields() {
        let params = UpdateFieldParams::new(FieldType::Integer).label("New label");
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({"label": "New label"})
        );

        let params = UpdateFieldParams::new(FieldType::Integer)
            .default_value(200)
            .clear_validation();
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({"default_value": 200, "validation": null})
        );
        assert!(UpdateFieldParams::new(FieldType::Enum).is_empty());
    }

    #[test]
    fn test_update_params_check_type() {
        let params = UpdateFieldParams::new(FieldType::Enum).default_value(FieldValue::Integer(3));
        assert!(params.check().is_err());
        let params = UpdateFieldParams::new(FieldType::Enum).default_value(FieldValue::entry("external_id_2"));
        assert!(params.check().is_ok());
    }

    #[test]
    fn test_setting_apply() {
        assert_eq!(Setting::Unset.apply(Some(1)), Some(1));
        assert_eq!(Setting::<i32>::Clear.apply(Some(1)), None);
        assert_eq!(Setting::Set(2).apply(Some(1)), Some(2));
        assert_eq!(Setting::from(None::<i32>), Setting::Clear);
    }

    #[test]
    fn test_definition_from_server_response() {
        let field: FieldDefinition = serde_json::from_value(json!({
            "type": "enum",
            "external_id": "color",
            "label": "Color",
            "mandatory": true,
            "default_value": "external_id_1",
            "validation": null,
            "default_disabled": false,
            "datasource": {"values": [
                {"external_id": "external_id_1", "value": "blue", "state": "active"},
                {"external_id": "external_id_2", "value": "yellow", "state": "inactive"}
            ]}
        }))
        .unwrap();

        assert_eq!(field.field_type, FieldType::Enum);
        assert_eq!(field.default_value, Some(FieldValue::entry("external_id_1")));
        assert_eq!(field.default_entry_ids(), vec!["external_id_1"]);
        assert!(field.validation.is_none());
        assert_eq!(field.datasource.unwrap().active().count(), 1);
    }

    #[test]
    fn test_definition_rejects_mismatched_default() {
        let result: std::result::Result<FieldDefinition, _> = serde_json::from_value(json!({
            "type": "integer",
            "external_id": "count",
            "label": "Count",
            "mandatory": false,
            "default_value": ["a", "b"]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_list_sorted() {
        let list: FieldList = serde_json::from_value(json!({"metadata_fields": [
            {"type": "string", "external_id": "b", "label": "B", "mandatory": false, "default_value": null},
            {"type": "integer", "external_id": "a", "label": "A", "mandatory": false, "default_value": 1}
        ]}))
        .unwrap();
        assert_eq!(list.sorted_by_id().external_ids(), vec!["a", "b"]);
    }
}
