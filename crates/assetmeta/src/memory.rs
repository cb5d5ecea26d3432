//! In-memory metadata registry (for testing and development)
//!
//! Answers admin API requests the way the service documents them:
//! duplicate external ids conflict, unknown fields are not found, datasource
//! updates upsert by id and deletes only deactivate. `and` rules come back
//! in reverse submission order, which the service is free to do.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use url::Url;

use crate::datasource::{DataSource, DataSourceParams};
use crate::field::FieldDefinition;
use crate::transport::ApiCaller;
use crate::validation::ValidationRule;
use crate::value::{FieldType, FieldValue};
use crate::{Error, Result};

/// Create payload as the service reads it
#[derive(Deserialize)]
struct CreatePayload {
    external_id: String,
    #[serde(rename = "type")]
    field_type: FieldType,
    label: String,
    #[serde(default)]
    mandatory: bool,
    #[serde(default)]
    default_value: Value,
    #[serde(default)]
    validation: Option<ValidationRule>,
    #[serde(default)]
    datasource: Option<DataSourceParams>,
}

/// In-memory implementation of [`ApiCaller`]
pub struct InMemoryRegistry {
    fields: RwLock<Vec<FieldDefinition>>,
    next_entry_id: AtomicUsize,
    calls: AtomicUsize,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            fields: RwLock::new(Vec::new()),
            next_entry_id: AtomicUsize::new(1),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of requests received so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn entry_id(&self) -> String {
        let n = self.next_entry_id.fetch_add(1, Ordering::SeqCst);
        format!("entry_{:04}", n)
    }

    fn create(&self, payload: Value) -> Result<Value> {
        let payload: CreatePayload = serde_json::from_value(payload).map_err(bad_request)?;
        if payload.external_id.is_empty() {
            return Err(api_error(400, "external_id is required".into()));
        }
        if payload.datasource.is_some() && !payload.field_type.has_datasource() {
            return Err(api_error(400, format!("{} fields do not support a datasource", payload.field_type)));
        }

        if let Some(params) = &payload.datasource {
            params.check().map_err(bad_request)?;
        }

        let mut fields = self.fields.write();
        if fields.iter().any(|f| f.external_id == payload.external_id) {
            return Err(api_error(
                409,
                format!("external id {} already exists", payload.external_id),
            ));
        }

        let field = FieldDefinition {
            default_value: FieldValue::from_json(payload.field_type, &payload.default_value)
                .map_err(bad_request)?,
            datasource: payload
                .datasource
                .map(|params| DataSource::from_params(params, || self.entry_id())),
            validation: payload.validation.map(reorder),
            external_id: payload.external_id,
            field_type: payload.field_type,
            label: payload.label,
            mandatory: payload.mandatory,
        };
        check_references(&field)?;

        fields.push(field.clone());
        Ok(serde_json::to_value(field)?)
    }

    fn update(&self, id: &str, payload: Value) -> Result<Value> {
        let Value::Object(payload) = payload else {
            return Err(api_error(400, "update payload must be an object".into()));
        };

        let mut fields = self.fields.write();
        let field = find_mut(&mut fields, id)?;
        let mut updated = field.clone();

        if let Some(label) = payload.get("label") {
            updated.label = label
                .as_str()
                .ok_or_else(|| api_error(400, "label must be a string".into()))?
                .to_string();
        }
        if let Some(mandatory) = payload.get("mandatory") {
            updated.mandatory = mandatory
                .as_bool()
                .ok_or_else(|| api_error(400, "mandatory must be a boolean".into()))?;
        }
        if let Some(default_value) = payload.get("default_value") {
            updated.default_value =
                FieldValue::from_json(updated.field_type, default_value).map_err(bad_request)?;
        }
        if let Some(validation) = payload.get("validation") {
            updated.validation = Option::<ValidationRule>::deserialize(validation)
                .map_err(bad_request)?
                .map(reorder);
        }
        if let Some(datasource) = payload.get("datasource") {
            let params = DataSourceParams::deserialize(datasource).map_err(bad_request)?;
            self.merge_entries(&mut updated, params)?;
        }
        check_references(&updated)?;

        *field = updated.clone();
        Ok(serde_json::to_value(updated)?)
    }

    fn merge_entries(&self, field: &mut FieldDefinition, params: DataSourceParams) -> Result<()> {
        if !field.field_type.has_datasource() {
            return Err(api_error(
                400,
                format!("{} fields do not support a datasource", field.field_type),
            ));
        }
        params.check().map_err(bad_request)?;
        field
            .datasource
            .get_or_insert_with(DataSource::default)
            .upsert(params.values, || self.entry_id());
        Ok(())
    }

    fn update_datasource(&self, id: &str, payload: Value) -> Result<Value> {
        let params: DataSourceParams = serde_json::from_value(payload).map_err(bad_request)?;
        let mut fields = self.fields.write();
        let field = find_mut(&mut fields, id)?;
        self.merge_entries(field, params)?;
        Ok(serde_json::to_value(field.datasource.clone().unwrap_or_default())?)
    }

    fn delete_entries(&self, id: &str, url: &Url) -> Result<Value> {
        let ids: Vec<String> = url
            .query_pairs()
            .filter(|(k, _)| k == "external_ids[]")
            .map(|(_, v)| v.into_owned())
            .collect();

        let mut fields = self.fields.write();
        let field = find_mut(&mut fields, id)?;
        let targeted = match field.datasource.as_mut() {
            Some(datasource) => datasource.deactivate(&ids),
            None => Vec::new(),
        };
        Ok(serde_json::to_value(DataSource { values: targeted })?)
    }

    fn delete(&self, id: &str) -> Result<Value> {
        let mut fields = self.fields.write();
        let before = fields.len();
        fields.retain(|f| f.external_id != id);
        if fields.len() == before {
            return Err(not_found(id));
        }
        Ok(json!({"message": "ok"}))
    }

    fn get(&self, id: &str) -> Result<Value> {
        let fields = self.fields.read();
        let field = fields
            .iter()
            .find(|f| f.external_id == id)
            .ok_or_else(|| not_found(id))?;
        Ok(serde_json::to_value(field)?)
    }

    fn list(&self) -> Result<Value> {
        let fields = self.fields.read();
        Ok(json!({ "metadata_fields": serde_json::to_value(&*fields)? }))
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApiCaller for InMemoryRegistry {
    async fn call(
        &self,
        method: Method,
        url: Url,
        payload: Option<Value>,
        _extra_headers: &[(&str, &str)],
    ) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(%method, %url, "in-memory registry request");

        let mut segments = Vec::new();
        for raw in url.path_segments().into_iter().flatten() {
            segments.push(urlencoding::decode(raw).map_err(bad_request)?.into_owned());
        }
        let position = segments
            .iter()
            .position(|s| s == "metadata_fields")
            .ok_or_else(|| api_error(404, format!("no route for {}", url.path())))?;
        let route: Vec<&str> = segments[position + 1..].iter().map(String::as_str).collect();
        let body = payload.unwrap_or(Value::Object(Map::new()));

        match (method, route.as_slice()) {
            (Method::GET, []) => self.list(),
            (Method::POST, []) => self.create(body),
            (Method::GET, [id]) => self.get(id),
            (Method::PUT, [id]) => self.update(id, body),
            (Method::DELETE, [id]) => self.delete(id),
            (Method::PUT, [id, "datasource"]) => self.update_datasource(id, body),
            (Method::DELETE, [id, "datasource"]) => self.delete_entries(id, &url),
            (method, _) => Err(api_error(404, format!("no route for {} {}", method, url.path()))),
        }
    }
}

fn find_mut<'a>(fields: &'a mut [FieldDefinition], id: &str) -> Result<&'a mut FieldDefinition> {
    fields
        .iter_mut()
        .find(|f| f.external_id == id)
        .ok_or_else(|| not_found(id))
}

/// Default values of enum and set fields must name entries of the datasource
fn check_references(field: &FieldDefinition) -> Result<()> {
    for id in field.default_entry_ids() {
        let known = field
            .datasource
            .as_ref()
            .map_or(false, |ds| ds.get(id).is_some());
        if !known {
            return Err(api_error(
                400,
                format!("default value {} is not a datasource entry", id),
            ));
        }
    }
    Ok(())
}

fn reorder(rule: ValidationRule) -> ValidationRule {
    match rule {
        ValidationRule::And { rules } => ValidationRule::And {
            rules: rules.into_iter().rev().map(reorder).collect(),
        },
        leaf => leaf,
    }
}

fn api_error(status_code: u16, message: String) -> Error {
    Error::Api {
        status_code,
        body: Some(json!({"error": {"message": message}})),
        message,
        request_id: None,
    }
}

fn bad_request(err: impl std::fmt::Display) -> Error {
    api_error(400, err.to_string())
}

fn not_found(id: &str) -> Error {
    api_error(404, format!("metadata field {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse(&format!("https://api.example.com/v1_1/demo/metadata_fields{}", path)).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let registry = InMemoryRegistry::new();
        let err = registry
            .call(Method::PATCH, url("/x"), None, &[])
            .await
            .unwrap_err();
        assert!(err.is_not_found_error());
        assert_eq!(registry.calls(), 1);
    }

    #[tokio::test]
    async fn test_reorders_and_rules() {
        let registry = InMemoryRegistry::new();
        let created = registry
            .call(
                Method::POST,
                url(""),
                Some(json!({
                    "external_id": "count",
                    "type": "integer",
                    "label": "Count",
                    "mandatory": false,
                    "validation": {"type": "and", "rules": [
                        {"type": "less_than", "value": 300, "equals": false},
                        {"type": "greater_than", "value": 50, "equals": false}
                    ]}
                })),
                &[],
            )
            .await
            .unwrap();
        assert_eq!(created["validation"]["rules"][0]["type"], "greater_than");
    }

    #[tokio::test]
    async fn test_default_must_reference_entry() {
        let registry = InMemoryRegistry::new();
        let err = registry
            .call(
                Method::POST,
                url(""),
                Some(json!({
                    "external_id": "color",
                    "type": "enum",
                    "label": "Color",
                    "mandatory": true,
                    "default_value": "missing",
                    "datasource": {"values": [{"value": "blue"}]}
                })),
                &[],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api { status_code: 400, .. }));
    }
}
