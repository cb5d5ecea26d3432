//! Metadata field registry operations
//!
//! Every operation is a single request/response exchange. Identifiers are
//! checked before anything is sent; server errors are passed through as
//! [`Error::Api`].

use tracing::instrument;
use url::Url;

use crate::client::Client;
use crate::datasource::{DataSource, DataSourceParams};
use crate::field::{CreateFieldParams, DeleteResult, FieldDefinition, FieldList, UpdateFieldParams};
use crate::{Error, Result};

const DATASOURCE: &str = "datasource";

/// Metadata fields service
#[derive(Clone)]
pub struct MetadataFields {
    client: Client,
}

impl MetadataFields {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a new metadata field definition
    #[instrument(skip_all, fields(external_id = %params.external_id, field_type = %params.field_type))]
    pub async fn add_metadata_field(&self, params: CreateFieldParams) -> Result<FieldDefinition> {
        params.check()?;
        let url = self.client.metadata_fields_url(&[])?;
        self.client.post(url, serde_json::to_value(&params)?).await
    }

    /// All metadata field definitions, in no particular order
    #[instrument(skip_all)]
    pub async fn list_metadata_fields(&self) -> Result<FieldList> {
        let url = self.client.metadata_fields_url(&[])?;
        self.client.get(url).await
    }

    /// A single metadata field definition
    #[instrument(skip(self))]
    pub async fn get_metadata_field(&self, field_external_id: &str) -> Result<FieldDefinition> {
        let url = self.field_url(field_external_id, false)?;
        self.client.get(url).await
    }

    /// Partially update a metadata field. Only the properties set in `params`
    /// are sent; the field type and external id cannot change.
    #[instrument(skip(self, params))]
    pub async fn update_metadata_field(
        &self,
        field_external_id: &str,
        params: UpdateFieldParams,
    ) -> Result<FieldDefinition> {
        let url = self.field_url(field_external_id, false)?;
        params.check()?;
        self.client.put(url, serde_json::to_value(&params)?).await
    }

    /// Upsert datasource entries of an enum or set field.
    ///
    /// Entries with a known external id get the new value and keep their
    /// state; the rest are appended. Returns the whole datasource after the merge.
    #[instrument(skip(self, params), fields(entries = params.values.len()))]
    pub async fn update_metadata_datasource_entries(
        &self,
        field_external_id: &str,
        params: DataSourceParams,
    ) -> Result<DataSource> {
        let url = self.field_url(field_external_id, true)?;
        params.check()?;
        self.client.put(url, serde_json::to_value(&params)?).await
    }

    /// Delete a metadata field definition. It no longer shows up in listings.
    #[instrument(skip(self))]
    pub async fn delete_metadata_field(&self, field_external_id: &str) -> Result<DeleteResult> {
        let url = self.field_url(field_external_id, false)?;
        self.client.delete(url).await
    }

    /// Mark datasource entries inactive. Returns only the targeted entries.
    #[instrument(skip(self))]
    pub async fn delete_metadata_datasource_entries(
        &self,
        field_external_id: &str,
        entries_external_ids: &[String],
    ) -> Result<DataSource> {
        let mut url = self.field_url(field_external_id, true)?;
        if entries_external_ids.is_empty() {
            return Err(Error::missing("entries_external_ids"));
        }
        {
            let mut query = url.query_pairs_mut();
            for id in entries_external_ids {
                query.append_pair("external_ids[]", id);
            }
        }
        self.client.delete(url).await
    }

    fn field_url(&self, field_external_id: &str, datasource: bool) -> Result<Url> {
        if field_external_id.is_empty() {
            return Err(Error::missing("field_external_id"));
        }
        if datasource {
            self.client
                .metadata_fields_url(&[field_external_id, DATASOURCE])
        } else {
            self.client.metadata_fields_url(&[field_external_id])
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::ClientConfig;
    use crate::memory::InMemoryRegistry;

    fn fields() -> (Arc<InMemoryRegistry>, MetadataFields) {
        let registry = Arc::new(InMemoryRegistry::new());
        let client = Client::with_caller(ClientConfig::new("demo", "key", "secret"), registry.clone());
        (registry, client.metadata_fields())
    }

    #[test]
    fn test_field_urls() {
        let (_, fields) = fields();
        assert_eq!(
            fields.field_url("color", false).unwrap().as_str(),
            "https://api.cloudinary.com/v1_1/demo/metadata_fields/color"
        );
        assert_eq!(
            fields.field_url("a b/c", true).unwrap().as_str(),
            "https://api.cloudinary.com/v1_1/demo/metadata_fields/a%20b%2Fc/datasource"
        );
        assert!(fields.field_url("", true).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_empty_ids_are_rejected_before_sending() {
        let (registry, fields) = fields();
        tokio_test::block_on(async {
            assert!(fields.get_metadata_field("").await.is_err());
            assert!(fields
                .update_metadata_field("", UpdateFieldParams::new(crate::FieldType::String).label("x"))
                .await
                .unwrap_err()
                .is_invalid_argument());
            assert!(fields
                .update_metadata_datasource_entries("", DataSourceParams::default())
                .await
                .unwrap_err()
                .is_invalid_argument());
            assert!(fields
                .delete_metadata_datasource_entries("", &["a".to_string()])
                .await
                .unwrap_err()
                .is_invalid_argument());
        });
        assert_eq!(registry.calls(), 0);
    }
}
