//! Output formatting

use assetmeta::{DataSourceEntry, FieldDefinition};
use clap::ValueEnum;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "EXTERNAL ID")]
    external_id: String,
    #[tabled(rename = "TYPE")]
    field_type: String,
    #[tabled(rename = "LABEL")]
    label: String,
    #[tabled(rename = "MANDATORY")]
    mandatory: String,
    #[tabled(rename = "DEFAULT")]
    default_value: String,
    #[tabled(rename = "VALIDATION")]
    validation: String,
}

impl From<&FieldDefinition> for FieldRow {
    fn from(field: &FieldDefinition) -> Self {
        Self {
            external_id: field.external_id.clone(),
            field_type: field.field_type.to_string(),
            label: field.label.clone(),
            mandatory: if field.mandatory { "yes" } else { "no" }.into(),
            default_value: field
                .default_value
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            validation: field
                .validation
                .as_ref()
                .and_then(|rule| serde_json::to_string(rule).ok())
                .unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "EXTERNAL ID")]
    external_id: String,
    #[tabled(rename = "VALUE")]
    value: String,
    #[tabled(rename = "STATE")]
    state: String,
}

impl From<&DataSourceEntry> for EntryRow {
    fn from(entry: &DataSourceEntry) -> Self {
        Self {
            external_id: entry.external_id.clone(),
            value: entry.value.clone(),
            state: entry.state.to_string(),
        }
    }
}

impl OutputFormat {
    /// Print structured data; `Table` falls back to pretty JSON
    pub fn print<T: Serialize>(&self, data: &T) -> anyhow::Result<()> {
        match self {
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(data)?),
            OutputFormat::Json | OutputFormat::Table => {
                println!("{}", serde_json::to_string_pretty(data)?)
            }
        }
        Ok(())
    }

    pub fn print_fields(&self, fields: &[FieldDefinition]) -> anyhow::Result<()> {
        match self {
            OutputFormat::Table => {
                println!("{}", field_table(fields));
                Ok(())
            }
            _ => self.print(&fields),
        }
    }

    pub fn print_field(&self, field: &FieldDefinition) -> anyhow::Result<()> {
        match self {
            OutputFormat::Table => {
                println!("{}", field_table(std::slice::from_ref(field)));
                if let Some(datasource) = &field.datasource {
                    println!("{}", entry_table(&datasource.values));
                }
                Ok(())
            }
            _ => self.print(field),
        }
    }

    pub fn print_entries(&self, entries: &[DataSourceEntry]) -> anyhow::Result<()> {
        match self {
            OutputFormat::Table => {
                println!("{}", entry_table(entries));
                Ok(())
            }
            _ => self.print(&entries),
        }
    }
}

fn field_table(fields: &[FieldDefinition]) -> String {
    Table::new(fields.iter().map(FieldRow::from))
        .with(Style::rounded())
        .to_string()
}

fn entry_table(entries: &[DataSourceEntry]) -> String {
    Table::new(entries.iter().map(EntryRow::from))
        .with(Style::rounded())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetmeta::{EntryState, FieldType, FieldValue};

    #[test]
    fn test_field_table_lists_every_field() {
        let fields = vec![
            FieldDefinition {
                external_id: "count".into(),
                field_type: FieldType::Integer,
                label: "Count".into(),
                mandatory: true,
                default_value: Some(FieldValue::Integer(5)),
                validation: None,
                datasource: None,
            },
            FieldDefinition {
                external_id: "title".into(),
                field_type: FieldType::String,
                label: "Title".into(),
                mandatory: false,
                default_value: None,
                validation: None,
                datasource: None,
            },
        ];
        let table = field_table(&fields);
        assert!(table.contains("EXTERNAL ID"));
        assert!(table.contains("count"));
        assert!(table.contains("title"));
        assert!(table.contains("integer"));
    }

    #[test]
    fn test_entry_table_shows_state() {
        let entries = vec![DataSourceEntry {
            external_id: "external_id_1".into(),
            value: "blue".into(),
            state: EntryState::Inactive,
        }];
        let table = entry_table(&entries);
        assert!(table.contains("blue"));
        assert!(table.contains("inactive"));
    }
}
