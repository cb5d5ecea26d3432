//! Field commands

use anyhow::Context;
use assetmeta::{CreateFieldParams, FieldValue, MetadataFields, UpdateFieldParams};
use colored::Colorize;

use super::{parse_entries, parse_validation};
use crate::{output::OutputFormat, FieldCommands};

pub async fn handle(
    action: FieldCommands,
    fields: &MetadataFields,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match action {
        FieldCommands::List => {
            let list = fields.list_metadata_fields().await?.sorted_by_id();
            format.print_fields(&list.metadata_fields)?;
        }
        FieldCommands::Get { external_id } => {
            let field = fields.get_metadata_field(&external_id).await?;
            format.print_field(&field)?;
        }
        FieldCommands::Create {
            field_type,
            external_id,
            label,
            mandatory,
            default_value,
            entries,
            validation,
        } => {
            let mut builder = CreateFieldParams::builder(field_type)
                .external_id(external_id)
                .label(label)
                .mandatory(mandatory);
            if let Some(raw) = default_value {
                let value = FieldValue::parse(field_type, &raw)
                    .with_context(|| format!("invalid default value {:?}", raw))?;
                builder = builder.default_value(value);
            }
            if !entries.is_empty() {
                builder = builder.datasource(parse_entries(&entries));
            }
            if let Some(raw) = validation {
                builder = builder.validation(parse_validation(&raw)?);
            }

            let field = fields.add_metadata_field(builder.build()).await?;
            println!("{} {}", "Created field:".green(), field.external_id);
            format.print_field(&field)?;
        }
        FieldCommands::Update {
            external_id,
            field_type,
            label,
            mandatory,
            default_value,
            clear_default,
            validation,
            clear_validation,
        } => {
            let mut params = UpdateFieldParams::new(field_type);
            if let Some(label) = label {
                params = params.label(label);
            }
            if let Some(mandatory) = mandatory {
                params = params.mandatory(mandatory);
            }
            if let Some(raw) = default_value {
                let value = FieldValue::parse(field_type, &raw)
                    .with_context(|| format!("invalid default value {:?}", raw))?;
                params = params.default_value(value);
            } else if clear_default {
                params = params.clear_default_value();
            }
            if let Some(raw) = validation {
                params = params.validation(parse_validation(&raw)?);
            } else if clear_validation {
                params = params.clear_validation();
            }
            if params.is_empty() {
                anyhow::bail!("nothing to update");
            }

            let field = fields.update_metadata_field(&external_id, params).await?;
            println!("{} {}", "Updated field:".green(), field.external_id);
            format.print_field(&field)?;
        }
        FieldCommands::Delete { external_id } => {
            let result = fields.delete_metadata_field(&external_id).await?;
            if result.is_ok() {
                println!("{} {}", "Deleted field:".green(), external_id);
            } else {
                println!("{}", result.message);
            }
        }
    }
    Ok(())
}
