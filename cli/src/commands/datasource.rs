//! Datasource commands

use assetmeta::MetadataFields;
use colored::Colorize;

use super::parse_entries;
use crate::{output::OutputFormat, DatasourceCommands};

pub async fn handle(
    action: DatasourceCommands,
    fields: &MetadataFields,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match action {
        DatasourceCommands::Update {
            external_id,
            entries,
        } => {
            let datasource = fields
                .update_metadata_datasource_entries(&external_id, parse_entries(&entries))
                .await?;
            format.print_entries(&datasource.values)?;
        }
        DatasourceCommands::Delete {
            external_id,
            entry_ids,
        } => {
            let deactivated = fields
                .delete_metadata_datasource_entries(&external_id, &entry_ids)
                .await?;
            println!(
                "{} {} entries of {}",
                "Deactivated".yellow(),
                deactivated.len(),
                external_id
            );
            format.print_entries(&deactivated.values)?;
        }
    }
    Ok(())
}
