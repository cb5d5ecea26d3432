//! CLI Commands

pub mod config;
pub mod datasource;
pub mod fields;

use anyhow::Context;
use assetmeta::{DataSourceParams, EntryParams, ValidationRule};

/// `ID=VALUE` keeps the id, a bare `VALUE` lets the server assign one
pub fn parse_entry(raw: &str) -> EntryParams {
    match raw.split_once('=') {
        Some((id, value)) if !id.is_empty() => EntryParams::with_id(value, id),
        _ => EntryParams::new(raw),
    }
}

pub fn parse_entries(raw: &[String]) -> DataSourceParams {
    raw.iter().map(|entry| parse_entry(entry)).collect()
}

pub fn parse_validation(raw: &str) -> anyhow::Result<ValidationRule> {
    serde_json::from_str(raw).context("invalid validation rule")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry() {
        assert_eq!(parse_entry("blue=Blue"), EntryParams::with_id("Blue", "blue"));
        assert_eq!(parse_entry("Blue"), EntryParams::new("Blue"));
        assert_eq!(parse_entry("=Blue"), EntryParams::new("=Blue"));
        assert_eq!(parse_entry("eq=a=b"), EntryParams::with_id("a=b", "eq"));
    }

    #[test]
    fn test_parse_validation() {
        let rule = parse_validation(r#"{"type":"string_length","min":1,"max":10}"#).unwrap();
        assert_eq!(rule, ValidationRule::string_length(Some(1), Some(10)));
        assert!(parse_validation(r#"{"type":"regex"}"#).is_err());
    }
}
