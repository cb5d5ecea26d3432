//! assetmeta
//!
//! Async Rust SDK for structured metadata on an asset-management admin API:
//! typed field definitions, validation rules, and the datasources behind
//! enum and set fields.
//!
//! # Example
//!
//! ```rust,no_run
//! use assetmeta::{Client, CreateFieldParams, DataSourceParams, EntryParams, FieldValue, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::new("demo", "api_key", "api_secret")?;
//!     let fields = client.metadata_fields();
//!
//!     let color = fields
//!         .add_metadata_field(
//!             CreateFieldParams::enumeration()
//!                 .external_id("color")
//!                 .label("Color")
//!                 .mandatory(true)
//!                 .default_value(FieldValue::entry("blue"))
//!                 .datasource(DataSourceParams::new([
//!                     EntryParams::with_id("Blue", "blue"),
//!                     EntryParams::with_id("Yellow", "yellow"),
//!                 ]))
//!                 .build(),
//!         )
//!         .await?;
//!
//!     fields
//!         .delete_metadata_datasource_entries(&color.external_id, &["yellow".to_string()])
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

use std::time::Duration;

pub use client::{Client, ClientConfig};
pub use datasource::{DataSource, DataSourceEntry, DataSourceParams, EntryParams, EntryState};
pub use error::Error;
pub use field::{
    CreateFieldParams, CreateFieldParamsBuilder, DeleteResult, FieldDefinition, FieldList,
    Setting, UpdateFieldParams,
};
pub use memory::InMemoryRegistry;
pub use registry::MetadataFields;
pub use transport::{ApiCaller, HttpCaller};
pub use validation::{Bound, ValidationKind, ValidationRule};
pub use value::{FieldType, FieldValue};

pub mod client;
pub mod datasource;
pub mod error;
pub mod field;
pub mod memory;
pub mod registry;
pub mod transport;
pub mod validation;
pub mod value;

/// SDK version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default admin API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.cloudinary.com/v1_1";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default max retries for reads
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Result type alias for metadata operations
pub type Result<T> = std::result::Result<T, Error>;
