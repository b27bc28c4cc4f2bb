//! API schema model, loading and `$ref` resolution

pub mod loader;
pub mod model;
pub mod refs;
pub mod source;

pub use loader::{field_from_schema, parse_document};
pub use model::*;
pub use refs::SchemaError;
pub use source::{
    fetch_schema, find_schema_file, load_schema, load_schema_file, FileSchemaCache, SchemaCache,
};
