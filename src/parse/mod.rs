pub mod export_serializer;
pub mod import_parser;

pub use export_serializer::{SCHEMA_VERSION, serialize_export, serialize_stored};
pub use import_parser::{ImportError, parse_record};
