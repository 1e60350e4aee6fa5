pub mod sql;
pub mod types;
pub mod write;

pub use sql::render_create_table;
pub use types::{
    ColumnEntry, Datatype, KeyColumnEntry, KeyEntry, SchemaEntry, TableEntry, TapSchema,
};
pub use write::{merge_tap_json, merge_tap_schema, write_mapping_json, write_tap_json};
