// src/schema/types.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// TAP column datatypes produced by the SQL type table.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Datatype {
    Integer,
    Real,
    Double,
    Character,
}

impl Datatype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Datatype::Integer => "integer",
            Datatype::Real => "real",
            Datatype::Double => "double",
            Datatype::Character => "character",
        }
    }

    /// SQL spelling used when writing the table back out.
    pub fn sql_type(&self, size: usize) -> String {
        match self {
            Datatype::Integer => "int".to_string(),
            Datatype::Real => "real".to_string(),
            Datatype::Double => "float".to_string(),
            Datatype::Character => format!("varchar({})", size),
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of `tap_schema.schemas`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq)]
pub struct SchemaEntry {
    pub schema_name: String,
    pub description: String,
    pub utype: String,
}

/// One row of `tap_schema.tables`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq)]
pub struct TableEntry {
    pub schema_name: String,
    pub table_name: String,
    pub table_type: String,
    /// Short description, from `--/H`.
    pub description: String,
    /// Long description, from `--/T` lines joined with newlines.
    #[serde(default)]
    pub long_description: String,
    pub utype: String,
}

impl TableEntry {
    pub fn new(schema_name: &str, table_name: &str) -> Self {
        Self {
            schema_name: schema_name.to_string(),
            table_name: table_name.to_string(),
            table_type: "table".to_string(),
            description: String::new(),
            long_description: String::new(),
            utype: String::new(),
        }
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema_name, self.table_name)
    }

    pub fn append_long_description(&mut self, text: &str) {
        if !self.long_description.is_empty() {
            self.long_description.push('\n');
        }
        self.long_description.push_str(text);
    }
}

/// One row of `tap_schema.columns`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq)]
pub struct ColumnEntry {
    pub table_name: String,
    pub column_name: String,
    pub description: String,
    pub unit: String,
    pub ucd: String,
    pub utype: String,
    pub datatype: Datatype,
    pub size: usize,
    pub principal: u8,
    pub indexed: u8,
    pub std: u8,
}

impl ColumnEntry {
    pub fn new(table_name: &str, column_name: &str, datatype: Datatype, size: usize) -> Self {
        Self {
            table_name: table_name.to_string(),
            column_name: column_name.to_string(),
            description: String::new(),
            unit: String::new(),
            ucd: String::new(),
            utype: String::new(),
            datatype,
            size,
            principal: 0,
            indexed: 0,
            std: 0,
        }
    }
}

/// One row of `tap_schema.keys`. Nothing in the directive grammar creates
/// these yet.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq)]
pub struct KeyEntry {
    pub key_id: String,
    pub from_table: String,
    pub target_table: String,
    pub description: String,
    pub utype: String,
}

/// One row of `tap_schema.key_columns`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq)]
pub struct KeyColumnEntry {
    pub key_id: String,
    pub from_column: String,
    pub target_column: String,
}

/// The catalog-metadata record for a parse session.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq, Default)]
pub struct TapSchema {
    pub schemas: Vec<SchemaEntry>,
    pub tables: Vec<TableEntry>,
    pub columns: Vec<ColumnEntry>,
    pub keys: Vec<KeyEntry>,
    pub key_columns: Vec<KeyColumnEntry>,
}

impl TapSchema {
    pub fn table(&self) -> Option<&TableEntry> {
        self.tables.first()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnEntry> {
        self.columns
            .iter()
            .find(|c| c.column_name.eq_ignore_ascii_case(name))
    }
}
