// src/schema/sql.rs

use super::{ColumnEntry, TapSchema};
use crate::mapping::reconcile::DERIVED_COLUMNS;
use crate::mapping::{ColumnRef, Mapping};
use crate::parse::column::NOFITS;

/// Render the table as annotated DDL that parses back to the same columns
/// and mapping.
///
/// References filled from the derived-column table are left out, since the
/// reconciler puts them back.
pub fn render_create_table(schema: &TapSchema, mapping: &Mapping) -> String {
    let mut out = String::new();
    let Some(table) = schema.table() else {
        return out;
    };

    out.push_str(&format!("CREATE TABLE {} (\n", table.qualified_name()));
    if !table.description.is_empty() {
        out.push_str(&format!("--/H {}\n", table.description));
    }
    for line in table.long_description.lines() {
        out.push_str(&format!("--/T {}\n", line));
    }

    let columns: Vec<&ColumnEntry> = schema
        .columns
        .iter()
        .filter(|c| c.table_name == table.table_name)
        .collect();
    for (i, col) in columns.iter().enumerate() {
        let comma = if i + 1 < columns.len() { "," } else { "" };
        out.push_str(&format!(
            "    {} {} NOT NULL{}",
            col.column_name,
            col.datatype.sql_type(col.size),
            comma
        ));
        let directives = column_directives(col, mapping);
        if !directives.is_empty() {
            out.push(' ');
            out.push_str(&directives);
        }
        out.push('\n');
    }
    out.push_str(");\n");
    out
}

fn column_directives(col: &ColumnEntry, mapping: &Mapping) -> String {
    let mut parts = Vec::new();
    if !col.unit.is_empty() {
        parts.push(format!("--/U {}", col.unit));
    }
    if !col.ucd.is_empty() {
        parts.push(format!("--/K {}", col.ucd));
    }
    if !col.description.is_empty() {
        parts.push(format!("--/D {}", col.description));
    }
    match mapping.get(&col.column_name) {
        Some(r) if is_derived(&col.column_name, r) => {}
        Some(ColumnRef {
            name,
            index: Some(i),
        }) => parts.push(format!("--/F {} {}", name, i)),
        Some(ColumnRef { name, index: None }) => parts.push(format!("--/F {}", name)),
        None if mapping.is_exempt(&col.column_name) => parts.push(format!("--/F {}", NOFITS)),
        None => {}
    }
    parts.join(" ")
}

fn is_derived(column: &str, reference: &ColumnRef) -> bool {
    reference.index.is_none()
        && DERIVED_COLUMNS
            .iter()
            .any(|(sql, fits)| sql.eq_ignore_ascii_case(column) && *fits == reference.name)
}
