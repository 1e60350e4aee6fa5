// src/schema/write.rs

use serde::Serialize;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::debug;

use super::TapSchema;
use crate::error::Result;
use crate::mapping::Mapping;

/// Pretty-print `value` to `path` atomically: write a hidden temp file next
/// to it, then rename over the original.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.json".to_string());
    let tmp_path: PathBuf = dir.join(format!(".{}.tmp", file_name));

    let mut tmp = fs::File::create(&tmp_path)?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.write_all(b"\n")?;
    drop(tmp);

    fs::rename(&tmp_path, path)?;
    debug!(path = %path.display(), "wrote JSON");
    Ok(())
}

/// Write the TAP record as a standalone JSON document.
pub fn write_tap_json(path: &Path, schema: &TapSchema) -> Result<()> {
    write_json_atomic(path, schema)
}

/// Write the final column mapping as a JSON object.
pub fn write_mapping_json(path: &Path, mapping: &Mapping) -> Result<()> {
    write_json_atomic(path, mapping)
}

/// Fold `new` into `existing`: entries for the same schema and the same
/// qualified table are replaced, everything else is kept in place.
pub fn merge_tap_schema(existing: TapSchema, new: &TapSchema) -> TapSchema {
    let new_tables: Vec<(String, String)> = new
        .tables
        .iter()
        .map(|t| (t.schema_name.clone(), t.table_name.clone()))
        .collect();
    let qualified: Vec<String> = new.tables.iter().map(|t| t.qualified_name()).collect();
    let replaced_table = |schema: &str, table: &str| {
        new_tables
            .iter()
            .any(|(s, t)| s == schema && t == table)
    };

    // column rows carry the bare table name, so they belong to a replaced
    // table only when no surviving table shares that name
    let kept_names: Vec<String> = existing
        .tables
        .iter()
        .filter(|t| !replaced_table(&t.schema_name, &t.table_name))
        .map(|t| t.table_name.clone())
        .collect();
    let replaced_column = |table: &str| {
        new_tables.iter().any(|(_, t)| t == table) && !kept_names.iter().any(|t| t == table)
    };

    let mut merged = existing;
    merged
        .schemas
        .retain(|s| !new.schemas.iter().any(|n| n.schema_name == s.schema_name));
    merged.schemas.extend(new.schemas.iter().cloned());

    merged
        .tables
        .retain(|t| !replaced_table(&t.schema_name, &t.table_name));
    merged.tables.extend(new.tables.iter().cloned());

    merged.columns.retain(|c| !replaced_column(&c.table_name));
    merged.columns.extend(new.columns.iter().cloned());

    merged
        .keys
        .retain(|k| !qualified.contains(&k.from_table) && !qualified.contains(&k.target_table));
    let kept_keys: Vec<&str> = merged.keys.iter().map(|k| k.key_id.as_str()).collect();
    let new_keys: Vec<&str> = new.keys.iter().map(|k| k.key_id.as_str()).collect();
    merged
        .key_columns
        .retain(|kc| kept_keys.contains(&kc.key_id.as_str()) && !new_keys.contains(&kc.key_id.as_str()));
    merged.keys.extend(new.keys.iter().cloned());
    merged.key_columns.extend(new.key_columns.iter().cloned());

    merged
}

/// Read, merge and write back a TAP JSON document at `path`. A missing file
/// starts from an empty record.
pub fn merge_tap_json(path: &Path, schema: &TapSchema) -> Result<()> {
    let existing: TapSchema = if path.exists() {
        let f = fs::File::open(path)?;
        serde_json::from_reader(f)?
    } else {
        TapSchema::default()
    };
    let merged = merge_tap_schema(existing, schema);
    debug!(
        tables = merged.tables.len(),
        columns = merged.columns.len(),
        "merged TAP record"
    );
    write_json_atomic(path, &merged)
}
