// src/parse/ddl.rs

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument, trace};

use super::column::{map_sql_type, parse_column_metadata};
use super::directive::tokenize;
use crate::config::Config;
use crate::error::{DigestError, Result};
use crate::mapping::Mapping;
use crate::schema::{ColumnEntry, SchemaEntry, TableEntry, TapSchema};

static TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^\s*CREATE\s+TABLE\s+([\w.\[\]"]+)\s*\("#).unwrap()
});
static COLUMN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(\w+)\s+(\w+)\s*(?:\(\s*(\d+)\s*\))?\s+NOT\s+NULL\s*,?(.*)$").unwrap()
});
static CLOSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\)\s*;?\s*$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// No table open.
    Idle,
    /// Header seen; column lines are accepted.
    InTable,
}

/// How a line was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    TableHeader,
    Column,
    Close,
    /// Directive-only line applied to the open table.
    TableDirective,
    Ignored,
}

/// What a finished parse hands to the reconciler and the writers.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSql {
    pub schema: TapSchema,
    pub mapping: Mapping,
}

/// Line-at-a-time parser for annotated `CREATE TABLE` files.
///
/// Owns the accumulated schema and mapping; lines must be fed in file order.
#[derive(Debug)]
pub struct DdlParser {
    config: Config,
    state: ParserState,
    schema: TapSchema,
    mapping: Mapping,
}

impl DdlParser {
    pub fn new(config: Config) -> Self {
        let schema = TapSchema {
            schemas: vec![SchemaEntry {
                schema_name: config.schema.clone(),
                description: config.description.clone(),
                utype: String::new(),
            }],
            ..TapSchema::default()
        };
        Self {
            config,
            state: ParserState::Idle,
            schema,
            mapping: Mapping::new(),
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn schema(&self) -> &TapSchema {
        &self.schema
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Feed the next line of the file.
    pub fn parse_line(&mut self, line: &str) -> Result<LineKind> {
        if let Some(caps) = TABLE_RE.captures(line) {
            self.open_table(&caps[1], line)?;
            return Ok(LineKind::TableHeader);
        }

        if self.state == ParserState::Idle {
            trace!(line = %line, "ignoring line outside a table");
            return Ok(LineKind::Ignored);
        }

        if CLOSE_RE.is_match(line) {
            debug!("closing table");
            self.state = ParserState::Idle;
            return Ok(LineKind::Close);
        }

        if let Some(caps) = COLUMN_RE.captures(line) {
            let length = caps
                .get(3)
                .and_then(|m| m.as_str().parse::<usize>().ok());
            let comment = caps.get(4).map_or("", |m| m.as_str());
            self.add_column(&caps[1], &caps[2], length, comment)?;
            return Ok(LineKind::Column);
        }

        if self.apply_table_directives(line) {
            return Ok(LineKind::TableDirective);
        }

        trace!(line = %line, "ignoring line");
        Ok(LineKind::Ignored)
    }

    /// Hand over everything accumulated so far.
    pub fn finish(self) -> ParsedSql {
        ParsedSql {
            schema: self.schema,
            mapping: self.mapping,
        }
    }

    fn open_table(&mut self, sql_name: &str, line: &str) -> Result<()> {
        if let Some(existing) = self.schema.tables.first() {
            return Err(DigestError::TableRedefined {
                table: existing.table_name.clone(),
            });
        }
        let table_name = self.config.table_name(sql_name);
        debug!(sql_name = %sql_name, table = %table_name, "opening table");
        self.schema
            .tables
            .push(TableEntry::new(&self.config.schema, &table_name));
        self.state = ParserState::InTable;
        self.apply_table_directives(line);
        Ok(())
    }

    fn add_column(
        &mut self,
        name: &str,
        sql_type: &str,
        length: Option<usize>,
        comment: &str,
    ) -> Result<()> {
        let table_name = self.current_table_name();
        let (datatype, size) =
            map_sql_type(sql_type, length).ok_or_else(|| DigestError::UnsupportedTypeToken {
                column: name.to_string(),
                token: match length {
                    Some(n) => format!("{}({})", sql_type, n),
                    None => sql_type.to_string(),
                },
            })?;
        if self.schema.column(name).is_some() {
            return Err(DigestError::DuplicateColumn {
                table: table_name,
                column: name.to_string(),
            });
        }

        let (meta, reference) = parse_column_metadata(name, comment);
        let mut column = ColumnEntry::new(&table_name, name, datatype, size);
        column.description = meta.description;
        column.unit = meta.unit;
        column.ucd = meta.ucd;
        trace!(column = %name, datatype = %datatype, size, "parsed column");
        self.schema.columns.push(column);

        match reference {
            Some(r) => self.mapping.insert(name, r),
            None if meta.nofits => self.mapping.exempt(name),
            None => {}
        }
        Ok(())
    }

    /// Apply `H` and `T` directives found on `line` to the open table.
    fn apply_table_directives(&mut self, line: &str) -> bool {
        let Some(table) = self.schema.tables.last_mut() else {
            return false;
        };
        let mut applied = false;
        for d in tokenize(line) {
            match d.tag {
                'H' => {
                    table.description = d.value.to_string();
                    applied = true;
                }
                'T' => {
                    table.append_long_description(d.value);
                    applied = true;
                }
                other => trace!(tag = %other, "ignoring table directive"),
            }
        }
        applied
    }

    fn current_table_name(&self) -> String {
        self.schema
            .tables
            .last()
            .map(|t| t.table_name.clone())
            .unwrap_or_default()
    }
}

/// Parse a whole annotated SQL document.
#[instrument(level = "debug", skip(config, contents), fields(content_len = contents.len()))]
pub fn parse_sql(config: Config, contents: &str) -> Result<ParsedSql> {
    let mut parser = DdlParser::new(config);
    for line in contents.lines() {
        parser.parse_line(line)?;
    }
    let parsed = parser.finish();
    debug!(
        columns = parsed.schema.columns.len(),
        mapped = parsed.mapping.len(),
        "finished SQL parsing"
    );
    Ok(parsed)
}
