pub mod column;
pub mod ddl;
pub mod directive;

pub use column::{map_sql_type, parse_column_metadata, ColumnMetadata};
pub use ddl::{parse_sql, DdlParser, LineKind, ParsedSql, ParserState};
pub use directive::{tokenize, Directive};
