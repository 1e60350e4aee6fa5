//! Turn annotated SDSS-style `CREATE TABLE` files into TAP catalog metadata
//! and a SQL column → FITS column mapping.
//!
//! ── How it works ──
//!  • `parse` feeds the SQL through a line-at-a-time state machine; `--/X`
//!    directives in trailing comments carry descriptions, units, UCDs and
//!    FITS references.
//!  • `mapping::map_columns` checks every reference against the columns of
//!    the FITS binary table, repairs known spelling differences, fills in
//!    derived columns and reports catalog columns that will not be loaded.
//!  • `schema` holds the TAP records and their JSON / SQL writers.

pub mod catalog;
pub mod config;
pub mod error;
pub mod mapping;
pub mod parse;
pub mod schema;

pub use catalog::Catalog;
pub use config::Config;
pub use error::{DigestError, Result};
pub use mapping::{map_columns, ColumnRef, Diagnostic, Mapping};
pub use parse::{parse_sql, DdlParser, ParsedSql};
pub use schema::TapSchema;

use tracing::{info, warn};

/// Result of a full parse + reconcile run.
#[derive(Debug, Clone)]
pub struct Digest {
    pub schema: TapSchema,
    pub mapping: Mapping,
    pub diagnostics: Vec<Diagnostic>,
    /// Catalog column the RA column reads from, if it is mapped.
    pub ra: Option<ColumnRef>,
}

/// Parse `sql` and reconcile its mapping against `catalog`.
pub fn digest(config: Config, sql: &str, catalog: &Catalog) -> Result<Digest> {
    let ra_column = config.ra.clone();
    let ParsedSql {
        schema,
        mut mapping,
    } = parse_sql(config, sql)?;
    let diagnostics = map_columns(&schema.columns, &mut mapping, catalog)?;

    let ra = mapping.get(&ra_column).cloned();
    let derived = diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::Derived { .. }));
    if ra.is_none() && derived {
        warn!(
            ra = %ra_column,
            "RA column has no FITS counterpart; derived positional columns cannot be computed"
        );
    }

    info!(
        columns = schema.columns.len(),
        mapped = mapping.len(),
        dropped = diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::Dropped { .. }))
            .count(),
        "digest complete"
    );
    Ok(Digest {
        schema,
        mapping,
        diagnostics,
        ra,
    })
}
