// src/parse/column.rs

use tracing::{debug, trace};

use super::directive::tokenize;
use crate::mapping::ColumnRef;
use crate::schema::Datatype;

/// `F` value marking a column with no catalog counterpart.
pub const NOFITS: &str = "NOFITS";

/// SQL type token → TAP datatype. `varchar` takes its size from the
/// parenthesised length; the others are scalars.
const SQL_TYPES: &[(&str, Datatype)] = &[
    ("int", Datatype::Integer),
    ("real", Datatype::Real),
    ("float", Datatype::Double),
    ("varchar", Datatype::Character),
];

/// Map a SQL type token (and optional `(n)` length) to `(datatype, size)`.
///
/// Returns `None` for tokens outside the table, for `varchar` without a
/// length and for numeric types given one.
pub fn map_sql_type(token: &str, length: Option<usize>) -> Option<(Datatype, usize)> {
    let (_, datatype) = SQL_TYPES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(token))?;
    match (datatype, length) {
        (Datatype::Character, Some(n)) => Some((Datatype::Character, n)),
        (Datatype::Character, None) => None,
        (_, Some(_)) => None,
        (dt, None) => Some((*dt, 1)),
    }
}

/// Metadata carried by the directives of one column line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMetadata {
    pub description: String,
    pub unit: String,
    pub ucd: String,
    /// `--/F NOFITS` was given.
    pub nofits: bool,
}

/// Extract `D`, `U`, `K` and `F` directives from a column's comment.
///
/// Later duplicates of a tag overwrite earlier ones. Any other tag is
/// ignored. The reference is `None` both for `F NOFITS` and when no `F`
/// directive is present; `nofits` tells the two apart.
pub fn parse_column_metadata(
    column_name: &str,
    comment: &str,
) -> (ColumnMetadata, Option<ColumnRef>) {
    let mut meta = ColumnMetadata::default();
    let mut reference = None;

    for d in tokenize(comment) {
        match d.tag {
            'D' => meta.description = d.value.to_string(),
            'U' => meta.unit = d.value.to_string(),
            'K' => meta.ucd = d.value.to_string(),
            'F' => {
                let (r, nofits) = parse_fits_directive(column_name, d.value);
                reference = r;
                meta.nofits = nofits;
            }
            other => {
                trace!(column = %column_name, tag = %other, "ignoring directive");
            }
        }
    }

    (meta, reference)
}

fn parse_fits_directive(column_name: &str, value: &str) -> (Option<ColumnRef>, bool) {
    let parts: Vec<&str> = value.split_whitespace().collect();
    match parts.as_slice() {
        [] => {
            debug!(column = %column_name, "empty F directive");
            (None, false)
        }
        [name] if name.eq_ignore_ascii_case(NOFITS) => (None, true),
        [name] => (Some(ColumnRef::scalar(name.to_ascii_uppercase())), false),
        [name, idx] => match idx.parse::<usize>() {
            Ok(i) => (Some(ColumnRef::slot(name.to_ascii_uppercase(), i)), false),
            Err(_) => (Some(ColumnRef::scalar(value.to_ascii_uppercase())), false),
        },
        _ => {
            debug!(column = %column_name, value = %value, "unexpected F directive; keeping it verbatim");
            (Some(ColumnRef::scalar(value.to_ascii_uppercase())), false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_and_description() {
        let (d, r) = parse_column_metadata("foo", "--/U mm --/D Random column.");
        assert_eq!(d.unit, "mm");
        assert_eq!(d.description, "Random column.");
        assert!(r.is_none());
        assert!(!d.nofits);
    }

    #[test]
    fn test_ucd_and_scalar_reference() {
        let (d, r) = parse_column_metadata("foo", "--/F bar --/K ID_CATALOG --/D Random column.");
        assert_eq!(d.ucd, "ID_CATALOG");
        assert_eq!(d.description, "Random column.");
        assert_eq!(r.unwrap().to_string(), "BAR");
    }

    #[test]
    fn test_slot_reference() {
        let (d, r) = parse_column_metadata("mag_g", "--/F mag 1 --/D Random column.");
        assert_eq!(d.description, "Random column.");
        assert_eq!(r, Some(ColumnRef::slot("MAG", 1)));
    }

    #[test]
    fn test_nofits() {
        let (d, r) =
            parse_column_metadata("extra", "--/F NOFITS --/D Random column. --/U arcsec");
        assert_eq!(d.unit, "arcsec");
        assert_eq!(d.description, "Random column.");
        assert!(r.is_none());
        assert!(d.nofits);
    }

    #[test]
    fn test_no_fits_directive() {
        let (d, r) = parse_column_metadata("flux_u", "--/U nanomaggies --/D Random column.");
        assert_eq!(d.unit, "nanomaggies");
        assert_eq!(d.description, "Random column.");
        assert!(r.is_none());
        assert!(!d.nofits);
    }

    #[test]
    fn test_last_duplicate_wins_and_unknown_ignored() {
        let (d, _) = parse_column_metadata("x", "--/D first --/X whatever --/D second");
        assert_eq!(d.description, "second");
    }

    #[test]
    fn test_defaults_are_empty() {
        let (d, r) = parse_column_metadata("x", "");
        assert_eq!(d, ColumnMetadata::default());
        assert!(r.is_none());
    }

    #[test]
    fn test_sql_type_table() {
        assert_eq!(map_sql_type("int", None), Some((Datatype::Integer, 1)));
        assert_eq!(map_sql_type("REAL", None), Some((Datatype::Real, 1)));
        assert_eq!(map_sql_type("float", None), Some((Datatype::Double, 1)));
        assert_eq!(map_sql_type("varchar", Some(16)), Some((Datatype::Character, 16)));
        assert_eq!(map_sql_type("varchar", None), None);
        assert_eq!(map_sql_type("int", Some(4)), None);
        assert_eq!(map_sql_type("bigint", None), None);
    }
}
