// src/mapping/reconcile.rs

use std::{collections::HashSet, fmt};
use tracing::{debug, info, instrument, warn};

use super::{ColumnRef, Mapping};
use crate::catalog::{Catalog, CatalogColumn};
use crate::error::{DigestError, Result};
use crate::schema::ColumnEntry;

/// SQL columns computed by the loader, and the catalog column each is
/// filled from when the SQL gives no `F` directive. Entries whose catalog
/// column exists are added to the mapping even when the SQL does not
/// declare the column.
pub const DERIVED_COLUMNS: &[(&str, &str)] = &[
    ("htm9", "HTM9"),
    ("ring256", "ring256"),
    ("nest4096", "nest4096"),
    ("glon", "g_lon"),
    ("glat", "g_lat"),
    ("elon", "e_lon"),
    ("elat", "e_lat"),
];

/// Spellings tried, in order, when a slot reference names a catalog column
/// that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameRule {
    /// `MAGIVAR` ↔ `MAG_IVAR`.
    IgnoreUnderscores,
}

pub const SLOT_FALLBACKS: &[NameRule] = &[NameRule::IgnoreUnderscores];

impl NameRule {
    fn matches(&self, wanted: &str, candidate: &str) -> bool {
        match self {
            NameRule::IgnoreUnderscores => {
                let strip = |s: &str| s.chars().filter(|c| *c != '_').collect::<String>();
                strip(wanted) == strip(candidate)
            }
        }
    }
}

/// Non-fatal events from a reconciliation pass, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A slot reference was moved to a differently spelled catalog column.
    Renamed {
        column: String,
        from: ColumnRef,
        to: ColumnRef,
    },
    /// An unmapped column was filled from the derived-column table.
    Derived { column: String, reference: ColumnRef },
    /// A catalog column nothing refers to.
    Dropped { catalog_column: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Renamed { column, from, to } => {
                write!(f, "Mapping {} to FITS column {} instead of {}.", column, to, from)
            }
            Diagnostic::Derived { column, reference } => {
                write!(f, "Mapping derived column {} to FITS column {}.", column, reference)
            }
            Diagnostic::Dropped { catalog_column } => {
                write!(f, "FITS column {} will be dropped from SQL!", catalog_column)
            }
        }
    }
}

/// Complete and check `mapping` against the catalog.
///
/// Every column must end up mapped to an existing catalog column (with the
/// slot index inside the column's element count) or be exempt. Fails on the
/// first column that cannot be resolved; `mapping` keeps whatever was
/// rewritten up to that point. Derived columns present in the catalog are
/// then filled in, and unreferenced catalog columns are reported last.
#[instrument(level = "debug", skip_all, fields(columns = columns.len(), catalog = catalog.len()))]
pub fn map_columns(
    columns: &[ColumnEntry],
    mapping: &mut Mapping,
    catalog: &Catalog,
) -> Result<Vec<Diagnostic>> {
    let mut diagnostics = Vec::new();

    for col in columns {
        let name = &col.column_name;
        match mapping.get(name).cloned() {
            Some(reference) => {
                let resolved = resolve(&reference, catalog)
                    .ok_or_else(|| not_found(name))?;
                if resolved != reference {
                    let d = Diagnostic::Renamed {
                        column: name.to_ascii_lowercase(),
                        from: reference,
                        to: resolved.clone(),
                    };
                    info!("{}", d);
                    diagnostics.push(d);
                    mapping.insert(name, resolved);
                }
            }
            None if mapping.is_exempt(name) => {
                debug!(column = %name, "no FITS counterpart by request");
            }
            None => {
                let reference = derived_reference(name, catalog).ok_or_else(|| not_found(name))?;
                let d = Diagnostic::Derived {
                    column: name.to_ascii_lowercase(),
                    reference: reference.clone(),
                };
                info!("{}", d);
                diagnostics.push(d);
                mapping.insert(name, reference);
            }
        }
    }

    for (sql, fits) in DERIVED_COLUMNS {
        if !catalog.contains(fits) || mapping.get(sql).is_some() || mapping.is_exempt(sql) {
            continue;
        }
        let d = Diagnostic::Derived {
            column: sql.to_string(),
            reference: ColumnRef::scalar(*fits),
        };
        info!("{}", d);
        diagnostics.push(d);
        mapping.insert(sql, ColumnRef::scalar(*fits));
    }

    let used: HashSet<&str> = mapping.iter().map(|(_, r)| r.name.as_str()).collect();
    for c in catalog.iter().filter(|c| !used.contains(c.name.as_str())) {
        let d = Diagnostic::Dropped {
            catalog_column: c.name.clone(),
        };
        warn!("{}", d);
        diagnostics.push(d);
    }

    Ok(diagnostics)
}

fn not_found(column: &str) -> DigestError {
    DigestError::MappingNotFound {
        column: column.to_string(),
    }
}

/// The catalog column `reference` really points at, if any.
fn resolve(reference: &ColumnRef, catalog: &Catalog) -> Option<ColumnRef> {
    let Some(index) = reference.index else {
        return catalog
            .contains(&reference.name)
            .then(|| reference.clone());
    };

    let holds = |c: &CatalogColumn| c.format.element_count() > index;
    if let Some(c) = catalog.get(&reference.name) {
        return holds(c).then(|| reference.clone());
    }

    SLOT_FALLBACKS.iter().find_map(|rule| {
        catalog
            .iter()
            .find(|&c| rule.matches(&reference.name, &c.name) && holds(c))
            .map(|c| ColumnRef::slot(c.name.clone(), index))
    })
}

fn derived_reference(column: &str, catalog: &Catalog) -> Option<ColumnRef> {
    DERIVED_COLUMNS
        .iter()
        .find(|(sql, _)| sql.eq_ignore_ascii_case(column))
        .filter(|(_, fits)| catalog.contains(fits))
        .map(|(_, fits)| ColumnRef::scalar(*fits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Datatype;

    fn columns(names: &[&str]) -> Vec<ColumnEntry> {
        names
            .iter()
            .map(|n| ColumnEntry::new("spectra", n, Datatype::Real, 1))
            .collect()
    }

    fn schema_columns(extra: &[&str]) -> Vec<ColumnEntry> {
        let mut names = vec!["mag_u", "mag_g", "magivar_u", "magivar_g"];
        names.extend_from_slice(extra);
        columns(&names)
    }

    fn catalog() -> Catalog {
        Catalog::from_pairs([
            ("e_lon", "D"),
            ("e_lat", "D"),
            ("g_lon", "D"),
            ("g_lat", "D"),
            ("HTM9", "J"),
            ("ring256", "J"),
            ("nest4096", "J"),
            ("MAG", "2E"),
            ("MAG_IVAR", "2E"),
            ("FOOBAR", "16A"),
        ])
        .unwrap()
    }

    fn base_mapping() -> Mapping {
        Mapping::from_pairs([
            ("mag_u", "MAG[0]"),
            ("mag_g", "MAG[1]"),
            ("magivar_u", "MAGIVAR[0]"),
            ("magivar_g", "MAGIVAR[1]"),
        ])
        .unwrap()
    }

    fn as_strings(m: &Mapping) -> Vec<(String, String)> {
        m.iter().map(|(k, r)| (k.to_string(), r.to_string())).collect()
    }

    #[test]
    fn test_map_columns() {
        let mut mapping = base_mapping();
        let diags = map_columns(&schema_columns(&[]), &mut mapping, &catalog()).unwrap();

        let expected: Vec<(String, String)> = [
            ("mag_u", "MAG[0]"),
            ("mag_g", "MAG[1]"),
            ("magivar_u", "MAG_IVAR[0]"),
            ("magivar_g", "MAG_IVAR[1]"),
            ("htm9", "HTM9"),
            ("ring256", "ring256"),
            ("nest4096", "nest4096"),
            ("glon", "g_lon"),
            ("glat", "g_lat"),
            ("elon", "e_lon"),
            ("elat", "e_lat"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(as_strings(&mapping), expected);

        let dropped: Vec<_> = diags
            .iter()
            .filter(|d| matches!(d, Diagnostic::Dropped { .. }))
            .collect();
        assert_eq!(dropped.len(), 1);
        assert_eq!(
            diags.last().unwrap().to_string(),
            "FITS column FOOBAR will be dropped from SQL!"
        );
        assert!(diags.contains(&Diagnostic::Renamed {
            column: "magivar_u".to_string(),
            from: ColumnRef::slot("MAGIVAR", 0),
            to: ColumnRef::slot("MAG_IVAR", 0),
        }));
    }

    #[test]
    fn test_derived_fill_skips_mapped_and_exempt() {
        let mut mapping = base_mapping();
        mapping.insert("glon", ColumnRef::scalar("e_lon"));
        mapping.exempt("ring256");
        let diags = map_columns(&schema_columns(&[]), &mut mapping, &catalog()).unwrap();

        assert_eq!(mapping.get("glon").unwrap().to_string(), "e_lon");
        assert!(mapping.get("ring256").is_none());
        let derived: Vec<_> = diags
            .iter()
            .filter_map(|d| match d {
                Diagnostic::Derived { column, .. } => Some(column.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(derived, ["htm9", "nest4096", "glat", "elon", "elat"]);
        let dropped: Vec<_> = diags
            .iter()
            .filter_map(|d| match d {
                Diagnostic::Dropped { catalog_column } => Some(catalog_column.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(dropped, ["g_lon", "ring256", "FOOBAR"]);
    }

    #[test]
    fn test_underscores_removed_from_reference() {
        let cat = Catalog::from_pairs([("MAGIVAR", "2E")]).unwrap();
        let mut mapping = Mapping::from_pairs([("magivar_u", "MAG_IVAR[0]")]).unwrap();
        let diags = map_columns(&columns(&["magivar_u"]), &mut mapping, &cat).unwrap();
        assert_eq!(mapping.get("magivar_u").unwrap().to_string(), "MAGIVAR[0]");
        assert_eq!(
            diags,
            vec![Diagnostic::Renamed {
                column: "magivar_u".to_string(),
                from: ColumnRef::slot("MAG_IVAR", 0),
                to: ColumnRef::slot("MAGIVAR", 0),
            }]
        );
    }

    #[test]
    fn test_first_matching_spelling_wins() {
        let cat = Catalog::from_pairs([("MAG_IVAR", "2E"), ("MAGI_VAR", "2E")]).unwrap();
        let mut mapping = Mapping::from_pairs([("magivar_g", "MAGIVAR[1]")]).unwrap();
        let diags = map_columns(&columns(&["magivar_g"]), &mut mapping, &cat).unwrap();
        assert_eq!(mapping.get("magivar_g").unwrap().to_string(), "MAG_IVAR[1]");
        assert_eq!(
            diags.last(),
            Some(&Diagnostic::Dropped {
                catalog_column: "MAGI_VAR".to_string()
            })
        );

        // a spelling too narrow for the slot is passed over
        let cat = Catalog::from_pairs([("MAG_IVAR", "E"), ("MAGI_VAR", "2E")]).unwrap();
        let mut mapping = Mapping::from_pairs([("magivar_g", "MAGIVAR[1]")]).unwrap();
        map_columns(&columns(&["magivar_g"]), &mut mapping, &cat).unwrap();
        assert_eq!(mapping.get("magivar_g").unwrap().to_string(), "MAGI_VAR[1]");
    }

    #[test]
    fn test_missing_catalog_column() {
        let mut mapping = base_mapping();
        mapping.insert("flux_u", ColumnRef::slot("FLUX", 0));
        mapping.insert("flux_g", ColumnRef::slot("FLUX", 1));
        let cols = schema_columns(&["flux_u", "flux_g"]);

        let err = map_columns(&cols, &mut mapping, &catalog()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Could not find a FITS column corresponding to flux_u!"
        );
        // rewrites made before the failure stay visible
        assert_eq!(mapping.get("magivar_u").unwrap().to_string(), "MAG_IVAR[0]");
    }

    #[test]
    fn test_unmapped_column_without_derived_name() {
        let mut cat = catalog();
        cat.insert("FLUX", "2E").unwrap();
        let mut mapping = base_mapping();
        mapping.insert("flux_u", ColumnRef::slot("FLUX", 0));
        mapping.insert("flux_g", ColumnRef::slot("FLUX", 1));
        let cols = schema_columns(&["flux_u", "flux_g", "z"]);

        let err = map_columns(&cols, &mut mapping, &cat).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Could not find a FITS column corresponding to z!"
        );
    }

    #[test]
    fn test_slot_out_of_range() {
        let cat = Catalog::from_pairs([("MAG", "2E"), ("SN_MEDIAN", "5E")]).unwrap();
        let mut mapping = Mapping::from_pairs([("mag_i", "MAG[2]")]).unwrap();
        let err = map_columns(&columns(&["mag_i"]), &mut mapping, &cat).unwrap_err();
        assert!(matches!(err, DigestError::MappingNotFound { ref column } if column == "mag_i"));

        // fallback spelling must also hold the slot
        let cat = Catalog::from_pairs([("MAG_IVAR", "2E")]).unwrap();
        let mut mapping = Mapping::from_pairs([("magivar_z", "MAGIVAR[4]")]).unwrap();
        assert!(map_columns(&columns(&["magivar_z"]), &mut mapping, &cat).is_err());
    }

    #[test]
    fn test_scalar_reference_must_match_exactly() {
        let cat = Catalog::from_pairs([("PLUG_RA", "D")]).unwrap();
        let mut mapping = Mapping::from_pairs([("ra", "PLUGRA")]).unwrap();
        let err = map_columns(&columns(&["ra"]), &mut mapping, &cat).unwrap_err();
        assert!(matches!(err, DigestError::MappingNotFound { .. }));

        let mut mapping = Mapping::from_pairs([("ra", "PLUG_RA")]).unwrap();
        let diags = map_columns(&columns(&["ra"]), &mut mapping, &cat).unwrap();
        assert!(diags.is_empty());
    }

    #[test]
    fn test_exempt_columns_skip_lookup() {
        let cat = Catalog::from_pairs([("RA", "D")]).unwrap();
        let mut mapping = Mapping::from_pairs([("ra", "RA")]).unwrap();
        mapping.exempt("loadVersion");
        let cols = columns(&["ra", "loadVersion"]);
        let diags = map_columns(&cols, &mut mapping, &cat).unwrap();
        assert!(diags.is_empty());
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn test_explicit_reference_beats_derived_table() {
        let cat = Catalog::from_pairs([("HTM9", "J"), ("HTM_ID", "K")]).unwrap();
        let mut mapping = Mapping::from_pairs([("htm9", "HTM_ID")]).unwrap();
        let diags = map_columns(&columns(&["htm9"]), &mut mapping, &cat).unwrap();
        assert_eq!(mapping.get("htm9").unwrap().to_string(), "HTM_ID");
        assert_eq!(
            diags,
            vec![Diagnostic::Dropped {
                catalog_column: "HTM9".to_string()
            }]
        );
    }

    #[test]
    fn test_derived_needs_catalog_column() {
        let cat = Catalog::from_pairs([("g_lon", "D")]).unwrap();
        let mut mapping = Mapping::new();
        let err = map_columns(&columns(&["glon", "glat"]), &mut mapping, &cat).unwrap_err();
        assert_eq!(err.to_string(), "Could not find a FITS column corresponding to glat!");
        assert_eq!(mapping.get("glon").unwrap().to_string(), "g_lon");
    }
}
