// src/config.rs

/// Default TAP schema name for SDSS products.
pub const DEFAULT_SCHEMA: &str = "sdss_dr14";

/// Default SQL column holding right ascension.
pub const DEFAULT_RA: &str = "ra";

/// Settings handed to the parser when it is created.
///
/// The parser never looks at the environment or the command line; whatever
/// resolves those builds one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// TAP schema name the table is published under.
    pub schema: String,
    /// Overrides the table name found on the `CREATE TABLE` line.
    pub table: Option<String>,
    /// Schema-level description.
    pub description: String,
    /// SQL column the loader computes the derived positional columns
    /// (HTM, HEALPix, Galactic and ecliptic coordinates) from.
    pub ra: String,
}

impl Config {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: None,
            description: String::new(),
            ra: DEFAULT_RA.to_string(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_ra(mut self, column: impl Into<String>) -> Self {
        self.ra = column.into();
        self
    }

    /// Table name to publish: the override if set, otherwise the SQL name
    /// with any qualifier and brackets removed, lowercased.
    pub fn table_name(&self, sql_name: &str) -> String {
        if let Some(t) = &self.table {
            return t.clone();
        }
        sql_name
            .rsplit('.')
            .next()
            .unwrap_or(sql_name)
            .trim_matches(|c| c == '[' || c == ']' || c == '"')
            .to_ascii_lowercase()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEMA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_from_sql() {
        let cfg = Config::default();
        assert_eq!(cfg.table_name("specObjAll"), "specobjall");
        assert_eq!(cfg.table_name("dbo.specObjAll"), "specobjall");
        assert_eq!(cfg.table_name("[dbo].[PhotoObj]"), "photoobj");
    }

    #[test]
    fn test_table_override_wins() {
        let cfg = Config::new("sdss").with_table("spectra");
        assert_eq!(cfg.table_name("specObjAll"), "spectra");
    }

    #[test]
    fn test_ra_column() {
        assert_eq!(Config::default().ra, "ra");
        assert_eq!(Config::default().with_ra("plug_ra").ra, "plug_ra");
    }
}
