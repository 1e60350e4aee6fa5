// src/catalog/mod.rs

pub mod fits;

use serde_json::Value;
use std::{collections::HashMap, fmt, path::Path};

use crate::error::{DigestError, Result};

/// Type letters allowed in a binary-table `TFORM` code.
const TFORM_TYPES: &str = "LXBIJKAEDCMPQ";

/// A parsed `TFORM` code such as `2E`, `16A`, `J` or `1PE(100)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatCode {
    pub repeat: usize,
    pub type_code: char,
    /// Anything after the type letter, e.g. `E(100)` for a `P` descriptor.
    pub extra: String,
}

impl FormatCode {
    pub fn parse(column: &str, code: &str) -> Result<Self> {
        let bad = || DigestError::InvalidFormatCode {
            column: column.to_string(),
            code: code.to_string(),
        };
        let code_trim = code.trim();
        let digits_end = code_trim
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(bad)?;
        let repeat = if digits_end == 0 {
            1
        } else {
            code_trim[..digits_end].parse::<usize>().map_err(|_| bad())?
        };
        let mut rest = code_trim[digits_end..].chars();
        let type_code = rest
            .next()
            .map(|c| c.to_ascii_uppercase())
            .filter(|c| TFORM_TYPES.contains(*c))
            .ok_or_else(bad)?;
        Ok(Self {
            repeat,
            type_code,
            extra: rest.as_str().to_string(),
        })
    }

    /// Number of addressable elements (characters, for `A`).
    pub fn element_count(&self) -> usize {
        self.repeat
    }
}

impl fmt::Display for FormatCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.repeat != 1 {
            write!(f, "{}", self.repeat)?;
        }
        write!(f, "{}{}", self.type_code, self.extra)
    }
}

/// One column of the external binary table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogColumn {
    pub name: String,
    pub format: FormatCode,
}

/// The columns available in the external data file, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    columns: Vec<CatalogColumn>,
    by_name: HashMap<String, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column, replacing any previous column with the same name.
    pub fn insert(&mut self, name: &str, code: &str) -> Result<()> {
        let column = CatalogColumn {
            name: name.to_string(),
            format: FormatCode::parse(name, code)?,
        };
        match self.by_name.get(name) {
            Some(&i) => self.columns[i] = column,
            None => {
                self.by_name.insert(name.to_string(), self.columns.len());
                self.columns.push(column);
            }
        }
        Ok(())
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut catalog = Catalog::new();
        for (name, code) in pairs {
            catalog.insert(name, code)?;
        }
        Ok(catalog)
    }

    /// Read a JSON object of `{"NAME": "TFORM", ...}`; key order is kept.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(map) = value else {
            return Err(DigestError::Fits(
                "catalog JSON must be an object of column name to format code".to_string(),
            ));
        };
        let mut catalog = Catalog::new();
        for (name, code) in &map {
            let code = code.as_str().ok_or_else(|| DigestError::InvalidFormatCode {
                column: name.clone(),
                code: code.to_string(),
            })?;
            catalog.insert(name, code)?;
        }
        Ok(catalog)
    }

    /// Load a catalog from a FITS file, or from JSON when the path ends in `.json`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let is_json = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&std::fs::read_to_string(path)?)
        } else {
            fits::read_catalog(path)
        }
    }

    pub fn get(&self, name: &str) -> Option<&CatalogColumn> {
        self.by_name.get(name).map(|&i| &self.columns[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogColumn> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
