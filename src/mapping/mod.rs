// src/mapping/mod.rs

pub mod reconcile;

pub use reconcile::{map_columns, Diagnostic};

use serde::{Serialize, Serializer};
use std::{collections::BTreeSet, fmt, str::FromStr};

/// A reference from a SQL column to a catalog column, optionally to one
/// slot of an array column. Displays as `NAME` or `NAME[index]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub name: String,
    pub index: Option<usize>,
}

impl ColumnRef {
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
        }
    }

    pub fn slot(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index: Some(index),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}[{}]", self.name, i),
            None => f.write_str(&self.name),
        }
    }
}

impl FromStr for ColumnRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.strip_suffix(']').and_then(|rest| rest.split_once('[')) {
            Some((name, idx)) => {
                let index = idx
                    .parse::<usize>()
                    .map_err(|_| format!("bad slot index in reference `{s}`"))?;
                Ok(ColumnRef::slot(name, index))
            }
            None if s.is_empty() => Err("empty column reference".to_string()),
            None => Ok(ColumnRef::scalar(s)),
        }
    }
}

impl Serialize for ColumnRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Lowercased SQL column name → catalog reference, in insertion order,
/// plus the set of columns marked `NOFITS`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    entries: Vec<(String, ColumnRef)>,
    exempt: BTreeSet<String>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the reference for `column`.
    pub fn insert(&mut self, column: &str, reference: ColumnRef) {
        let key = column.to_ascii_lowercase();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, r)) => *r = reference,
            None => self.entries.push((key, reference)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&ColumnRef> {
        let key = column.to_ascii_lowercase();
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, r)| r)
    }

    /// Record that `column` deliberately has no catalog counterpart.
    pub fn exempt(&mut self, column: &str) {
        self.exempt.insert(column.to_ascii_lowercase());
    }

    pub fn is_exempt(&self, column: &str) -> bool {
        self.exempt.contains(&column.to_ascii_lowercase())
    }

    pub fn exemptions(&self) -> impl Iterator<Item = &str> {
        self.exempt.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnRef)> {
        self.entries.iter().map(|(k, r)| (k.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a mapping from `(column, "NAME[i]")` pairs.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut m = Mapping::new();
        for (col, reference) in pairs {
            m.insert(col, reference.parse()?);
        }
        Ok(m)
    }
}

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(k, r)| (k, r)))
    }
}
