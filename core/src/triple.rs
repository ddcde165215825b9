//! Mapping between flat entries and `(name, value, unit)` storage triples.
//!
//! The storage name is the entry path with list indices removed, under a
//! prefix. List positions move to the `unit` as dot-joined 1-based
//! integers. Two layouts exist:
//!
//! - [`UnitLayout::ListIndices`]: one component per list index, root to
//!   leaf. `a[0].b.c` becomes `prefix.a.b.c` with unit `"1"`; paths without
//!   indices have no unit.
//! - [`UnitLayout::CompositeLevels`]: one component per non-leaf segment
//!   (`1` when the segment is not indexed) and the leaf index dropped.
//!   `a.b.c` becomes unit `"1.1"` and `e.f[0]` unit `"1"`. This is the layout
//!   of older stores; it cannot tell a composite from a one-element list of
//!   composites.
//!
//! Decoding needs the schema to know which segments are lists, see
//! [`FieldLookup`].

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::CodecError;
use crate::fields::{CompositeField, SchemaField};
use crate::flatten::{FlatEntry, Step, flatten, format_path, parse_path, unflatten};
use crate::value::Value;

/// One attribute as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageTriple {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub unit: Option<String>,
}

impl StorageTriple {
    pub fn new(name: impl Into<String>, value: impl Into<String>, unit: Option<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            unit,
        }
    }
}

impl fmt::Display for StorageTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.value)?;
        if let Some(unit) = &self.unit {
            write!(f, " [{unit}]")?;
        }
        Ok(())
    }
}

/// How list positions are encoded in the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitLayout {
    #[default]
    ListIndices,
    CompositeLevels,
}

/// Schema knowledge needed to decode units.
pub trait FieldLookup {
    /// Number of list levels of the field at `path` (subfield names from the
    /// root), or `None` when no such field exists.
    fn index_depth(&self, path: &[&str]) -> Option<usize>;
}

impl FieldLookup for CompositeField {
    fn index_depth(&self, path: &[&str]) -> Option<usize> {
        self.resolve(path).map(SchemaField::index_depth)
    }
}

/// Encodes one flat entry under `prefix`.
///
/// # Errors
///
/// Fails for a scalar root (no name segment), a non-scalar leaf, and paths
/// the layout cannot express.
pub fn encode(prefix: &str, entry: &FlatEntry<'_>, layout: UnitLayout) -> Result<StorageTriple, CodecError> {
    let steps = parse_path(&entry.path)?;
    let value = entry
        .value
        .to_storage_string()
        .ok_or_else(|| CodecError::NotScalar(entry.path.clone()))?;
    let keys: Vec<&str> = steps
        .iter()
        .filter_map(|s| match s {
            Step::Key(k) => Some(*k),
            Step::Index(_) => None,
        })
        .collect();
    if keys.is_empty() {
        return Err(CodecError::UnsupportedPath(entry.path.clone()));
    }
    let units = match layout {
        UnitLayout::ListIndices => steps
            .iter()
            .filter_map(|s| match s {
                Step::Index(i) => Some(i + 1),
                Step::Key(_) => None,
            })
            .collect(),
        UnitLayout::CompositeLevels => composite_levels(&steps, &entry.path)?,
    };
    let unit = (!units.is_empty()).then(|| join_unit(&units));
    Ok(StorageTriple {
        name: format!("{prefix}.{}", keys.join(".")),
        value,
        unit,
    })
}

fn composite_levels(steps: &[Step<'_>], path: &str) -> Result<Vec<usize>, CodecError> {
    let unsupported = || CodecError::UnsupportedPath(path.to_string());
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for step in steps {
        match step {
            Step::Key(_) => groups.push(Vec::new()),
            Step::Index(i) => groups.last_mut().ok_or_else(unsupported)?.push(*i),
        }
    }
    let (leaf, parents) = groups.split_last().ok_or_else(unsupported)?;
    if leaf.len() > 1 {
        return Err(unsupported());
    }
    parents
        .iter()
        .map(|indices| match indices.as_slice() {
            [] => Ok(1),
            [i] => Ok(i + 1),
            _ => Err(unsupported()),
        })
        .collect()
}

fn join_unit(units: &[usize]) -> String {
    units
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

fn parse_unit(triple: &StorageTriple) -> Result<Vec<usize>, CodecError> {
    let Some(unit) = triple.unit.as_deref().filter(|u| !u.is_empty()) else {
        return Ok(Vec::new());
    };
    unit.split('.')
        .map(|c| match c.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(CodecError::InvalidUnit {
                name: triple.name.clone(),
                unit: unit.to_string(),
            }),
        })
        .collect()
}

/// Flattens `value` and encodes every entry under `prefix`.
pub fn to_triples(prefix: &str, value: &Value, layout: UnitLayout) -> Result<Vec<StorageTriple>, CodecError> {
    flatten(value)
        .map(|entry| encode(prefix, &entry, layout))
        .collect()
}

/// Turns triples back into flat entries, consulting the schema.
///
/// The decoder is stateful under [`UnitLayout::CompositeLevels`]: list
/// positions of leaves are not stored, so repeated leaves are numbered in
/// the order they are decoded.
#[derive(Debug)]
pub struct TripleDecoder<'a, L: ?Sized> {
    prefix: &'a str,
    layout: UnitLayout,
    lookup: &'a L,
    counters: HashMap<String, usize>,
    max_index: usize,
}

impl<'a, L: FieldLookup + ?Sized> TripleDecoder<'a, L> {
    pub fn new(prefix: &'a str, layout: UnitLayout, lookup: &'a L) -> Self {
        Self {
            prefix,
            layout,
            lookup,
            counters: HashMap::new(),
            max_index: usize::MAX,
        }
    }

    /// Rejects unit components above `limit`. A dense list of `n` elements
    /// needs at least `n` triples, so the number of triples being decoded
    /// bounds every valid index.
    pub fn with_max_index(mut self, limit: usize) -> Self {
        self.max_index = limit;
        self
    }

    /// Decodes one triple into a `(path, text value)` entry.
    ///
    /// Triples outside the prefix or naming no schema field yield `None` and
    /// a [`DiagnosticKind::UnresolvedTriple`] note.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidUnit`] for units that are not positive
    /// integers, [`CodecError::IndexOutOfRange`] for components above the
    /// configured limit and [`CodecError::UnitMismatch`] when their count
    /// does not fit the field structure.
    pub fn decode(
        &mut self,
        triple: &StorageTriple,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<(String, Value)>, CodecError> {
        let keys: Option<Vec<&str>> = triple
            .name
            .strip_prefix(self.prefix)
            .and_then(|rest| rest.strip_prefix('.'))
            .map(|rest| rest.split('.').collect());
        let Some(keys) = keys.filter(|k| k.iter().all(|s| !s.is_empty())) else {
            diagnostics.push(DiagnosticKind::UnresolvedTriple, &triple.name, "outside the schema prefix");
            return Ok(None);
        };

        let mut depths = Vec::with_capacity(keys.len());
        for i in 0..keys.len() {
            match self.lookup.index_depth(&keys[..=i]) {
                Some(depth) => depths.push(depth),
                None => {
                    diagnostics.push(
                        DiagnosticKind::UnresolvedTriple,
                        &triple.name,
                        "no matching field in the schema",
                    );
                    return Ok(None);
                }
            }
        }

        let units = parse_unit(triple)?;
        if units.iter().any(|&u| u > self.max_index) {
            return Err(CodecError::IndexOutOfRange {
                name: triple.name.clone(),
                unit: triple.unit.clone().unwrap_or_default(),
                limit: self.max_index,
            });
        }
        let mismatch = || CodecError::UnitMismatch {
            name: triple.name.clone(),
            unit: triple.unit.clone().unwrap_or_default(),
        };
        let mut steps = Vec::with_capacity(keys.len() + units.len());
        match self.layout {
            UnitLayout::ListIndices => {
                if units.len() != depths.iter().sum::<usize>() {
                    return Err(mismatch());
                }
                let mut units = units.into_iter();
                for (key, depth) in keys.iter().zip(&depths) {
                    steps.push(Step::Key(*key));
                    for unit in units.by_ref().take(*depth) {
                        steps.push(Step::Index(unit - 1));
                    }
                }
            }
            UnitLayout::CompositeLevels => {
                if units.len() + 1 != keys.len() {
                    return Err(mismatch());
                }
                for (key, unit) in keys.iter().zip(&units) {
                    steps.push(Step::Key(*key));
                    steps.push(Step::Index(unit - 1));
                }
                let leaf = keys[keys.len() - 1];
                steps.push(Step::Key(leaf));
                if depths[depths.len() - 1] > 0 {
                    let counter = self.counters.entry(format_path(&steps)).or_insert(0);
                    steps.push(Step::Index(*counter));
                    *counter += 1;
                }
            }
        }
        Ok(Some((format_path(&steps), Value::Text(triple.value.clone()))))
    }
}

/// Decodes `triples` and rebuilds the nested value (leaves are text).
pub fn from_triples<'t, L, I>(
    prefix: &str,
    layout: UnitLayout,
    lookup: &L,
    triples: I,
    diagnostics: &mut Diagnostics,
) -> Result<Value, CodecError>
where
    L: FieldLookup + ?Sized,
    I: IntoIterator<Item = &'t StorageTriple>,
{
    let triples: Vec<&StorageTriple> = triples.into_iter().collect();
    let mut decoder = TripleDecoder::new(prefix, layout, lookup).with_max_index(triples.len());
    let mut entries = Vec::new();
    for triple in triples {
        if let Some(entry) = decoder.decode(triple, diagnostics)? {
            entries.push(entry);
        }
    }
    unflatten(entries)
}
