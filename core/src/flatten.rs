//! Flatten/unflatten codec between nested values and dotted paths.
//!
//! A mapping key extends the path with `.key`, a list element with `[i]`:
//! `{"a": [{"b": 1}]}` flattens to the single entry `a[0].b = 1`. `Null`
//! leaves and empty containers produce no entries, so they do not survive a
//! round trip; everything else does.
//!
//! Keys containing `.`, `[` or `]` cannot be represented.
//!
//! # Examples
//!
//! ```
//! use mdschema_core::{flatten, unflatten, Value};
//! use serde_json::json;
//!
//! let record = Value::from(json!({"title": "T", "author": [{"name": "A"}, {"name": "B"}]}));
//! let paths: Vec<String> = flatten(&record).map(|e| e.path).collect();
//! assert_eq!(paths, ["title", "author[0].name", "author[1].name"]);
//!
//! let rebuilt = unflatten(flatten(&record).map(|e| e.into_owned())).unwrap();
//! assert_eq!(rebuilt, record);
//! ```

use std::fmt::Write as _;

use crate::error::CodecError;
use crate::value::{Map, Value};

/// One flattened leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatEntry<'a> {
    /// Dotted path with `[i]` list suffixes; empty for a scalar root.
    pub path: String,
    pub value: &'a Value,
}

impl FlatEntry<'_> {
    pub fn into_owned(self) -> (String, Value) {
        (self.path, self.value.clone())
    }
}

/// Lazy depth-first walk over the leaves of a value, in key insertion order.
///
/// A clone continues from the same position. Call [`flatten`] again to
/// restart from the root.
#[derive(Debug, Clone)]
pub struct Flatten<'a> {
    stack: Vec<(String, &'a Value)>,
}

/// Flattens `value` into `(path, leaf)` entries.
pub fn flatten(value: &Value) -> Flatten<'_> {
    Flatten {
        stack: vec![(String::new(), value)],
    }
}

impl<'a> Iterator for Flatten<'a> {
    type Item = FlatEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((path, value)) = self.stack.pop() {
            match value {
                Value::Null => {}
                Value::Map(map) => {
                    for (key, child) in map.iter().rev() {
                        let child_path = if path.is_empty() {
                            key.to_string()
                        } else {
                            format!("{path}.{key}")
                        };
                        self.stack.push((child_path, child));
                    }
                }
                Value::List(items) => {
                    for (i, child) in items.iter().enumerate().rev() {
                        self.stack.push((format!("{path}[{i}]"), child));
                    }
                }
                leaf => return Some(FlatEntry { path, value: leaf }),
            }
        }
        None
    }
}

/// One step of a parsed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<'p> {
    Key(&'p str),
    Index(usize),
}

/// Splits a path into key and index steps.
///
/// ```
/// use mdschema_core::flatten::{parse_path, Step};
///
/// assert_eq!(
///     parse_path("a[0].b").unwrap(),
///     vec![Step::Key("a"), Step::Index(0), Step::Key("b")]
/// );
/// assert!(parse_path("a..b").is_err());
/// ```
pub fn parse_path(path: &str) -> Result<Vec<Step<'_>>, CodecError> {
    let invalid = || CodecError::InvalidPath(path.to_string());
    let mut steps = Vec::new();
    if path.is_empty() {
        return Ok(steps);
    }
    for (i, segment) in path.split('.').enumerate() {
        let (key, mut rest) = match segment.find('[') {
            Some(pos) => segment.split_at(pos),
            None => (segment, ""),
        };
        if key.contains(']') {
            return Err(invalid());
        }
        if key.is_empty() {
            // Only a root list may start without a key.
            if i > 0 || rest.is_empty() {
                return Err(invalid());
            }
        } else {
            steps.push(Step::Key(key));
        }
        while !rest.is_empty() {
            let inner = rest.strip_prefix('[').ok_or_else(invalid)?;
            let end = inner.find(']').ok_or_else(invalid)?;
            let index = inner[..end].parse::<usize>().map_err(|_| invalid())?;
            steps.push(Step::Index(index));
            rest = &inner[end + 1..];
        }
    }
    Ok(steps)
}

/// Renders steps back into path syntax.
pub fn format_path(steps: &[Step<'_>]) -> String {
    let mut path = String::new();
    for step in steps {
        match step {
            Step::Key(key) => {
                if !path.is_empty() {
                    path.push('.');
                }
                path.push_str(key);
            }
            Step::Index(i) => {
                let _ = write!(path, "[{i}]");
            }
        }
    }
    path
}

/// Rebuilds a nested value from `(path, leaf)` entries.
///
/// Intermediate mappings and lists are created on demand; lists grow with
/// `Null` placeholders so that entries may arrive in any order.
///
/// # Errors
///
/// Returns [`CodecError::InvalidPath`] for malformed paths and
/// [`CodecError::PathConflict`] when entries disagree about the structure or
/// the same leaf is written twice. No entries yield an empty mapping.
pub fn unflatten<I, S>(entries: I) -> Result<Value, CodecError>
where
    I: IntoIterator<Item = (S, Value)>,
    S: AsRef<str>,
{
    let mut root = Value::Null;
    for (path, value) in entries {
        let path = path.as_ref();
        let steps = parse_path(path)?;
        insert(&mut root, &steps, value, path)?;
    }
    Ok(match root {
        Value::Null => Value::Map(Map::new()),
        other => other,
    })
}

fn conflict(path: &str, reason: impl Into<String>) -> CodecError {
    CodecError::PathConflict {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn insert(root: &mut Value, steps: &[Step<'_>], value: Value, path: &str) -> Result<(), CodecError> {
    let mut slot = root;
    for step in steps {
        slot = match *step {
            Step::Key(key) => {
                if slot.is_null() {
                    *slot = Value::Map(Map::new());
                }
                match slot {
                    Value::Map(map) => map.slot(key),
                    other => {
                        return Err(conflict(
                            path,
                            format!("key '{key}' under a {}", other.type_name()),
                        ));
                    }
                }
            }
            Step::Index(index) => {
                if slot.is_null() {
                    *slot = Value::List(Vec::new());
                }
                match slot {
                    Value::List(items) => {
                        if items.len() <= index {
                            items.resize(index + 1, Value::Null);
                        }
                        &mut items[index]
                    }
                    other => {
                        return Err(conflict(
                            path,
                            format!("index [{index}] under a {}", other.type_name()),
                        ));
                    }
                }
            }
        };
    }
    if !slot.is_null() {
        return Err(conflict(path, "value written twice"));
    }
    *slot = value;
    Ok(())
}
