use std::collections::BTreeMap;
use std::collections::btree_map::Iter;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::catalog::Catalog;
use crate::projection;

/// Datasource parameters of a layer, keyed by parameter name.
///
/// The `type` parameter selects the datasource driver and decides which other
/// parameters are meaningful, see [`Catalog`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Datasource(BTreeMap<String, Value>);

impl Datasource {
    /// The datasource driver name, i.e. the `type` parameter.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.get_str("type")
    }

    /// Get a parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get a parameter if it is a string.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Set a parameter, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Whether the parameter is set.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Whether there are no parameters at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the parameters in key order.
    pub fn iter(&self) -> Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Keep only the parameters `catalog` declares valid for this datasource's type.
    ///
    /// `type` itself is kept as long as the catalog knows it. An unknown or
    /// missing type yields an empty datasource. A `postgis` datasource
    /// without a truthy `extent` gets the full extent of the projection
    /// whose definition equals `srs`, if there is one.
    #[must_use]
    pub fn filter(&self, catalog: &Catalog, srs: &str) -> Self {
        let Some(kind) = self.kind() else {
            return Self::default();
        };
        let Some(allowed) = catalog.allowed_keys(kind) else {
            return Self::default();
        };

        let mut filtered: Self = self
            .iter()
            .filter(|(key, _)| *key == "type" || allowed.contains(*key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        if kind == "postgis"
            && self.get("extent").is_none_or(is_falsy)
            && let Some(proj) = projection::find_by_srs(srs)
        {
            filtered.insert("extent", proj.extent.to_vec());
        }
        filtered
    }

    /// Make a relative `file` parameter absolute by joining it to `base`,
    /// and record `base` as the datasource base directory.
    #[must_use]
    pub fn resolve_paths(&self, base: Option<&Path>) -> Self {
        let mut resolved = self.clone();
        if let Some(base) = base
            && let Some(file) = self.get_str("file")
            && !is_absolute(file)
        {
            let file = base.join(file);
            resolved.insert("file", file.to_string_lossy().into_owned());
            resolved.insert("base", base.to_string_lossy().into_owned());
        }
        resolved
    }
}

impl FromIterator<(String, Value)> for Datasource {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Datasource {
    type Item = (&'a String, &'a Value);
    type IntoIter = Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Whether `path` is absolute, either as a unix path or with a drive letter.
#[must_use]
pub fn is_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    path.starts_with('/')
        || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n == 0.0 || n.is_nan()),
        Value::String(s) => s.is_empty(),
        Value::Sequence(_) | Value::Mapping(_) => false,
        Value::Tagged(tagged) => is_falsy(&tagged.value),
    }
}
