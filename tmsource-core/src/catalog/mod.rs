//! Capability catalog: which parameters each datasource type accepts.
//!
//! The catalog is read from a document in the `mapnik-reference` shape:
//!
//! ```json
//! {"datasources": {"shape": {"file": {"type": "string"}, "encoding": {}}}}
//! ```
//!
//! Only the parameter names matter; their descriptions are ignored.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use serde::Deserialize;
use serde::de::IgnoredAny;

mod error;
pub use error::{CatalogError, CatalogResult};

static BUILTIN: LazyLock<Catalog> = LazyLock::new(|| {
    Catalog::from_reference_str(include_str!("datasources.json"))
        .expect("embedded datasource reference must be valid")
});

#[derive(Deserialize)]
struct Reference {
    datasources: BTreeMap<String, BTreeMap<String, IgnoredAny>>,
}

/// Lookup table from datasource type to the set of parameter names valid for it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Catalog {
    datasources: BTreeMap<String, BTreeSet<String>>,
}

impl Catalog {
    /// The catalog shipped with this crate.
    #[must_use]
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Parse a reference document. JSON and YAML are both accepted.
    pub fn from_reference_str(contents: &str) -> CatalogResult<Self> {
        let reference: Reference =
            serde_yaml::from_str(contents).map_err(CatalogError::InvalidReference)?;
        Ok(reference
            .datasources
            .into_iter()
            .map(|(kind, keys)| (kind, keys.into_keys()))
            .collect())
    }

    /// Read a reference document from disk.
    pub fn from_file(path: &Path) -> CatalogResult<Self> {
        let contents =
            fs::read_to_string(path).map_err(|e| CatalogError::IoError(e, path.to_path_buf()))?;
        Self::from_reference_str(&contents).map_err(|e| match e {
            CatalogError::InvalidReference(e) => CatalogError::ParseError(e, path.to_path_buf()),
            e => e,
        })
    }

    /// Parameter names valid for `kind`, or `None` if the type is unknown.
    #[must_use]
    pub fn allowed_keys(&self, kind: &str) -> Option<&BTreeSet<String>> {
        self.datasources.get(kind)
    }

    /// Whether `kind` is a known datasource type.
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.datasources.contains_key(kind)
    }

    /// Whether `key` is a valid parameter for datasources of type `kind`.
    /// Always `false` for unknown types.
    #[must_use]
    pub fn allows(&self, kind: &str, key: &str) -> bool {
        self.allowed_keys(kind).is_some_and(|keys| keys.contains(key))
    }

    /// Known datasource types, in sorted order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.datasources.keys().map(String::as_str)
    }
}

impl<K, I, S> FromIterator<(K, I)> for Catalog
where
    K: Into<String>,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, I)>>(iter: T) -> Self {
        Self {
            datasources: iter
                .into_iter()
                .map(|(kind, keys)| (kind.into(), keys.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use indoc::indoc;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::postgis("postgis", &["dbname", "table", "password", "extent", "geometry_field"])]
    #[case::shape("shape", &["file", "encoding"])]
    #[case::csv("csv", &["file", "inline", "separator", "quote", "headers"])]
    #[case::geojson("geojson", &["file", "inline"])]
    fn builtin_knows_common_parameters(#[case] kind: &str, #[case] keys: &[&str]) {
        let catalog = Catalog::builtin();
        for key in keys {
            assert!(catalog.allows(kind, key), "{kind} should allow {key}");
        }
        assert!(!catalog.allows(kind, "type"));
        assert!(!catalog.allows(kind, "not_a_parameter"));
    }

    #[test]
    fn unknown_type_allows_nothing() {
        let catalog = Catalog::builtin();
        assert!(!catalog.contains("mongodb"));
        assert!(catalog.allowed_keys("mongodb").is_none());
        assert!(!catalog.allows("mongodb", "file"));
    }

    #[test]
    fn from_pairs() {
        let catalog: Catalog = [("postgis", vec!["dbname", "table", "extent"])]
            .into_iter()
            .collect();
        assert!(catalog.allows("postgis", "dbname"));
        assert!(!catalog.allows("postgis", "password"));
        assert_eq!(catalog.types().collect::<Vec<_>>(), ["postgis"]);
    }

    #[test]
    fn from_yaml_reference() {
        let catalog = Catalog::from_reference_str(indoc! {"
            datasources:
              shape:
                file: {type: string, doc: path to the shapefile}
                encoding: {}
              csv: {}
        "})
        .unwrap();
        assert!(catalog.allows("shape", "file"));
        assert!(catalog.allows("shape", "encoding"));
        assert!(catalog.contains("csv"));
        assert!(!catalog.allows("csv", "file"));
    }

    #[test]
    fn from_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"datasources: [1, 2]").unwrap();
        let err = Catalog::from_file(file.path()).unwrap_err();
        assert!(matches!(err, CatalogError::ParseError(_, ref p) if p == file.path()));

        let missing = file.path().with_extension("missing");
        let err = Catalog::from_file(&missing).unwrap_err();
        assert!(matches!(err, CatalogError::IoError(..)));
    }
}
