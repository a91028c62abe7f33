//! Datasource introspection: discover the attribute fields of a layer.
//!
//! A [`DatasourceProbe`] looks at a filtered datasource (with file paths
//! already made absolute) and reports every attribute field with its
//! primitive type. Failures are ordinary [`ProbeError`] values, it is up to
//! the caller to decide what a failed probe means.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::source::{Datasource, is_absolute};

mod csv;
mod geojson;
#[cfg(feature = "postgres")]
mod postgis;
mod shape;
mod topojson;

mod error;
pub use error::{ProbeError, ProbeResult};

/// Primitive type of an attribute field, named the way Mapnik names them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FieldType {
    /// Text, dates and anything without a more specific type
    String,
    /// Integer and floating point numbers
    Number,
    /// `true` / `false`
    Boolean,
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::String => "String",
            Self::Number => "Number",
            Self::Boolean => "Boolean",
        })
    }
}

/// Attribute field name to type.
pub type Fields = BTreeMap<String, FieldType>;

/// Reports the attribute fields of a datasource.
pub trait DatasourceProbe: Send + Sync {
    /// Introspect `datasource`.
    fn describe(&self, datasource: &Datasource) -> ProbeResult<Fields>;
}

impl<F> DatasourceProbe for F
where
    F: Fn(&Datasource) -> ProbeResult<Fields> + Send + Sync,
{
    fn describe(&self, datasource: &Datasource) -> ProbeResult<Fields> {
        self(datasource)
    }
}

/// Probe that reads the data itself, dispatching on the datasource `type`.
///
/// Supports `geojson`, `topojson`, `csv`, `shape` and, with the `postgres`
/// feature, `postgis`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinProbe;

impl DatasourceProbe for BuiltinProbe {
    fn describe(&self, datasource: &Datasource) -> ProbeResult<Fields> {
        match datasource.kind() {
            Some("geojson") => geojson::describe(datasource),
            Some("topojson") => topojson::describe(datasource),
            Some("csv") => csv::describe(datasource),
            Some("shape") => shape::describe(datasource),
            #[cfg(feature = "postgres")]
            Some("postgis") => postgis::describe(datasource),
            Some(kind) => Err(ProbeError::UnsupportedType(kind.to_string())),
            None => Err(ProbeError::MissingParameter("type")),
        }
    }
}

/// Probe that never looks at any data.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledProbe;

impl DatasourceProbe for DisabledProbe {
    fn describe(&self, _datasource: &Datasource) -> ProbeResult<Fields> {
        Err(ProbeError::Disabled)
    }
}

/// Path of the data file, joined to `base` if it is still relative.
fn data_path(datasource: &Datasource) -> ProbeResult<PathBuf> {
    let file = datasource
        .get_str("file")
        .ok_or(ProbeError::MissingParameter("file"))?;
    Ok(match datasource.get_str("base") {
        Some(base) if !is_absolute(file) => Path::new(base).join(file),
        _ => PathBuf::from(file),
    })
}

/// Text of a file based datasource and a label for error messages.
/// Inline data takes precedence over the file.
fn read_input(datasource: &Datasource) -> ProbeResult<(String, String)> {
    if let Some(inline) = datasource.get_str("inline") {
        return Ok(("inline data".to_string(), inline.to_string()));
    }
    let path = data_path(datasource)?;
    let text = fs::read_to_string(&path).map_err(|e| ProbeError::IoError(e, path.clone()))?;
    Ok((path.display().to_string(), text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datasource(yaml: &str) -> Datasource {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn unsupported_types() {
        let err = BuiltinProbe
            .describe(&datasource("{type: gdal, file: a.tif}"))
            .unwrap_err();
        assert!(matches!(err, ProbeError::UnsupportedType(ref t) if t == "gdal"));

        let err = BuiltinProbe.describe(&datasource("{}")).unwrap_err();
        assert!(matches!(err, ProbeError::MissingParameter("type")));
    }

    #[test]
    fn missing_file() {
        let err = BuiltinProbe
            .describe(&datasource("{type: geojson, file: /does/not/exist.geojson}"))
            .unwrap_err();
        assert!(matches!(err, ProbeError::IoError(..)));

        let err = BuiltinProbe
            .describe(&datasource("{type: geojson}"))
            .unwrap_err();
        assert!(matches!(err, ProbeError::MissingParameter("file")));
    }

    #[test]
    fn relative_file_uses_base() {
        let ds = datasource("{type: csv, file: points.csv, base: /data}");
        assert_eq!(data_path(&ds).unwrap(), PathBuf::from("/data/points.csv"));
        let ds = datasource("{type: csv, file: /abs/points.csv, base: /data}");
        assert_eq!(data_path(&ds).unwrap(), PathBuf::from("/abs/points.csv"));
    }

    #[test]
    fn disabled() {
        let err = DisabledProbe
            .describe(&datasource("{type: geojson, inline: '{}'}"))
            .unwrap_err();
        assert!(matches!(err, ProbeError::Disabled));
    }

    #[test]
    fn closures_are_probes() {
        let probe = |_: &Datasource| -> ProbeResult<Fields> {
            Ok(Fields::from([("name".to_string(), FieldType::String)]))
        };
        let fields = probe.describe(&Datasource::default()).unwrap();
        assert_eq!(fields["name"].to_string(), "String");
    }
}
