//! The optional configuration file.
//!
//! ```yaml
//! # capability catalog to filter datasources with, instead of the built-in one
//! catalog: ${TMSOURCE_HOME}/reference.json
//! # set to false to skip datasource introspection
//! introspect: true
//! ```

use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use subst::VariableMap;
use tmsource_core::catalog::Catalog;
use tmsource_core::source::Normalizer;
use tracing::{info, warn};

use crate::TmResult;
use crate::loader::Pipeline;

pub mod env;

mod error;
pub use error::{ConfigFileError, ConfigFileResult};

/// Configuration keys that are not recognized, with their values.
pub type UnrecognizedValues = HashMap<String, serde_yaml::Value>;
/// Names of configuration keys that are not recognized.
pub type UnrecognizedKeys = HashSet<String>;

#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Capability catalog file in the `mapnik-reference` format, JSON or YAML.
    /// The built-in catalog is used if not set.
    pub catalog: Option<PathBuf>,

    /// Introspect datasources to discover the fields of each layer (default: true)
    pub introspect: Option<bool>,

    #[serde(flatten)]
    pub unrecognized: UnrecognizedValues,
}

impl Config {
    /// Warn about every unrecognized key and return them.
    pub fn finalize(&mut self) -> UnrecognizedKeys {
        let res: UnrecognizedKeys = self.unrecognized.keys().cloned().collect();
        for key in &res {
            warn!(
                "Ignoring unrecognized configuration key '{key}'. Please check your configuration file for typos."
            );
        }
        res
    }

    /// The pipeline described by this configuration.
    pub fn pipeline(&self) -> TmResult<Pipeline> {
        let catalog = match &self.catalog {
            Some(path) => {
                info!("Using capability catalog {}", path.display());
                Catalog::from_file(path)?
            }
            None => Catalog::builtin(),
        };
        let normalizer = Normalizer::new(catalog);
        let normalizer = if self.introspect.unwrap_or(true) {
            normalizer
        } else {
            info!("Datasource introspection is disabled");
            normalizer.without_introspection()
        };
        Ok(Pipeline::new(normalizer))
    }

    pub fn save_to_file(&self, file_name: &Path) -> ConfigFileResult<()> {
        let yaml = serde_yaml::to_string(&self)
            .map_err(|e| ConfigFileError::ConfigSerializeError(e, file_name.to_path_buf()))?;
        if file_name.as_os_str() == OsStr::new("-") {
            info!("Current configuration:");
            println!("\n\n{yaml}\n");
            Ok(())
        } else {
            info!(
                "Saving config to {}, use --config to load it",
                file_name.display()
            );
            File::create(file_name)
                .map_err(|e| ConfigFileError::ConfigWriteError(e, file_name.to_path_buf()))?
                .write_all(yaml.as_bytes())
                .map_err(|e| ConfigFileError::ConfigWriteError(e, file_name.to_path_buf()))?;
            Ok(())
        }
    }
}

/// Read a configuration file, substituting `${VAR}` references from `env`.
pub fn read_config<'a, M>(file_name: &Path, env: &'a M) -> ConfigFileResult<Config>
where
    M: VariableMap<'a>,
    M::Value: AsRef<str>,
{
    let contents = fs::read_to_string(file_name)
        .map_err(|e| ConfigFileError::ConfigLoadError(e, file_name.into()))?;
    parse_config(&contents, env, file_name)
}

pub fn parse_config<'a, M>(contents: &str, env: &'a M, file_name: &Path) -> ConfigFileResult<Config>
where
    M: VariableMap<'a>,
    M::Value: AsRef<str>,
{
    subst::yaml::from_str(contents, env)
        .map_err(|e| ConfigFileError::ConfigParseError(e, file_name.into()))
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::io::Write as _;

    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use tmsource_core::source::Datasource;

    use super::*;
    use crate::config::env::FauxEnv;

    #[test]
    fn parse_empty_config() {
        let config = parse_config("{}", &FauxEnv::default(), Path::new("test.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn substitutes_env_vars() {
        let env = FauxEnv([("REF_DIR", OsString::from("/opt/reference"))].into());
        let yaml = indoc! {"
            catalog: ${REF_DIR}/datasources.json
            introspect: false
        "};
        let config = parse_config(yaml, &env, Path::new("test.yaml")).unwrap();
        assert_eq!(
            config.catalog,
            Some(PathBuf::from("/opt/reference/datasources.json"))
        );
        assert_eq!(config.introspect, Some(false));
    }

    #[test]
    fn missing_env_var_is_a_parse_error() {
        let err = parse_config(
            "catalog: ${NOT_SET}/a.json",
            &FauxEnv::default(),
            Path::new("test.yaml"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigFileError::ConfigParseError(..)));
    }

    #[test]
    #[tracing_test::traced_test]
    fn warns_about_unrecognized_keys() {
        let mut config = parse_config(
            "introspect: true\nintrospekt: false\n",
            &FauxEnv::default(),
            Path::new("test.yaml"),
        )
        .unwrap();
        let keys = config.finalize();
        assert_eq!(keys, UnrecognizedKeys::from(["introspekt".to_string()]));
        assert!(logs_contain("Ignoring unrecognized configuration key 'introspekt'"));
    }

    #[test]
    fn missing_file() {
        let err = read_config(Path::new("/does/not/exist.yaml"), &FauxEnv::default()).unwrap_err();
        assert!(matches!(err, ConfigFileError::ConfigLoadError(..)));
    }

    #[test]
    fn pipeline_uses_catalog_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(b"datasources:\n  csv:\n    file: {}\n").unwrap();
        let config = Config {
            catalog: Some(file.path().to_path_buf()),
            ..Config::default()
        };
        let pipeline = config.pipeline().unwrap();
        let catalog = pipeline.normalizer().catalog();
        assert_eq!(catalog.types().collect::<Vec<_>>(), ["csv"]);

        let ds: Datasource = serde_yaml::from_str("{type: csv, file: a.csv, separator: ';'}").unwrap();
        assert_eq!(ds.filter(catalog, "").len(), 2);
    }

    #[test]
    fn pipeline_with_missing_catalog() {
        let config = Config {
            catalog: Some(PathBuf::from("/does/not/exist.json")),
            ..Config::default()
        };
        assert!(config.pipeline().is_err());
    }

    #[test]
    fn save_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let config = Config {
            introspect: Some(false),
            ..Config::default()
        };
        config.save_to_file(&path).unwrap();
        assert_eq!(read_config(&path, &FauxEnv::default()).unwrap(), config);
    }
}
