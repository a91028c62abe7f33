use std::io;
use std::path::PathBuf;

use tmsource_core::catalog::CatalogError;
use tmsource_core::source::NormalizeError;
use tmsource_core::stylesheet::AssembleError;

use crate::config::ConfigFileError;
use crate::loader::DelegateError;

/// A convenience [`Result`] for the tmsource crate.
pub type TmResult<T> = Result<T, TmError>;

/// Every error carries the locator of the project it happened in.
#[derive(thiserror::Error, Debug)]
pub enum TmError {
    #[error("Invalid locator '{0}': {1}")]
    InvalidLocator(String, String),

    #[error("No loader is registered for the protocol of '{0}'")]
    UnknownProtocol(String),

    #[error("Unable to read {1}: {0}")]
    Load(#[source] io::Error, String),

    #[error("Unable to parse the document of {1}: {0}")]
    Parse(#[source] serde_yaml::Error, String),

    #[error("Unable to normalize {1}: {0}")]
    Normalize(#[source] NormalizeError, String),

    #[error("Unable to build the stylesheet of {1}: {0}")]
    Assemble(#[source] AssembleError, String),

    #[error("Unable to render {1}: {0}")]
    Render(#[source] DelegateError, String),

    #[error(transparent)]
    ConfigFileError(#[from] ConfigFileError),

    #[error(transparent)]
    CatalogError(#[from] CatalogError),

    #[error("Unable to serialize {1}: {0}")]
    YamlError(#[source] serde_yaml::Error, String),

    #[error("Unable to serialize {1}: {0}")]
    JsonError(#[source] serde_json::Error, String),

    #[error("Unable to write output to {1}: {0}")]
    OutputWriteError(#[source] io::Error, PathBuf),
}
