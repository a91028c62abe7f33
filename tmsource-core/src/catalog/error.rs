use std::io;
use std::path::PathBuf;

/// A convenience [`Result`] for catalog loading.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur while loading a capability catalog.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("Unable to read datasource reference {1}: {0}")]
    IoError(#[source] io::Error, PathBuf),

    /// The catalog file is not a valid reference document.
    #[error("Unable to parse datasource reference {1}: {0}")]
    ParseError(#[source] serde_yaml::Error, PathBuf),

    /// A reference document given as text is not valid.
    #[error("Invalid datasource reference: {0}")]
    InvalidReference(#[source] serde_yaml::Error),
}
