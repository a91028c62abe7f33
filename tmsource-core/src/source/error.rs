/// A convenience [`Result`] for document normalization.
pub type NormalizeResult<T> = Result<T, NormalizeError>;

/// Errors that can occur while normalizing a source document.
///
/// Only the shape of the input can make normalization fail; missing keys are
/// defaulted and datasource problems are recovered from.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum NormalizeError {
    /// The document is not a mapping at all.
    #[error("Source document must be a mapping, but it is {0}")]
    NotADocument(&'static str),

    /// A recognized key holds a value of the wrong shape, e.g. `Layer` is not a list.
    #[error("Invalid source document: {0}")]
    InvalidShape(#[source] serde_yaml::Error),
}
