use std::fmt::{self, Display, Formatter};

/// A convenience [`Result`] for stylesheet compilers.
pub type CompileResult<T> = Result<T, CompileError>;

/// A convenience [`Result`] for stylesheet assembly.
pub type AssembleResult<T> = Result<T, AssembleError>;

/// A single problem a compiler found in one declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Problem {
    /// The layer the declaration belongs to, if any
    pub layer: Option<String>,
    /// What is wrong with it
    pub message: String,
}

impl Problem {
    /// A problem found in the layer called `layer`.
    #[must_use]
    pub fn in_layer(layer: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            layer: Some(layer.into()),
            message: message.into(),
        }
    }
}

impl Display for Problem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.layer {
            Some(layer) => write!(f, "Layer '{layer}': {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Errors reported by a stylesheet compiler.
#[non_exhaustive]
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum CompileError {
    /// One or more declarations are invalid.
    #[error("Stylesheet has {} invalid declaration(s)", .0.len())]
    Problems(Vec<Problem>),

    /// The compiler failed as a whole.
    #[error("Stylesheet compilation failed: {0}")]
    Fatal(String),
}

/// Errors that can occur while assembling a stylesheet.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum AssembleError {
    /// The vector layer metadata could not be embedded.
    #[error("Unable to serialize vector layer metadata: {0}")]
    Metadata(#[source] serde_json::Error),

    /// The compiler rejected the stylesheet.
    #[error(transparent)]
    Compile(#[from] CompileError),
}
