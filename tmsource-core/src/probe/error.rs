use std::io;
use std::path::PathBuf;

/// A convenience [`Result`] for datasource introspection.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while introspecting a datasource.
///
/// None of these abort normalization: the affected layer just gets no fields.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum ProbeError {
    /// Introspection was turned off.
    #[error("Datasource introspection is disabled")]
    Disabled,

    /// The datasource has no `type` the probe knows how to read.
    #[error("Introspection of '{0}' datasources is not supported")]
    UnsupportedType(String),

    /// A parameter needed to reach the data is not set.
    #[error("Datasource parameter '{0}' is required")]
    MissingParameter(&'static str),

    /// A parameter is set but cannot be used.
    #[error("Datasource parameter '{0}' is invalid: {1}")]
    InvalidParameter(&'static str, String),

    /// The data file could not be read.
    #[error("IO error {0}: {1}")]
    IoError(#[source] io::Error, PathBuf),

    /// The data is not valid GeoJSON.
    #[error("Invalid GeoJSON in {1}: {0}")]
    InvalidGeoJson(#[source] Box<geojson::Error>, String),

    /// The data is not valid JSON.
    #[error("Invalid JSON in {1}: {0}")]
    InvalidJson(#[source] serde_json::Error, String),

    /// The data is valid JSON, but not a TopoJSON topology.
    #[error("Invalid TopoJSON in {1}: {0}")]
    InvalidTopoJson(&'static str, String),

    /// The CSV data has no usable header.
    #[error("Invalid CSV in {1}: {0}")]
    InvalidCsv(&'static str, String),

    /// The dBASE table next to a shapefile is malformed.
    #[error("Invalid dBASE file {1}: {0}")]
    InvalidDbf(&'static str, PathBuf),

    /// The database could not be queried.
    #[cfg(feature = "postgres")]
    #[error("Postgres error while {1}: {0}")]
    PostgresError(#[source] postgres::Error, &'static str),
}
