use std::collections::BTreeMap;
use std::fmt::{self, Debug, Formatter};
use std::path::Path;

use serde_yaml::Value;
use tilejson::VectorLayer;
use tracing::debug;

use super::{Layer, NormalizeError, NormalizeResult, RawLayer, RawSource, Source, base_dir};
use crate::catalog::Catalog;
use crate::probe::{BuiltinProbe, DatasourceProbe, DisabledProbe, Fields};

/// Turns raw source documents into normalized [`Source`]s.
///
/// Holds the capability catalog used to filter datasources and the probe used
/// to introspect them. A normalizer keeps no state between calls and can be
/// shared between threads.
pub struct Normalizer {
    catalog: Catalog,
    probe: Box<dyn DatasourceProbe>,
}

impl Debug for Normalizer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Normalizer")
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(Catalog::builtin())
    }
}

impl Normalizer {
    /// A normalizer filtering with `catalog` and reading datasources with the [`BuiltinProbe`].
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            probe: Box::new(BuiltinProbe),
        }
    }

    /// Replace the datasource probe.
    #[must_use]
    pub fn with_probe(mut self, probe: impl DatasourceProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    /// Never introspect datasources, every layer gets an empty field set.
    #[must_use]
    pub fn without_introspection(self) -> Self {
        self.with_probe(DisabledProbe)
    }

    /// The catalog datasources are filtered with.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Normalize a parsed document.
    ///
    /// Fails only if `document` is not a mapping, or if a recognized key holds
    /// a value of the wrong shape, e.g. `Layer` is not a sequence.
    pub fn normalize(&self, document: Value) -> NormalizeResult<Source> {
        let kind = match &document {
            Value::Mapping(_) => None,
            Value::Null => Some("null"),
            Value::Bool(_) => Some("a boolean"),
            Value::Number(_) => Some("a number"),
            Value::String(_) => Some("a string"),
            Value::Sequence(_) => Some("a sequence"),
            Value::Tagged(_) => Some("a tagged value"),
        };
        if let Some(kind) = kind {
            return Err(NormalizeError::NotADocument(kind));
        }
        let raw: RawSource =
            serde_yaml::from_value(document).map_err(NormalizeError::InvalidShape)?;
        Ok(self.normalize_source(raw))
    }

    /// Normalize an already typed document. This cannot fail.
    #[must_use]
    pub fn normalize_source(&self, mut raw: RawSource) -> Source {
        let layers = raw
            .layers
            .take()
            .unwrap_or_default()
            .into_iter()
            .map(|layer| self.normalize_layer(layer))
            .collect();
        let mut source = raw.into_source(layers);

        let base = source.id.as_deref().and_then(base_dir);
        source.vector_layers = source
            .layers
            .iter()
            .map(|layer| self.vector_layer(layer, base.as_deref()))
            .collect();
        source
    }

    fn normalize_layer(&self, raw: RawLayer) -> Layer {
        let mut layer = Layer::from(raw);
        layer.datasource = layer.datasource.filter(&self.catalog, &layer.srs);
        layer
    }

    /// Metadata of one layer, with the fields discovered by the probe.
    ///
    /// A failed probe is not an error, the layer just has no fields.
    fn vector_layer(&self, layer: &Layer, base: Option<&Path>) -> VectorLayer {
        let datasource = layer.datasource.resolve_paths(base);
        let fields = match self.probe.describe(&datasource) {
            Ok(fields) => merge_fields(fields, &layer.fields),
            Err(e) => {
                debug!("Unable to introspect layer '{}': {e}", layer.id);
                BTreeMap::new()
            }
        };
        VectorLayer {
            id: layer.id.clone(),
            fields,
            description: Some(layer.description.clone()),
            maxzoom: Some(layer.properties.maxzoom),
            minzoom: Some(layer.properties.minzoom),
            other: BTreeMap::default(),
        }
    }
}

/// Type of every discovered field, replaced by the user's override if there
/// is a non-empty one. Overrides for fields the probe did not find are ignored.
#[must_use]
pub fn merge_fields(
    discovered: Fields,
    overrides: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    discovered
        .into_iter()
        .map(|(name, field_type)| {
            let value = match overrides.get(&name) {
                Some(custom) if !custom.is_empty() => custom.clone(),
                _ => field_type.to_string(),
            };
            (name, value)
        })
        .collect()
}
