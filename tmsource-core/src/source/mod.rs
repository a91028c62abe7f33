//! The tile source document, before and after normalization.
//!
//! Every entity exists twice: a `Raw*` form where each recognized key is
//! optional, as it was read from disk, and a normalized form in which every
//! recognized key holds a concrete value. Converting with [`From`] fills in
//! the defaults of that nesting level only; the [`Normalizer`] composes the
//! conversions top-down and adds the datasource filtering and the derived
//! `vector_layers`.
//!
//! Unknown keys at every level are kept in `unrecognized` and written back
//! unchanged.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tilejson::VectorLayer;

mod datasource;
pub use datasource::{Datasource, is_absolute};

mod error;
pub use error::{NormalizeError, NormalizeResult};

mod locator;
pub use locator::{base_dir, decode_path};

mod normalize;
pub use normalize::{Normalizer, merge_fields};

/// Keys present in a document that this crate does not interpret.
pub type UnrecognizedValues = BTreeMap<String, Value>;

/// Longitude, latitude and zoom of the preferred initial view.
pub type Center = [f64; 3];

/// Output format of every normalized source.
pub const FORMAT: &str = "pbf";

/// Default `minzoom` of a source.
pub const DEFAULT_MINZOOM: u8 = 0;
/// Default `maxzoom` of a source.
pub const DEFAULT_MAXZOOM: u8 = 6;
/// Default `center` of a source.
pub const DEFAULT_CENTER: Center = [0.0, 0.0, 3.0];
/// Default `maxzoom` of a layer.
pub const DEFAULT_LAYER_MAXZOOM: u8 = 22;

/// A source document as read from disk.
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSource {
    /// Resource locator of the document
    pub id: Option<String>,
    /// Human readable name
    pub name: Option<String>,
    /// Longer description
    pub description: Option<String>,
    /// Attribution shown along with the rendered data
    pub attribution: Option<String>,
    /// Modification time in milliseconds since the Unix epoch
    pub mtime: Option<i64>,
    /// Lowest zoom level
    pub minzoom: Option<u8>,
    /// Highest zoom level
    pub maxzoom: Option<u8>,
    /// Preferred initial view
    pub center: Option<Center>,
    /// Data layers in document order
    #[serde(rename = "Layer", alias = "layers")]
    pub layers: Option<Vec<RawLayer>>,
    /// Editor preferences
    #[serde(rename = "_prefs", alias = "preferences")]
    pub preferences: Option<RawPreferences>,
    /// Ignored, always replaced by [`FORMAT`]
    #[serde(skip_serializing)]
    pub format: Value,
    /// Ignored, always recomputed from the layers
    #[serde(skip_serializing, alias = "vectorLayers")]
    pub vector_layers: Value,
    /// Keys not interpreted here, written back unchanged
    #[serde(flatten)]
    pub unrecognized: UnrecognizedValues,
}

/// A layer as read from disk.
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawLayer {
    /// Layer identifier, also its name in the stylesheet
    pub id: Option<String>,
    /// Declared projection
    pub srs: Option<String>,
    /// Longer description
    pub description: Option<String>,
    /// User supplied field name to type or label overrides
    pub fields: Option<BTreeMap<String, String>>,
    /// Parameters of the data behind the layer
    #[serde(rename = "Datasource", alias = "datasource")]
    pub datasource: Option<Datasource>,
    /// Rendering properties
    pub properties: Option<RawProperties>,
    /// Keys not interpreted here, written back unchanged
    #[serde(flatten)]
    pub unrecognized: UnrecognizedValues,
}

/// Layer rendering properties as read from disk.
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawProperties {
    /// Lowest zoom level
    pub minzoom: Option<u8>,
    /// Highest zoom level
    pub maxzoom: Option<u8>,
    /// Pixels of data rendered around each tile
    #[serde(rename = "buffer-size")]
    pub buffer_size: Option<u32>,
    /// Keys not interpreted here, written back unchanged
    #[serde(flatten)]
    pub unrecognized: UnrecognizedValues,
}

/// Editor preferences as read from disk.
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPreferences {
    /// Whether the editor stores the current view as `center`
    #[serde(rename = "saveCenter")]
    pub save_center: Option<bool>,
    /// Ids of layers hidden in the editor
    pub disabled: Option<Vec<String>>,
    /// Whether the editor shows the feature inspector
    pub inspector: Option<bool>,
    /// Keys not interpreted here, written back unchanged
    #[serde(flatten)]
    pub unrecognized: UnrecognizedValues,
}

/// A fully normalized source document.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Source {
    /// Resource locator of the document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Human readable name
    pub name: String,
    /// Longer description
    pub description: String,
    /// Attribution shown along with the rendered data
    pub attribution: String,
    /// Modification time in milliseconds since the Unix epoch
    pub mtime: i64,
    /// Lowest zoom level
    pub minzoom: u8,
    /// Highest zoom level
    pub maxzoom: u8,
    /// Preferred initial view
    pub center: Center,
    /// Data layers in document order
    #[serde(rename = "Layer")]
    pub layers: Vec<Layer>,
    /// Editor preferences
    #[serde(rename = "_prefs")]
    pub preferences: Preferences,
    /// Tile format, always [`FORMAT`]
    pub format: String,
    /// Per-layer metadata derived during normalization, in layer order
    pub vector_layers: Vec<VectorLayer>,
    /// Keys not interpreted here, written back unchanged
    #[serde(flatten)]
    pub unrecognized: UnrecognizedValues,
}

/// A normalized layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Layer {
    /// Layer identifier, also its name in the stylesheet
    pub id: String,
    /// Declared projection; empty means the working projection
    pub srs: String,
    /// Longer description
    pub description: String,
    /// User supplied field name to type or label overrides
    pub fields: BTreeMap<String, String>,
    /// Parameters of the data behind the layer
    #[serde(rename = "Datasource")]
    pub datasource: Datasource,
    /// Rendering properties
    pub properties: Properties,
    /// Keys not interpreted here, written back unchanged
    #[serde(flatten)]
    pub unrecognized: UnrecognizedValues,
}

/// Normalized layer rendering properties.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Properties {
    /// Lowest zoom level
    pub minzoom: u8,
    /// Highest zoom level
    pub maxzoom: u8,
    /// Pixels of data rendered around each tile
    #[serde(rename = "buffer-size")]
    pub buffer_size: u32,
    /// Keys not interpreted here, written back unchanged
    #[serde(flatten)]
    pub unrecognized: UnrecognizedValues,
}

/// Normalized editor preferences.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Preferences {
    /// Whether the editor stores the current view as `center`
    #[serde(rename = "saveCenter")]
    pub save_center: bool,
    /// Ids of layers hidden in the editor
    pub disabled: Vec<String>,
    /// Whether the editor shows the feature inspector
    pub inspector: bool,
    /// Keys not interpreted here, written back unchanged
    #[serde(flatten)]
    pub unrecognized: UnrecognizedValues,
}

impl Default for Properties {
    fn default() -> Self {
        RawProperties::default().into()
    }
}

impl Default for Preferences {
    fn default() -> Self {
        RawPreferences::default().into()
    }
}

impl From<RawProperties> for Properties {
    fn from(raw: RawProperties) -> Self {
        Self {
            minzoom: raw.minzoom.unwrap_or(0),
            maxzoom: raw.maxzoom.unwrap_or(DEFAULT_LAYER_MAXZOOM),
            buffer_size: raw.buffer_size.unwrap_or(0),
            unrecognized: raw.unrecognized,
        }
    }
}

impl From<RawPreferences> for Preferences {
    fn from(raw: RawPreferences) -> Self {
        Self {
            save_center: raw.save_center.unwrap_or(true),
            disabled: raw.disabled.unwrap_or_default(),
            inspector: raw.inspector.unwrap_or(false),
            unrecognized: raw.unrecognized,
        }
    }
}

/// Fills in layer defaults. The datasource is copied as is, filtering it
/// needs a catalog and is done by the [`Normalizer`].
impl From<RawLayer> for Layer {
    fn from(raw: RawLayer) -> Self {
        Self {
            id: raw.id.unwrap_or_default(),
            srs: raw.srs.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            fields: raw.fields.unwrap_or_default(),
            datasource: raw.datasource.unwrap_or_default(),
            properties: raw.properties.unwrap_or_default().into(),
            unrecognized: raw.unrecognized,
        }
    }
}

impl RawSource {
    /// Fill in the top level defaults, leaving `vector_layers` empty.
    ///
    /// `layers` must already be normalized.
    #[must_use]
    pub fn into_source(self, layers: Vec<Layer>) -> Source {
        Source {
            id: self.id,
            name: self.name.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            attribution: self.attribution.unwrap_or_default(),
            mtime: self.mtime.unwrap_or_else(now_millis),
            minzoom: self.minzoom.unwrap_or(DEFAULT_MINZOOM),
            maxzoom: self.maxzoom.unwrap_or(DEFAULT_MAXZOOM),
            center: self.center.unwrap_or(DEFAULT_CENTER),
            layers,
            preferences: self.preferences.unwrap_or_default().into(),
            format: FORMAT.to_string(),
            vector_layers: Vec::new(),
            unrecognized: self.unrecognized,
        }
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_millis()).ok())
        .unwrap_or_default()
}
