//! Stylesheet assembly: project a normalized [`Source`] into the options a
//! stylesheet compiler takes, then compile them.
//!
//! The stylesheet is always in the working projection (web mercator), layers
//! that do not declare a projection are put into it as well.

use serde::Serialize;
use serde_yaml::Value;
use tilejson::VectorLayer;
use tracing::error;

use crate::projection::WEB_MERCATOR;
use crate::source::{Center, Layer, Source};

mod error;
pub use error::{AssembleError, AssembleResult, CompileError, CompileResult, Problem};

mod mapnik;
pub use mapnik::MapnikXmlCompiler;

/// Everything a stylesheet compiler gets to see.
///
/// Metadata keys that are missing from the source stay `None`, they are not
/// defaulted a second time.
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StylesheetOptions {
    /// Human readable name of the source
    pub name: Option<String>,
    /// Longer description of the source
    pub description: Option<String>,
    /// Attribution shown along with the rendered data
    pub attribution: Option<String>,
    /// Passed through unchanged if the source document has `bounds`
    pub bounds: Option<Value>,
    /// Preferred initial view
    pub center: Option<Center>,
    /// Tile format, always `pbf` for a normalized source
    pub format: Option<String>,
    /// Lowest zoom level of the source
    pub minzoom: Option<u8>,
    /// Highest zoom level of the source
    pub maxzoom: Option<u8>,
    /// Working projection of the whole stylesheet
    pub srs: String,
    /// Layers in document order
    #[serde(rename = "Layer")]
    pub layers: Vec<StyleLayer>,
    /// `{"vector_layers": [...]}` encoded as JSON
    pub json: String,
}

/// A layer as the compiler expects it: named, and always with a projection.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StyleLayer {
    /// Name of the layer in the stylesheet, the layer `id`
    pub name: String,
    /// The normalized layer with its `srs` filled in
    #[serde(flatten)]
    pub layer: Layer,
}

#[derive(Serialize)]
struct Metadata<'a> {
    vector_layers: &'a [VectorLayer],
}

/// Turns [`StylesheetOptions`] into a stylesheet document.
pub trait StylesheetCompiler: Send + Sync {
    /// Compile `options`, reporting either every invalid declaration or a
    /// single fatal error.
    fn compile(&self, options: &StylesheetOptions) -> CompileResult<String>;
}

/// Project `source` into compiler options.
pub fn build_options(source: &Source) -> AssembleResult<StylesheetOptions> {
    let json = serde_json::to_string(&Metadata {
        vector_layers: &source.vector_layers,
    })
    .map_err(AssembleError::Metadata)?;

    let layers = source
        .layers
        .iter()
        .map(|layer| {
            let mut layer = layer.clone();
            if layer.srs.is_empty() {
                layer.srs = WEB_MERCATOR.srs.to_string();
            }
            StyleLayer {
                name: layer.id.clone(),
                layer,
            }
        })
        .collect();

    Ok(StylesheetOptions {
        name: Some(source.name.clone()),
        description: Some(source.description.clone()),
        attribution: Some(source.attribution.clone()),
        bounds: source.unrecognized.get("bounds").cloned(),
        center: Some(source.center),
        format: Some(source.format.clone()),
        minzoom: Some(source.minzoom),
        maxzoom: Some(source.maxzoom),
        srs: WEB_MERCATOR.srs.to_string(),
        layers,
        json,
    })
}

/// Build the stylesheet of `source` with `compiler`.
///
/// Every problem the compiler reports is logged as an error before the
/// assembly fails.
pub fn assemble(source: &Source, compiler: &dyn StylesheetCompiler) -> AssembleResult<String> {
    let options = build_options(source)?;
    match compiler.compile(&options) {
        Ok(stylesheet) => Ok(stylesheet),
        Err(CompileError::Problems(problems)) => {
            for problem in &problems {
                error!("{problem}");
            }
            Err(CompileError::Problems(problems).into())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::source::Normalizer;

    fn source(yaml: &str) -> Source {
        Normalizer::default()
            .without_introspection()
            .normalize(serde_yaml::from_str(yaml).unwrap())
            .unwrap()
    }

    #[test]
    fn projects_allow_listed_metadata() {
        let options = build_options(&source(indoc! {"
            name: Roads
            bounds: [-180, -85, 180, 85]
            mtime: 5
            custom: ignored
            Layer: [{id: roads}]
        "}))
        .unwrap();
        assert_eq!(options.name.as_deref(), Some("Roads"));
        assert_eq!(options.format.as_deref(), Some("pbf"));
        assert_eq!(options.center, Some([0.0, 0.0, 3.0]));
        assert_eq!(
            options.bounds,
            Some(serde_yaml::from_str("[-180, -85, 180, 85]").unwrap())
        );
        assert_eq!(options.srs, WEB_MERCATOR.srs);

        let value = serde_json::to_value(&options).unwrap();
        assert!(value.get("mtime").is_none());
        assert!(value.get("custom").is_none());
    }

    #[test]
    fn layers_get_a_name_and_projection() {
        let options = build_options(&source(indoc! {"
            Layer:
              - id: roads
              - id: places
                srs: '+proj=longlat +ellps=WGS84 +datum=WGS84 +no_defs'
        "}))
        .unwrap();
        assert_eq!(options.layers[0].name, "roads");
        assert_eq!(options.layers[0].layer.srs, WEB_MERCATOR.srs);
        assert_eq!(options.layers[1].name, "places");
        assert_eq!(
            options.layers[1].layer.srs,
            "+proj=longlat +ellps=WGS84 +datum=WGS84 +no_defs"
        );
    }

    #[test]
    fn embeds_vector_layers() {
        let options = build_options(&source("Layer: [{id: roads, description: Roads}]")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&options.json).unwrap();
        assert_eq!(json["vector_layers"][0]["id"], "roads");
        assert_eq!(json["vector_layers"][0]["description"], "Roads");
        assert_eq!(json["vector_layers"][0]["maxzoom"], 22);
    }

    #[test]
    fn empty_source_has_empty_metadata() {
        let options = build_options(&source("{}")).unwrap();
        assert_eq!(options.json, r#"{"vector_layers":[]}"#);
        assert!(options.layers.is_empty());
    }

    struct Failing(CompileError);

    impl StylesheetCompiler for Failing {
        fn compile(&self, _options: &StylesheetOptions) -> CompileResult<String> {
            Err(self.0.clone())
        }
    }

    #[test]
    #[tracing_test::traced_test]
    fn reports_every_problem() {
        let compiler = Failing(CompileError::Problems(vec![
            Problem::in_layer("roads", "first problem"),
            Problem {
                layer: None,
                message: "second problem".to_string(),
            },
        ]));
        let err = assemble(&source("{}"), &compiler).unwrap_err();
        assert!(matches!(
            err,
            AssembleError::Compile(CompileError::Problems(ref p)) if p.len() == 2
        ));
        assert!(logs_contain("Layer 'roads': first problem"));
        assert!(logs_contain("second problem"));
    }

    #[test]
    fn fatal_error_is_propagated() {
        let compiler = Failing(CompileError::Fatal("out of memory".to_string()));
        let err = assemble(&source("{}"), &compiler).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Stylesheet compilation failed: out of memory"
        );
    }

    #[test]
    fn compiles_with_the_working_projection() {
        let xml = assemble(&source("Layer: [{id: roads}]"), &MapnikXmlCompiler).unwrap();
        assert!(xml.contains(&format!(r#"<Map srs="{}">"#, WEB_MERCATOR.srs)));
    }
}
