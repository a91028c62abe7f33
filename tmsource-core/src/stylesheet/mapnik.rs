use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write as _};

use itertools::Itertools as _;
use serde_yaml::Value;

use super::{
    CompileError, CompileResult, Problem, StyleLayer, StylesheetCompiler, StylesheetOptions,
};
use crate::source::Layer;

/// Scale denominator at which each zoom level starts, as used by carto.
const ZOOM_SCALES: [u64; 24] = [
    1_000_000_000,
    500_000_000,
    200_000_000,
    100_000_000,
    50_000_000,
    25_000_000,
    12_500_000,
    6_500_000,
    3_000_000,
    1_500_000,
    750_000,
    400_000,
    200_000,
    100_000,
    50_000,
    25_000,
    12_500,
    5_000,
    2_500,
    1_500,
    750,
    500,
    250,
    100,
];

/// Layer attributes written by the compiler itself.
const LAYER_ATTRIBUTES: [&str; 5] = [
    "name",
    "srs",
    "buffer-size",
    "maximum-scale-denominator",
    "minimum-scale-denominator",
];

/// Compiles options into a Mapnik XML map with no styles, ready to be
/// rendered into vector tiles.
#[derive(Clone, Copy, Debug, Default)]
pub struct MapnikXmlCompiler;

impl StylesheetCompiler for MapnikXmlCompiler {
    fn compile(&self, options: &StylesheetOptions) -> CompileResult<String> {
        let problems = validate(options);
        if !problems.is_empty() {
            return Err(CompileError::Problems(problems));
        }
        let mut xml = String::new();
        render(options, &mut xml).map_err(|e| CompileError::Fatal(e.to_string()))?;
        Ok(xml)
    }
}

fn validate(options: &StylesheetOptions) -> Vec<Problem> {
    let mut problems = Vec::new();
    if let Some(Err(e)) = options.bounds.as_ref().map(parameter_text) {
        problems.push(Problem {
            layer: None,
            message: format!("Invalid bounds: {e}"),
        });
    }

    let mut seen = BTreeSet::new();
    for (idx, StyleLayer { name, layer }) in options.layers.iter().enumerate() {
        if name.is_empty() {
            problems.push(Problem {
                layer: None,
                message: format!("Layer #{} has no name", idx + 1),
            });
            continue;
        }
        if !seen.insert(name.as_str()) {
            problems.push(Problem::in_layer(name, "Duplicate layer name"));
        }
        let props = &layer.properties;
        if props.minzoom > props.maxzoom {
            problems.push(Problem::in_layer(
                name,
                format!(
                    "minzoom {} is greater than maxzoom {}",
                    props.minzoom, props.maxzoom
                ),
            ));
        }
        for (key, value) in &props.unrecognized {
            if LAYER_ATTRIBUTES.contains(&key.as_str()) {
                problems.push(Problem::in_layer(
                    name,
                    format!("Property '{key}' is reserved"),
                ));
            } else if !is_xml_name(key) {
                problems.push(Problem::in_layer(
                    name,
                    format!("Property '{key}' is not a valid attribute name"),
                ));
            } else if let Err(e) = parameter_text(value) {
                problems.push(Problem::in_layer(name, format!("Property '{key}': {e}")));
            }
        }
        for (key, value) in &layer.datasource {
            if let Err(e) = parameter_text(value) {
                problems.push(Problem::in_layer(
                    name,
                    format!("Datasource parameter '{key}': {e}"),
                ));
            }
        }
    }
    problems
}

/// Text of a scalar parameter, lists are joined with commas.
fn parameter_text(value: &Value) -> Result<String, &'static str> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(v) => Ok(v.to_string()),
        Value::Number(v) => Ok(v.to_string()),
        Value::String(v) => Ok(v.clone()),
        Value::Sequence(items) => {
            let items: Vec<String> = items
                .iter()
                .map(|item| match item {
                    Value::Sequence(_) | Value::Mapping(_) => Err("nested lists are not allowed"),
                    _ => parameter_text(item),
                })
                .collect::<Result<_, _>>()?;
            Ok(items.join(","))
        }
        Value::Mapping(_) => Err("nested mappings are not allowed"),
        Value::Tagged(tagged) => parameter_text(&tagged.value),
    }
}

fn render(options: &StylesheetOptions, xml: &mut String) -> fmt::Result {
    writeln!(xml, r#"<?xml version="1.0" encoding="utf-8"?>"#)?;
    writeln!(xml, "<!DOCTYPE Map[]>")?;
    writeln!(xml, r#"<Map srs="{}">"#, escape_attr(&options.srs))?;
    writeln!(xml)?;
    writeln!(xml, "<Parameters>")?;
    for (name, value) in parameters(options) {
        match value {
            Param::Text(text) => writeln!(
                xml,
                r#"  <Parameter name="{name}">{}</Parameter>"#,
                cdata(&text)
            )?,
            Param::Plain(text) => writeln!(
                xml,
                r#"  <Parameter name="{name}">{}</Parameter>"#,
                escape_text(&text)
            )?,
        }
    }
    writeln!(xml, "</Parameters>")?;

    for StyleLayer { name, layer } in &options.layers {
        writeln!(xml)?;
        write!(xml, r#"<Layer name="{}""#, escape_attr(name))?;
        write!(xml, r#" srs="{}""#, escape_attr(&layer.srs))?;
        for (attr, value) in layer_attributes(layer) {
            write!(xml, r#" {attr}="{}""#, escape_attr(&value))?;
        }
        writeln!(xml, ">")?;
        writeln!(xml, "  <Datasource>")?;
        for (key, value) in &layer.datasource {
            let text = parameter_text(value).map_err(|_| fmt::Error)?;
            writeln!(
                xml,
                r#"    <Parameter name="{}">{}</Parameter>"#,
                escape_attr(key),
                cdata(&text)
            )?;
        }
        writeln!(xml, "  </Datasource>")?;
        writeln!(xml, "</Layer>")?;
    }

    writeln!(xml)?;
    writeln!(xml, "</Map>")
}

enum Param {
    /// Free text, wrapped in CDATA
    Text(String),
    /// Numbers and lists of numbers
    Plain(String),
}

fn parameters(options: &StylesheetOptions) -> BTreeMap<&'static str, Param> {
    let mut params = BTreeMap::new();
    let texts = [
        ("name", &options.name),
        ("description", &options.description),
        ("attribution", &options.attribution),
        ("format", &options.format),
    ];
    for (key, value) in texts {
        if let Some(value) = value {
            params.insert(key, Param::Text(value.clone()));
        }
    }
    if let Some(Ok(bounds)) = options.bounds.as_ref().map(parameter_text) {
        params.insert("bounds", Param::Plain(bounds));
    }
    if let Some(center) = options.center {
        params.insert("center", Param::Plain(center.iter().join(",")));
    }
    if let Some(minzoom) = options.minzoom {
        params.insert("minzoom", Param::Plain(minzoom.to_string()));
    }
    if let Some(maxzoom) = options.maxzoom {
        params.insert("maxzoom", Param::Plain(maxzoom.to_string()));
    }
    params.insert("json", Param::Text(options.json.clone()));
    params
}

/// Layer properties as XML attributes. Zoom levels become scale denominators,
/// `minzoom 0` and the last zoom level do not limit the layer.
fn layer_attributes(layer: &Layer) -> Vec<(String, String)> {
    let props = &layer.properties;
    let mut attrs = vec![("buffer-size".to_string(), props.buffer_size.to_string())];
    if props.minzoom > 0
        && let Some(scale) = ZOOM_SCALES.get(usize::from(props.minzoom))
    {
        attrs.push(("maximum-scale-denominator".to_string(), scale.to_string()));
    }
    if let Some(scale) = ZOOM_SCALES.get(usize::from(props.maxzoom) + 1) {
        attrs.push(("minimum-scale-denominator".to_string(), scale.to_string()));
    }
    for (key, value) in &props.unrecognized {
        if let Ok(text) = parameter_text(value) {
            attrs.push((key.clone(), text));
        }
    }
    attrs
}

/// Whether `name` can be used as an XML attribute name. Namespaced names are not.
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c.is_alphabetic())
        && chars.all(|c| matches!(c, '_' | '-' | '.') || c.is_alphanumeric())
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;").replace('\'', "&apos;")
}

fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn cdata(value: &str) -> String {
    format!("<![CDATA[{}]]>", value.replace("]]>", "]]]]><![CDATA[>"))
}
