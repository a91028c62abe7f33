use std::str::FromStr as _;

use geojson::{GeoJson, JsonObject};
use serde_json::Value;

use super::{FieldType, Fields, ProbeError, ProbeResult, read_input};
use crate::source::Datasource;

/// Union of the property names of all features.
pub fn describe(datasource: &Datasource) -> ProbeResult<Fields> {
    let (label, text) = read_input(datasource)?;
    let geojson =
        GeoJson::from_str(&text).map_err(|e| ProbeError::InvalidGeoJson(Box::new(e), label))?;

    let mut fields = Fields::new();
    match &geojson {
        GeoJson::Geometry(_) => {}
        GeoJson::Feature(feature) => add_properties(&mut fields, feature.properties.as_ref()),
        GeoJson::FeatureCollection(collection) => {
            for feature in &collection.features {
                add_properties(&mut fields, feature.properties.as_ref());
            }
        }
    }
    Ok(fields)
}

/// Record each property; the first feature that has a property decides its type.
pub(super) fn add_properties(fields: &mut Fields, properties: Option<&JsonObject>) {
    for (key, value) in properties.into_iter().flatten() {
        fields
            .entry(key.clone())
            .or_insert_with(|| property_type(value));
    }
}

fn property_type(value: &Value) -> FieldType {
    match value {
        Value::Number(_) => FieldType::Number,
        Value::Bool(_) => FieldType::Boolean,
        _ => FieldType::String,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;

    const PLACES: &str = indoc! {r#"
        {
          "type": "FeatureCollection",
          "features": [
            {
              "type": "Feature",
              "geometry": {"type": "Point", "coordinates": [13.4, 52.5]},
              "properties": {"name": "Berlin", "population": 3645000}
            },
            {
              "type": "Feature",
              "geometry": {"type": "Point", "coordinates": [2.35, 48.85]},
              "properties": {"name": "Paris", "capital": true}
            }
          ]
        }
    "#};

    fn datasource(pairs: &[(&str, &str)]) -> Datasource {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).into()))
            .collect()
    }

    #[test]
    fn collection_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PLACES.as_bytes()).unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let fields = describe(&datasource(&[("type", "geojson"), ("file", &path)])).unwrap();
        assert_eq!(
            fields,
            Fields::from([
                ("capital".to_string(), FieldType::Boolean),
                ("name".to_string(), FieldType::String),
                ("population".to_string(), FieldType::Number),
            ])
        );
    }

    #[test]
    fn single_feature_inline() {
        let inline = r#"{"type": "Feature", "geometry": null, "properties": {"id": 7, "tags": ["a"]}}"#;
        let fields = describe(&datasource(&[("type", "geojson"), ("inline", inline)])).unwrap();
        assert_eq!(fields["id"], FieldType::Number);
        assert_eq!(fields["tags"], FieldType::String);
    }

    #[test]
    fn bare_geometry_has_no_fields() {
        let inline = r#"{"type": "Point", "coordinates": [0, 0]}"#;
        let fields = describe(&datasource(&[("type", "geojson"), ("inline", inline)])).unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn invalid_geojson() {
        let err = describe(&datasource(&[("type", "geojson"), ("inline", "{\"type\": 1")]))
            .unwrap_err();
        assert!(matches!(err, ProbeError::InvalidGeoJson(..)));
    }
}
