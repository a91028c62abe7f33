use serde_json::Value;

use super::geojson::add_properties;
use super::{Fields, ProbeError, ProbeResult, read_input};
use crate::source::Datasource;

/// Union of the properties of every geometry of every object in the topology.
pub fn describe(datasource: &Datasource) -> ProbeResult<Fields> {
    let (label, text) = read_input(datasource)?;
    let topology: Value =
        serde_json::from_str(&text).map_err(|e| ProbeError::InvalidJson(e, label.clone()))?;

    if topology.get("type").and_then(Value::as_str) != Some("Topology") {
        return Err(ProbeError::InvalidTopoJson("type must be 'Topology'", label));
    }
    let Some(objects) = topology.get("objects").and_then(Value::as_object) else {
        return Err(ProbeError::InvalidTopoJson("missing 'objects'", label));
    };

    let mut fields = Fields::new();
    for object in objects.values() {
        collect(&mut fields, object);
    }
    Ok(fields)
}

fn collect(fields: &mut Fields, geometry: &Value) {
    add_properties(fields, geometry.get("properties").and_then(Value::as_object));
    if let Some(children) = geometry.get("geometries").and_then(Value::as_array) {
        for child in children {
            collect(fields, child);
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::probe::FieldType;

    fn inline(text: &str) -> Datasource {
        let mut ds = Datasource::default();
        ds.insert("type", "topojson");
        ds.insert("inline", text);
        ds
    }

    #[test]
    fn nested_collections() {
        let fields = describe(&inline(indoc! {r#"
            {
              "type": "Topology",
              "arcs": [],
              "objects": {
                "countries": {
                  "type": "GeometryCollection",
                  "geometries": [
                    {"type": "Point", "coordinates": [0, 0], "properties": {"name": "A", "area": 1.5}},
                    {"type": "Point", "coordinates": [1, 1], "properties": {"landlocked": false}}
                  ]
                },
                "capital": {"type": "Point", "coordinates": [0, 0], "properties": {"code": "X"}}
              }
            }
        "#}))
        .unwrap();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields["area"], FieldType::Number);
        assert_eq!(fields["landlocked"], FieldType::Boolean);
        assert_eq!(fields["code"], FieldType::String);
    }

    #[test]
    fn not_a_topology() {
        let err = describe(&inline(r#"{"type": "FeatureCollection", "features": []}"#)).unwrap_err();
        assert!(matches!(err, ProbeError::InvalidTopoJson(..)));
        let err = describe(&inline(r#"{"type": "Topology"}"#)).unwrap_err();
        assert!(matches!(err, ProbeError::InvalidTopoJson("missing 'objects'", _)));
        let err = describe(&inline("not json")).unwrap_err();
        assert!(matches!(err, ProbeError::InvalidJson(..)));
    }
}
