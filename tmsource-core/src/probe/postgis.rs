use std::time::Duration;

use postgres::types::Type;
use postgres::{Config, NoTls};
use serde_yaml::Value;
use tracing::debug;

use super::{FieldType, Fields, ProbeError, ProbeResult};
use crate::source::Datasource;

/// Placeholders Mapnik substitutes into the `table` query at render time.
const TOKENS: [(&str, &str); 4] = [
    ("!bbox!", "ST_MakeEnvelope(0, 0, 0, 0)"),
    ("!scale_denominator!", "1"),
    ("!pixel_width!", "1"),
    ("!pixel_height!", "1"),
];

const NUMERIC_TYPES: [Type; 7] = [
    Type::INT2,
    Type::INT4,
    Type::INT8,
    Type::FLOAT4,
    Type::FLOAT8,
    Type::NUMERIC,
    Type::OID,
];

const GEOMETRY_TYPES: [&str; 3] = ["geometry", "geography", "raster"];

/// Columns of the `table` query, without fetching any rows.
pub fn describe(datasource: &Datasource) -> ProbeResult<Fields> {
    let table = param(datasource, "table").ok_or(ProbeError::MissingParameter("table"))?;
    let sql = probe_query(&table);
    let config = connection_config(datasource)?;

    debug!("Introspecting postgis table with {sql}");
    let mut client = config
        .connect(NoTls)
        .map_err(|e| ProbeError::PostgresError(e, "connecting to database"))?;
    let statement = client
        .prepare(&sql)
        .map_err(|e| ProbeError::PostgresError(e, "preparing table query"))?;

    let geometry_field = param(datasource, "geometry_field");
    let mut fields = Fields::new();
    for column in statement.columns() {
        if geometry_field.as_deref() == Some(column.name()) {
            continue;
        }
        if let Some(field_type) = column_type(column.type_()) {
            fields.insert(column.name().to_string(), field_type);
        }
    }
    Ok(fields)
}

fn probe_query(table: &str) -> String {
    let table = TOKENS
        .iter()
        .fold(table.to_string(), |sql, (token, value)| sql.replace(token, value));
    format!("SELECT * FROM {table} LIMIT 0")
}

fn column_type(ty: &Type) -> Option<FieldType> {
    if GEOMETRY_TYPES.contains(&ty.name()) {
        None
    } else if *ty == Type::BOOL {
        Some(FieldType::Boolean)
    } else if NUMERIC_TYPES.contains(ty) {
        Some(FieldType::Number)
    } else {
        Some(FieldType::String)
    }
}

fn connection_config(datasource: &Datasource) -> ProbeResult<Config> {
    let mut config = Config::new();
    config.host(param(datasource, "host").as_deref().unwrap_or("localhost"));
    if let Some(port) = param(datasource, "port") {
        let port = port
            .parse::<u16>()
            .map_err(|e| ProbeError::InvalidParameter("port", e.to_string()))?;
        config.port(port);
    }
    if let Some(user) = param(datasource, "user") {
        config.user(&user);
    }
    if let Some(password) = param(datasource, "password") {
        config.password(password);
    }
    if let Some(dbname) = param(datasource, "dbname") {
        config.dbname(&dbname);
    }
    if let Some(timeout) = param(datasource, "connect_timeout") {
        let secs = timeout
            .parse::<u64>()
            .map_err(|e| ProbeError::InvalidParameter("connect_timeout", e.to_string()))?;
        config.connect_timeout(Duration::from_secs(secs));
    }
    Ok(config)
}

/// Connection parameters are often written as YAML numbers.
fn param(datasource: &Datasource, key: &str) -> Option<String> {
    match datasource.get(key)? {
        Value::String(v) if !v.is_empty() => Some(v.clone()),
        Value::Number(v) => Some(v.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn datasource(yaml: &str) -> Datasource {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[rstest]
    #[case::table("roads", "SELECT * FROM roads LIMIT 0")]
    #[case::subquery(
        "(SELECT * FROM roads WHERE geom && !bbox!) AS data",
        "SELECT * FROM (SELECT * FROM roads WHERE geom && ST_MakeEnvelope(0, 0, 0, 0)) AS data LIMIT 0"
    )]
    #[case::scale(
        "(SELECT *, !scale_denominator! / !pixel_width! AS s FROM roads) AS q",
        "SELECT * FROM (SELECT *, 1 / 1 AS s FROM roads) AS q LIMIT 0"
    )]
    fn builds_probe_query(#[case] table: &str, #[case] expected: &str) {
        assert_eq!(probe_query(table), expected);
    }

    #[rstest]
    #[case(Type::BOOL, Some(FieldType::Boolean))]
    #[case(Type::INT4, Some(FieldType::Number))]
    #[case(Type::FLOAT8, Some(FieldType::Number))]
    #[case(Type::NUMERIC, Some(FieldType::Number))]
    #[case(Type::TEXT, Some(FieldType::String))]
    #[case(Type::TIMESTAMPTZ, Some(FieldType::String))]
    #[case(Type::JSONB, Some(FieldType::String))]
    fn maps_column_types(#[case] ty: Type, #[case] expected: Option<FieldType>) {
        assert_eq!(column_type(&ty), expected);
    }

    #[test]
    fn connection_parameters() {
        let config = connection_config(&datasource(
            "{type: postgis, user: osm, dbname: gis, port: 5433, connect_timeout: 2}",
        ))
        .unwrap();
        assert_eq!(config.get_user(), Some("osm"));
        assert_eq!(config.get_dbname(), Some("gis"));
        assert_eq!(config.get_ports(), &[5433]);
        assert_eq!(config.get_connect_timeout(), Some(&Duration::from_secs(2)));
    }

    #[test]
    fn invalid_port() {
        let err = connection_config(&datasource("{type: postgis, port: abc}")).unwrap_err();
        assert!(matches!(err, ProbeError::InvalidParameter("port", _)));
    }

    #[test]
    fn table_is_required() {
        let err = describe(&datasource("{type: postgis, dbname: gis}")).unwrap_err();
        assert!(matches!(err, ProbeError::MissingParameter("table")));
    }
}
