#![cfg(feature = "sqlite")]
mod common;

use chrono::NaiveDate;
use serde_json::json;
use sql_gateway::prelude::*;

fn seeded() -> Result<Connection, SqlGatewayError> {
    let mut conn = common::sqlite_memory()?;
    conn.query(
        "CREATE TABLE people (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            country TEXT,
            city TEXT,
            active BOOLEAN,
            score REAL,
            born DATETIME,
            meta JSON
        )",
        (),
    )?;
    let rows = [
        ("alice", "CZ", "Prague", true, 1.5, "2001-02-03 04:05:06", r#"{"a":1}"#),
        ("bob", "CZ", "Brno", false, 2.0, "1999-12-31 23:59:59", r#"[1,2]"#),
        ("carol", "SK", "Kosice", true, 3.25, "2010-01-01 00:00:00", "null"),
    ];
    for (name, country, city, active, score, born, meta) in rows {
        conn.query(
            "INSERT INTO people (name, country, city, active, score, born, meta) VALUES (?, ?, ?, ?, ?, ?, ?)",
            QueryArgs::new()
                .arg(name)
                .arg(country)
                .arg(city)
                .arg(active)
                .arg(score)
                .arg(born)
                .arg(meta),
        )?;
    }
    Ok(conn)
}

#[test]
fn fetch_is_forward_only_and_terminal() -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = seeded()?;
    let mut result = conn.query("SELECT id, name FROM people ORDER BY id", ())?;
    assert_eq!(result.state(), CursorState::Pending);
    assert_eq!(result.column_count(), Some(2));
    assert_eq!(result.row_count(), Some(3));

    let first = result.fetch()?.expect("first row");
    assert_eq!(first.get("name"), Some(&RowValues::Text("alice".into())));
    assert_eq!(first.column_names(), ["id", "name"]);
    assert_eq!(result.state(), CursorState::HasRow);

    assert!(result.fetch()?.is_some());
    assert!(result.fetch()?.is_some());
    assert!(result.fetch()?.is_none());
    assert_eq!(result.state(), CursorState::Exhausted);
    assert!(result.fetch()?.is_none());
    assert!(result.fetch()?.is_none());

    assert!(matches!(result.iter(), Err(SqlGatewayError::InvalidState(_))));
    assert!(matches!(result.seek(0), Err(SqlGatewayError::InvalidState(_))));
    Ok(())
}

#[test]
fn fetch_all_is_memoized() -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = seeded()?;
    let mut result = conn.query("SELECT name FROM people ORDER BY id", ())?;
    let first: Vec<Row> = result.fetch_all()?.to_vec();
    let second: Vec<Row> = result.fetch_all()?.to_vec();
    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
    assert_eq!(
        result.fetch_fields()?,
        vec![
            RowValues::Text("alice".into()),
            RowValues::Text("bob".into()),
            RowValues::Text("carol".into()),
        ]
    );
    Ok(())
}

#[test]
fn values_are_normalized_by_declared_type() -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = seeded()?;
    let row = conn
        .fetch("SELECT active, score, born, meta FROM people WHERE name = ?", QueryArgs::new().arg("alice"))?
        .expect("alice");
    assert_eq!(row.get("active"), Some(&RowValues::Bool(true)));
    assert_eq!(row.get("score"), Some(&RowValues::Float(1.5)));
    let born = NaiveDate::from_ymd_opt(2001, 2, 3)
        .and_then(|d| d.and_hms_opt(4, 5, 6))
        .expect("valid date");
    assert_eq!(row.get("born"), Some(&RowValues::Timestamp(born)));
    assert_eq!(row.get("meta"), Some(&RowValues::JSON(json!({"a": 1}))));

    let mut raw = Connection::open(
        ConnectOptions::builder("sqlite::memory:")
            .normalize_types(false)
            .finish(),
    )?;
    raw.query("CREATE TABLE t (flag BOOLEAN)", ())?;
    raw.query("INSERT INTO t VALUES (1)", ())?;
    assert_eq!(raw.fetch_field("SELECT flag FROM t", ())?, Some(RowValues::Int(1)));
    Ok(())
}

#[test]
fn column_types_are_detected_once() -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = seeded()?;
    let mut result = conn.query("SELECT id, name, score, born, active, 1 + 1 AS expr FROM people", ())?;
    assert_eq!(
        result.column_types(),
        [
            Some(ColumnType::Integer),
            Some(ColumnType::Text),
            Some(ColumnType::Float),
            Some(ColumnType::DateTime),
            Some(ColumnType::Bool),
            None,
        ]
    );
    Ok(())
}

#[test]
fn seek_skips_forward() -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = seeded()?;
    let mut result = conn.query("SELECT name FROM people ORDER BY id", ())?;
    result.seek(2)?;
    assert_eq!(result.fetch_field()?, Some(RowValues::Text("carol".into())));

    let mut result = conn.query("SELECT name FROM people ORDER BY id", ())?;
    result.seek(1)?;
    assert!(matches!(result.seek(0), Err(SqlGatewayError::InvalidState(_))));
    assert!(matches!(result.seek(10), Err(SqlGatewayError::InvalidArgument(_))));
    Ok(())
}

#[test]
fn iter_yields_remaining_rows() -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = seeded()?;
    let mut result = conn.query("SELECT name FROM people ORDER BY id", ())?;
    result.fetch()?;
    let names: Vec<RowValues> = result
        .iter()?
        .map(|row| row.map(|r| r.into_values().remove(0)))
        .collect::<Result<_, _>>()?;
    assert_eq!(
        names,
        vec![RowValues::Text("bob".into()), RowValues::Text("carol".into())]
    );
    Ok(())
}

#[test]
fn pairs_and_assoc_projections() -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = seeded()?;
    let pairs = conn.fetch_pairs("SELECT name, city FROM people ORDER BY id", (), None, None)?;
    assert_eq!(pairs.len(), 3);
    assert_eq!(pairs[0].0, RowValues::Int(0));
    let first = pairs[0].1.as_row().expect("whole row");
    assert_eq!(first.get("city"), Some(&RowValues::Text("Prague".into())));

    let cities = conn.fetch_pairs("SELECT name, city FROM people ORDER BY id", (), Some("name"), Some("city"))?;
    assert_eq!(cities[0].0, RowValues::Text("alice".into()));
    assert_eq!(cities[0].1.as_value(), Some(&RowValues::Text("Prague".into())));

    let by_country = conn.fetch_pairs(
        "SELECT country, name FROM people ORDER BY id",
        (),
        Some("country"),
        Some("name"),
    )?;
    assert_eq!(by_country.len(), 2);
    assert_eq!(by_country[0].1.as_value(), Some(&RowValues::Text("bob".into())));

    let indexed = conn.fetch_pairs("SELECT id, name, city FROM people ORDER BY id", (), None, None)?;
    assert_eq!(indexed[2].0, RowValues::Int(2));
    assert!(indexed[2].1.as_row().is_some());

    let tree = conn.fetch_assoc("SELECT * FROM people ORDER BY id", (), "country.city")?;
    let prague = tree
        .get(&RowValues::Text("CZ".into()))
        .and_then(|cz| cz.get(&RowValues::Text("Prague".into())))
        .and_then(AssocNode::as_row)
        .expect("CZ/Prague");
    assert_eq!(prague.get("name"), Some(&RowValues::Text("alice".into())));

    let grouped = conn.fetch_assoc("SELECT * FROM people ORDER BY id", (), "country.[]")?;
    let cz = grouped
        .get(&RowValues::Text("CZ".into()))
        .and_then(AssocNode::as_rows)
        .expect("CZ list");
    assert_eq!(cz.len(), 2);
    Ok(())
}

#[test]
fn duplicate_columns_are_reported_not_fatal() -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = seeded()?;
    let mut result = conn.query(
        "SELECT p.name, q.name FROM people p JOIN people q ON p.id = q.id ORDER BY p.id",
        (),
    )?;
    assert_eq!(result.duplicate_columns(), None);
    let row = result.fetch()?.expect("row");
    assert_eq!(result.duplicate_columns(), Some(&["name".to_owned()][..]));
    assert_eq!(row.len(), 1);
    Ok(())
}

#[test]
fn row_normalizer_rewrites_rows() -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = seeded()?;
    let mut result = conn.query("SELECT name, city FROM people ORDER BY id", ())?;
    result.set_row_normalizer(|pairs| {
        pairs
            .into_iter()
            .map(|(name, value)| match name.as_str() {
                "city" => (String::new(), value),
                _ => (name.to_uppercase(), value),
            })
            .collect()
    });
    let row = result.fetch()?.expect("row");
    assert_eq!(row.column_names(), ["NAME"]);
    Ok(())
}

#[test]
fn dml_reports_affected_rows_and_insert_id() -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = seeded()?;
    assert_eq!(conn.insert_id(None)?, "3");

    let result = conn.query("UPDATE people SET score = score + 1 WHERE country = ?", QueryArgs::new().arg("CZ"))?;
    assert_eq!(result.affected_rows(), Some(2));
    assert_eq!(result.column_count(), None);
    assert_eq!(conn.affected_rows(), Some(2));
    Ok(())
}

#[test]
fn literals_and_named_args_are_expanded() -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = seeded()?;
    let order = SqlLiteral::new("ORDER BY id DESC");
    let filter = SqlLiteral::with_params("country = ?", vec![RowValues::Text("CZ".into())]);
    let names = conn.fetch_fields(
        "SELECT name FROM people WHERE ? AND name <> :skip ?",
        QueryArgs::new()
            .arg(filter)
            .arg(order)
            .named("skip", "nobody"),
    )?;
    assert_eq!(
        names,
        vec![RowValues::Text("bob".into()), RowValues::Text("alice".into())]
    );

    let err = conn.query("SELECT ?", ()).unwrap_err();
    assert!(matches!(err, SqlGatewayError::ParameterError(_)));
    Ok(())
}
