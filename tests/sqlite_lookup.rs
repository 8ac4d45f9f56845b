use std::path::Path;

use dom6api::{ApiConfig, LookupService, MatchRequest, SelectionMode};
use rusqlite::Connection;
use tempfile::TempDir;

fn fixture(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("dom6api.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE units (id INTEGER PRIMARY KEY, name TEXT, size INTEGER, gcost REAL);
        INSERT INTO units VALUES (1, 'Longbowman', 2, 10.0);
        INSERT INTO units VALUES (2, 'Long Spearman', 2, 10.0);
        INSERT INTO units VALUES (3, 'Militia', 2, NULL);
        CREATE TABLE sites (id INTEGER PRIMARY KEY, name TEXT, rarity TEXT);
        INSERT INTO sites VALUES (10, 'Fountain of Youth', 'Rare');
        INSERT INTO sites VALUES (11, 'Iron Mine', 'Common');
        INSERT INTO sites VALUES (12, 'Dragon Lair', 'RARE');
        "#,
    )
    .unwrap();
    path
}

fn config(backend: &str, path: &Path, data_root: &str) -> ApiConfig {
    ApiConfig::from_yaml(&format!(
        r#"
version: "1.0"
tables: [units, sites]
data_root: "{data_root}"
database:
  backend: "{backend}"
  path: "{}"
"#,
        path.display()
    ))
    .unwrap()
}

fn bodies(service: &LookupService) -> Vec<serde_json::Value> {
    let requests = [
        MatchRequest::new("units").with_path_identifier("01"),
        MatchRequest::new("units")
            .with_constraint("name", "long")
            .with_fuzzy(true),
        MatchRequest::new("units")
            .with_constraint("name", "long")
            .with_fuzzy(true)
            .with_mode(SelectionMode::Best),
        MatchRequest::new("units").with_constraint("gcost", "10"),
        MatchRequest::new("sites").with_constraint("rarity", "Rare"),
        MatchRequest::new("sites").with_path_identifier("404"),
    ];
    requests
        .iter()
        .map(|req| serde_json::to_value(service.lookup(req).unwrap()).unwrap())
        .collect()
}

#[test]
fn sqlite_rows_are_shaped_in_schema_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir);
    let service = LookupService::from_config(&config("sqlite", &path, "Data")).unwrap();

    let shaped = service
        .lookup(&MatchRequest::new("units").with_path_identifier("3"))
        .unwrap();
    assert_eq!(
        serde_json::to_string(&shaped).unwrap(),
        r#"{"units":[{"id":3,"name":"Militia","size":2,"gcost":null,"image":"Data/Units/3.png"}]}"#
    );
}

#[test]
fn per_request_and_snapshot_backends_agree() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir);

    let live = LookupService::from_config(&config("sqlite", &path, "Data")).unwrap();
    let snapshot = LookupService::from_config(&config("sqlite_snapshot", &path, "Data")).unwrap();

    let live_bodies = bodies(&live);
    assert_eq!(live_bodies, bodies(&snapshot));

    assert_eq!(live_bodies[0]["units"][0]["name"], "Longbowman");
    assert_eq!(live_bodies[1]["units"].as_array().unwrap().len(), 2);
    assert_eq!(live_bodies[2]["units"][0]["id"], 1);
    assert_eq!(live_bodies[3]["units"].as_array().unwrap().len(), 2);
    let rare: Vec<_> = live_bodies[4]["sites"]
        .as_array()
        .unwrap()
        .iter()
        .map(|site| site["id"].as_i64().unwrap())
        .collect();
    assert_eq!(rare, vec![10, 12]);
    assert_eq!(live_bodies[5], serde_json::json!({ "sites": [] }));
}

#[test]
fn missing_database_is_created_when_requested() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("fresh.db");
    let mut config = config("sqlite", &path, "/srv/Data");
    config.database.create_if_missing = true;

    let service = LookupService::from_config(&config).unwrap();
    assert!(path.exists());
    assert_eq!(
        service.matcher().registry().columns_of("units").unwrap(),
        ["id", "name"]
    );
    let shaped = service.lookup(&MatchRequest::new("sites")).unwrap();
    assert!(shaped.is_empty());
    assert_eq!(shaped.key(), "sites");
}

#[test]
fn configured_table_missing_from_database_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir);
    let mut config = config("sqlite", &path, "Data");
    config.tables.push("spells".to_string());
    assert!(LookupService::from_config(&config).is_err());
}
