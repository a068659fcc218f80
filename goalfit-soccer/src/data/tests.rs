use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use super::*;

/// A store in the shape of the European Soccer Database, with more columns and tables than are read.
fn create_store(dir: &TempDir, rows: &str) -> PathBuf {
    let path = dir.path().join("database.sqlite");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(&format!(
        r#"
        CREATE TABLE Country (id INTEGER PRIMARY KEY, name TEXT);
        INSERT INTO Country VALUES (1729, 'England');
        CREATE TABLE Match (
            id INTEGER PRIMARY KEY,
            country_id INTEGER,
            season TEXT,
            date TEXT,
            home_team_api_id INTEGER,
            away_team_api_id INTEGER,
            home_team_goal INTEGER,
            away_team_goal INTEGER,
            B365H NUMERIC
        );
        {rows}
        "#
    ))
    .unwrap();
    path
}

const ROWS: &str = r#"
    INSERT INTO Match VALUES (1, 1729, '2008/2009', '2008-08-16', 10260, 10261, 1, 1, 1.29);
    INSERT INTO Match VALUES (2, 1729, '2008/2009', '2008-08-16', 9825, 8659, 1, 0, 1.2);
    INSERT INTO Match VALUES (3, 1729, '2009/2010', '2009-08-15', 8472, 8650, 0, 1, NULL);
"#;

fn expected() -> Dataset {
    Dataset::from(vec![
        MatchRecord {
            id: 1,
            season: "2008/2009".into(),
            home_team_id: 10260,
            away_team_id: 10261,
            home_goals: 1,
            away_goals: 1,
        },
        MatchRecord {
            id: 2,
            season: "2008/2009".into(),
            home_team_id: 9825,
            away_team_id: 8659,
            home_goals: 1,
            away_goals: 0,
        },
        MatchRecord {
            id: 3,
            season: "2009/2010".into(),
            home_team_id: 8472,
            away_team_id: 8650,
            home_goals: 0,
            away_goals: 1,
        },
    ])
}

#[test]
fn projects_six_columns() {
    let dir = TempDir::new().unwrap();
    let path = create_store(&dir, ROWS);
    let extract = load(&path, &SourceMapping::default()).unwrap();
    assert_eq!(expected(), extract.dataset);

    assert_eq!(
        vec!["Country", "Match"],
        extract
            .tables
            .iter()
            .map(|table| table.name.as_str())
            .collect::<Vec<_>>()
    );
    let source = &extract.tables[1];
    assert_eq!(9, source.columns.len());
    assert_eq!(
        ColumnSchema {
            name: "B365H".into(),
            declared_type: "NUMERIC".into()
        },
        source.columns[8]
    );
}

#[test]
fn nonexistent_store_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("database.sqlite");
    assert!(matches!(
        load(&path, &SourceMapping::default()),
        Err(LoadError::DataSourceUnavailable(_))
    ));
    assert!(!path.exists());
}

#[test]
fn non_database_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("database.sqlite");
    fs::write(&path, "id,season,home_team_id\n".repeat(100)).unwrap();
    let err = load(&path, &SourceMapping::default()).unwrap_err();
    assert!(matches!(err, LoadError::DataSourceUnavailable(_)), "{err}");
}

#[test]
fn missing_table_is_schema_mismatch() {
    let dir = TempDir::new().unwrap();
    let path = create_store(&dir, ROWS);
    let mapping = SourceMapping {
        table: "Fixture".into(),
        ..SourceMapping::default()
    };
    let err = load(&path, &mapping).unwrap_err();
    assert_eq!("schema mismatch: no table named Fixture", err.to_string());
}

#[test]
fn missing_column_is_schema_mismatch() {
    let dir = TempDir::new().unwrap();
    let path = create_store(&dir, ROWS);
    let mapping = SourceMapping {
        home_goals: "home_goals".into(),
        ..SourceMapping::default()
    };
    let err = load(&path, &mapping).unwrap_err();
    assert_eq!(
        "schema mismatch: table Match has no column home_goals (for home_goals)",
        err.to_string()
    );
}

#[test]
fn null_is_schema_mismatch() {
    let dir = TempDir::new().unwrap();
    let path = create_store(
        &dir,
        "INSERT INTO Match VALUES (1, 1729, '2008/2009', '2008-08-16', NULL, 10261, 1, 1, 1.29);",
    );
    let err = load(&path, &SourceMapping::default()).unwrap_err();
    assert_eq!(
        "schema mismatch: row 1: NULL in column home_team_api_id",
        err.to_string()
    );
}

#[test]
fn negative_goals_are_schema_mismatch() {
    let dir = TempDir::new().unwrap();
    let path = create_store(
        &dir,
        &format!(
            "{ROWS} INSERT INTO Match VALUES (4, 1729, '2009/2010', '2009-08-15', 8472, 8650, 0, -2, NULL);"
        ),
    );
    let err = load(&path, &SourceMapping::default()).unwrap_err();
    assert_eq!(
        "schema mismatch: row 4: goal count -2 in column away_team_goal",
        err.to_string()
    );
}

#[test]
fn custom_mapping() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("database.sqlite");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE fixtures (fid INTEGER, year INTEGER, host INTEGER, guest INTEGER, hg INTEGER, ag INTEGER);
        INSERT INTO fixtures VALUES (7, 2015, 1, 2, 3, 0);
        "#,
    )
    .unwrap();
    drop(conn);

    let mapping = SourceMapping {
        table: "FIXTURES".into(),
        id: "fid".into(),
        season: "year".into(),
        home_team_id: "Host".into(),
        away_team_id: "guest".into(),
        home_goals: "hg".into(),
        away_goals: "ag".into(),
    };
    let extract = load(&path, &mapping).unwrap();
    assert_eq!(
        &[MatchRecord {
            id: 7,
            season: "2015".into(),
            home_team_id: 1,
            away_team_id: 2,
            home_goals: 3,
            away_goals: 0,
        }],
        extract.dataset.records()
    );
}

#[test]
fn mapping_validation() {
    assert!(SourceMapping::default().validate().is_ok());

    let err = SourceMapping {
        season: String::new(),
        ..SourceMapping::default()
    }
    .validate()
    .unwrap_err();
    assert_eq!("source name for season cannot be empty", err.to_string());

    let err = SourceMapping {
        away_goals: "HOME_TEAM_GOAL".into(),
        ..SourceMapping::default()
    }
    .validate()
    .unwrap_err();
    assert_eq!(
        "source column home_team_goal mapped more than once",
        err.to_string()
    );

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("database.sqlite");
    assert!(matches!(
        load(
            &path,
            &SourceMapping {
                table: String::new(),
                ..SourceMapping::default()
            }
        ),
        Err(LoadError::InvalidMapping(_))
    ));
}

#[test]
fn quoted_identifiers() {
    assert_eq!("\"Match\"", quote("Match"));
    assert_eq!("\"odd\"\"name\"", quote("odd\"name"));
}
