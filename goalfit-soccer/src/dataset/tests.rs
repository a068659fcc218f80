use std::fs;

use goalfit::design::Factor;
use tempfile::TempDir;

use super::*;

pub(crate) fn four_matches() -> Dataset {
    Dataset::from(vec![
        MatchRecord {
            id: 1,
            season: "2008/2009".into(),
            home_team_id: 1,
            away_team_id: 2,
            home_goals: 2,
            away_goals: 1,
        },
        MatchRecord {
            id: 2,
            season: "2008/2009".into(),
            home_team_id: 2,
            away_team_id: 1,
            home_goals: 0,
            away_goals: 3,
        },
        MatchRecord {
            id: 3,
            season: "2009/2010".into(),
            home_team_id: 1,
            away_team_id: 3,
            home_goals: 1,
            away_goals: 1,
        },
        MatchRecord {
            id: 4,
            season: "2009/2010".into(),
            home_team_id: 3,
            away_team_id: 1,
            home_goals: 4,
            away_goals: 0,
        },
    ])
}

#[test]
fn column_names_and_ordinals() {
    assert_eq!(
        vec!["id", "season", "home_team_id", "away_team_id", "home_goals", "away_goals"],
        Column::iter().map(|column| column.to_string()).collect::<Vec<_>>()
    );
    assert_eq!(4, usize::from(Column::HomeGoals));
    assert_eq!(ColumnKind::Count, Column::AwayGoals.kind());
    assert_eq!(ColumnKind::Categorical, Column::Season.kind());
    assert_eq!(ColumnKind::Identifier, Column::Id.kind());
}

#[test]
fn write_then_read() {
    let mut records = four_matches().records().to_vec();
    records.push(MatchRecord {
        id: 5,
        season: "odd, \"quoted\" season".into(),
        home_team_id: 9_987,
        away_team_id: 10_260,
        home_goals: 10,
        away_goals: 0,
    });
    records.push(MatchRecord {
        id: 6,
        season: "2010/\n2011\r\n".into(),
        home_team_id: 1,
        away_team_id: 3,
        home_goals: 2,
        away_goals: 2,
    });
    let dataset = Dataset::from(records);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("matches.csv");
    dataset.write_csv(&path).unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("id,season,home_team_id,away_team_id,home_goals,away_goals\n"));

    let read = Dataset::read_csv(&path).unwrap();
    assert_eq!(dataset.len(), read.len());
    assert_eq!(dataset, read);
}

#[test]
fn missing_file_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("matches.csv");
    assert!(matches!(
        Dataset::read_csv(path),
        Err(LoadError::DataSourceUnavailable(_))
    ));
}

#[test]
fn wrong_header_is_schema_mismatch() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("matches.csv");
    fs::write(&path, "id,season,home,away,home_goals,away_goals\n1,2008,1,2,0,0\n").unwrap();
    assert!(matches!(
        Dataset::read_csv(&path),
        Err(LoadError::SchemaMismatch(_))
    ));

    fs::write(&path, "").unwrap();
    assert!(matches!(
        Dataset::read_csv(&path),
        Err(LoadError::SchemaMismatch(_))
    ));
}

#[test]
fn bad_field_names_line() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("matches.csv");
    fs::write(
        &path,
        "id,season,home_team_id,away_team_id,home_goals,away_goals\n1,2008,1,2,0,0\n2,2008,2,1,-1,0\n",
    )
    .unwrap();
    let err = Dataset::read_csv(&path).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("line 3"), "{message}");
    assert!(message.contains("home_goals"), "{message}");

    fs::write(
        &path,
        "id,season,home_team_id,away_team_id,home_goals,away_goals\n1,2008,1,2,0\n",
    )
    .unwrap();
    assert!(matches!(
        Dataset::read_csv(&path),
        Err(LoadError::SchemaMismatch(_))
    ));
}

#[test]
fn line_numbers_count_quoted_line_breaks() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("matches.csv");
    fs::write(
        &path,
        "id,season,home_team_id,away_team_id,home_goals,away_goals\n1,\"2008/\n2009\",1,2,0,0\n2,2008,2,1,x,0\n",
    )
    .unwrap();
    let err = Dataset::read_csv(&path).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("line 4"), "{message}");
}

#[test]
fn filter_makes_a_new_dataset() {
    let dataset = four_matches();
    let later = dataset.filter(|record| record.season == "2009/2010");
    assert_eq!(2, later.len());
    assert_eq!(4, dataset.len());
    assert_eq!(vec!["2008/2009", "2009/2010"], dataset.seasons());
}

#[test]
fn frame_columns() {
    let dataset = four_matches();
    assert_eq!(4, dataset.rows());
    assert_eq!(vec![2.0, 0.0, 1.0, 4.0], dataset.counts(Column::HomeGoals).unwrap());
    assert_eq!(vec![1.0, 3.0, 1.0, 0.0], dataset.counts(Column::AwayGoals).unwrap());
    assert!(dataset.counts(Column::Season).is_err());

    let home: Factor = dataset.factor(Column::HomeTeamId).unwrap();
    assert_eq!("home_team_id", home.name());
    assert_eq!(&["1", "2", "3"], home.levels());
    let season = dataset.factor(Column::Season).unwrap();
    assert_eq!(&[0, 0, 1, 1], season.codes());
    assert!(dataset.factor(Column::Id).is_err());
    assert!(dataset.factor(Column::HomeGoals).is_err());
}
