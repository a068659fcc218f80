//! Extraction of match records from a SQLite store.

use std::io;
use std::path::Path;
use std::str;

use anyhow::anyhow;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};
use thiserror::Error;
use tracing::{debug, info};

use goalfit::model::ValidationError;

use crate::dataset::{Column, Dataset, MatchRecord};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("data source unavailable: {0}")]
    DataSourceUnavailable(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("invalid source mapping: {0}")]
    InvalidMapping(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Names of the match table and its columns in the source store. Matching is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMapping {
    pub table: String,
    pub id: String,
    pub season: String,
    pub home_team_id: String,
    pub away_team_id: String,
    pub home_goals: String,
    pub away_goals: String,
}
impl SourceMapping {
    pub fn column(&self, column: Column) -> &str {
        match column {
            Column::Id => &self.id,
            Column::Season => &self.season,
            Column::HomeTeamId => &self.home_team_id,
            Column::AwayTeamId => &self.away_team_id,
            Column::HomeGoals => &self.home_goals,
            Column::AwayGoals => &self.away_goals,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.table.is_empty() {
            return Err(anyhow!("table name cannot be empty").into());
        }
        let mut seen = vec![];
        for column in Column::iter() {
            let name = self.column(column).to_lowercase();
            if name.is_empty() {
                return Err(anyhow!("source name for {column} cannot be empty").into());
            }
            if seen.contains(&name) {
                return Err(anyhow!("source column {name} mapped more than once").into());
            }
            seen.push(name);
        }
        Ok(())
    }
}

impl Default for SourceMapping {
    fn default() -> Self {
        Self {
            table: "Match".into(),
            id: "id".into(),
            season: "season".into(),
            home_team_id: "home_team_api_id".into(),
            away_team_id: "away_team_api_id".into(),
            home_goals: "home_team_goal".into(),
            away_goals: "away_team_goal".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub declared_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
}
impl TableSchema {
    fn find_column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(name))
    }
}

/// The outcome of [load]: every table in the store and the projected match records.
#[derive(Debug)]
pub struct Extract {
    pub tables: Vec<TableSchema>,
    pub dataset: Dataset,
}

/// Opens the store at `path` read-only and projects its match table onto the six [Column]s.
pub fn load(path: impl AsRef<Path>, mapping: &SourceMapping) -> Result<Extract, LoadError> {
    mapping.validate()?;
    let path = path.as_ref();
    if !path.is_file() {
        return Err(LoadError::DataSourceUnavailable(format!(
            "{} is not a file",
            path.display()
        )));
    }
    let unavailable = |err: rusqlite::Error| {
        LoadError::DataSourceUnavailable(format!("cannot read {}: {err}", path.display()))
    };
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(unavailable)?;

    // the header is only checked on first access
    let tables = list_tables(&conn).map_err(|err| match err {
        LoadError::Database(err) => unavailable(err),
        other => other,
    })?;
    let dataset = load_matches(&conn, &tables, mapping)?;
    info!(
        "loaded {} matches from {} ({} tables)",
        dataset.len(),
        path.display(),
        tables.len()
    );
    Ok(Extract { tables, dataset })
}

/// Enumerates the tables in the store, in name order, with their declared columns.
pub fn list_tables(conn: &Connection) -> Result<Vec<TableSchema>, LoadError> {
    let mut stmt =
        conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote(&name)))?;
        let columns = stmt
            .query_map([], |row| {
                Ok(ColumnSchema {
                    name: row.get(1)?,
                    declared_type: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            "table {name}: {}",
            columns
                .iter()
                .map(|column| format!("{} {}", column.name, column.declared_type))
                .collect::<Vec<_>>()
                .join(", ")
        );
        tables.push(TableSchema { name, columns });
    }
    Ok(tables)
}

/// Reads the match table of an open store, given its previously listed schema.
pub fn load_matches(
    conn: &Connection,
    tables: &[TableSchema],
    mapping: &SourceMapping,
) -> Result<Dataset, LoadError> {
    let table = tables
        .iter()
        .find(|table| table.name.eq_ignore_ascii_case(&mapping.table))
        .ok_or_else(|| LoadError::SchemaMismatch(format!("no table named {}", mapping.table)))?;

    let mut projection = Vec::with_capacity(Column::COUNT);
    for column in Column::iter() {
        let source = mapping.column(column);
        let found = table.find_column(source).ok_or_else(|| {
            LoadError::SchemaMismatch(format!(
                "table {} has no column {source} (for {column})",
                table.name
            ))
        })?;
        projection.push(quote(&found.name));
    }
    let query = format!(
        "SELECT {} FROM {}",
        projection.join(", "),
        quote(&table.name)
    );
    debug!("query: {query}");

    let mut stmt = conn.prepare(&query)?;
    let mut rows = stmt.query([])?;
    let mut records = vec![];
    while let Some(row) = rows.next()? {
        let cell = Cell {
            row,
            index: records.len(),
            mapping,
        };
        records.push(MatchRecord {
            id: cell.integer(Column::Id)?,
            season: cell.text(Column::Season)?,
            home_team_id: cell.integer(Column::HomeTeamId)?,
            away_team_id: cell.integer(Column::AwayTeamId)?,
            home_goals: cell.goals(Column::HomeGoals)?,
            away_goals: cell.goals(Column::AwayGoals)?,
        });
    }
    Ok(Dataset::from(records))
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Typed access to the projected values of one source row.
struct Cell<'a, 'r> {
    row: &'a Row<'r>,
    index: usize,
    mapping: &'a SourceMapping,
}
impl Cell<'_, '_> {
    fn mismatch(&self, column: Column, problem: &str) -> LoadError {
        LoadError::SchemaMismatch(format!(
            "row {}: {problem} in column {}",
            self.index + 1,
            self.mapping.column(column)
        ))
    }

    fn value(&self, column: Column) -> Result<ValueRef<'_>, LoadError> {
        match self.row.get_ref(usize::from(column))? {
            ValueRef::Null => Err(self.mismatch(column, "NULL")),
            value => Ok(value),
        }
    }

    fn integer(&self, column: Column) -> Result<i64, LoadError> {
        match self.value(column)? {
            ValueRef::Integer(value) => Ok(value),
            ValueRef::Real(value) if value.fract() == 0.0 && value.abs() < i64::MAX as f64 => {
                Ok(value as i64)
            }
            other => Err(self.mismatch(column, &format!("non-integer {:?}", other.data_type()))),
        }
    }

    fn goals(&self, column: Column) -> Result<u32, LoadError> {
        let value = self.integer(column)?;
        u32::try_from(value).map_err(|_| self.mismatch(column, &format!("goal count {value}")))
    }

    fn text(&self, column: Column) -> Result<String, LoadError> {
        match self.value(column)? {
            ValueRef::Text(bytes) => str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|_| self.mismatch(column, "invalid UTF-8")),
            ValueRef::Integer(value) => Ok(value.to_string()),
            other => Err(self.mismatch(column, &format!("non-text {:?}", other.data_type()))),
        }
    }
}

#[cfg(test)]
mod tests;
