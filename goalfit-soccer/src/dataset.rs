//! The cleaned match table and its flat-file form.

use std::io;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{anyhow, Context};
use ordinalizer::Ordinal;
use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{Display, EnumCount, EnumIter};
use tracing::debug;

use goalfit::csv::{CsvReader, CsvWriter, Record};
use goalfit::design::Factor;
use goalfit::model::{ColumnKind, FitError, Frame};

use crate::data::LoadError;

/// The six columns of a [Dataset], in flat-file order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Ordinal,
    EnumCount,
    EnumIter,
    Display,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
pub enum Column {
    Id,
    Season,
    HomeTeamId,
    AwayTeamId,
    HomeGoals,
    AwayGoals,
}
impl Column {
    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Id => ColumnKind::Identifier,
            Column::Season | Column::HomeTeamId | Column::AwayTeamId => ColumnKind::Categorical,
            Column::HomeGoals | Column::AwayGoals => ColumnKind::Count,
        }
    }
}

impl From<Column> for usize {
    fn from(column: Column) -> Self {
        column.ordinal()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: i64,
    pub season: String,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub home_goals: u32,
    pub away_goals: u32,
}
impl MatchRecord {
    fn parse(fields: &[String]) -> Result<Self, anyhow::Error> {
        if fields.len() != Column::COUNT {
            return Err(anyhow!(
                "expected {} fields, got {}",
                Column::COUNT,
                fields.len()
            ));
        }
        fn field<T: std::str::FromStr>(fields: &[String], column: Column) -> Result<T, anyhow::Error>
        where
            T::Err: std::error::Error + Send + Sync + 'static,
        {
            let value = &fields[usize::from(column)];
            value
                .parse()
                .with_context(|| format!("invalid {column} {value:?}"))
        }
        Ok(Self {
            id: field(fields, Column::Id)?,
            season: fields[usize::from(Column::Season)].clone(),
            home_team_id: field(fields, Column::HomeTeamId)?,
            away_team_id: field(fields, Column::AwayTeamId)?,
            home_goals: field(fields, Column::HomeGoals)?,
            away_goals: field(fields, Column::AwayGoals)?,
        })
    }

    fn to_record(&self) -> Record {
        let mut record = Record::with_capacity(Column::COUNT);
        record.set(Column::Id, self.id);
        record.set(Column::Season, &self.season);
        record.set(Column::HomeTeamId, self.home_team_id);
        record.set(Column::AwayTeamId, self.away_team_id);
        record.set(Column::HomeGoals, self.home_goals);
        record.set(Column::AwayGoals, self.away_goals);
        record
    }
}

/// An ordered, read-only collection of match records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<MatchRecord>,
}
impl Dataset {
    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// A new dataset holding the records that satisfy `predicate`.
    pub fn filter(&self, predicate: impl Fn(&MatchRecord) -> bool) -> Self {
        Self {
            records: self
                .records
                .iter()
                .filter(|&record| predicate(record))
                .cloned()
                .collect(),
        }
    }

    /// Distinct seasons in lexicographic order.
    pub fn seasons(&self) -> Vec<&str> {
        let mut seasons: Vec<_> = self.records.iter().map(|record| record.season.as_str()).collect();
        seasons.sort_unstable();
        seasons.dedup();
        seasons
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), io::Error> {
        let mut csv = CsvWriter::create(path)?;
        csv.append(Record::with_values(Column::iter()))?;
        for record in &self.records {
            csv.append(record.to_record())?;
        }
        csv.flush()
    }

    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let mut csv = CsvReader::open(path).map_err(|err| {
            LoadError::DataSourceUnavailable(format!("cannot open {}: {err}", path.display()))
        })?;

        let header = match csv.next() {
            None => {
                return Err(LoadError::SchemaMismatch(format!(
                    "{} has no header",
                    path.display()
                )))
            }
            Some(header) => header.map_err(read_error)?,
        };
        let expected: Vec<_> = Column::iter().map(|column| column.to_string()).collect();
        if header != expected {
            return Err(LoadError::SchemaMismatch(format!(
                "expected header {expected:?}, got {header:?}"
            )));
        }

        let mut records = vec![];
        while let Some(fields) = csv.next() {
            let fields = fields.map_err(read_error)?;
            let record = MatchRecord::parse(&fields).map_err(|err| {
                LoadError::SchemaMismatch(format!("line {}: {err:#}", csv.line_number()))
            })?;
            records.push(record);
        }
        debug!("read {} records from {}", records.len(), path.display());
        Ok(Self { records })
    }

    fn team_ids(&self, column: Column) -> Vec<i64> {
        self.records
            .iter()
            .map(|record| match column {
                Column::HomeTeamId => record.home_team_id,
                _ => record.away_team_id,
            })
            .collect()
    }
}

fn read_error(err: io::Error) -> LoadError {
    match err.kind() {
        ErrorKind::InvalidData => LoadError::SchemaMismatch(err.to_string()),
        _ => LoadError::Io(err),
    }
}

impl From<Vec<MatchRecord>> for Dataset {
    fn from(records: Vec<MatchRecord>) -> Self {
        Self { records }
    }
}

impl Frame for Dataset {
    type Column = Column;

    fn rows(&self) -> usize {
        self.records.len()
    }

    fn kind(&self, column: Column) -> ColumnKind {
        column.kind()
    }

    fn counts(&self, column: Column) -> Result<Vec<f64>, FitError> {
        let goals = |record: &MatchRecord| match column {
            Column::HomeGoals => record.home_goals,
            _ => record.away_goals,
        };
        match column {
            Column::HomeGoals | Column::AwayGoals => Ok(self
                .records
                .iter()
                .map(|record| goals(record) as f64)
                .collect()),
            _ => Err(FitError::SchemaMismatch(format!("{column} is not a count"))),
        }
    }

    fn factor(&self, column: Column) -> Result<Factor, FitError> {
        match column {
            Column::Season => {
                let seasons: Vec<_> = self.records.iter().map(|record| record.season.as_str()).collect();
                Ok(Factor::new(column.to_string(), &seasons))
            }
            Column::HomeTeamId | Column::AwayTeamId => {
                Ok(Factor::new(column.to_string(), &self.team_ids(column)))
            }
            _ => Err(FitError::SchemaMismatch(format!(
                "{column} is not categorical"
            ))),
        }
    }
}

#[cfg(test)]
mod tests;
