//! Utilities for working with CSV files.
//!
//! Fields containing a delimiter, a quote or a line break are quoted on write and unquoted on
//! read, so that any value survives a round trip.

use std::borrow::Cow;
use std::fs::File;
use std::io;
use std::io::ErrorKind;
use std::ops::{Index, IndexMut};
use std::path::Path;

use ::csv::{ReaderBuilder, StringRecordsIntoIter, Terminator, WriterBuilder};

pub struct CsvWriter {
    writer: ::csv::Writer<File>,
}
impl CsvWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, io::Error> {
        let file = File::create(path)?;
        let writer = WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .from_writer(file);
        Ok(Self { writer })
    }

    pub fn append<R>(&mut self, record: R) -> Result<(), io::Error>
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        for datum in record {
            self.writer.write_field(datum.as_ref())?;
        }
        self.writer.write_record(None::<&[u8]>)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), io::Error> {
        self.writer.flush()
    }
}

pub struct CsvReader {
    records: StringRecordsIntoIter<File>,
    line_number: usize,
}
impl CsvReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, io::Error> {
        let file = File::open(path)?;
        let records = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file)
            .into_records();
        Ok(Self {
            records,
            line_number: 0,
        })
    }

    /// The 1-based number of the line on which the record most recently read starts.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn read(&mut self) -> Option<Result<Vec<String>, io::Error>> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(err) => return Some(Err(read_error(err))),
        };
        self.line_number = record
            .position()
            .map(|position| position.line() as usize)
            .unwrap_or(self.line_number + 1);
        Some(Ok(record.iter().map(String::from).collect()))
    }
}

/// I/O failures keep their kind; malformed content is reported as [ErrorKind::InvalidData].
fn read_error(err: ::csv::Error) -> io::Error {
    let message = err.to_string();
    match err.into_kind() {
        ::csv::ErrorKind::Io(err) => err,
        _ => io::Error::new(ErrorKind::InvalidData, message),
    }
}

impl Iterator for CsvReader {
    type Item = Result<Vec<String>, io::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    items: Vec<Cow<'static, str>>,
}
impl Record {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut items = Vec::with_capacity(capacity);
        items.resize_with(capacity, || Cow::Borrowed(""));
        Self { items }
    }

    pub fn with_values<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        let items = values
            .into_iter()
            .map(|value| Cow::Owned(value.to_string()))
            .collect();
        Self { items }
    }

    pub fn set(&mut self, ordinal: impl Into<usize>, value: impl ToString) {
        self.items[ordinal.into()] = Cow::Owned(value.to_string())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl IntoIterator for Record {
    type Item = Cow<'static, str>;
    type IntoIter = std::vec::IntoIter<Cow<'static, str>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<I: Into<usize>> Index<I> for Record {
    type Output = Cow<'static, str>;

    fn index(&self, index: I) -> &Self::Output {
        &self.items[index.into()]
    }
}

impl<I: Into<usize>> IndexMut<I> for Record {
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        &mut self.items[index.into()]
    }
}
