//! JSON file persistence.

use std::fs;
use std::fs::File;
use std::io::{BufReader, BufWriter, Error, ErrorKind, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{from_reader, to_writer_pretty};

/// Reads a JSON-encoded type from a given file `path`.
pub fn read_json<D: DeserializeOwned>(path: impl AsRef<Path>) -> Result<D, Error> {
    let path = path.as_ref();
    let file = File::open(path)?;
    from_reader(BufReader::new(file)).map_err(|err| {
        Error::new(
            ErrorKind::InvalidData,
            format!("malformed JSON in {}: {err}", path.display()),
        )
    })
}

/// JSON-encodes the `value` in pretty-printed form and writes it to a given `path`, creating any
/// missing parent directories.
pub fn write_json(path: impl AsRef<Path>, value: &impl Serialize) -> Result<(), Error> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = BufWriter::new(File::create(path)?);
    to_writer_pretty(&mut writer, value)?;
    writer.flush()
}

pub trait ReadJsonFile<D> {
    fn read_json_file(path: impl AsRef<Path>) -> Result<D, Error>;
}

impl<D: DeserializeOwned> ReadJsonFile<D> for D {
    fn read_json_file(path: impl AsRef<Path>) -> Result<D, Error> {
        read_json(path)
    }
}

pub trait WriteJsonFile<S: Serialize> {
    fn write_json_file(&self, path: impl AsRef<Path>) -> Result<(), Error>;
}

impl<S: Serialize> WriteJsonFile<S> for S {
    fn write_json_file(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        write_json(path, self)
    }
}

/// Serde adapter that writes non-finite floats as `null` (JSON has no `NaN`) and reads `null` back
/// as `NaN`.
pub mod nullable_f64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use tempfile::{NamedTempFile, TempDir};

    use super::*;

    #[test]
    fn write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("values.json");
        let values = BTreeMap::from([("theta".to_string(), 1.25), ("mu".to_string(), 0.5)]);
        values.write_json_file(&path).unwrap();
        let read = BTreeMap::<String, f64>::read_json_file(&path).unwrap();
        assert_eq!(values, read);
    }

    #[derive(Debug, Serialize, serde::Deserialize)]
    struct Estimate {
        #[serde(with = "nullable_f64")]
        std_error: f64,
    }

    #[test]
    fn nan_written_as_null() {
        let json = serde_json::to_string(&Estimate { std_error: f64::NAN }).unwrap();
        assert_eq!(r#"{"std_error":null}"#, json);
        let read: Estimate = serde_json::from_str(&json).unwrap();
        assert!(read.std_error.is_nan());
        let read: Estimate = serde_json::from_str(r#"{"std_error":0.25}"#).unwrap();
        assert_eq!(0.25, read.std_error);
    }

    #[test]
    fn malformed_json() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "{not json").unwrap();
        let err = read_json::<BTreeMap<String, f64>>(file.path()).unwrap_err();
        assert_eq!(ErrorKind::InvalidData, err.kind());
    }
}
