// src/metadata.rs

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One saved image. `filename` is the unique key within the index.
///
/// Records written by older tooling used `file` and `timestamp`; both are
/// still accepted on load. Fields this tool does not know are kept in
/// `extra` and written back untouched.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct IndexRecord {
    #[serde(alias = "file")]
    pub filename: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, deserialize_with = "dimension")]
    pub width: u32,
    #[serde(default, deserialize_with = "dimension")]
    pub height: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(alias = "timestamp", default, deserialize_with = "null_as_default")]
    pub date_added: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IndexRecord {
    /// True when the record was added on `day` (formatted `YYYY-MM-DD`).
    pub fn added_on(&self, day: &str) -> bool {
        self.date_added.starts_with(day)
    }
}

/// An element of the index document. Elements that cannot be read as a
/// record are carried through verbatim.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum IndexEntry {
    Record(IndexRecord),
    Unrecognized(Value),
}

impl IndexEntry {
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value::<IndexRecord>(value.clone()) {
            Ok(record) => IndexEntry::Record(record),
            Err(e) => {
                log::warn!("Keeping unrecognized index entry as-is: {}", e);
                IndexEntry::Unrecognized(value)
            }
        }
    }

    pub fn record(&self) -> Option<&IndexRecord> {
        match self {
            IndexEntry::Record(record) => Some(record),
            IndexEntry::Unrecognized(_) => None,
        }
    }

    /// Filename of the entry, also for entries that only partly parse.
    pub fn filename(&self) -> Option<&str> {
        match self {
            IndexEntry::Record(record) => Some(&record.filename),
            IndexEntry::Unrecognized(value) => value
                .get("filename")
                .or_else(|| value.get("file"))
                .and_then(Value::as_str),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Pixel sizes: `null` is 0, whole-number floats are accepted.
fn dimension<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let number = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(0),
        Some(Value::Number(number)) => number,
        Some(other) => return Err(D::Error::custom(format!("invalid dimension {}", other))),
    };

    if let Some(n) = number.as_u64() {
        return u32::try_from(n).map_err(D::Error::custom);
    }
    match number.as_f64() {
        Some(f) if f.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&f) => Ok(f as u32),
        _ => Err(D::Error::custom(format!("invalid dimension {}", number))),
    }
}
