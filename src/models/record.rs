//! The record capability
//!
//! The storage layer handles sessions and folders through this trait only.
//! It never looks inside a record except for its name, which shows up in
//! diagnostics.

use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Serialized form of one record
pub type RecordMap = Map<String, Value>;

/// Capability every persisted item implements
pub trait Record: Sized {
    /// Collection label used in log messages ("session", "folder")
    const KIND: &'static str;

    /// Stable display name
    fn name(&self) -> &str;

    /// Validation errors; empty means valid
    fn validate(&self) -> Vec<String>;

    fn to_map(&self) -> RecordMap;

    fn from_map(map: &RecordMap) -> Result<Self, String>;

    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// Serialize the valid records of a collection, dropping the invalid ones
pub fn collect_valid<'a, R, I>(records: I) -> Vec<RecordMap>
where
    R: Record + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut maps = Vec::new();
    for record in records {
        let errors = record.validate();
        if errors.is_empty() {
            maps.push(record.to_map());
        } else {
            warn!(
                kind = R::KIND,
                name = record.name(),
                ?errors,
                "Skipping invalid record"
            );
        }
    }
    maps
}

/// Rebuild each map as a record, keeping only those that validate
///
/// A map that cannot be rebuilt or fails validation is logged and dropped;
/// the rest of the collection is unaffected.
pub fn retain_valid<R: Record>(maps: Vec<RecordMap>) -> Vec<RecordMap> {
    let mut valid = Vec::with_capacity(maps.len());
    for (index, map) in maps.into_iter().enumerate() {
        match R::from_map(&map) {
            Ok(record) => {
                let errors = record.validate();
                if errors.is_empty() {
                    debug!(kind = R::KIND, name = record.name(), "Record validated");
                    valid.push(record.to_map());
                } else {
                    warn!(
                        kind = R::KIND,
                        index,
                        name = record.name(),
                        ?errors,
                        "Dropping invalid record"
                    );
                }
            }
            Err(reason) => {
                warn!(kind = R::KIND, index, %reason, "Dropping unreadable record");
            }
        }
    }
    valid
}

/// Name stored in a record map, if it is a string
pub fn map_name(map: &RecordMap) -> Option<&str> {
    map.get("name").and_then(Value::as_str)
}
