use crate::column::ColumnType;
use crate::extra::{Contact, Predecessor};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::{json, Number, Value as JsonValue};
use std::fmt;
use std::hash::{Hash, Hasher};

const DATE_FORMAT: &str = "%Y-%m-%d";
const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Scalar value held in the plain value slot of a cell
#[derive(Debug, Clone)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl CellValue {
    /// Convert a raw transport value. `null` means the cell has no value.
    ///
    /// Arrays and objects do not belong in the plain value slot; they are kept
    /// as their JSON text so a single odd cell never aborts a sheet load.
    #[must_use]
    pub fn from_json(value: JsonValue) -> Option<CellValue> {
        match value {
            JsonValue::Null => None,
            JsonValue::Bool(b) => Some(CellValue::Bool(b)),
            JsonValue::Number(n) => n.as_f64().map(CellValue::Number),
            JsonValue::String(s) => Some(CellValue::Text(s)),
            other => {
                tracing::warn!("Structured data in a plain cell value slot: {}", other);
                Some(CellValue::Text(other.to_string()))
            }
        }
    }

    /// Convert back to the transport representation.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            CellValue::Text(s) => JsonValue::String(s.clone()),
            CellValue::Number(f) => number_to_json(*f),
            CellValue::Bool(b) => JsonValue::Bool(*b),
            CellValue::Date(d) => JsonValue::String(d.format(DATE_FORMAT).to_string()),
            CellValue::DateTime(dt) => {
                JsonValue::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
        }
    }

    /// Apply the coercion rule of the owning column's declared type.
    ///
    /// Only text values are ever reinterpreted. A value that does not parse as
    /// the declared type is returned unchanged.
    #[must_use]
    pub fn coerce(self, column_type: &ColumnType) -> CellValue {
        let raw = match self {
            CellValue::Text(raw) => raw,
            other => return other,
        };
        match column_type {
            ColumnType::Date => match parse_date(&raw) {
                Some(date) => CellValue::Date(date),
                None => {
                    tracing::warn!("Unable to parse '{}' as a date, keeping it as text", raw);
                    CellValue::Text(raw)
                }
            },
            ColumnType::DateTime | ColumnType::AbstractDateTime => match parse_datetime(&raw) {
                Some(dt) => CellValue::DateTime(dt),
                None => {
                    tracing::info!("Unable to parse '{}' as a datetime, keeping it as text", raw);
                    CellValue::Text(raw)
                }
            },
            _ => CellValue::Text(raw),
        }
    }

    /// Get the value as a string slice if it is text
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as a float if it is a number
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(f) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            CellValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }
}

fn number_to_json(f: f64) -> JsonValue {
    if f.fract() == 0.0 && f.abs() < 9.0e15 {
        JsonValue::Number(Number::from(f as i64))
    } else {
        Number::from_f64(f).map_or(JsonValue::Null, JsonValue::Number)
    }
}

/// Parse an ISO calendar date (`YYYY-MM-DD`).
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

/// Parse an ISO timestamp. Offsets are honoured; naive timestamps are UTC.
#[must_use]
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

// -0.0 and 0.0 must land on the same index key, as must every NaN.
fn canonical_bits(f: f64) -> u64 {
    if f == 0.0 {
        0.0f64.to_bits()
    } else if f.is_nan() {
        f64::NAN.to_bits()
    } else {
        f.to_bits()
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::Text(a), CellValue::Text(b)) => a == b,
            (CellValue::Number(a), CellValue::Number(b)) => canonical_bits(*a) == canonical_bits(*b),
            (CellValue::Bool(a), CellValue::Bool(b)) => a == b,
            (CellValue::Date(a), CellValue::Date(b)) => a == b,
            (CellValue::DateTime(a), CellValue::DateTime(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for CellValue {}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Text(s) => s.hash(state),
            CellValue::Number(f) => canonical_bits(*f).hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Date(d) => d.hash(state),
            CellValue::DateTime(dt) => dt.hash(state),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            CellValue::DateTime(dt) => {
                write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Number(f)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Number(i as f64)
    }
}

impl From<i32> for CellValue {
    fn from(i: i32) -> Self {
        CellValue::Number(f64::from(i))
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Date(d)
    }
}

impl From<DateTime<Utc>> for CellValue {
    fn from(dt: DateTime<Utc>) -> Self {
        CellValue::DateTime(dt)
    }
}

/// Structured cell payload, tagged on the wire by `objectType`
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectValue {
    MultiPicklist(Vec<String>),
    Contact(Contact),
    MultiContact(Vec<Contact>),
    PredecessorList(Vec<Predecessor>),
    /// Any object type without a dedicated variant, kept verbatim
    Other(JsonValue),
}

impl ObjectValue {
    #[must_use]
    pub fn from_json(value: JsonValue) -> ObjectValue {
        let tag = value
            .get("objectType")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();
        let parsed = match tag.as_str() {
            "MULTI_PICKLIST" => field(&value, "values").map(ObjectValue::MultiPicklist),
            "CONTACT" => serde_json::from_value(value.clone())
                .ok()
                .map(ObjectValue::Contact),
            "MULTI_CONTACT" => field(&value, "values").map(ObjectValue::MultiContact),
            "PREDECESSOR_LIST" => {
                field(&value, "predecessors").map(ObjectValue::PredecessorList)
            }
            _ => None,
        };
        parsed.unwrap_or(ObjectValue::Other(value))
    }

    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            ObjectValue::MultiPicklist(values) => {
                json!({"objectType": "MULTI_PICKLIST", "values": values})
            }
            ObjectValue::Contact(contact) => {
                let mut value = serde_json::to_value(contact).unwrap_or_else(|_| json!({}));
                if let Some(map) = value.as_object_mut() {
                    map.insert("objectType".into(), "CONTACT".into());
                }
                value
            }
            ObjectValue::MultiContact(values) => {
                json!({"objectType": "MULTI_CONTACT", "values": values})
            }
            ObjectValue::PredecessorList(predecessors) => {
                json!({"objectType": "PREDECESSOR_LIST", "predecessors": predecessors})
            }
            ObjectValue::Other(value) => value.clone(),
        }
    }

    /// Selected options when this is a multi-select payload
    #[must_use]
    pub fn as_multi_picklist(&self) -> Option<&[String]> {
        match self {
            ObjectValue::MultiPicklist(values) => Some(values),
            _ => None,
        }
    }
}

fn field<T: serde::de::DeserializeOwned>(value: &JsonValue, key: &str) -> Option<T> {
    value
        .get(key)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(CellValue::from_json(JsonValue::Null), None);
        assert_eq!(
            CellValue::from_json(json!("ACME")),
            Some(CellValue::Text("ACME".to_string()))
        );
        assert_eq!(CellValue::from_json(json!(3)), Some(CellValue::Number(3.0)));
        assert_eq!(CellValue::from_json(json!(true)), Some(CellValue::Bool(true)));
    }

    #[test]
    fn test_structured_value_degrades_to_text() {
        let value = CellValue::from_json(json!(["a", "b"])).unwrap();
        assert_eq!(value, CellValue::Text("[\"a\",\"b\"]".to_string()));
    }

    #[test]
    fn test_coerce_date() {
        let value = CellValue::from("1990-01-01").coerce(&ColumnType::Date);
        assert_eq!(value.as_date(), NaiveDate::from_ymd_opt(1990, 1, 1));
    }

    #[test]
    fn test_coerce_bad_date_is_kept() {
        let value = CellValue::from("not a date").coerce(&ColumnType::Date);
        assert_eq!(value, CellValue::Text("not a date".to_string()));
    }

    #[test]
    fn test_coerce_datetime() {
        let value = CellValue::from("2019-03-04T10:20:30Z").coerce(&ColumnType::DateTime);
        let dt = value.as_datetime().unwrap();
        assert_eq!(dt.to_rfc3339_opts(SecondsFormat::Secs, true), "2019-03-04T10:20:30Z");

        let naive = CellValue::from("2019-03-04T10:20:30").coerce(&ColumnType::AbstractDateTime);
        assert_eq!(naive.as_datetime(), Some(dt));
    }

    #[test]
    fn test_datetime_to_json_keeps_fraction() {
        let value = CellValue::from("2020-05-01T10:00:00.250Z").coerce(&ColumnType::DateTime);
        assert_eq!(value.to_json(), json!("2020-05-01T10:00:00.250Z"));
        assert_eq!(value.to_string(), "2020-05-01T10:00:00.250Z");

        let whole = CellValue::from("2020-05-01T10:00:00Z").coerce(&ColumnType::DateTime);
        assert_eq!(whole.to_json(), json!("2020-05-01T10:00:00Z"));
    }

    #[test]
    fn test_coerce_leaves_other_types() {
        let value = CellValue::from("1990-01-01").coerce(&ColumnType::TextNumber);
        assert_eq!(value.as_str(), Some("1990-01-01"));
        let number = CellValue::Number(5.0).coerce(&ColumnType::Date);
        assert_eq!(number, CellValue::Number(5.0));
    }

    #[test]
    fn test_to_json() {
        assert_eq!(CellValue::Number(3.0).to_json(), json!(3));
        assert_eq!(CellValue::Number(2.5).to_json(), json!(2.5));
        let date = CellValue::Date(NaiveDate::from_ymd_opt(1980, 1, 1).unwrap());
        assert_eq!(date.to_json(), json!("1980-01-01"));
    }

    #[test]
    fn test_number_keys_hash_consistently() {
        let mut set = HashSet::new();
        set.insert(CellValue::Number(0.0));
        assert!(set.contains(&CellValue::Number(-0.0)));
        assert!(!set.contains(&CellValue::Text("0".to_string())));
        assert_eq!(CellValue::Number(f64::NAN), CellValue::Number(f64::NAN));
    }

    #[test]
    fn test_object_value_multi_picklist() {
        let raw = json!({"objectType": "MULTI_PICKLIST", "values": ["nornir", "napalm"]});
        let value = ObjectValue::from_json(raw.clone());
        assert_eq!(
            value.as_multi_picklist(),
            Some(&["nornir".to_string(), "napalm".to_string()][..])
        );
        assert_eq!(value.to_json(), raw);
    }

    #[test]
    fn test_object_value_unknown_kept() {
        let raw = json!({"objectType": "DURATION", "days": 3});
        assert_eq!(ObjectValue::from_json(raw.clone()), ObjectValue::Other(raw));
    }
}
