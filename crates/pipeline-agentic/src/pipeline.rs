//! Aggregation pipeline values
//!
//! The model hands pipelines back as JSON text. They are parsed into an
//! ordered, recursive [`PipelineValue`] tree (key order matters for `$sort`
//! and `$group` stages), then a single rewrite pass turns date-looking strings
//! into native timestamps so range filters compare against stored dates
//! instead of strings.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// `2024-05-20`
static CALENDAR_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// `2024-05-20T10:00`, `2024-05-20 10:00:00.123`, `2024-05-20T10:00:00+02:00`, `...Z`
static ISO_DATETIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(:\d{2}(\.\d{1,9})?)?(Z|[+-]\d{2}:?\d{2})?$")
        .unwrap()
});

/// Stage operators that write to the database
const WRITE_STAGES: &[&str] = &["$out", "$merge"];

/// Why pipeline text could not be used
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("pipeline is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("pipeline must be a JSON array of stage objects")]
    NotAnArray,

    #[error("pipeline stage {0} is not a JSON object")]
    InvalidStage(usize),
}

/// One node of a pipeline tree
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    DateTime(DateTime<Utc>),
    Array(Vec<PipelineValue>),
    /// Key order is significant and preserved
    Document(Vec<(String, PipelineValue)>),
}

impl PipelineValue {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => PipelineValue::Null,
            Value::Bool(b) => PipelineValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => PipelineValue::Int(i),
                None => PipelineValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => PipelineValue::String(s),
            Value::Array(items) => {
                PipelineValue::Array(items.into_iter().map(Self::from_json).collect())
            }
            Value::Object(map) => PipelineValue::Document(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// JSON rendering used in prompts; timestamps become RFC 3339 strings
    pub fn to_json(&self) -> Value {
        match self {
            PipelineValue::Null => Value::Null,
            PipelineValue::Bool(b) => Value::Bool(*b),
            PipelineValue::Int(i) => Value::Number((*i).into()),
            PipelineValue::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            PipelineValue::String(s) => Value::String(s.clone()),
            PipelineValue::DateTime(dt) => Value::String(dt.to_rfc3339()),
            PipelineValue::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            PipelineValue::Document(fields) => {
                let mut map = Map::new();
                for (k, v) in fields {
                    map.insert(k.clone(), v.to_json());
                }
                Value::Object(map)
            }
        }
    }

    /// Rewrite every date-looking string value into a timestamp
    ///
    /// Document keys are never touched.
    pub fn coerce_dates(self) -> Self {
        match self {
            PipelineValue::String(s) => match parse_date(&s) {
                Some(dt) => PipelineValue::DateTime(dt),
                None => PipelineValue::String(s),
            },
            PipelineValue::Array(items) => {
                PipelineValue::Array(items.into_iter().map(Self::coerce_dates).collect())
            }
            PipelineValue::Document(fields) => PipelineValue::Document(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, v.coerce_dates()))
                    .collect(),
            ),
            other => other,
        }
    }

    pub fn as_document(&self) -> Option<&[(String, PipelineValue)]> {
        match self {
            PipelineValue::Document(fields) => Some(fields),
            _ => None,
        }
    }
}

/// Parse a calendar date or an ISO-8601 date-time into UTC
///
/// Values without an offset are taken as UTC, matching how the MongoDB
/// drivers store naive timestamps.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    if CALENDAR_DATE_RE.is_match(text) {
        return NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc());
    }

    if !ISO_DATETIME_RE.is_match(text) {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

/// Ordered list of aggregation stages
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pipeline {
    stages: Vec<PipelineValue>,
}

impl Pipeline {
    /// Build from already-validated stage documents
    pub fn new(stages: Vec<PipelineValue>) -> Result<Self, PipelineError> {
        if let Some(idx) = stages.iter().position(|s| s.as_document().is_none()) {
            return Err(PipelineError::InvalidStage(idx));
        }
        Ok(Self { stages })
    }

    /// Parse model output: a JSON array of stage objects (a lone object is one stage)
    pub fn parse(text: &str) -> Result<Self, PipelineError> {
        let value: Value =
            serde_json::from_str(text.trim()).map_err(|e| PipelineError::InvalidJson(e.to_string()))?;
        Self::from_json(value)
    }

    pub fn from_json(value: Value) -> Result<Self, PipelineError> {
        let items = match value {
            Value::Array(items) => items,
            obj @ Value::Object(_) => vec![obj],
            _ => return Err(PipelineError::NotAnArray),
        };
        Self::new(items.into_iter().map(PipelineValue::from_json).collect())
    }

    /// Same pipeline with date strings turned into timestamps
    pub fn with_coerced_dates(self) -> Self {
        Self {
            stages: self
                .stages
                .into_iter()
                .map(PipelineValue::coerce_dates)
                .collect(),
        }
    }

    pub fn stages(&self) -> &[PipelineValue] {
        &self.stages
    }

    /// First stage operator that would write data (`$out`, `$merge`)
    pub fn write_stage(&self) -> Option<&str> {
        self.stages
            .iter()
            .filter_map(PipelineValue::as_document)
            .flat_map(|fields| fields.iter())
            .map(|(op, _)| op.as_str())
            .find(|op| WRITE_STAGES.contains(op))
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.stages.iter().map(PipelineValue::to_json).collect())
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_preserves_key_order() {
        let pipeline = Pipeline::parse(r#"[{"$sort": {"zeta": 1, "alpha": -1}}]"#).unwrap();
        let stage = pipeline.stages()[0].as_document().unwrap();
        let PipelineValue::Document(sort) = &stage[0].1 else {
            panic!("expected document");
        };
        let keys: Vec<&str> = sort.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_parse_rejects_non_stage() {
        assert_eq!(Pipeline::parse("[1, 2]"), Err(PipelineError::InvalidStage(0)));
        assert_eq!(Pipeline::parse("\"x\""), Err(PipelineError::NotAnArray));
        assert!(matches!(
            Pipeline::parse("[{'$match': None}]"),
            Err(PipelineError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_single_object_is_one_stage() {
        let pipeline = Pipeline::parse(r#"{"$count": "n"}"#).unwrap();
        assert_eq!(pipeline.stages().len(), 1);
    }

    #[test]
    fn test_coerces_calendar_and_iso_dates() {
        let pipeline = Pipeline::parse(
            r#"[{"$match": {"created": {"$gte": "2024-05-20", "$lte": "2024-06-10T23:59:59Z"},
                            "status": "active",
                            "tags": ["2024-01-01", "$field"]}}]"#,
        )
        .unwrap()
        .with_coerced_dates();

        let json = pipeline.to_json();
        assert_eq!(json[0]["$match"]["created"]["$gte"], "2024-05-20T00:00:00+00:00");
        assert_eq!(json[0]["$match"]["created"]["$lte"], "2024-06-10T23:59:59+00:00");
        assert_eq!(json[0]["$match"]["status"], "active");
        assert_eq!(json[0]["$match"]["tags"][1], "$field");

        let PipelineValue::Document(stage) = &pipeline.stages()[0] else {
            panic!("expected document");
        };
        let PipelineValue::Document(matcher) = &stage[0].1 else {
            panic!("expected document");
        };
        let PipelineValue::Array(tags) = &matcher[2].1 else {
            panic!("expected array");
        };
        assert_eq!(
            tags[0],
            PipelineValue::DateTime(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_keys_are_not_coerced() {
        let pipeline = Pipeline::parse(r#"[{"$project": {"2024-01-01": 1}}]"#)
            .unwrap()
            .with_coerced_dates();
        assert_eq!(pipeline.to_json()[0]["$project"]["2024-01-01"], 1);
    }

    #[test]
    fn test_parse_date_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 20, 10, 30, 0).unwrap();
        assert_eq!(parse_date("2024-05-20T10:30:00"), Some(expected));
        assert_eq!(parse_date("2024-05-20 10:30:00"), Some(expected));
        assert_eq!(parse_date("2024-05-20T10:30"), Some(expected));
        assert_eq!(parse_date("2024-05-20T12:30:00+02:00"), Some(expected));
        assert_eq!(parse_date("2024-05-20T10:30:00.000Z"), Some(expected));
        assert_eq!(parse_date("2024-13-40"), None);
        assert_eq!(parse_date("May 20 2024"), None);
        assert_eq!(parse_date("12345"), None);
    }

    #[test]
    fn test_write_stage_detection() {
        let read_only = Pipeline::parse(r#"[{"$match": {"a": 1}}, {"$limit": 5}]"#).unwrap();
        assert_eq!(read_only.write_stage(), None);

        let writes = Pipeline::parse(r#"[{"$match": {}}, {"$merge": {"into": "x"}}]"#).unwrap();
        assert_eq!(writes.write_stage(), Some("$merge"));
    }
}
