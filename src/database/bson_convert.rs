//! Conversions between pipeline values and BSON.

use mongodb::bson::{self, Bson, Document};
use pipeline_agentic::{Pipeline, PipelineValue};

/// Characters of an example value kept in the schema summary
pub const EXAMPLE_MAX_CHARS: usize = 100;

/// Integers that fit are sent as int32, like the drivers do for native ints.
pub fn to_bson(value: &PipelineValue) -> Bson {
    match value {
        PipelineValue::Null => Bson::Null,
        PipelineValue::Bool(b) => Bson::Boolean(*b),
        PipelineValue::Int(i) => match i32::try_from(*i) {
            Ok(small) => Bson::Int32(small),
            Err(_) => Bson::Int64(*i),
        },
        PipelineValue::Float(f) => Bson::Double(*f),
        PipelineValue::String(s) => Bson::String(s.clone()),
        PipelineValue::DateTime(dt) => Bson::DateTime(bson::DateTime::from_millis(dt.timestamp_millis())),
        PipelineValue::Array(items) => Bson::Array(items.iter().map(to_bson).collect()),
        PipelineValue::Document(fields) => Bson::Document(to_document(fields)),
    }
}

fn to_document(fields: &[(String, PipelineValue)]) -> Document {
    let mut doc = Document::new();
    for (key, value) in fields {
        doc.insert(key.clone(), to_bson(value));
    }
    doc
}

/// Stage documents ready for `aggregate`
pub fn pipeline_stages(pipeline: &Pipeline) -> Vec<Document> {
    pipeline
        .stages()
        .iter()
        .filter_map(PipelineValue::as_document)
        .map(to_document)
        .collect()
}

/// Result document as relaxed Extended JSON
pub fn to_json(doc: Document) -> serde_json::Value {
    Bson::Document(doc).into_relaxed_extjson()
}

/// Short human-readable rendering of a sampled field value
pub fn example_text(value: &Bson) -> String {
    let text = match value {
        Bson::String(s) => s.clone(),
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::DateTime(dt) => dt
            .try_to_rfc3339_string()
            .unwrap_or_else(|_| dt.timestamp_millis().to_string()),
        Bson::Null => "null".to_string(),
        other => other.clone().into_relaxed_extjson().to_string(),
    };
    text.chars().take(EXAMPLE_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId};

    #[test]
    fn test_stage_order_and_int_widths() {
        let pipeline = Pipeline::parse(
            r#"[{"$sort": {"zeta": 1, "alpha": -1}}, {"$limit": 5000000000}]"#,
        )
        .unwrap();
        let stages = pipeline_stages(&pipeline);

        assert_eq!(stages[0], doc! {"$sort": {"zeta": 1, "alpha": -1}});
        let keys: Vec<&String> = stages[0].get_document("$sort").unwrap().keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(stages[1].get("$limit"), Some(&Bson::Int64(5_000_000_000)));
    }

    #[test]
    fn test_coerced_dates_become_bson_dates() {
        let pipeline = Pipeline::parse(r#"[{"$match": {"created": {"$gte": "2024-05-20"}}}]"#)
            .unwrap()
            .with_coerced_dates();
        let stages = pipeline_stages(&pipeline);
        let gte = stages[0]
            .get_document("$match")
            .unwrap()
            .get_document("created")
            .unwrap()
            .get("$gte")
            .unwrap();
        assert_eq!(gte, &Bson::DateTime(bson::DateTime::from_millis(1_716_163_200_000)));
    }

    #[test]
    fn test_example_text() {
        let oid = ObjectId::parse_str("65f1c0ffee0000000000abcd").unwrap();
        assert_eq!(example_text(&Bson::ObjectId(oid)), "65f1c0ffee0000000000abcd");
        assert_eq!(example_text(&Bson::Int32(7)), "7");
        assert_eq!(example_text(&Bson::String("x".repeat(150))).len(), EXAMPLE_MAX_CHARS);
    }

    #[test]
    fn test_results_are_relaxed_extjson() {
        let json = to_json(doc! {"count": 3, "ok": true});
        assert_eq!(json, serde_json::json!({"count": 3, "ok": true}));
    }
}
