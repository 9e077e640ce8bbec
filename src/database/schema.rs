//! Schema discovery: aggregation stages, field selection and rendering.
//!
//! Everything here is pure. `MongoGateway` runs the stages and feeds the
//! resulting documents back in.

use mongodb::bson::{doc, Bson, Document};

const TAG_DATE: &str = "date";
const TAG_OBJECT_ID: &str = "objectId";

/// Frequency and type tags of one top-level field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldStats {
    pub name: String,
    pub count: i64,
    pub types: Vec<String>,
}

impl FieldStats {
    /// Parse one row of [`frequency_pipeline`] output
    pub fn from_document(doc: &Document) -> Option<Self> {
        let name = doc.get_str("_id").ok()?.to_string();
        let count = match doc.get("count")? {
            Bson::Int32(n) => i64::from(*n),
            Bson::Int64(n) => *n,
            Bson::Double(n) => *n as i64,
            _ => return None,
        };
        let mut types: Vec<String> = doc
            .get_array("types")
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        types.sort();
        Some(Self { name, count, types })
    }

    /// Dates and ids say little beyond their type, one example is enough
    pub fn example_limit(&self, example_count: usize) -> usize {
        if self
            .types
            .iter()
            .any(|t| t == TAG_DATE || t == TAG_OBJECT_ID)
        {
            1
        } else {
            example_count
        }
    }
}

/// One field as shown to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    pub name: String,
    pub types: Vec<String>,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSchema {
    pub name: String,
    pub fields: Vec<FieldSchema>,
}

/// Count each top-level key over a random sample and collect its BSON types
pub fn frequency_pipeline(sample_size: u32) -> Vec<Document> {
    vec![
        doc! { "$sample": { "size": i64::from(sample_size) } },
        doc! { "$project": { "kv": { "$objectToArray": "$$ROOT" } } },
        doc! { "$unwind": "$kv" },
        doc! {
            "$group": {
                "_id": "$kv.k",
                "count": { "$sum": 1 },
                "types": { "$addToSet": { "$type": "$kv.v" } },
            }
        },
    ]
}

/// Up to `limit` distinct values of `field`
pub fn examples_pipeline(field: &str, limit: usize) -> Vec<Document> {
    vec![
        doc! { "$group": { "_id": format!("${field}") } },
        doc! { "$limit": i64::try_from(limit).unwrap_or(i64::MAX) },
    ]
}

/// Keep fields seen in more than half as many documents as the most common one
///
/// Output is sorted by field name so the summary shape does not depend on
/// the order the server groups in.
pub fn select_fields(stats: Vec<FieldStats>) -> Vec<FieldStats> {
    let max_count = stats.iter().map(|s| s.count).max().unwrap_or(0);
    let mut kept: Vec<FieldStats> = stats
        .into_iter()
        .filter(|s| s.count * 2 > max_count)
        .collect();
    kept.sort_by(|a, b| a.name.cmp(&b.name));
    kept
}

/// Text block placed in the system prompt
pub fn render(schemas: &[CollectionSchema]) -> String {
    let mut blocks = Vec::new();
    for schema in schemas {
        blocks.push(format!(
            "=============================================================\n\
             Name of Collection : {name}\n\
             =============================XX==============================\n\
             Output Schema Associated with {name}:",
            name = schema.name
        ));
        for field in &schema.fields {
            blocks.push(format!(
                "\"{}\" -> data_type : {},\nExample_Values : {}",
                field.name,
                field.types.join(" | "),
                field.examples.join(" || ")
            ));
        }
    }
    blocks.join("\n")
}
