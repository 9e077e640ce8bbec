//! MongoDB implementation of the review loop's database gateway.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::Document;
use mongodb::options::AggregateOptions;
use mongodb::{Client, Database};
use pipeline_agentic::{DatabaseGateway, Pipeline, QueryExecutionError};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::bson_convert;
use super::schema::{self, CollectionSchema, FieldSchema, FieldStats};

pub const DEFAULT_SCHEMA_SAMPLE_SIZE: u32 = 1000;
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CLIENT_CACHE_SIZE: usize = 16;

/// Limits applied to MongoDB access
#[derive(Debug, Clone)]
pub struct MongoSettings {
    /// Documents sampled per collection for schema discovery
    pub schema_sample_size: u32,
    /// Server-side `maxTimeMS`
    pub query_timeout: Duration,
    /// Distinct connection URLs whose clients stay open
    pub client_cache_size: usize,
}

impl Default for MongoSettings {
    fn default() -> Self {
        Self {
            schema_sample_size: DEFAULT_SCHEMA_SAMPLE_SIZE,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            client_cache_size: DEFAULT_CLIENT_CACHE_SIZE,
        }
    }
}

/// Read-only view of one database, restricted to an allow-list of collections
pub struct MongoGateway {
    database: Database,
    allowed_collections: Vec<String>,
    settings: MongoSettings,
}

impl MongoGateway {
    pub fn new(
        client: &Client,
        database_name: &str,
        allowed_collections: Vec<String>,
        settings: MongoSettings,
    ) -> Self {
        Self {
            database: client.database(database_name),
            allowed_collections,
            settings,
        }
    }

    fn check_allowed(&self, collection: &str) -> Result<(), QueryExecutionError> {
        if self.allowed_collections.iter().any(|c| c == collection) {
            return Ok(());
        }
        Err(QueryExecutionError::new(format!(
            "collection '{}' is not accessible; permitted collections: {}",
            collection,
            self.allowed_collections.join(", ")
        )))
    }

    /// Run `stages` and drain at most `limit` documents
    async fn aggregate(
        &self,
        collection: &str,
        stages: Vec<Document>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>, QueryExecutionError> {
        let options = AggregateOptions::builder()
            .max_time(self.settings.query_timeout)
            .build();
        let mut cursor = self
            .database
            .collection::<Document>(collection)
            .aggregate(stages, options)
            .await
            .map_err(|e| QueryExecutionError::new(e.to_string()))?;

        let mut docs = Vec::new();
        while limit.map_or(true, |max| docs.len() < max) {
            match cursor
                .try_next()
                .await
                .map_err(|e| QueryExecutionError::new(e.to_string()))?
            {
                Some(doc) => docs.push(doc),
                None => break,
            }
        }
        Ok(docs)
    }

    async fn describe_collection(
        &self,
        collection: &str,
        example_count: usize,
    ) -> Result<CollectionSchema, QueryExecutionError> {
        let rows = self
            .aggregate(
                collection,
                schema::frequency_pipeline(self.settings.schema_sample_size),
                None,
            )
            .await?;
        let stats: Vec<FieldStats> = rows.iter().filter_map(FieldStats::from_document).collect();

        let mut fields = Vec::new();
        for field in schema::select_fields(stats) {
            let limit = field.example_limit(example_count);
            let examples = self
                .aggregate(
                    collection,
                    schema::examples_pipeline(&field.name, limit),
                    Some(limit),
                )
                .await?
                .iter()
                .filter_map(|doc| doc.get("_id"))
                .map(bson_convert::example_text)
                .collect();
            fields.push(FieldSchema {
                name: field.name,
                types: field.types,
                examples,
            });
        }

        debug!("Collection '{}': {} field(s) kept", collection, fields.len());
        Ok(CollectionSchema {
            name: collection.to_string(),
            fields,
        })
    }
}

#[async_trait]
impl DatabaseGateway for MongoGateway {
    async fn run_pipeline(
        &self,
        collection: &str,
        pipeline: &Pipeline,
        fetch_limit: usize,
    ) -> Result<Vec<Value>, QueryExecutionError> {
        self.check_allowed(collection)?;
        if let Some(stage) = pipeline.write_stage() {
            warn!("Refusing pipeline with write stage {}", stage);
            return Err(QueryExecutionError::new(format!(
                "{stage} stages are not allowed; pipelines must be read-only"
            )));
        }

        let docs = self
            .aggregate(
                collection,
                bson_convert::pipeline_stages(pipeline),
                Some(fetch_limit),
            )
            .await?;
        info!("Aggregation on '{}' returned {} document(s)", collection, docs.len());
        Ok(docs.into_iter().map(bson_convert::to_json).collect())
    }

    async fn summarize_schema(
        &self,
        collections: &[String],
        sample_count: usize,
    ) -> Result<String, QueryExecutionError> {
        let mut schemas = Vec::with_capacity(collections.len());
        for collection in collections {
            self.check_allowed(collection)?;
            schemas.push(self.describe_collection(collection, sample_count).await?);
        }
        Ok(schema::render(&schemas))
    }
}
