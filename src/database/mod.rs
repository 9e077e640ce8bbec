//! MongoDB access: client registry, the `DatabaseGateway` implementation and
//! schema discovery.

pub mod bson_convert;
pub mod mongo;
pub mod registry;
pub mod schema;

pub use mongo::{MongoGateway, MongoSettings};
pub use registry::{ClientCache, MongoRegistry};

/// The only `database_type` the service accepts
pub const MONGODB: &str = "MongoDB";
