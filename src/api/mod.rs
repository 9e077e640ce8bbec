//! HTTP surface: `POST /analyze_db` behind a bearer token, `GET /health`.

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use routes::build_router;
pub use state::AppState;
pub use types::{QueryInput, TaskResponse};
