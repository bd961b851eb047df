//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`. The rendered
//! documentation is available at `/docs` when the server is running.

pub mod handlers;
pub mod models;
