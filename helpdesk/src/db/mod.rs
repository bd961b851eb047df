//! Database layer: repositories, models and error mapping.
//!
//! - [`handlers`]: repositories wrapping a `&mut PgConnection` plus the composite
//!   operations built on them
//! - [`models`]: request and response types crossing the repository boundary
//! - [`errors`]: [`errors::DbError`], converted from `sqlx::Error`

pub mod errors;
pub mod handlers;
pub mod models;
