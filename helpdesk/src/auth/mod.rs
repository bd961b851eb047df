//! Authentication and display helpers.
//!
//! Accounts and sessions are owned by the identity provider. This service only verifies the
//! session JWT it issues (HS256, shared `secret_key`) and reads the account it names.
//!
//! # Modules
//!
//! - [`current_user`]: Extractors for getting the authenticated user in handlers
//! - [`session`]: Session token verification (and creation, for tests and tooling)
//! - [`utils`]: Display name and admin status derivations
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use helpdesk::api::models::users::CurrentUser;
//!
//! async fn protected_handler(user: CurrentUser) -> String {
//!     format!("Hello, {}!", user.id)
//! }
//! ```
//!
//! Routes that must react to a missing session instead of rejecting (such as OAuth
//! callbacks) take `Option<CurrentUser>`.

pub mod current_user;
pub mod session;
pub mod utils;
