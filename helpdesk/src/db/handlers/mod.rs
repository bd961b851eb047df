//! Data-access functions over a borrowed `PgConnection`.

pub mod mailboxes;
pub mod stats;
pub mod users;

pub use mailboxes::Mailboxes;
pub use users::Users;
