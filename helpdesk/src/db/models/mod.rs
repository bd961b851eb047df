//! Database models returned by and passed to the repositories in [`crate::db::handlers`].

pub mod mailboxes;
pub mod users;
