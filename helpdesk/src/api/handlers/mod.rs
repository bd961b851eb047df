//! HTTP request handlers.
//!
//! Procedures are served under `/api/rpc/{procedure}`; GET for queries, POST for mutations.
//!
//! - [`organization`]: `organization.getMembers`, `organization.addMember`
//! - [`users`]: `user.current`, `user.updateLastMailboxSlug`
//! - [`mailboxes`]: `mailbox.members.list`, `mailbox.members.update`, `mailbox.members.stats`
//! - [`github`]: the GitHub App installation callback at `/api/connect/github/callback`
//!
//! Procedures require a session, carried in the session cookie or as a bearer token.

pub mod github;
pub mod mailboxes;
pub mod organization;
pub mod users;
