use crate::{
    db::{
        errors::{DbError, Result},
        models::mailboxes::{MailboxCreateDBRequest, MailboxDBResponse},
    },
    types::MailboxId,
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;

#[derive(Debug, Clone, FromRow)]
struct Mailbox {
    id: MailboxId,
    name: String,
    slug: String,
    github_installation_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<Mailbox> for MailboxDBResponse {
    fn from(mailbox: Mailbox) -> Self {
        Self {
            id: mailbox.id,
            name: mailbox.name,
            slug: mailbox.slug,
            github_installation_id: mailbox.github_installation_id,
            created_at: mailbox.created_at,
            updated_at: mailbox.updated_at,
        }
    }
}

pub struct Mailboxes<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Mailboxes<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(slug = %request.slug), err)]
    pub async fn create(&mut self, request: &MailboxCreateDBRequest) -> Result<MailboxDBResponse> {
        let mailbox = sqlx::query_as::<_, Mailbox>(
            r#"
            INSERT INTO mailboxes (name, slug)
            VALUES ($1, $2)
            RETURNING id, name, slug, github_installation_id, created_at, updated_at
            "#,
        )
        .bind(&request.name)
        .bind(&request.slug)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(mailbox.into())
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: MailboxId) -> Result<Option<MailboxDBResponse>> {
        let mailbox = sqlx::query_as::<_, Mailbox>(
            "SELECT id, name, slug, github_installation_id, created_at, updated_at FROM mailboxes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(mailbox.map(Into::into))
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_slug(&mut self, slug: &str) -> Result<Option<MailboxDBResponse>> {
        let mailbox = sqlx::query_as::<_, Mailbox>(
            "SELECT id, name, slug, github_installation_id, created_at, updated_at FROM mailboxes WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(mailbox.map(Into::into))
    }

    /// Link the mailbox to a GitHub App installation
    #[instrument(skip(self), err)]
    pub async fn set_github_installation_id(&mut self, id: MailboxId, installation_id: &str) -> Result<MailboxDBResponse> {
        let mailbox = sqlx::query_as::<_, Mailbox>(
            r#"
            UPDATE mailboxes
            SET github_installation_id = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, slug, github_installation_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(installation_id)
        .fetch_optional(&mut *self.db)
        .await?;

        mailbox.map(Into::into).ok_or(DbError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::errors::Duplicate;
    use sqlx::PgPool;

    fn request(slug: &str) -> MailboxCreateDBRequest {
        MailboxCreateDBRequest {
            name: "Support".to_string(),
            slug: slug.to_string(),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_and_lookup(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Mailboxes::new(&mut conn);

        let created = repo.create(&request("support")).await.unwrap();
        assert_eq!(created.slug, "support");
        assert!(created.github_installation_id.is_none());

        let by_slug = repo.get_by_slug("support").await.unwrap().unwrap();
        assert_eq!(by_slug, created);
        let by_id = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id, created);

        assert!(repo.get_by_slug("missing").await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_slug(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Mailboxes::new(&mut conn);

        repo.create(&request("support")).await.unwrap();
        let err = repo.create(&request("support")).await.unwrap_err();
        assert_eq!(err.duplicate(), Some(Duplicate::MailboxSlug));
        match err {
            DbError::UniqueViolation(violation) => assert_eq!(violation.table.as_deref(), Some("mailboxes")),
            other => panic!("Expected UniqueViolation, got {other:?}"),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_set_github_installation_id(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Mailboxes::new(&mut conn);

        let created = repo.create(&request("support")).await.unwrap();
        let updated = repo.set_github_installation_id(created.id, "12345").await.unwrap();
        assert_eq!(updated.github_installation_id.as_deref(), Some("12345"));

        let err = repo.set_github_installation_id(created.id + 1000, "1").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound));
    }
}
