use crate::domain::value_objects::{Role, UserId};
use crate::ports::member_directory::{MemberDirectory as MemberDirectoryTrait, Result};
use async_trait::async_trait;
use sqlx::PgPool;

/// PostgreSQL implementation of MemberDirectory
///
/// Soft-deleted users are treated as absent.
pub struct MemberDirectory {
    pool: PgPool,
}

impl MemberDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemberDirectoryTrait for MemberDirectory {
    async fn user_exists(&self, user_id: UserId) -> Result<bool> {
        Ok(self.get_role(user_id).await?.is_some())
    }

    async fn get_role(&self, user_id: UserId) -> Result<Option<Role>> {
        let role: Option<String> =
            sqlx::query_scalar("SELECT role FROM users WHERE id = $1 AND deleted_at IS NULL")
                .bind(user_id.value())
                .fetch_optional(&self.pool)
                .await?;

        role.map(|r| {
            r.parse::<Role>().map_err(|e| {
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
                    as Box<dyn std::error::Error + Send + Sync>
            })
        })
        .transpose()
    }
}
