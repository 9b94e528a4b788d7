use crate::domain::value_objects::{BookId, BookItemId};
use crate::ports::catalog_gateway::{CatalogGateway as CatalogGatewayTrait, Result};
use async_trait::async_trait;
use sqlx::PgPool;

/// PostgreSQL implementation of CatalogGateway
///
/// Reads `books` and `book_items`. Allocation flips the `available` flag of
/// the lowest-id available item in a single statement so that two concurrent
/// admissions never receive the same item.
pub struct CatalogGateway {
    pool: PgPool,
}

impl CatalogGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogGatewayTrait for CatalogGateway {
    async fn book_exists(&self, book_id: BookId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM books WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(book_id.value())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn allocate_available_item(&self, book_id: BookId) -> Result<Option<BookItemId>> {
        let id: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE book_items
            SET available = FALSE
            WHERE id = (
                SELECT id
                FROM book_items
                WHERE book_id = $1 AND available
                ORDER BY id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id
            "#,
        )
        .bind(book_id.value())
        .fetch_optional(&self.pool)
        .await?;

        Ok(id.map(BookItemId::new))
    }

    async fn release_item(&self, book_item_id: BookItemId) -> Result<()> {
        sqlx::query("UPDATE book_items SET available = TRUE WHERE id = $1")
            .bind(book_item_id.value())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_book_item_owner(&self, book_item_id: BookItemId) -> Result<Option<BookId>> {
        let book_id: Option<i64> = sqlx::query_scalar("SELECT book_id FROM book_items WHERE id = $1")
            .bind(book_item_id.value())
            .fetch_optional(&self.pool)
            .await?;

        Ok(book_id.map(BookId::new))
    }
}
