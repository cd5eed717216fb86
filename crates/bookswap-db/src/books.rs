use bookswap_core::{AppError, ImageRef};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Database row for the books table, narrowed to the image pipeline fields.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct BookImagesRow {
    pub id: Uuid,
    pub images: Json<Vec<ImageRef>>,
    pub created_at: DateTime<Utc>,
}

/// Trait for book catalog operations used by the image pipeline.
/// Abstracts the database implementation (PostgreSQL).
#[async_trait::async_trait]
pub trait BookRepositoryTrait: Send + Sync {
    /// Number of books that carry at least one image reference.
    async fn count_with_images(&self) -> Result<i64, AppError>;

    /// One page of books with images, oldest first. Ordering has an id
    /// tiebreak so offset pagination is stable across pages.
    async fn list_with_images(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BookImagesRow>, AppError>;

    /// Replace a book's image references. Returns false when the book no
    /// longer exists.
    async fn update_images(&self, id: Uuid, images: &[ImageRef]) -> Result<bool, AppError>;
}

/// Repository for book image references.
#[derive(Clone)]
pub struct BookRepository {
    pool: PgPool,
}

impl BookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl BookRepositoryTrait for BookRepository {
    #[tracing::instrument(skip(self), fields(db.table = "books", db.operation = "select"))]
    async fn count_with_images(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM books WHERE jsonb_array_length(images) > 0",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    #[tracing::instrument(skip(self), fields(db.table = "books", db.operation = "select"))]
    async fn list_with_images(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BookImagesRow>, AppError> {
        let rows = sqlx::query_as::<Postgres, BookImagesRow>(
            "SELECT id, images, created_at FROM books \
             WHERE jsonb_array_length(images) > 0 \
             ORDER BY created_at ASC, id ASC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self, images), fields(db.table = "books", db.operation = "update", db.record_id = %id))]
    async fn update_images(&self, id: Uuid, images: &[ImageRef]) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE books SET images = $1 WHERE id = $2")
            .bind(Json(images))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
