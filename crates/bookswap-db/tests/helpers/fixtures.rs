use bookswap_core::ImageRef;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

/// Insert a book row directly, bypassing the repository under test.
pub async fn insert_book(
    pool: &PgPool,
    title: &str,
    images: Vec<ImageRef>,
    created_at: DateTime<Utc>,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO books (id, title, images, created_at) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(title)
        .bind(Json(images))
        .bind(created_at)
        .execute(pool)
        .await
        .expect("Failed to insert book fixture");
    id
}

/// A single-image legacy list, the common pre-migration shape.
pub fn legacy_images(url: &str) -> Vec<ImageRef> {
    vec![ImageRef::Legacy(url.to_string())]
}
