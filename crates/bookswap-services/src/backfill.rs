use crate::refs::reference_key;
use crate::thumbs::Thumbnailer;
use bookswap_core::image_ref::is_data_url;
use bookswap_core::{AppError, BackfillConfig, ImageRef};
use bookswap_db::{BookImagesRow, BookRepositoryTrait};
use bookswap_storage::Storage;
use std::sync::Arc;

const PROGRESS_INTERVAL: u64 = 50;

/// Counters accumulated over one backfill run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BackfillReport {
    /// Records examined.
    pub processed: u64,
    /// Records whose image list changed (written back unless dry-run).
    pub updated: u64,
    /// Legacy entries rewritten to the dual shape.
    pub migrated: u64,
    /// Thumbnails created.
    pub thumbnails: u64,
    /// Entries carried over unchanged: inline data, unmappable references,
    /// failed derivations, unrecognized shapes.
    pub skipped: u64,
}

/// Outcome of rewriting one record's image list.
struct RecordChanges {
    images: Vec<ImageRef>,
    changed: bool,
    migrated: u64,
    thumbnails: u64,
    skipped: u64,
}

/// Upgrades legacy catalog image entries to the dual `{original, thumb}`
/// shape, deriving missing thumbnails along the way.
///
/// The walk is resumable: candidates are ordered stably, pages advance by
/// offset, and every per-image step is idempotent, so re-running any page
/// range is safe. Dry-run (the default) computes and reports without
/// writing.
pub struct BackfillMigrator {
    repo: Box<dyn BookRepositoryTrait>,
    storage: Arc<dyn Storage>,
    thumbnailer: Thumbnailer,
    config: BackfillConfig,
}

impl BackfillMigrator {
    pub fn new(
        repo: Box<dyn BookRepositoryTrait>,
        storage: Arc<dyn Storage>,
        prefix: String,
        config: BackfillConfig,
    ) -> Self {
        let thumbnailer = Thumbnailer::new(storage.clone(), prefix);
        Self {
            repo,
            storage,
            thumbnailer,
            config,
        }
    }

    pub async fn run(&self) -> Result<BackfillReport, AppError> {
        let total = self.repo.count_with_images().await?;

        tracing::info!(
            candidates = total,
            dry_run = self.config.dry_run,
            limit = self.config.limit,
            start_page = self.config.start_page,
            max_pages = self.config.max_pages,
            "Starting thumbnail backfill"
        );

        if !self.storage.is_durable() {
            tracing::warn!(
                "Storage backend is non-durable; thumbnail derivation needs originals in the real backend"
            );
        }

        let mut report = BackfillReport::default();
        let limit = i64::from(self.config.limit);
        let mut page = self.config.start_page;

        loop {
            if page_cap_reached(page, self.config.start_page, self.config.max_pages) {
                tracing::info!(page = page, "Reached page cap");
                break;
            }

            let offset = (i64::from(page) - 1) * limit;
            if offset >= total {
                break;
            }

            let rows = self.repo.list_with_images(limit, offset).await?;
            if rows.is_empty() {
                break;
            }

            tracing::info!(page = page, records = rows.len(), "Processing page");

            for row in rows {
                self.process_record(row, &mut report).await;

                if report.processed % PROGRESS_INTERVAL == 0 {
                    tracing::info!(
                        processed = report.processed,
                        updated = report.updated,
                        migrated = report.migrated,
                        thumbnails = report.thumbnails,
                        skipped = report.skipped,
                        "Backfill progress"
                    );
                }
            }

            page += 1;
        }

        tracing::info!(
            processed = report.processed,
            updated = report.updated,
            migrated = report.migrated,
            thumbnails = report.thumbnails,
            skipped = report.skipped,
            dry_run = self.config.dry_run,
            "Backfill complete"
        );

        Ok(report)
    }

    /// Rewrite one record's image list and, outside dry-run, persist the
    /// change. Everything logged below here carries the record's id.
    #[tracing::instrument(skip(self, row, report), fields(book_id = %row.id))]
    async fn process_record(&self, row: BookImagesRow, report: &mut BackfillReport) {
        let changes = migrate_record_images(
            &self.thumbnailer,
            self.storage.as_ref(),
            row.images.0,
            self.config.dry_run,
        )
        .await;

        report.processed += 1;
        report.migrated += changes.migrated;
        report.thumbnails += changes.thumbnails;
        report.skipped += changes.skipped;

        if changes.skipped > 0 {
            tracing::debug!(skipped = changes.skipped, "Entries carried over unchanged");
        }

        if changes.changed {
            report.updated += 1;
            if !self.config.dry_run {
                match self.repo.update_images(row.id, &changes.images).await {
                    Ok(true) => {}
                    Ok(false) => tracing::warn!("Book vanished before update"),
                    Err(e) => tracing::error!(error = %e, "Failed to update book images"),
                }
            }
        }
    }
}

fn page_cap_reached(page: u32, start_page: u32, max_pages: u32) -> bool {
    max_pages > 0 && (page - start_page + 1) > max_pages
}

/// Rewrite one record's image list.
///
/// Legacy strings that map to a backend key become `{original, thumb}`
/// entries (thumb null when derivation fails or under dry-run); entries
/// missing a thumbnail get one derived. Inline data, unmappable references,
/// failed derivations, and unrecognized shapes pass through unchanged and
/// count as skipped; entries already carrying a thumbnail pass through
/// uncounted.
async fn migrate_record_images(
    thumbnailer: &Thumbnailer,
    storage: &dyn Storage,
    images: Vec<ImageRef>,
    dry_run: bool,
) -> RecordChanges {
    let mut out = Vec::with_capacity(images.len());
    let mut changed = false;
    let mut migrated = 0u64;
    let mut thumbnails = 0u64;
    let mut skipped = 0u64;

    for image in images {
        match image {
            ImageRef::Legacy(reference) => {
                if is_data_url(&reference) {
                    skipped += 1;
                    out.push(ImageRef::Legacy(reference));
                    continue;
                }

                match reference_key(storage, &reference) {
                    None => {
                        skipped += 1;
                        out.push(ImageRef::Legacy(reference));
                    }
                    Some(key) => {
                        let thumb = if dry_run {
                            None
                        } else {
                            thumbnailer.derive_for_key(&key).await
                        };
                        if thumb.is_some() {
                            thumbnails += 1;
                        }
                        migrated += 1;
                        changed = true;
                        out.push(ImageRef::Entry {
                            original: reference,
                            thumb,
                        });
                    }
                }
            }
            ImageRef::Entry {
                original,
                thumb: None,
            } if !is_data_url(&original) => match reference_key(storage, &original) {
                None => {
                    skipped += 1;
                    out.push(ImageRef::Entry {
                        original,
                        thumb: None,
                    });
                }
                Some(key) => {
                    if dry_run {
                        out.push(ImageRef::Entry {
                            original,
                            thumb: None,
                        });
                    } else {
                        match thumbnailer.derive_for_key(&key).await {
                            Some(url) => {
                                thumbnails += 1;
                                changed = true;
                                out.push(ImageRef::Entry {
                                    original,
                                    thumb: Some(url),
                                });
                            }
                            None => {
                                skipped += 1;
                                out.push(ImageRef::Entry {
                                    original,
                                    thumb: None,
                                });
                            }
                        }
                    }
                }
            },
            ImageRef::Other(value) => {
                // Unrecognized shape, keep as-is.
                skipped += 1;
                out.push(ImageRef::Other(value));
            }
            entry => out.push(entry),
        }
    }

    RecordChanges {
        images: out,
        changed,
        migrated,
        thumbnails,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bookswap_core::limits::CACHE_CONTROL;
    use bookswap_storage::MemoryStorage;
    use chrono::{TimeZone, Utc};
    use image::{ImageFormat, Rgba, RgbaImage};
    use sqlx::types::Json;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::sync::RwLock;
    use uuid::Uuid;

    const PREFIX: &str = "uploads/books";

    fn png_bytes() -> Vec<u8> {
        let img = RgbaImage::from_pixel(400, 400, Rgba([60, 20, 140, 255]));
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        img.write_to(&mut cursor, ImageFormat::Png).unwrap();
        buffer
    }

    fn harness() -> (MemoryStorage, Arc<dyn Storage>, Thumbnailer) {
        let memory = MemoryStorage::new();
        let storage: Arc<dyn Storage> = Arc::new(memory.clone());
        let thumbs = Thumbnailer::new(storage.clone(), PREFIX.to_string());
        (memory, storage, thumbs)
    }

    async fn seed_original(memory: &MemoryStorage, key: &str) {
        memory
            .upload(key, png_bytes(), "image/png", CACHE_CONTROL)
            .await
            .unwrap();
    }

    /// Shared-state catalog double; clones see the same rows, so tests can
    /// inspect what a run wrote.
    #[derive(Clone)]
    struct MemoryBooks {
        rows: Arc<RwLock<Vec<BookImagesRow>>>,
        updates: Arc<AtomicU64>,
    }

    impl MemoryBooks {
        fn seeded(images_per_book: Vec<Vec<ImageRef>>) -> Self {
            let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
            let rows = images_per_book
                .into_iter()
                .enumerate()
                .map(|(i, images)| BookImagesRow {
                    id: Uuid::new_v4(),
                    images: Json(images),
                    created_at: t0 + chrono::Duration::minutes(i as i64),
                })
                .collect();
            MemoryBooks {
                rows: Arc::new(RwLock::new(rows)),
                updates: Arc::new(AtomicU64::new(0)),
            }
        }

        async fn snapshot(&self) -> Vec<(Uuid, Vec<ImageRef>)> {
            self.rows
                .read()
                .await
                .iter()
                .map(|r| (r.id, r.images.0.clone()))
                .collect()
        }

        fn update_count(&self) -> u64 {
            self.updates.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BookRepositoryTrait for MemoryBooks {
        async fn count_with_images(&self) -> Result<i64, AppError> {
            let rows = self.rows.read().await;
            Ok(rows.iter().filter(|r| !r.images.0.is_empty()).count() as i64)
        }

        async fn list_with_images(
            &self,
            limit: i64,
            offset: i64,
        ) -> Result<Vec<BookImagesRow>, AppError> {
            let rows = self.rows.read().await;
            Ok(rows
                .iter()
                .filter(|r| !r.images.0.is_empty())
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn update_images(&self, id: Uuid, images: &[ImageRef]) -> Result<bool, AppError> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            let mut rows = self.rows.write().await;
            match rows.iter_mut().find(|r| r.id == id) {
                Some(row) => {
                    row.images = Json(images.to_vec());
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    fn backfill_config(
        dry_run: bool,
        limit: u32,
        start_page: u32,
        max_pages: u32,
    ) -> BackfillConfig {
        BackfillConfig {
            dry_run,
            limit,
            start_page,
            max_pages,
        }
    }

    fn migrator(
        books: &MemoryBooks,
        storage: Arc<dyn Storage>,
        config: BackfillConfig,
    ) -> BackfillMigrator {
        BackfillMigrator::new(Box::new(books.clone()), storage, PREFIX.to_string(), config)
    }

    #[test]
    fn test_page_cap() {
        // Unbounded when max_pages is zero.
        assert!(!page_cap_reached(1, 1, 0));
        assert!(!page_cap_reached(1000, 1, 0));

        assert!(!page_cap_reached(1, 1, 2));
        assert!(!page_cap_reached(2, 1, 2));
        assert!(page_cap_reached(3, 1, 2));

        // Cap counts pages processed from start_page, not absolute pages.
        assert!(!page_cap_reached(5, 5, 1));
        assert!(page_cap_reached(6, 5, 1));
    }

    #[tokio::test]
    async fn test_migrate_legacy_url_to_dual_shape() {
        let (memory, storage, thumbs) = harness();
        let key = "uploads/books/2024/01/01/ab12cd34-cover.png";
        seed_original(&memory, key).await;

        let reference = format!("memory://{}", key);
        let changes = migrate_record_images(
            &thumbs,
            storage.as_ref(),
            vec![ImageRef::Legacy(reference.clone())],
            false,
        )
        .await;

        assert!(changes.changed);
        assert_eq!(changes.migrated, 1);
        assert_eq!(changes.thumbnails, 1);
        assert_eq!(changes.skipped, 0);
        assert_eq!(
            changes.images,
            vec![ImageRef::Entry {
                original: reference,
                thumb: Some(
                    "memory://uploads/books/thumbs/2024/01/01/ab12cd34-cover.png".to_string()
                ),
            }]
        );
    }

    #[tokio::test]
    async fn test_migrate_dry_run_plans_without_writing() {
        let (memory, storage, thumbs) = harness();
        let key = "uploads/books/2024/01/01/ab12cd34-cover.png";
        seed_original(&memory, key).await;

        let changes = migrate_record_images(
            &thumbs,
            storage.as_ref(),
            vec![ImageRef::Legacy(format!("memory://{}", key))],
            true,
        )
        .await;

        assert!(changes.changed);
        assert_eq!(changes.migrated, 1);
        assert_eq!(changes.thumbnails, 0);
        // Only the seeded original; no thumbnail was uploaded.
        assert_eq!(memory.len().await, 1);
    }

    #[tokio::test]
    async fn test_migrate_skips_inline_and_foreign_references() {
        let (memory, storage, thumbs) = harness();

        let images = vec![
            ImageRef::Legacy("data:image/png;base64,AAAA".to_string()),
            ImageRef::Legacy("https://example.com/covers/a.jpg".to_string()),
        ];
        let changes =
            migrate_record_images(&thumbs, storage.as_ref(), images.clone(), false).await;

        assert!(!changes.changed);
        assert_eq!(changes.migrated, 0);
        assert_eq!(changes.skipped, 2);
        assert_eq!(changes.images, images);
        assert!(memory.is_empty().await);
    }

    #[tokio::test]
    async fn test_migrate_fills_missing_thumb_on_dual_entries() {
        let (memory, storage, thumbs) = harness();
        let key = "uploads/books/2024/01/01/ab12cd34-cover.png";
        seed_original(&memory, key).await;

        let changes = migrate_record_images(
            &thumbs,
            storage.as_ref(),
            vec![ImageRef::Entry {
                original: format!("memory://{}", key),
                thumb: None,
            }],
            false,
        )
        .await;

        assert!(changes.changed);
        assert_eq!(changes.migrated, 0);
        assert_eq!(changes.thumbnails, 1);
        assert!(changes.images[0].has_thumb());
    }

    #[tokio::test]
    async fn test_migrate_counts_unreadable_original_as_skipped() {
        let (memory, storage, thumbs) = harness();

        // Mappable key, but no such object in storage.
        let entry = ImageRef::Entry {
            original: "memory://uploads/books/2024/01/01/zz-missing.png".to_string(),
            thumb: None,
        };
        let changes =
            migrate_record_images(&thumbs, storage.as_ref(), vec![entry.clone()], false).await;

        assert!(!changes.changed);
        assert_eq!(changes.skipped, 1);
        assert_eq!(changes.images, vec![entry]);
        assert!(memory.is_empty().await);
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let (memory, storage, thumbs) = harness();
        let key = "uploads/books/2024/01/01/ab12cd34-cover.png";
        seed_original(&memory, key).await;

        let first = migrate_record_images(
            &thumbs,
            storage.as_ref(),
            vec![ImageRef::Legacy(format!("memory://{}", key))],
            false,
        )
        .await;
        assert!(first.changed);

        let second =
            migrate_record_images(&thumbs, storage.as_ref(), first.images.clone(), false).await;

        assert!(!second.changed);
        assert_eq!(second.migrated, 0);
        assert_eq!(second.thumbnails, 0);
        assert_eq!(second.skipped, 0);
        assert_eq!(second.images, first.images);
    }

    #[tokio::test]
    async fn test_migrate_counts_unknown_shapes_as_skipped() {
        let (_, storage, thumbs) = harness();

        let odd = ImageRef::Other(serde_json::json!({"unexpected": true}));
        let full = ImageRef::Entry {
            original: "memory://uploads/books/a.png".to_string(),
            thumb: Some("memory://uploads/books/thumbs/a.png".to_string()),
        };

        let changes = migrate_record_images(
            &thumbs,
            storage.as_ref(),
            vec![odd.clone(), full.clone()],
            false,
        )
        .await;

        assert!(!changes.changed);
        assert_eq!(changes.images, vec![odd, full]);
        // The unrecognized entry counts; the complete entry does not.
        assert_eq!(changes.skipped, 1);
    }

    #[tokio::test]
    async fn test_run_dry_run_leaves_catalog_untouched() {
        let (memory, storage, _thumbs) = harness();
        let key = "uploads/books/2024/01/01/ab12cd34-cover.png";
        seed_original(&memory, key).await;

        let books = MemoryBooks::seeded(vec![
            vec![ImageRef::Legacy(format!("memory://{}", key))],
            vec![ImageRef::Entry {
                original: format!("memory://{}", key),
                thumb: Some(
                    "memory://uploads/books/thumbs/2024/01/01/ab12cd34-cover.png".to_string(),
                ),
            }],
        ]);
        let before = books.snapshot().await;

        let report = migrator(&books, storage, backfill_config(true, 100, 1, 0))
            .run()
            .await
            .unwrap();

        assert_eq!(report.processed, 2);
        assert_eq!(report.updated, 1);
        assert_eq!(report.migrated, 1);
        assert_eq!(report.thumbnails, 0);
        // No row written, no thumbnail stored.
        assert_eq!(books.snapshot().await, before);
        assert_eq!(books.update_count(), 0);
        assert_eq!(memory.len().await, 1);
    }

    #[tokio::test]
    async fn test_run_execute_rewrites_changed_rows_only() {
        let (memory, storage, _thumbs) = harness();
        let key = "uploads/books/2024/01/01/ab12cd34-cover.png";
        seed_original(&memory, key).await;

        let reference = format!("memory://{}", key);
        let migrated_thumb =
            "memory://uploads/books/thumbs/2024/01/01/ab12cd34-cover.png".to_string();
        let books = MemoryBooks::seeded(vec![
            vec![ImageRef::Legacy(reference.clone())],
            vec![ImageRef::Entry {
                original: reference.clone(),
                thumb: Some(migrated_thumb.clone()),
            }],
        ]);

        let report = migrator(&books, storage, backfill_config(false, 100, 1, 0))
            .run()
            .await
            .unwrap();

        assert_eq!(report.processed, 2);
        assert_eq!(report.updated, 1);
        assert_eq!(report.migrated, 1);
        assert_eq!(report.thumbnails, 1);
        // Exactly one write, for the row that changed.
        assert_eq!(books.update_count(), 1);

        let after = books.snapshot().await;
        assert_eq!(
            after[0].1,
            vec![ImageRef::Entry {
                original: reference.clone(),
                thumb: Some(migrated_thumb.clone()),
            }]
        );
        assert_eq!(
            after[1].1,
            vec![ImageRef::Entry {
                original: reference,
                thumb: Some(migrated_thumb),
            }]
        );
        // Original plus derived thumbnail.
        assert_eq!(memory.len().await, 2);
    }

    #[tokio::test]
    async fn test_run_pages_with_offset_through_all_candidates() {
        let (_, storage, _thumbs) = harness();

        // Foreign hosts keep every entry a cheap pass-through.
        let books = MemoryBooks::seeded(
            (0..5)
                .map(|i| vec![ImageRef::Legacy(format!("https://example.com/{}.jpg", i))])
                .collect(),
        );

        let report = migrator(&books, storage, backfill_config(true, 2, 1, 0))
            .run()
            .await
            .unwrap();

        assert_eq!(report.processed, 5);
        assert_eq!(report.skipped, 5);
        assert_eq!(report.updated, 0);
    }

    #[tokio::test]
    async fn test_run_starts_at_configured_page_and_honors_cap() {
        let (_, storage, _thumbs) = harness();

        let books = MemoryBooks::seeded(
            (0..6)
                .map(|i| vec![ImageRef::Legacy(format!("https://example.com/{}.jpg", i))])
                .collect(),
        );

        // Page 2 of size 2, capped at one page: rows three and four only.
        let report = migrator(&books, storage, backfill_config(true, 2, 2, 1))
            .run()
            .await
            .unwrap();

        assert_eq!(report.processed, 2);
    }

    #[tokio::test]
    async fn test_run_second_execute_pass_writes_nothing() {
        let (memory, storage, _thumbs) = harness();
        let key = "uploads/books/2024/01/01/ab12cd34-cover.png";
        seed_original(&memory, key).await;

        let books = MemoryBooks::seeded(vec![vec![ImageRef::Legacy(format!(
            "memory://{}",
            key
        ))]]);
        let job = migrator(&books, storage, backfill_config(false, 100, 1, 0));

        let first = job.run().await.unwrap();
        assert_eq!(first.updated, 1);

        let second = job.run().await.unwrap();
        assert_eq!(second.processed, 1);
        assert_eq!(second.updated, 0);
        assert_eq!(second.migrated, 0);
        assert_eq!(second.thumbnails, 0);
        assert_eq!(books.update_count(), 1);
        assert_eq!(memory.len().await, 2);
    }

    #[tokio::test]
    async fn test_run_counts_unreadable_original_and_continues() {
        let (memory, storage, _thumbs) = harness();

        // Mappable key with no object behind it: derivation fails, the row
        // stays as it was, and the run still completes.
        let books = MemoryBooks::seeded(vec![vec![ImageRef::Entry {
            original: "memory://uploads/books/2024/01/01/zz-missing.png".to_string(),
            thumb: None,
        }]]);
        let before = books.snapshot().await;

        let report = migrator(&books, storage, backfill_config(false, 100, 1, 0))
            .run()
            .await
            .unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.updated, 0);
        assert_eq!(books.snapshot().await, before);
        assert_eq!(books.update_count(), 0);
        assert!(memory.is_empty().await);
    }
}
