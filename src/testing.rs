//! In-memory doubles for the store and asset seams.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};

use crate::assets::{AssetStore, DeleteOutcome, LocalFile, RESULT_OK};
use crate::content::{BlogPost, Comment, Entity, ImageRef, NewComment, PostSummary, Property};
use crate::db::{CommentStore, ContentStore, LikeCounter, PostListings, SimilarListings};
use crate::editor::Confirm;
use crate::error::{AssetError, StoreError};
use crate::routes::auth::{AuthConfig, Claims};
use crate::AppState;

pub(crate) const TEST_SECRET: &str = "test-secret";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Tables<E: Entity> {
    rows: Vec<E>,
    next_id: i64,
    inserts: Vec<E::Draft>,
    updates: Vec<(i64, E::Draft)>,
    deletes: Vec<i64>,
}

/// Collection kept in a `Vec`, recording every write it receives.
pub(crate) struct MemoryStore<E: Entity> {
    tables: Mutex<Tables<E>>,
    comments: Mutex<Vec<Comment>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl<E: Entity> MemoryStore<E> {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables {
                rows: Vec::new(),
                next_id: 1,
                inserts: Vec::new(),
                updates: Vec::new(),
                deletes: Vec::new(),
            }),
            comments: Mutex::new(Vec::new()),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Store a record directly, bypassing the write log.
    pub fn seed(&self, draft: E::Draft) -> E {
        let mut tables = lock(&self.tables);
        let id = tables.next_id;
        tables.next_id += 1;
        let row = E::materialize(id, draft, None);
        tables.rows.push(row.clone());
        row
    }

    pub fn rows(&self) -> Vec<E> {
        lock(&self.tables).rows.clone()
    }

    pub fn inserts(&self) -> Vec<E::Draft> {
        lock(&self.tables).inserts.clone()
    }

    pub fn updates(&self) -> Vec<(i64, E::Draft)> {
        lock(&self.tables).updates.clone()
    }

    pub fn deletes(&self) -> Vec<i64> {
        lock(&self.tables).deletes.clone()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected {
                status: 500,
                message: "read refused".to_string(),
            });
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected {
                status: 500,
                message: "write refused".to_string(),
            });
        }
        Ok(())
    }
}

impl MemoryStore<BlogPost> {
    pub fn set_likes(&self, id: i64, likes: i32) {
        let mut tables = lock(&self.tables);
        if let Some(row) = tables.rows.iter_mut().find(|r| r.id == id) {
            row.likes = likes;
        }
    }
}

#[async_trait]
impl<E: Entity> ContentStore<E> for MemoryStore<E> {
    async fn list(&self, filter: &E::Filter) -> Result<Vec<E>, StoreError> {
        self.check_read()?;
        let mut rows: Vec<E> = lock(&self.tables)
            .rows
            .iter()
            .filter(|r| r.matches(filter))
            .cloned()
            .collect();
        rows.sort_by_key(|r| std::cmp::Reverse(r.id()));
        Ok(rows)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<E>, StoreError> {
        self.check_read()?;
        Ok(lock(&self.tables).rows.iter().find(|r| r.id() == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<E>, StoreError> {
        self.check_read()?;
        Ok(lock(&self.tables)
            .rows
            .iter()
            .filter(|r| r.slug() == slug)
            .max_by_key(|r| r.id())
            .cloned())
    }

    async fn insert(&self, draft: &E::Draft) -> Result<E, StoreError> {
        self.check_write()?;
        lock(&self.tables).inserts.push(draft.clone());
        Ok(self.seed(draft.clone()))
    }

    async fn update(&self, id: i64, draft: &E::Draft) -> Result<E, StoreError> {
        self.check_write()?;
        let mut tables = lock(&self.tables);
        tables.updates.push((id, draft.clone()));
        let index = tables
            .rows
            .iter()
            .position(|r| r.id() == id)
            .ok_or(StoreError::NotFound)?;
        let row = E::materialize(id, draft.clone(), Some(&tables.rows[index]));
        tables.rows[index] = row.clone();
        Ok(row)
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.check_write()?;
        let mut tables = lock(&self.tables);
        let before = tables.rows.len();
        tables.rows.retain(|r| r.id() != id);
        if tables.rows.len() == before {
            return Err(StoreError::NotFound);
        }
        tables.deletes.push(id);
        Ok(())
    }
}

#[async_trait]
impl LikeCounter for MemoryStore<BlogPost> {
    async fn like(&self, id: i64) -> Result<i32, StoreError> {
        self.check_write()?;
        let mut tables = lock(&self.tables);
        let row = tables
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound)?;
        row.likes += 1;
        Ok(row.likes)
    }
}

#[async_trait]
impl SimilarListings for MemoryStore<Property> {
    async fn similar(&self, slug: &str, limit: i64) -> Result<Vec<Property>, StoreError> {
        self.check_read()?;
        let tables = lock(&self.tables);
        let Some(kind) = tables
            .rows
            .iter()
            .filter(|r| r.slug == slug)
            .max_by_key(|r| r.id)
            .map(|r| r.property_type.clone())
        else {
            return Err(StoreError::NotFound);
        };
        let mut rows: Vec<Property> = tables
            .rows
            .iter()
            .filter(|r| r.slug != slug && r.property_type == kind)
            .cloned()
            .collect();
        rows.sort_by_key(|r| std::cmp::Reverse(r.id));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }
}

#[async_trait]
impl CommentStore for MemoryStore<BlogPost> {
    async fn comments(&self, post_id: i64) -> Result<Vec<Comment>, StoreError> {
        self.check_read()?;
        let mut comments: Vec<Comment> = lock(&self.comments)
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| (c.created_at, c.id));
        Ok(comments)
    }

    async fn add_comment(
        &self,
        post_id: i64,
        comment: &NewComment,
    ) -> Result<Comment, StoreError> {
        self.check_write()?;
        if !lock(&self.tables).rows.iter().any(|r| r.id == post_id) {
            return Err(StoreError::NotFound);
        }
        let mut comments = lock(&self.comments);
        let row = Comment {
            id: i64::try_from(comments.len()).unwrap_or(i64::MAX) + 1,
            post_id,
            author: comment.author().to_string(),
            content: comment.content.clone(),
            created_at: Utc::now(),
        };
        comments.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl PostListings for MemoryStore<BlogPost> {
    async fn related(&self, slug: &str, limit: i64) -> Result<Vec<PostSummary>, StoreError> {
        self.check_read()?;
        let tables = lock(&self.tables);
        let source = tables
            .rows
            .iter()
            .filter(|r| r.slug == slug)
            .max_by_key(|r| r.id)
            .ok_or(StoreError::NotFound)?;
        let mut rows: Vec<&BlogPost> = tables
            .rows
            .iter()
            .filter(|r| r.id != source.id && r.category == source.category)
            .collect();
        rows.sort_by_key(|r| std::cmp::Reverse(r.id));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows.into_iter().map(PostSummary::from).collect())
    }

    async fn popular(&self, limit: i64) -> Result<Vec<PostSummary>, StoreError> {
        self.check_read()?;
        let tables = lock(&self.tables);
        let mut rows: Vec<&BlogPost> = tables.rows.iter().collect();
        rows.sort_by_key(|r| (std::cmp::Reverse(r.likes), std::cmp::Reverse(r.id)));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows.into_iter().map(PostSummary::from).collect())
    }
}

/// Asset store that hands out predictable URLs.
///
/// Files whose name starts with `bad` fail to upload.
#[derive(Default)]
pub(crate) struct FakeAssets {
    uploads: AtomicUsize,
    delete_calls: AtomicUsize,
    fail_deletes: AtomicBool,
    upload_delay_ms: AtomicU64,
    deleted: Mutex<Vec<ImageRef>>,
}

impl FakeAssets {
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> Vec<ImageRef> {
        lock(&self.deleted).clone()
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Make every upload wait `delay` before answering.
    pub fn slow_uploads(&self, delay: std::time::Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.upload_delay_ms.store(millis, Ordering::SeqCst);
    }
}

#[async_trait]
impl AssetStore for FakeAssets {
    async fn upload(&self, file: &LocalFile) -> Result<ImageRef, AssetError> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = self.upload_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        if file.file_name.starts_with("bad") {
            return Err(AssetError::Rejected {
                status: 500,
                message: "upload refused".to_string(),
            });
        }
        Ok(ImageRef::new(
            format!("https://cdn.test/upload/v1/{n}-{}", file.file_name),
            format!("img-{n}"),
        ))
    }

    async fn delete(&self, images: &[ImageRef]) -> Result<Vec<DeleteOutcome>, AssetError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self.fail_deletes.load(Ordering::SeqCst);
        let mut deleted = lock(&self.deleted);
        Ok(images
            .iter()
            .map(|image| {
                let id = image.resolved_external_id().unwrap_or_default();
                if failing {
                    DeleteOutcome::new(image, id, "error: refused")
                } else {
                    deleted.push(image.clone());
                    DeleteOutcome::new(image, id, RESULT_OK)
                }
            })
            .collect())
    }
}

/// Confirmation prompt with a fixed answer.
pub(crate) struct Always(pub bool);

impl Confirm for Always {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

pub(crate) fn admin_token() -> String {
    let now = Utc::now();
    let claims = Claims {
        sub: "admin-1".to_string(),
        email: Some("admin@example.com".to_string()),
        role: Some("admin".to_string()),
        exp: (now + Duration::minutes(15)).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

/// Stores and assets behind an [`AppState`], kept for assertions.
pub(crate) struct Fixture {
    pub blog: Arc<MemoryStore<BlogPost>>,
    pub projects: Arc<MemoryStore<crate::content::Project>>,
    pub properties: Arc<MemoryStore<Property>>,
    pub assets: Arc<FakeAssets>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            blog: Arc::new(MemoryStore::new()),
            projects: Arc::new(MemoryStore::new()),
            properties: Arc::new(MemoryStore::new()),
            assets: Arc::new(FakeAssets::default()),
        }
    }

    pub fn state(&self) -> AppState {
        AppState {
            blog: self.blog.clone(),
            projects: self.projects.clone(),
            properties: self.properties.clone(),
            likes: self.blog.clone(),
            similar: self.properties.clone(),
            comments: self.blog.clone(),
            listings: self.blog.clone(),
            assets: self.assets.clone(),
            assets_configured: true,
            auth: AuthConfig::new(Some(TEST_SECRET.to_string())),
            pool: None,
            max_upload_bytes: 1024 * 1024,
        }
    }

    /// Serve the app on an ephemeral port and return its base URL.
    pub async fn spawn(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = crate::create_app(self.state(), tower_http::cors::CorsLayer::new());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }
}
