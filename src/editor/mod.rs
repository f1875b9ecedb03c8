//! Gallery-aware entity editor.
//!
//! Drives the create/edit form of one collection: form state, the main image
//! slot, gallery deltas, uploads on submit, and delete with remote cleanup.
//! Uploads always finish before any backend write is attempted.

pub mod gallery;
pub mod main_image;
pub mod notify;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::try_join_all;

use crate::assets::{delete_all, AssetStore, LocalFile};
use crate::content::{Entity, ImageRef, Media};
use crate::db::ContentStore;
use crate::error::{AssetError, EditorError, UploadTarget, WriteOp};

pub use gallery::{GalleryEntry, GallerySession, PendingImage};
pub use main_image::MainImageSlot;
pub use notify::{Notice, NoticeKind, Notifications};

/// Synchronous yes/no prompt shown before a delete.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Order of the row delete and the remote image cleanup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Delete the images first and keep the row if that fails.
    #[default]
    CleanupFirst,
    /// Delete the row, then clean up images; cleanup failures are logged.
    RowFirst,
}

#[derive(Debug, Clone)]
pub struct EditorConfig {
    pub notice_ttl: Duration,
    pub delete_policy: DeletePolicy,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            notice_ttl: Duration::from_secs(4),
            delete_policy: DeletePolicy::default(),
        }
    }
}

/// Editor-local state of the record being created or edited.
#[derive(Clone)]
pub struct EditSession<E: Entity> {
    pub form: E::Form,
    /// The stored record, `None` in create mode.
    pub editing: Option<E>,
    pub main_image: MainImageSlot,
    pub gallery: GallerySession,
}

impl<E: Entity> Default for EditSession<E> {
    fn default() -> Self {
        Self {
            form: E::Form::default(),
            editing: None,
            main_image: MainImageSlot::default(),
            gallery: GallerySession::default(),
        }
    }
}

impl<E: Entity> EditSession<E> {
    fn load(entity: &E) -> Self {
        Self {
            form: entity.to_form(),
            editing: Some(entity.clone()),
            main_image: MainImageSlot::load(entity.main_image()),
            gallery: GallerySession::load(entity.gallery()),
        }
    }
}

struct EditorState<E: Entity> {
    session: EditSession<E>,
    items: Vec<E>,
    notifications: Notifications,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds the single-flight submit flag until dropped.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Marks one entity id as being deleted until dropped.
struct DeleteGuard<'a> {
    in_flight: &'a Mutex<HashSet<i64>>,
    id: i64,
}

impl<'a> DeleteGuard<'a> {
    fn acquire(in_flight: &'a Mutex<HashSet<i64>>, id: i64) -> Option<Self> {
        let inserted = lock(in_flight).insert(id);
        inserted.then(|| DeleteGuard { in_flight, id })
    }
}

impl Drop for DeleteGuard<'_> {
    fn drop(&mut self) {
        lock(self.in_flight).remove(&self.id);
    }
}

pub struct EntityEditor<E: Entity> {
    store: Arc<dyn ContentStore<E>>,
    assets: Arc<dyn AssetStore>,
    confirm: Arc<dyn Confirm>,
    config: EditorConfig,
    filter: E::Filter,
    state: Mutex<EditorState<E>>,
    busy: AtomicBool,
    deleting: Mutex<HashSet<i64>>,
}

impl<E: Entity> EntityEditor<E> {
    pub fn new(
        store: Arc<dyn ContentStore<E>>,
        assets: Arc<dyn AssetStore>,
        confirm: Arc<dyn Confirm>,
        config: EditorConfig,
    ) -> Self {
        let notifications = Notifications::new(config.notice_ttl);
        Self {
            store,
            assets,
            confirm,
            config,
            filter: E::Filter::default(),
            state: Mutex::new(EditorState {
                session: EditSession::default(),
                items: Vec::new(),
                notifications,
            }),
            busy: AtomicBool::new(false),
            deleting: Mutex::new(HashSet::new()),
        }
    }

    /// Filter applied to every list refresh.
    pub fn with_filter(mut self, filter: E::Filter) -> Self {
        self.filter = filter;
        self
    }

    fn state(&self) -> MutexGuard<'_, EditorState<E>> {
        lock(&self.state)
    }

    // ------------------------------------------------------------------
    // Observable state
    // ------------------------------------------------------------------

    /// True while a submit is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn is_deleting(&self, id: i64) -> bool {
        lock(&self.deleting).contains(&id)
    }

    pub fn items(&self) -> Vec<E> {
        self.state().items.clone()
    }

    pub fn session(&self) -> EditSession<E> {
        self.state().session.clone()
    }

    pub fn form(&self) -> E::Form {
        self.state().session.form.clone()
    }

    pub fn update_form(&self, edit: impl FnOnce(&mut E::Form)) {
        edit(&mut self.state().session.form);
    }

    pub fn editing_id(&self) -> Option<i64> {
        self.state().session.editing.as_ref().map(Entity::id)
    }

    pub fn main_image_preview(&self) -> Option<String> {
        self.state().session.main_image.preview().map(String::from)
    }

    pub fn gallery_previews(&self) -> Vec<String> {
        self.state().session.gallery.previews()
    }

    pub fn notice(&self) -> Option<Notice> {
        self.state().notifications.visible().cloned()
    }

    pub fn dismiss_notice(&self) {
        self.state().notifications.dismiss();
    }

    /// Gallery as edited so far, removed images included.
    pub fn gallery_entries(&self) -> Vec<GalleryEntry> {
        self.state().session.gallery.entries().to_vec()
    }

    /// Stored gallery images dropped in this session.
    pub fn removed_gallery_images(&self) -> Vec<ImageRef> {
        self.state().session.gallery.removed()
    }

    /// True once an image was removed from or added to the gallery.
    pub fn has_gallery_changes(&self) -> bool {
        self.state().session.gallery.is_dirty()
    }

    // ------------------------------------------------------------------
    // Form operations
    // ------------------------------------------------------------------

    /// Seed the form from a fetched record. No network call.
    pub fn load_for_edit(&self, entity: &E) {
        tracing::debug!(entity = %E::KIND, id = entity.id(), "editing");
        self.state().session = EditSession::load(entity);
    }

    /// Back to an empty create form.
    pub fn reset(&self) {
        self.state().session = EditSession::default();
    }

    pub fn select_main_image(&self, file: LocalFile) -> String {
        self.state().session.main_image.select(file)
    }

    /// Discard the newly selected main image, falling back to the stored one.
    pub fn clear_main_image(&self) {
        self.state().session.main_image.clear_selection();
    }

    pub fn add_gallery_files(&self, files: impl IntoIterator<Item = LocalFile>) -> Vec<String> {
        self.state().session.gallery.add_files(files)
    }

    /// Drop a gallery image by stored URL or pending preview handle.
    pub fn remove_gallery_image(&self, key: &str) -> bool {
        self.state().session.gallery.remove(key)
    }

    // ------------------------------------------------------------------
    // Backend operations
    // ------------------------------------------------------------------

    /// Re-fetch the list with the editor's filter.
    pub async fn refresh(&self) -> Result<(), EditorError> {
        match self.store.list(&self.filter).await {
            Ok(items) => {
                self.state().items = items;
                Ok(())
            }
            Err(source) => {
                let err = EditorError::BackendReadFailed(source);
                self.report(&err);
                Err(err)
            }
        }
    }

    /// Upload pending images, then create or replace the record.
    ///
    /// On failure the form is left as it was; on success the editor returns
    /// to create mode and the list is re-fetched.
    pub async fn submit(&self) -> Result<E, EditorError> {
        let _busy = BusyGuard::acquire(&self.busy).ok_or(EditorError::Busy)?;
        let session = self.session();

        let saved = match self.write(&session).await {
            Ok(saved) => saved,
            Err(err) => {
                self.report(&err);
                return Err(err);
            }
        };

        {
            let mut state = self.state();
            state.session = EditSession::default();
            let verb = if session.editing.is_some() { "updated" } else { "created" };
            state
                .notifications
                .success(format!("{} {}", E::KIND.label(), verb));
        }

        // A failed refresh is reported on its own; the write already succeeded.
        let _ = self.refresh().await;
        Ok(saved)
    }

    async fn write(&self, session: &EditSession<E>) -> Result<E, EditorError> {
        E::validate_form(&session.form)?;

        let main_image = match session.main_image.pending() {
            Some(pending) => Some(self.assets.upload(&pending.file).await.map_err(|source| {
                EditorError::UploadFailed {
                    target: UploadTarget::Main,
                    source,
                }
            })?),
            None => session.main_image.current().cloned(),
        };

        let uploads = session
            .gallery
            .pending()
            .map(|pending| self.assets.upload(&pending.file));
        let uploaded = try_join_all(uploads)
            .await
            .map_err(|source| EditorError::UploadFailed {
                target: UploadTarget::Gallery,
                source,
            })?;

        let mut gallery = session.gallery.retained();
        gallery.extend(uploaded);

        let editing = session.editing.as_ref();
        let draft = E::assemble(&session.form, Media { main_image, gallery }, editing);

        match editing {
            Some(existing) => self
                .store
                .update(existing.id(), &draft)
                .await
                .map_err(|source| EditorError::BackendWriteFailed {
                    op: WriteOp::Update,
                    source,
                }),
            None => self
                .store
                .insert(&draft)
                .await
                .map_err(|source| EditorError::BackendWriteFailed {
                    op: WriteOp::Insert,
                    source,
                }),
        }
    }

    /// Delete a record and its remote images after the user confirms.
    pub async fn delete(&self, entity: &E) -> Result<(), EditorError> {
        let prompt = format!(
            "Delete {} \"{}\"? This cannot be undone.",
            E::KIND.label().to_lowercase(),
            entity.title()
        );
        if !self.confirm.confirm(&prompt) {
            return Err(EditorError::Cancelled);
        }

        let id = entity.id();
        let _guard = DeleteGuard::acquire(&self.deleting, id).ok_or(EditorError::Busy)?;

        if let Err(err) = self.remove(entity).await {
            self.report(&err);
            return Err(err);
        }

        let mut state = self.state();
        state.items.retain(|item| item.id() != id);
        if state.session.editing.as_ref().map(Entity::id) == Some(id) {
            state.session = EditSession::default();
        }
        state
            .notifications
            .success(format!("{} deleted", E::KIND.label()));
        Ok(())
    }

    async fn remove(&self, entity: &E) -> Result<(), EditorError> {
        let images = entity.images();
        match self.config.delete_policy {
            DeletePolicy::CleanupFirst => {
                self.cleanup(&images)
                    .await
                    .map_err(EditorError::RemoteDeleteFailed)?;
                self.delete_row(entity.id()).await
            }
            DeletePolicy::RowFirst => {
                self.delete_row(entity.id()).await?;
                if let Err(e) = self.cleanup(&images).await {
                    tracing::warn!(
                        entity = %E::KIND,
                        id = entity.id(),
                        error = %e,
                        "row deleted but image cleanup failed"
                    );
                }
                Ok(())
            }
        }
    }

    async fn cleanup(&self, images: &[ImageRef]) -> Result<(), AssetError> {
        if images.is_empty() {
            return Ok(());
        }
        delete_all(self.assets.as_ref(), images).await.map(|_| ())
    }

    async fn delete_row(&self, id: i64) -> Result<(), EditorError> {
        self.store
            .delete(id)
            .await
            .map_err(|source| EditorError::BackendWriteFailed {
                op: WriteOp::Delete,
                source,
            })
    }

    fn report(&self, err: &EditorError) {
        match err {
            EditorError::Busy | EditorError::Cancelled => {}
            _ => self.state().notifications.error(err.to_string()),
        }
    }
}
