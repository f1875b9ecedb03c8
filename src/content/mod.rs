//! Content model: the three editable collections and what they have in common.

pub mod blog;
pub mod comment;
pub mod image;
pub mod project;
pub mod property;
pub mod slug;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub use blog::{Author, BlogFilter, BlogPost, BlogPostDraft, BlogPostForm};
pub use comment::{Comment, NewComment, PostSummary};
pub use image::{external_id_from_url, ImageRef};
pub use project::{Project, ProjectDraft, ProjectFilter, ProjectForm};
pub use property::{Agent, Property, PropertyDraft, PropertyFilter, PropertyForm};
pub use slug::{is_valid_slug, slugify};

/// Which collection a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    BlogPost,
    Project,
    Property,
}

impl EntityKind {
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::BlogPost => "blog_posts",
            EntityKind::Project => "projects",
            EntityKind::Property => "properties",
        }
    }

    /// Path segment under `/api`.
    pub fn route(&self) -> &'static str {
        match self {
            EntityKind::BlogPost => "blog",
            EntityKind::Project => "projects",
            EntityKind::Property => "properties",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::BlogPost => "Blog post",
            EntityKind::Project => "Project",
            EntityKind::Property => "Property",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

/// Final images of an entity, resolved at submit time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Media {
    pub main_image: Option<ImageRef>,
    pub gallery: Vec<ImageRef>,
}

/// A required field is empty or holds a value outside its allowed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

pub(crate) fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new(field, "is required"))
    } else {
        Ok(())
    }
}

pub(crate) fn require_one_of(
    field: &'static str,
    value: &str,
    allowed: &[&str],
) -> Result<(), ValidationError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new(
            field,
            format!("must be one of: {}", allowed.join(", ")),
        ))
    }
}

pub(crate) fn require_slug(slug: &str) -> Result<(), ValidationError> {
    if is_valid_slug(slug) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "slug",
            "must contain only lowercase letters, numbers, and hyphens",
        ))
    }
}

/// `value` must leave something once slugified; only ASCII letters and
/// digits survive.
pub(crate) fn require_sluggable(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if slugify(value).is_empty() {
        Err(ValidationError::new(
            field,
            "must contain Latin letters or digits",
        ))
    } else {
        Ok(())
    }
}

/// A record editable through the admin editor and stored in one collection.
///
/// `Draft` is the full-replace write payload, `Form` the editor-local field
/// state, `Filter` the optional list filter of the collection.
pub trait Entity: Clone + Send + Sync + Unpin + Serialize + DeserializeOwned + 'static {
    type Draft: Clone + Send + Sync + Serialize + DeserializeOwned + 'static;
    type Form: Clone + Default + Send + Sync + 'static;
    type Filter: Clone + Default + Send + Sync + Serialize + DeserializeOwned + 'static;

    const KIND: EntityKind;

    fn id(&self) -> i64;
    fn slug(&self) -> &str;
    fn title(&self) -> &str;
    fn main_image(&self) -> Option<&ImageRef>;
    fn gallery(&self) -> &[ImageRef];

    fn matches(&self, filter: &Self::Filter) -> bool;

    /// Form fields seeded from a stored record.
    fn to_form(&self) -> Self::Form;

    /// Local validation run before any upload is attempted.
    fn validate_form(form: &Self::Form) -> Result<(), ValidationError>;

    /// Build the full write payload. `existing` is the record being edited,
    /// `None` when creating.
    fn assemble(form: &Self::Form, media: Media, existing: Option<&Self>) -> Self::Draft;

    /// Server-side check and normalisation of an incoming payload.
    fn prepare_draft(draft: Self::Draft) -> Result<Self::Draft, ValidationError>;

    /// The record a store holds after writing `draft` under `id`.
    fn materialize(id: i64, draft: Self::Draft, existing: Option<&Self>) -> Self;

    /// Main image followed by the gallery.
    fn images(&self) -> Vec<ImageRef> {
        self.main_image()
            .into_iter()
            .chain(self.gallery())
            .cloned()
            .collect()
    }
}
