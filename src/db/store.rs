//! Backend seams: every component receives these as trait objects instead of
//! reaching for a process-wide client.

use async_trait::async_trait;

use crate::content::{is_valid_slug, Comment, Entity, NewComment, PostSummary, Property};
use crate::error::StoreError;

/// CRUD over one content collection. Writes are full replaces.
#[async_trait]
pub trait ContentStore<E: Entity>: Send + Sync {
    /// Records matching `filter`, newest id first.
    async fn list(&self, filter: &E::Filter) -> Result<Vec<E>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<E>, StoreError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<E>, StoreError>;

    async fn insert(&self, draft: &E::Draft) -> Result<E, StoreError>;

    /// Fails with [`StoreError::NotFound`] when no row has `id`.
    async fn update(&self, id: i64, draft: &E::Draft) -> Result<E, StoreError>;

    /// Fails with [`StoreError::NotFound`] when no row has `id`.
    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    async fn find(&self, lookup: &Lookup) -> Result<Option<E>, StoreError> {
        match lookup {
            Lookup::Id(id) => self.find_by_id(*id).await,
            Lookup::Slug(slug) => self.find_by_slug(slug).await,
            Lookup::Numeric { id, slug } => match self.find_by_id(*id).await? {
                Some(record) => Ok(Some(record)),
                None => self.find_by_slug(slug).await,
            },
        }
    }
}

/// Public like button on blog posts.
#[async_trait]
pub trait LikeCounter: Send + Sync {
    /// Atomically bump the counter and return the new value.
    async fn like(&self, id: i64) -> Result<i32, StoreError>;
}

/// "Similar listings" shown on a property detail page.
#[async_trait]
pub trait SimilarListings: Send + Sync {
    /// Up to `limit` properties sharing the type of `slug`, excluding it.
    async fn similar(&self, slug: &str, limit: i64) -> Result<Vec<Property>, StoreError>;
}

/// Reader comments under a blog post.
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Comments on `post_id`, oldest first. Unknown posts have none.
    async fn comments(&self, post_id: i64) -> Result<Vec<Comment>, StoreError>;

    /// Store an already prepared comment. Fails with
    /// [`StoreError::NotFound`] when the post does not exist.
    async fn add_comment(&self, post_id: i64, comment: &NewComment)
        -> Result<Comment, StoreError>;
}

/// Sidebar listings next to a blog post.
#[async_trait]
pub trait PostListings: Send + Sync {
    /// Up to `limit` other posts in the category of `slug`, newest first.
    async fn related(&self, slug: &str, limit: i64) -> Result<Vec<PostSummary>, StoreError>;

    /// Up to `limit` posts with the most likes.
    async fn popular(&self, limit: i64) -> Result<Vec<PostSummary>, StoreError>;
}

/// How a detail route addresses a record: numeric id or slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Id(i64),
    Slug(String),
    /// Digits-only key: an id first, then a slug such as `2024`.
    Numeric { id: i64, slug: String },
}

impl Lookup {
    pub fn parse(key: &str) -> Option<Self> {
        let slug = is_valid_slug(key);
        match key.parse::<i64>() {
            Ok(id) if slug => Some(Lookup::Numeric {
                id,
                slug: key.to_string(),
            }),
            Ok(id) => Some(Lookup::Id(id)),
            Err(_) => slug.then(|| Lookup::Slug(key.to_string())),
        }
    }
}

/// Stand-in used when the server runs without a database.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

#[async_trait]
impl<E: Entity> ContentStore<E> for Unavailable {
    async fn list(&self, _filter: &E::Filter) -> Result<Vec<E>, StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn find_by_id(&self, _id: i64) -> Result<Option<E>, StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn find_by_slug(&self, _slug: &str) -> Result<Option<E>, StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn insert(&self, _draft: &E::Draft) -> Result<E, StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn update(&self, _id: i64, _draft: &E::Draft) -> Result<E, StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn delete(&self, _id: i64) -> Result<(), StoreError> {
        Err(StoreError::Unavailable)
    }
}

#[async_trait]
impl LikeCounter for Unavailable {
    async fn like(&self, _id: i64) -> Result<i32, StoreError> {
        Err(StoreError::Unavailable)
    }
}

#[async_trait]
impl SimilarListings for Unavailable {
    async fn similar(&self, _slug: &str, _limit: i64) -> Result<Vec<Property>, StoreError> {
        Err(StoreError::Unavailable)
    }
}

#[async_trait]
impl CommentStore for Unavailable {
    async fn comments(&self, _post_id: i64) -> Result<Vec<Comment>, StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn add_comment(
        &self,
        _post_id: i64,
        _comment: &NewComment,
    ) -> Result<Comment, StoreError> {
        Err(StoreError::Unavailable)
    }
}

#[async_trait]
impl PostListings for Unavailable {
    async fn related(&self, _slug: &str, _limit: i64) -> Result<Vec<PostSummary>, StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn popular(&self, _limit: i64) -> Result<Vec<PostSummary>, StoreError> {
        Err(StoreError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{BlogPost, BlogPostForm, Media};
    use crate::testing::MemoryStore;

    #[test]
    fn test_lookup_parse() {
        assert_eq!(
            Lookup::parse("42"),
            Some(Lookup::Numeric {
                id: 42,
                slug: "42".to_string()
            })
        );
        assert_eq!(Lookup::parse("+42"), Some(Lookup::Id(42)));
        assert_eq!(
            Lookup::parse("sea-view-villa"),
            Some(Lookup::Slug("sea-view-villa".to_string()))
        );
        assert_eq!(Lookup::parse("Bad Slug"), None);
    }

    #[tokio::test]
    async fn test_unavailable_store_refuses_everything() {
        let store = Unavailable;
        let result = ContentStore::<BlogPost>::find(&store, &Lookup::Id(1)).await;
        assert!(matches!(result, Err(StoreError::Unavailable)));
        assert!(matches!(store.like(1).await, Err(StoreError::Unavailable)));
        assert!(matches!(store.comments(1).await, Err(StoreError::Unavailable)));
        assert!(matches!(store.popular(3).await, Err(StoreError::Unavailable)));
    }

    #[tokio::test]
    async fn test_numeric_key_falls_back_to_slug() {
        let store = MemoryStore::<BlogPost>::new();
        let form = BlogPostForm {
            title: "2024".to_string(),
            ..Default::default()
        };
        let by_year = store.seed(BlogPost::assemble(&form, Media::default(), None));
        let form = BlogPostForm {
            title: "First".to_string(),
            ..Default::default()
        };
        let first = store.seed(BlogPost::assemble(&form, Media::default(), None));
        assert_eq!((by_year.id, first.id), (1, 2));

        let lookup = Lookup::parse("2024").unwrap();
        let found = store.find(&lookup).await.unwrap();
        assert_eq!(found.map(|p| p.id), Some(by_year.id));

        let lookup = Lookup::parse("2").unwrap();
        let found = store.find(&lookup).await.unwrap();
        assert_eq!(found.map(|p| p.slug), Some("first".to_string()));

        let lookup = Lookup::parse("77").unwrap();
        assert_eq!(store.find(&lookup).await.unwrap(), None);
    }
}
