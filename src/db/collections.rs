//! Postgres-backed collections.
//!
//! Each entity declares its writable columns once; inserts and full-replace
//! updates bind the same value list (`INSERT ... VALUES (..)` and
//! `UPDATE ... SET (..) = ROW(..)`), so the two write paths cannot drift.

use async_trait::async_trait;
use sqlx::{
    postgres::PgRow, query_builder::Separated, types::Json, FromRow, PgPool, Postgres,
    QueryBuilder,
};

use crate::content::{BlogPost, Comment, Entity, NewComment, PostSummary, Project, Property};
use crate::db::store::{CommentStore, ContentStore, LikeCounter, PostListings, SimilarListings};
use crate::error::StoreError;

type Values<'qb> = Separated<'qb, 'static, Postgres, &'static str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Insert,
    Update,
}

/// SQL shape of one collection.
pub trait PgCollection: Entity + for<'r> FromRow<'r, PgRow> {
    /// Writable columns, in the order `push_values` binds them.
    const COLUMNS: &'static [&'static str];

    /// Select list returned by reads and `RETURNING` clauses.
    const SELECT: &'static str;

    fn push_values(values: &mut Values<'_>, draft: &Self::Draft, mode: WriteMode);

    fn push_filter(conditions: &mut Conditions<'_>, filter: &Self::Filter);
}

/// Appends `WHERE` / `AND` as conditions are added.
pub struct Conditions<'a> {
    qb: &'a mut QueryBuilder<'static, Postgres>,
    any: bool,
}

impl<'a> Conditions<'a> {
    fn new(qb: &'a mut QueryBuilder<'static, Postgres>) -> Self {
        Self { qb, any: false }
    }

    pub fn and(&mut self, clause: &str) -> &mut QueryBuilder<'static, Postgres> {
        self.qb.push(if self.any { " AND " } else { " WHERE " });
        self.any = true;
        self.qb.push(clause)
    }
}

fn build_list<E: PgCollection>(filter: &E::Filter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM {}", E::SELECT, E::KIND.table()));
    E::push_filter(&mut Conditions::new(&mut qb), filter);
    qb.push(" ORDER BY id DESC");
    qb
}

fn build_insert<E: PgCollection>(draft: &E::Draft) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "INSERT INTO {} ({}) VALUES (",
        E::KIND.table(),
        E::COLUMNS.join(", ")
    ));
    E::push_values(&mut qb.separated(", "), draft, WriteMode::Insert);
    qb.push(") RETURNING ");
    qb.push(E::SELECT);
    qb
}

fn build_update<E: PgCollection>(id: i64, draft: &E::Draft) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "UPDATE {} SET ({}) = ROW(",
        E::KIND.table(),
        E::COLUMNS.join(", ")
    ));
    E::push_values(&mut qb.separated(", "), draft, WriteMode::Update);
    qb.push(") WHERE id = ");
    qb.push_bind(id);
    qb.push(" RETURNING ");
    qb.push(E::SELECT);
    qb
}

/// sqlx implementation of every store seam.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl<E: PgCollection> ContentStore<E> for PgStore {
    async fn list(&self, filter: &E::Filter) -> Result<Vec<E>, StoreError> {
        let mut qb = build_list::<E>(filter);
        Ok(qb.build_query_as::<E>().fetch_all(&self.pool).await?)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<E>, StoreError> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", E::SELECT, E::KIND.table());
        Ok(sqlx::query_as::<_, E>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<E>, StoreError> {
        // Slugs are not unique at this layer; the newest row wins.
        let sql = format!(
            "SELECT {} FROM {} WHERE slug = $1 ORDER BY id DESC LIMIT 1",
            E::SELECT,
            E::KIND.table()
        );
        Ok(sqlx::query_as::<_, E>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert(&self, draft: &E::Draft) -> Result<E, StoreError> {
        let mut qb = build_insert::<E>(draft);
        let row = qb.build_query_as::<E>().fetch_one(&self.pool).await?;
        tracing::info!(entity = %E::KIND, id = row.id(), "record inserted");
        Ok(row)
    }

    async fn update(&self, id: i64, draft: &E::Draft) -> Result<E, StoreError> {
        let mut qb = build_update::<E>(id, draft);
        let row = qb
            .build_query_as::<E>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        tracing::info!(entity = %E::KIND, id, "record updated");
        Ok(row)
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", E::KIND.table());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        tracing::info!(entity = %E::KIND, id, "record deleted");
        Ok(())
    }
}

#[async_trait]
impl LikeCounter for PgStore {
    async fn like(&self, id: i64) -> Result<i32, StoreError> {
        sqlx::query_scalar::<_, i32>(
            "UPDATE blog_posts SET likes = likes + 1 WHERE id = $1 RETURNING likes",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl SimilarListings for PgStore {
    async fn similar(&self, slug: &str, limit: i64) -> Result<Vec<Property>, StoreError> {
        let property_type = sqlx::query_scalar::<_, String>(
            "SELECT property_type FROM properties WHERE slug = $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        let sql = format!(
            r#"
            SELECT {} FROM properties
            WHERE slug <> $1 AND property_type = $2
            ORDER BY id DESC
            LIMIT $3
            "#,
            Property::SELECT
        );
        Ok(sqlx::query_as::<_, Property>(&sql)
            .bind(slug)
            .bind(property_type)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }
}

const COMMENT_COLUMNS: &str = "id, post_id, author, content, created_at";

#[async_trait]
impl CommentStore for PgStore {
    async fn comments(&self, post_id: i64) -> Result<Vec<Comment>, StoreError> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = $1 ORDER BY created_at ASC, id ASC"
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn add_comment(
        &self,
        post_id: i64,
        comment: &NewComment,
    ) -> Result<Comment, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO comments (post_id, author, content)
            SELECT $1, $2, $3
            WHERE EXISTS (SELECT 1 FROM blog_posts WHERE id = $1)
            RETURNING {COMMENT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .bind(comment.author())
            .bind(&comment.content)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        tracing::info!(post_id, comment_id = row.id, "comment added");
        Ok(row)
    }
}

#[async_trait]
impl PostListings for PgStore {
    async fn related(&self, slug: &str, limit: i64) -> Result<Vec<PostSummary>, StoreError> {
        let (id, category) = sqlx::query_as::<_, (i64, String)>(
            "SELECT id, category FROM blog_posts WHERE slug = $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        let sql = format!(
            r#"
            SELECT {} FROM blog_posts
            WHERE category = $1 AND id <> $2
            ORDER BY id DESC
            LIMIT $3
            "#,
            PostSummary::SELECT
        );
        Ok(sqlx::query_as::<_, PostSummary>(&sql)
            .bind(category)
            .bind(id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn popular(&self, limit: i64) -> Result<Vec<PostSummary>, StoreError> {
        let sql = format!(
            "SELECT {} FROM blog_posts ORDER BY likes DESC, id DESC LIMIT $1",
            PostSummary::SELECT
        );
        Ok(sqlx::query_as::<_, PostSummary>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }
}

// ============================================================================
// Collections
// ============================================================================

impl PgCollection for BlogPost {
    const COLUMNS: &'static [&'static str] = &[
        "slug",
        "title",
        "excerpt",
        "content",
        "category",
        "is_featured",
        "cover_image",
        "gallery",
        "author",
        "likes",
    ];

    const SELECT: &'static str = "id, slug, title, excerpt, content, category, is_featured, \
         cover_image, gallery, author, likes, created_at";

    fn push_values(values: &mut Values<'_>, draft: &Self::Draft, mode: WriteMode) {
        values.push_bind(draft.slug.clone());
        values.push_bind(draft.title.clone());
        values.push_bind(draft.excerpt.clone());
        values.push_bind(draft.content.clone());
        values.push_bind(draft.category.clone());
        values.push_bind(draft.is_featured);
        values.push_bind(Json(draft.cover_image.clone()));
        values.push_bind(Json(draft.gallery.clone()));
        values.push_bind(Json(draft.author.clone()));
        match mode {
            WriteMode::Insert => {
                values.push_bind(draft.likes.unwrap_or(0));
            }
            WriteMode::Update => {
                // The counter is owned by readers; keep it unless explicitly sent.
                values.push("COALESCE(");
                values.push_bind_unseparated(draft.likes);
                values.push_unseparated(", likes)");
            }
        }
    }

    fn push_filter(conditions: &mut Conditions<'_>, filter: &Self::Filter) {
        if let Some(category) = &filter.category {
            conditions
                .and("lower(trim(category)) = lower(trim(")
                .push_bind(category.clone())
                .push("))");
        }
    }
}

impl PgCollection for Project {
    const COLUMNS: &'static [&'static str] = &[
        "slug",
        "service",
        "title",
        "description",
        "category",
        "overview",
        "details",
        "hero_image",
        "main_image",
        "gallery",
        "location",
        "year_completed",
        "project_type",
        "key_features",
    ];

    const SELECT: &'static str = "id, slug, service, title, description, category, overview, \
         details, hero_image, main_image, gallery, location, year_completed, project_type, \
         key_features, created_at";

    fn push_values(values: &mut Values<'_>, draft: &Self::Draft, _mode: WriteMode) {
        values.push_bind(draft.slug.clone());
        values.push_bind(draft.service.clone());
        values.push_bind(draft.title.clone());
        values.push_bind(draft.description.clone());
        values.push_bind(draft.category.clone());
        values.push_bind(draft.overview.clone());
        values.push_bind(draft.details.clone());
        values.push_bind(draft.hero_image.clone());
        values.push_bind(Json(draft.main_image.clone()));
        values.push_bind(Json(draft.gallery.clone()));
        values.push_bind(draft.location.clone());
        values.push_bind(draft.year_completed.clone());
        values.push_bind(draft.project_type.clone());
        values.push_bind(draft.key_features.clone());
    }

    fn push_filter(conditions: &mut Conditions<'_>, filter: &Self::Filter) {
        if let Some(service) = &filter.service {
            conditions.and("service = ").push_bind(service.clone());
        }
        if let Some(category) = &filter.category {
            conditions.and("category = ").push_bind(category.clone());
        }
    }
}

impl PgCollection for Property {
    const COLUMNS: &'static [&'static str] = &[
        "slug",
        "title",
        "address",
        "price",
        "property_type",
        "bedrooms",
        "bathrooms",
        "area",
        "features",
        "description",
        "agent",
        "main_image",
        "gallery",
    ];

    const SELECT: &'static str = "id, slug, title, address, price, property_type, bedrooms, \
         bathrooms, area, features, description, agent, main_image, gallery, created_at";

    fn push_values(values: &mut Values<'_>, draft: &Self::Draft, _mode: WriteMode) {
        values.push_bind(draft.slug.clone());
        values.push_bind(draft.title.clone());
        values.push_bind(draft.address.clone());
        values.push_bind(draft.price.clone());
        values.push_bind(draft.property_type.clone());
        values.push_bind(draft.bedrooms);
        values.push_bind(draft.bathrooms);
        values.push_bind(draft.area.clone());
        values.push_bind(draft.features.clone());
        values.push_bind(draft.description.clone());
        values.push_bind(Json(draft.agent.clone()));
        values.push_bind(Json(draft.main_image.clone()));
        values.push_bind(Json(draft.gallery.clone()));
    }

    fn push_filter(conditions: &mut Conditions<'_>, filter: &Self::Filter) {
        if let Some(property_type) = &filter.property_type {
            conditions
                .and("property_type = ")
                .push_bind(property_type.clone());
        }
    }
}
