/**
 * Engagement Routes
 * Public like counter, comments and sidebar listings on blog posts,
 * "similar listings" on properties
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::content::{EntityKind, NewComment};
use crate::db::{CommentStore, LikeCounter, PostListings, SimilarListings};
use crate::error::StoreError;
use crate::routes::store_error;

/// Properties shown under a listing.
const SIMILAR_LIMIT: i64 = 3;

/// Posts in each blog sidebar list.
const SIDEBAR_LIMIT: i64 = 3;

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    pub likes: i32,
}

pub fn like_router(likes: Arc<dyn LikeCounter>) -> Router {
    Router::new()
        .route("/{key}/like", post(like_post))
        .with_state(likes)
}

pub fn comments_router(comments: Arc<dyn CommentStore>) -> Router {
    Router::new()
        .route("/{key}/comments", get(list_comments).post(add_comment))
        .with_state(comments)
}

pub fn post_listings_router(listings: Arc<dyn PostListings>) -> Router {
    Router::new()
        .route("/popular", get(popular_posts))
        .route("/{key}/related", get(related_posts))
        .with_state(listings)
}

pub fn similar_router(similar: Arc<dyn SimilarListings>) -> Router {
    Router::new()
        .route("/{key}/similar", get(similar_properties))
        .with_state(similar)
}

/// POST /api/blog/{id}/like
pub async fn like_post(
    State(likes): State<Arc<dyn LikeCounter>>,
    Path(id): Path<i64>,
) -> Response {
    match likes.like(id).await {
        Ok(likes) => Json(LikeResponse { likes }).into_response(),
        Err(e) => store_error(EntityKind::BlogPost, "like post", e).into_response(),
    }
}

/// GET /api/blog/{id}/comments - oldest first
pub async fn list_comments(
    State(comments): State<Arc<dyn CommentStore>>,
    Path(post_id): Path<i64>,
) -> Response {
    match comments.comments(post_id).await {
        Ok(comments) => Json(comments).into_response(),
        Err(e) => store_error(EntityKind::BlogPost, "load comments", e).into_response(),
    }
}

/// POST /api/blog/{id}/comments - anonymous
pub async fn add_comment(
    State(comments): State<Arc<dyn CommentStore>>,
    Path(post_id): Path<i64>,
    Json(comment): Json<NewComment>,
) -> Response {
    let comment = match comment.prepare() {
        Ok(comment) => comment,
        Err(e) => {
            return store_error(EntityKind::BlogPost, "add comment", StoreError::Invalid(e))
                .into_response()
        }
    };

    match comments.add_comment(post_id, &comment).await {
        Ok(saved) => (StatusCode::CREATED, Json(saved)).into_response(),
        Err(e) => store_error(EntityKind::BlogPost, "add comment", e).into_response(),
    }
}

/// GET /api/blog/{slug}/related
pub async fn related_posts(
    State(listings): State<Arc<dyn PostListings>>,
    Path(slug): Path<String>,
) -> Response {
    match listings.related(&slug, SIDEBAR_LIMIT).await {
        Ok(posts) => Json(posts).into_response(),
        Err(e) => store_error(EntityKind::BlogPost, "load related posts", e).into_response(),
    }
}

/// GET /api/blog/popular - most liked first
pub async fn popular_posts(State(listings): State<Arc<dyn PostListings>>) -> Response {
    match listings.popular(SIDEBAR_LIMIT).await {
        Ok(posts) => Json(posts).into_response(),
        Err(e) => store_error(EntityKind::BlogPost, "load popular posts", e).into_response(),
    }
}

/// GET /api/properties/{slug}/similar
pub async fn similar_properties(
    State(similar): State<Arc<dyn SimilarListings>>,
    Path(slug): Path<String>,
) -> Response {
    match similar.similar(&slug, SIMILAR_LIMIT).await {
        Ok(properties) => Json(properties).into_response(),
        Err(e) => store_error(EntityKind::Property, "load similar properties", e).into_response(),
    }
}
