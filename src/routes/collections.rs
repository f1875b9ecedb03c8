/**
 * Collection Routes
 * List, fetch and full-replace writes for blog posts, projects and properties
 */
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::content::Entity;
use crate::db::{ContentStore, Lookup};
use crate::error::StoreError;
use crate::routes::auth::{require_admin, AuthConfig};
use crate::routes::{store_error, ErrorResponse};

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

pub struct CollectionState<E: Entity> {
    pub store: Arc<dyn ContentStore<E>>,
    pub auth: AuthConfig,
}

impl<E: Entity> Clone for CollectionState<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            auth: self.auth.clone(),
        }
    }
}

/// Routes of one collection, meant to be nested under `/api/{route}`.
pub fn router<E: Entity>(store: Arc<dyn ContentStore<E>>, auth: AuthConfig) -> Router {
    Router::new()
        .route("/", get(list_records::<E>).post(create_record::<E>))
        .route(
            "/{key}",
            get(get_record::<E>)
                .put(update_record::<E>)
                .delete(delete_record::<E>),
        )
        .with_state(CollectionState { store, auth })
}

/// GET /api/{collection}
pub async fn list_records<E: Entity>(
    State(state): State<CollectionState<E>>,
    Query(filter): Query<E::Filter>,
) -> Response {
    match state.store.list(&filter).await {
        Ok(items) => {
            let total = items.len();
            Json(ListResponse { items, total }).into_response()
        }
        Err(e) => store_error(E::KIND, "list records", e).into_response(),
    }
}

/// GET /api/{collection}/{key} - by numeric id or slug
pub async fn get_record<E: Entity>(
    State(state): State<CollectionState<E>>,
    Path(key): Path<String>,
) -> Response {
    let Some(lookup) = Lookup::parse(&key) else {
        return ErrorResponse::status(
            StatusCode::NOT_FOUND,
            format!("{} not found", E::KIND.label()),
        )
        .into_response();
    };

    match state.store.find(&lookup).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => store_error(E::KIND, "fetch record", StoreError::NotFound).into_response(),
        Err(e) => store_error(E::KIND, "fetch record", e).into_response(),
    }
}

/// POST /api/{collection} (admin)
pub async fn create_record<E: Entity>(
    State(state): State<CollectionState<E>>,
    headers: HeaderMap,
    Json(draft): Json<E::Draft>,
) -> Response {
    if let Err(err) = require_admin(&state.auth, &headers) {
        return err.into_response();
    }

    let draft = match E::prepare_draft(draft) {
        Ok(draft) => draft,
        Err(e) => return store_error(E::KIND, "create record", e.into()).into_response(),
    };

    match state.store.insert(&draft).await {
        Ok(record) => {
            tracing::info!(entity = %E::KIND, id = record.id(), slug = %record.slug(), "Record created");
            (StatusCode::CREATED, Json(record)).into_response()
        }
        Err(e) => store_error(E::KIND, "create record", e).into_response(),
    }
}

/// PUT /api/{collection}/{id} (admin) - full replace
pub async fn update_record<E: Entity>(
    State(state): State<CollectionState<E>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(draft): Json<E::Draft>,
) -> Response {
    if let Err(err) = require_admin(&state.auth, &headers) {
        return err.into_response();
    }

    let draft = match E::prepare_draft(draft) {
        Ok(draft) => draft,
        Err(e) => return store_error(E::KIND, "update record", e.into()).into_response(),
    };

    match state.store.update(id, &draft).await {
        Ok(record) => {
            tracing::info!(entity = %E::KIND, id, "Record updated");
            Json(record).into_response()
        }
        Err(e) => store_error(E::KIND, "update record", e).into_response(),
    }
}

/// DELETE /api/{collection}/{id} (admin)
///
/// Only the row; images are removed through `/api/delete-image`.
pub async fn delete_record<E: Entity>(
    State(state): State<CollectionState<E>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(err) = require_admin(&state.auth, &headers) {
        return err.into_response();
    }

    match state.store.delete(id).await {
        Ok(()) => {
            tracing::info!(entity = %E::KIND, id, "Record deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => store_error(E::KIND, "delete record", e).into_response(),
    }
}
