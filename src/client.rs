//! `ContentStore` over this service's REST collection API, so an editor can
//! run as a remote admin client.

use std::fmt::Display;
use std::marker::PhantomData;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};

use crate::content::Entity;
use crate::db::ContentStore;
use crate::error::StoreError;
use crate::routes::collections::ListResponse;
use crate::routes::ErrorResponse;

/// Status and the most useful message of a failed response.
pub(crate) async fn read_rejection(response: Response) -> (u16, String) {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(body) => match body.message {
            Some(message) => format!("{}: {}", body.error, message),
            None => body.error,
        },
        Err(_) => text,
    };
    (status, message)
}

async fn ensure_success(response: Response) -> Result<Response, StoreError> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::NOT_FOUND => Err(StoreError::NotFound),
        StatusCode::SERVICE_UNAVAILABLE => Err(StoreError::Unavailable),
        _ => {
            let (status, message) = read_rejection(response).await;
            Err(StoreError::Rejected { status, message })
        }
    }
}

pub struct HttpContentStore<E> {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> HttpContentStore<E> {
    pub fn new(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            client,
            _entity: PhantomData,
        }
    }

    /// Session token sent with writes.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn collection_url(&self) -> String {
        format!("{}/api/{}", self.base_url, E::KIND.route())
    }

    fn record_url(&self, key: impl Display) -> String {
        format!("{}/{}", self.collection_url(), key)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn fetch_one(&self, url: String) -> Result<Option<E>, StoreError> {
        let response = self.client.get(url).send().await?;
        match ensure_success(response).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<E: Entity> ContentStore<E> for HttpContentStore<E> {
    async fn list(&self, filter: &E::Filter) -> Result<Vec<E>, StoreError> {
        let response = self
            .client
            .get(self.collection_url())
            .query(filter)
            .send()
            .await?;
        let body: ListResponse<E> = ensure_success(response).await?.json().await?;
        Ok(body.items)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<E>, StoreError> {
        self.fetch_one(self.record_url(id)).await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<E>, StoreError> {
        self.fetch_one(self.record_url(slug)).await
    }

    async fn insert(&self, draft: &E::Draft) -> Result<E, StoreError> {
        let request = self.client.post(self.collection_url()).json(draft);
        let response = self.authorized(request).send().await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn update(&self, id: i64, draft: &E::Draft) -> Result<E, StoreError> {
        let request = self.client.put(self.record_url(id)).json(draft);
        let response = self.authorized(request).send().await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let request = self.client.delete(self.record_url(id));
        let response = self.authorized(request).send().await?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetStore, HttpAssetStore, LocalFile};
    use crate::content::{BlogPost, BlogPostForm, Media, Property, PropertyFilter, PropertyForm};
    use crate::editor::{DeletePolicy, EditorConfig, EntityEditor};
    use crate::error::{AssetError, EditorError, WriteOp};
    use crate::testing::{admin_token, Always, Fixture};
    use std::sync::Arc;

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[tokio::test]
    async fn test_round_trip_through_the_api() {
        let fixture = Fixture::new();
        let base = fixture.spawn().await;
        let store = HttpContentStore::<BlogPost>::new(&base, reqwest::Client::new())
            .with_token(admin_token());

        let form = BlogPostForm {
            title: "Remote Post".to_string(),
            ..Default::default()
        };
        let created = store
            .insert(&BlogPost::assemble(&form, Media::default(), None))
            .await
            .unwrap();
        assert_eq!(created.slug, "remote-post");

        let by_slug = store.find_by_slug("remote-post").await.unwrap();
        assert_eq!(by_slug.as_ref().map(|p| p.id), Some(created.id));
        assert_eq!(store.find_by_id(9999).await.unwrap(), None);

        store.delete(created.id).await.unwrap();
        assert!(matches!(store.delete(created.id).await, Err(StoreError::NotFound)));
        assert!(store.list(&Default::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_writes_without_token_are_rejected() {
        let fixture = Fixture::new();
        let base = fixture.spawn().await;
        let store = HttpContentStore::<BlogPost>::new(base, reqwest::Client::new());
        let form = BlogPostForm {
            title: "Anonymous".to_string(),
            ..Default::default()
        };

        let err = store
            .insert(&BlogPost::assemble(&form, Media::default(), None))
            .await
            .unwrap_err();

        match err {
            StoreError::Rejected { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Authorization required");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_list_sends_filter() {
        let fixture = Fixture::new();
        for (title, kind) in [("Villa", "villa"), ("Flat", "apartment")] {
            let form = PropertyForm {
                title: title.to_string(),
                property_type: kind.to_string(),
                ..Default::default()
            };
            fixture
                .properties
                .seed(Property::assemble(&form, Media::default(), None));
        }
        let base = fixture.spawn().await;
        let store = HttpContentStore::<Property>::new(base, reqwest::Client::new());

        let filter = PropertyFilter {
            property_type: Some("apartment".to_string()),
        };
        let items = store.list(&filter).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Flat");
    }

    #[tokio::test]
    async fn test_asset_client_upload_and_delete() {
        let fixture = Fixture::new();
        let base = fixture.spawn().await;
        let assets = HttpAssetStore::new(&base, reqwest::Client::new()).with_token(admin_token());

        let image = assets
            .upload(&LocalFile::new("hall.png", PNG.to_vec()))
            .await
            .unwrap();
        assert_eq!(image.external_id, "img-1");

        let outcomes = assets.delete(std::slice::from_ref(&image)).await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_success());
        assert_eq!(fixture.assets.deleted(), vec![image]);

        let rejected = assets
            .upload(&LocalFile::new("notes.txt", b"hello".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(rejected, AssetError::Rejected { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_remote_editor_end_to_end() {
        let fixture = Fixture::new();
        let base = fixture.spawn().await;
        let token = admin_token();
        let client = reqwest::Client::new();
        let editor = EntityEditor::<Property>::new(
            Arc::new(HttpContentStore::<Property>::new(&base, client.clone()).with_token(&token)),
            Arc::new(HttpAssetStore::new(&base, client).with_token(&token)),
            Arc::new(Always(true)),
            EditorConfig {
                delete_policy: DeletePolicy::CleanupFirst,
                ..Default::default()
            },
        );

        editor.update_form(|f| {
            f.title = "Garden House".to_string();
            f.features = "Garden, Garage".to_string();
        });
        editor.select_main_image(LocalFile::new("front.png", PNG.to_vec()));
        editor.add_gallery_files([LocalFile::new("room.png", PNG.to_vec())]);
        let created = editor.submit().await.unwrap();

        assert_eq!(created.slug, "garden-house");
        assert_eq!(created.features, vec!["Garden", "Garage"]);
        assert!(created.main_image.is_some());
        assert_eq!(created.gallery.len(), 1);
        assert_eq!(editor.items().len(), 1);

        editor.delete(&created).await.unwrap();
        assert_eq!(fixture.assets.deleted().len(), 2);
        assert!(fixture.properties.rows().is_empty());

        fixture.properties.fail_writes(true);
        editor.update_form(|f| f.title = "Second".to_string());
        let err = editor.submit().await.unwrap_err();
        assert!(matches!(
            err,
            EditorError::BackendWriteFailed {
                op: WriteOp::Insert,
                ..
            }
        ));
    }
}
