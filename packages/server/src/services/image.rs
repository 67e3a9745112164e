use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::generator::{ImageRequest, ImageSize, ImageStyle, within};
use common::storage::BoxReader;
use common::{BlobStore, Generator, ObjectKey, SignedUrlIssuer};
use futures::future::try_join_all;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tracing::{info, instrument, warn};

use super::error::GENERAL_REFUSAL;
use super::ownership::require_owner;
use super::{Page, PageRequest, ServiceError};
use crate::entity::image;

pub const IMAGE_CONTENT_TYPE: &str = "image/png";

/// Raw image generation parameters as received from a client.
#[derive(Debug, Clone, Default)]
pub struct ImageParams {
    pub name: Option<String>,
    pub course: Option<String>,
    pub main_ingredient: Option<String>,
    pub dish_type: Option<String>,
    pub style: String,
    pub size: Option<String>,
}

/// One gallery entry with a freshly signed URL.
#[derive(Debug, Clone)]
pub struct GalleryImage {
    pub id: i32,
    pub url: String,
    pub filename: String,
    pub created_at: DateTime<Utc>,
}

/// A stored image opened for download.
pub struct ImageContent {
    pub reader: BoxReader,
    pub filename: String,
    pub content_type: &'static str,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "null")
}

/// Build the food-only image prompt.
pub fn compose_prompt(params: &ImageParams) -> String {
    let mut prompt = format!(
        "You are a helpful assistant that only generates images of food. Do not generate images \
         of anything else. I want an image of a dish with the name: {}.",
        non_blank(&params.name).unwrap_or("any")
    );
    if let Some(course) = non_blank(&params.course) {
        prompt.push_str(&format!(" It is a {course}."));
    }
    if let Some(ingredients) = non_blank(&params.main_ingredient) {
        prompt.push_str(&format!(" The ingredients are {ingredients}."));
    }
    if let Some(dish_type) = non_blank(&params.dish_type) {
        prompt.push_str(&format!(" The type of dish is {dish_type}."));
    }
    prompt
}

/// Parse and validate parameters before anything external is called.
fn image_request(params: &ImageParams) -> Result<ImageRequest, ServiceError> {
    let style: ImageStyle = params.style.parse()?;
    let size = match non_blank(&params.size) {
        Some(size) => size.parse()?,
        None => ImageSize::default(),
    };
    Ok(ImageRequest {
        prompt: compose_prompt(params),
        style,
        size,
    })
}

/// Image generation, per-user gallery and deletion.
#[derive(Clone)]
pub struct ImageService {
    db: DatabaseConnection,
    generator: Arc<dyn Generator>,
    blobs: Arc<dyn BlobStore>,
    signer: Arc<dyn SignedUrlIssuer>,
    timeout: Duration,
    url_ttl: Duration,
    default_page_size: u64,
}

impl ImageService {
    pub fn new(
        db: DatabaseConnection,
        generator: Arc<dyn Generator>,
        blobs: Arc<dyn BlobStore>,
        signer: Arc<dyn SignedUrlIssuer>,
        timeout: Duration,
        url_ttl: Duration,
        default_page_size: u64,
    ) -> Self {
        Self {
            db,
            generator,
            blobs,
            signer,
            timeout,
            url_ttl,
            default_page_size,
        }
    }

    pub fn default_page_size(&self) -> u64 {
        self.default_page_size
    }

    /// Generate an image. Guests get the provider's temporary URL; signed-in
    /// users get the image copied into their gallery and a signed URL to it.
    #[instrument(skip(self, params), fields(style = %params.style))]
    pub async fn generate_and_persist(
        &self,
        user_id: Option<i32>,
        params: &ImageParams,
    ) -> Result<String, ServiceError> {
        let request = image_request(params)?;

        let urls = within(self.timeout, self.generator.generate_image(&request))
            .await
            .map_err(|e| ServiceError::from_generator(e, GENERAL_REFUSAL))?;
        let temp_url = urls
            .into_iter()
            .find(|url| !url.trim().is_empty())
            .ok_or_else(|| ServiceError::InappropriateRequest(GENERAL_REFUSAL.into()))?;

        let Some(user_id) = user_id else {
            return Ok(temp_url);
        };

        let bytes = within(self.timeout, self.generator.fetch_image(&temp_url))
            .await
            .map_err(|e| ServiceError::from_generator(e, GENERAL_REFUSAL))?;

        let key = ObjectKey::user_image(user_id);
        self.blobs.put(&key, &bytes, IMAGE_CONTENT_TYPE).await?;

        let inserted = image::ActiveModel {
            user_id: Set(user_id),
            storage_key: Set(key.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await;

        let record = match inserted {
            Ok(record) => record,
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&key).await {
                    warn!(%key, error = %cleanup, "Failed to remove blob after record insert failed");
                }
                return Err(e.into());
            }
        };
        info!(image_id = record.id, %key, "Image persisted");

        Ok(self.signer.sign(&key, self.url_ttl).await?)
    }

    /// A page of the user's gallery, newest first, each with a fresh URL.
    pub async fn get_page(
        &self,
        user_id: i32,
        request: PageRequest,
    ) -> Result<Page<GalleryImage>, ServiceError> {
        let query = image::Entity::find().filter(image::Column::UserId.eq(user_id));
        let total = query.clone().count(&self.db).await?;
        if request.is_past(total) {
            return Ok(Page::new(Vec::new(), total, request));
        }

        let records = query
            .order_by_desc(image::Column::CreatedAt)
            .order_by_desc(image::Column::Id)
            .offset(request.offset())
            .limit(request.limit())
            .all(&self.db)
            .await?;

        let items = try_join_all(records.into_iter().map(|record| self.gallery_item(record))).await?;
        Ok(Page::new(items, total, request))
    }

    async fn gallery_item(&self, record: image::Model) -> Result<GalleryImage, ServiceError> {
        let key = stored_key(&record)?;
        let url = self.signer.sign(&key, self.url_ttl).await?;
        Ok(GalleryImage {
            id: record.id,
            url,
            filename: key.file_name().to_string(),
            created_at: record.created_at,
        })
    }

    async fn find_owned(&self, image_id: i32, user_id: i32) -> Result<image::Model, ServiceError> {
        let record = image::Entity::find_by_id(image_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Image {image_id} not found")))?;
        require_owner(record.user_id, user_id, ServiceError::AccessDenied)?;
        Ok(record)
    }

    /// Remove the blob, then the record. A failed blob delete keeps the record.
    #[instrument(skip(self))]
    pub async fn delete_for_user(&self, image_id: i32, user_id: i32) -> Result<(), ServiceError> {
        let record = self.find_owned(image_id, user_id).await?;
        let key = stored_key(&record)?;

        let existed = self.blobs.delete(&key).await?;
        if !existed {
            warn!(%key, "Blob already missing; removing record");
        }

        image::Entity::delete_by_id(record.id).exec(&self.db).await?;
        info!(%key, "Image deleted");
        Ok(())
    }

    pub async fn load_content_for_user(
        &self,
        image_id: i32,
        user_id: i32,
    ) -> Result<ImageContent, ServiceError> {
        let record = self.find_owned(image_id, user_id).await?;
        let key = stored_key(&record)?;
        let reader = self.blobs.get_stream(&key).await?;
        Ok(ImageContent {
            reader,
            filename: key.file_name().to_string(),
            content_type: IMAGE_CONTENT_TYPE,
        })
    }
}

fn stored_key(record: &image::Model) -> Result<ObjectKey, ServiceError> {
    ObjectKey::parse(&record.storage_key).map_err(|e| {
        ServiceError::Internal(format!("image {} has a bad storage key: {e}", record.id))
    })
}
