use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::image::{GalleryImage, ImageParams};

/// Request body for food image generation.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct FoodImageRequest {
    /// Dish name. Defaults to "any".
    #[schema(example = "Paella")]
    pub name: Option<String>,
    /// `vivid` or `natural` (case-insensitive).
    #[schema(example = "vivid")]
    pub style: String,
    /// `1024x1024` (default), `1792x1024` or `1024x1792`.
    #[schema(example = "1024x1024")]
    pub size: Option<String>,
    #[schema(example = "main course")]
    pub course: Option<String>,
    #[schema(example = "saffron rice")]
    pub main_ingredient: Option<String>,
    #[schema(example = "rice dish")]
    pub dish_type: Option<String>,
}

impl From<FoodImageRequest> for ImageParams {
    fn from(req: FoodImageRequest) -> Self {
        Self {
            name: req.name,
            course: req.course,
            main_ingredient: req.main_ingredient,
            dish_type: req.dish_type,
            style: req.style,
            size: req.size,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct FoodImageResponse {
    /// Signed gallery URL for signed-in callers, provider URL for guests.
    pub url: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct GalleryItem {
    #[schema(example = 3)]
    pub id: i32,
    /// Short-lived signed URL.
    pub url: String,
    #[schema(example = "0b7f2c9e-5f7e-4c1a-9a55-2f0d0e3c4b1a.png")]
    pub filename: String,
    pub created_at: DateTime<Utc>,
}

impl From<GalleryImage> for GalleryItem {
    fn from(image: GalleryImage) -> Self {
        Self {
            id: image.id,
            url: image.url,
            filename: image.filename,
            created_at: image.created_at,
        }
    }
}

/// Signature parameters of a filesystem blob URL.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct BlobQuery {
    /// Unix timestamp after which the URL is invalid.
    pub expires: i64,
    pub signature: String,
}
