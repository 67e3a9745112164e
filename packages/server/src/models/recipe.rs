use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::recipe::RecipeRequest;

/// Request body for recipe generation.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateRecipeRequest {
    /// Ingredients to cook with.
    #[schema(example = "chicken, rice, lime")]
    pub ingredients: String,
    /// Cuisine style. Defaults to "any".
    #[schema(example = "Thai")]
    pub cuisine: Option<String>,
    /// Dietary restrictions, if any.
    #[schema(example = "gluten free")]
    pub dietary_restrictions: Option<String>,
}

impl CreateRecipeRequest {
    pub fn validate(self) -> Result<RecipeRequest, AppError> {
        let ingredients = self.ingredients.trim();
        if ingredients.is_empty() {
            return Err(AppError::Validation("Ingredients must not be empty".into()));
        }
        let cuisine = self
            .cuisine
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "any".into());
        Ok(RecipeRequest {
            ingredients: ingredients.to_string(),
            cuisine,
            dietary_restrictions: self.dietary_restrictions.unwrap_or_default(),
        })
    }
}

/// A generated recipe.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CreateRecipeResponse {
    /// Recipe markdown followed by its download link.
    pub text: String,
    /// ID of the stored recipe file.
    #[schema(example = 7)]
    pub recipe_file_id: i32,
    /// History entry created for signed-in callers.
    #[schema(example = 12)]
    pub history_entry_id: Option<i32>,
}
