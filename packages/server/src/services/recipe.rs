use std::sync::Arc;
use std::time::Duration;

use common::Generator;
use common::generator::within;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::ServiceError;
use super::error::RECIPE_REFUSAL;
use super::ownership;
use super::recipe_file::RecipeFileStore;
use crate::entity::recipe_file;
use crate::utils::recipe::{
    contains_refusal, download_reference, extract_json_envelope, looks_like_recipe,
    strip_download_suffix, with_download,
};

/// What a recipe request asks for.
#[derive(Debug, Clone)]
pub struct RecipeRequest {
    pub ingredients: String,
    pub cuisine: String,
    pub dietary_restrictions: String,
}

/// A freshly generated and stored recipe.
#[derive(Debug, Clone)]
pub struct CreateRecipeResult {
    pub recipe_markdown: String,
    pub recipe_file_id: i32,
    pub download_reference: String,
}

impl CreateRecipeResult {
    /// Markdown followed by the download link, as returned to clients.
    pub fn full_text(&self) -> String {
        with_download(&self.recipe_markdown, &self.download_reference)
    }

    /// Text suitable for a history snapshot.
    pub fn content_without_download(&self) -> String {
        strip_download_suffix(&self.full_text()).trim().to_string()
    }
}

#[derive(Debug, Deserialize)]
struct RecipeEnvelope {
    recipe_markdown: String,
}

fn recipe_prompt(request: &RecipeRequest) -> String {
    format!(
        r#"You are a helpful and professional chef assistant.
Create a recipe using the following information:

**Ingredients:** {ingredients}
**Cuisine:** {cuisine}
**Dietary restrictions:** {dietary}

Respond **only in valid JSON** with these fields:
- "title": the recipe title
- "recipe_markdown": the full recipe formatted exactly like this example:
  ### Lemon Garlic Butter Baked Fish

  #### Ingredients:
  - 4 fish fillets (such as cod, tilapia, or haddock)
  - 3 tablespoons unsalted butter, melted
  - 3 cloves garlic, minced
  - 1 lemon (zested and juiced)
  - 1 teaspoon dried parsley
  - Salt and pepper to taste

  #### Instructions:
  1. Preheat oven to 400°F (200°C)...
  2. Prepare sauce...
  3. Bake...

Make sure the JSON is valid, with no extra commentary, greetings, or text outside the JSON.
If any ingredients are nonsensical, point it out politely and ask the user for clarification.
"#,
        ingredients = request.ingredients,
        cuisine = request.cuisine,
        dietary = request.dietary_restrictions,
    )
}

/// Generates recipes and stores them as downloadable files.
#[derive(Clone)]
pub struct RecipeService {
    db: DatabaseConnection,
    generator: Arc<dyn Generator>,
    timeout: Duration,
    public_base_url: String,
}

impl RecipeService {
    pub fn new(
        db: DatabaseConnection,
        generator: Arc<dyn Generator>,
        timeout: Duration,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            db,
            generator,
            timeout,
            public_base_url: public_base_url.into(),
        }
    }

    /// Generate a recipe, store it unowned and return it with its download link.
    #[instrument(skip(self, request), fields(cuisine = %request.cuisine))]
    pub async fn create_recipe(
        &self,
        request: &RecipeRequest,
    ) -> Result<CreateRecipeResult, ServiceError> {
        let prompt = recipe_prompt(request);
        let raw = within(self.timeout, self.generator.generate_text(&prompt))
            .await
            .map_err(|e| ServiceError::from_generator(e, RECIPE_REFUSAL))?;

        if raw.trim().is_empty() {
            return Err(ServiceError::InappropriateRequest(RECIPE_REFUSAL.into()));
        }

        let envelope: RecipeEnvelope = match serde_json::from_str(extract_json_envelope(&raw)) {
            Ok(envelope) => envelope,
            Err(_) if contains_refusal(&raw) => {
                debug!("Generator answered with a plain-text refusal");
                return Err(ServiceError::InappropriateRequest(RECIPE_REFUSAL.into()));
            }
            Err(e) => {
                return Err(ServiceError::Internal(format!(
                    "Failed to parse recipe JSON: {e}"
                )));
            }
        };

        if !looks_like_recipe(&envelope.recipe_markdown) {
            return Err(ServiceError::InappropriateRequest(RECIPE_REFUSAL.into()));
        }

        let file = RecipeFileStore::new(&self.db)
            .create(&envelope.recipe_markdown)
            .await?;
        info!(recipe_file_id = file.id, "Stored generated recipe");

        Ok(CreateRecipeResult {
            download_reference: self.download_reference(file.id),
            recipe_markdown: file.content,
            recipe_file_id: file.id,
        })
    }

    /// Store already-generated markdown and return its download link.
    #[instrument(skip(self, text))]
    pub async fn create_downloadable_recipe(&self, text: &str) -> Result<String, ServiceError> {
        let file = RecipeFileStore::new(&self.db).create(text).await?;
        info!(recipe_file_id = file.id, "Stored chat recipe");
        Ok(self.download_reference(file.id))
    }

    pub async fn get_recipe_file(&self, id: i32) -> Result<recipe_file::Model, ServiceError> {
        RecipeFileStore::new(&self.db)
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Recipe file {id} not found")))
    }

    /// Fetch a file for download by `caller` (`None` for anonymous requests).
    pub async fn download_recipe_file(
        &self,
        id: i32,
        caller: Option<i32>,
    ) -> Result<recipe_file::Model, ServiceError> {
        let file = self.get_recipe_file(id).await?;
        if !ownership::can_read_artifact(file.owner_id, caller) {
            return Err(ServiceError::AccessDenied);
        }
        Ok(file)
    }

    pub fn download_reference(&self, recipe_file_id: i32) -> String {
        download_reference(&self.public_base_url, recipe_file_id)
    }
}
