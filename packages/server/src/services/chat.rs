use std::sync::Arc;
use std::time::Duration;

use common::Generator;
use common::generator::within;
use tracing::{debug, instrument};

use super::ServiceError;
use super::conversation::{ConversationService, FALLBACK_TITLE, normalize_title};
use super::error::GENERAL_REFUSAL;
use super::recipe::RecipeService;
use crate::utils::recipe::{looks_like_recipe, with_download};

fn system_prompt(public_base_url: &str) -> String {
    format!(
        "You are a helpful assistant that only answers questions about food, recipes, ingredients, \
         and cooking. If the user asks to download a recipe, always use the backend API base URL: \
         [Download Recipe]({}/api/v1/recipes/download/{{recipeId}}). Never use the frontend domain. \
         If the question is not about food, politely respond: 'Sorry, I can only answer questions \
         about food.'",
        public_base_url.trim_end_matches('/')
    )
}

fn title_prompt(message: &str) -> String {
    format!(
        "Summarize the user's request in a title that's between 5 and 30 characters long.\nUser: {message}"
    )
}

/// The assistant's answer and, for signed-in callers, the thread it was stored in.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub conversation_id: Option<i32>,
    pub reply: String,
}

/// Food-only chat. Guests get single replies; signed-in users get stored threads.
#[derive(Clone)]
pub struct ChatService {
    generator: Arc<dyn Generator>,
    recipes: RecipeService,
    conversations: ConversationService,
    timeout: Duration,
    system_prompt: String,
}

fn require_message(message: &str) -> Result<(), ServiceError> {
    if message.trim().is_empty() {
        return Err(ServiceError::InvalidInput("Message must not be empty".into()));
    }
    Ok(())
}

impl ChatService {
    pub fn new(
        generator: Arc<dyn Generator>,
        recipes: RecipeService,
        conversations: ConversationService,
        timeout: Duration,
        public_base_url: &str,
    ) -> Self {
        Self {
            generator,
            recipes,
            conversations,
            timeout,
            system_prompt: system_prompt(public_base_url),
        }
    }

    /// Answer `message`, opening a new conversation when `user_id` is known.
    #[instrument(skip(self, message))]
    pub async fn start(&self, user_id: Option<i32>, message: &str) -> Result<ChatTurn, ServiceError> {
        let reply = self.reply(message).await?;

        let Some(user_id) = user_id else {
            return Ok(ChatTurn {
                conversation_id: None,
                reply,
            });
        };

        let title = self.title_for(message).await;
        let conversation = self
            .conversations
            .start(user_id, message, &title, &reply)
            .await?;
        Ok(ChatTurn {
            conversation_id: Some(conversation.id),
            reply,
        })
    }

    /// Answer `message` inside an existing conversation owned by `user_id`.
    #[instrument(skip(self, message))]
    pub async fn continue_conversation(
        &self,
        user_id: i32,
        conversation_id: i32,
        message: &str,
    ) -> Result<ChatTurn, ServiceError> {
        require_message(message)?;
        self.conversations
            .find_for_user(user_id, conversation_id)
            .await?;

        let reply = self.reply(message).await?;
        self.conversations
            .append(user_id, conversation_id, message, &reply)
            .await?;
        Ok(ChatTurn {
            conversation_id: Some(conversation_id),
            reply,
        })
    }

    /// A short generated title, or [`FALLBACK_TITLE`] when generation fails.
    async fn title_for(&self, message: &str) -> String {
        match within(self.timeout, self.generator.generate_text(&title_prompt(message))).await {
            Ok(raw) => normalize_title(&raw).unwrap_or_else(|| FALLBACK_TITLE.to_string()),
            Err(e) => {
                debug!(error = %e, "Title generation failed");
                FALLBACK_TITLE.to_string()
            }
        }
    }

    /// Answer one message. Recipe-shaped replies are stored and get a download link.
    #[instrument(skip(self, message))]
    async fn reply(&self, message: &str) -> Result<String, ServiceError> {
        require_message(message)?;

        let prompt = format!("{}\nUser: {message}", self.system_prompt);
        let reply = within(self.timeout, self.generator.generate_text(&prompt))
            .await
            .map_err(|e| ServiceError::from_generator(e, GENERAL_REFUSAL))?;

        if !looks_like_recipe(&reply) {
            return Ok(reply);
        }

        let reference = self.recipes.create_downloadable_recipe(&reply).await?;
        Ok(with_download(&reply, &reference))
    }
}
