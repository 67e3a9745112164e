use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use common::config::{GeneratorProvider, StorageBackend};
use common::generator::{FakeGenerator, OpenAiGenerator, OpenAiSettings};
use common::storage::filesystem::{FilesystemBlobStore, UrlSigning};
use common::storage::s3::{S3BlobStore, S3Settings};
use common::{BlobStore, Generator, SignedUrlIssuer};
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::services::chat::ChatService;
use crate::services::conversation::ConversationService;
use crate::services::history::HistoryService;
use crate::services::image::ImageService;
use crate::services::recipe::RecipeService;

/// Storage collaborators chosen at startup.
#[derive(Clone)]
pub struct Storage {
    pub blobs: Arc<dyn BlobStore>,
    pub signer: Arc<dyn SignedUrlIssuer>,
    /// Set when blobs live on local disk and are served through `/blobs`.
    pub local: Option<Arc<FilesystemBlobStore>>,
}

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub recipes: RecipeService,
    pub history: HistoryService,
    pub images: ImageService,
    pub chat: ChatService,
    pub conversations: ConversationService,
    pub local_blobs: Option<Arc<FilesystemBlobStore>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: DatabaseConnection,
        generator: Arc<dyn Generator>,
        storage: Storage,
    ) -> Self {
        let timeout = Duration::from_secs(config.generator.timeout_secs);
        tracing::info!(
            provider = generator.provider_name(),
            timeout_secs = config.generator.timeout_secs,
            "Generator ready"
        );
        let public_base_url = config.app.public_base_url.clone();

        let recipes = RecipeService::new(
            db.clone(),
            generator.clone(),
            timeout,
            public_base_url.clone(),
        );
        let history = HistoryService::new(db.clone(), config.pagination.history_page_size);
        let images = ImageService::new(
            db.clone(),
            generator.clone(),
            storage.blobs,
            storage.signer,
            timeout,
            Duration::from_secs(config.storage.signed_url_ttl_secs),
            config.pagination.gallery_page_size,
        );
        let conversations = ConversationService::new(db.clone());
        let chat = ChatService::new(
            generator,
            recipes.clone(),
            conversations.clone(),
            timeout,
            &public_base_url,
        );

        Self {
            db,
            config: Arc::new(config),
            recipes,
            history,
            images,
            chat,
            conversations,
            local_blobs: storage.local,
        }
    }

    /// Wire up the configured generator and storage backend.
    pub async fn from_config(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<Self> {
        let generator = build_generator(&config)?;
        let storage = build_storage(&config).await?;
        Ok(Self::new(config, db, generator, storage))
    }
}

fn build_generator(config: &AppConfig) -> anyhow::Result<Arc<dyn Generator>> {
    let cfg = &config.generator;
    Ok(match cfg.provider {
        GeneratorProvider::Openai => {
            if cfg.api_key.is_empty() {
                bail!("generator.api_key must be set for the openai provider");
            }
            Arc::new(OpenAiGenerator::new(OpenAiSettings {
                base_url: cfg.base_url.clone(),
                api_key: cfg.api_key.clone(),
                text_model: cfg.text_model.clone(),
                image_model: cfg.image_model.clone(),
            }))
        }
        GeneratorProvider::Fake => {
            tracing::warn!("Using the fake generator; responses are canned");
            Arc::new(FakeGenerator::default())
        }
    })
}

async fn build_storage(config: &AppConfig) -> anyhow::Result<Storage> {
    let cfg = &config.storage;
    match cfg.backend {
        StorageBackend::Filesystem => {
            let store = FilesystemBlobStore::new(PathBuf::from(&cfg.root), cfg.max_blob_size)
                .await
                .context("failed to initialise filesystem blob store")?
                .with_signing(UrlSigning {
                    base_url: format!(
                        "{}/api/v1/blobs",
                        config.app.public_base_url.trim_end_matches('/')
                    ),
                    secret: config.auth.jwt_secret.clone(),
                });
            let store = Arc::new(store);
            Ok(Storage {
                blobs: store.clone(),
                signer: store.clone(),
                local: Some(store),
            })
        }
        StorageBackend::S3 => {
            let store = S3BlobStore::new(
                &S3Settings {
                    bucket: cfg.bucket.clone(),
                    region: cfg.region.clone(),
                    endpoint: cfg.endpoint.clone(),
                    access_key: cfg.access_key.clone(),
                    secret_key: cfg.secret_key.clone(),
                },
                cfg.max_blob_size,
            )
            .context("failed to initialise S3 blob store")?;
            let store = Arc::new(store);
            Ok(Storage {
                blobs: store.clone(),
                signer: store,
                local: None,
            })
        }
    }
}
