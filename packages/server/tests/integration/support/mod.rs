use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::config::{GeneratorAppConfig, GeneratorProvider, StorageAppConfig};
use common::generator::{FakeGenerator, FakeOutcome};
use common::storage::BoxReader;
use common::storage::filesystem::{FilesystemBlobStore, UrlSigning};
use common::{BlobStore, ObjectKey, StorageError};
use reqwest::Client;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::{Value, json};
use tempfile::TempDir;

use sous_server::config::{
    AppConfig, AuthConfig, CorsConfig, DatabaseConfig, PaginationConfig, PublicConfig,
    ServerConfig,
};
use sous_server::state::{AppState, Storage};

pub const PASSWORD: &str = "securepass";

pub mod routes {
    pub const REGISTER: &str = "/api/v1/auth/register";
    pub const LOGIN: &str = "/api/v1/auth/login";
    pub const ME: &str = "/api/v1/auth/me";
    pub const RECIPES: &str = "/api/v1/recipes";
    pub const HISTORY: &str = "/api/v1/recipes/history";
    pub const HISTORY_PAGED: &str = "/api/v1/recipes/history/paged";
    pub const CHAT: &str = "/api/v1/chat";
    pub const FOOD_IMAGES: &str = "/api/v1/food-images";
    pub const MY_IMAGES: &str = "/api/v1/me/images";

    pub fn recipe_download(id: i32) -> String {
        format!("/api/v1/recipes/download/{id}")
    }

    pub fn history_entry(id: i32) -> String {
        format!("/api/v1/recipes/history/{id}")
    }

    pub fn history_download(id: i32) -> String {
        format!("/api/v1/recipes/history/{id}/download")
    }

    pub fn my_image(id: i32) -> String {
        format!("/api/v1/me/images/{id}")
    }

    pub fn conversation(id: i32) -> String {
        format!("/api/v1/chat/{id}")
    }

    pub fn conversation_messages(id: i32) -> String {
        format!("/api/v1/chat/{id}/messages")
    }

    pub fn my_image_download(id: i32) -> String {
        format!("/api/v1/me/images/{id}/download")
    }
}

/// Filesystem store whose deletes and uploads can be made to fail on demand.
pub struct FlakyBlobStore {
    inner: Arc<FilesystemBlobStore>,
    fail_deletes: AtomicBool,
    time_out_uploads: AtomicBool,
}

impl FlakyBlobStore {
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Uploads fail the way an unreachable object store does.
    pub fn time_out_uploads(&self, fail: bool) {
        self.time_out_uploads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for FlakyBlobStore {
    async fn put(
        &self,
        key: &ObjectKey,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        if self.time_out_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("injected upload timeout".into()));
        }
        self.inner.put(key, data, content_type).await
    }

    async fn get_stream(&self, key: &ObjectKey) -> Result<BoxReader, StorageError> {
        self.inner.get_stream(key).await
    }

    async fn delete(&self, key: &ObjectKey) -> Result<bool, StorageError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("injected delete failure".into()));
        }
        self.inner.delete(key).await
    }
}

/// A running test server backed by in-memory SQLite, a scripted generator
/// and a temporary blob directory.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub state: AppState,
    pub generator: Arc<FakeGenerator>,
    pub blobs: Arc<FlakyBlobStore>,
    _blob_dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
}

/// Generator reply for a well-formed recipe titled `title`.
pub fn recipe_json(title: &str) -> String {
    json!({
        "title": title,
        "recipe_markdown": recipe_markdown(title),
    })
    .to_string()
}

pub fn recipe_markdown(title: &str) -> String {
    format!(
        "### {title}\n\n#### Ingredients:\n- 2 eggs\n- 1 tomato\n\n#### Instructions:\n1. Whisk the eggs.\n2. Cook with the tomato."
    )
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(FakeGenerator::new()).await
    }

    pub async fn spawn_with(generator: FakeGenerator) -> Self {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opts)
            .await
            .expect("Failed to open in-memory database");
        sous_server::database::sync_schema(&db)
            .await
            .expect("Failed to create schema");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{addr}");

        let app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
            },
            auth: AuthConfig {
                jwt_secret: "test-secret-for-integration-tests".to_string(),
                token_ttl_hours: 1,
            },
            app: PublicConfig {
                public_base_url: base_url.clone(),
            },
            generator: GeneratorAppConfig {
                provider: GeneratorProvider::Fake,
                timeout_secs: 1,
                ..Default::default()
            },
            storage: StorageAppConfig::default(),
            pagination: PaginationConfig::default(),
        };

        let blob_dir = tempfile::tempdir().expect("Failed to create blob dir");
        let local = Arc::new(
            FilesystemBlobStore::new(blob_dir.path().to_path_buf(), 1024 * 1024)
                .await
                .expect("Failed to create blob store")
                .with_signing(UrlSigning {
                    base_url: format!("{base_url}/api/v1/blobs"),
                    secret: app_config.auth.jwt_secret.clone(),
                }),
        );
        let blobs = Arc::new(FlakyBlobStore {
            inner: local.clone(),
            fail_deletes: AtomicBool::new(false),
            time_out_uploads: AtomicBool::new(false),
        });

        let generator = Arc::new(generator);
        let state = AppState::new(
            app_config,
            db.clone(),
            generator.clone(),
            Storage {
                blobs: blobs.clone(),
                signer: local.clone(),
                local: Some(local),
            },
        );

        let app = sous_server::build_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            state,
            generator,
            blobs,
            _blob_dir: blob_dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn patch_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH request");

        TestResponse::from_response(res).await
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    /// GET an absolute URL, such as a signed blob URL.
    pub async fn get_absolute(&self, url: &str) -> reqwest::Response {
        self.client
            .get(url)
            .send()
            .await
            .expect("Failed to send GET request")
    }

    pub async fn delete_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    /// Register a user and log in, returning the auth token.
    pub async fn create_authenticated_user(&self, email: &str) -> String {
        let body = json!({
            "email": email,
            "password": PASSWORD,
        });

        let reg = self.post_without_token(routes::REGISTER, &body).await;
        assert_eq!(reg.status, 201, "Registration failed: {}", reg.text);

        let res = self.post_without_token(routes::LOGIN, &body).await;
        assert_eq!(res.status, 200, "Login failed: {}", res.text);

        res.body["token"]
            .as_str()
            .expect("Login response should contain a token")
            .to_string()
    }

    /// Id of the user behind `token`.
    pub async fn user_id(&self, token: &str) -> i32 {
        let res = self.get_with_token(routes::ME, token).await;
        assert_eq!(res.status, 200, "me failed: {}", res.text);
        res.id()
    }

    /// Generate a recipe as a guest and return its recipe file id.
    pub async fn create_guest_recipe(&self, title: &str) -> i32 {
        self.generator
            .push_text(FakeOutcome::Reply(recipe_json(title)));
        let res = self
            .post_without_token(routes::RECIPES, &json!({"ingredients": "eggs, tomato"}))
            .await;
        assert_eq!(res.status, 200, "create recipe failed: {}", res.text);
        res.body["recipe_file_id"].as_i64().unwrap() as i32
    }

    /// Save a history entry via the API and return its `id`.
    pub async fn save_history(
        &self,
        token: &str,
        title: &str,
        recipe_file_id: Option<i32>,
    ) -> i32 {
        let res = self
            .post_with_token(
                routes::HISTORY,
                &json!({
                    "title": title,
                    "content": recipe_markdown(title),
                    "recipe_file_id": recipe_file_id,
                }),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "save history failed: {}", res.text);
        res.id()
    }

    /// Generate a gallery image for the user behind `token`.
    pub async fn generate_image(&self, token: &str) -> TestResponse {
        let res = self
            .post_with_token(
                routes::FOOD_IMAGES,
                &json!({"name": "Paella", "style": "vivid"}),
                token,
            )
            .await;
        assert_eq!(res.status, 200, "generate image failed: {}", res.text);
        res
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let header = |name: &str| {
            res.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header("content-type");
        let content_disposition = header("content-disposition");
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            text,
            body,
            content_type,
            content_disposition,
        }
    }

    pub fn conversation_id(&self) -> i32 {
        self.body["conversation_id"]
            .as_i64()
            .expect("response body should contain 'conversation_id'") as i32
    }

    pub fn id(&self) -> i32 {
        self.body["id"]
            .as_i64()
            .expect("response body should contain 'id'") as i32
    }
}
