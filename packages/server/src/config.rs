use common::config::{GeneratorAppConfig, StorageAppConfig};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Token lifetime. Default: 168 (7 days).
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

fn default_token_ttl_hours() -> i64 {
    168
}

/// Public-facing settings.
#[derive(Debug, Deserialize, Clone)]
pub struct PublicConfig {
    /// Base URL clients use to reach this server; recipe download links are built from it.
    pub public_base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaginationConfig {
    /// Default: 10.
    #[serde(default = "default_history_page_size")]
    pub history_page_size: u64,
    /// Default: 18.
    #[serde(default = "default_gallery_page_size")]
    pub gallery_page_size: u64,
}

fn default_history_page_size() -> u64 {
    10
}
fn default_gallery_page_size() -> u64 {
    18
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            history_page_size: default_history_page_size(),
            gallery_page_size: default_gallery_page_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub app: PublicConfig,
    #[serde(default)]
    pub generator: GeneratorAppConfig,
    #[serde(default)]
    pub storage: StorageAppConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("app.public_base_url", "http://localhost:3000")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., SOUS__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("SOUS").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
