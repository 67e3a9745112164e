use serde::Deserialize;

/// Which generation backend to talk to.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorProvider {
    #[default]
    Openai,
    Fake,
}

/// App-level generator configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct GeneratorAppConfig {
    /// Default: openai.
    #[serde(default)]
    pub provider: GeneratorProvider,
    /// Default: "https://api.openai.com/v1".
    #[serde(default = "default_generator_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    /// Default: "gpt-4o-mini".
    #[serde(default = "default_text_model")]
    pub text_model: String,
    /// Default: "dall-e-3".
    #[serde(default = "default_image_model")]
    pub image_model: String,
    /// Upper bound on a single generator call, in seconds. Default: 60.
    #[serde(default = "default_generator_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_generator_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_text_model() -> String {
    "gpt-4o-mini".into()
}
fn default_image_model() -> String {
    "dall-e-3".into()
}
fn default_generator_timeout_secs() -> u64 {
    60
}

impl Default for GeneratorAppConfig {
    fn default() -> Self {
        Self {
            provider: GeneratorProvider::default(),
            base_url: default_generator_base_url(),
            api_key: String::new(),
            text_model: default_text_model(),
            image_model: default_image_model(),
            timeout_secs: default_generator_timeout_secs(),
        }
    }
}

/// Where blobs are kept.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Filesystem,
    S3,
}

/// App-level blob storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageAppConfig {
    /// Default: filesystem.
    #[serde(default)]
    pub backend: StorageBackend,
    /// Filesystem root. Default: "./data/blobs".
    #[serde(default = "default_storage_root")]
    pub root: String,
    #[serde(default)]
    pub bucket: String,
    /// Default: "us-east-1".
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    /// Lifetime of issued download URLs, in seconds. Default: 900.
    #[serde(default = "default_signed_url_ttl_secs")]
    pub signed_url_ttl_secs: u64,
    /// Largest object accepted by `put`, in bytes. Default: 20 MiB.
    #[serde(default = "default_max_blob_size")]
    pub max_blob_size: u64,
}

fn default_storage_root() -> String {
    "./data/blobs".into()
}
fn default_region() -> String {
    "us-east-1".into()
}
fn default_signed_url_ttl_secs() -> u64 {
    900
}
fn default_max_blob_size() -> u64 {
    20 * 1024 * 1024
}

impl Default for StorageAppConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            root: default_storage_root(),
            bucket: String::new(),
            region: default_region(),
            endpoint: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            signed_url_ttl_secs: default_signed_url_ttl_secs(),
            max_blob_size: default_max_blob_size(),
        }
    }
}
