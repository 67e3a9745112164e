pub mod config;
pub mod generator;
pub mod storage;

pub use generator::{Generator, GeneratorError, ImageRequest, ImageSize, ImageStyle};
pub use storage::{BlobStore, ObjectKey, SignedUrlIssuer, StorageError};
