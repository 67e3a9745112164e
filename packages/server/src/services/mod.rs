//! Generated-content lifecycle: recipe artifacts, history, images and chat threads.

pub mod chat;
pub mod conversation;
pub mod error;
pub mod history;
pub mod image;
pub mod message;
pub mod ownership;
pub mod pagination;
pub mod recipe;
pub mod recipe_file;

pub use error::ServiceError;
pub use pagination::{Page, PageRequest};
