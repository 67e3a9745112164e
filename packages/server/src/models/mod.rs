pub mod auth;
pub mod chat;
pub mod history;
pub mod image;
pub mod recipe;
pub mod shared;
