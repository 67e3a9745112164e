pub mod conversation;
pub mod history_entry;
pub mod image;
pub mod message;
pub mod recipe_file;
pub mod user;
