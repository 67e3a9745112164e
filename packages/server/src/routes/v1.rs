use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/recipes", recipe_routes())
        .nest("/me", gallery_routes())
        .nest("/chat", chat_routes())
        .route("/food-images", post(handlers::image::generate_image))
        .route("/blobs/{*key}", get(handlers::blobs::serve_blob))
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/me", get(handlers::auth::me))
}

fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::recipe::create_recipe))
        .route("/download/{id}", get(handlers::recipe::download_recipe))
        .nest("/history", history_routes())
}

fn history_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::history::list_entries).post(handlers::history::save_entry),
        )
        .route("/paged", get(handlers::history::list_entries_paged))
        .route(
            "/{id}",
            get(handlers::history::get_entry).delete(handlers::history::delete_entry),
        )
        .route("/{id}/download", get(handlers::history::download_entry))
}

fn chat_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::chat::list_conversations).post(handlers::chat::chat),
        )
        .route(
            "/{id}",
            get(handlers::chat::get_conversation)
                .patch(handlers::chat::rename_conversation)
                .delete(handlers::chat::delete_conversation),
        )
        .route("/{id}/messages", post(handlers::chat::continue_conversation))
}

fn gallery_routes() -> Router<AppState> {
    Router::new()
        .route("/images", get(handlers::image::list_images))
        .route("/images/{id}", delete(handlers::image::delete_image))
        .route("/images/{id}/download", get(handlers::image::download_image))
}
