//! HTTP routes for the chat server

pub mod chat;

use axum::{
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build the chat routes
pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(chat::index))
        .route("/get", post(chat::chat))
}
