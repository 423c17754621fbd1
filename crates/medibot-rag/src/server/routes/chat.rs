//! Chat page and question endpoint

use axum::{extract::State, response::Html, Form};
use serde::Deserialize;
use std::time::Instant;

use crate::error::Result;
use crate::server::state::AppState;

const CHAT_PAGE: &str = include_str!("../../../templates/chat.html");

/// Form body posted by the chat page
#[derive(Debug, Deserialize)]
pub struct ChatForm {
    /// The user's question
    pub msg: String,
}

/// GET / - chat UI
pub async fn index() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

/// POST /get - answer one question as plain text
pub async fn chat(State(state): State<AppState>, Form(form): Form<ChatForm>) -> Result<String> {
    let start = Instant::now();
    tracing::info!("User: {}", form.msg);

    let answer = state.chain().answer(&form.msg).await?;

    tracing::info!("Response ({} ms): {}", start.elapsed().as_millis(), answer);
    Ok(answer)
}
