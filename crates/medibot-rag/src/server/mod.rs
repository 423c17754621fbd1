//! HTTP server for the chatbot

pub mod routes;
pub mod state;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::RagConfig;
use crate::error::{Error, Result};
use state::AppState;

/// Chat HTTP server
pub struct RagServer {
    config: RagConfig,
    state: AppState,
}

impl RagServer {
    /// Create a server around prepared state
    pub fn new(state: AppState) -> Self {
        Self {
            config: state.config().clone(),
            state,
        }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let router = Router::new()
            .route("/health", get(health_check))
            .merge(routes::chat_routes())
            .with_state(self.state.clone())
            // Middleware layers (order matters - applied bottom to top)
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new());

        if self.config.server.enable_cors {
            router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        } else {
            router
        }
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::config(format!("Invalid address: {}", e)))?;

        let router = self.build_router();

        tracing::info!("Starting chat server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::config(format!("Failed to bind {}: {}", addr, e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{EmbeddingProvider, LocalIndex, VectorIndex};
    use crate::testing::{EchoLlm, HashEmbedder};
    use crate::types::{IndexRecord, IndexSpec, Metadata};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    const FRACTURE: &str = "A fracture is a break in a bone.";

    async fn seeded_index(embedder: &HashEmbedder, config: &RagConfig) -> Arc<LocalIndex> {
        let index = LocalIndex::in_memory();
        index
            .create_index(&IndexSpec::cosine(
                &config.vector_db.index_name,
                embedder.dimensions(),
                embedder.model_id(),
            ))
            .await
            .unwrap();

        let texts = vec![
            FRACTURE.to_string(),
            "The heart has four chambers.".to_string(),
        ];
        let vectors = embedder.embed_batch(&texts).await.unwrap();
        let records: Vec<IndexRecord> = texts
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (text, values))| IndexRecord {
                id: format!("r{}", i),
                text,
                metadata: Metadata::new(),
                values,
            })
            .collect();
        index.upsert(&records).await.unwrap();
        Arc::new(index)
    }

    async fn router_with(llm: Arc<EchoLlm>) -> Router {
        let config = RagConfig::default();
        let embedder = Arc::new(HashEmbedder::new(128));
        let index = seeded_index(&embedder, &config).await;
        let state = AppState::new(config, embedder, index, llm).await.unwrap();
        RagServer::new(state).build_router()
    }

    fn ask(msg: &str) -> Request<Body> {
        let body = format!("msg={}", msg.replace(' ', "+").replace('?', "%3F"));
        Request::builder()
            .method("POST")
            .uri("/get")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let router = router_with(Arc::new(EchoLlm::new())).await;
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_chat_page() {
        let router = router_with(Arc::new(EchoLlm::new())).await;
        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/html"));
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("/get"));
    }

    #[tokio::test]
    async fn test_fracture_question_answered_from_context() {
        let llm = Arc::new(EchoLlm::new());
        let router = router_with(llm.clone()).await;

        let response = router.oneshot(ask("What is a fracture?")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let answer = String::from_utf8(body.to_vec()).unwrap();
        assert!(!answer.is_empty());
        assert!(answer.contains(FRACTURE));

        let calls = llm.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "What is a fracture?");
    }

    #[tokio::test]
    async fn test_llm_failure_is_service_unavailable() {
        let router = router_with(Arc::new(EchoLlm::failing())).await;
        let response = router.oneshot(ask("What is a fracture?")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_missing_msg_field_rejected() {
        let router = router_with(Arc::new(EchoLlm::new())).await;
        let request = Request::builder()
            .method("POST")
            .uri("/get")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("question=hello"))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_startup_rejects_model_mismatch() {
        let config = RagConfig::default();
        let index = Arc::new(LocalIndex::in_memory());
        index
            .create_index(&IndexSpec::cosine(&config.vector_db.index_name, 128, "other-model"))
            .await
            .unwrap();

        let result = AppState::new(
            config,
            Arc::new(HashEmbedder::new(128)),
            index,
            Arc::new(EchoLlm::new()),
        )
        .await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_startup_requires_index() {
        let result = AppState::new(
            RagConfig::default(),
            Arc::new(HashEmbedder::new(128)),
            Arc::new(LocalIndex::in_memory()),
            Arc::new(EchoLlm::new()),
        )
        .await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
