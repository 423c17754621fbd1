//! Configuration for the chatbot

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable holding the Pinecone API key
pub const PINECONE_API_KEY_ENV: &str = "PINECONE_API_KEY";
/// Environment variable holding the OpenAI API key
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Vector index backend (pinecone or local)
    pub backend: BackendProvider,
    /// Server configuration
    pub server: ServerConfig,
    /// Ingestion configuration
    pub ingestion: IngestionConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Chat completion configuration
    pub llm: LlmConfig,
    /// Vector database configuration
    pub vector_db: VectorDbConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
}

impl RagConfig {
    /// Load configuration from an optional TOML file.
    ///
    /// Sections missing from the file keep their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::config(format!("Invalid config: {}", e)))
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::config("chunking.chunk_size must be positive"));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::config(format!(
                "chunking.chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::config("embeddings.dimensions must be positive"));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::config("retrieval.top_k must be positive"));
        }
        if self.vector_db.upsert_batch_size == 0 {
            return Err(Error::config("vector_db.upsert_batch_size must be positive"));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7070,
            enable_cors: false,
        }
    }
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Root directory scanned for PDF files
    pub data_dir: PathBuf,
    /// Abort on the first unreadable PDF instead of skipping it
    pub fail_fast: bool,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/"),
            fail_fast: false,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// sentence-transformers model name
    pub model: String,
    /// Embedding dimensions (384 for MiniLM)
    pub dimensions: usize,
    /// Batch size for embedding generation
    pub batch_size: usize,
    /// Maximum sequence length in tokens
    pub max_length: usize,
    /// Cache directory for model files
    pub cache_dir: PathBuf,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            batch_size: 32,
            max_length: 256,
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("medibot-rag")
                .join("models"),
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 20,
        }
    }
}

/// Chat completion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible API base URL
    pub base_url: String,
    /// Chat model name
    pub model: String,
    /// Sampling temperature (provider default when unset)
    pub temperature: Option<f32>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            temperature: None,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Index name
    pub index_name: String,
    /// Pinecone control plane URL
    pub control_plane_url: String,
    /// Serverless cloud
    pub cloud: String,
    /// Serverless region
    pub region: String,
    /// Namespace records are written to and queried from
    pub namespace: String,
    /// Records per upsert request
    pub upsert_batch_size: usize,
    /// Retries per failed request
    pub max_retries: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Seconds to wait for a freshly created index to become ready
    pub ready_timeout_secs: u64,
    /// Storage file for the local backend
    pub local_path: PathBuf,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        let local_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("medibot-rag")
            .join("index.json");

        Self {
            index_name: "medical-chatbot".to_string(),
            control_plane_url: "https://api.pinecone.io".to_string(),
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            namespace: String::new(),
            upsert_batch_size: 100,
            max_retries: 3,
            timeout_secs: 60,
            ready_timeout_secs: 120,
            local_path,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks handed to the LLM
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

/// Vector index backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    /// Managed Pinecone serverless index
    #[default]
    Pinecone,
    /// JSON file on local disk with exact search
    Local,
}

/// API keys read from the environment at process start
#[derive(Clone)]
pub struct ApiKeys {
    /// Pinecone key, present when the backend needs it
    pub pinecone: Option<String>,
    /// OpenAI key, present when the process talks to the LLM
    pub openai: Option<String>,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("pinecone", &self.pinecone.as_ref().map(|_| "***"))
            .field("openai", &self.openai.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ApiKeys {
    /// Read keys from the process environment.
    ///
    /// Fails fast when a key the process needs is missing or blank.
    pub fn from_env(backend: BackendProvider, needs_llm: bool) -> Result<Self> {
        Self::from_lookup(backend, needs_llm, |name| std::env::var(name).ok())
    }

    /// Read keys through an arbitrary lookup function
    pub fn from_lookup<F>(backend: BackendProvider, needs_llm: bool, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| -> Result<String> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::config(format!("{} is not set", name)))
        };

        let pinecone = match backend {
            BackendProvider::Pinecone => Some(read(PINECONE_API_KEY_ENV)?),
            BackendProvider::Local => None,
        };
        let openai = if needs_llm {
            Some(read(OPENAI_API_KEY_ENV)?)
        } else {
            None
        };

        Ok(Self { pinecone, openai })
    }
}
