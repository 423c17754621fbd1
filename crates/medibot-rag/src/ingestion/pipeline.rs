//! Ingestion pipeline orchestration

use std::path::Path;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, RetryPolicy, VectorIndex};
use crate::types::{Chunk, IndexRecord, IndexSpec};

use super::filter::filter_to_minimal;
use super::loader::PdfLoader;
use super::splitter::RecursiveTextSplitter;

/// Counts from one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Pages loaded
    pub documents: usize,
    /// Chunks produced by the splitter
    pub chunks: usize,
    /// Records acknowledged by the index
    pub upserted: usize,
    /// Upsert requests sent
    pub batches: usize,
    /// Whether this run created the index
    pub index_created: bool,
}

/// Main ingestion pipeline: load, filter, split, embed, upsert
pub struct IngestPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    splitter: RecursiveTextSplitter,
    index_name: String,
    batch_size: usize,
    fail_fast: bool,
    retry: RetryPolicy,
}

impl IngestPipeline {
    /// Create a new ingestion pipeline
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Result<Self> {
        Ok(Self {
            embedder,
            index,
            splitter: RecursiveTextSplitter::from_config(&config.chunking)?,
            index_name: config.vector_db.index_name.clone(),
            batch_size: config.vector_db.upsert_batch_size.max(1),
            fail_fast: config.ingestion.fail_fast,
            retry: RetryPolicy::new(config.vector_db.max_retries),
        })
    }

    /// Override the upsert retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Schema the index must have for this pipeline's embedder
    pub fn index_spec(&self) -> IndexSpec {
        IndexSpec::cosine(
            &self.index_name,
            self.embedder.dimensions(),
            self.embedder.model_id(),
        )
    }

    /// Full ingestion of every PDF under `data_dir`
    pub async fn run(&self, data_dir: &Path) -> Result<IngestReport> {
        let raw = PdfLoader::new(data_dir)
            .with_fail_fast(self.fail_fast)
            .load()?;
        tracing::info!("Loaded {} pages from {}", raw.len(), data_dir.display());

        let minimal = filter_to_minimal(&raw);
        let chunks = self.splitter.split_documents(&minimal);
        tracing::info!(
            "Split into {} chunks (size {}, overlap {})",
            chunks.len(),
            self.splitter.chunk_size(),
            self.splitter.chunk_overlap()
        );

        // Embed before touching the index so a failed run leaves nothing behind
        let records = self.embed_chunks(&chunks).await?;

        let index_created = ensure_index(self.index.as_ref(), &self.index_spec()).await?;
        let (upserted, batches) = self.upsert_batched(&records).await?;

        tracing::info!(
            "Ingestion complete: {} records in {} batches to '{}' via {}",
            upserted,
            batches,
            self.index_name,
            self.index.name()
        );

        Ok(IngestReport {
            documents: raw.len(),
            chunks: chunks.len(),
            upserted,
            batches,
            index_created,
        })
    }

    /// Embed every chunk, pairing each with its vector
    pub async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<IndexRecord>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        tracing::info!("Embedding {} chunks with {}", texts.len(), self.embedder.name());
        let vectors = self.embedder.embed_batch(&texts).await?;

        if vectors.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "Got {} embeddings for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        Ok(chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, values)| IndexRecord::from_chunk(chunk, values))
            .collect())
    }

    /// Upsert in batches, retrying each batch.
    ///
    /// Returns (records written, batches sent). A batch that exhausts its
    /// retries aborts the run; records already written stay in the index.
    pub async fn upsert_batched(&self, records: &[IndexRecord]) -> Result<(usize, usize)> {
        let total = records.len();
        let mut written = 0usize;
        let mut batches = 0usize;

        for batch in records.chunks(self.batch_size) {
            let count = self
                .retry
                .run("Upsert", || self.index.upsert(batch))
                .await
                .map_err(|e| {
                    Error::vector_db(format!(
                        "Upsert aborted after {} of {} records: {}",
                        written, total, e
                    ))
                })?;

            written += count;
            batches += 1;
            tracing::debug!("Upserted batch {} ({} records, {}/{})", batches, count, written, total);
        }

        Ok((written, batches))
    }
}

/// Create the index if it is absent, otherwise check its schema.
///
/// Returns `true` when the index was created by this call.
pub async fn ensure_index(index: &dyn VectorIndex, expected: &IndexSpec) -> Result<bool> {
    match index.describe_index().await? {
        Some(existing) => {
            check_spec(&existing, expected)?;
            tracing::info!("Using existing index '{}'", existing.name);
            Ok(false)
        }
        None => {
            index.create_index(expected).await?;
            Ok(true)
        }
    }
}

/// Require that the index exists and matches the expected schema
pub async fn verify_index(index: &dyn VectorIndex, expected: &IndexSpec) -> Result<()> {
    let existing = index.describe_index().await?.ok_or_else(|| {
        Error::config(format!(
            "Index '{}' does not exist; run medibot-ingest first",
            expected.name
        ))
    })?;
    check_spec(&existing, expected)
}

/// Compare an existing index with the schema the current embedder needs.
///
/// An index without a model tag is accepted with a warning.
pub fn check_spec(existing: &IndexSpec, expected: &IndexSpec) -> Result<()> {
    if existing.dimension != expected.dimension {
        return Err(Error::config(format!(
            "Index '{}' has dimension {}, embedder produces {}",
            existing.name, existing.dimension, expected.dimension
        )));
    }

    if existing.metric != expected.metric {
        return Err(Error::config(format!(
            "Index '{}' uses metric {}, expected {}",
            existing.name,
            existing.metric.as_str(),
            expected.metric.as_str()
        )));
    }

    match (&existing.embedding_model, &expected.embedding_model) {
        (Some(found), Some(wanted)) if found != wanted => Err(Error::config(format!(
            "Index '{}' was built with embedding model '{}', configured model is '{}'",
            existing.name, found, wanted
        ))),
        (None, Some(wanted)) => {
            tracing::warn!(
                "Index '{}' has no embedding model tag; assuming '{}'",
                existing.name,
                wanted
            );
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::loader::tests::build_pdf;
    use crate::providers::LocalIndex;
    use crate::testing::HashEmbedder;
    use crate::types::{Metric, ScoredRecord};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn config(batch: usize) -> RagConfig {
        let mut config = RagConfig::default();
        config.vector_db.upsert_batch_size = batch;
        config
    }

    fn fast_retry(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries).with_base_delay(Duration::ZERO)
    }

    fn write_corpus(dir: &Path) {
        let pages = ["a".repeat(600), "b".repeat(400), "c".repeat(400)];
        let refs: Vec<&str> = pages.iter().map(String::as_str).collect();
        std::fs::write(dir.join("medical.pdf"), build_pdf(&refs)).unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();
    }

    /// Returns one vector fewer than requested
    struct ShortEmbedder;

    #[async_trait]
    impl EmbeddingProvider for ShortEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![0.0; 8]; texts.len().saturating_sub(1)])
        }

        fn dimensions(&self) -> usize {
            8
        }

        fn model_id(&self) -> &str {
            "short"
        }

        fn name(&self) -> &str {
            "short"
        }
    }

    /// Fails the first `failures` upsert calls, then delegates
    struct FlakyIndex {
        inner: LocalIndex,
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl VectorIndex for FlakyIndex {
        async fn index_exists(&self) -> Result<bool> {
            self.inner.index_exists().await
        }

        async fn describe_index(&self) -> Result<Option<IndexSpec>> {
            self.inner.describe_index().await
        }

        async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
            self.inner.create_index(spec).await
        }

        async fn upsert(&self, records: &[IndexRecord]) -> Result<usize> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(Error::vector_db("503 Service Unavailable"));
            }
            self.inner.upsert(records).await
        }

        async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredRecord>> {
            self.inner.query(vector, top_k).await
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_end_to_end_ingestion() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path());

        let index = Arc::new(LocalIndex::in_memory());
        let pipeline =
            IngestPipeline::new(&config(3), Arc::new(HashEmbedder::new(384)), index.clone())
                .unwrap();

        let report = pipeline.run(dir.path()).await.unwrap();

        assert_eq!(report.documents, 3);
        assert_eq!(report.chunks, 4);
        assert_eq!(report.upserted, 4);
        assert_eq!(report.batches, 2);
        assert!(report.index_created);
        assert_eq!(index.len(), 4);

        let spec = index.describe_index().await.unwrap().unwrap();
        assert_eq!(spec.dimension, 384);
        assert_eq!(spec.embedding_model.as_deref(), Some("hash-bow"));
    }

    #[tokio::test]
    async fn test_reingestion_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path());

        let index = Arc::new(LocalIndex::in_memory());
        let pipeline =
            IngestPipeline::new(&config(100), Arc::new(HashEmbedder::new(32)), index.clone())
                .unwrap();

        pipeline.run(dir.path()).await.unwrap();
        let second = pipeline.run(dir.path()).await.unwrap();

        assert!(!second.index_created);
        assert_eq!(index.len(), 4);
    }

    #[tokio::test]
    async fn test_model_mismatch_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path());

        let index = Arc::new(LocalIndex::in_memory());
        let earlier =
            IngestPipeline::new(&config(100), Arc::new(HashEmbedder::new(32)), index.clone())
                .unwrap();
        earlier.run(dir.path()).await.unwrap();

        let embedder = HashEmbedder::new(32).with_model("all-MiniLM-L6-v2");
        let pipeline =
            IngestPipeline::new(&config(100), Arc::new(embedder), index.clone()).unwrap();
        let result = pipeline.run(dir.path()).await;

        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("hash-bow")));
        assert_eq!(index.len(), 4);
    }

    #[tokio::test]
    async fn test_metric_mismatch_is_config_error() {
        let index = LocalIndex::in_memory();
        let existing = IndexSpec {
            metric: Metric::Euclidean,
            ..IndexSpec::cosine("medical-chatbot", 384, "hash-bow")
        };
        index.create_index(&existing).await.unwrap();

        let expected = IndexSpec::cosine("medical-chatbot", 384, "hash-bow");
        let result = ensure_index(&index, &expected).await;
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("euclidean")));
        assert!(matches!(verify_index(&index, &expected).await, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_embedding_failure_leaves_no_index() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path());

        let index = Arc::new(LocalIndex::in_memory());
        let pipeline =
            IngestPipeline::new(&config(100), Arc::new(ShortEmbedder), index.clone()).unwrap();

        let result = pipeline.run(dir.path()).await;
        assert!(matches!(result, Err(Error::Embedding(_))));
        assert!(!index.index_exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_config_error() {
        let index = LocalIndex::in_memory();
        index
            .create_index(&IndexSpec::cosine("medical-chatbot", 768, "hash-bow"))
            .await
            .unwrap();

        let result = ensure_index(&index, &IndexSpec::cosine("medical-chatbot", 384, "hash-bow")).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_ensure_index_is_idempotent() {
        let index = LocalIndex::in_memory();
        let spec = IndexSpec::cosine("medical-chatbot", 8, "hash-bow");

        assert!(ensure_index(&index, &spec).await.unwrap());
        assert!(!ensure_index(&index, &spec).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_requires_existing_index() {
        let index = LocalIndex::in_memory();
        let spec = IndexSpec::cosine("medical-chatbot", 8, "hash-bow");
        assert!(matches!(verify_index(&index, &spec).await, Err(Error::Config(_))));

        index.create_index(&spec).await.unwrap();
        assert!(verify_index(&index, &spec).await.is_ok());
    }

    #[test]
    fn test_untagged_index_accepted() {
        let mut existing = IndexSpec::cosine("medical-chatbot", 384, "x");
        existing.embedding_model = None;
        let expected = IndexSpec::cosine("medical-chatbot", 384, "all-MiniLM-L6-v2");
        assert!(check_spec(&existing, &expected).is_ok());
    }

    #[tokio::test]
    async fn test_transient_upsert_failure_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path());

        let index = Arc::new(FlakyIndex {
            inner: LocalIndex::in_memory(),
            failures: 2,
            calls: AtomicUsize::new(0),
        });
        let pipeline =
            IngestPipeline::new(&config(100), Arc::new(HashEmbedder::new(16)), index.clone())
                .unwrap()
                .with_retry(fast_retry(3));

        let report = pipeline.run(dir.path()).await.unwrap();
        assert_eq!(report.upserted, 4);
        assert_eq!(index.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_report_progress() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path());

        let index = Arc::new(FlakyIndex {
            inner: LocalIndex::in_memory(),
            failures: 10,
            calls: AtomicUsize::new(0),
        });
        let pipeline =
            IngestPipeline::new(&config(2), Arc::new(HashEmbedder::new(16)), index.clone())
                .unwrap()
                .with_retry(fast_retry(1));

        let result = pipeline.run(dir.path()).await;
        assert!(
            matches!(result, Err(Error::VectorDb(msg)) if msg.contains("after 0 of 4 records"))
        );
        assert_eq!(index.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_data_dir_fails_before_index_creation() {
        let index = Arc::new(LocalIndex::in_memory());
        let pipeline =
            IngestPipeline::new(&config(100), Arc::new(HashEmbedder::new(8)), index.clone())
                .unwrap();

        let result = pipeline.run(Path::new("/definitely/not/here")).await;
        assert!(matches!(result, Err(Error::Load { .. })));
        assert!(!index.index_exists().await.unwrap());
    }
}
