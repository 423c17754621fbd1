//! Local vector index persisted as a JSON file
//!
//! Exact cosine search over every stored record. Suitable for small corpora,
//! offline runs and tests.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::types::{IndexRecord, IndexSpec, ScoredRecord};

use super::vector_store::VectorIndex;

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    spec: Option<IndexSpec>,
    records: BTreeMap<String, IndexRecord>,
}

/// Local vector index
pub struct LocalIndex {
    /// Backing file; `None` keeps everything in memory
    path: Option<PathBuf>,
    state: RwLock<IndexFile>,
}

impl LocalIndex {
    /// Open an index file, starting empty if it does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw).map_err(|e| {
                Error::vector_db(format!("Corrupt index file {}: {}", path.display(), e))
            })?
        } else {
            IndexFile::default()
        };

        Ok(Self {
            path: Some(path),
            state: RwLock::new(state),
        })
    }

    /// Index that lives only for the lifetime of the process
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: RwLock::new(IndexFile::default()),
        }
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let raw = serde_json::to_string(&*self.state.read())?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, raw).await?;
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for LocalIndex {
    async fn index_exists(&self) -> Result<bool> {
        Ok(self.state.read().spec.is_some())
    }

    async fn describe_index(&self) -> Result<Option<IndexSpec>> {
        Ok(self.state.read().spec.clone())
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        {
            let mut state = self.state.write();
            if state.spec.is_some() {
                return Err(Error::vector_db(format!("Index '{}' already exists", spec.name)));
            }
            state.spec = Some(spec.clone());
        }
        tracing::info!("Created local index '{}' ({} dimensions)", spec.name, spec.dimension);
        self.persist().await
    }

    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize> {
        {
            let mut state = self.state.write();
            let dimension = state
                .spec
                .as_ref()
                .map(|s| s.dimension)
                .ok_or_else(|| Error::vector_db("Index does not exist"))?;

            if let Some(bad) = records.iter().find(|r| r.values.len() != dimension) {
                return Err(Error::vector_db(format!(
                    "Record {} has {} dimensions, index expects {}",
                    bad.id,
                    bad.values.len(),
                    dimension
                )));
            }

            for record in records {
                state.records.insert(record.id.clone(), record.clone());
            }
        }
        self.persist().await?;
        Ok(records.len())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredRecord>> {
        let state = self.state.read();
        if state.spec.is_none() {
            return Err(Error::vector_db("Index does not exist"));
        }

        let mut scored: Vec<ScoredRecord> = state
            .records
            .values()
            .map(|r| ScoredRecord {
                id: r.id.clone(),
                text: r.text.clone(),
                metadata: r.metadata.clone(),
                score: cosine_similarity(vector, &r.values),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// Compute cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
