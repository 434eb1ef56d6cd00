use anyhow::{Context, Result, bail, ensure};
use std::sync::Arc;

use super::{RankedResult, normalize_text, rank};
use crate::catalog::{self, Catalog, hasher, npy::Matrix};
use crate::config::{CatalogConfig, Config, EmbedBackend};
use crate::embed::{Embedder, ollama::OllamaEmbedder};

/// Process-wide matching context, built once at startup and shared read-only
/// by every request.
pub struct Diagnoser {
    state: State,
}

enum State {
    Ready {
        catalog: Catalog,
        embedder: Arc<dyn Embedder>,
    },
    Unavailable {
        reason: String,
    },
}

/// Snapshot of readiness for logs and the `status` command.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Status {
    pub ready: bool,
    pub reason: Option<String>,
    pub records: usize,
    pub dimensions: usize,
    pub model: Option<String>,
    pub fingerprint: Option<String>,
}

impl Diagnoser {
    /// Pair a loaded catalog with an encoder, checking that their widths agree.
    pub fn ready(catalog: Catalog, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let width = embedder.dimensions();
        ensure!(
            width == 0 || width == catalog.dimensions(),
            "encoder {} produces {width}-dimensional vectors but the catalog holds {}",
            embedder.model_name(),
            catalog.dimensions()
        );
        Ok(Self {
            state: State::Ready { catalog, embedder },
        })
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: State::Unavailable {
                reason: reason.into(),
            },
        }
    }

    /// Load the artifacts and connect the configured encoder. Never fails:
    /// any problem yields an unavailable diagnoser carrying the reason.
    pub fn from_config(config: &Config) -> Self {
        let diagnoser = match load(config) {
            Ok(d) => d,
            Err(e) => Self::unavailable(format!("{e:#}")),
        };
        diagnoser.log_status();
        diagnoser
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready { .. })
    }

    pub fn status(&self) -> Status {
        match &self.state {
            State::Ready { catalog, embedder } => Status {
                ready: true,
                reason: None,
                records: catalog.len(),
                dimensions: catalog.dimensions(),
                model: Some(embedder.model_name().to_string()),
                fingerprint: catalog.fingerprint().map(str::to_string),
            },
            State::Unavailable { reason } => Status {
                ready: false,
                reason: Some(reason.clone()),
                records: 0,
                dimensions: 0,
                model: None,
                fingerprint: None,
            },
        }
    }

    /// Normalize, embed and rank a free-text query. An unavailable diagnoser
    /// returns no results without touching the encoder.
    pub fn find_top_diseases(&self, query: &str, top_k: usize) -> Result<Vec<RankedResult>> {
        let (catalog, embedder) = match &self.state {
            State::Ready { catalog, embedder } => (catalog, embedder),
            State::Unavailable { .. } => return Ok(Vec::new()),
        };

        let normalized = normalize_text(query);
        let query_embedding = embedder
            .embed(&normalized)
            .with_context(|| format!("embedding query with {}", embedder.model_name()))?;
        if query_embedding.len() != catalog.dimensions() {
            bail!(
                "encoder returned a {}-dimensional vector, catalog expects {}",
                query_embedding.len(),
                catalog.dimensions()
            );
        }

        Ok(rank(&query_embedding, catalog, top_k))
    }

    fn log_status(&self) {
        match &self.state {
            State::Ready { catalog, embedder } => tracing::info!(
                records = catalog.len(),
                dimensions = catalog.dimensions(),
                model = embedder.model_name(),
                fingerprint = catalog.fingerprint().map(hasher::short).unwrap_or("-"),
                "catalog ready"
            ),
            State::Unavailable { reason } => {
                tracing::warn!(%reason, "catalog unavailable, predictions will be empty")
            }
        }
    }
}

fn load(config: &Config) -> Result<Diagnoser> {
    let catalog = catalog::load(&config.catalog).context("loading catalog artifacts")?;
    let embedder = connect_embedder(&config.embed.backend)?;
    Diagnoser::ready(catalog, embedder)
}

/// Build the configured encoder.
pub fn connect_embedder(backend: &EmbedBackend) -> Result<Arc<dyn Embedder>> {
    match backend {
        EmbedBackend::Ollama { model, url } => Ok(Arc::new(OllamaEmbedder::new(url, model)?)),
        EmbedBackend::None => bail!("no embedding backend configured"),
    }
}

pub struct EmbedStats {
    pub records: usize,
    pub dimensions: usize,
}

/// Encode every record's symptoms and write the embedding matrix next to the
/// disease table, replacing any existing matrix.
pub fn embed_catalog(config: &CatalogConfig, embedder: &dyn Embedder) -> Result<EmbedStats> {
    let table_path = config.table_path();
    let records = catalog::table::read_records(&table_path)?;
    ensure!(!records.is_empty(), "disease table {} has no rows", table_path.display());

    let texts: Vec<String> = records.iter().map(|r| normalize_text(&r.symptoms)).collect();
    let batch_size = 32;
    let mut vectors = Vec::with_capacity(texts.len());
    for (i, batch) in texts.chunks(batch_size).enumerate() {
        let refs: Vec<&str> = batch.iter().map(String::as_str).collect();
        let embedded = embedder
            .embed_batch(&refs)
            .with_context(|| format!("embedding batch starting at row {}", i * batch_size + 1))?;
        vectors.extend(embedded);
        tracing::debug!(done = vectors.len(), total = texts.len(), "embedded batch");
    }

    let matrix = Matrix::from_rows(&vectors)?;
    let matrix_path = config.embeddings_path();
    catalog::npy::write_matrix(&matrix_path, &matrix)?;
    tracing::info!(
        records = matrix.rows(),
        dimensions = matrix.cols(),
        path = %matrix_path.display(),
        "wrote embedding matrix"
    );

    Ok(EmbedStats {
        records: matrix.rows(),
        dimensions: matrix.cols(),
    })
}
