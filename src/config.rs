use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "symptom-match.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub ranking: RankingConfig,
    pub embed: EmbedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allow cross-origin requests from any origin
    pub cors: bool,
    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directory holding the model artifacts
    pub dir: PathBuf,
    /// Disease table, relative to `dir`
    pub table: String,
    /// Embedding matrix, relative to `dir`
    pub embeddings: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Results returned when a request does not ask for a count
    pub default_top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    pub backend: EmbedBackend,
    /// Max concurrent embedding requests (1 serializes encoder calls)
    pub max_concurrent: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EmbedBackend {
    #[serde(rename = "ollama")]
    Ollama { model: String, url: String },
    #[serde(rename = "none")]
    None,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            cors: true,
            max_body_bytes: 64 * 1024,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("model_artifacts"),
            table: "processed_diseases.csv".into(),
            embeddings: "symptom_embeddings.npy".into(),
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self { default_top_k: 5 }
    }
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            backend: EmbedBackend::default(),
            max_concurrent: 4,
        }
    }
}

impl Default for EmbedBackend {
    fn default() -> Self {
        EmbedBackend::Ollama {
            model: "all-minilm".into(),
            url: "http://localhost:11434".into(),
        }
    }
}

impl Config {
    /// Load config from `path`, or from `symptom-match.toml` in the working
    /// directory, falling back to defaults when neither exists.
    ///
    /// An explicitly named file that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.exists() {
                    return Ok(Self::default());
                }
                fallback
            }
        };
        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading config from {}", config_path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("parsing config from {}", config_path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Effective encoder concurrency, resolving 0 to 1.
    pub fn effective_concurrency(&self) -> usize {
        self.embed.max_concurrent.max(1)
    }

    /// Effective default result count, resolving 0 to 1.
    pub fn effective_top_k(&self) -> usize {
        self.ranking.default_top_k.max(1)
    }
}

impl CatalogConfig {
    pub fn table_path(&self) -> PathBuf {
        self.dir.join(&self.table)
    }

    pub fn embeddings_path(&self) -> PathBuf {
        self.dir.join(&self.embeddings)
    }
}
