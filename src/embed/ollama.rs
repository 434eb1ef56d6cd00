use anyhow::{Context, Result, anyhow, ensure};
use serde::{Deserialize, Serialize};

use super::{Embedder, Embedding};

/// Longest prompt sent to the model, in bytes.
const MAX_PROMPT_BYTES: usize = 8192;

/// Client for a local Ollama server's `/api/embeddings` endpoint. The agent
/// keeps connections alive across calls and is shared by concurrent requests.
pub struct OllamaEmbedder {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    /// Connect to an Ollama server and learn the model's output width from a
    /// first embedding.
    pub fn new(base_url: &str, model: &str) -> Result<Self> {
        let mut embedder = Self {
            agent: ureq::Agent::new_with_defaults(),
            endpoint: format!("{}/api/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            dimensions: 0,
        };
        let width = embedder
            .request_embedding("test")
            .with_context(|| format!("ollama model {model} at {base_url} is not usable"))?
            .len();
        embedder.dimensions = width;
        Ok(embedder)
    }

    fn request_embedding(&self, text: &str) -> Result<Embedding> {
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: prompt_text(text),
        };
        let mut response = self
            .agent
            .post(&self.endpoint)
            .send_json(&request)
            .map_err(|e| match e {
                ureq::Error::StatusCode(code) => anyhow!("ollama returned HTTP {code}"),
                other => anyhow!(other).context(format!("POST {}", self.endpoint)),
            })?;
        let EmbeddingResponse { embedding } = response
            .body_mut()
            .read_json()
            .context("ollama response is not an embedding")?;
        ensure!(
            !embedding.is_empty(),
            "ollama model {} returned an empty embedding",
            self.model
        );
        Ok(embedding)
    }
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding> {
        let embedding = self.request_embedding(text)?;
        ensure!(
            self.dimensions == 0 || embedding.len() == self.dimensions,
            "ollama model {} returned {} dimensions, expected {}",
            self.model,
            embedding.len(),
            self.dimensions
        );
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Ollama rejects empty prompts; overly long ones are cut on a char boundary.
fn prompt_text(text: &str) -> &str {
    if text.is_empty() {
        return " ";
    }
    if text.len() <= MAX_PROMPT_BYTES {
        return text;
    }
    let mut end = MAX_PROMPT_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_prompt_becomes_space() {
        assert_eq!(prompt_text(""), " ");
    }

    #[test]
    fn short_prompt_is_untouched() {
        assert_eq!(prompt_text("fever and chills"), "fever and chills");
    }

    #[test]
    fn long_prompt_is_truncated_on_char_boundary() {
        let text = "é".repeat(MAX_PROMPT_BYTES);
        let cut = prompt_text(&text);
        assert!(cut.len() <= MAX_PROMPT_BYTES);
        assert!(cut.chars().all(|c| c == 'é'));
    }

    #[test]
    fn request_body_carries_model_and_prompt() {
        let request = EmbeddingRequest {
            model: "all-minilm",
            prompt: prompt_text(""),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"model": "all-minilm", "prompt": " "})
        );
    }

    #[test]
    fn unreachable_server_fails_construction() {
        // Port 9 (discard) is not an ollama server.
        assert!(OllamaEmbedder::new("http://127.0.0.1:9", "all-minilm").is_err());
    }
}
