//! Embedding seam and vector math used by deduplication and novelty scoring.
//!
//! The embedding model itself is opaque: the pipeline only needs a batch
//! text-to-vector mapping. `HttpEmbedder` talks to an OpenAI-compatible
//! `/embeddings` endpoint.

use async_trait::async_trait;

use crate::error::SymposiumError;

/// Batch text embedding capability.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns one vector per input text, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SymposiumError>;
}

/// Cosine similarity of two vectors. Zero-magnitude vectors score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Euclidean distance of two vectors.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Full pairwise cosine-similarity matrix. O(n²) in the number of vectors;
/// computed once up front, which bounds inputs to the low hundreds.
pub fn similarity_matrix(embeddings: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let n = embeddings.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            let sim = cosine_similarity(&embeddings[i], &embeddings[j]);
            matrix[i][j] = sim;
            matrix[j][i] = sim;
        }
    }
    matrix
}

/// Client for an OpenAI-compatible embeddings endpoint.
pub struct HttpEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
            model: model.into(),
        }
    }

    /// Resolve the embeddings endpoint from the base URL.
    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/embeddings") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/embeddings", base)
        } else {
            format!("{}/v1/embeddings", base)
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SymposiumError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut req = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let resp = req.send().await?;
        let text = resp.text().await?;
        let json: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| SymposiumError::malformed(format!("invalid embeddings JSON: {e}"), &text))?;

        let data = json["data"]
            .as_array()
            .ok_or_else(|| SymposiumError::malformed("embeddings reply has no data array", &text))?;

        let mut vectors = Vec::with_capacity(data.len());
        for entry in data {
            let vector: Vec<f32> = entry["embedding"]
                .as_array()
                .ok_or_else(|| {
                    SymposiumError::malformed("embeddings entry has no embedding array", &text)
                })?
                .iter()
                .filter_map(|v| v.as_f64())
                .map(|v| v as f32)
                .collect();
            vectors.push(vector);
        }

        if vectors.len() != texts.len() {
            return Err(SymposiumError::malformed(
                format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    vectors.len()
                ),
                &text,
            ));
        }
        Ok(vectors)
    }
}
