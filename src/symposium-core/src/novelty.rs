//! Novelty metrics for generated ideas against the discovered paper bank.
//!
//! Papers split at a cutoff year into a historical and a contemporary bank.
//! Historical/contemporary dissimilarity is the mean Euclidean distance to
//! the nearest K abstracts in each bank; contemporary impact is the mean
//! citation count of the K most cosine-similar contemporary papers; overall
//! novelty combines the three.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::embedding::{Embedder, cosine_similarity, euclidean_distance};
use crate::error::SymposiumError;
use crate::idea::{Idea, Paper};

/// Papers published before this year count as historical.
pub const PAST_CUTOFF_YEAR: i32 = 2023;
const TOP_K_SIMILAR: usize = 5;

/// The novelty metric suite for one idea.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NoveltyScores {
    pub historical_dissimilarity: f64,
    pub contemporary_dissimilarity: f64,
    pub contemporary_impact: f64,
    pub overall_novelty: f64,
}

/// Mean Euclidean distance from `idea` to its K nearest bank embeddings.
/// An empty bank scores 0.
fn dissimilarity(idea_embedding: &[f32], bank: &[Vec<f32>]) -> f64 {
    if bank.is_empty() {
        return 0.0;
    }
    let mut distances: Vec<f32> = bank
        .iter()
        .map(|e| euclidean_distance(idea_embedding, e))
        .collect();
    distances.sort_by(|a, b| a.total_cmp(b));
    let top_k = &distances[..distances.len().min(TOP_K_SIMILAR)];
    top_k.iter().map(|d| *d as f64).sum::<f64>() / top_k.len() as f64
}

/// Embed the abstracts of a paper bank, skipping papers without one. Returns
/// the embeddings paired with the papers that produced them.
async fn embed_bank<'p>(
    papers: &'p [Paper],
    embedder: &dyn Embedder,
) -> Result<(Vec<&'p Paper>, Vec<Vec<f32>>), SymposiumError> {
    let with_abstracts: Vec<&Paper> = papers
        .iter()
        .filter(|p| p.abstract_text.as_deref().is_some_and(|a| !a.is_empty()))
        .collect();
    if with_abstracts.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }
    let texts: Vec<String> = with_abstracts
        .iter()
        .filter_map(|p| p.abstract_text.clone())
        .collect();
    let embeddings = embedder.embed(&texts).await?;
    Ok((with_abstracts, embeddings))
}

/// Compute the full novelty suite for one idea.
pub async fn novelty_metrics(
    idea: &Idea,
    discovered_papers: &[Paper],
    embedder: &dyn Embedder,
) -> Result<NoveltyScores, SymposiumError> {
    let idea_text = format!("{} {}", idea.title, idea.description);
    let idea_embedding = embedder
        .embed(&[idea_text])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| SymposiumError::malformed("embedder returned no vector", &idea.title))?;

    let past: Vec<Paper> = discovered_papers
        .iter()
        .filter(|p| p.year.is_some_and(|y| y < PAST_CUTOFF_YEAR))
        .cloned()
        .collect();
    let contemporary: Vec<Paper> = discovered_papers
        .iter()
        .filter(|p| p.year.is_some_and(|y| y >= PAST_CUTOFF_YEAR))
        .cloned()
        .collect();
    debug!(
        past = past.len(),
        contemporary = contemporary.len(),
        idea = %idea.title,
        "split paper banks for novelty scoring"
    );

    let (_, past_embeddings) = embed_bank(&past, embedder).await?;
    let (contemporary_papers, contemporary_embeddings) =
        embed_bank(&contemporary, embedder).await?;

    let hd = dissimilarity(&idea_embedding, &past_embeddings);
    let cd = dissimilarity(&idea_embedding, &contemporary_embeddings);

    let ci = if contemporary_embeddings.is_empty() {
        0.0
    } else {
        let mut by_similarity: Vec<(f32, &Paper)> = contemporary_embeddings
            .iter()
            .zip(&contemporary_papers)
            .map(|(embedding, paper)| (cosine_similarity(&idea_embedding, embedding), *paper))
            .collect();
        by_similarity.sort_by(|a, b| b.0.total_cmp(&a.0));
        let top_k = &by_similarity[..by_similarity.len().min(TOP_K_SIMILAR)];
        let citations: Vec<f64> = top_k
            .iter()
            .map(|(_, paper)| paper.citation_count.unwrap_or(0) as f64)
            .collect();
        citations.iter().sum::<f64>() / citations.len() as f64
    };

    let on = if cd > 0.0 { (hd * ci) / cd } else { 0.0 };

    Ok(NoveltyScores {
        historical_dissimilarity: hd,
        contemporary_dissimilarity: cd,
        contemporary_impact: ci,
        overall_novelty: on,
    })
}

/// Average a set of per-idea scores into the keys used by experiment summaries.
pub fn average_novelty(scores: &[NoveltyScores]) -> BTreeMap<String, f64> {
    let mut averages = BTreeMap::new();
    if scores.is_empty() {
        return averages;
    }
    let n = scores.len() as f64;
    averages.insert(
        "average_historical_dissimilarity".to_string(),
        scores.iter().map(|s| s.historical_dissimilarity).sum::<f64>() / n,
    );
    averages.insert(
        "average_contemporary_dissimilarity".to_string(),
        scores.iter().map(|s| s.contemporary_dissimilarity).sum::<f64>() / n,
    );
    averages.insert(
        "average_contemporary_impact".to_string(),
        scores.iter().map(|s| s.contemporary_impact).sum::<f64>() / n,
    );
    averages.insert(
        "average_overall_novelty".to_string(),
        scores.iter().map(|s| s.overall_novelty).sum::<f64>() / n,
    );
    averages
}
