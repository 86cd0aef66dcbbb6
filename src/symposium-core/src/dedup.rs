//! Idea deduplication by embedding similarity.
//!
//! A single embedding batch and one full pairwise cosine matrix, then greedy
//! sequential suppression in original order: each surviving idea suppresses
//! every later idea above the similarity threshold. Comparisons are anchored
//! to the earliest surviving representative of a near-duplicate group, so the
//! suppression is deliberately not transitive: a later idea is only compared
//! against earlier survivors, never against other suppressed ideas.

use tracing::info;

use crate::embedding::{Embedder, similarity_matrix};
use crate::error::SymposiumError;
use crate::idea::Idea;

/// Text fed to the embedder for one idea: title + abstract when the abstract
/// exists, otherwise title + description + reasoning.
fn embedding_text(idea: &Idea) -> String {
    match &idea.abstract_text {
        Some(abstract_text) => format!("{}\n{}", idea.title, abstract_text),
        None => format!("{}\n{}\n{}", idea.title, idea.description, idea.reasoning),
    }
}

/// Reduce `ideas` so that no retained idea has similarity above `threshold`
/// to an earlier retained one. Preserves original relative order; the output
/// is always a content subset of the input. Empty input returns empty without
/// invoking the embedder.
pub async fn dedup_ideas(
    ideas: &[Idea],
    embedder: &dyn Embedder,
    threshold: f32,
) -> Result<Vec<Idea>, SymposiumError> {
    if ideas.is_empty() {
        return Ok(Vec::new());
    }

    let texts: Vec<String> = ideas.iter().map(embedding_text).collect();
    let embeddings = embedder.embed(&texts).await?;
    let matrix = similarity_matrix(&embeddings);

    let mut suppressed = vec![false; ideas.len()];
    let mut kept = Vec::new();
    for i in 0..ideas.len() {
        if suppressed[i] {
            continue;
        }
        kept.push(ideas[i].clone());
        for j in (i + 1)..ideas.len() {
            if !suppressed[j] && matrix[i][j] > threshold {
                suppressed[j] = true;
            }
        }
    }

    info!(
        original = ideas.len(),
        deduplicated = kept.len(),
        threshold = %threshold,
        "deduplication complete"
    );
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn idea(title: &str) -> Idea {
        Idea::new(title, format!("{title} description"), format!("{title} reasoning")).unwrap()
    }

    /// Embedder returning fixed vectors per input position; panics if invoked
    /// with an unexpected batch size.
    struct FixedEmbedder {
        vectors: Vec<Vec<f32>>,
        calls: Mutex<usize>,
    }

    impl FixedEmbedder {
        fn new(vectors: Vec<Vec<f32>>) -> Self {
            Self {
                vectors,
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SymposiumError> {
            *self.calls.lock().unwrap() += 1;
            assert_eq!(texts.len(), self.vectors.len());
            Ok(self.vectors.clone())
        }
    }

    /// sim(1,2) ≈ 0.9, sim(3,4) ≈ 0.5, cross-pair similarities low.
    fn four_idea_vectors() -> Vec<Vec<f32>> {
        vec![
            vec![1.0, 0.0, 0.0],
            vec![0.9, 0.4359, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![0.0, 0.866, 0.5],
        ]
    }

    #[tokio::test]
    async fn test_empty_input_skips_embedder() {
        let embedder = FixedEmbedder::new(Vec::new());
        let kept = dedup_ideas(&[], &embedder, 0.8).await.unwrap();
        assert!(kept.is_empty());
        assert_eq!(*embedder.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_single_idea_is_always_kept() {
        let embedder = FixedEmbedder::new(vec![vec![1.0, 0.0]]);
        let ideas = vec![idea("only")];
        let kept = dedup_ideas(&ideas, &embedder, 0.0).await.unwrap();
        assert_eq!(kept, ideas);
    }

    #[tokio::test]
    async fn test_four_idea_scenario_suppresses_second() {
        let ideas = vec![idea("a"), idea("b"), idea("c"), idea("d")];
        let embedder = FixedEmbedder::new(four_idea_vectors());
        let kept = dedup_ideas(&ideas, &embedder, 0.8).await.unwrap();
        let titles: Vec<&str> = kept.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "c", "d"]);
    }

    #[tokio::test]
    async fn test_threshold_one_keeps_everything() {
        let ideas = vec![idea("a"), idea("b"), idea("c"), idea("d")];
        let embedder = FixedEmbedder::new(four_idea_vectors());
        let kept = dedup_ideas(&ideas, &embedder, 1.0).await.unwrap();
        assert_eq!(kept.len(), ideas.len());
        assert_eq!(kept, ideas);
    }

    #[tokio::test]
    async fn test_threshold_zero_keeps_exactly_one() {
        // All pairwise similarities strictly positive.
        let ideas = vec![idea("a"), idea("b"), idea("c")];
        let embedder = FixedEmbedder::new(vec![
            vec![1.0, 0.1],
            vec![0.9, 0.2],
            vec![0.8, 0.3],
        ]);
        let kept = dedup_ideas(&ideas, &embedder, 0.0).await.unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "a");
    }

    #[tokio::test]
    async fn test_output_is_ordered_subset_of_input() {
        let ideas = vec![idea("a"), idea("b"), idea("c"), idea("d")];
        let embedder = FixedEmbedder::new(four_idea_vectors());
        let kept = dedup_ideas(&ideas, &embedder, 0.4).await.unwrap();
        assert!(kept.len() <= ideas.len());
        let mut cursor = 0;
        for retained in &kept {
            let position = ideas[cursor..]
                .iter()
                .position(|i| i.content_key() == retained.content_key())
                .expect("output must be a subset of input");
            cursor += position + 1;
        }
    }

    #[tokio::test]
    async fn test_deterministic_across_repeated_runs() {
        let ideas = vec![idea("a"), idea("b"), idea("c"), idea("d")];
        let embedder = FixedEmbedder::new(four_idea_vectors());
        let first = dedup_ideas(&ideas, &embedder, 0.8).await.unwrap();
        let second = dedup_ideas(&ideas, &embedder, 0.8).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_abstract_preferred_for_embedding_text() {
        let with_abstract = idea("t").with_abstract("the abstract");
        assert_eq!(embedding_text(&with_abstract), "t\nthe abstract");
        let without = idea("t");
        assert_eq!(embedding_text(&without), "t\nt description\nt reasoning");
    }
}
