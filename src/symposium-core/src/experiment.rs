//! Batch experiment driver.
//!
//! Runs every query under every preset, evaluates each completed run
//! (tournament precision against a zero-shot baseline, plus novelty
//! averages), and rewrites the live summary file after every run. On startup
//! the previous summary is reloaded and already-completed (preset, query)
//! pairs are skipped, so a crashed batch resumes where it stopped.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::agents::{PairwiseJudge, TextCompletion, zeroshot_ideas};
use crate::config::{Config, ExperimentPreset};
use crate::embedding::Embedder;
use crate::error::SymposiumError;
use crate::idea::Idea;
use crate::novelty::{average_novelty, novelty_metrics};
use crate::pipeline::{Pipeline, PipelineOutput, write_json};
use crate::tournament::{Precision, TournamentRanker, precision_at_n};

/// Provenance tag for zero-shot baseline ideas.
pub const BASELINE_SOURCE: &str = "baseline";
/// Provenance tag for debate-pipeline ideas.
pub const CANDIDATE_SOURCE: &str = "non_baseline";

const ZEROSHOT_IDEA_COUNT: usize = 20;

/// Evaluation metrics for one completed (preset, query) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMetrics {
    pub query: String,
    /// "Precision@N" keys; levels with insufficient ranked data are absent.
    pub precision: Option<BTreeMap<String, f64>>,
    pub novelty: Option<BTreeMap<String, f64>>,
}

/// Aggregated metrics for one preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetSummary {
    pub num_successful_runs: usize,
    pub avg_precision_at_3: f64,
    pub avg_precision_at_5: f64,
    pub avg_precision_at_10: f64,
    pub avg_precision_at_20: f64,
    pub avg_novelty_scores: BTreeMap<String, f64>,
}

/// The persisted experiment summary: aggregates plus every raw result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperimentSummary {
    pub summary: BTreeMap<String, PresetSummary>,
    pub raw_results: BTreeMap<String, Vec<QueryMetrics>>,
}

fn avg_precision(metrics: &[QueryMetrics], key: &str) -> f64 {
    let values: Vec<f64> = metrics
        .iter()
        .filter_map(|m| m.precision.as_ref())
        .filter_map(|p| p.get(key).copied())
        .collect();
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Aggregate raw per-query metrics into per-preset summaries.
pub fn summarize(raw_results: &BTreeMap<String, Vec<QueryMetrics>>) -> BTreeMap<String, PresetSummary> {
    let mut summary = BTreeMap::new();
    for (preset, metrics) in raw_results {
        if metrics.is_empty() {
            continue;
        }

        let mut novelty_totals: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for novelty in metrics.iter().filter_map(|m| m.novelty.as_ref()) {
            for (key, value) in novelty {
                let entry = novelty_totals.entry(key.clone()).or_insert((0.0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
        }
        let avg_novelty_scores = novelty_totals
            .into_iter()
            .map(|(key, (total, count))| (key, total / count as f64))
            .collect();

        summary.insert(
            preset.clone(),
            PresetSummary {
                num_successful_runs: metrics.len(),
                avg_precision_at_3: avg_precision(metrics, "Precision@3"),
                avg_precision_at_5: avg_precision(metrics, "Precision@5"),
                avg_precision_at_10: avg_precision(metrics, "Precision@10"),
                avg_precision_at_20: avg_precision(metrics, "Precision@20"),
                avg_novelty_scores,
            },
        );
    }
    summary
}

/// Drives a batch of pipeline runs and their evaluation.
pub struct ExperimentDriver<'a> {
    pipeline: &'a Pipeline<'a>,
    text: &'a dyn TextCompletion,
    judge: &'a dyn PairwiseJudge,
    embedder: &'a dyn Embedder,
    config: &'a Config,
    summary_path: PathBuf,
}

impl<'a> ExperimentDriver<'a> {
    pub fn new(
        pipeline: &'a Pipeline<'a>,
        text: &'a dyn TextCompletion,
        judge: &'a dyn PairwiseJudge,
        embedder: &'a dyn Embedder,
        config: &'a Config,
        summary_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            pipeline,
            text,
            judge,
            embedder,
            config,
            summary_path: summary_path.into(),
        }
    }

    /// Reload a previous summary file; a corrupt file starts a fresh batch.
    fn load_previous(&self) -> ExperimentSummary {
        if !self.summary_path.exists() {
            return ExperimentSummary::default();
        }
        match std::fs::read_to_string(&self.summary_path)
            .map_err(SymposiumError::from)
            .and_then(|content| serde_json::from_str(&content).map_err(SymposiumError::from))
        {
            Ok(previous) => {
                info!(path = %self.summary_path.display(), "loaded previous results");
                previous
            }
            Err(e) => {
                warn!(error = %e, "could not load previous summary, starting fresh");
                ExperimentSummary::default()
            }
        }
    }

    /// Run the whole batch. Per-run failures are logged and skipped; the
    /// summary file is rewritten after every completed run.
    pub async fn run(
        &self,
        queries: &[String],
        presets: &[ExperimentPreset],
    ) -> Result<ExperimentSummary, SymposiumError> {
        let mut results = self.load_previous();

        for (index, query) in queries.iter().enumerate() {
            info!(index = index + 1, total = queries.len(), query = %query, "processing query");

            for preset in presets {
                let already_run = results
                    .raw_results
                    .get(&preset.name)
                    .is_some_and(|runs| runs.iter().any(|m| m.query == *query));
                if already_run {
                    info!(preset = %preset.name, "skipping already completed run");
                    continue;
                }

                match self.run_single(query, preset).await {
                    Some(metrics) => {
                        results
                            .raw_results
                            .entry(preset.name.clone())
                            .or_default()
                            .push(metrics);
                        results.summary = summarize(&results.raw_results);
                        if let Err(e) = write_json(&self.summary_path, &results) {
                            error!(error = %e, "could not persist live summary");
                        }
                    }
                    None => {
                        warn!(preset = %preset.name, query = %query, "run failed, continuing batch");
                    }
                }
            }
        }

        results.summary = summarize(&results.raw_results);
        write_json(&self.summary_path, &results)?;
        Ok(results)
    }

    async fn run_single(&self, query: &str, preset: &ExperimentPreset) -> Option<QueryMetrics> {
        let output = self.pipeline.run_query(query, &preset.modes, None).await?;
        Some(self.evaluate(query, &output).await)
    }

    /// Evaluate one completed run. Evaluation failures degrade to `None`
    /// metrics rather than discarding the run.
    async fn evaluate(&self, query: &str, output: &PipelineOutput) -> QueryMetrics {
        let precision = match self.precision_comparison(query, output).await {
            Ok(precision) => precision,
            Err(e) => {
                error!(error = %e, "precision evaluation failed");
                None
            }
        };

        let novelty = match self.novelty_averages(output).await {
            Ok(novelty) => novelty,
            Err(e) => {
                error!(error = %e, "novelty evaluation failed");
                None
            }
        };

        QueryMetrics {
            query: query.to_string(),
            precision,
            novelty,
        }
    }

    /// Tag baseline and candidate ideas, rank them in one tournament, and
    /// report Precision@N for the candidate tag.
    async fn precision_comparison(
        &self,
        query: &str,
        output: &PipelineOutput,
    ) -> Result<Option<BTreeMap<String, f64>>, SymposiumError> {
        let candidates: Vec<Idea> = output
            .state
            .final_deduplicated_ideas
            .iter()
            .map(|idea| idea.clone().with_source(CANDIDATE_SOURCE))
            .collect();
        let baseline: Vec<Idea> = zeroshot_ideas(self.text, query, ZEROSHOT_IDEA_COUNT)
            .await?
            .into_iter()
            .map(|idea| idea.with_source(BASELINE_SOURCE))
            .collect();

        let mut pool = baseline;
        pool.extend(candidates);
        if pool.is_empty() {
            warn!("no ideas available for precision comparison");
            return Ok(None);
        }

        info!(count = pool.len(), "running precision tournament");
        let ranker = TournamentRanker::new(self.config.tournament.rounds);
        let ranked = ranker.rank(&pool, self.judge).await?;
        self.pipeline
            .save_ranked_ideas(&output.run_timestamp, &ranked)?;

        let mut precision = BTreeMap::new();
        let levels = &self.config.tournament.precision_levels;
        for (n, outcome) in precision_at_n(&ranked, levels, CANDIDATE_SOURCE)? {
            match outcome {
                Precision::Value(value) => {
                    precision.insert(format!("Precision@{n}"), value);
                }
                Precision::Insufficient { have, need } => {
                    warn!(have, need, "not enough ranked ideas for Precision@{n}");
                }
            }
        }
        Ok(Some(precision))
    }

    async fn novelty_averages(
        &self,
        output: &PipelineOutput,
    ) -> Result<Option<BTreeMap<String, f64>>, SymposiumError> {
        let ideas = &output.state.final_deduplicated_ideas;
        if ideas.is_empty() {
            return Ok(None);
        }
        let mut scores = Vec::with_capacity(ideas.len());
        for idea in ideas {
            scores.push(novelty_metrics(idea, &output.papers, self.embedder).await?);
        }
        Ok(Some(average_novelty(&scores)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(query: &str, p3: Option<f64>, novelty: Option<f64>) -> QueryMetrics {
        QueryMetrics {
            query: query.to_string(),
            precision: p3.map(|v| {
                let mut map = BTreeMap::new();
                map.insert("Precision@3".to_string(), v);
                map
            }),
            novelty: novelty.map(|v| {
                let mut map = BTreeMap::new();
                map.insert("average_overall_novelty".to_string(), v);
                map
            }),
        }
    }

    #[test]
    fn test_summarize_averages_only_present_keys() {
        let mut raw = BTreeMap::new();
        raw.insert(
            "Full_System".to_string(),
            vec![
                metrics("q1", Some(0.5), Some(2.0)),
                metrics("q2", None, Some(4.0)),
                metrics("q3", Some(1.0), None),
            ],
        );
        let summary = summarize(&raw);
        let full = &summary["Full_System"];
        assert_eq!(full.num_successful_runs, 3);
        assert!((full.avg_precision_at_3 - 0.75).abs() < 1e-9);
        // Levels never reported average to zero, not NaN.
        assert_eq!(full.avg_precision_at_5, 0.0);
        assert!((full.avg_novelty_scores["average_overall_novelty"] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_skips_empty_presets() {
        let mut raw = BTreeMap::new();
        raw.insert("Empty".to_string(), Vec::new());
        assert!(summarize(&raw).is_empty());
    }

    #[test]
    fn test_summary_round_trips_through_json() {
        let mut raw = BTreeMap::new();
        raw.insert("Full_System".to_string(), vec![metrics("q", Some(0.25), None)]);
        let summary = ExperimentSummary {
            summary: summarize(&raw),
            raw_results: raw,
        };
        let json = serde_json::to_string(&summary).unwrap();
        let reloaded: ExperimentSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded.raw_results["Full_System"].len(), 1);
        assert_eq!(
            reloaded.summary["Full_System"].num_successful_runs,
            summary.summary["Full_System"].num_successful_runs
        );
    }
}
