//! Per-query pipeline orchestration and persisted result records.
//!
//! Sequences query decomposition, literature review, the debate, and
//! deduplication, persisting a JSON record after each major stage. Every
//! stage failure is caught here: the error is logged and the query's run
//! yields `None`, so a batch of queries keeps going. The debate itself stays
//! fatal-on-error internally; this orchestrator is the skip boundary.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::agents::{DebateAgents, TextCompletion, analyze_query};
use crate::config::{Config, DebateModes};
use crate::debate::{DebateCallback, DebateRunner, DebateState};
use crate::dedup::dedup_ideas;
use crate::embedding::Embedder;
use crate::error::SymposiumError;
use crate::idea::{Idea, Paper, QueryAnalysis, RankedIdea, Timeline};
use crate::literature::{LitReviewAgent, LiteratureSearch};
use crate::retrieval::ContextRetriever;

/// Final report for one run's literature review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LitReviewReport {
    pub initial_query: String,
    pub query_analysis: QueryAnalysisRecord,
    pub discovered_papers: Vec<Paper>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnalysisRecord {
    pub topics: Vec<String>,
    pub timeline: Timeline,
    pub intention: String,
}

/// Report written after deduplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupReport {
    pub original_query: String,
    pub intention: String,
    pub topics: Vec<String>,
    pub similarity_threshold: f32,
    pub original_idea_count: usize,
    pub deduplicated_idea_count: usize,
    pub final_ideas: Vec<Idea>,
}

/// Everything a completed run hands to evaluation.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub run_timestamp: String,
    pub state: DebateState,
    pub papers: Vec<Paper>,
}

/// Serialize `value` as pretty JSON at `path`, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SymposiumError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load a persisted workflow state. A missing file is reported as a
/// missing-artifact error so callers can log and skip the stage.
pub fn load_workflow_state(path: &Path) -> Result<DebateState, SymposiumError> {
    if !path.exists() {
        return Err(SymposiumError::MissingArtifact(path.display().to_string()));
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Sequences the stages of one research-idea generation run.
pub struct Pipeline<'a> {
    agents: &'a dyn DebateAgents,
    text: &'a dyn TextCompletion,
    search: &'a dyn LiteratureSearch,
    embedder: &'a dyn Embedder,
    retriever: &'a dyn ContextRetriever,
    config: &'a Config,
    results_dir: PathBuf,
}

impl<'a> Pipeline<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agents: &'a dyn DebateAgents,
        text: &'a dyn TextCompletion,
        search: &'a dyn LiteratureSearch,
        embedder: &'a dyn Embedder,
        retriever: &'a dyn ContextRetriever,
        config: &'a Config,
        results_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            agents,
            text,
            search,
            embedder,
            retriever,
            config,
            results_dir: results_dir.into(),
        }
    }

    pub fn workflow_state_path(&self, run_timestamp: &str) -> PathBuf {
        self.results_dir
            .join("agent_states")
            .join(format!("workflow_state_{run_timestamp}.json"))
    }

    pub fn lit_review_report_path(&self, run_timestamp: &str) -> PathBuf {
        self.results_dir
            .join("final_reports")
            .join(format!("lit_review_report_{run_timestamp}.json"))
    }

    pub fn dedup_report_path(&self, run_timestamp: &str) -> PathBuf {
        self.results_dir
            .join("final_reports")
            .join(format!("deduplicated_ideas_{run_timestamp}.json"))
    }

    pub fn ranked_ideas_path(&self, run_timestamp: &str) -> PathBuf {
        self.results_dir
            .join("evaluation_results")
            .join(format!("ranked_ideas_{run_timestamp}.json"))
    }

    /// Persist a tournament result for this run.
    pub fn save_ranked_ideas(
        &self,
        run_timestamp: &str,
        ranked: &[RankedIdea],
    ) -> Result<(), SymposiumError> {
        write_json(&self.ranked_ideas_path(run_timestamp), &ranked)
    }

    /// Run every stage for one query. Any stage failure is logged and turns
    /// the whole run into `None`; the caller decides whether to continue with
    /// other queries.
    pub async fn run_query(
        &self,
        query_text: &str,
        modes: &DebateModes,
        callback: Option<DebateCallback>,
    ) -> Option<PipelineOutput> {
        info!(query = query_text, "starting pipeline run");

        let analysis = if modes.query_decomposition {
            match analyze_query(self.text, query_text).await {
                Ok(analysis) => analysis,
                Err(e) => {
                    error!(error = %e, "query decomposition failed");
                    return None;
                }
            }
        } else {
            info!("skipping query decomposition");
            QueryAnalysis::passthrough(query_text)
        };

        let review = LitReviewAgent::new(&analysis.query, self.text, self.search);
        let papers = match review.run().await {
            Ok(papers) if !papers.is_empty() => papers,
            Ok(_) => {
                error!("literature review discovered no papers");
                return None;
            }
            Err(e) => {
                error!(error = %e, "literature review failed");
                return None;
            }
        };

        let run_timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        if let Err(e) = self.save_lit_review_report(&analysis, &papers, &run_timestamp) {
            error!(error = %e, "could not persist literature report");
            return None;
        }

        // Paper download, text extraction, and store indexing belong to the
        // external collaborators; the retriever wired by the caller serves
        // this run's collection.

        let state = DebateState::new(
            analysis.query.clone(),
            analysis.topics.clone(),
            analysis.intention.clone(),
            run_timestamp.clone(),
        );
        let mut runner =
            DebateRunner::new(self.agents, self.retriever, &self.config.debate, *modes);
        if let Some(callback) = callback {
            runner = runner.with_callback(callback);
        }

        let state = match runner.run(state).await {
            Ok(state) => state,
            Err(e) => {
                error!(error = %e, "debate run failed");
                return None;
            }
        };

        let state = if self.config.debate.generate_abstracts {
            match runner.generate_abstracts(state).await {
                Ok(state) => state,
                Err(e) => {
                    error!(error = %e, "abstract generation failed");
                    return None;
                }
            }
        } else {
            state
        };

        let mut state = state;
        let threshold = self.config.dedup.similarity_threshold;
        match dedup_ideas(&state.final_ideas, self.embedder, threshold).await {
            Ok(deduplicated) => state.final_deduplicated_ideas = deduplicated,
            Err(e) => {
                error!(error = %e, "deduplication failed");
                return None;
            }
        }

        if let Err(e) = self.save_dedup_report(&state, threshold) {
            error!(error = %e, "could not persist dedup report");
            return None;
        }
        if let Err(e) = write_json(&self.workflow_state_path(&run_timestamp), &state) {
            error!(error = %e, "could not persist workflow state");
            return None;
        }

        info!(%run_timestamp, "pipeline run complete");
        Some(PipelineOutput {
            run_timestamp,
            state,
            papers,
        })
    }

    fn save_lit_review_report(
        &self,
        analysis: &QueryAnalysis,
        papers: &[Paper],
        run_timestamp: &str,
    ) -> Result<(), SymposiumError> {
        let report = LitReviewReport {
            initial_query: analysis.query.clone(),
            query_analysis: QueryAnalysisRecord {
                topics: analysis.topics.clone(),
                timeline: analysis.timeline.clone(),
                intention: analysis.intention.clone(),
            },
            discovered_papers: papers.to_vec(),
        };
        write_json(&self.lit_review_report_path(run_timestamp), &report)
    }

    fn save_dedup_report(
        &self,
        state: &DebateState,
        threshold: f32,
    ) -> Result<(), SymposiumError> {
        let report = DedupReport {
            original_query: state.initial_query.clone(),
            intention: state.intention.clone(),
            topics: state.topics.clone(),
            similarity_threshold: threshold,
            original_idea_count: state.final_ideas.len(),
            deduplicated_idea_count: state.final_deduplicated_ideas.len(),
            final_ideas: state.final_deduplicated_ideas.clone(),
        };
        write_json(&self.dedup_report_path(&state.run_timestamp), &report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::IdeaRequest;
    use crate::config::default_config;
    use crate::idea::{
        Contribution, Criticism, Persona, RoundSummary, TeamMemberSelection, TeamSelection,
    };
    use crate::retrieval::NoRetrieval;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StubAgents;

    #[async_trait]
    impl DebateAgents for StubAgents {
        async fn generate_persona_pool(
            &self,
            _q: &str,
            _i: &str,
            _t: &str,
            min: usize,
            _max: usize,
        ) -> Result<Vec<Persona>, SymposiumError> {
            Ok((0..min)
                .map(|i| Persona::new(format!("P{i}"), "bg", "vp").unwrap())
                .collect())
        }
        async fn select_team(
            &self,
            _i: &str,
            _t: &str,
            n: usize,
            _c: &str,
        ) -> Result<TeamSelection, SymposiumError> {
            Ok(TeamSelection {
                selections: (0..n)
                    .map(|i| TeamMemberSelection {
                        persona: Persona::new(format!("P{i}"), "bg", "vp").unwrap(),
                        reason: "fits".to_string(),
                    })
                    .collect(),
            })
        }
        async fn generate_ideas(
            &self,
            request: &IdeaRequest<'_>,
        ) -> Result<Contribution, SymposiumError> {
            Ok(Contribution {
                debater_name: request.persona.name.clone(),
                proposed_ideas: vec![
                    Idea::new(format!("idea {}", request.persona.name), "d", "r").unwrap(),
                ],
            })
        }
        async fn critique(&self, _p: &str) -> Result<Criticism, SymposiumError> {
            Ok(Criticism {
                critique: "shallow".to_string(),
            })
        }
        async fn summarize(
            &self,
            _p: &str,
            _c: Option<&str>,
        ) -> Result<RoundSummary, SymposiumError> {
            Ok(RoundSummary {
                summary: "summary".to_string(),
            })
        }
        async fn synthesize_from_history(&self, _h: &str) -> Result<Vec<Idea>, SymposiumError> {
            Ok(vec![Idea::new("synth", "d", "r").unwrap()])
        }
        async fn synthesize_from_final_round(
            &self,
            _i: &str,
            _c: &str,
        ) -> Result<Vec<Idea>, SymposiumError> {
            Ok(vec![
                Idea::new("pick one", "d1", "r1").unwrap(),
                Idea::new("pick two", "d2", "r2").unwrap(),
            ])
        }
        async fn write_abstract(&self, t: &str, _d: &str) -> Result<String, SymposiumError> {
            Ok(format!("abstract {t}"))
        }
    }

    struct StubText;

    #[async_trait]
    impl TextCompletion for StubText {
        async fn complete(&self, prompt: &str) -> Result<String, SymposiumError> {
            if prompt.contains("score papers") {
                Ok("{\"p1\": 7}".to_string())
            } else if prompt.contains("literature review") {
                Ok("KeywordQuery(\"follow up\")".to_string())
            } else {
                // Query-analysis reply.
                Ok("{\"topics\": [\"agents\"], \"timeline\": {\"start_date\": null, \
                    \"end_date\": null, \"specific_year\": null}, \"intention\": \"explore\"}"
                    .to_string())
            }
        }
    }

    struct StubSearch {
        served: Mutex<bool>,
    }

    #[async_trait]
    impl LiteratureSearch for StubSearch {
        async fn search_by_keyword(
            &self,
            _k: &str,
            _l: usize,
        ) -> Result<Vec<Paper>, SymposiumError> {
            let mut served = self.served.lock().unwrap();
            if *served {
                return Ok(Vec::new());
            }
            *served = true;
            Ok(vec![Paper {
                paper_id: "p1".to_string(),
                title: "Relevant Work".to_string(),
                year: Some(2024),
                citation_count: Some(3),
                abstract_text: Some("an abstract".to_string()),
                tldr: None,
                venue: None,
                score: 0,
            }])
        }
        async fn recommendations_for_paper(
            &self,
            _p: &str,
            _l: usize,
        ) -> Result<Vec<Paper>, SymposiumError> {
            Ok(Vec::new())
        }
        async fn references_of_paper(&self, _p: &str) -> Result<Vec<Paper>, SymposiumError> {
            Ok(Vec::new())
        }
    }

    /// Search that never finds anything, to force a stage failure.
    struct EmptySearch;

    #[async_trait]
    impl LiteratureSearch for EmptySearch {
        async fn search_by_keyword(
            &self,
            _k: &str,
            _l: usize,
        ) -> Result<Vec<Paper>, SymposiumError> {
            Ok(Vec::new())
        }
        async fn recommendations_for_paper(
            &self,
            _p: &str,
            _l: usize,
        ) -> Result<Vec<Paper>, SymposiumError> {
            Ok(Vec::new())
        }
        async fn references_of_paper(&self, _p: &str) -> Result<Vec<Paper>, SymposiumError> {
            Ok(Vec::new())
        }
    }

    struct UnitEmbedder;

    #[async_trait]
    impl Embedder for UnitEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SymposiumError> {
            // Orthogonal-ish vectors derived from text length keep ideas distinct.
            Ok(texts
                .iter()
                .map(|t| {
                    let v = (t.len() % 7) as f32 + 1.0;
                    vec![v, 1.0 / v]
                })
                .collect())
        }
    }

    fn temp_results_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "symposium-pipeline-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[tokio::test]
    async fn test_run_query_persists_all_records() {
        let config = default_config();
        let results_dir = temp_results_dir("ok");
        let search = StubSearch {
            served: Mutex::new(false),
        };
        let pipeline = Pipeline::new(
            &StubAgents,
            &StubText,
            &search,
            &UnitEmbedder,
            &NoRetrieval,
            &config,
            &results_dir,
        );

        let output = pipeline
            .run_query("agents", &DebateModes::default(), None)
            .await
            .expect("pipeline should succeed");

        assert!(!output.state.final_ideas.is_empty());
        assert!(!output.state.final_deduplicated_ideas.is_empty());
        assert!(
            output.state.final_deduplicated_ideas.len() <= output.state.final_ideas.len()
        );
        assert!(pipeline.workflow_state_path(&output.run_timestamp).exists());
        assert!(pipeline.lit_review_report_path(&output.run_timestamp).exists());
        assert!(pipeline.dedup_report_path(&output.run_timestamp).exists());

        // The persisted state round-trips.
        let reloaded =
            load_workflow_state(&pipeline.workflow_state_path(&output.run_timestamp)).unwrap();
        assert_eq!(reloaded.initial_query, "agents");
        assert_eq!(reloaded.history.len(), 3);

        let _ = fs::remove_dir_all(&results_dir);
    }

    #[tokio::test]
    async fn test_run_query_returns_none_when_review_is_empty() {
        let config = default_config();
        let results_dir = temp_results_dir("empty");
        let pipeline = Pipeline::new(
            &StubAgents,
            &StubText,
            &EmptySearch,
            &UnitEmbedder,
            &NoRetrieval,
            &config,
            &results_dir,
        );

        let output = pipeline
            .run_query("agents", &DebateModes::default(), None)
            .await;
        assert!(output.is_none());
        let _ = fs::remove_dir_all(&results_dir);
    }

    #[test]
    fn test_load_workflow_state_missing_is_explicit() {
        let err = load_workflow_state(Path::new("/nonexistent/state.json")).unwrap_err();
        assert!(matches!(err, SymposiumError::MissingArtifact(_)));
    }
}
