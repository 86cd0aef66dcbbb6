//! Debate orchestration logic.
//!
//! Runs the multi-round persona debate: pool generation, team selection,
//! idea-generation rounds with optional critique and a summary per round,
//! then final synthesis. The workflow state is one owned struct threaded
//! through the transitions; history only grows, and the round counter
//! increments exactly once per completed round.
//!
//! Capability failures are not caught here. A single failed invocation aborts
//! the whole run; the pipeline orchestrator owns the retry/skip boundary.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::agents::{DebateAgents, IdeaRequest};
use crate::config::{DebateModes, DebateSettings, RetrievalMode, SynthesisSource};
use crate::error::SymposiumError;
use crate::idea::{
    Contribution, Criticism, Idea, IdeaWithAbstract, Persona, RoundSummary, format_contributions,
};
use crate::retrieval::ContextRetriever;

/// Stands in for the previous round's summary on round one.
pub const FIRST_ROUND_SENTINEL: &str = "This is the first round.";

/// Seed for the intra-round contribution chain before anyone has spoken.
pub const NO_CONTRIBUTIONS_SENTINEL: &str =
    "No one has contributed yet in this round. You are the first.";

/// The full workflow state, persisted verbatim as the workflow state file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateState {
    pub initial_query: String,
    pub topics: Vec<String>,
    pub intention: String,
    pub run_timestamp: String,
    pub persona_pool: Vec<Persona>,
    /// The selected team, exactly `num_debaters` personas once selection ran.
    pub personalities: Vec<Persona>,
    pub current_round_number: u32,
    pub round_contributions: Vec<Contribution>,
    pub current_criticism: Option<Criticism>,
    pub current_summary: Option<RoundSummary>,
    /// Append-only log of formatted round summaries.
    pub history: Vec<String>,
    pub final_ideas: Vec<Idea>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub final_ideas_with_abstracts: Vec<IdeaWithAbstract>,
    pub final_deduplicated_ideas: Vec<Idea>,
}

impl DebateState {
    pub fn new(
        initial_query: impl Into<String>,
        topics: Vec<String>,
        intention: impl Into<String>,
        run_timestamp: impl Into<String>,
    ) -> Self {
        Self {
            initial_query: initial_query.into(),
            topics,
            intention: intention.into(),
            run_timestamp: run_timestamp.into(),
            persona_pool: Vec::new(),
            personalities: Vec::new(),
            current_round_number: 0,
            round_contributions: Vec::new(),
            current_criticism: None,
            current_summary: None,
            history: Vec::new(),
            final_ideas: Vec::new(),
            final_ideas_with_abstracts: Vec::new(),
            final_deduplicated_ideas: Vec::new(),
        }
    }

    fn topics_joined(&self) -> String {
        self.topics.join(", ")
    }
}

/// Events emitted as the debate progresses.
#[derive(Debug, Clone)]
pub enum DebateEvent {
    PoolGenerated { count: usize },
    TeamSelected { names: Vec<String> },
    RoundStarted { round: u32 },
    PersonaContributed { name: String, idea_count: usize },
    CritiqueComplete,
    RoundSummarized { round: u32 },
    SynthesisComplete { idea_count: usize },
    AbstractGenerated { index: usize, total: usize, title: String },
}

/// Callback for debate events.
pub type DebateCallback = Box<dyn Fn(DebateEvent) + Send + Sync>;

/// Render the candidate pool for the team-selection prompt.
fn candidate_list(pool: &[Persona]) -> String {
    pool.iter()
        .map(|p| {
            format!(
                "- Name: {}\n  Background: {}\n  Viewpoint: {}",
                p.name, p.background, p.viewpoint
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drives one debate from pool generation through final synthesis.
pub struct DebateRunner<'a> {
    agents: &'a dyn DebateAgents,
    retriever: &'a dyn ContextRetriever,
    settings: &'a DebateSettings,
    modes: DebateModes,
    callback: Option<DebateCallback>,
}

impl<'a> DebateRunner<'a> {
    pub fn new(
        agents: &'a dyn DebateAgents,
        retriever: &'a dyn ContextRetriever,
        settings: &'a DebateSettings,
        modes: DebateModes,
    ) -> Self {
        Self {
            agents,
            retriever,
            settings,
            modes,
            callback: None,
        }
    }

    /// Set a callback for debate events.
    pub fn with_callback(mut self, callback: DebateCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    fn emit_event(&self, event: DebateEvent) {
        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }

    /// Run the full debate, returning the terminal state.
    pub async fn run(&self, state: DebateState) -> Result<DebateState, SymposiumError> {
        let state = self.generate_persona_pool(state).await?;
        let mut state = self.select_team(state).await?;

        while state.current_round_number <= self.settings.max_rounds {
            self.emit_event(DebateEvent::RoundStarted {
                round: state.current_round_number,
            });
            state = self.idea_generation_round(state).await?;
            if self.modes.critique {
                state = self.critic_round(state).await?;
            }
            state = self.summarize_round(state).await?;
        }

        self.synthesize(state).await
    }

    async fn generate_persona_pool(
        &self,
        mut state: DebateState,
    ) -> Result<DebateState, SymposiumError> {
        info!(query = %state.initial_query, "generating persona pool");
        let pool = self
            .agents
            .generate_persona_pool(
                &state.initial_query,
                &state.intention,
                &state.topics_joined(),
                self.settings.pool_min,
                self.settings.pool_max,
            )
            .await?;
        if pool.is_empty() {
            // No candidates means no team can be selected; nothing to salvage.
            return Err(SymposiumError::EmptyPersonaPool);
        }
        self.emit_event(DebateEvent::PoolGenerated { count: pool.len() });
        state.persona_pool = pool;
        Ok(state)
    }

    async fn select_team(&self, mut state: DebateState) -> Result<DebateState, SymposiumError> {
        info!("selecting debate team from pool");
        let selection = self
            .agents
            .select_team(
                &state.intention,
                &state.topics_joined(),
                self.settings.num_debaters,
                &candidate_list(&state.persona_pool),
            )
            .await?;
        if selection.selections.len() != self.settings.num_debaters {
            return Err(SymposiumError::InvalidRecord(format!(
                "team selection returned {} personas, expected {}",
                selection.selections.len(),
                self.settings.num_debaters
            )));
        }
        let names: Vec<String> = selection
            .selections
            .iter()
            .map(|s| s.persona.name.clone())
            .collect();
        for member in &selection.selections {
            debug!(name = %member.persona.name, reason = %member.reason, "selected");
        }
        self.emit_event(DebateEvent::TeamSelected { names });

        state.personalities = selection.selections.into_iter().map(|s| s.persona).collect();
        state.current_round_number = 1;
        state.history.clear();
        Ok(state)
    }

    /// One round of idea generation: the selected personas speak in sequence,
    /// each conditioned on the formatted text of all earlier contributions in
    /// the same round (an explicit fold, not shared mutable state).
    async fn idea_generation_round(
        &self,
        mut state: DebateState,
    ) -> Result<DebateState, SymposiumError> {
        info!(round = state.current_round_number, "starting idea generation round");
        let round_summary = state
            .current_summary
            .as_ref()
            .map(|s| s.summary.clone())
            .unwrap_or_else(|| FIRST_ROUND_SENTINEL.to_string());

        let mut contributions: Vec<Contribution> = Vec::new();
        let mut previous_contributions = NO_CONTRIBUTIONS_SENTINEL.to_string();

        for persona in &state.personalities {
            let context = match self.modes.retrieval {
                RetrievalMode::Disabled => String::new(),
                RetrievalMode::InitialQuery => {
                    self.retriever
                        .retrieve(&state.run_timestamp, &state.initial_query)
                        .await?
                }
                RetrievalMode::PersonaViewpoint => {
                    let query = format!(
                        "{} from the perspective of {}",
                        state.initial_query, persona.viewpoint
                    );
                    self.retriever.retrieve(&state.run_timestamp, &query).await?
                }
            };

            let contribution = self
                .agents
                .generate_ideas(&IdeaRequest {
                    persona,
                    initial_query: &state.initial_query,
                    round_summary: &round_summary,
                    context: &context,
                    previous_contributions: &previous_contributions,
                    variant: self.modes.idea_prompt,
                })
                .await?;

            self.emit_event(DebateEvent::PersonaContributed {
                name: persona.name.clone(),
                idea_count: contribution.proposed_ideas.len(),
            });

            let chain_text = contribution.chain_text();
            if previous_contributions == NO_CONTRIBUTIONS_SENTINEL {
                previous_contributions = chain_text;
            } else {
                previous_contributions.push_str("\n\n");
                previous_contributions.push_str(&chain_text);
            }
            contributions.push(contribution);
        }

        state.round_contributions = contributions;
        Ok(state)
    }

    async fn critic_round(&self, mut state: DebateState) -> Result<DebateState, SymposiumError> {
        info!(round = state.current_round_number, "critic analyzing the round");
        let ideas_text = format_contributions(&state.round_contributions);
        let criticism = self.agents.critique(&ideas_text).await?;
        self.emit_event(DebateEvent::CritiqueComplete);
        state.current_criticism = Some(criticism);
        Ok(state)
    }

    async fn summarize_round(&self, mut state: DebateState) -> Result<DebateState, SymposiumError> {
        info!(round = state.current_round_number, "summarizing the round");
        let ideas_text = format_contributions(&state.round_contributions);
        let criticism = if self.modes.critique {
            state.current_criticism.as_ref().map(|c| c.critique.as_str())
        } else {
            None
        };
        let summary = self.agents.summarize(&ideas_text, criticism).await?;

        state.history.push(format!(
            "**Round {} Summary:**\n{}",
            state.current_round_number, summary.summary
        ));
        self.emit_event(DebateEvent::RoundSummarized {
            round: state.current_round_number,
        });
        state.current_summary = Some(summary);
        state.current_round_number += 1;
        Ok(state)
    }

    async fn synthesize(&self, mut state: DebateState) -> Result<DebateState, SymposiumError> {
        let final_ideas = match self.modes.synthesis {
            SynthesisSource::History => {
                info!("synthesizing final ideas from debate history");
                let full_history = state.history.join("\n\n");
                self.agents.synthesize_from_history(&full_history).await?
            }
            SynthesisSource::FinalRound => {
                info!("synthesizing final ideas from the final round");
                let ideas_text = format_contributions(&state.round_contributions);
                let criticism_text = state
                    .current_criticism
                    .as_ref()
                    .map(|c| c.critique.clone())
                    .unwrap_or_default();
                self.agents
                    .synthesize_from_final_round(&ideas_text, &criticism_text)
                    .await?
            }
        };
        self.emit_event(DebateEvent::SynthesisComplete {
            idea_count: final_ideas.len(),
        });
        state.final_ideas = final_ideas;
        Ok(state)
    }

    /// Expand each final idea with a scientific abstract. Downstream of the
    /// debate loop; an empty final list returns without invoking anything.
    pub async fn generate_abstracts(
        &self,
        mut state: DebateState,
    ) -> Result<DebateState, SymposiumError> {
        if state.final_ideas.is_empty() {
            state.final_ideas_with_abstracts = Vec::new();
            return Ok(state);
        }

        let total = state.final_ideas.len();
        let mut with_abstracts = Vec::with_capacity(total);
        let mut enriched = Vec::with_capacity(total);
        for (index, idea) in state.final_ideas.iter().enumerate() {
            self.emit_event(DebateEvent::AbstractGenerated {
                index: index + 1,
                total,
                title: idea.title.clone(),
            });
            let abstract_text = self
                .agents
                .write_abstract(&idea.title, &idea.description)
                .await?;
            with_abstracts.push(IdeaWithAbstract {
                title: idea.title.clone(),
                abstract_text: abstract_text.clone(),
            });
            enriched.push(idea.clone().with_abstract(abstract_text));
        }

        state.final_ideas = enriched;
        state.final_ideas_with_abstracts = with_abstracts;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdeaPrompt;
    use crate::idea::{TeamMemberSelection, TeamSelection};
    use crate::retrieval::NoRetrieval;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn persona(name: &str) -> Persona {
        Persona::new(name, "background", format!("{name} viewpoint")).unwrap()
    }

    fn canned_idea(title: &str) -> Idea {
        Idea::new(title, "description", "reasoning").unwrap()
    }

    /// Records every capability invocation and replies with canned output.
    #[derive(Default)]
    struct MockAgents {
        critique_calls: Mutex<usize>,
        summarize_criticisms: Mutex<Vec<Option<String>>>,
        retrieval_queries: Mutex<Vec<String>>,
        abstract_calls: Mutex<usize>,
        history_synthesis_input: Mutex<Option<String>>,
    }

    #[async_trait]
    impl DebateAgents for MockAgents {
        async fn generate_persona_pool(
            &self,
            _initial_query: &str,
            _intention: &str,
            _topics: &str,
            min_count: usize,
            _max_count: usize,
        ) -> Result<Vec<Persona>, SymposiumError> {
            Ok((0..min_count).map(|i| persona(&format!("P{i}"))).collect())
        }

        async fn select_team(
            &self,
            _intention: &str,
            _topics: &str,
            num_debaters: usize,
            _candidate_list: &str,
        ) -> Result<TeamSelection, SymposiumError> {
            Ok(TeamSelection {
                selections: (0..num_debaters)
                    .map(|i| TeamMemberSelection {
                        persona: persona(&format!("P{i}")),
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
                proposed_ideas: vec![canned_idea(&format!("idea by {}", request.persona.name))],
            })
        }

        async fn critique(&self, _proposed_ideas: &str) -> Result<Criticism, SymposiumError> {
            *self.critique_calls.lock().unwrap() += 1;
            Ok(Criticism {
                critique: "too incremental".to_string(),
            })
        }

        async fn summarize(
            &self,
            _proposed_ideas: &str,
            criticism: Option<&str>,
        ) -> Result<RoundSummary, SymposiumError> {
            self.summarize_criticisms
                .lock()
                .unwrap()
                .push(criticism.map(str::to_string));
            Ok(RoundSummary {
                summary: "round summary".to_string(),
            })
        }

        async fn synthesize_from_history(
            &self,
            history: &str,
        ) -> Result<Vec<Idea>, SymposiumError> {
            *self.history_synthesis_input.lock().unwrap() = Some(history.to_string());
            Ok(vec![canned_idea("synthesized A"), canned_idea("synthesized B")])
        }

        async fn synthesize_from_final_round(
            &self,
            _final_round_ideas: &str,
            _final_criticism: &str,
        ) -> Result<Vec<Idea>, SymposiumError> {
            Ok(vec![canned_idea("final round pick")])
        }

        async fn write_abstract(
            &self,
            idea_title: &str,
            _idea_description: &str,
        ) -> Result<String, SymposiumError> {
            *self.abstract_calls.lock().unwrap() += 1;
            Ok(format!("abstract for {idea_title}"))
        }
    }

    #[async_trait]
    impl ContextRetriever for MockAgents {
        async fn retrieve(
            &self,
            _run_timestamp: &str,
            query: &str,
        ) -> Result<String, SymposiumError> {
            self.retrieval_queries.lock().unwrap().push(query.to_string());
            Ok("retrieved context".to_string())
        }
    }

    fn settings(max_rounds: u32) -> DebateSettings {
        DebateSettings {
            max_rounds,
            ..DebateSettings::default()
        }
    }

    fn state() -> DebateState {
        DebateState::new(
            "quantum multi-agent simulation",
            vec!["quantum".to_string(), "agents".to_string()],
            "find simulation methods",
            "20260806_101500",
        )
    }

    #[tokio::test]
    async fn test_two_round_debate_counts_and_synthesis() {
        let agents = MockAgents::default();
        let settings = settings(2);
        let modes = DebateModes {
            synthesis: SynthesisSource::History,
            idea_prompt: IdeaPrompt::Default,
            ..DebateModes::default()
        };
        let runner = DebateRunner::new(&agents, &NoRetrieval, &settings, modes);

        let final_state = runner.run(state()).await.unwrap();

        // K completed rounds leave the counter at K+1 and K history entries.
        assert_eq!(final_state.current_round_number, 3);
        assert_eq!(final_state.history.len(), 2);
        assert!(final_state.history[0].starts_with("**Round 1 Summary:**"));
        assert!(final_state.history[1].starts_with("**Round 2 Summary:**"));
        assert_eq!(final_state.personalities.len(), 3);
        assert_eq!(
            final_state
                .final_ideas
                .iter()
                .map(|i| i.title.as_str())
                .collect::<Vec<_>>(),
            vec!["synthesized A", "synthesized B"]
        );
        // History synthesis saw both round entries joined together.
        let input = agents.history_synthesis_input.lock().unwrap().clone().unwrap();
        assert!(input.contains("**Round 1 Summary:**"));
        assert!(input.contains("**Round 2 Summary:**"));
    }

    #[tokio::test]
    async fn test_critique_disabled_never_constructs_criticism() {
        let agents = MockAgents::default();
        let settings = settings(2);
        let modes = DebateModes {
            critique: false,
            ..DebateModes::default()
        };
        let runner = DebateRunner::new(&agents, &NoRetrieval, &settings, modes);

        let final_state = runner.run(state()).await.unwrap();

        assert_eq!(*agents.critique_calls.lock().unwrap(), 0);
        assert!(final_state.current_criticism.is_none());
        // Every summarization call excluded the criticism input.
        let criticisms = agents.summarize_criticisms.lock().unwrap();
        assert_eq!(criticisms.len(), 2);
        assert!(criticisms.iter().all(Option::is_none));
    }

    #[tokio::test]
    async fn test_critique_enabled_feeds_summarizer() {
        let agents = MockAgents::default();
        let settings = settings(1);
        let runner =
            DebateRunner::new(&agents, &NoRetrieval, &settings, DebateModes::default());

        runner.run(state()).await.unwrap();

        assert_eq!(*agents.critique_calls.lock().unwrap(), 1);
        let criticisms = agents.summarize_criticisms.lock().unwrap();
        assert_eq!(criticisms.len(), 1);
        assert_eq!(criticisms[0].as_deref(), Some("too incremental"));
    }

    #[tokio::test]
    async fn test_retrieval_modes_shape_queries() {
        let agents = MockAgents::default();
        let settings = settings(1);

        let modes = DebateModes {
            retrieval: RetrievalMode::PersonaViewpoint,
            ..DebateModes::default()
        };
        let runner = DebateRunner::new(&agents, &agents, &settings, modes);
        runner.run(state()).await.unwrap();
        {
            let queries = agents.retrieval_queries.lock().unwrap();
            assert_eq!(queries.len(), 3);
            assert!(queries[0].contains("from the perspective of P0 viewpoint"));
        }

        agents.retrieval_queries.lock().unwrap().clear();
        let modes = DebateModes {
            retrieval: RetrievalMode::InitialQuery,
            ..DebateModes::default()
        };
        let runner = DebateRunner::new(&agents, &agents, &settings, modes);
        runner.run(state()).await.unwrap();
        {
            let queries = agents.retrieval_queries.lock().unwrap();
            assert!(queries.iter().all(|q| q == "quantum multi-agent simulation"));
        }

        agents.retrieval_queries.lock().unwrap().clear();
        let modes = DebateModes {
            retrieval: RetrievalMode::Disabled,
            ..DebateModes::default()
        };
        let runner = DebateRunner::new(&agents, &agents, &settings, modes);
        runner.run(state()).await.unwrap();
        assert!(agents.retrieval_queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_contribution_chain_is_sequential() {
        /// Captures the previous-contributions text each persona saw.
        #[derive(Default)]
        struct ChainSpy {
            inner: MockAgents,
            seen: Mutex<Vec<String>>,
        }

        #[async_trait]
        impl DebateAgents for ChainSpy {
            async fn generate_persona_pool(
                &self,
                q: &str,
                i: &str,
                t: &str,
                min: usize,
                max: usize,
            ) -> Result<Vec<Persona>, SymposiumError> {
                self.inner.generate_persona_pool(q, i, t, min, max).await
            }
            async fn select_team(
                &self,
                i: &str,
                t: &str,
                n: usize,
                c: &str,
            ) -> Result<TeamSelection, SymposiumError> {
                self.inner.select_team(i, t, n, c).await
            }
            async fn generate_ideas(
                &self,
                request: &IdeaRequest<'_>,
            ) -> Result<Contribution, SymposiumError> {
                self.seen
                    .lock()
                    .unwrap()
                    .push(request.previous_contributions.to_string());
                self.inner.generate_ideas(request).await
            }
            async fn critique(&self, p: &str) -> Result<Criticism, SymposiumError> {
                self.inner.critique(p).await
            }
            async fn summarize(
                &self,
                p: &str,
                c: Option<&str>,
            ) -> Result<RoundSummary, SymposiumError> {
                self.inner.summarize(p, c).await
            }
            async fn synthesize_from_history(
                &self,
                h: &str,
            ) -> Result<Vec<Idea>, SymposiumError> {
                self.inner.synthesize_from_history(h).await
            }
            async fn synthesize_from_final_round(
                &self,
                i: &str,
                c: &str,
            ) -> Result<Vec<Idea>, SymposiumError> {
                self.inner.synthesize_from_final_round(i, c).await
            }
            async fn write_abstract(&self, t: &str, d: &str) -> Result<String, SymposiumError> {
                self.inner.write_abstract(t, d).await
            }
        }

        let agents = ChainSpy::default();
        let settings = settings(1);
        let runner =
            DebateRunner::new(&agents, &NoRetrieval, &settings, DebateModes::default());
        runner.run(state()).await.unwrap();

        let seen = agents.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], NO_CONTRIBUTIONS_SENTINEL);
        assert!(seen[1].contains("Contribution from P0:"));
        assert!(!seen[1].contains("Contribution from P1:"));
        assert!(seen[2].contains("Contribution from P0:"));
        assert!(seen[2].contains("Contribution from P1:"));
    }

    #[tokio::test]
    async fn test_empty_persona_pool_is_fatal() {
        struct EmptyPool {
            inner: MockAgents,
        }

        #[async_trait]
        impl DebateAgents for EmptyPool {
            async fn generate_persona_pool(
                &self,
                _q: &str,
                _i: &str,
                _t: &str,
                _min: usize,
                _max: usize,
            ) -> Result<Vec<Persona>, SymposiumError> {
                Ok(Vec::new())
            }
            async fn select_team(
                &self,
                i: &str,
                t: &str,
                n: usize,
                c: &str,
            ) -> Result<TeamSelection, SymposiumError> {
                self.inner.select_team(i, t, n, c).await
            }
            async fn generate_ideas(
                &self,
                r: &IdeaRequest<'_>,
            ) -> Result<Contribution, SymposiumError> {
                self.inner.generate_ideas(r).await
            }
            async fn critique(&self, p: &str) -> Result<Criticism, SymposiumError> {
                self.inner.critique(p).await
            }
            async fn summarize(
                &self,
                p: &str,
                c: Option<&str>,
            ) -> Result<RoundSummary, SymposiumError> {
                self.inner.summarize(p, c).await
            }
            async fn synthesize_from_history(
                &self,
                h: &str,
            ) -> Result<Vec<Idea>, SymposiumError> {
                self.inner.synthesize_from_history(h).await
            }
            async fn synthesize_from_final_round(
                &self,
                i: &str,
                c: &str,
            ) -> Result<Vec<Idea>, SymposiumError> {
                self.inner.synthesize_from_final_round(i, c).await
            }
            async fn write_abstract(&self, t: &str, d: &str) -> Result<String, SymposiumError> {
                self.inner.write_abstract(t, d).await
            }
        }

        let agents = EmptyPool {
            inner: MockAgents::default(),
        };
        let settings = settings(1);
        let runner =
            DebateRunner::new(&agents, &NoRetrieval, &settings, DebateModes::default());
        let err = runner.run(state()).await.unwrap_err();
        assert!(matches!(err, SymposiumError::EmptyPersonaPool));
    }

    #[tokio::test]
    async fn test_abstract_generation_skips_on_empty_final_ideas() {
        let agents = MockAgents::default();
        let settings = settings(1);
        let runner =
            DebateRunner::new(&agents, &NoRetrieval, &settings, DebateModes::default());

        let state = runner.generate_abstracts(state()).await.unwrap();
        assert!(state.final_ideas_with_abstracts.is_empty());
        assert_eq!(*agents.abstract_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_abstract_generation_enriches_every_idea() {
        let agents = MockAgents::default();
        let settings = settings(1);
        let runner =
            DebateRunner::new(&agents, &NoRetrieval, &settings, DebateModes::default());

        let mut initial = state();
        initial.final_ideas = vec![canned_idea("first"), canned_idea("second")];
        let result = runner.generate_abstracts(initial).await.unwrap();

        assert_eq!(*agents.abstract_calls.lock().unwrap(), 2);
        assert_eq!(result.final_ideas_with_abstracts.len(), 2);
        assert_eq!(
            result.final_ideas_with_abstracts[0].abstract_text,
            "abstract for first"
        );
        assert_eq!(
            result.final_ideas[1].abstract_text.as_deref(),
            Some("abstract for second")
        );
    }
}
