//! Configuration module for loading TOML config files.
//!
//! Carries the debate constants, dedup/tournament parameters, and model
//! names, plus the consolidated debate-mode enums that replace the four
//! independent ablation booleans of earlier revisions.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::SymposiumError;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub debate: DebateSettings,
    #[serde(default)]
    pub dedup: DedupSettings,
    #[serde(default)]
    pub tournament: TournamentSettings,
    #[serde(default)]
    pub models: ModelSettings,
}

/// Parameters of the debate state machine.
#[derive(Debug, Clone, Deserialize)]
pub struct DebateSettings {
    /// Rounds of idea generation before final synthesis.
    pub max_rounds: u32,
    /// Debaters selected onto the team.
    pub num_debaters: usize,
    /// Lower bound on the generated persona pool.
    pub pool_min: usize,
    /// Upper bound on the generated persona pool.
    pub pool_max: usize,
    /// Documents retrieved as supporting context per debater turn.
    pub retrieved_docs: usize,
    /// Whether to expand final ideas with scientific abstracts.
    pub generate_abstracts: bool,
}

impl Default for DebateSettings {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            num_debaters: 3,
            pool_min: 5,
            pool_max: 10,
            retrieved_docs: 3,
            generate_abstracts: false,
        }
    }
}

/// Parameters of the idea deduplicator.
#[derive(Debug, Clone, Deserialize)]
pub struct DedupSettings {
    /// Pairwise cosine similarity above which a later idea is suppressed.
    pub similarity_threshold: f32,
}

impl Default for DedupSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
        }
    }
}

/// Parameters of the tournament ranker.
#[derive(Debug, Clone, Deserialize)]
pub struct TournamentSettings {
    /// Shuffle-and-pair rounds per tournament.
    pub rounds: usize,
    /// N values for Precision@N reporting.
    pub precision_levels: Vec<usize>,
}

impl Default for TournamentSettings {
    fn default() -> Self {
        Self {
            rounds: 10,
            precision_levels: vec![3, 5, 10, 20],
        }
    }
}

/// Model names for the external capabilities.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelSettings {
    pub chat_model: String,
    pub judge_model: String,
    pub embedding_model: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            chat_model: "mistral-medium-latest".to_string(),
            judge_model: "mistral-medium-latest".to_string(),
            embedding_model: "all-MiniLM-L6-v2".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SymposiumError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| SymposiumError::ConfigError(format!("Failed to read config: {}", e)))?;
        Self::from_str(&content)
    }

    /// Load configuration from string content.
    pub fn from_str(content: &str) -> Result<Self, SymposiumError> {
        toml::from_str(content)
            .map_err(|e| SymposiumError::ConfigError(format!("Failed to parse config: {}", e)))
    }
}

/// Default configuration embedded in the binary.
pub fn default_config() -> Config {
    Config {
        debate: DebateSettings::default(),
        dedup: DedupSettings::default(),
        tournament: TournamentSettings::default(),
        models: ModelSettings::default(),
    }
}

/// Where final synthesis draws its input from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisSource {
    /// Synthesize from the full accumulated history of round summaries.
    History,
    /// Synthesize from the final round's raw contributions and criticism only.
    #[default]
    FinalRound,
}

/// How supporting context is retrieved for each debater turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    /// Query the store with "<initial query> from the perspective of <viewpoint>".
    #[default]
    PersonaViewpoint,
    /// Query the store with the bare initial query.
    InitialQuery,
    /// Skip retrieval entirely; debaters get no supporting context.
    Disabled,
}

/// Which idea-generation prompt variant the debaters receive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeaPrompt {
    Default,
    #[default]
    Ablation,
}

/// The complete mode selection for one pipeline run. One struct with named
/// enums instead of scattered booleans, so invalid combinations cannot be
/// expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebateModes {
    pub synthesis: SynthesisSource,
    pub retrieval: RetrievalMode,
    pub idea_prompt: IdeaPrompt,
    /// When false the critic state is skipped and no criticism is produced.
    pub critique: bool,
    /// When false the raw query is used unanalyzed (single topic, no intention).
    pub query_decomposition: bool,
}

impl Default for DebateModes {
    fn default() -> Self {
        Self {
            synthesis: SynthesisSource::default(),
            retrieval: RetrievalMode::default(),
            idea_prompt: IdeaPrompt::default(),
            critique: true,
            query_decomposition: true,
        }
    }
}

/// A named mode combination for batch experiments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentPreset {
    pub name: String,
    pub modes: DebateModes,
}

impl ExperimentPreset {
    pub fn new(name: impl Into<String>, modes: DebateModes) -> Self {
        Self {
            name: name.into(),
            modes,
        }
    }

    /// The standard experiment grid. The full-system baseline synthesizes from
    /// the final round; `With_Synthesizer` adds the history-based synthesizer.
    pub fn standard_set() -> Vec<ExperimentPreset> {
        vec![
            ExperimentPreset::new("Full_System", DebateModes::default()),
            ExperimentPreset::new(
                "With_Synthesizer",
                DebateModes {
                    synthesis: SynthesisSource::History,
                    idea_prompt: IdeaPrompt::Default,
                    ..DebateModes::default()
                },
            ),
            ExperimentPreset::new(
                "No_Critique",
                DebateModes {
                    critique: false,
                    ..DebateModes::default()
                },
            ),
            ExperimentPreset::new(
                "No_RAG",
                DebateModes {
                    retrieval: RetrievalMode::Disabled,
                    ..DebateModes::default()
                },
            ),
            ExperimentPreset::new(
                "No_Viewpoint",
                DebateModes {
                    retrieval: RetrievalMode::InitialQuery,
                    ..DebateModes::default()
                },
            ),
            ExperimentPreset::new(
                "No_Query_Decomposition",
                DebateModes {
                    query_decomposition: false,
                    ..DebateModes::default()
                },
            ),
        ]
    }

    /// Look up a preset by name in the standard set.
    pub fn by_name(name: &str) -> Option<ExperimentPreset> {
        Self::standard_set().into_iter().find(|p| p.name == name)
    }
}
