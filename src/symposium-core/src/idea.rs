//! Data model for personas, ideas, and debate artifacts.
//!
//! All records are plain structured types with required-field validation at
//! construction time. Transformations never mutate an idea in place; they
//! produce new records identified by textual content, not object identity.

use serde::{Deserialize, Serialize};

use crate::error::SymposiumError;

/// A debater persona: who argues, from what background, championing what angle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Persona {
    /// The name of the debater, e.g. "Dr. Evelyn Reed".
    pub name: String,
    /// The professional background and mindset of the debater.
    pub background: String,
    /// The specific, and potentially controversial, angle the debater champions.
    pub viewpoint: String,
}

impl Persona {
    pub fn new(
        name: impl Into<String>,
        background: impl Into<String>,
        viewpoint: impl Into<String>,
    ) -> Result<Self, SymposiumError> {
        let persona = Self {
            name: name.into(),
            background: background.into(),
            viewpoint: viewpoint.into(),
        };
        persona.validate()?;
        Ok(persona)
    }

    /// Reject personas with blank required fields (e.g. from a model reply).
    pub fn validate(&self) -> Result<(), SymposiumError> {
        for (field, value) in [
            ("name", &self.name),
            ("background", &self.background),
            ("viewpoint", &self.viewpoint),
        ] {
            if value.trim().is_empty() {
                return Err(SymposiumError::InvalidRecord(format!(
                    "persona field '{field}' is empty"
                )));
            }
        }
        Ok(())
    }
}

/// A single novel research idea or hypothesis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Idea {
    /// A clear and concise title for the idea.
    pub title: String,
    /// A detailed description of the idea, its justification, and potential impact.
    pub description: String,
    /// The chain of thought that led to this idea, from the agent's persona.
    pub reasoning: String,
    /// Full scientific abstract, filled in by the abstract-generation step.
    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    /// Provenance tag used by downstream precision scoring, e.g. "baseline".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Tournament score, filled in by the ranker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

impl Idea {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        reasoning: impl Into<String>,
    ) -> Result<Self, SymposiumError> {
        let idea = Self {
            title: title.into(),
            description: description.into(),
            reasoning: reasoning.into(),
            abstract_text: None,
            source: None,
            score: None,
        };
        idea.validate()?;
        Ok(idea)
    }

    pub fn validate(&self) -> Result<(), SymposiumError> {
        for (field, value) in [
            ("title", &self.title),
            ("description", &self.description),
            ("reasoning", &self.reasoning),
        ] {
            if value.trim().is_empty() {
                return Err(SymposiumError::InvalidRecord(format!(
                    "idea field '{field}' is empty"
                )));
            }
        }
        Ok(())
    }

    /// Produce a new record carrying the generated abstract.
    pub fn with_abstract(mut self, abstract_text: impl Into<String>) -> Self {
        self.abstract_text = Some(abstract_text.into());
        self
    }

    /// Produce a new record carrying a provenance tag.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Content identity used for subset checks: title + description.
    pub fn content_key(&self) -> (&str, &str) {
        (&self.title, &self.description)
    }

    /// Scoring identity used by the tournament ranker. Two idea instances with
    /// identical title, description, and reasoning share one score entry.
    pub fn ranking_key(&self) -> String {
        format!(
            "Title: {}\nDescription: {}\nReasoning: {}",
            self.title, self.description, self.reasoning
        )
    }
}

/// The full contribution of one debater in a single round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contribution {
    pub debater_name: String,
    pub proposed_ideas: Vec<Idea>,
}

impl Contribution {
    /// Format for the intra-round conversational chain passed to the next debater.
    pub fn chain_text(&self) -> String {
        let mut text = format!("Contribution from {}:\n", self.debater_name);
        for idea in &self.proposed_ideas {
            text.push_str(&format!(
                "- Idea: {}\n  - Description: {}\n  - Reasoning: {}\n",
                idea.title, idea.description, idea.reasoning
            ));
        }
        text
    }

    /// Format for the critic, summarizer, and final-round synthesizer.
    pub fn ideas_text(&self) -> String {
        let lines: Vec<String> = self
            .proposed_ideas
            .iter()
            .map(|idea| {
                format!(
                    "- Title: {}\n  Description: {}\n  Reasoning: {}",
                    idea.title, idea.description, idea.reasoning
                )
            })
            .collect();
        format!("Ideas from {}:\n{}", self.debater_name, lines.join("\n"))
    }
}

/// Format all contributions of a round for critique, summary, and synthesis.
pub fn format_contributions(contributions: &[Contribution]) -> String {
    contributions
        .iter()
        .map(Contribution::ideas_text)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The critic's analysis of one round of debate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Criticism {
    pub critique: String,
}

/// The moderator's summary of one round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundSummary {
    pub summary: String,
}

/// A final idea expanded with a full scientific abstract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdeaWithAbstract {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
}

/// One selected persona and the reason for selecting it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamMemberSelection {
    pub persona: Persona,
    pub reason: String,
}

/// The selected debate team with per-member justifications.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamSelection {
    pub selections: Vec<TeamMemberSelection>,
}

/// An idea with its final tournament score and provenance tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedIdea {
    pub title: String,
    pub description: String,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub score: u32,
}

/// Date constraints extracted from a research query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Timeline {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub specific_year: Option<i32>,
}

/// Structured decomposition of a free-text research query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryAnalysis {
    pub query: String,
    pub topics: Vec<String>,
    pub timeline: Timeline,
    pub intention: String,
}

impl QueryAnalysis {
    /// Pass-through analysis for runs that skip query decomposition: the raw
    /// query becomes the single topic and the intention stays empty.
    pub fn passthrough(query: impl Into<String>) -> Self {
        let query = query.into();
        Self {
            topics: vec![query.clone()],
            timeline: Timeline::default(),
            intention: String::new(),
            query,
        }
    }
}

/// A paper discovered during literature review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paper {
    #[serde(rename = "paperId")]
    pub paper_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(rename = "citationCount", default, skip_serializing_if = "Option::is_none")]
    pub citation_count: Option<u64>,
    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tldr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    /// Relevance score assigned by the review agent, 1-10.
    #[serde(default)]
    pub score: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idea(title: &str) -> Idea {
        Idea::new(title, "some description", "some reasoning").unwrap()
    }

    #[test]
    fn test_persona_rejects_blank_field() {
        let err = Persona::new("Dr. Reed", "  ", "contrarian");
        assert!(err.is_err());
    }

    #[test]
    fn test_idea_rejects_blank_title() {
        assert!(Idea::new("", "d", "r").is_err());
    }

    #[test]
    fn test_idea_ranking_key_ignores_score_and_source() {
        let a = idea("T");
        let b = idea("T").with_source("baseline");
        assert_eq!(a.ranking_key(), b.ranking_key());
    }

    #[test]
    fn test_contribution_chain_text_format() {
        let contribution = Contribution {
            debater_name: "Dr. Reed".to_string(),
            proposed_ideas: vec![idea("Quantum agents")],
        };
        let text = contribution.chain_text();
        assert!(text.starts_with("Contribution from Dr. Reed:\n"));
        assert!(text.contains("- Idea: Quantum agents\n"));
        assert!(text.contains("  - Description: some description\n"));
    }

    #[test]
    fn test_format_contributions_joins_with_blank_line() {
        let contributions = vec![
            Contribution {
                debater_name: "A".to_string(),
                proposed_ideas: vec![idea("one")],
            },
            Contribution {
                debater_name: "B".to_string(),
                proposed_ideas: vec![idea("two")],
            },
        ];
        let text = format_contributions(&contributions);
        assert!(text.contains("Ideas from A:\n"));
        assert!(text.contains("\n\nIdeas from B:\n"));
    }

    #[test]
    fn test_query_analysis_passthrough_uses_query_as_topic() {
        let analysis = QueryAnalysis::passthrough("llm agents");
        assert_eq!(analysis.topics, vec!["llm agents".to_string()]);
        assert!(analysis.intention.is_empty());
        assert_eq!(analysis.timeline, Timeline::default());
    }

    #[test]
    fn test_idea_serializes_abstract_under_original_name() {
        let json = serde_json::to_value(idea("T").with_abstract("A")).unwrap();
        assert_eq!(json["abstract"], "A");
        assert!(json.get("abstract_text").is_none());
    }
}
