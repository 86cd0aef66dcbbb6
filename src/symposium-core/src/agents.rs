//! External-capability seams and their OpenAI-compatible implementation.
//!
//! Every model invocation in the pipeline goes through one of the traits in
//! this module, so the debate loop, ranker, and orchestrator can be exercised
//! against mock implementations. `ChatAgents` is the production backend: one
//! chat-completion call per capability, structured replies parsed from bare
//! JSON at this boundary.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::IdeaPrompt;
use crate::error::SymposiumError;
use crate::idea::{
    Contribution, Criticism, Idea, Persona, QueryAnalysis, RoundSummary, TeamSelection, Timeline,
};
use crate::prompts;

/// Everything one debater turn is conditioned on.
#[derive(Debug)]
pub struct IdeaRequest<'a> {
    pub persona: &'a Persona,
    pub initial_query: &'a str,
    /// Previous round's summary, or the first-round placeholder sentinel.
    pub round_summary: &'a str,
    /// Retrieved supporting context; empty when retrieval is disabled.
    pub context: &'a str,
    /// Formatted contributions of the debaters that already spoke this round.
    pub previous_contributions: &'a str,
    pub variant: IdeaPrompt,
}

/// Structured capabilities consumed by the debate state machine.
#[async_trait]
pub trait DebateAgents: Send + Sync {
    async fn generate_persona_pool(
        &self,
        initial_query: &str,
        intention: &str,
        topics: &str,
        min_count: usize,
        max_count: usize,
    ) -> Result<Vec<Persona>, SymposiumError>;

    async fn select_team(
        &self,
        intention: &str,
        topics: &str,
        num_debaters: usize,
        candidate_list: &str,
    ) -> Result<TeamSelection, SymposiumError>;

    async fn generate_ideas(
        &self,
        request: &IdeaRequest<'_>,
    ) -> Result<Contribution, SymposiumError>;

    async fn critique(&self, proposed_ideas: &str) -> Result<Criticism, SymposiumError>;

    /// Summarize a round. `criticism` is `None` when the critic was skipped;
    /// the implementation must then use the no-critique prompt variant.
    async fn summarize(
        &self,
        proposed_ideas: &str,
        criticism: Option<&str>,
    ) -> Result<RoundSummary, SymposiumError>;

    async fn synthesize_from_history(&self, history: &str) -> Result<Vec<Idea>, SymposiumError>;

    async fn synthesize_from_final_round(
        &self,
        final_round_ideas: &str,
        final_criticism: &str,
    ) -> Result<Vec<Idea>, SymposiumError>;

    async fn write_abstract(
        &self,
        idea_title: &str,
        idea_description: &str,
    ) -> Result<String, SymposiumError>;
}

/// Raw-text completion capability, used by query decomposition, the
/// literature-review loop, and the tournament judge.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, SymposiumError>;
}

/// Head-to-head idea comparison. Returns the judge's raw reply text; the
/// tournament ranker owns the interpretation policy.
#[async_trait]
pub trait PairwiseJudge: Send + Sync {
    async fn better_idea(&self, first: &Idea, second: &Idea) -> Result<String, SymposiumError>;
}

/// Extract the JSON object from a model reply and deserialize it.
///
/// Replies are asked for as bare JSON but models routinely wrap them in prose
/// or code fences, so the object is located between the first `{` and the
/// last `}` before parsing. Failures carry the offending text.
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, SymposiumError> {
    let start = text.find('{');
    let end = text.rfind('}');
    let (start, end) = match (start, end) {
        (Some(s), Some(e)) if s < e => (s, e),
        _ => {
            return Err(SymposiumError::malformed(
                "no JSON object found in response",
                text,
            ));
        }
    };
    serde_json::from_str(&text[start..=end])
        .map_err(|e| SymposiumError::malformed(format!("invalid JSON: {e}"), text))
}

#[derive(Debug, Deserialize)]
struct PersonaList {
    personalities: Vec<Persona>,
}

#[derive(Debug, Deserialize)]
struct FinalIdeaList {
    final_ideas: Vec<Idea>,
}

#[derive(Debug, Deserialize)]
struct AnalysisReply {
    topics: Vec<String>,
    timeline: Timeline,
    intention: String,
}

/// OpenAI-compatible chat backend for all debate capabilities.
pub struct ChatAgents {
    client: Client<OpenAIConfig>,
    model: String,
}

impl ChatAgents {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key.into())
            .with_api_base(api_base.into());
        Self {
            client: Client::with_config(config),
            model: model.into(),
        }
    }

    async fn complete_prompt(&self, prompt: &str) -> Result<String, SymposiumError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: prompt.to_string().into(),
                    name: None,
                },
            )])
            .build()?;

        let response = self.client.chat().create(request).await?;
        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        Ok(content)
    }

    async fn structured<T: DeserializeOwned>(&self, prompt: &str) -> Result<T, SymposiumError> {
        let reply = self.complete_prompt(prompt).await?;
        parse_structured(&reply)
    }
}

#[async_trait]
impl TextCompletion for ChatAgents {
    async fn complete(&self, prompt: &str) -> Result<String, SymposiumError> {
        self.complete_prompt(prompt).await
    }
}

#[async_trait]
impl DebateAgents for ChatAgents {
    async fn generate_persona_pool(
        &self,
        initial_query: &str,
        intention: &str,
        topics: &str,
        min_count: usize,
        max_count: usize,
    ) -> Result<Vec<Persona>, SymposiumError> {
        let prompt = prompts::fill(
            prompts::PERSONA_POOL_PROMPT,
            &[
                ("initial_query", initial_query),
                ("intention", intention),
                ("topics", topics),
                ("min_count", &min_count.to_string()),
                ("max_count", &max_count.to_string()),
            ],
        );
        let pool: PersonaList = self.structured(&prompt).await?;
        for persona in &pool.personalities {
            persona.validate()?;
        }
        Ok(pool.personalities)
    }

    async fn select_team(
        &self,
        intention: &str,
        topics: &str,
        num_debaters: usize,
        candidate_list: &str,
    ) -> Result<TeamSelection, SymposiumError> {
        let prompt = prompts::fill(
            prompts::TEAM_SELECTION_PROMPT,
            &[
                ("intention", intention),
                ("topics", topics),
                ("num_debaters", &num_debaters.to_string()),
                ("candidate_list", candidate_list),
            ],
        );
        let selection: TeamSelection = self.structured(&prompt).await?;
        for member in &selection.selections {
            member.persona.validate()?;
        }
        Ok(selection)
    }

    async fn generate_ideas(
        &self,
        request: &IdeaRequest<'_>,
    ) -> Result<Contribution, SymposiumError> {
        let template = match request.variant {
            IdeaPrompt::Default => prompts::IDEA_GENERATION_PROMPT,
            IdeaPrompt::Ablation => prompts::ABLATION_IDEA_GENERATION_PROMPT,
        };
        let prompt = prompts::fill(
            template,
            &[
                ("persona_name", &request.persona.name),
                ("persona_background", &request.persona.background),
                ("persona_viewpoint", &request.persona.viewpoint),
                ("initial_query", request.initial_query),
                ("round_summary", request.round_summary),
                ("context", request.context),
                ("previous_contributions", request.previous_contributions),
            ],
        );
        let contribution: Contribution = self.structured(&prompt).await?;
        for idea in &contribution.proposed_ideas {
            idea.validate()?;
        }
        Ok(contribution)
    }

    async fn critique(&self, proposed_ideas: &str) -> Result<Criticism, SymposiumError> {
        let prompt = prompts::fill(prompts::CRITIC_PROMPT, &[("proposed_ideas", proposed_ideas)]);
        self.structured(&prompt).await
    }

    async fn summarize(
        &self,
        proposed_ideas: &str,
        criticism: Option<&str>,
    ) -> Result<RoundSummary, SymposiumError> {
        let prompt = match criticism {
            Some(criticism) => prompts::fill(
                prompts::ROUND_SUMMARY_PROMPT,
                &[("proposed_ideas", proposed_ideas), ("criticism", criticism)],
            ),
            None => prompts::fill(
                prompts::ABLATION_ROUND_SUMMARY_PROMPT,
                &[("proposed_ideas", proposed_ideas)],
            ),
        };
        self.structured(&prompt).await
    }

    async fn synthesize_from_history(&self, history: &str) -> Result<Vec<Idea>, SymposiumError> {
        let prompt = prompts::fill(prompts::FINAL_SYNTHESIS_PROMPT, &[("history", history)]);
        let list: FinalIdeaList = self.structured(&prompt).await?;
        for idea in &list.final_ideas {
            idea.validate()?;
        }
        Ok(list.final_ideas)
    }

    async fn synthesize_from_final_round(
        &self,
        final_round_ideas: &str,
        final_criticism: &str,
    ) -> Result<Vec<Idea>, SymposiumError> {
        let prompt = prompts::fill(
            prompts::ABLATION_FINAL_SYNTHESIS_PROMPT,
            &[
                ("final_round_ideas", final_round_ideas),
                ("final_criticism", final_criticism),
            ],
        );
        let list: FinalIdeaList = self.structured(&prompt).await?;
        for idea in &list.final_ideas {
            idea.validate()?;
        }
        Ok(list.final_ideas)
    }

    async fn write_abstract(
        &self,
        idea_title: &str,
        idea_description: &str,
    ) -> Result<String, SymposiumError> {
        let prompt = prompts::fill(
            prompts::ABSTRACT_GENERATION_PROMPT,
            &[
                ("idea_title", idea_title),
                ("idea_description", idea_description),
            ],
        );
        self.complete_prompt(&prompt).await
    }
}

/// Judge backed by a raw-text completion capability. The prompt frames the
/// two ideas as competing conference submissions and asks for a bare 1 or 2.
pub struct LlmJudge<'a> {
    llm: &'a dyn TextCompletion,
}

impl<'a> LlmJudge<'a> {
    pub fn new(llm: &'a dyn TextCompletion) -> Self {
        Self { llm }
    }

    fn format_idea(idea: &Idea) -> String {
        // Prefer the generated abstract; fall back to the description.
        let body = idea
            .abstract_text
            .as_deref()
            .unwrap_or(idea.description.as_str());
        format!("Title: {}\nAbstract: {}", idea.title, body)
    }
}

#[async_trait]
impl PairwiseJudge for LlmJudge<'_> {
    async fn better_idea(&self, first: &Idea, second: &Idea) -> Result<String, SymposiumError> {
        let prompt = format!(
            "You are a reviewer specialized in Natural Language Processing and Large Language Models. \
             You are given two research project summaries. One of them is likely to be accepted by a top \
             AI conference (like ICLR or ACL) and the other one is likely to be rejected. Your task is to \
             identify the one with higher potential.\n\n\
             The two project proposals are:\n\n\
             Paper 1:\n{}\n\n\
             Paper 2:\n{}\n\n\
             Now, decide which one is the better idea. Directly return a number 1 or 2 and nothing else.",
            Self::format_idea(first),
            Self::format_idea(second),
        );
        self.llm.complete(&prompt).await
    }
}

/// Decompose a free-text research query into topics, timeline, and intention.
pub async fn analyze_query(
    llm: &dyn TextCompletion,
    query: &str,
) -> Result<QueryAnalysis, SymposiumError> {
    let prompt = prompts::fill(prompts::QUERY_ANALYSIS_PROMPT, &[("query", query)]);
    let reply = llm.complete(&prompt).await?;
    let analysis: AnalysisReply = parse_structured(&reply)?;
    Ok(QueryAnalysis {
        query: query.to_string(),
        topics: analysis.topics,
        timeline: analysis.timeline,
        intention: analysis.intention,
    })
}

/// Generate a flat list of ideas directly from the query, with no debate.
/// Used as the baseline idea set for precision comparisons.
pub async fn zeroshot_ideas(
    llm: &dyn TextCompletion,
    initial_query: &str,
    num_ideas: usize,
) -> Result<Vec<Idea>, SymposiumError> {
    let prompt = prompts::fill(
        prompts::ZEROSHOT_IDEAS_PROMPT,
        &[
            ("initial_query", initial_query),
            ("num_ideas", &num_ideas.to_string()),
        ],
    );
    let reply = llm.complete(&prompt).await?;
    let list: FinalIdeaList = parse_structured(&reply)?;
    for idea in &list.final_ideas {
        idea.validate()?;
    }
    Ok(list.final_ideas)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_structured_strips_surrounding_prose() {
        let reply = "Sure, here you go:\n```json\n{\"critique\": \"too vague\"}\n```";
        let criticism: Criticism = parse_structured(reply).unwrap();
        assert_eq!(criticism.critique, "too vague");
    }

    #[test]
    fn test_parse_structured_no_object_is_malformed() {
        let err = parse_structured::<Criticism>("I cannot answer that.").unwrap_err();
        match err {
            SymposiumError::MalformedOutput { text, .. } => {
                assert!(text.contains("I cannot answer that."));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_structured_missing_field_is_malformed() {
        let err = parse_structured::<Criticism>("{\"summary\": \"wrong shape\"}").unwrap_err();
        assert!(matches!(err, SymposiumError::MalformedOutput { .. }));
    }

    struct CannedLlm(String);

    #[async_trait]
    impl TextCompletion for CannedLlm {
        async fn complete(&self, _prompt: &str) -> Result<String, SymposiumError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_analyze_query_keeps_original_query() {
        let llm = CannedLlm(
            "{\"topics\": [\"agents\"], \"timeline\": {\"start_date\": null, \
             \"end_date\": null, \"specific_year\": 2024}, \"intention\": \"survey\"}"
                .to_string(),
        );
        let analysis = analyze_query(&llm, "multi-agent llm systems").await.unwrap();
        assert_eq!(analysis.query, "multi-agent llm systems");
        assert_eq!(analysis.topics, vec!["agents".to_string()]);
        assert_eq!(analysis.timeline.specific_year, Some(2024));
    }

    #[tokio::test]
    async fn test_zeroshot_ideas_rejects_blank_titles() {
        let llm = CannedLlm(
            "{\"final_ideas\": [{\"title\": \"\", \"description\": \"d\", \"reasoning\": \"r\"}]}"
                .to_string(),
        );
        assert!(zeroshot_ideas(&llm, "q", 5).await.is_err());
    }

    #[tokio::test]
    async fn test_judge_prompt_asks_for_bare_number() {
        struct EchoLlm;
        #[async_trait]
        impl TextCompletion for EchoLlm {
            async fn complete(&self, prompt: &str) -> Result<String, SymposiumError> {
                Ok(prompt.to_string())
            }
        }
        let llm = EchoLlm;
        let judge = LlmJudge::new(&llm);
        let a = Idea::new("A", "da", "ra").unwrap().with_abstract("abs-a");
        let b = Idea::new("B", "db", "rb").unwrap();
        let prompt = judge.better_idea(&a, &b).await.unwrap();
        assert!(prompt.contains("Paper 1:\nTitle: A\nAbstract: abs-a"));
        assert!(prompt.contains("Paper 2:\nTitle: B\nAbstract: db"));
        assert!(prompt.contains("Directly return a number 1 or 2"));
    }
}
