//! Prompt templates for the debate capabilities.
//!
//! Templates use `{placeholder}` substitution. Structured-output prompts end
//! with a JSON schema instruction; replies are parsed at the agent boundary.

/// Substitute `{key}` placeholders in a template.
pub fn fill(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut text = template.to_string();
    for (key, value) in substitutions {
        text = text.replace(&format!("{{{key}}}"), value);
    }
    text
}

pub const PERSONA_POOL_PROMPT: &str = r#"You are assembling a panel of scientist debaters for a research ideation session.

RESEARCH QUERY: {initial_query}
USER INTENTION: {intention}
KEY TOPICS: {topics}

Generate between {min_count} and {max_count} candidate debater personas. Each persona must have a distinct professional background and a specific, potentially controversial viewpoint on the query. Favor disciplinary diversity and productive disagreement.

Respond with a single JSON object and nothing else, in this exact shape:
{"personalities": [{"name": "...", "background": "...", "viewpoint": "..."}]}
"#;

pub const TEAM_SELECTION_PROMPT: &str = r#"You are the moderator of a research ideation debate.

USER INTENTION: {intention}
KEY TOPICS: {topics}

From the candidate pool below, select exactly {num_debaters} personas whose combined backgrounds and viewpoints will produce the most productive debate. Give a short reason for each selection.

CANDIDATE POOL:
{candidate_list}

Respond with a single JSON object and nothing else, in this exact shape:
{"selections": [{"persona": {"name": "...", "background": "...", "viewpoint": "..."}, "reason": "..."}]}
"#;

pub const IDEA_GENERATION_PROMPT: &str = r#"You are {persona_name}, {persona_background}.
Your viewpoint: {persona_viewpoint}

You are participating in round-table idea generation on the research query:
{initial_query}

Summary of the previous round:
{round_summary}

Supporting literature context:
{context}

Contributions made so far in this round:
{previous_contributions}

Propose 2-4 novel research ideas from your viewpoint. Build on, sharpen, or deliberately contradict the contributions above. For each idea give a title, a detailed description, and the reasoning that led you to it.

Respond with a single JSON object and nothing else, in this exact shape:
{"debater_name": "{persona_name}", "proposed_ideas": [{"title": "...", "description": "...", "reasoning": "..."}]}
"#;

pub const ABLATION_IDEA_GENERATION_PROMPT: &str = r#"You are {persona_name}, {persona_background}.
Your viewpoint: {persona_viewpoint}

Research query:
{initial_query}

Summary of the previous round:
{round_summary}

Supporting literature context:
{context}

Contributions made so far in this round:
{previous_contributions}

Propose 2-4 concrete research ideas. List each idea with a title, a detailed description, and your reasoning.

Respond with a single JSON object and nothing else, in this exact shape:
{"debater_name": "{persona_name}", "proposed_ideas": [{"title": "...", "description": "...", "reasoning": "..."}]}
"#;

pub const CRITIC_PROMPT: &str = r#"You are an impartial critic reviewing a round of proposed research ideas.

PROPOSED IDEAS:
{proposed_ideas}

Analyze the novelty, feasibility, and potential impact of every idea. Point out overlaps, weak assumptions, and missed opportunities. Be direct.

Respond with a single JSON object and nothing else, in this exact shape:
{"critique": "..."}
"#;

pub const ROUND_SUMMARY_PROMPT: &str = r#"You are the moderator of a research debate. Summarize this round for the next one.

PROPOSED IDEAS:
{proposed_ideas}

CRITIC'S ANALYSIS:
{criticism}

Write a neutral summary of the key points, conflicts, and the critic's main objections.

Respond with a single JSON object and nothing else, in this exact shape:
{"summary": "..."}
"#;

pub const ABLATION_ROUND_SUMMARY_PROMPT: &str = r#"You are the moderator of a research debate. Summarize this round for the next one.

PROPOSED IDEAS:
{proposed_ideas}

Write a neutral summary of the key points and conflicts of the round.

Respond with a single JSON object and nothing else, in this exact shape:
{"summary": "..."}
"#;

pub const FINAL_SYNTHESIS_PROMPT: &str = r#"You are the synthesizer of a multi-round research debate. Below is the full history of round summaries.

DEBATE HISTORY:
{history}

Distill the debate into a curated list of the most novel, concrete research ideas. Merge near-duplicates, drop weak proposals, and keep the reasoning that motivated each survivor.

Respond with a single JSON object and nothing else, in this exact shape:
{"final_ideas": [{"title": "...", "description": "...", "reasoning": "..."}]}
"#;

pub const ABLATION_FINAL_SYNTHESIS_PROMPT: &str = r#"You are the synthesizer of a research debate. Below are the raw ideas from the final round and the critic's analysis of them.

FINAL ROUND IDEAS:
{final_round_ideas}

CRITIC'S ANALYSIS:
{final_criticism}

Distill these into a curated list of the most novel, concrete research ideas, taking the criticism into account.

Respond with a single JSON object and nothing else, in this exact shape:
{"final_ideas": [{"title": "...", "description": "...", "reasoning": "..."}]}
"#;

pub const ABSTRACT_GENERATION_PROMPT: &str = r#"Write a full scientific abstract for the following research idea, formatted for a paper submission. Output only the abstract text.

TITLE: {idea_title}
DESCRIPTION: {idea_description}
"#;

pub const QUERY_ANALYSIS_PROMPT: &str = r#"Analyze the following research query and decompose it into structured search information.

QUERY: {query}

Extract the key topics (short noun phrases), any timeline constraints, and the user's underlying intention.

Respond with a single JSON object and nothing else, in this exact shape:
{"topics": ["..."], "timeline": {"start_date": null, "end_date": null, "specific_year": null}, "intention": "..."}
"#;

pub const ZEROSHOT_IDEAS_PROMPT: &str = r#"You are a creative research scientist.

RESEARCH QUERY: {initial_query}

Propose {num_ideas} novel research ideas addressing this query. For each idea give a title, a detailed description, and your reasoning.

Respond with a single JSON object and nothing else, in this exact shape:
{"final_ideas": [{"title": "...", "description": "...", "reasoning": "..."}]}
"#;
