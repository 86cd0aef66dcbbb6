//! Literature discovery: a Semantic Scholar-style API client and the
//! iterative review agent that builds a scored paper bank.
//!
//! The agent alternates tool-call queries (keyword search, paper
//! recommendations, reference expansion) with model-generated follow-up
//! queries, scoring each batch of unseen papers for relevance. Rate limiting
//! is a fixed sleep before each API call; there is no retry.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{info, warn};

use crate::agents::TextCompletion;
use crate::error::SymposiumError;
use crate::idea::Paper;

const MAX_ITERATIONS: usize = 5;
const PAPERS_PER_ITERATION: usize = 10;
const GROUNDING_PAPERS_K: usize = 5;
/// Consecutive dead-end queries tolerated before the loop gives up early.
const MAX_FRUITLESS_ITERATIONS: usize = 2;

const S2_GRAPH_URL: &str = "https://api.semanticscholar.org/graph/v1";
const S2_REC_URL: &str = "https://api.semanticscholar.org/recommendations/v1/papers/forpaper";
const RATE_LIMIT_DELAY: Duration = Duration::from_secs(3);

/// External paper-search capability.
#[async_trait]
pub trait LiteratureSearch: Send + Sync {
    async fn search_by_keyword(
        &self,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<Paper>, SymposiumError>;

    async fn recommendations_for_paper(
        &self,
        paper_id: &str,
        limit: usize,
    ) -> Result<Vec<Paper>, SymposiumError>;

    async fn references_of_paper(&self, paper_id: &str) -> Result<Vec<Paper>, SymposiumError>;
}

/// Client for the Semantic Scholar graph and recommendations APIs.
pub struct SemanticScholarClient {
    client: reqwest::Client,
    api_key: Option<String>,
    graph_url: String,
    rec_url: String,
}

impl SemanticScholarClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.is_empty()),
            graph_url: S2_GRAPH_URL.to_string(),
            rec_url: S2_REC_URL.to_string(),
        }
    }

    async fn get_json(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, SymposiumError> {
        tokio::time::sleep(RATE_LIMIT_DELAY).await;
        let mut req = self.client.get(url).query(params);
        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key);
        }
        let resp = req.send().await?.error_for_status()?;
        let text = resp.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| SymposiumError::malformed(format!("invalid API JSON: {e}"), &text))
    }
}

/// Build a `Paper` from one API entry. Entries without a paper id are dropped.
fn paper_from_value(value: &serde_json::Value) -> Option<Paper> {
    let paper_id = value["paperId"].as_str()?.to_string();
    Some(Paper {
        paper_id,
        title: value["title"].as_str().unwrap_or_default().to_string(),
        year: value["year"].as_i64().map(|y| y as i32),
        citation_count: value["citationCount"].as_u64(),
        abstract_text: value["abstract"].as_str().map(str::to_string),
        tldr: value["tldr"]["text"].as_str().map(str::to_string),
        venue: value["venue"].as_str().map(str::to_string),
        score: 0,
    })
}

fn papers_from_array(value: &serde_json::Value) -> Vec<Paper> {
    value
        .as_array()
        .map(|entries| entries.iter().filter_map(paper_from_value).collect())
        .unwrap_or_default()
}

#[async_trait]
impl LiteratureSearch for SemanticScholarClient {
    async fn search_by_keyword(
        &self,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<Paper>, SymposiumError> {
        let url = format!("{}/paper/search", self.graph_url);
        let json = self
            .get_json(
                &url,
                &[
                    ("query", keyword.to_string()),
                    ("limit", limit.to_string()),
                    (
                        "fields",
                        "title,year,citationCount,abstract,tldr,authors,venue".to_string(),
                    ),
                ],
            )
            .await?;
        Ok(papers_from_array(&json["data"]))
    }

    async fn recommendations_for_paper(
        &self,
        paper_id: &str,
        limit: usize,
    ) -> Result<Vec<Paper>, SymposiumError> {
        let url = format!("{}/{}", self.rec_url, paper_id);
        let json = self
            .get_json(
                &url,
                &[
                    ("limit", limit.to_string()),
                    (
                        "fields",
                        "title,year,citationCount,abstract,authors,venue".to_string(),
                    ),
                ],
            )
            .await?;
        Ok(papers_from_array(&json["recommendedPapers"]))
    }

    async fn references_of_paper(&self, paper_id: &str) -> Result<Vec<Paper>, SymposiumError> {
        let url = format!("{}/paper/{}", self.graph_url, paper_id);
        let json = self
            .get_json(
                &url,
                &[(
                    "fields",
                    "references.paperId,references.title,references.year".to_string(),
                )],
            )
            .await?;
        Ok(papers_from_array(&json["references"]))
    }
}

/// Drop surveys, reviews, position papers, and entries without an abstract.
pub fn filter_papers(papers: Vec<Paper>) -> Vec<Paper> {
    papers
        .into_iter()
        .filter(|paper| {
            let title = paper.title.to_lowercase();
            if title.contains("survey") || title.contains("review") || title.contains("position paper")
            {
                return false;
            }
            !paper.paper_id.is_empty() && paper.abstract_text.is_some()
        })
        .collect()
}

/// Render papers for a model prompt, preferring the abstract over the tldr.
pub fn format_papers_for_llm(papers: &[Paper], include_abstract: bool) -> String {
    let mut output = String::new();
    for paper in papers {
        output.push_str(&format!("paperId: {}\n", paper.paper_id));
        output.push_str(&format!("title: {}\n", paper.title.trim()));
        if include_abstract {
            if let Some(abstract_text) = &paper.abstract_text {
                output.push_str(&format!("abstract: {}\n", abstract_text.trim()));
            } else if let Some(tldr) = &paper.tldr {
                output.push_str(&format!("tldr: {}\n", tldr.trim()));
            }
        }
        output.push('\n');
    }
    output
}

/// Deduplicate by normalized title and by abstract text, keeping first seen.
pub fn dedup_paper_list(papers: Vec<Paper>) -> Vec<Paper> {
    let mut seen_titles = std::collections::HashSet::new();
    let mut seen_abstracts = std::collections::HashSet::new();
    let mut deduped = Vec::new();

    for paper in papers {
        let title_key: String = paper.title.to_lowercase().split_whitespace().collect();
        if seen_titles.contains(&title_key) {
            continue;
        }
        if let Some(abstract_text) = &paper.abstract_text {
            if seen_abstracts.contains(abstract_text) {
                continue;
            }
            seen_abstracts.insert(abstract_text.clone());
        }
        seen_titles.insert(title_key);
        deduped.push(paper);
    }
    deduped
}

/// One parsed tool call from the query-generation model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    Keyword(String),
    Recommendations(String),
    References(String),
}

/// Parse a `KeywordQuery("…")`-style tool call out of raw model text.
/// Reasoning blocks ending in `</think>` are stripped first.
pub fn parse_tool_call(text: &str) -> Option<ToolCall> {
    let cleaned = match text.rfind("</think>") {
        Some(pos) => text[pos + "</think>".len()..].trim(),
        None => text.trim(),
    };
    let re = Regex::new(r#"^(KeywordQuery|PaperQuery|GetReferences)\("(.+)"\)$"#).ok()?;
    let captures = re.captures(cleaned)?;
    let argument = captures[2].to_string();
    match &captures[1] {
        "KeywordQuery" => Some(ToolCall::Keyword(argument)),
        "PaperQuery" => Some(ToolCall::Recommendations(argument)),
        "GetReferences" => Some(ToolCall::References(argument)),
        _ => None,
    }
}

/// Iterative literature-review agent. Owns the paper bank for one query.
pub struct LitReviewAgent<'a> {
    initial_query: String,
    llm: &'a dyn TextCompletion,
    search: &'a dyn LiteratureSearch,
    paper_bank: HashMap<String, Paper>,
    past_queries: Vec<String>,
}

impl<'a> LitReviewAgent<'a> {
    pub fn new(
        initial_query: impl Into<String>,
        llm: &'a dyn TextCompletion,
        search: &'a dyn LiteratureSearch,
    ) -> Self {
        Self {
            initial_query: initial_query.into(),
            llm,
            search,
            paper_bank: HashMap::new(),
            past_queries: Vec::new(),
        }
    }

    /// Run the review loop and return the final scored, deduplicated list.
    pub async fn run(mut self) -> Result<Vec<Paper>, SymposiumError> {
        info!(query = %self.initial_query, "starting literature review");
        let mut current_query = format!("KeywordQuery(\"{}\")", self.initial_query);
        let mut fruitless = 0;

        for iteration in 0..MAX_ITERATIONS {
            info!(iteration = iteration + 1, total = MAX_ITERATIONS, "review iteration");

            let new_papers = self.execute_query(&current_query).await;
            let unseen: Vec<Paper> = filter_papers(new_papers)
                .into_iter()
                .filter(|p| !self.paper_bank.contains_key(&p.paper_id))
                .collect();

            if unseen.is_empty() {
                fruitless += 1;
                if fruitless >= MAX_FRUITLESS_ITERATIONS {
                    info!("query generation keeps returning dead ends, stopping early");
                    break;
                }
                current_query = self.next_query().await?;
                continue;
            }
            fruitless = 0;

            info!(count = unseen.len(), "scoring new papers");
            let scores = self.score_papers(&unseen).await?;
            for mut paper in unseen {
                paper.score = scores.get(&paper.paper_id).copied().unwrap_or(0);
                self.paper_bank.insert(paper.paper_id.clone(), paper);
            }
            info!(bank = self.paper_bank.len(), "paper bank updated");

            current_query = self.next_query().await?;
        }

        let mut final_list: Vec<Paper> = self.paper_bank.into_values().collect();
        final_list.sort_by(|a, b| b.score.cmp(&a.score));
        Ok(dedup_paper_list(final_list))
    }

    /// Execute one tool call. Transport failures and unknown formats degrade
    /// to an empty batch so the loop can ask for a fresh query.
    async fn execute_query(&mut self, query: &str) -> Vec<Paper> {
        self.past_queries.push(query.to_string());
        let Some(call) = parse_tool_call(query) else {
            warn!(query, "unknown query format");
            return Vec::new();
        };
        let result = match &call {
            ToolCall::Keyword(keyword) => {
                self.search.search_by_keyword(keyword, PAPERS_PER_ITERATION).await
            }
            ToolCall::Recommendations(paper_id) => {
                self.search
                    .recommendations_for_paper(paper_id, PAPERS_PER_ITERATION)
                    .await
            }
            ToolCall::References(paper_id) => self.search.references_of_paper(paper_id).await,
        };
        match result {
            Ok(papers) => papers,
            Err(e) => {
                warn!(error = %e, ?call, "query execution failed");
                Vec::new()
            }
        }
    }

    /// Ask the model for the next tool-call query, grounded on the bank's
    /// current top papers.
    async fn next_query(&self) -> Result<String, SymposiumError> {
        let mut sorted: Vec<&Paper> = self.paper_bank.values().collect();
        sorted.sort_by(|a, b| b.score.cmp(&a.score));
        let grounding: Vec<Paper> = sorted
            .into_iter()
            .take(GROUNDING_PAPERS_K)
            .cloned()
            .collect();
        let grounding_text = format_papers_for_llm(&grounding, false);

        let prompt = format!(
            "You are a research assistant doing a literature review. Your goal is to build a \
             comprehensive list of relevant papers.\n\n\
             You have access to the following functions:\n\
             1. KeywordQuery(\"keyword\"): Search for papers using a keyword. Good for broad exploration.\n\
             2. PaperQuery(\"paperId\"): Find papers similar to a given paper. Good for deepening a thread.\n\
             3. GetReferences(\"paperId\"): Get the papers cited by a given paper. Good for finding foundational work.\n\n\
             You have already run the following queries:\n{:?}\n\n\
             Based on the current top papers in your collection, generate a NEW, DIVERSE query to expand the search.\n\
             Current Top Papers:\n---\n{}\n---\n\n\
             Formulate your new query as a single function call (e.g., KeywordQuery(\"new deep learning methods\")).\n\
             DO NOT provide any other text or explanation.\n\
             DO NOT combine more than 3 search entities.\n\
             Each concept should be concise, not more than 3 words.",
            self.past_queries, grounding_text
        );

        let reply = self.llm.complete(&prompt).await?;
        Ok(reply.trim().to_string())
    }

    /// Score a batch of papers 1-10 for relevance. An unparseable score map
    /// degrades to zero scores rather than failing the review.
    async fn score_papers(&self, papers: &[Paper]) -> Result<HashMap<String, i64>, SymposiumError> {
        if papers.is_empty() {
            return Ok(HashMap::new());
        }
        let papers_text = format_papers_for_llm(papers, true);
        let prompt = format!(
            "You are a research assistant. Your task is to score papers for their relevance to the \
             following research topic:\n\"{}\"\n\n\
             Score each paper from 1 to 10 based on its direct relevance. A score of 10 means it is \
             extremely relevant. Focus on papers that propose novel methods or findings. Give lower \
             scores to surveys, reviews, or tangentially related work.\n\n\
             Here are the papers to score:\n---\n{}\n---\n\n\
             Provide your response as a single JSON object where keys are paperIds and values are the \
             integer scores. Example: {{\"paperId1\": 8, \"paperId2\": 5}}",
            self.initial_query, papers_text
        );
        let reply = self.llm.complete(&prompt).await?;
        match parse_score_map(&reply) {
            Ok(scores) => Ok(scores),
            Err(e) => {
                warn!(error = %e, "could not decode scoring reply");
                Ok(HashMap::new())
            }
        }
    }
}

fn parse_score_map(text: &str) -> Result<HashMap<String, i64>, SymposiumError> {
    let start = text.find('{');
    let end = text.rfind('}');
    let (start, end) = match (start, end) {
        (Some(s), Some(e)) if s < e => (s, e),
        _ => return Err(SymposiumError::malformed("no JSON object in scores", text)),
    };
    let value: serde_json::Value = serde_json::from_str(&text[start..=end])
        .map_err(|e| SymposiumError::malformed(format!("invalid score JSON: {e}"), text))?;
    let object = value
        .as_object()
        .ok_or_else(|| SymposiumError::malformed("scores are not an object", text))?;
    Ok(object
        .iter()
        .filter_map(|(k, v)| v.as_i64().map(|score| (k.clone(), score)))
        .collect())
}
