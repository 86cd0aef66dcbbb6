//! Head-to-head tournament ranking and Precision@N.
//!
//! Every idea starts at score 1 so it carries nonzero weight before any
//! match. Each round shuffles the pool, pairs adjacent ideas, and asks the
//! judge which of the two is superior; an odd pool gives the unpaired idea a
//! +1 bye. Scoring identity is the exact (title, description, reasoning)
//! text: callers must keep idea text unique or scores merge across instances.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{info, warn};

use crate::agents::PairwiseJudge;
use crate::error::SymposiumError;
use crate::idea::{Idea, RankedIdea};

const JUDGE_RETRIES: usize = 3;
const JUDGE_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Tournament over a fixed number of shuffle-and-pair rounds.
pub struct TournamentRanker {
    rounds: usize,
    retry_delay: Duration,
}

impl TournamentRanker {
    pub fn new(rounds: usize) -> Self {
        Self {
            rounds,
            retry_delay: JUDGE_RETRY_DELAY,
        }
    }

    /// Override the delay between judge retries (tests use zero).
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Rank with a caller-supplied RNG, for deterministic pairing in tests.
    pub async fn rank_with_rng<R: Rng>(
        &self,
        ideas: &[Idea],
        judge: &dyn PairwiseJudge,
        rng: &mut R,
    ) -> Result<Vec<RankedIdea>, SymposiumError> {
        if ideas.is_empty() {
            return Ok(Vec::new());
        }

        let mut scores: HashMap<String, u32> =
            ideas.iter().map(|idea| (idea.ranking_key(), 1)).collect();
        let mut pool: Vec<Idea> = ideas.to_vec();

        for round in 0..self.rounds {
            info!(round = round + 1, total = self.rounds, "tournament round");
            pool.shuffle(rng);

            if pool.len() % 2 != 0 {
                // Unpaired last idea sits this round out with a bye.
                if let Some(last) = pool.last() {
                    *scores.entry(last.ranking_key()).or_insert(1) += 1;
                }
            }

            for pair in pool.chunks_exact(2) {
                let reply = self.judge_with_retry(judge, &pair[0], &pair[1]).await?;
                let verdict = reply.trim();
                // Anything other than a bare "1" credits the second idea.
                // Inherited fallback policy: ambiguous replies are not retried.
                let winner = if verdict == "1" {
                    &pair[0]
                } else {
                    if verdict != "2" {
                        warn!(reply = %verdict, "ambiguous judge reply, crediting second idea");
                    }
                    &pair[1]
                };
                *scores.entry(winner.ranking_key()).or_insert(1) += 1;
            }
        }

        // Stable sort over the original pool order breaks ties by position.
        let mut order: Vec<&Idea> = ideas.iter().collect();
        order.sort_by_key(|idea| {
            std::cmp::Reverse(scores.get(&idea.ranking_key()).copied().unwrap_or(1))
        });

        Ok(order
            .into_iter()
            .map(|idea| RankedIdea {
                title: idea.title.clone(),
                description: idea.description.clone(),
                reasoning: idea.reasoning.clone(),
                source: idea.source.clone(),
                score: scores.get(&idea.ranking_key()).copied().unwrap_or(1),
            })
            .collect())
    }

    /// Rank with thread-local randomness.
    pub async fn rank(
        &self,
        ideas: &[Idea],
        judge: &dyn PairwiseJudge,
    ) -> Result<Vec<RankedIdea>, SymposiumError> {
        let mut rng = rand::thread_rng();
        self.rank_with_rng(ideas, judge, &mut rng).await
    }

    /// The only retried capability in the system: transport failures in the
    /// judging path get a fixed number of attempts with a fixed delay.
    async fn judge_with_retry(
        &self,
        judge: &dyn PairwiseJudge,
        first: &Idea,
        second: &Idea,
    ) -> Result<String, SymposiumError> {
        let mut last_error = None;
        for attempt in 0..JUDGE_RETRIES {
            if attempt > 0 {
                tokio::time::sleep(self.retry_delay).await;
            }
            match judge.better_idea(first, second).await {
                Ok(reply) => return Ok(reply),
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "judge call failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            SymposiumError::ConfigError("judge failed without reporting an error".to_string())
        }))
    }
}

/// Precision@N outcome for one level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Precision {
    Value(f64),
    /// The ranked list is shorter than N; reported explicitly, never as zero.
    Insufficient { have: usize, need: usize },
}

/// Fraction of the top N ranked ideas carrying the target provenance tag,
/// for each requested level. Levels of zero are invalid input.
pub fn precision_at_n(
    ranked: &[RankedIdea],
    levels: &[usize],
    target_source: &str,
) -> Result<BTreeMap<usize, Precision>, SymposiumError> {
    let mut results = BTreeMap::new();
    for &n in levels {
        if n == 0 {
            return Err(SymposiumError::InvalidPrecisionLevel);
        }
        if ranked.len() < n {
            results.insert(
                n,
                Precision::Insufficient {
                    have: ranked.len(),
                    need: n,
                },
            );
            continue;
        }
        let hits = ranked[..n]
            .iter()
            .filter(|idea| idea.source.as_deref() == Some(target_source))
            .count();
        results.insert(n, Precision::Value(hits as f64 / n as f64));
    }
    Ok(results)
}
