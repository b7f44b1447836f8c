use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::config::SummarizerConfig;
use crate::error::CollaboratorError;
use crate::scheduler::RepositoryRef;
use crate::services::{CommitSummary, Summarizer, SummaryText};

/// Deterministic weekly digest built from commit metadata.
///
/// Produces a short paragraph of activity statistics followed by the most
/// recent commit subjects as highlights.
#[derive(Debug, Clone)]
pub struct DigestSummarizer {
    model_name: String,
    max_highlights: usize,
}

impl Default for DigestSummarizer {
    fn default() -> Self {
        Self::new(&SummarizerConfig::default())
    }
}

impl DigestSummarizer {
    pub fn new(config: &SummarizerConfig) -> Self {
        Self {
            model_name: config.model_name.clone(),
            max_highlights: config.max_highlights,
        }
    }

    fn highlights(&self, commits: &[CommitSummary]) -> Vec<String> {
        let mut ordered: Vec<&CommitSummary> = commits.iter().collect();
        ordered.sort_by(|a, b| b.authored_at.cmp(&a.authored_at));

        let mut seen = BTreeSet::new();
        ordered
            .into_iter()
            .map(CommitSummary::subject)
            .filter(|s| !s.is_empty() && !s.starts_with("Merge "))
            .filter(|s| seen.insert(s.to_string()))
            .take(self.max_highlights)
            .map(str::to_string)
            .collect()
    }
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{} {}", count, word)
    } else {
        format!("{} {}s", count, word)
    }
}

/// Heuristic 0-100 quality score for generated summary text.
pub fn confidence_score(content: &str) -> u8 {
    let len = content.chars().count();
    let mut score: i32 = 50;

    if len > 100 {
        score += 20;
    } else if len > 50 {
        score += 10;
    }

    if content.split('.').count() > 2 {
        score += 15;
    }

    let lower = content.to_lowercase();
    if ["repository", "project", "software", "application"]
        .iter()
        .any(|w| lower.contains(w))
    {
        score += 10;
    }

    if len < 50 {
        score -= 30;
    } else if len > 2000 {
        score -= 20;
    }

    let words: Vec<&str> = lower.split_whitespace().collect();
    let unique: BTreeSet<&str> = words.iter().copied().collect();
    if (unique.len() as f64) < words.len() as f64 * 0.7 {
        score -= 15;
    }

    score.clamp(0, 100) as u8
}

#[async_trait]
impl Summarizer for DigestSummarizer {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn summarize(
        &self,
        repository: &RepositoryRef,
        commits: &[CommitSummary],
    ) -> Result<SummaryText, CollaboratorError> {
        if commits.is_empty() {
            let content = format!(
                "No commits landed in the {} repository during the past week.",
                repository
            );
            return Ok(SummaryText {
                title: format!("Weekly summary for {}: no activity", repository),
                confidence_score: confidence_score(&content),
                content,
                key_points: Vec::new(),
                model: self.model_name.clone(),
                commit_count: 0,
            });
        }

        let authors: BTreeSet<&str> = commits
            .iter()
            .map(|c| {
                if c.author_name.is_empty() {
                    c.author_email.as_str()
                } else {
                    c.author_name.as_str()
                }
            })
            .filter(|a| !a.is_empty())
            .collect();
        let additions: u64 = commits.iter().map(|c| c.additions).sum();
        let deletions: u64 = commits.iter().map(|c| c.deletions).sum();
        let key_points = self.highlights(commits);

        let mut content = format!(
            "{} landed in the {} repository over the past week from {}. \
             The changes added {} and removed {}.",
            plural(commits.len(), "commit"),
            repository,
            plural(authors.len(), "contributor"),
            plural(additions as usize, "line"),
            plural(deletions as usize, "line"),
        );
        if !key_points.is_empty() {
            content.push_str("\n\nHighlights:");
            for point in &key_points {
                content.push_str("\n- ");
                content.push_str(point);
            }
        }

        if content.trim().is_empty() {
            return Err(CollaboratorError::Summarizer(
                "Generated summary is empty".to_string(),
            ));
        }

        tracing::debug!(
            repository = %repository,
            commits = commits.len(),
            highlights = key_points.len(),
            "Generated weekly digest"
        );

        Ok(SummaryText {
            title: format!("Weekly summary for {}", repository),
            confidence_score: confidence_score(&content),
            content,
            key_points,
            model: self.model_name.clone(),
            commit_count: commits.len(),
        })
    }
}
