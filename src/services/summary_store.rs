use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::CollaboratorError;
use crate::scheduler::RepositoryRef;
use crate::services::{StoredSummary, SummaryId, SummaryRepository, SummaryText};

pub const WEEKLY_SUMMARY_TYPE: &str = "weekly";

/// A year of weekly summaries.
pub const DEFAULT_MAX_PER_REPOSITORY: usize = 52;

/// Process-local summary storage. Ids start at 1 and only increase.
///
/// Keeps at most `max_per_repository` summaries per repository; persisting
/// past the cap drops that repository's oldest summary. Everything is lost
/// on restart.
#[derive(Debug)]
pub struct InMemorySummaryStore {
    summaries: RwLock<Vec<StoredSummary>>,
    next_id: AtomicU64,
    max_per_repository: usize,
}

impl Default for InMemorySummaryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySummaryStore {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_PER_REPOSITORY)
    }

    pub fn with_limit(max_per_repository: usize) -> Self {
        Self {
            summaries: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            max_per_repository: max_per_repository.max(1),
        }
    }

    pub async fn get(&self, id: SummaryId) -> Option<StoredSummary> {
        self.summaries
            .read()
            .await
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }
}

#[async_trait]
impl SummaryRepository for InMemorySummaryStore {
    async fn persist_summary(
        &self,
        repository: &RepositoryRef,
        summary: &SummaryText,
    ) -> Result<SummaryId, CollaboratorError> {
        let id = SummaryId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let stored = StoredSummary {
            id,
            repository: repository.clone(),
            summary_type: WEEKLY_SUMMARY_TYPE.to_string(),
            text: summary.clone(),
            created_at: Utc::now(),
        };
        let mut summaries = self.summaries.write().await;
        summaries.push(stored);

        let kept = summaries
            .iter()
            .filter(|s| &s.repository == repository)
            .count();
        if kept > self.max_per_repository {
            // ids increase, so the first match is the oldest
            if let Some(oldest) = summaries.iter().position(|s| &s.repository == repository) {
                let dropped = summaries.remove(oldest);
                tracing::debug!(
                    repository = %repository,
                    summary_id = %dropped.id,
                    "Dropped oldest summary"
                );
            }
        }
        tracing::debug!(repository = %repository, summary_id = %id, "Stored summary");
        Ok(id)
    }

    async fn list_summaries(
        &self,
        repository: &RepositoryRef,
    ) -> Result<Vec<StoredSummary>, CollaboratorError> {
        let summaries = self.summaries.read().await;
        let mut matching: Vec<StoredSummary> = summaries
            .iter()
            .filter(|s| &s.repository == repository)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(matching)
    }

    async fn count(&self) -> Result<usize, CollaboratorError> {
        Ok(self.summaries.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(title: &str) -> SummaryText {
        SummaryText {
            title: title.to_string(),
            content: "content".to_string(),
            key_points: vec![],
            model: "test".to_string(),
            confidence_score: 50,
            commit_count: 0,
        }
    }

    #[tokio::test]
    async fn ids_increase_and_listing_is_newest_first() {
        let store = InMemorySummaryStore::new();
        let demo: RepositoryRef = "acme/demo".parse().unwrap();
        let other: RepositoryRef = "acme/other".parse().unwrap();

        let first = store.persist_summary(&demo, &text("one")).await.unwrap();
        let second = store.persist_summary(&other, &text("two")).await.unwrap();
        let third = store.persist_summary(&demo, &text("three")).await.unwrap();

        assert_eq!(first, SummaryId(1));
        assert_eq!(second, SummaryId(2));
        assert_eq!(third, SummaryId(3));
        assert_eq!(store.count().await.unwrap(), 3);

        let listed = store.list_summaries(&demo).await.unwrap();
        let titles: Vec<&str> = listed.iter().map(|s| s.text.title.as_str()).collect();
        assert_eq!(titles, vec!["three", "one"]);
        assert!(listed.iter().all(|s| s.summary_type == WEEKLY_SUMMARY_TYPE));

        assert_eq!(store.get(second).await.unwrap().repository, other);
        assert!(store.get(SummaryId(99)).await.is_none());
    }

    #[tokio::test]
    async fn oldest_summary_dropped_past_the_per_repository_cap() {
        let store = InMemorySummaryStore::with_limit(2);
        let demo: RepositoryRef = "acme/demo".parse().unwrap();
        let other: RepositoryRef = "acme/other".parse().unwrap();

        let first = store.persist_summary(&demo, &text("one")).await.unwrap();
        store.persist_summary(&other, &text("elsewhere")).await.unwrap();
        store.persist_summary(&demo, &text("two")).await.unwrap();
        store.persist_summary(&demo, &text("three")).await.unwrap();

        let titles: Vec<String> = store
            .list_summaries(&demo)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.text.title)
            .collect();
        assert_eq!(titles, vec!["three", "two"]);
        assert!(store.get(first).await.is_none());

        // Other repositories keep their own history
        assert_eq!(store.list_summaries(&other).await.unwrap().len(), 1);
        assert_eq!(store.count().await.unwrap(), 3);
    }
}
