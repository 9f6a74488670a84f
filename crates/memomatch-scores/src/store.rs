//! The [`ScoreStore`] trait and an in-memory implementation.
//!
//! Game code never talks to a database directly. It is handed something
//! that implements `ScoreStore` (the Supabase-backed store in production,
//! [`MemoryScoreStore`] in development and tests), so the server can be
//! exercised end to end without any external service.

use std::future::Future;

use tokio::sync::Mutex;

use crate::{NewScore, ScoreEntry, ScoreError};

/// How many rows the leaderboard shows when the client does not say.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

/// Upper bound on a single leaderboard read.
pub const MAX_LEADERBOARD_LIMIT: usize = 100;

/// Clamps a requested leaderboard size to [`MAX_LEADERBOARD_LIMIT`].
pub fn clamp_limit(limit: usize) -> usize {
    limit.min(MAX_LEADERBOARD_LIMIT)
}

/// Persists leaderboard entries and reads back the best ones.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` because one store is shared (behind an `Arc`)
/// by every connection task. The returned futures are `Send` so they can
/// be awaited inside `tokio::spawn`.
///
/// Implementations may be written with plain `async fn`:
///
/// ```rust
/// use memomatch_scores::{NewScore, ScoreEntry, ScoreError, ScoreStore};
///
/// /// Drops every score on the floor.
/// struct NullStore;
///
/// impl ScoreStore for NullStore {
///     async fn record_score(&self, _score: NewScore) -> Result<(), ScoreError> {
///         Ok(())
///     }
///
///     async fn top_scores(&self, _limit: usize) -> Result<Vec<ScoreEntry>, ScoreError> {
///         Ok(Vec::new())
///     }
/// }
/// ```
pub trait ScoreStore: Send + Sync + 'static {
    /// Records one leaderboard entry.
    fn record_score(
        &self,
        score: NewScore,
    ) -> impl Future<Output = Result<(), ScoreError>> + Send;

    /// Returns up to `limit` entries, highest score first.
    fn top_scores(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ScoreEntry>, ScoreError>> + Send;
}

// ---------------------------------------------------------------------------
// MemoryScoreStore
// ---------------------------------------------------------------------------

/// A process-local store. Scores are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    /// Rows in insertion order. Sorting happens on read so that equal
    /// scores keep the order they were recorded in.
    entries: Mutex<Vec<ScoreEntry>>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl ScoreStore for MemoryScoreStore {
    async fn record_score(&self, score: NewScore) -> Result<(), ScoreError> {
        tracing::debug!(
            player = %score.player_name,
            score = score.score,
            difficulty = %score.difficulty,
            "recording score in memory"
        );
        self.entries.lock().await.push(score.entry());
        Ok(())
    }

    async fn top_scores(&self, limit: usize) -> Result<Vec<ScoreEntry>, ScoreError> {
        let mut rows = self.entries.lock().await.clone();
        // `sort_by` is stable: ties stay in insertion order.
        rows.sort_by(|a, b| b.score.cmp(&a.score));
        rows.truncate(clamp_limit(limit));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use memomatch_game::Difficulty;

    fn score(name: &str, points: i64) -> NewScore {
        NewScore {
            player_name: name.into(),
            score: points,
            difficulty: Difficulty::Easy,
            elapsed_secs: 10,
            recorded_at: Utc::now(),
        }
    }

    async fn store_with(scores: &[(&str, i64)]) -> MemoryScoreStore {
        let store = MemoryScoreStore::new();
        for (name, points) in scores {
            store.record_score(score(name, *points)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_top_scores_empty_store_returns_empty() {
        let store = MemoryScoreStore::new();
        assert!(store.top_scores(10).await.unwrap().is_empty());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_top_scores_sorted_descending() {
        let store = store_with(&[("a", 500), ("b", 900), ("c", 700)]).await;

        let top = store.top_scores(10).await.unwrap();

        let scores: Vec<i64> = top.iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![900, 700, 500]);
    }

    #[tokio::test]
    async fn test_top_scores_respects_limit() {
        let entries: Vec<(String, i64)> =
            (0..15).map(|i| (format!("p{i}"), i * 10)).collect();
        let refs: Vec<(&str, i64)> =
            entries.iter().map(|(n, s)| (n.as_str(), *s)).collect();
        let store = store_with(&refs).await;

        let top = store.top_scores(DEFAULT_LEADERBOARD_LIMIT).await.unwrap();

        assert_eq!(top.len(), 10);
        assert_eq!(top[0].score, 140);
        assert_eq!(top[9].score, 50);
        assert_eq!(store.len().await, 15);
    }

    #[tokio::test]
    async fn test_top_scores_ties_keep_insertion_order() {
        let store = store_with(&[("first", 800), ("second", 800), ("third", 900)]).await;

        let top = store.top_scores(3).await.unwrap();

        let names: Vec<&str> = top.iter().map(|e| e.player_name.as_str()).collect();
        assert_eq!(names, vec!["third", "first", "second"]);
    }

    #[tokio::test]
    async fn test_top_scores_is_idempotent_without_writes() {
        let store = store_with(&[("a", 10), ("b", 20), ("c", -4)]).await;

        let first = store.top_scores(10).await.unwrap();
        let second = store.top_scores(10).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_top_scores_zero_limit_returns_empty() {
        let store = store_with(&[("a", 10)]).await;
        assert!(store.top_scores(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_score_keeps_negative_scores() {
        let store = store_with(&[("slow", -50)]).await;
        let top = store.top_scores(1).await.unwrap();
        assert_eq!(top[0].score, -50);
    }

    #[test]
    fn test_clamp_limit_caps_large_requests() {
        assert_eq!(clamp_limit(5), 5);
        assert_eq!(clamp_limit(10_000), MAX_LEADERBOARD_LIMIT);
    }
}
