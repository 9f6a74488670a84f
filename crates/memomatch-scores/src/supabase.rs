//! Supabase (PostgREST) score store.
//!
//! Scores live in a `game_scores` table with the columns `player_name`,
//! `score`, `difficulty`, `time_taken`, and `created_at`. Reads and writes
//! go through Supabase's REST endpoint:
//!
//! ```text
//! GET  {url}/rest/v1/game_scores?select=player_name,score,difficulty,time_taken&order=score.desc&limit=10
//! POST {url}/rest/v1/game_scores   { "player_name": ..., "created_at": ... }
//! ```

use serde::Serialize;

use crate::store::clamp_limit;
use crate::{NewScore, ScoreEntry, ScoreError, ScoreStore};

/// Table used when none is configured.
pub const DEFAULT_TABLE: &str = "game_scores";

/// Columns read back for the leaderboard.
const SELECT_COLUMNS: &str = "player_name,score,difficulty,time_taken";

/// Connection settings for a Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://abcd.supabase.co`.
    pub url: String,
    /// API key, sent both as `apikey` and as a bearer token.
    pub api_key: String,
    pub table: String,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            table: DEFAULT_TABLE.to_string(),
        }
    }

    /// Full REST endpoint of the scores table.
    pub fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.url.trim_end_matches('/'), self.table)
    }
}

/// The JSON body of one inserted row.
#[derive(Debug, Serialize)]
struct ScoreRow<'a> {
    player_name: &'a str,
    score: i64,
    difficulty: &'a str,
    time_taken: u64,
    created_at: String,
}

impl<'a> From<&'a NewScore> for ScoreRow<'a> {
    fn from(score: &'a NewScore) -> Self {
        Self {
            player_name: &score.player_name,
            score: score.score,
            difficulty: score.difficulty.as_str(),
            time_taken: score.elapsed_secs,
            created_at: score.recorded_at.to_rfc3339(),
        }
    }
}

/// A [`ScoreStore`] backed by a Supabase table.
#[derive(Debug, Clone)]
pub struct SupabaseScoreStore {
    client: reqwest::Client,
    config: SupabaseConfig,
}

impl SupabaseScoreStore {
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    /// Adds the auth headers every PostgREST call needs.
    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }
}

/// Turns a non-2xx response into a [`ScoreError::Backend`].
async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ScoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ScoreError::Backend(format!("{status}: {body}")))
}

fn unavailable(e: reqwest::Error) -> ScoreError {
    ScoreError::Unavailable(e.to_string())
}

impl ScoreStore for SupabaseScoreStore {
    async fn record_score(&self, score: NewScore) -> Result<(), ScoreError> {
        let row = ScoreRow::from(&score);
        let response = self
            .authorized(self.client.post(self.config.endpoint()))
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await
            .map_err(unavailable)?;
        check_status(response).await?;

        tracing::debug!(player = %score.player_name, score = score.score, "score stored in supabase");
        Ok(())
    }

    async fn top_scores(&self, limit: usize) -> Result<Vec<ScoreEntry>, ScoreError> {
        let limit = clamp_limit(limit);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let response = self
            .authorized(self.client.get(self.config.endpoint()))
            .query(&[
                ("select", SELECT_COLUMNS.to_string()),
                ("order", "score.desc".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await
            .map_err(unavailable)?;

        check_status(response)
            .await?
            .json::<Vec<ScoreEntry>>()
            .await
            .map_err(|e| ScoreError::Backend(format!("unreadable leaderboard: {e}")))
    }
}
