//! Memomatch server binary.
//!
//! Reads `.env` if present, then the environment (see [`ServerConfig`]).
//! With `SUPABASE_URL` and `SUPABASE_KEY` set, scores go to Supabase;
//! otherwise they are kept in memory and lost on restart.
//!
//! Log verbosity follows `RUST_LOG` and defaults to `info`.

use memomatch::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), MemomatchError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;

    #[cfg(feature = "supabase")]
    if let (Some(url), Some(key)) = (&config.supabase_url, &config.supabase_key) {
        tracing::info!(%url, "recording scores in Supabase");
        let store = SupabaseScoreStore::new(SupabaseConfig::new(url.as_str(), key.as_str()));
        return serve(config, store).await;
    }

    #[cfg(not(feature = "supabase"))]
    if config.uses_supabase() {
        tracing::warn!("Supabase is configured but support was not compiled in");
    }
    tracing::warn!("recording scores in memory; the leaderboard resets on restart");
    serve(config, MemoryScoreStore::new()).await
}

async fn serve<S: ScoreStore>(config: ServerConfig, store: S) -> Result<(), MemomatchError> {
    let server = MemomatchServerBuilder::new().config(config).build(store).await?;
    server.run().await
}
