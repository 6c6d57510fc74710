use ai_llm_service::telemetry::{self, LogFormat};
use tracing::{Level, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env when present; real env wins.
    let dotenv = dotenvy::dotenv();

    let filter = telemetry::env_filter_with_level("info", Level::INFO);
    telemetry::init(LogFormat::from_env(), filter);

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => info!("no .env file; using process environment"),
        Err(e) => warn!(error = %e, "failed to parse .env; using process environment"),
    }

    api::start().await?;
    Ok(())
}
